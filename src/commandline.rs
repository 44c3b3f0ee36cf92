use bmsbridge_lib::BridgeConfig;
use clap::{Parser, Subcommand};
use clap_num::maybe_hex;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::time::Duration;

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommands {
    /// Show the charge/discharge permissions and cutoff voltages for the snapshot
    Limits,
    /// Show every frame of the system data and setup groups
    Encode,
    /// Feed one inbound frame to the dispatcher and show what would be transmitted
    Poll {
        /// Identifier of the inbound frame (decimal or 0x prefixed hex)
        #[arg(long, value_parser = maybe_hex::<u32>, default_value = "0x4200")]
        id: u32,
        /// Payload bytes (decimal or 0x prefixed hex), at most 8
        #[arg(value_parser = maybe_hex::<u8>, num_args = 0..=8)]
        data: Vec<u8>,
    },
    /// Run the dispatcher tick loop against the snapshot, logging transmitted frames
    Simulate {
        /// Number of ticks to run
        #[arg(long, default_value = "10")]
        ticks: u32,
        /// Time between ticks (e.g., "100ms", "1s")
        #[arg(long, value_parser = humantime::parse_duration, default_value = "1s")]
        tick: Duration,
        /// Send a system data poll before every tick (reactive vendors)
        #[arg(long, action)]
        poll: bool,
    },
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
}

const fn about_text() -> &'static str {
    "battery to inverter CAN bridge tool"
}

#[derive(Parser, Debug)]
#[command(version, about=about_text(), long_about = None)]
pub struct CliArgs {
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// Bridge configuration file (YAML)
    #[arg(short, long, default_value_t = BridgeConfig::DEFAULT_CONFIG_FILE.to_string())]
    pub config: String,

    /// Battery snapshot file (YAML)
    #[arg(short, long, default_value = "snapshot.yaml")]
    pub snapshot: String,

    /// Output format for printed frames and limits
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: CliCommands,
}

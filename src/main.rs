use anyhow::{Context, Result};
use bmsbridge_lib::dispatcher::Request;
use bmsbridge_lib::protocol::{InboundFrame, WireFrame, COMMAND_SYSTEM_DATA, POLL_ID};
use bmsbridge_lib::transport::{LogSink, RecordingSink};
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use log::*;
use std::{ops::Deref, panic, time::Instant};

mod commandline;
mod settings;

use commandline::{CliArgs, CliCommands, OutputFormat};

fn logging_init(loglevel: LevelFilter) -> LoggerHandle {
    let log_handle = Logger::try_with_env_or_str(loglevel.as_str())
        .expect("Cannot init logging")
        .start()
        .expect("Cannot start logging");

    panic::set_hook(Box::new(|panic_info| {
        let (filename, line, column) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()))
            .unwrap_or(("<unknown>", 0, 0));
        let cause = panic_info
            .payload()
            .downcast_ref::<String>()
            .map(String::deref);
        let cause = cause.unwrap_or_else(|| {
            panic_info
                .payload()
                .downcast_ref::<&str>()
                .copied()
                .unwrap_or("<cause unknown>")
        });

        error!(
            "Thread '{}' panicked at {}:{}:{}: {}",
            std::thread::current().name().unwrap_or("<unknown>"),
            filename,
            line,
            column,
            cause
        );
    }));
    log_handle
}

fn print_frames<'a>(
    format: OutputFormat,
    title: &str,
    frames: impl IntoIterator<Item = &'a WireFrame>,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("{title}:");
            for frame in frames {
                println!("  {frame:?}");
            }
        }
        OutputFormat::Json => {
            let frames: Vec<&WireFrame> = frames.into_iter().collect();
            let mut document = serde_json::Map::new();
            document.insert(
                title.to_string(),
                serde_json::to_value(frames)
                    .with_context(|| "Cannot serialize frames")?,
            );
            println!("{}", serde_json::Value::Object(document));
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let _log_handle = logging_init(args.verbose.log_level_filter());

    let config = settings::load_config(&args.config)?;
    let snapshot = settings::load_snapshot(&args.snapshot)?;

    match args.command {
        CliCommands::Limits => {
            let limits = config.safety_gate().compute(&snapshot);
            match args.format {
                OutputFormat::Text => println!("Limits: {limits:?}"),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string(&limits)
                        .with_context(|| "Cannot serialize limits")?
                ),
            }
        }
        CliCommands::Encode => {
            let dispatcher = config.dispatcher(RecordingSink::new())?;
            let data = dispatcher.encode(Request::SystemData, &snapshot);
            print_frames(args.format, "system data", &data)?;
            let setup = dispatcher.encode(Request::SetupInfo, &snapshot);
            print_frames(args.format, "setup info", &setup)?;
        }
        CliCommands::Poll { id, data } => {
            let frame = InboundFrame::new(id, &data)
                .with_context(|| "Invalid inbound frame")?;
            let mut dispatcher = config.dispatcher(RecordingSink::new())?;
            if dispatcher.handle_frame(&frame, snapshot) == 0 {
                info!("Frame {frame:?} is not a request, nothing transmitted");
            }
            print_frames(args.format, "transmitted", dispatcher.sink().frames())?;
        }
        CliCommands::Simulate { ticks, tick, poll } => {
            let mut dispatcher = config.dispatcher(LogSink::default())?;
            let poll_frame = InboundFrame::new(POLL_ID, &[COMMAND_SYSTEM_DATA])?;
            let start = Instant::now();
            for _ in 0..ticks {
                let mut sent = 0;
                if poll {
                    sent += dispatcher.handle_frame(&poll_frame, snapshot);
                }
                sent += dispatcher.tick(start.elapsed().as_millis() as u64, snapshot);
                println!(
                    "{} sent={} inverter_alive={}",
                    chrono::Local::now().to_rfc3339(),
                    sent,
                    dispatcher.inverter_alive()
                );
                std::thread::sleep(tick);
            }
            info!(
                "Simulation finished, {} frames sent",
                dispatcher.sink().sent()
            );
        }
    }

    Ok(())
}

use anyhow::{Context, Result};
use bmsbridge_lib::snapshot::BatterySnapshot;
use bmsbridge_lib::BridgeConfig;
use serde::de::DeserializeOwned;
use std::path::Path;

fn load_yaml<T: DeserializeOwned>(path: &str, what: &str) -> Result<T> {
    log::debug!("Loading {what} from {path:?}");
    let file = std::fs::File::open(path)
        .with_context(|| format!("Cannot open {what} file {path:?}"))?;
    serde_yaml::from_reader(&file)
        .with_context(|| format!("Cannot read {what} from file: {path:?}"))
}

/// A missing configuration file falls back to the defaults, a broken one is an error.
pub fn load_config(path: &str) -> Result<BridgeConfig> {
    let config = if Path::new(path).exists() {
        load_yaml(path, "bridge config")?
    } else {
        log::info!("No config file at {path:?}, using defaults");
        BridgeConfig::default()
    };
    config
        .validate()
        .with_context(|| format!("Invalid bridge config {path:?}"))?;
    Ok(config)
}

pub fn load_snapshot(path: &str) -> Result<BatterySnapshot> {
    load_yaml(path, "battery snapshot")
}

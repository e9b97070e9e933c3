//! Command line and configuration file handling
//!
//! Settings come from an optional TOML file; `--debug` overrides the file.

use beaconscan::ScanConfig;
use clap::Parser;
use log::LevelFilter;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Everything the scanner binary can be configured with
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// HCI device number, 0 for hci0
    pub device: u16,
    /// Give up on a silent adapter after this long; unset blocks forever
    pub read_timeout_ms: Option<u64>,
    pub log_level: String,
    pub scan: ScanConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            device: 0,
            read_timeout_ms: None,
            log_level: "info".into(),
            scan: ScanConfig::default(),
        }
    }
}

impl CliConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    pub fn level_filter(&self) -> LevelFilter {
        if self.scan.debug {
            return LevelFilter::Debug;
        }
        match self.log_level.to_uppercase().as_str() {
            "OFF" => LevelFilter::Off,
            "ERROR" => LevelFilter::Error,
            "WARN" => LevelFilter::Warn,
            "DEBUG" => LevelFilter::Debug,
            "TRACE" => LevelFilter::Trace,
            _ => LevelFilter::Info,
        }
    }
}

/// Parsed command line
#[derive(Parser, Debug, Default, PartialEq, Eq)]
#[command(name = "beaconscancli", version, about = "Scan for iBeacons over a raw HCI socket")]
pub struct CliArgs {
    /// Dump every packet and decoded beacon
    #[arg(short, long)]
    pub debug: bool,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    /// Load the config file, if any, and apply command line overrides
    pub fn resolve(&self) -> Result<CliConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => CliConfig::default(),
        };
        if self.debug {
            config.scan.debug = true;
        }
        Ok(config)
    }
}

/// Read and parse a TOML config file
pub fn load_config(path: &Path) -> Result<CliConfig, ConfigError> {
    log::debug!("Reading config from {:?}", path);
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_config(text: &str) -> Result<CliConfig, toml::de::Error> {
    toml::from_str(text)
}

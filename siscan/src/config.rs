//! Configuration file.
//!
//! ```toml
//! [scan]
//! platform = "freesat"
//! source = "freesat"
//! tune_timeout_ms = 5000
//! filter_timeout_ms = 5000
//!
//! [database]
//! path = "siscan.db"
//!
//! [logging]
//! level = "debug"
//! log_dir = "logs"
//! retention_days = 7
//!
//! [lcn]
//! universal_region = 65535
//! default_region = 0
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::lcn::LcnFallbacks;
use crate::scan::{PlatformKind, ScanOptions};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Configuration file format.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub scan: ScanSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub lcn: LcnSection,
}

#[derive(Debug, Deserialize, Default)]
pub struct ScanSection {
    pub platform: Option<PlatformKind>,
    /// Source namespace in the database.
    pub source: Option<String>,
    pub tune_timeout_ms: Option<u64>,
    pub filter_timeout_ms: Option<u64>,
    /// DVB-T sweep bounds (UHF channel numbers).
    pub first_channel: Option<u32>,
    pub last_channel: Option<u32>,
}

impl ScanSection {
    pub fn options(&self) -> ScanOptions {
        let defaults = ScanOptions::default();
        ScanOptions {
            tune_timeout: self
                .tune_timeout_ms
                .map_or(defaults.tune_timeout, Duration::from_millis),
            filter_timeout: self
                .filter_timeout_ms
                .map_or(defaults.filter_timeout, Duration::from_millis),
        }
    }

    pub fn channel_range(&self) -> Option<(u32, u32)> {
        match (self.first_channel, self.last_channel) {
            (None, None) => None,
            (first, last) => Some((first.unwrap_or(21), last.unwrap_or(68))),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct DatabaseSection {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LoggingSection {
    pub log_dir: Option<String>,
    pub retention_days: Option<u64>,
    pub level: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LcnSection {
    pub universal_region: Option<u16>,
    pub default_region: Option<u16>,
}

impl LcnSection {
    pub fn fallbacks(&self) -> LcnFallbacks {
        let defaults = LcnFallbacks::default();
        LcnFallbacks {
            universal_region: self.universal_region.unwrap_or(defaults.universal_region),
            default_region: self.default_region.unwrap_or(defaults.default_region),
        }
    }
}

pub fn load_config(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: ConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration.
//!
//! Loaded from `./hydroplant.toml`, then the user config dir, then
//! built-in defaults. Every field has a default so a partial file is fine.

use hp_engine::{AutonomyConfig, ControllerConfig, RestorePolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const CONFIG_FILE: &str = "hydroplant.toml";

/// Errors from configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse failed: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub bus: BusSection,
    pub store: StoreSection,
    pub autonomy: AutonomySection,
}

/// Broker address the deployment's transport connects to.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusSection {
    pub host: String,
    pub port: u16,
}

impl Default for BusSection {
    fn default() -> Self {
        Self { host: "localhost".to_string(), port: 1883 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    /// Directory holding the state document and log archive.
    pub path: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        Self { path: base.join("hydroplant") }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutonomySection {
    /// Scheduler tick interval, seconds.
    pub wait_secs: f64,
    /// How often the interval checks run, seconds.
    pub interval_check_secs: f64,
    pub day_start_hour: u32,
    pub day_end_hour: u32,
    pub restore: RestorePolicy,
}

impl Default for AutonomySection {
    fn default() -> Self {
        Self {
            wait_secs: 1.0,
            interval_check_secs: 60.0,
            day_start_hour: 7,
            day_end_hour: 21,
            restore: RestorePolicy::default(),
        }
    }
}

impl Config {
    /// Load from the first config file found, or fall back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match find_config_file() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn controller_config(&self) -> ControllerConfig {
        let defaults = AutonomyConfig::default();
        ControllerConfig {
            autonomy: AutonomyConfig {
                wait: secs(self.autonomy.wait_secs, defaults.wait),
                interval_check: secs(self.autonomy.interval_check_secs, defaults.interval_check),
                day_start_hour: self.autonomy.day_start_hour,
                day_end_hour: self.autonomy.day_end_hour,
            },
            restore: self.autonomy.restore,
        }
    }
}

/// Nonsense durations (negative, NaN) fall back to the default.
fn secs(value: f64, default: Duration) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(default)
}

fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    let user = dirs::config_dir()?.join("hydroplant").join("config.toml");
    user.is_file().then_some(user)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

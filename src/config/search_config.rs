use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::constants::{
    DEFAULT_EXCLUDED_VOLTAGE_CLASSES, DEFAULT_INCONVERGENCE_JUMP_PCT, DEFAULT_MAX_ITERATIONS,
    DEFAULT_MAX_ORACLE_RETRIES, DEFAULT_NETWORK_SHEET, DEFAULT_OVERLOAD_THRESHOLD_PCT,
    DEFAULT_POWER_FACTOR, DEFAULT_START_POWER_MW,
};

/// Shared configuration for a hosting-capacity batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub start_power_mw: f64,
    pub power_factor: f64,
    pub overload_threshold_pct: f64,
    pub inconvergence_jump_pct: f64,
    pub excluded_voltage_classes: Vec<String>,
    pub max_iterations: usize,
    pub max_oracle_retries: usize,
    pub network_sheet: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            start_power_mw: DEFAULT_START_POWER_MW,
            power_factor: DEFAULT_POWER_FACTOR,
            overload_threshold_pct: DEFAULT_OVERLOAD_THRESHOLD_PCT,
            inconvergence_jump_pct: DEFAULT_INCONVERGENCE_JUMP_PCT,
            excluded_voltage_classes: DEFAULT_EXCLUDED_VOLTAGE_CLASSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_oracle_retries: DEFAULT_MAX_ORACLE_RETRIES,
            network_sheet: DEFAULT_NETWORK_SHEET.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(serde_json::Error),
    InvalidValue(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Config parse error: {}", e),
            ConfigError::InvalidValue(s) => write!(f, "Invalid config value: {}", s),
        }
    }
}

impl std::error::Error for ConfigError {}

impl SearchConfig {
    /// Load a configuration from a JSON file. Missing fields fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: SearchConfig = serde_json::from_reader(reader)?;
        Ok(config)
    }

    /// Reject configurations that would poison the search before any oracle call is made.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.power_factor <= 0.0 || self.power_factor > 1.0 {
            return Err(ConfigError::InvalidValue(format!(
                "power factor must be in (0, 1], got {}",
                self.power_factor
            )));
        }
        if self.start_power_mw <= 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "start power must be positive, got {} MW",
                self.start_power_mw
            )));
        }
        if self.overload_threshold_pct <= 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "overload threshold must be positive, got {}%",
                self.overload_threshold_pct
            )));
        }
        if self.inconvergence_jump_pct <= 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "inconvergence jump threshold must be positive, got {}%",
                self.inconvergence_jump_pct
            )));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "max iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

//! Supervisor configuration and loading, grounded on `daemon.rs`'s
//! `DaemonConfig::from_toml`/`from_toml_file` pattern.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mode::Mode;
use crate::policy::{DEFAULT_MAX_SCHEDULED_HEAT_ALLOWED, DEFAULT_MIN_SCHEDULED_COOL_ALLOWED};
use crate::thermostat_type::ThermostatType;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid thermostatType {0:?}: {1}")]
    InvalidThermostatType(String, crate::error::ThermostatError),
}

/// Per-zone configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    pub thermostat_type: String,
    pub zone_id: String,
    #[serde(default = "default_poll_interval_sec")]
    pub poll_interval_sec: u64,
    #[serde(default = "default_reconnect_interval_sec")]
    pub reconnect_interval_sec: u64,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default)]
    pub target_mode: Option<Mode>,
    #[serde(default)]
    pub measurement_limit: Option<u64>,
    #[serde(default)]
    pub flag_all_deviations: bool,
    #[serde(default = "default_max_scheduled_heat_allowed")]
    pub max_scheduled_heat_allowed: f64,
    #[serde(default = "default_min_scheduled_cool_allowed")]
    pub min_scheduled_cool_allowed: f64,
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,
    #[serde(default = "default_retry_delay_sec")]
    pub retry_delay_sec: u64,
    #[serde(default)]
    pub enabled: bool,
}

fn default_poll_interval_sec() -> u64 {
    300
}

fn default_reconnect_interval_sec() -> u64 {
    24 * 3_600
}

fn default_tolerance() -> f64 {
    2.0
}

fn default_max_scheduled_heat_allowed() -> f64 {
    DEFAULT_MAX_SCHEDULED_HEAT_ALLOWED
}

fn default_min_scheduled_cool_allowed() -> f64 {
    DEFAULT_MIN_SCHEDULED_COOL_ALLOWED
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_delay_sec() -> u64 {
    30
}

impl SupervisorConfig {
    pub fn thermostat_type(&self) -> Result<ThermostatType, ConfigError> {
        self.thermostat_type
            .parse()
            .map_err(|e| ConfigError::InvalidThermostatType(self.thermostat_type.clone(), e))
    }
}

/// A site: the set of zones the orchestrator fans out over.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SiteConfig {
    pub zones: Vec<SupervisorConfig>,
}

impl SiteConfig {
    pub fn from_toml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io { path: path.to_string(), source: e })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn sample_toml() -> String {
        r#"# Thermostat supervisor site configuration

[[zones]]
thermostat_type = "honeywell"
zone_id = "0"
poll_interval_sec = 300
reconnect_interval_sec = 86400
tolerance = 2.0
target_mode = "off"
flag_all_deviations = false
enabled = true

[[zones]]
thermostat_type = "emulator"
zone_id = "0"
poll_interval_sec = 60
enabled = true
"#
        .into()
    }
}

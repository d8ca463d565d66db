//! Dashboard configuration
//!
//! Handles:
//! - Monitored hosts (name, identity color, endpoint, column position)
//! - Poll period and per-fetch timeout
//! - Glyph theme (colors, lane offsets, geometry)
//! - Log destination
//!
//! Loaded from YAML (`SYMBION_DASHBOARD_CONFIG`, default `dashboard.yaml`).
//! A missing file means built-in defaults: the two original hosts.

use crate::layout::{Theme, ThemeError};
use crate::model::{MonitoredHost, Rgb};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

pub const CONFIG_ENV: &str = "SYMBION_DASHBOARD_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "dashboard.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("invalid theme: {0}")]
    Theme(#[from] ThemeError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub poll_interval_ms: u64,
    pub fetch_timeout_ms: u64,
    pub hosts: Vec<HostConf>,
    pub theme: Theme,
    pub log: LogConf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConf {
    pub display_name: String,
    #[serde(default = "default_primary_color")]
    pub primary_color: Rgb,
    pub endpoint_url: String,
    #[serde(default)]
    pub horizontal_position: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConf {
    /// Log file used while the terminal is owned by the canvas
    pub file: PathBuf,
    /// `EnvFilter` directive; `RUST_LOG` wins when set
    pub filter: Option<String>,
}

/// Where the loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    File(PathBuf),
    Defaults { missing: PathBuf },
}

fn default_primary_color() -> Rgb {
    Rgb::WHITE
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5000,
            fetch_timeout_ms: 4000,
            hosts: vec![
                HostConf {
                    display_name: "gold".into(),
                    primary_color: Rgb::GOLD,
                    endpoint_url: "http://100.121.87.54:8000/metrics".into(),
                    horizontal_position: 0.02,
                },
                HostConf {
                    display_name: "blue".into(),
                    primary_color: Rgb::BLUE,
                    endpoint_url: "http://100.79.53.58:8000/metrics".into(),
                    horizontal_position: 0.52,
                },
            ],
            theme: Theme::default(),
            log: LogConf::default(),
        }
    }
}

impl Default for LogConf {
    fn default() -> Self {
        Self {
            file: PathBuf::from("symbion-dashboard.log"),
            filter: None,
        }
    }
}

impl DashboardConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Fresh host entities, each starting from the default error record
    pub fn monitored_hosts(&self) -> Vec<MonitoredHost> {
        self.hosts
            .iter()
            .map(|h| {
                MonitoredHost::new(
                    h.display_name.clone(),
                    h.primary_color,
                    h.endpoint_url.clone(),
                    h.horizontal_position,
                )
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hosts.is_empty() {
            return Err(ConfigError::Invalid("at least one host is required".into()));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(ConfigError::Invalid("fetch_timeout_ms must be > 0".into()));
        }
        // A cycle must settle before the next tick.
        if self.fetch_timeout_ms >= self.poll_interval_ms {
            return Err(ConfigError::Invalid(format!(
                "fetch_timeout_ms ({}) must be strictly less than poll_interval_ms ({})",
                self.fetch_timeout_ms, self.poll_interval_ms
            )));
        }

        for host in &self.hosts {
            if host.display_name.trim().is_empty() {
                return Err(ConfigError::Invalid("host display_name is empty".into()));
            }
            reqwest::Url::parse(&host.endpoint_url).map_err(|e| {
                ConfigError::Invalid(format!(
                    "host '{}': bad endpoint_url '{}': {e}",
                    host.display_name, host.endpoint_url
                ))
            })?;
            if !(0.0..=1.0).contains(&host.horizontal_position) {
                return Err(ConfigError::Invalid(format!(
                    "host '{}': horizontal_position must be within [0, 1]",
                    host.display_name
                )));
            }
        }

        self.theme.validate()?;
        Ok(())
    }
}

/// Load configuration from `SYMBION_DASHBOARD_CONFIG` or `dashboard.yaml`
pub async fn load_config() -> Result<(DashboardConfig, ConfigOrigin), ConfigError> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    load_config_from(Path::new(&path)).await
}

pub async fn load_config_from(path: &Path) -> Result<(DashboardConfig, ConfigOrigin), ConfigError> {
    if !path.exists() {
        let config = DashboardConfig::default();
        config.validate()?;
        return Ok((config, ConfigOrigin::Defaults { missing: path.to_path_buf() }));
    }

    let txt = fs::read_to_string(path).await?;
    let config = if txt.trim().is_empty() {
        DashboardConfig::default()
    } else {
        serde_yaml::from_str::<DashboardConfig>(&txt)?
    };
    config.validate()?;
    Ok((config, ConfigOrigin::File(path.to_path_buf())))
}

//! Console configuration
//!
//! Stored as TOML. Every section and key falls back to its default, so a
//! partial file is valid.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::calc::RatePolicy;
use crate::constants::*;
use crate::error::{Error, Result};

const CONFIG_FILE_NAME: &str = "console.toml";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub daemon: DaemonConnection,
    pub ui: UiConfig,
    pub polling: PollingConfig,
    pub calc: CalcConfig,
}

/// Where the daemon's REST API lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConnection {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for DaemonConnection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DAEMON_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

impl DaemonConnection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub bind_address: String,
    pub http_port: u16,
    /// Console assets served at `/`; API only when unset
    pub static_dir: Option<PathBuf>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            http_port: DEFAULT_HTTP_PORT,
            static_dir: None,
        }
    }
}

/// Refresh periods of the background pollers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub ptp_status_secs: u64,
    pub remote_sources_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            ptp_status_secs: DEFAULT_PTP_POLL_SECS,
            remote_sources_secs: DEFAULT_REMOTE_SOURCES_POLL_SECS,
        }
    }
}

impl PollingConfig {
    pub fn ptp_status_period(&self) -> Duration {
        Duration::from_secs(self.ptp_status_secs)
    }

    pub fn remote_sources_period(&self) -> Duration {
        Duration::from_secs(self.remote_sources_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalcConfig {
    pub rate_policy: RatePolicy,
    /// RTP payload budget in bytes
    pub max_packet_size: usize,
}

impl Default for CalcConfig {
    fn default() -> Self {
        Self {
            rate_policy: RatePolicy::Reject,
            max_packet_size: MAX_PACKET_SIZE,
        }
    }
}

impl AppConfig {
    /// Platform config file location, if the platform has one
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "aes67", "aes67-console")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` when it exists, otherwise return defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if reqwest::Url::parse(&self.daemon.base_url).is_err() {
            return Err(Error::Config(format!(
                "daemon.base_url is not a URL: {}",
                self.daemon.base_url
            )));
        }
        if self.daemon.timeout_secs == 0 {
            return Err(Error::Config("daemon.timeout_secs must be positive".into()));
        }
        if self.polling.ptp_status_secs == 0 || self.polling.remote_sources_secs == 0 {
            return Err(Error::Config("polling periods must be positive".into()));
        }
        if self.calc.max_packet_size == 0 {
            return Err(Error::Config("calc.max_packet_size must be positive".into()));
        }
        Ok(())
    }
}

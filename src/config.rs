//! Configuration loading from TOML files and environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub idle: IdleConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub exporter: ExporterConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Desktop polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// How often the desktop is sampled, in seconds.
    #[serde(default = "default_poll_interval")]
    pub interval_seconds: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_poll_interval(),
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

/// Idle detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdleConfig {
    /// The user is idle once there was no input for longer than this many seconds.
    #[serde(default = "default_idle_cutoff")]
    pub cutoff_seconds: u64,
    /// Title recorded for idle or screensaver periods.
    #[serde(default = "default_idle_sentinel")]
    pub sentinel: String,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            cutoff_seconds: default_idle_cutoff(),
            sentinel: default_idle_sentinel(),
        }
    }
}

impl IdleConfig {
    pub fn cutoff(&self) -> Duration {
        Duration::from_secs(self.cutoff_seconds)
    }
}

/// Segment reporting configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Longest segment, in seconds, written without a title change.
    /// Each run mode has its own default when unset.
    #[serde(default)]
    pub flush_interval_seconds: Option<u64>,
}

impl ReportConfig {
    pub fn flush_interval_or(&self, mode_default: Duration) -> Duration {
        self.flush_interval_seconds
            .map(Duration::from_secs)
            .unwrap_or(mode_default)
    }
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Address the `/metrics` endpoint listens on.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
        }
    }
}

impl ExporterConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_address
            .parse()
            .with_context(|| format!("Invalid listen address: {}", self.listen_address))
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Data directory; JSONL reports go to `<data_dir>/logs`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Diagnostic output format on stderr.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Returns the logs directory path.
    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

// Default value functions
fn default_poll_interval() -> u64 {
    5
}

fn default_idle_cutoff() -> u64 {
    180
}

fn default_idle_sentinel() -> String {
    "idle".to_string()
}

fn default_listen_address() -> String {
    "0.0.0.0:9357".to_string()
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".spent"))
        .unwrap_or_else(|| PathBuf::from(".spent"))
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file")?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = config_path {
            Self::from_file(path)?
        } else {
            let default_paths = [
                PathBuf::from("config/default.toml"),
                dirs::config_dir()
                    .map(|d| d.join("spent/config.toml"))
                    .unwrap_or_default(),
            ];

            let mut loaded = None;
            for path in &default_paths {
                if path.is_file() {
                    loaded = Some(Self::from_file(path)?);
                    break;
                }
            }
            loaded.unwrap_or_default()
        };

        config.apply_env_overrides();
        config.logging.data_dir = expand_tilde(&config.logging.data_dir);

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("SPENT_POLL_INTERVAL").and_then(|v| v.parse().ok()) {
            self.poll.interval_seconds = v;
        }
        if let Some(v) = var("SPENT_IDLE_CUTOFF").and_then(|v| v.parse().ok()) {
            self.idle.cutoff_seconds = v;
        }
        if let Some(v) = var("SPENT_FLUSH_INTERVAL").and_then(|v| v.parse().ok()) {
            self.report.flush_interval_seconds = Some(v);
        }
        if let Some(val) = var("SPENT_LISTEN_ADDRESS") {
            self.exporter.listen_address = val;
        }
        if let Some(val) = var("SPENT_DATA_DIR") {
            self.logging.data_dir = PathBuf::from(val);
        }
        if let Some(val) = var("SPENT_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.poll.interval_seconds == 0 {
            anyhow::bail!("Poll interval must be greater than 0");
        }
        if self.report.flush_interval_seconds == Some(0) {
            anyhow::bail!("Flush interval must be greater than 0");
        }
        if self.idle.sentinel.is_empty() {
            anyhow::bail!("Idle sentinel cannot be empty");
        }
        self.exporter.socket_addr()?;
        Ok(())
    }
}

/// Expand ~ to home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

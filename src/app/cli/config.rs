//! TOML configuration file loading and CLI overrides
//!
//! ```toml
//! [logging]
//! level = "info"
//! format = "text"
//!
//! [queues]
//! count = 3
//! poll-interval-ms = 100
//! high-watermark = 1000
//! low-watermark = 10
//!
//! [ft]
//! group = "prices"
//! mechanism = "multicast"
//! heartbeat-interval-ms = 2000
//! timeout-interval-ms = 6000
//! members = [10, 5]
//! run-seconds = 30
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::args::Args;
use crate::core::error_handling::ContextualError;
use crate::core::logging::LogFormat;
use crate::core::status::{HasStatus, Status};
use crate::ft::{FtMechanism, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_TIMEOUT_INTERVAL, MAX_WEIGHT};
use crate::queue::{GroupConfig, QueueConfig, DEFAULT_POLL_INTERVAL};

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file does not exist: {}", path.display())]
    Missing { path: PathBuf },

    #[error("Cannot read configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse configuration {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("Invalid configuration value for '{field}': {message}")]
    Invalid { field: &'static str, message: String },

    #[error("Cannot render configuration: {message}")]
    Render { message: String },
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            message: message.into(),
        }
    }
}

impl HasStatus for ConfigError {
    fn status(&self) -> Status {
        match self {
            ConfigError::Missing { .. } => Status::NotFound,
            ConfigError::Parse { .. } | ConfigError::Invalid { .. } => Status::InvalidArgument,
            ConfigError::Read { .. } | ConfigError::Render { .. } => Status::SystemError,
        }
    }
}

impl ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        !matches!(self, ConfigError::Render { .. })
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            ConfigError::Missing { .. } => Some("The specified configuration file does not exist"),
            ConfigError::Read { .. } => Some("The configuration file could not be read"),
            ConfigError::Parse { message, .. } => Some(message),
            ConfigError::Invalid { message, .. } => Some(message),
            ConfigError::Render { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file: Option<String>,
    /// `None` follows the terminal
    pub color: Option<bool>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file: None,
            color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct QueuesConfig {
    pub count: usize,
    pub poll_interval_ms: u64,
    pub high_watermark: usize,
    pub low_watermark: usize,
}

impl Default for QueuesConfig {
    fn default() -> Self {
        let queue = QueueConfig::default();
        Self {
            count: 2,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            high_watermark: queue.high_watermark,
            low_watermark: queue.low_watermark,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct FtConfig {
    pub group: String,
    pub mechanism: FtMechanism,
    pub heartbeat_interval_ms: u64,
    pub timeout_interval_ms: u64,
    /// One member is created per weight
    pub members: Vec<u32>,
    /// Run until a signal when unset
    pub run_seconds: Option<u64>,
}

impl Default for FtConfig {
    fn default() -> Self {
        Self {
            group: "ftqueue".to_string(),
            mechanism: FtMechanism::default(),
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL.as_millis() as u64,
            timeout_interval_ms: DEFAULT_TIMEOUT_INTERVAL.as_millis() as u64,
            members: vec![10, 5],
            run_seconds: None,
        }
    }
}

/// Effective configuration of the demo runner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub queues: QueuesConfig,
    pub ft: FtConfig,
}

impl AppConfig {
    /// `<config dir>/Ftqueue/ftqueue.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Ftqueue").join("ftqueue.toml"))
    }

    /// Load from an explicit file, the default file, or built-in defaults
    ///
    /// An explicitly named file must exist; a missing default file is not an
    /// error.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match config_file {
            Some(path) if !path.exists() => {
                return Err(ConfigError::Missing {
                    path: path.to_path_buf(),
                })
            }
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|path| path.exists()),
        };

        match path {
            Some(path) => Self::from_file(&path),
            None => {
                log::debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, &path.display().to_string())
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Self::parse(contents, "string")
    }

    fn parse(contents: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents).map_err(|e| ConfigError::Parse {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides on top of file values
    pub fn apply_args(&mut self, args: &Args) -> Result<(), ConfigError> {
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if let Some(format) = &args.log_format {
            self.logging.format = format.clone();
        }
        if let Some(file) = &args.log_file {
            let file = file.to_string_lossy();
            // "none" and "-" disable file logging
            self.logging.file = if file.eq_ignore_ascii_case("none") || file == "-" {
                None
            } else {
                Some(file.into_owned())
            };
        }
        if let Some(color) = args.color_override() {
            self.logging.color = Some(color);
        }

        if let Some(count) = args.queues {
            self.queues.count = count;
        }

        if let Some(group) = &args.group {
            self.ft.group = group.clone();
        }
        if let Some(mechanism) = &args.mechanism {
            self.ft.mechanism = FtMechanism::from_str(mechanism).map_err(|_| {
                ConfigError::invalid("ft.mechanism", format!("unknown FT mechanism '{mechanism}'"))
            })?;
        }
        if !args.weights.is_empty() {
            self.ft.members = args.weights.clone();
        }
        if let Some(ms) = args.heartbeat_ms {
            self.ft.heartbeat_interval_ms = ms;
        }
        if let Some(ms) = args.timeout_ms {
            self.ft.timeout_interval_ms = ms;
        }
        if let Some(seconds) = args.run_seconds {
            self.ft.run_seconds = Some(seconds);
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::invalid(
                "logging.level",
                format!("unknown log level '{}'", self.logging.level),
            ));
        }
        LogFormat::from_str(&self.logging.format)
            .map_err(|message| ConfigError::invalid("logging.format", message))?;

        if self.queues.count == 0 {
            return Err(ConfigError::invalid(
                "queues.count",
                "a queue group needs at least one queue",
            ));
        }
        self.queue_config()
            .validate()
            .map_err(|e| ConfigError::invalid("queues", e.to_string()))?;

        if self.ft.group.is_empty() {
            return Err(ConfigError::invalid("ft.group", "FT group name must not be empty"));
        }
        if self.ft.heartbeat_interval_ms == 0 || self.ft.timeout_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "ft",
                "FT heartbeat and timeout intervals must be greater than zero",
            ));
        }
        if self.ft.members.is_empty() {
            return Err(ConfigError::invalid("ft.members", "at least one member weight is required"));
        }
        if let Some(weight) = self.ft.members.iter().find(|w| **w > MAX_WEIGHT) {
            return Err(ConfigError::invalid(
                "ft.members",
                format!("weight {weight} exceeds the maximum of {MAX_WEIGHT}"),
            ));
        }
        Ok(())
    }

    pub fn log_format(&self) -> LogFormat {
        LogFormat::from_str(&self.logging.format).unwrap_or_default()
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig::default()
            .with_poll_interval(Duration::from_millis(self.queues.poll_interval_ms))
            .with_watermarks(self.queues.high_watermark, self.queues.low_watermark)
    }

    /// Queues are named `<group>-q-<i>`
    pub fn group_config(&self) -> GroupConfig {
        GroupConfig::named(format!("{}-q", self.ft.group)).with_queue_config(self.queue_config())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.ft.heartbeat_interval_ms)
    }

    pub fn timeout_interval(&self) -> Duration {
        Duration::from_millis(self.ft.timeout_interval_ms)
    }

    pub fn run_duration(&self) -> Option<Duration> {
        self.ft.run_seconds.map(Duration::from_secs)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Render {
            message: e.to_string(),
        })
    }
}

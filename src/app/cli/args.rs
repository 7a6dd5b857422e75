//! Command-line arguments for the `ftqueue` demo runner
//!
//! Every flag is optional; unset flags fall back to the configuration file
//! and then to built-in defaults (see [`AppConfig`](super::config::AppConfig)).

use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "ftqueue")]
#[command(about = "Dispatched event queues with weighted active/standby fault tolerance")]
#[command(version)]
#[command(after_help = " * can be specified multiple times or as a comma-separated list")]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Force coloured log output
    #[arg(short = 'g', long = "color", conflicts_with = "no_color")]
    pub color: bool,

    /// Disable coloured log output
    #[arg(long = "no-color", conflicts_with = "color")]
    pub no_color: bool,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", value_parser = ["text", "simple", "ext", "json"])]
    pub log_format: Option<String>,

    /// Number of dispatched queues in the group
    #[arg(short = 'q', long = "queues", value_name = "COUNT")]
    pub queues: Option<usize>,

    /// FT group name
    #[arg(short = 'G', long = "group", value_name = "NAME")]
    pub group: Option<String>,

    /// Heartbeat mechanism
    #[arg(short = 'm', long = "mechanism", value_name = "MECHANISM", value_parser = ["multicast", "bridge"])]
    pub mechanism: Option<String>,

    /// Member weights, one member per weight*
    #[arg(short = 'w', long = "weights", value_name = "WEIGHTS", value_delimiter = ',', action = ArgAction::Append)]
    pub weights: Vec<u32>,

    /// Heartbeat interval in milliseconds
    #[arg(long = "heartbeat-ms", value_name = "MILLIS")]
    pub heartbeat_ms: Option<u64>,

    /// Timeout interval in milliseconds
    #[arg(long = "timeout-ms", value_name = "MILLIS")]
    pub timeout_ms: Option<u64>,

    /// Stop after this many seconds instead of waiting for a signal
    #[arg(short = 't', long = "run-seconds", value_name = "SECONDS")]
    pub run_seconds: Option<u64>,

    /// Print the effective configuration as TOML and exit
    #[arg(long = "show-config")]
    pub show_config: bool,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit colour choice, `None` when neither flag was given
    pub fn color_override(&self) -> Option<bool> {
        match (self.color, self.no_color) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

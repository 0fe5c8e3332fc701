use std::{fmt, path::PathBuf};

use clap::{Parser, ValueEnum};
use log::LevelFilter;

use crate::api::slack::DEFAULT_API_URL;
use crate::collector::{DEFAULT_HISTORY_LIMIT, DEFAULT_PAGE_CAP};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Slack token with channels:history, users.profile:read and files:read scopes
    #[arg(long, env = "SLACK_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Channel ID to archive
    #[arg(long, env = "SLACK_CHANNEL")]
    pub channel: Option<String>,

    /// Archive messages since this unix time (seconds)
    #[arg(long)]
    pub since: Option<i64>,

    /// Archive messages until this unix time (seconds)
    #[arg(long)]
    pub until: Option<i64>,

    /// Length of the window (e.g. "24h", "1h30m", "7d"), counted from --since,
    /// back from --until, or back from now
    #[arg(long)]
    pub duration: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = FormatterKind::Text)]
    pub formatter: FormatterKind,

    /// Where the archive and attachments go
    #[arg(long, value_enum, default_value_t = ExporterKind::Local)]
    pub exporter: ExporterKind,

    /// Archive file for the local exporter, stdout when unset
    #[arg(long, env = "SLACKARC_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Attachment directory for the local exporter
    #[arg(long, env = "SLACKARC_FILE_DIR")]
    pub file_dir: Option<PathBuf>,

    /// Prefix for reply lines in text output (default " | ")
    #[arg(long)]
    pub reply_indent: Option<String>,

    /// Messages requested per page
    #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
    pub history_limit: u32,

    /// Maximum pages fetched per listing, extra pages are dropped
    #[arg(long, default_value_t = DEFAULT_PAGE_CAP)]
    pub page_cap: u32,

    /// Abort the whole run after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Slack Web API base URL
    #[arg(long, env = "SLACK_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Log verbosity
    #[arg(short, long, value_name = "LEVEL", default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatterKind {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExporterKind {
    None,
    Local,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl From<LogLevel> for LevelFilter {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Off => LevelFilter::Off,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Off => write!(f, "off"),
        }
    }
}

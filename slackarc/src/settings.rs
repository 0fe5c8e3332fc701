use std::{env, path::PathBuf, time::Duration};

use anyhow::{Context, bail};
use chrono::{DateTime, TimeDelta, Utc};
use config::{Config, File};
use log::debug;
use regex::Regex;
use serde::Deserialize;

use crate::cli::{Args, ExporterKind, FormatterKind};
use crate::collector::CollectorConfig;
use crate::exporter::Exporter;
use crate::formatter::{DEFAULT_REPLY_INDENT, Formatter};
use crate::models::Bounds;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    pub token: Option<String>,
    pub channel: Option<String>,
    pub log_file: Option<PathBuf>,
    pub file_dir: Option<PathBuf>,
    pub reply_indent: Option<String>,
}

const CONFIG_FILE_NAME: &str = env!("CARGO_PKG_NAME");

// Function to get the XDG_CONFIG_HOME path
fn get_xdg_config_path() -> Option<PathBuf> {
    // First check XDG_CONFIG_HOME environment variable
    if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config));
    }

    // If XDG_CONFIG_HOME is not set, fall back to $HOME/.config
    if let Ok(home) = env::var("HOME") {
        return Some(PathBuf::from(home).join(".config"));
    }

    None
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let Some(xdg_config) = get_xdg_config_path() else {
        return Ok(Settings::default());
    };

    let config_path = xdg_config.join(CONFIG_FILE_NAME).join("config.toml");
    if !config_path.exists() {
        return Ok(Settings::default());
    }

    Config::builder()
        .add_source(File::from(config_path.clone()).required(false))
        .build()?
        .try_deserialize()
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to deserialize config file {}: {}",
                config_path.display(),
                e
            )
        })
}

/// Fill options missing from the command line and environment with the config file.
pub fn merge_settings(args: &Args, settings: Settings) -> Args {
    let mut new_args = args.clone();

    macro_rules! apply_if_none {
        ($args:expr, $field:ident, $settings:expr) => {
            if $args.$field.is_none() {
                $args.$field = $settings.$field;
            }
        };
    }

    apply_if_none!(new_args, token, settings);
    apply_if_none!(new_args, channel, settings);
    apply_if_none!(new_args, log_file, settings);
    apply_if_none!(new_args, file_dir, settings);
    apply_if_none!(new_args, reply_indent, settings);

    new_args
}

pub fn merge_settings_with_args(args: &Args) -> anyhow::Result<Args> {
    let new_args = merge_settings(args, load_settings()?);
    debug!(
        "merged config: channel={:?} formatter={:?} exporter={:?}",
        new_args.channel, new_args.formatter, new_args.exporter
    );
    Ok(new_args)
}

/// Everything a run needs, checked before any network call is made.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub token: String,
    pub channel: String,
    pub api_url: String,
    pub bounds: Bounds,
    pub collector: CollectorConfig,
    pub timeout: Option<Duration>,
    pub formatter: Formatter,
    pub exporter: Exporter,
}

impl RunConfig {
    pub fn from_args(args: &Args, now: DateTime<Utc>) -> anyhow::Result<Self> {
        let token = required(&args.token, "--token or SLACK_TOKEN")?;
        let channel = required(&args.channel, "--channel or SLACK_CHANNEL")?;

        if args.history_limit == 0 {
            bail!("--history-limit must be at least 1");
        }
        if args.page_cap == 0 {
            bail!("--page-cap must be at least 1");
        }
        if args.timeout == Some(0) {
            bail!("--timeout must be at least 1 second");
        }

        let bounds = resolve_bounds(args.since, args.until, args.duration.as_deref(), now)?;

        let formatter = match args.formatter {
            FormatterKind::Text => Formatter::Text {
                reply_indent: args
                    .reply_indent
                    .clone()
                    .unwrap_or_else(|| DEFAULT_REPLY_INDENT.to_string()),
            },
            FormatterKind::Json => Formatter::Json,
        };

        let exporter = match args.exporter {
            ExporterKind::None => Exporter::None,
            ExporterKind::Local => Exporter::Local {
                log_file: args.log_file.clone(),
                file_dir: args
                    .file_dir
                    .clone()
                    .context("local exporter requires --file-dir or SLACKARC_FILE_DIR")?,
            },
        };

        Ok(Self {
            token,
            channel,
            api_url: args.api_url.clone(),
            bounds,
            collector: CollectorConfig {
                history_limit: args.history_limit,
                page_cap: args.page_cap,
            },
            timeout: args.timeout.map(Duration::from_secs),
            formatter,
            exporter,
        })
    }
}

fn required(value: &Option<String>, name: &str) -> anyhow::Result<String> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => bail!("missing required setting {}", name),
    }
}

fn unix_time(secs: i64, flag: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).with_context(|| format!("{} {} is out of range", flag, secs))
}

fn shift(from: DateTime<Utc>, by: TimeDelta) -> anyhow::Result<DateTime<Utc>> {
    from.checked_add_signed(by)
        .context("time window is out of range")
}

/// Turn --since/--until/--duration into a time window.
pub fn resolve_bounds(
    since: Option<i64>,
    until: Option<i64>,
    duration: Option<&str>,
    now: DateTime<Utc>,
) -> anyhow::Result<Bounds> {
    let since = since.map(|s| unix_time(s, "--since")).transpose()?;
    let until = until.map(|u| unix_time(u, "--until")).transpose()?;

    let bounds = match duration {
        None => Bounds::new(since, until),
        Some(duration) => {
            let duration = parse_duration(duration)?;
            match (since, until) {
                (Some(_), Some(_)) => {
                    bail!("--duration cannot be combined with both --since and --until")
                }
                (Some(since), None) => Bounds::new(Some(since), Some(shift(since, duration)?)),
                (None, Some(until)) => Bounds::new(Some(shift(until, -duration)?), Some(until)),
                (None, None) => Bounds::new(Some(shift(now, -duration)?), Some(now)),
            }
        }
    };

    if let (Some(since), Some(until)) = (bounds.since, bounds.until)
        && since > until
    {
        bail!("--since {} is after --until {}", since.timestamp(), until.timestamp());
    }

    Ok(bounds)
}

/// Parse durations such as "90m", "24h" or "1d12h".
pub fn parse_duration(input: &str) -> anyhow::Result<TimeDelta> {
    let whole = Regex::new(r"^(\d+[dhms])+$")?;
    if !whole.is_match(input) {
        bail!(
            "invalid duration {:?}, expected e.g. \"30m\", \"24h\" or \"1d12h\"",
            input
        );
    }

    let part = Regex::new(r"(\d+)([dhms])")?;
    let mut total: i64 = 0;
    for caps in part.captures_iter(input) {
        let amount: i64 = caps[1]
            .parse()
            .with_context(|| format!("duration {:?} is too large", input))?;
        let unit = match &caps[2] {
            "d" => 86_400,
            "h" => 3_600,
            "m" => 60,
            _ => 1,
        };
        total = amount
            .checked_mul(unit)
            .and_then(|secs| total.checked_add(secs))
            .with_context(|| format!("duration {:?} is too large", input))?;
    }

    if total == 0 {
        bail!("duration {:?} is empty", input);
    }

    TimeDelta::try_seconds(total).with_context(|| format!("duration {:?} is too large", input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn args(extra: &[&str]) -> Args {
        let base = ["slackarc", "--token", "xoxb-test", "--channel", "C123"];
        Args::parse_from(base.iter().chain(extra.iter()))
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("90m").unwrap(), TimeDelta::minutes(90));
        assert_eq!(parse_duration("24h").unwrap(), TimeDelta::hours(24));
        assert_eq!(
            parse_duration("1d12h30s").unwrap(),
            TimeDelta::seconds(86_400 + 12 * 3_600 + 30)
        );
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("h").is_err());
        assert!(parse_duration("-1h").is_err());
        assert!(parse_duration("0s").is_err());
    }

    #[test]
    fn test_bounds_without_duration() {
        let bounds = resolve_bounds(Some(1_700_000_000), Some(1_700_003_600), None, at(0)).unwrap();
        assert_eq!(bounds.oldest().as_deref(), Some("1700000000"));
        assert_eq!(bounds.latest().as_deref(), Some("1700003600"));

        let open = resolve_bounds(None, None, None, at(0)).unwrap();
        assert_eq!(open, Bounds::default());
    }

    #[test]
    fn test_bounds_with_duration() {
        let now = at(1_700_010_000);

        let from_since = resolve_bounds(Some(1_700_000_000), None, Some("1h"), now).unwrap();
        assert_eq!(from_since, Bounds::new(Some(at(1_700_000_000)), Some(at(1_700_003_600))));

        let from_until = resolve_bounds(None, Some(1_700_003_600), Some("1h"), now).unwrap();
        assert_eq!(from_until, Bounds::new(Some(at(1_700_000_000)), Some(at(1_700_003_600))));

        let from_now = resolve_bounds(None, None, Some("10m"), now).unwrap();
        assert_eq!(from_now, Bounds::new(Some(at(1_700_009_400)), Some(now)));
    }

    #[test]
    fn test_bounds_rejects_conflicts() {
        assert!(resolve_bounds(Some(1), Some(2), Some("1h"), at(0)).is_err());
        assert!(resolve_bounds(Some(20), Some(10), None, at(0)).is_err());
    }

    #[test]
    fn test_run_config_defaults() {
        let mut defaults = args(&["--file-dir", "/tmp/out"]);
        defaults.log_file = None;
        let config = RunConfig::from_args(&defaults, at(0)).unwrap();

        assert_eq!(config.token, "xoxb-test");
        assert_eq!(config.channel, "C123");
        assert_eq!(config.collector, CollectorConfig::default());
        assert_eq!(config.formatter, Formatter::text());
        assert_eq!(
            config.exporter,
            Exporter::Local {
                log_file: None,
                file_dir: PathBuf::from("/tmp/out"),
            }
        );
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn test_run_config_requires_token_and_channel() {
        let mut missing = args(&["--exporter", "none"]);
        missing.token = None;
        let err = RunConfig::from_args(&missing, at(0)).unwrap_err();
        assert!(err.to_string().contains("SLACK_TOKEN"));

        let mut blank = args(&["--exporter", "none"]);
        blank.channel = Some("  ".to_string());
        let err = RunConfig::from_args(&blank, at(0)).unwrap_err();
        assert!(err.to_string().contains("SLACK_CHANNEL"));
    }

    #[test]
    fn test_local_exporter_requires_file_dir() {
        let mut local = args(&[]);
        local.file_dir = None;
        assert!(RunConfig::from_args(&local, at(0)).is_err());

        let none = args(&["--exporter", "none", "--formatter", "json"]);
        let config = RunConfig::from_args(&none, at(0)).unwrap();
        assert_eq!(config.exporter, Exporter::None);
        assert_eq!(config.formatter, Formatter::Json);
    }

    #[test]
    fn test_merge_settings_keeps_cli_values() {
        let mut cli = args(&[]);
        cli.reply_indent = None;
        let settings = Settings {
            token: Some("from-file".to_string()),
            channel: None,
            log_file: Some(PathBuf::from("/var/log/archive.txt")),
            file_dir: None,
            reply_indent: Some("> ".to_string()),
        };

        let merged = merge_settings(&cli, settings);
        assert_eq!(merged.token.as_deref(), Some("xoxb-test"));
        assert_eq!(merged.channel.as_deref(), Some("C123"));
        assert_eq!(merged.log_file, Some(PathBuf::from("/var/log/archive.txt")));
        assert_eq!(merged.reply_indent.as_deref(), Some("> "));
    }
}

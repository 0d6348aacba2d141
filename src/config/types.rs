// Configuration types module
// Defines the typed configuration consumed by the pipeline and the logger

use crate::context::AppContext;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub send: SendOptions,
    pub app: AppContext,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive for the subscriber, e.g. `info` or `httpsim=debug`
    pub level: String,
    /// Emit one access-log line per transfer
    pub access_log: bool,
    /// `combined`, `common`, `json` or a custom `$variable` pattern
    pub access_log_format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            access_log: false,
            access_log_format: "combined".to_string(),
        }
    }
}

/// Policy for paths with a dot-prefixed component
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Dotfiles {
    Allow,
    Deny,
    #[default]
    Ignore,
}

/// `max-age` given as milliseconds or a duration string such as `"2h"`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum MaxAge {
    Millis(u64),
    Duration(String),
}

impl Default for MaxAge {
    fn default() -> Self {
        Self::Millis(0)
    }
}

const SECOND: f64 = 1000.0;
const MINUTE: f64 = SECOND * 60.0;
const HOUR: f64 = MINUTE * 60.0;
const DAY: f64 = HOUR * 24.0;
const WEEK: f64 = DAY * 7.0;
const YEAR: f64 = DAY * 365.25;

fn unit_millis(unit: &str) -> Option<f64> {
    let factor = match unit {
        "" | "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => 1.0,
        "s" | "sec" | "secs" | "second" | "seconds" => SECOND,
        "m" | "min" | "mins" | "minute" | "minutes" => MINUTE,
        "h" | "hr" | "hrs" | "hour" | "hours" => HOUR,
        "d" | "day" | "days" => DAY,
        "w" | "week" | "weeks" => WEEK,
        "y" | "yr" | "yrs" | "year" | "years" => YEAR,
        _ => return None,
    };
    Some(factor)
}

impl MaxAge {
    /// Resolve to whole milliseconds
    pub fn to_millis(&self) -> Result<u64> {
        match self {
            Self::Millis(ms) => Ok(*ms),
            Self::Duration(text) => parse_duration(text),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_duration(text: &str) -> Result<u64> {
    let invalid = || Error::InvalidDuration(text.to_string());

    let trimmed = text.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let value: f64 = number.parse().map_err(|_| invalid())?;
    let factor = unit_millis(&unit.trim().to_ascii_lowercase()).ok_or_else(invalid)?;

    let millis = (value * factor).round();
    if !millis.is_finite() || millis > u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(millis as u64)
}

/// Options of a single file transfer
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SendOptions {
    pub accept_ranges: bool,
    pub cache_control: bool,
    pub dotfiles: Dotfiles,
    pub etag: bool,
    /// Fallback extensions tried, in order, for extensionless paths
    pub extensions: Vec<String>,
    pub immutable: bool,
    /// Index files tried for slash-terminated paths; empty disables
    pub index: Vec<String>,
    pub last_modified: bool,
    pub max_age: MaxAge,
    pub root: Option<String>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            accept_ranges: true,
            cache_control: true,
            dotfiles: Dotfiles::default(),
            etag: true,
            extensions: Vec::new(),
            immutable: false,
            index: vec!["index.html".to_string()],
            last_modified: true,
            max_age: MaxAge::default(),
            root: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_option_defaults() {
        let options = SendOptions::default();
        assert!(options.accept_ranges && options.cache_control && options.etag);
        assert_eq!(options.dotfiles, Dotfiles::Ignore);
        assert_eq!(options.index, vec!["index.html"]);
        assert_eq!(options.max_age.to_millis().unwrap(), 0);
        assert!(options.root.is_none());
    }

    #[test]
    fn test_duration_strings() {
        let cases = [
            ("1500", 1500),
            ("2s", 2000),
            ("1.5h", 5_400_000),
            ("1d", 86_400_000),
            ("1 week", 604_800_000),
            ("1y", 31_557_600_000),
            ("10 MS", 10),
        ];
        for (input, expected) in cases {
            assert_eq!(
                MaxAge::Duration(input.to_string()).to_millis().unwrap(),
                expected,
                "{input}"
            );
        }
    }

    #[test]
    fn test_invalid_duration() {
        for input in ["", "abc", "5 parsecs", "-1s", "1..2s"] {
            let err = MaxAge::Duration(input.to_string()).to_millis().unwrap_err();
            assert!(matches!(err, Error::InvalidDuration(_)), "{input}");
        }
    }

    #[test]
    fn test_untagged_max_age() {
        let number: MaxAge = serde_json::from_str("60000").unwrap();
        assert_eq!(number, MaxAge::Millis(60000));
        let text: MaxAge = serde_json::from_str("\"1m\"").unwrap();
        assert_eq!(text.to_millis().unwrap(), 60000);
    }

    #[test]
    fn test_dotfiles_lowercase() {
        let policy: Dotfiles = serde_json::from_str("\"deny\"").unwrap();
        assert_eq!(policy, Dotfiles::Deny);
    }
}

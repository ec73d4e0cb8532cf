//! Parsed log records and the inbound JSON payload they are decoded from.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    pub const ALL: [Level; 5] = [
        Level::Debug,
        Level::Info,
        Level::Warning,
        Level::Error,
        Level::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    /// Three-cell marker shown in front of every rendered record.
    pub fn marker(self) -> &'static str {
        match self {
            Level::Debug => "[D]",
            Level::Info => "[I]",
            Level::Warning => "[W]",
            Level::Error => "[E]",
            Level::Critical => "[!]",
        }
    }

    pub fn is_error(self) -> bool {
        matches!(self, Level::Error | Level::Critical)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLevel(pub String);

impl fmt::Display for UnknownLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log level {:?}", self.0)
    }
}

impl std::error::Error for UnknownLevel {}

impl FromStr for Level {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARNING" | "WARN" => Ok(Level::Warning),
            "ERROR" => Ok(Level::Error),
            "CRITICAL" | "FATAL" => Ok(Level::Critical),
            _ => Err(UnknownLevel(s.to_owned())),
        }
    }
}

/// One log entry. Immutable after decoding; shared between the history and
/// the filtered view through `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub source: String,
    pub timestamp: String,
    pub level: Level,
    pub logger_name: String,
    pub message: String,
    pub raw: String,
}

impl Record {
    /// Time portion of the timestamp (`2026-01-02 10:11:12.345` -> `10:11:12.345`).
    pub fn time_part(&self) -> &str {
        match self.timestamp.rsplit_once(' ') {
            Some((_, time)) => time,
            None => &self.timestamp,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default = "unknown_component")]
    component: String,
    #[serde(default)]
    timestamp: String,
    #[serde(default = "default_level")]
    level: String,
    #[serde(default)]
    logger: String,
    message: String,
}

fn unknown_component() -> String {
    "unknown".to_owned()
}

fn default_level() -> String {
    "INFO".to_owned()
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error(transparent)]
    Level(#[from] UnknownLevel),
    #[error("source {0:?} is not enabled")]
    SourceNotEnabled(String),
}

/// Turns one serialized payload into a [`Record`].
///
/// `enabled_sources` restricts which `component` values are accepted; an
/// empty slice accepts everything.
pub fn decode_payload(raw: &str, enabled_sources: &[String]) -> Result<Record, DecodeError> {
    let payload: Payload = serde_json::from_str(raw)?;
    let level = payload.level.parse::<Level>()?;

    if !enabled_sources.is_empty() && !enabled_sources.iter().any(|s| *s == payload.component) {
        return Err(DecodeError::SourceNotEnabled(payload.component));
    }

    Ok(Record {
        source: payload.component,
        timestamp: payload.timestamp,
        level,
        logger_name: payload.logger,
        message: payload.message,
        raw: raw.to_owned(),
    })
}

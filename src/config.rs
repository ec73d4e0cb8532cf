use std::str::FromStr;
use std::time::Duration;

use crossterm::style::Color;

use crate::error::ConfigError;
use crate::history::DEFAULT_MAX_LINES;
use crate::ingest::DEFAULT_QUEUE_CAPACITY;
use crate::input::RESERVED_KEYS;
use crate::layout::MAX_ROWS_PER_RECORD;

pub const DEFAULT_REFRESH: Duration = Duration::from_millis(200);
pub const MIN_REFRESH: Duration = Duration::from_millis(10);
pub const DEFAULT_SCROLL_STEP: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceColor {
    Cyan,
    Yellow,
    Magenta,
    Green,
    Blue,
    Red,
    White,
    Grey,
}

impl SourceColor {
    pub fn to_crossterm(self) -> Color {
        match self {
            SourceColor::Cyan => Color::Cyan,
            SourceColor::Yellow => Color::Yellow,
            SourceColor::Magenta => Color::Magenta,
            SourceColor::Green => Color::Green,
            SourceColor::Blue => Color::Blue,
            SourceColor::Red => Color::Red,
            SourceColor::White => Color::White,
            SourceColor::Grey => Color::Grey,
        }
    }

    fn parse(name: &str) -> Option<Self> {
        let color = match name.to_ascii_lowercase().as_str() {
            "cyan" => SourceColor::Cyan,
            "yellow" => SourceColor::Yellow,
            "magenta" | "purple" => SourceColor::Magenta,
            "green" => SourceColor::Green,
            "blue" => SourceColor::Blue,
            "red" => SourceColor::Red,
            "white" => SourceColor::White,
            "grey" | "gray" => SourceColor::Grey,
            _ => return None,
        };
        Some(color)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub name: String,
    pub color: SourceColor,
    pub key: Option<char>,
}

impl SourceSpec {
    pub fn new(name: &str, color: SourceColor, key: Option<char>) -> Self {
        Self {
            name: name.to_owned(),
            color,
            key,
        }
    }
}

impl FromStr for SourceSpec {
    type Err = ConfigError;

    /// `NAME:COLOR[:KEY]`, e.g. `backend:cyan:b`.
    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidSource {
            spec: spec.to_owned(),
        };
        let mut parts = spec.split(':');
        let name = parts.next().map(str::trim).filter(|n| !n.is_empty()).ok_or_else(invalid)?;
        let color_name = parts.next().map(str::trim).ok_or_else(invalid)?;
        let key = match parts.next().map(str::trim) {
            None | Some("") => None,
            Some(key) => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) if ch.is_ascii_alphanumeric() => Some(ch.to_ascii_lowercase()),
                    _ => return Err(invalid()),
                }
            }
        };
        if parts.next().is_some() {
            return Err(invalid());
        }

        let color = SourceColor::parse(color_name).ok_or_else(|| ConfigError::UnknownColor {
            source_name: name.to_owned(),
            color: color_name.to_owned(),
        })?;
        Ok(SourceSpec::new(name, color, key))
    }
}

pub fn default_sources() -> Vec<SourceSpec> {
    vec![
        SourceSpec::new("backend", SourceColor::Cyan, Some('b')),
        SourceSpec::new("batch", SourceColor::Yellow, Some('w')),
        SourceSpec::new("ray", SourceColor::Magenta, Some('r')),
    ]
}

/// What happens to records that arrive while the view is scrolled back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum FrozenPolicy {
    /// Keep appending to history; the screen stays put until End is pressed.
    #[default]
    Buffer,
    /// Discard arrivals while scrolled, like pause.
    Drop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMode {
    Stdin,
    Command(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub max_lines: usize,
    pub queue_capacity: usize,
    pub refresh: Duration,
    pub sources: Vec<SourceSpec>,
    pub feed: FeedMode,
    pub frozen_policy: FrozenPolicy,
    pub scroll_step: usize,
    pub max_rows_per_record: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            refresh: DEFAULT_REFRESH,
            sources: default_sources(),
            feed: FeedMode::Stdin,
            frozen_policy: FrozenPolicy::default(),
            scroll_step: DEFAULT_SCROLL_STEP,
            max_rows_per_record: MAX_ROWS_PER_RECORD,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_lines == 0 {
            return Err(ConfigError::ZeroCapacity("max-lines"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("queue-capacity"));
        }
        if self.scroll_step == 0 {
            return Err(ConfigError::ZeroCapacity("scroll-step"));
        }
        if self.refresh < MIN_REFRESH {
            return Err(ConfigError::RefreshTooShort {
                min_ms: MIN_REFRESH.as_millis() as u64,
                got_ms: self.refresh.as_millis() as u64,
            });
        }
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }

        let mut seen_names: Vec<&str> = Vec::new();
        let mut seen_keys: Vec<char> = Vec::new();
        for source in &self.sources {
            if seen_names.contains(&source.name.as_str()) {
                return Err(ConfigError::DuplicateSource(source.name.clone()));
            }
            seen_names.push(&source.name);

            if let Some(key) = source.key {
                let key = key.to_ascii_lowercase();
                if RESERVED_KEYS.contains(&key) || key.is_ascii_digit() || seen_keys.contains(&key) {
                    return Err(ConfigError::KeyInUse {
                        source_name: source.name.clone(),
                        key,
                    });
                }
                seen_keys.push(key);
            }
        }
        Ok(())
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name.clone()).collect()
    }

    pub fn source_keys(&self) -> Vec<(char, String)> {
        self.sources
            .iter()
            .filter_map(|s| s.key.map(|key| (key, s.name.clone())))
            .collect()
    }
}

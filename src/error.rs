use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid source spec {spec:?}: expected NAME:COLOR[:KEY]")]
    InvalidSource { spec: String },
    #[error("unknown color {color:?} for source {source_name:?}")]
    UnknownColor { source_name: String, color: String },
    #[error("duplicate source {0:?}")]
    DuplicateSource(String),
    #[error("shortcut key {key:?} for source {source_name:?} is already bound")]
    KeyInUse { source_name: String, key: char },
    #[error("at least one log source must be enabled")]
    NoSources,
    #[error("{0} must be greater than zero")]
    ZeroCapacity(&'static str),
    #[error("refresh interval must be at least {min_ms}ms, got {got_ms}ms")]
    RefreshTooShort { min_ms: u64, got_ms: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn { command: String, source: io::Error },
    #[error("stdin feed has ended and cannot be reopened")]
    StdinClosed,
    #[error("feed already running")]
    AlreadyRunning,
}

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Backend(#[from] arboard::Error),
    #[error("clipboard could not be opened")]
    NotOpened,
}

#[derive(Debug, thiserror::Error)]
pub enum LogInitError {
    #[error("failed to open log file {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to configure logger: {0}")]
    Configure(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Logging(#[from] LogInitError),
    #[error("terminal: {0}")]
    Terminal(#[from] io::Error),
    #[error("stdout must be a TTY (run this in a terminal, not redirected)")]
    NotATerminal,
    #[error("stdin is a terminal: pipe JSON lines in or pass --exec CMD")]
    NoInput,
}

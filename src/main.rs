use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;

use logmon::app::App;
use logmon::clipboard::SystemClipboard;
use logmon::config::{
    Config, DEFAULT_REFRESH, DEFAULT_SCROLL_STEP, FeedMode, FrozenPolicy, SourceSpec,
    default_sources,
};
use logmon::error::AppError;
use logmon::feed::{
    CommandFeed, Feed, FeedSink, Health, HealthFlag, StdinFeed, terminate_pipeline_group_if_safe,
};
use logmon::history::DEFAULT_MAX_LINES;
use logmon::ingest::{DEFAULT_QUEUE_CAPACITY, IngestQueue};
use logmon::input::{Key, spawn_key_reader};
use logmon::logging::{self, LogConfig, LogLevel};
use logmon::render::TerminalSink;

const KEY_CHANNEL_CAPACITY: usize = 128;

/// Follow JSON log records from several sources in one terminal view.
///
/// Reads one JSON object per line from stdin (`tail -f app.jsonl | logmon`)
/// or from a command started with --exec.
#[derive(Debug, Parser)]
#[command(name = "logmon", version, about)]
struct Cli {
    /// Records kept in history; the oldest are evicted first.
    #[arg(short = 'm', long, env = "LOGMON_MAX_LINES", default_value_t = DEFAULT_MAX_LINES)]
    max_lines: usize,

    /// Redraw interval in milliseconds.
    #[arg(long, default_value_t = DEFAULT_REFRESH.as_millis() as u64)]
    refresh_ms: u64,

    /// Records buffered between the reader and the UI before the oldest are dropped.
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Enabled source as NAME:COLOR[:KEY]; repeat for several.
    #[arg(long = "source", value_name = "NAME:COLOR[:KEY]")]
    sources: Vec<SourceSpec>,

    /// Only the backend source (plus ray).
    #[arg(long, conflicts_with_all = ["batch_only", "sources"])]
    backend_only: bool,

    /// Only the batch source (plus ray).
    #[arg(long, conflicts_with = "sources")]
    batch_only: bool,

    /// Shell command whose stdout carries the records; reconnect reruns it.
    #[arg(long, value_name = "CMD")]
    exec: Option<String>,

    /// What to do with records arriving while scrolled back.
    #[arg(long, value_enum, default_value_t = FrozenPolicy::Buffer)]
    frozen_policy: FrozenPolicy,

    /// Rows moved per arrow key or wheel notch.
    #[arg(long, default_value_t = DEFAULT_SCROLL_STEP)]
    scroll_step: usize,

    /// Write diagnostics to this file (nothing is logged otherwise).
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Diagnostic verbosity; LOGMON_LOG overrides with a full filter.
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

impl Cli {
    fn to_config(&self) -> Config {
        let sources = if !self.sources.is_empty() {
            self.sources.clone()
        } else {
            default_sources()
                .into_iter()
                .filter(|source| match source.name.as_str() {
                    "backend" => !self.batch_only,
                    "batch" => !self.backend_only,
                    _ => true,
                })
                .collect()
        };

        Config {
            max_lines: self.max_lines,
            queue_capacity: self.queue_capacity,
            refresh: Duration::from_millis(self.refresh_ms),
            sources,
            feed: match &self.exec {
                Some(command) => FeedMode::Command(command.clone()),
                None => FeedMode::Stdin,
            },
            frozen_policy: self.frozen_policy,
            scroll_step: self.scroll_step,
            ..Config::default()
        }
    }

    fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level,
            file: self.log_file.clone(),
        }
    }
}

fn build_feed(config: &Config, sink: FeedSink) -> Box<dyn Feed> {
    match &config.feed {
        FeedMode::Stdin => Box::new(StdinFeed::new(sink)),
        FeedMode::Command(command) => Box::new(CommandFeed::new(command.clone(), sink)),
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let config = cli.to_config();
    config.validate()?;

    if !io::stdout().is_terminal() {
        return Err(AppError::NotATerminal);
    }
    if config.feed == FeedMode::Stdin && io::stdin().is_terminal() {
        return Err(AppError::NoInput);
    }

    logging::init(&cli.log_config())?;
    tracing::info!(
        max_lines = config.max_lines,
        refresh_ms = config.refresh.as_millis() as u64,
        sources = ?config.source_names(),
        "monitor starting"
    );

    let queue = IngestQueue::with_capacity(config.queue_capacity);
    let health = HealthFlag::new(Health::Connecting);
    let feed_sink = FeedSink {
        tx: queue.sender(),
        health: health.clone(),
        enabled_sources: Arc::from(config.source_names()),
    };
    let feed = build_feed(&config, feed_sink);

    let (key_tx, key_rx): (SyncSender<Key>, Receiver<Key>) =
        mpsc::sync_channel(KEY_CHANNEL_CAPACITY);
    spawn_key_reader(key_tx)?;

    let mut app = App::new(
        &config,
        queue,
        health,
        feed,
        Box::new(SystemClipboard::new()),
    );
    app.start();

    {
        let mut sink = TerminalSink::enter()?;
        loop {
            let keys = key_rx.try_iter().collect::<Vec<Key>>();
            let outcome = app.tick(Instant::now(), keys, &mut sink)?;
            if outcome.quit {
                break;
            }
            thread::sleep(config.refresh);
        }
    }

    app.shutdown();
    if config.feed == FeedMode::Stdin {
        terminate_pipeline_group_if_safe();
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("logmon failed: {err}");
        std::process::exit(1);
    }
}

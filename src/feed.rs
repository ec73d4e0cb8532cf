//! Producers that turn an external line stream into records on the ingest queue.
//!
//! Each feed runs its reader on a background thread and reports liveness
//! through a [`HealthFlag`]. Reconnecting never waits for the new stream to
//! produce anything; the flag flips once the reader sees data or hits EOF.

use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crate::error::FeedError;
use crate::ingest::IngestSender;
use crate::record::decode_payload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Connecting,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct HealthFlag(Arc<AtomicU8>);

impl HealthFlag {
    pub fn new(initial: Health) -> Self {
        Self(Arc::new(AtomicU8::new(encode(initial))))
    }

    pub fn get(&self) -> Health {
        match self.0.load(Ordering::Acquire) {
            0 => Health::Connecting,
            1 => Health::Connected,
            _ => Health::Disconnected,
        }
    }

    pub fn set(&self, health: Health) {
        self.0.store(encode(health), Ordering::Release);
    }
}

impl Default for HealthFlag {
    fn default() -> Self {
        Self::new(Health::Connecting)
    }
}

fn encode(health: Health) -> u8 {
    match health {
        Health::Connecting => 0,
        Health::Connected => 1,
        Health::Disconnected => 2,
    }
}

/// The transport collaborator as seen by the UI loop.
pub trait Feed: Send {
    fn start(&mut self) -> Result<(), FeedError>;
    /// Tears down the current stream (if any) and starts a fresh one.
    fn reconnect(&mut self) -> Result<(), FeedError>;
    fn stop(&mut self);
    fn describe(&self) -> String;
}

/// Everything a reader thread needs to publish records.
#[derive(Debug, Clone)]
pub struct FeedSink {
    pub tx: IngestSender,
    pub health: HealthFlag,
    pub enabled_sources: Arc<[String]>,
}

impl FeedSink {
    /// Decodes and enqueues one line. Malformed lines are dropped.
    pub fn publish_line(&self, line: &str) -> bool {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return false;
        }
        match decode_payload(line, &self.enabled_sources) {
            Ok(record) => {
                self.tx.push(record);
                true
            }
            Err(err) => {
                tracing::trace!(error = %err, "dropping inbound payload");
                false
            }
        }
    }
}

/// Reads `reader` line by line until EOF, error, or `is_current` turns false.
fn pump_lines<R: Read>(reader: R, sink: &FeedSink, is_current: impl Fn() -> bool) {
    let mut reader = BufReader::new(reader);
    let mut buf = String::new();
    let mut marked_connected = false;

    loop {
        buf.clear();
        match reader.read_line(&mut buf) {
            Ok(0) => break,
            Ok(_) => {
                if !is_current() {
                    return;
                }
                if !marked_connected {
                    sink.health.set(Health::Connected);
                    marked_connected = true;
                }
                sink.publish_line(&buf);
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                tracing::trace!("skipping non-utf8 line");
                continue;
            }
            Err(err) => {
                tracing::warn!(error = %err, "feed read failed");
                break;
            }
        }
    }

    if is_current() {
        sink.health.set(Health::Disconnected);
    }
}

/// JSON lines piped into our stdin, e.g. `tail -f app.jsonl | logmon`.
#[derive(Debug)]
pub struct StdinFeed {
    sink: FeedSink,
    reader: Option<JoinHandle<()>>,
}

impl StdinFeed {
    pub fn new(sink: FeedSink) -> Self {
        Self { sink, reader: None }
    }
}

impl Feed for StdinFeed {
    fn start(&mut self) -> Result<(), FeedError> {
        if self.reader.is_some() {
            return Err(FeedError::AlreadyRunning);
        }
        let sink = self.sink.clone();
        sink.health.set(Health::Connected);
        self.reader = Some(thread::spawn(move || {
            pump_lines(io::stdin().lock(), &sink, || true);
        }));
        tracing::info!("reading records from stdin");
        Ok(())
    }

    fn reconnect(&mut self) -> Result<(), FeedError> {
        match &self.reader {
            Some(handle) if !handle.is_finished() => {
                self.sink.health.set(Health::Connected);
                Ok(())
            }
            Some(_) => Err(FeedError::StdinClosed),
            None => self.start(),
        }
    }

    fn stop(&mut self) {
        // Blocking stdin reads cannot be interrupted; the thread dies with the process.
        self.reader = None;
    }

    fn describe(&self) -> String {
        "stdin".to_owned()
    }
}

/// Runs a shell command and reads JSON lines from its stdout. Reconnecting
/// kills the child and spawns it again.
#[derive(Debug)]
pub struct CommandFeed {
    command: String,
    sink: FeedSink,
    child: Option<Child>,
    generation: Arc<AtomicU64>,
}

impl CommandFeed {
    pub fn new(command: impl Into<String>, sink: FeedSink) -> Self {
        Self {
            command: command.into(),
            sink,
            child: None,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn shell_command(&self) -> Command {
        #[cfg(windows)]
        {
            let mut command = Command::new("cmd");
            command.arg("/C").arg(&self.command);
            command
        }
        #[cfg(not(windows))]
        {
            use std::os::unix::process::CommandExt;

            // Own process group, so stopping reaches every stage of a pipeline.
            let mut command = Command::new("sh");
            command.arg("-c").arg(&self.command).process_group(0);
            command
        }
    }

    fn kill_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            #[cfg(unix)]
            kill_process_group(&child);
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Feed for CommandFeed {
    fn start(&mut self) -> Result<(), FeedError> {
        if self.child.is_some() {
            return Err(FeedError::AlreadyRunning);
        }

        self.sink.health.set(Health::Connecting);
        let mut child = self
            .shell_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| {
                self.sink.health.set(Health::Disconnected);
                FeedError::Spawn {
                    command: self.command.clone(),
                    source,
                }
            })?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            self.sink.health.set(Health::Disconnected);
            return Err(FeedError::Spawn {
                command: self.command.clone(),
                source: io::Error::other("child stdout was not captured"),
            });
        };

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let current = Arc::clone(&self.generation);
        let sink = self.sink.clone();
        thread::spawn(move || {
            let is_current = || current.load(Ordering::Acquire) == generation;
            pump_lines(stdout, &sink, is_current);
        });

        tracing::info!(command = %self.command, pid = child.id(), "feed command started");
        self.child = Some(child);
        Ok(())
    }

    fn reconnect(&mut self) -> Result<(), FeedError> {
        tracing::info!(command = %self.command, "reconnecting feed");
        self.stop();
        self.start()
    }

    fn stop(&mut self) {
        // Retire the reader first so its EOF does not flip the flag.
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.kill_child();
    }

    fn describe(&self) -> String {
        format!("exec: {}", self.command)
    }
}

impl Drop for CommandFeed {
    fn drop(&mut self) {
        self.kill_child();
    }
}

#[cfg(unix)]
fn kill_process_group(child: &Child) {
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        unsafe {
            let _ = libc::killpg(pgid, libc::SIGKILL);
        }
    }
}

/// Interrupts the shell pipeline we were started in (`tail -f x | logmon`).
/// Only done when job control gave the pipeline a group of its own, i.e. our
/// group differs from the parent shell's; otherwise the shell would be hit too.
#[cfg(unix)]
pub fn terminate_pipeline_group_if_safe() {
    let (own_group, shell_group) = unsafe { (libc::getpgrp(), libc::getpgid(libc::getppid())) };
    if own_group <= 0 || own_group == shell_group {
        return;
    }

    tracing::debug!(pgid = own_group, "interrupting upstream pipeline");
    unsafe {
        libc::signal(libc::SIGINT, libc::SIG_IGN);
        libc::killpg(own_group, libc::SIGINT);
    }
}

#[cfg(not(unix))]
pub fn terminate_pipeline_group_if_safe() {}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    use super::{CommandFeed, Feed, FeedSink, Health, HealthFlag, pump_lines};
    use crate::ingest::IngestQueue;

    fn sink(queue: &IngestQueue, sources: &[&str]) -> FeedSink {
        FeedSink {
            tx: queue.sender(),
            health: HealthFlag::default(),
            enabled_sources: sources.iter().map(|s| s.to_string()).collect::<Vec<_>>().into(),
        }
    }

    fn wait_for(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn health_flag_round_trips_states() {
        let flag = HealthFlag::default();
        assert_eq!(flag.get(), Health::Connecting);
        let shared = flag.clone();
        shared.set(Health::Disconnected);
        assert_eq!(flag.get(), Health::Disconnected);
    }

    #[test]
    fn pump_decodes_valid_lines_and_drops_the_rest() {
        let queue = IngestQueue::with_capacity(10);
        let sink = sink(&queue, &["backend"]);
        let input = concat!(
            "{\"component\":\"backend\",\"message\":\"one\"}\n",
            "garbage\n",
            "\n",
            "{\"component\":\"batch\",\"message\":\"filtered\"}\n",
            "{\"component\":\"backend\",\"message\":\"two\"}\r\n",
        );

        pump_lines(Cursor::new(input), &sink, || true);

        let messages = queue
            .drain_all()
            .into_iter()
            .map(|r| r.message)
            .collect::<Vec<_>>();
        assert_eq!(messages, vec!["one", "two"]);
        assert_eq!(sink.health.get(), Health::Disconnected);
    }

    #[test]
    fn retired_reader_leaves_health_alone() {
        let queue = IngestQueue::with_capacity(10);
        let sink = sink(&queue, &[]);
        sink.health.set(Health::Connected);

        pump_lines(Cursor::new("{\"message\":\"late\"}\n"), &sink, || false);

        assert!(queue.is_empty());
        assert_eq!(sink.health.get(), Health::Connected);
    }

    #[cfg(unix)]
    #[test]
    fn command_feed_streams_child_output_and_reconnects() {
        let queue = IngestQueue::with_capacity(10);
        let sink = sink(&queue, &[]);
        let health = sink.health.clone();
        let mut feed = CommandFeed::new(
            r#"printf '{"component":"ray","message":"hello"}\n'"#,
            sink,
        );

        feed.start().expect("sh should spawn");
        assert!(wait_for(|| health.get() == Health::Disconnected));
        assert_eq!(queue.drain_all().len(), 1);

        feed.reconnect().expect("respawn should succeed");
        assert!(wait_for(|| health.get() == Health::Disconnected && !queue.is_empty()));
        assert_eq!(queue.drain_all()[0].source, "ray");
        feed.stop();
        assert_eq!(health.get(), Health::Disconnected);
    }

    #[cfg(target_os = "linux")]
    fn process_gone(pid: i32) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Err(_) => true,
            Ok(stat) => stat
                .rsplit_once(')')
                .is_some_and(|(_, rest)| rest.trim_start().starts_with('Z')),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn stop_kills_every_stage_of_the_command() {
        let queue = IngestQueue::with_capacity(10);
        let mut feed = CommandFeed::new(
            r#"sleep 30 & echo "{\"message\":\"$!\"}"; wait"#,
            sink(&queue, &[]),
        );
        feed.start().expect("sh should spawn");

        let mut drained = Vec::new();
        assert!(wait_for(|| {
            drained.extend(queue.drain_all());
            !drained.is_empty()
        }));
        let pid = drained[0].message.parse::<i32>().expect("pid of background sleep");
        assert!(!process_gone(pid));

        feed.stop();
        assert!(wait_for(|| process_gone(pid)));
    }

    #[test]
    fn command_feed_describes_itself() {
        let queue = IngestQueue::with_capacity(1);
        let feed = CommandFeed::new("kubectl logs -f app", sink(&queue, &[]));
        assert_eq!(feed.describe(), "exec: kubectl logs -f app");
    }
}

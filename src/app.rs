//! The UI loop state: one [`App::tick`] drains the ingest queue, applies
//! input, and redraws only when something visible changed.

use std::io;
use std::time::{Duration, Instant};

use crate::clipboard::Clipboard;
use crate::config::{Config, FrozenPolicy, SourceColor};
use crate::feed::{Feed, Health, HealthFlag};
use crate::ingest::IngestQueue;
use crate::input::{Input, InputEvent, KeyMap};
use crate::layout::layout_record;
use crate::record::Record;
use crate::render::{
    Body, FOOTER, Frame, RenderSink, RenderedRecord, StatusBlock, StatusState, body_viewport,
    describe_filters, describe_stats,
};
use crate::scroll::{ScrollState, Viewport};
use crate::view::LogStore;

const STATUS_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub accepted: usize,
    pub rendered: bool,
    pub quit: bool,
}

pub struct App {
    store: LogStore,
    scroll: ScrollState,
    queue: IngestQueue,
    health: HealthFlag,
    feed: Box<dyn Feed>,
    clipboard: Box<dyn Clipboard>,
    keymap: KeyMap,
    sources: Vec<(String, SourceColor)>,
    frozen_policy: FrozenPolicy,
    max_rows_per_record: usize,
    search_prompt: Option<String>,
    status_message: Option<(String, Instant)>,
    last_health: Option<Health>,
    last_size: Option<(u16, u16)>,
    viewport: Viewport,
    input_dirty: bool,
    quit: bool,
}

impl App {
    pub fn new(
        config: &Config,
        queue: IngestQueue,
        health: HealthFlag,
        feed: Box<dyn Feed>,
        clipboard: Box<dyn Clipboard>,
    ) -> Self {
        Self {
            store: LogStore::new(config.max_lines),
            scroll: ScrollState::new(config.max_rows_per_record),
            queue,
            health,
            feed,
            clipboard,
            keymap: KeyMap::new(config.source_keys(), config.scroll_step),
            sources: config
                .sources
                .iter()
                .map(|s| (s.name.clone(), s.color))
                .collect(),
            frozen_policy: config.frozen_policy,
            max_rows_per_record: config.max_rows_per_record,
            search_prompt: None,
            status_message: None,
            last_health: None,
            last_size: None,
            viewport: Viewport::new(0, 0),
            input_dirty: false,
            quit: false,
        }
    }

    pub fn start(&mut self) {
        if let Err(err) = self.feed.start() {
            tracing::warn!(error = %err, feed = %self.feed.describe(), "feed failed to start");
            self.health.set(Health::Disconnected);
            self.set_status(format!("feed failed to start: {err}"), Instant::now());
        }
    }

    pub fn shutdown(&mut self) {
        self.feed.stop();
        tracing::info!(
            buffered = self.store.history().len(),
            dropped = self.queue.dropped(),
            "monitor stopped"
        );
    }

    pub fn is_searching(&self) -> bool {
        self.search_prompt.is_some()
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    pub fn scroll(&self) -> &ScrollState {
        &self.scroll
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_ref().map(|(message, _)| message.as_str())
    }

    /// One pass of the UI loop: drain the ingest queue, apply input in
    /// order, then redraw if anything visible changed.
    ///
    /// Keys go through the key map one at a time, so a `/` earlier in the
    /// batch turns the following letters into search text.
    pub fn tick<I: Into<Input>>(
        &mut self,
        now: Instant,
        inputs: impl IntoIterator<Item = I>,
        sink: &mut dyn RenderSink,
    ) -> io::Result<TickOutcome> {
        let drained = self.queue.drain_all();
        let accepted = self.ingest(drained);

        for input in inputs {
            let event = match input.into() {
                Input::Event(event) => Some(event),
                Input::Key(key) => self.keymap.event_for(key, self.is_searching()),
            };
            if let Some(event) = event {
                self.handle(event, now);
            }
        }

        self.present(now, accepted, sink)
    }

    fn present(
        &mut self,
        now: Instant,
        accepted: usize,
        sink: &mut dyn RenderSink,
    ) -> io::Result<TickOutcome> {
        let input_dirty = std::mem::take(&mut self.input_dirty);

        let size = sink.size()?;
        let resized = self.last_size != Some(size);
        self.last_size = Some(size);
        self.viewport = body_viewport(size.0, size.1);

        let health = self.health.get();
        let health_changed = self.last_health != Some(health);
        self.last_health = Some(health);

        let status_expired = self
            .status_message
            .as_ref()
            .is_some_and(|(_, at)| now.duration_since(*at) >= STATUS_TTL);
        if status_expired {
            self.status_message = None;
        }

        // A scrolled view only moves on direct user action so it can be read
        // or copied while logs keep arriving.
        let dirty = if self.scroll.is_live() {
            accepted > 0 || input_dirty || resized || health_changed || status_expired
        } else {
            input_dirty || resized
        };

        if dirty {
            let frame = self.frame();
            sink.draw(&frame)?;
        }

        Ok(TickOutcome {
            accepted,
            rendered: dirty,
            quit: self.quit,
        })
    }

    /// Moves drained records into history, honouring pause and the frozen policy.
    pub fn ingest(&mut self, records: Vec<Record>) -> usize {
        if records.is_empty() {
            return 0;
        }
        if !self.scroll.is_live() && self.frozen_policy == FrozenPolicy::Drop {
            return 0;
        }
        records
            .into_iter()
            .filter_map(|record| self.store.add(record).then_some(()))
            .count()
    }

    pub fn handle(&mut self, event: InputEvent, now: Instant) {
        self.input_dirty = true;
        match event {
            InputEvent::Quit => self.quit = true,
            InputEvent::TogglePause => {
                let paused = !self.store.is_paused();
                self.store.set_paused(paused);
                tracing::debug!(paused, "pause toggled");
            }
            InputEvent::Clear => self.store.clear(),
            InputEvent::SetLevelFilter(level) => self.store.set_level_filter(level),
            InputEvent::SetSourceFilter(source) => self.store.set_source_filter(source),
            InputEvent::ClearFilters => self.store.clear_filters(),
            InputEvent::ScrollUp(rows) => self.scroll.scroll_up(rows),
            InputEvent::ScrollDown(rows) => self.scroll.scroll_down(rows),
            InputEvent::PageUp => self.scroll.scroll_up(self.viewport.rows.max(1)),
            InputEvent::PageDown => self.scroll.scroll_down(self.viewport.rows.max(1)),
            InputEvent::JumpTop => self.scroll.scroll_to_top(),
            InputEvent::JumpBottom => self.scroll.scroll_to_bottom(),
            InputEvent::Reconnect => self.reconnect(now),
            InputEvent::CopyToClipboard => self.copy_view(now),
            InputEvent::BeginSearch => {
                self.search_prompt = Some(self.store.filter().search().to_owned());
            }
            InputEvent::SearchInput(ch) => {
                if let Some(prompt) = &mut self.search_prompt {
                    prompt.push(ch);
                }
            }
            InputEvent::SearchBackspace => {
                if let Some(prompt) = &mut self.search_prompt {
                    prompt.pop();
                }
            }
            InputEvent::CommitSearch => {
                if let Some(prompt) = self.search_prompt.take() {
                    self.store.set_search(prompt);
                }
            }
            InputEvent::CancelSearch => self.search_prompt = None,
        }
    }

    fn reconnect(&mut self, now: Instant) {
        match self.feed.reconnect() {
            Ok(()) => {
                self.set_status(format!("reconnecting to {}", self.feed.describe()), now);
            }
            Err(err) => {
                tracing::warn!(error = %err, "reconnect failed");
                self.health.set(Health::Disconnected);
                self.set_status(format!("reconnect failed: {err}"), now);
            }
        }
    }

    /// Raw form of every record in the filtered view, one per line.
    pub fn export_text(&mut self) -> (usize, String) {
        let view = self.store.view();
        let text = view
            .iter()
            .map(|record| record.raw.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        (view.len(), text)
    }

    fn copy_view(&mut self, now: Instant) {
        let (count, text) = self.export_text();
        match self.clipboard.copy(&text) {
            Ok(()) => self.set_status(format!("copied {count} lines"), now),
            Err(err) => {
                tracing::warn!(error = %err, "clipboard copy failed");
                self.set_status(format!("copy failed: {err}"), now);
            }
        }
    }

    fn set_status(&mut self, message: String, now: Instant) {
        self.status_message = Some((message, now));
    }

    fn source_color(&self, source: &str) -> SourceColor {
        self.sources
            .iter()
            .find(|(name, _)| name == source)
            .map(|(_, color)| *color)
            .unwrap_or(SourceColor::White)
    }

    /// Clamps the scroll offset for the current viewport and builds the frame.
    pub fn frame(&mut self) -> Frame {
        let view = self.store.view();
        self.scroll.clamp(&view, self.viewport);
        let window = self.scroll.select_window(&view, self.viewport);

        let body = if window.is_empty() {
            Body::Empty
        } else {
            Body::Records(
                window
                    .iter()
                    .map(|record| RenderedRecord {
                        color: self.source_color(&record.source),
                        level: record.level,
                        rows: layout_record(record, self.viewport.width, self.max_rows_per_record),
                    })
                    .collect(),
            )
        };

        let stats = self.store.stats();
        Frame {
            size: self.last_size.unwrap_or((0, 0)),
            status: StatusBlock {
                state: StatusState::resolve(
                    self.health.get(),
                    self.store.is_paused(),
                    self.scroll.is_live(),
                    self.frozen_policy,
                ),
                feed: self.feed.describe(),
                filters: describe_filters(self.store.filter()),
                stats: describe_stats(&stats),
                dropped: self.queue.dropped(),
                message: self.status_message().map(str::to_owned),
                search_prompt: self.search_prompt.clone(),
            },
            body,
            footer: FOOTER,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use super::App;
    use crate::clipboard::Clipboard;
    use crate::config::{Config, FrozenPolicy};
    use crate::error::{ClipboardError, FeedError};
    use crate::feed::{Feed, Health, HealthFlag};
    use crate::ingest::{IngestQueue, IngestSender};
    use crate::input::{InputEvent, Key};
    use crate::record::{Level, Record};
    use crate::render::{Body, Frame, RenderSink, StatusState};

    struct RecordingSink {
        size: (u16, u16),
        frames: Vec<Frame>,
    }

    impl RecordingSink {
        fn new(cols: u16, rows: u16) -> Self {
            Self {
                size: (cols, rows),
                frames: Vec::new(),
            }
        }

        fn last(&self) -> &Frame {
            self.frames.last().expect("at least one frame drawn")
        }
    }

    impl RenderSink for RecordingSink {
        fn size(&self) -> io::Result<(u16, u16)> {
            Ok(self.size)
        }

        fn draw(&mut self, frame: &Frame) -> io::Result<()> {
            self.frames.push(frame.clone());
            Ok(())
        }
    }

    struct FakeFeed {
        reconnects: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Feed for FakeFeed {
        fn start(&mut self) -> Result<(), FeedError> {
            Ok(())
        }

        fn reconnect(&mut self) -> Result<(), FeedError> {
            self.reconnects.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(FeedError::StdinClosed)
            } else {
                Ok(())
            }
        }

        fn stop(&mut self) {}

        fn describe(&self) -> String {
            "fake".to_owned()
        }
    }

    struct FakeClipboard {
        copied: Arc<parking_lot::Mutex<Vec<String>>>,
        fail: bool,
    }

    impl Clipboard for FakeClipboard {
        fn copy(&mut self, text: &str) -> Result<(), ClipboardError> {
            if self.fail {
                return Err(ClipboardError::NotOpened);
            }
            self.copied.lock().push(text.to_owned());
            Ok(())
        }
    }

    struct Harness {
        app: App,
        tx: IngestSender,
        health: HealthFlag,
        reconnects: Arc<AtomicUsize>,
        copied: Arc<parking_lot::Mutex<Vec<String>>>,
        sink: RecordingSink,
        now: Instant,
    }

    impl Harness {
        fn tick(&mut self, events: Vec<InputEvent>) -> super::TickOutcome {
            self.now += Duration::from_millis(200);
            self.app
                .tick(self.now, events, &mut self.sink)
                .expect("recording sink never fails")
        }

        fn type_keys(&mut self, keys: Vec<Key>) -> super::TickOutcome {
            self.now += Duration::from_millis(200);
            self.app
                .tick(self.now, keys, &mut self.sink)
                .expect("recording sink never fails")
        }

        fn push(&self, source: &str, level: Level, message: &str) {
            self.tx.push(record(source, level, message));
        }
    }

    fn harness_with(config: Config, feed_fails: bool, clipboard_fails: bool) -> Harness {
        let queue = IngestQueue::with_capacity(config.queue_capacity);
        let tx = queue.sender();
        let health = HealthFlag::new(Health::Connected);
        let reconnects = Arc::new(AtomicUsize::new(0));
        let copied = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let feed = FakeFeed {
            reconnects: Arc::clone(&reconnects),
            fail: feed_fails,
        };
        let clipboard = FakeClipboard {
            copied: Arc::clone(&copied),
            fail: clipboard_fails,
        };
        let app = App::new(&config, queue, health.clone(), Box::new(feed), Box::new(clipboard));

        Harness {
            app,
            tx,
            health,
            reconnects,
            copied,
            sink: RecordingSink::new(100, 30),
            now: Instant::now(),
        }
    }

    fn harness() -> Harness {
        harness_with(Config::default(), false, false)
    }

    fn record(source: &str, level: Level, message: &str) -> Record {
        Record {
            source: source.to_owned(),
            timestamp: "2026-03-04 05:06:07.890".to_owned(),
            level,
            logger_name: "svc".to_owned(),
            message: message.to_owned(),
            raw: format!(r#"{{"component":"{source}","message":"{message}"}}"#),
        }
    }

    fn shown_messages(frame: &Frame) -> Vec<String> {
        match &frame.body {
            Body::Empty => Vec::new(),
            Body::Records(records) => records
                .iter()
                .map(|r| crate::layout::row_text(&r.rows[0]))
                .map(|text| text.rsplit("svc: ").next().unwrap_or_default().to_owned())
                .collect(),
        }
    }

    #[test]
    fn first_tick_renders_empty_state() {
        let mut h = harness();
        let outcome = h.tick(Vec::new());
        assert!(outcome.rendered);
        assert_eq!(h.sink.last().body, Body::Empty);
        assert_eq!(h.sink.last().status.state, StatusState::Live);
        assert_eq!(h.sink.last().status.stats, "No logs yet");
    }

    #[test]
    fn live_mode_redraws_on_arrivals_only() {
        let mut h = harness();
        h.tick(Vec::new());

        assert!(!h.tick(Vec::new()).rendered);

        h.push("backend", Level::Info, "hello");
        let outcome = h.tick(Vec::new());
        assert_eq!(outcome.accepted, 1);
        assert!(outcome.rendered);
        assert_eq!(shown_messages(h.sink.last()), vec!["hello"]);
    }

    #[test]
    fn frozen_view_ignores_arrivals_until_input() {
        let mut h = harness();
        for n in 0..40 {
            h.push("backend", Level::Info, &format!("m{n}"));
        }
        h.tick(Vec::new());
        h.tick(vec![InputEvent::ScrollUp(6)]);
        assert!(!h.app.scroll().is_live());
        let frozen_frames = h.sink.frames.len();

        h.push("backend", Level::Info, "late");
        let outcome = h.tick(Vec::new());
        assert_eq!(outcome.accepted, 1);
        assert!(!outcome.rendered);
        assert_eq!(h.sink.frames.len(), frozen_frames);
        assert_eq!(h.app.store().stats().total(), 41);

        h.tick(vec![InputEvent::JumpBottom]);
        assert_eq!(shown_messages(h.sink.last()).last().map(String::as_str), Some("late"));
    }

    #[test]
    fn frozen_buffer_policy_keeps_appending() {
        let mut h = harness_with(Config::default(), false, false);
        for n in 0..40 {
            h.push("batch", Level::Info, &format!("m{n}"));
        }
        h.tick(vec![InputEvent::ScrollUp(10)]);
        h.push("batch", Level::Info, "while frozen");
        h.tick(Vec::new());
        assert_eq!(h.app.store().history().len(), 41);
    }

    #[test]
    fn frozen_drop_policy_discards_arrivals() {
        let config = Config {
            frozen_policy: FrozenPolicy::Drop,
            ..Config::default()
        };
        let mut h = harness_with(config, false, false);
        for n in 0..40 {
            h.push("batch", Level::Info, &format!("m{n}"));
        }
        h.tick(vec![InputEvent::ScrollUp(10)]);
        assert_eq!(
            h.sink.last().status.state,
            StatusState::Frozen(FrozenPolicy::Drop)
        );

        h.push("batch", Level::Info, "while frozen");
        let outcome = h.tick(Vec::new());
        assert_eq!(outcome.accepted, 0);
        assert_eq!(h.app.store().history().len(), 40);
        assert_eq!(h.app.store().stats().total(), 40);
    }

    #[test]
    fn pause_discards_drained_records() {
        let mut h = harness();
        h.push("backend", Level::Info, "before");
        h.tick(vec![InputEvent::TogglePause]);
        assert_eq!(h.sink.last().status.state, StatusState::Paused);
        let fresh_before = h.app.store().is_view_fresh();

        for n in 0..5_000 {
            h.push("backend", Level::Info, &format!("p{n}"));
        }
        let outcome = h.tick(Vec::new());

        assert_eq!(outcome.accepted, 0);
        assert_eq!(h.app.store().history().len(), 1);
        assert_eq!(h.app.store().stats().total(), 1);
        assert_eq!(h.app.store().is_view_fresh(), fresh_before);
        assert_eq!(h.app.export_text().0, 1);

        h.tick(vec![InputEvent::TogglePause]);
        h.push("backend", Level::Info, "after");
        assert_eq!(h.tick(Vec::new()).accepted, 1);
    }

    #[test]
    fn window_fits_viewport() {
        let mut h = harness();
        h.sink = RecordingSink::new(60, 16);
        for n in 0..30 {
            h.push("ray", Level::Warning, &format!("{n}\nsecond line\nthird line"));
        }
        h.tick(Vec::new());
        let viewport_rows = 16 - crate::render::HEADER_ROWS - crate::render::FOOTER_ROWS;
        assert!(h.sink.last().body_rows() <= viewport_rows);
        assert_eq!(h.sink.last().body_rows(), 9);
    }

    #[test]
    fn filters_and_search_drive_the_view() {
        let mut h = harness();
        h.push("backend", Level::Info, "b-one");
        h.push("batch", Level::Error, "w-one");
        h.push("backend", Level::Error, "b-two timeout");
        h.tick(Vec::new());

        h.tick(vec![InputEvent::SetSourceFilter(Some("backend".to_owned()))]);
        assert_eq!(shown_messages(h.sink.last()), vec!["b-one", "b-two timeout"]);

        h.tick(vec![InputEvent::SetLevelFilter(Some(Level::Error))]);
        assert_eq!(shown_messages(h.sink.last()), vec!["b-two timeout"]);
        assert_eq!(
            h.sink.last().status.filters,
            "Level: ERROR, Source: backend"
        );

        h.tick(vec![
            InputEvent::ClearFilters,
            InputEvent::BeginSearch,
            InputEvent::SearchInput('T'),
            InputEvent::SearchInput('I'),
            InputEvent::SearchInput('X'),
            InputEvent::SearchBackspace,
        ]);
        assert!(h.app.is_searching());
        assert_eq!(h.sink.last().status.search_prompt.as_deref(), Some("TI"));

        h.tick(vec![InputEvent::CommitSearch]);
        assert!(!h.app.is_searching());
        assert_eq!(shown_messages(h.sink.last()), vec!["b-two timeout"]);

        h.tick(vec![InputEvent::BeginSearch, InputEvent::CancelSearch]);
        assert_eq!(h.app.store().filter().search(), "TI");
    }

    #[test]
    fn clear_empties_history_and_stats() {
        let mut h = harness();
        h.push("backend", Level::Error, "x");
        h.tick(Vec::new());
        h.tick(vec![InputEvent::Clear]);
        assert_eq!(h.sink.last().body, Body::Empty);
        assert_eq!(h.sink.last().status.stats, "No logs yet");
    }

    #[test]
    fn copy_exports_filtered_raw_lines() {
        let mut h = harness();
        h.push("backend", Level::Info, "one");
        h.push("batch", Level::Info, "two");
        h.tick(vec![InputEvent::SetSourceFilter(Some("batch".to_owned()))]);
        h.tick(vec![InputEvent::CopyToClipboard]);

        assert_eq!(
            *h.copied.lock(),
            vec![r#"{"component":"batch","message":"two"}"#.to_owned()]
        );
        assert_eq!(h.app.status_message(), Some("copied 1 lines"));
    }

    #[test]
    fn copy_failure_is_visible_and_expires() {
        let mut h = harness_with(Config::default(), false, true);
        h.tick(vec![InputEvent::CopyToClipboard]);
        let message = h.sink.last().status.message.clone().unwrap_or_default();
        assert!(message.starts_with("copy failed"), "{message}");

        for _ in 0..20 {
            h.tick(Vec::new());
        }
        assert!(h.app.status_message().is_none());
        assert!(h.sink.last().status.message.is_none());
    }

    #[test]
    fn reconnect_outcomes_update_status_and_health() {
        let mut h = harness();
        h.tick(vec![InputEvent::Reconnect]);
        assert_eq!(h.reconnects.load(Ordering::SeqCst), 1);
        assert_eq!(h.app.status_message(), Some("reconnecting to fake"));

        let mut h = harness_with(Config::default(), true, false);
        h.tick(vec![InputEvent::Reconnect]);
        assert_eq!(h.health.get(), Health::Disconnected);
        assert_eq!(h.sink.last().status.state, StatusState::Disconnected);
        assert!(
            h.app
                .status_message()
                .is_some_and(|m| m.starts_with("reconnect failed"))
        );
    }

    #[test]
    fn health_flip_redraws_live_view() {
        let mut h = harness();
        h.tick(Vec::new());
        h.health.set(Health::Disconnected);
        let outcome = h.tick(Vec::new());
        assert!(outcome.rendered);
        assert_eq!(h.sink.last().status.state, StatusState::Disconnected);
    }

    #[test]
    fn quit_finishes_the_tick() {
        let mut h = harness();
        h.push("backend", Level::Info, "last words");
        let outcome = h.tick(vec![InputEvent::Quit]);
        assert!(outcome.quit);
        assert!(outcome.rendered);
        assert_eq!(outcome.accepted, 1);
        assert!(h.app.should_quit());
    }

    #[test]
    fn jump_to_top_then_bottom_returns_to_live() {
        let mut h = harness();
        for n in 0..60 {
            h.push("backend", Level::Info, &format!("m{n}"));
        }
        h.tick(vec![InputEvent::JumpTop]);
        assert!(h.app.scroll().offset() > 0);
        assert!(h.app.scroll().offset() <= 60);

        h.tick(vec![InputEvent::JumpBottom]);
        assert!(h.app.scroll().is_live());
        assert_eq!(shown_messages(h.sink.last()).last().map(String::as_str), Some("m59"));
    }

    #[test]
    fn keys_typed_in_one_tick_follow_search_mode() {
        let mut h = harness();
        h.push("backend", Level::Info, "alpha");
        h.push("backend", Level::Info, "beta");
        h.push("batch", Level::Info, "gamma");
        h.type_keys(vec![Key::Char('b')]);
        assert_eq!(h.app.store().filter().source.as_deref(), Some("backend"));

        h.type_keys(vec![
            Key::Char('/'),
            Key::Char('a'),
            Key::Char('l'),
            Key::Enter,
        ]);
        assert!(!h.app.is_searching());
        assert_eq!(h.app.store().filter().search(), "al");
        assert_eq!(h.app.store().filter().source.as_deref(), Some("backend"));
        assert!(h.copied.lock().is_empty());
        assert_eq!(shown_messages(h.sink.last()), vec!["alpha"]);

        h.type_keys(vec![Key::Char('a')]);
        assert_eq!(h.app.store().filter().source, None);
        assert_eq!(h.app.store().filter().search(), "");
    }

    #[test]
    fn frame_carries_the_size_it_was_laid_out_for() {
        let mut h = harness();
        h.tick(Vec::new());
        assert_eq!(h.sink.last().size, (100, 30));

        h.sink.size = (40, 12);
        assert!(h.tick(Vec::new()).rendered);
        assert_eq!(h.sink.last().size, (40, 12));
    }
}

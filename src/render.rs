//! Frame model handed to the terminal, and the crossterm sink that paints it.

use std::io::{self, Stdout, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::style::{
    Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor,
};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};

use crate::config::{FrozenPolicy, SourceColor};
use crate::feed::Health;
use crate::history::Stats;
use crate::layout::{Part, Row, char_width, sanitize};
use crate::record::Level;
use crate::scroll::Viewport;
use crate::view::FilterState;

pub const HEADER_ROWS: usize = 4;
pub const FOOTER_ROWS: usize = 2;
pub const EMPTY_BODY: &str = "No logs to display. Waiting for new logs...";
pub const FOOTER: &str = "Arrows/PgUp/PgDn:Scroll | Home/End:Oldest/Latest | [P]ause | [C]lear | [L]ogs:Copy | [1-5]Level [0]All | [/]Search | [A]ll | [X]Reconnect | [Q]uit";

/// Body area left over once header and footer are placed.
pub fn body_viewport(cols: u16, rows: u16) -> Viewport {
    Viewport::new(
        (rows as usize).saturating_sub(HEADER_ROWS + FOOTER_ROWS),
        cols as usize,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusState {
    Disconnected,
    Connecting,
    Paused,
    Frozen(FrozenPolicy),
    Live,
}

impl StatusState {
    pub fn resolve(health: Health, paused: bool, live: bool, policy: FrozenPolicy) -> Self {
        match health {
            Health::Disconnected => StatusState::Disconnected,
            _ if paused => StatusState::Paused,
            _ if !live => StatusState::Frozen(policy),
            Health::Connecting => StatusState::Connecting,
            Health::Connected => StatusState::Live,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusState::Disconnected => "DISCONNECTED - press X to reconnect",
            StatusState::Connecting => "CONNECTING",
            StatusState::Paused => "PAUSED",
            StatusState::Frozen(FrozenPolicy::Buffer) => {
                "VIEW FROZEN (buffering) - press End for latest"
            }
            StatusState::Frozen(FrozenPolicy::Drop) => {
                "VIEW FROZEN (dropping new logs) - press End for latest"
            }
            StatusState::Live => "LIVE",
        }
    }

    fn color(self) -> Color {
        match self {
            StatusState::Disconnected => Color::Red,
            StatusState::Connecting | StatusState::Paused => Color::Yellow,
            StatusState::Frozen(_) => Color::Cyan,
            StatusState::Live => Color::Green,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBlock {
    pub state: StatusState,
    pub feed: String,
    pub filters: String,
    pub stats: String,
    pub dropped: u64,
    pub message: Option<String>,
    pub search_prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRecord {
    pub color: SourceColor,
    pub level: Level,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Empty,
    Records(Vec<RenderedRecord>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Terminal `(cols, rows)` the body was laid out for.
    pub size: (u16, u16),
    pub status: StatusBlock,
    pub body: Body,
    pub footer: &'static str,
}

impl Frame {
    pub fn body_rows(&self) -> usize {
        match &self.body {
            Body::Empty => 1,
            Body::Records(records) => records.iter().map(|r| r.rows.len()).sum(),
        }
    }
}

pub fn describe_filters(filter: &FilterState) -> String {
    let mut parts = Vec::new();
    if let Some(level) = filter.level {
        parts.push(format!("Level: {level}"));
    }
    if let Some(source) = &filter.source {
        parts.push(format!("Source: {source}"));
    }
    if !filter.search().is_empty() {
        parts.push(format!("Search: '{}'", filter.search()));
    }
    if parts.is_empty() {
        "None".to_owned()
    } else {
        parts.join(", ")
    }
}

pub fn describe_stats(stats: &Stats) -> String {
    if stats.is_empty() {
        return "No logs yet".to_owned();
    }
    stats
        .sources()
        .map(|source| {
            let total = stats.source_total(source);
            let errors = stats.source_errors(source);
            if errors > 0 {
                format!("{source}: {total} ({errors} err)")
            } else {
                format!("{source}: {total}")
            }
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

pub trait RenderSink {
    /// Terminal size as `(cols, rows)`.
    fn size(&self) -> io::Result<(u16, u16)>;
    fn draw(&mut self, frame: &Frame) -> io::Result<()>;
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Debug => Color::DarkGrey,
        Level::Info => Color::White,
        Level::Warning => Color::Yellow,
        Level::Error => Color::Red,
        Level::Critical => Color::Magenta,
    }
}

fn part_color(part: Part, record: &RenderedRecord) -> Color {
    match part {
        Part::SourceTag => record.color.to_crossterm(),
        Part::Time => Color::DarkGrey,
        Part::Logger => Color::Cyan,
        Part::Marker | Part::Message | Part::Ellipsis => level_color(record.level),
    }
}

fn clip_to_width(text: &str, width: usize) -> String {
    let mut used = 0usize;
    let mut out = String::new();
    for ch in text.chars() {
        let w = char_width(ch);
        if used + w > width {
            break;
        }
        used += w;
        out.push(ch);
    }
    out
}

/// Screen row of the first record row. Short windows sit against the footer
/// so the newest record is always on the last body row.
fn records_top(viewport_rows: usize, used_rows: usize) -> usize {
    HEADER_ROWS + viewport_rows.saturating_sub(used_rows)
}

/// Raw mode plus alternate screen with wheel reporting, undone on drop even
/// when the loop bails out with an error.
struct ScreenSession;

impl ScreenSession {
    fn open(stdout: &mut Stdout) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        if let Err(err) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture, Hide) {
            let _ = terminal::disable_raw_mode();
            return Err(err);
        }
        Ok(Self)
    }
}

impl Drop for ScreenSession {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = execute!(stdout, ResetColor, Show, DisableMouseCapture, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Paints frames on the alternate screen; restores the terminal on drop.
pub struct TerminalSink {
    stdout: Stdout,
    _session: ScreenSession,
}

impl TerminalSink {
    pub fn enter() -> io::Result<Self> {
        let mut stdout = io::stdout();
        let session = ScreenSession::open(&mut stdout)?;
        Ok(Self {
            stdout,
            _session: session,
        })
    }

    fn line(&mut self, y: u16, text: &str, cols: usize, color: Option<Color>) -> io::Result<()> {
        let shown = clip_to_width(&sanitize(text, false), cols);
        queue!(self.stdout, MoveTo(0, y))?;
        match color {
            Some(color) => queue!(self.stdout, SetForegroundColor(color), Print(shown), ResetColor)?,
            None => queue!(self.stdout, Print(shown))?,
        }
        Ok(())
    }

    fn draw_header(&mut self, status: &StatusBlock, cols: usize) -> io::Result<()> {
        let mut head = format!("logmon  Status: {}  ({})", status.state.label(), status.feed);
        if status.dropped > 0 {
            head.push_str(&format!("  dropped: {}", status.dropped));
        }
        queue!(self.stdout, SetAttribute(Attribute::Bold))?;
        self.line(0, &head, cols, Some(status.state.color()))?;
        queue!(self.stdout, SetAttribute(Attribute::Reset))?;

        let filters = match &status.search_prompt {
            Some(prompt) => format!("Search: /{prompt}_  (Enter to apply, Esc to cancel)"),
            None => format!("Filters: {}", status.filters),
        };
        self.line(1, &filters, cols, None)?;

        let stats = match &status.message {
            Some(message) => format!("Stats: {}  | {message}", status.stats),
            None => format!("Stats: {}", status.stats),
        };
        self.line(2, &stats, cols, None)?;
        self.line(3, &"─".repeat(cols), cols, Some(Color::Blue))
    }

    fn draw_body(&mut self, body: &Body, viewport: Viewport) -> io::Result<()> {
        let records = match body {
            Body::Empty => {
                let y = HEADER_ROWS as u16;
                return self.line(y, EMPTY_BODY, viewport.width, Some(Color::DarkGrey));
            }
            Body::Records(records) => records,
        };

        let used = records.iter().map(|r| r.rows.len()).sum::<usize>();
        let mut y = records_top(viewport.rows, used);
        for record in records {
            for row in &record.rows {
                if y >= HEADER_ROWS + viewport.rows {
                    return Ok(());
                }
                queue!(self.stdout, MoveTo(0, y as u16))?;
                for span in row {
                    queue!(
                        self.stdout,
                        SetForegroundColor(part_color(span.part, record)),
                        Print(&span.text)
                    )?;
                }
                queue!(self.stdout, ResetColor)?;
                y += 1;
            }
        }
        Ok(())
    }
}

impl RenderSink for TerminalSink {
    fn size(&self) -> io::Result<(u16, u16)> {
        terminal::size()
    }

    fn draw(&mut self, frame: &Frame) -> io::Result<()> {
        let (cols, rows) = frame.size;
        let cols_usize = cols as usize;
        let rows_usize = rows as usize;

        queue!(self.stdout, MoveTo(0, 0), Clear(ClearType::All))?;
        if rows_usize < HEADER_ROWS + FOOTER_ROWS || cols_usize == 0 {
            return self.stdout.flush();
        }

        self.draw_header(&frame.status, cols_usize)?;
        self.draw_body(&frame.body, body_viewport(cols, rows))?;

        let footer_row = (rows_usize - FOOTER_ROWS) as u16;
        self.line(footer_row, &"─".repeat(cols_usize), cols_usize, Some(Color::DarkGrey))?;
        self.line(footer_row + 1, frame.footer, cols_usize, Some(Color::DarkGrey))?;
        self.stdout.flush()
    }
}

//! Keyboard handling: raw `/dev/tty` bytes become [`Key`]s, and the key map
//! turns keys into [`InputEvent`]s for the UI loop.

use std::fs::OpenOptions;
use std::io::{self, Read};
use std::sync::mpsc::SyncSender;
use std::thread;

use crate::record::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
    Enter,
    Backspace,
    Esc,
    CtrlC,
    WheelUp,
    WheelDown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    TogglePause,
    Clear,
    SetLevelFilter(Option<Level>),
    SetSourceFilter(Option<String>),
    ClearFilters,
    ScrollUp(usize),
    ScrollDown(usize),
    PageUp,
    PageDown,
    JumpTop,
    JumpBottom,
    Reconnect,
    CopyToClipboard,
    BeginSearch,
    SearchInput(char),
    SearchBackspace,
    CommitSearch,
    CancelSearch,
}

/// What the UI loop accepts per tick: raw keys from the terminal reader, or
/// events that are already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Key(Key),
    Event(InputEvent),
}

impl From<Key> for Input {
    fn from(key: Key) -> Self {
        Input::Key(key)
    }
}

impl From<InputEvent> for Input {
    fn from(event: InputEvent) -> Self {
        Input::Event(event)
    }
}

/// Letters taken by built-in commands; source shortcuts must avoid them.
pub const RESERVED_KEYS: &[char] = &['q', 'p', 'c', 'a', 'l', 'x', '/'];

const WHEEL_ROWS: usize = 3;

/// How long a lone ESC waits for the rest of a sequence before it counts as
/// the Escape key.
const ESC_TIMEOUT_MS: i32 = 50;

#[derive(Debug)]
enum ParserState {
    Ground,
    Esc,
    Csi(Vec<u8>),
    Ss3,
    Utf8 { buf: Vec<u8>, need: usize },
}

#[derive(Debug)]
pub struct KeyParser {
    state: ParserState,
}

impl Default for KeyParser {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Ground,
        }
    }

    pub fn feed(&mut self, byte: u8) -> Option<Key> {
        match &mut self.state {
            ParserState::Ground => match byte {
                0x1b => {
                    self.state = ParserState::Esc;
                    None
                }
                0xc0..=0xdf => self.begin_utf8(byte, 1),
                0xe0..=0xef => self.begin_utf8(byte, 2),
                0xf0..=0xf7 => self.begin_utf8(byte, 3),
                _ => key_from_byte(byte),
            },
            ParserState::Esc => match byte {
                b'[' => {
                    self.state = ParserState::Csi(Vec::new());
                    None
                }
                b'O' => {
                    self.state = ParserState::Ss3;
                    None
                }
                _ => {
                    self.state = ParserState::Ground;
                    Some(Key::Esc)
                }
            },
            ParserState::Ss3 => {
                self.state = ParserState::Ground;
                match byte {
                    b'A' => Some(Key::Up),
                    b'B' => Some(Key::Down),
                    b'H' => Some(Key::Home),
                    b'F' => Some(Key::End),
                    _ => None,
                }
            }
            ParserState::Csi(buf) => {
                buf.push(byte);
                if !(0x40..=0x7e).contains(&byte) {
                    return None;
                }

                let key = parse_csi(buf);
                self.state = ParserState::Ground;
                key
            }
            ParserState::Utf8 { buf, need } => {
                buf.push(byte);
                *need -= 1;
                if *need > 0 {
                    return None;
                }
                let key = std::str::from_utf8(buf)
                    .ok()
                    .and_then(|s| s.chars().next())
                    .map(Key::Char);
                self.state = ParserState::Ground;
                key
            }
        }
    }

    /// True while an ESC has been read and nothing after it yet.
    pub fn is_awaiting_escape(&self) -> bool {
        matches!(self.state, ParserState::Esc)
    }

    /// Decodes one read. A trailing ESC is only resolved as the Escape key
    /// when `more_pending` says no further bytes are on their way; otherwise
    /// it stays buffered so a sequence split across reads still parses.
    pub fn feed_chunk(&mut self, bytes: &[u8], more_pending: impl FnOnce() -> bool) -> Vec<Key> {
        let mut keys = bytes
            .iter()
            .filter_map(|byte| self.feed(*byte))
            .collect::<Vec<_>>();
        if self.is_awaiting_escape() && !more_pending() {
            keys.extend(self.flush());
        }
        keys
    }

    /// Resolves a dangling lone ESC as the Escape key.
    pub fn flush(&mut self) -> Option<Key> {
        if matches!(self.state, ParserState::Esc) {
            self.state = ParserState::Ground;
            return Some(Key::Esc);
        }
        None
    }

    fn begin_utf8(&mut self, byte: u8, need: usize) -> Option<Key> {
        self.state = ParserState::Utf8 {
            buf: vec![byte],
            need,
        };
        None
    }
}

fn key_from_byte(byte: u8) -> Option<Key> {
    match byte {
        0x03 => Some(Key::CtrlC),
        b'\r' | b'\n' => Some(Key::Enter),
        0x7f | 0x08 => Some(Key::Backspace),
        0x20..=0x7e => Some(Key::Char(byte as char)),
        _ => None,
    }
}

fn parse_csi(sequence: &[u8]) -> Option<Key> {
    let (final_byte, params) = sequence.split_last()?;
    match (*final_byte, params) {
        (b'A', []) => Some(Key::Up),
        (b'B', []) => Some(Key::Down),
        (b'H', []) => Some(Key::Home),
        (b'F', []) => Some(Key::End),
        (b'~', b"1" | b"7") => Some(Key::Home),
        (b'~', b"4" | b"8") => Some(Key::End),
        (b'~', b"5") => Some(Key::PageUp),
        (b'~', b"6") => Some(Key::PageDown),
        (b'M', _) => parse_sgr_wheel(params),
        _ => None,
    }
}

fn parse_sgr_wheel(params: &[u8]) -> Option<Key> {
    if !params.starts_with(b"<") {
        return None;
    }

    let payload = std::str::from_utf8(&params[1..]).ok()?;
    let mut parts = payload.split(';');
    let cb = parts.next()?.parse::<u16>().ok()?;
    let _col = parts.next()?.parse::<u16>().ok()?;
    let _row = parts.next()?.parse::<u16>().ok()?;
    if parts.next().is_some() {
        return None;
    }

    let is_wheel = (cb & 0b0100_0000) != 0;
    if !is_wheel {
        return None;
    }
    if cb & 0b11 == 0 {
        Some(Key::WheelUp)
    } else if cb & 0b11 == 1 {
        Some(Key::WheelDown)
    } else {
        None
    }
}

/// Maps keys to events. Holds the per-source shortcut letters from config.
#[derive(Debug, Clone)]
pub struct KeyMap {
    source_keys: Vec<(char, String)>,
    scroll_step: usize,
}

impl KeyMap {
    pub fn new(source_keys: Vec<(char, String)>, scroll_step: usize) -> Self {
        Self {
            source_keys: source_keys
                .into_iter()
                .map(|(key, name)| (key.to_ascii_lowercase(), name))
                .collect(),
            scroll_step: scroll_step.max(1),
        }
    }

    /// `searching` is true while the search prompt is open; printable keys
    /// then edit the query instead of running commands.
    pub fn event_for(&self, key: Key, searching: bool) -> Option<InputEvent> {
        if searching {
            return match key {
                Key::Char(ch) => Some(InputEvent::SearchInput(ch)),
                Key::Backspace => Some(InputEvent::SearchBackspace),
                Key::Enter => Some(InputEvent::CommitSearch),
                Key::Esc => Some(InputEvent::CancelSearch),
                Key::CtrlC => Some(InputEvent::Quit),
                _ => None,
            };
        }

        match key {
            Key::Up => Some(InputEvent::ScrollUp(self.scroll_step)),
            Key::Down => Some(InputEvent::ScrollDown(self.scroll_step)),
            Key::WheelUp => Some(InputEvent::ScrollUp(WHEEL_ROWS)),
            Key::WheelDown => Some(InputEvent::ScrollDown(WHEEL_ROWS)),
            Key::PageUp => Some(InputEvent::PageUp),
            Key::PageDown => Some(InputEvent::PageDown),
            Key::Home => Some(InputEvent::JumpTop),
            Key::End => Some(InputEvent::JumpBottom),
            Key::CtrlC => Some(InputEvent::Quit),
            Key::Char(ch) => self.event_for_char(ch.to_ascii_lowercase()),
            Key::Enter | Key::Backspace | Key::Esc => None,
        }
    }

    fn event_for_char(&self, ch: char) -> Option<InputEvent> {
        let event = match ch {
            'q' => InputEvent::Quit,
            'p' => InputEvent::TogglePause,
            'c' => InputEvent::Clear,
            '0' => InputEvent::SetLevelFilter(None),
            '1'..='5' => {
                let index = ch as usize - '1' as usize;
                InputEvent::SetLevelFilter(Level::ALL.get(index).copied())
            }
            'a' => InputEvent::ClearFilters,
            'l' => InputEvent::CopyToClipboard,
            'x' => InputEvent::Reconnect,
            '/' => InputEvent::BeginSearch,
            _ => {
                let (_, name) = self.source_keys.iter().find(|(key, _)| *key == ch)?;
                InputEvent::SetSourceFilter(Some(name.clone()))
            }
        };
        Some(event)
    }
}

/// Reads the controlling terminal on a background thread and forwards keys.
pub fn spawn_key_reader(tx: SyncSender<Key>) -> io::Result<()> {
    let mut tty = OpenOptions::new().read(true).open("/dev/tty")?;

    thread::spawn(move || {
        let mut parser = KeyParser::new();
        let mut buf = [0u8; 64];

        loop {
            match tty.read(&mut buf) {
                Ok(0) => {
                    let _ = tx.send(Key::CtrlC);
                    break;
                }
                Ok(n) => {
                    let keys =
                        parser.feed_chunk(&buf[..n], || readable_within(&tty, ESC_TIMEOUT_MS));
                    for key in keys {
                        if tx.send(key).is_err() {
                            return;
                        }
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    tracing::warn!(error = %err, "keyboard reader stopped");
                    let _ = tx.send(Key::CtrlC);
                    break;
                }
            }
        }
    });

    Ok(())
}

#[cfg(unix)]
fn readable_within(tty: &std::fs::File, timeout_ms: i32) -> bool {
    use std::os::fd::AsRawFd;

    let mut fds = libc::pollfd {
        fd: tty.as_raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    };
    // SAFETY: `fds` is a single valid pollfd that outlives the call.
    let ready = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
    ready > 0
}

#[cfg(not(unix))]
fn readable_within(_tty: &std::fs::File, _timeout_ms: i32) -> bool {
    false
}

//! Visual row accounting for records.
//!
//! [`rows_for`] decides how many terminal rows a record gets and
//! [`layout_record`] produces exactly that many rows for drawing. Both go
//! through the same prefix and trimming code so they cannot disagree.

use std::borrow::Cow;
use std::iter::Peekable;
use std::str::Chars;

use unicode_width::UnicodeWidthChar;

use crate::record::Record;

pub const MAX_ROWS_PER_RECORD: usize = 5;
pub const LOGGER_MAX_CHARS: usize = 15;
const TIME_CELLS: usize = 12;
const ELLIPSIS: &str = "...";

/// Terminal cells taken by `ch`. Wide glyphs count 2, control characters 0.
pub fn char_width(ch: char) -> usize {
    if ch.is_control() {
        return 0;
    }
    ch.width().unwrap_or(0)
}

pub fn cell_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}

/// Printable form of untrusted text. Escape sequences are removed, tabs become
/// a space and other control characters are dropped. Newlines survive only
/// with `keep_newlines`; otherwise they become a space too.
pub fn sanitize(text: &str, keep_newlines: bool) -> Cow<'_, str> {
    if !text
        .chars()
        .any(|ch| ch.is_control() && !(keep_newlines && ch == '\n'))
    {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\u{1b}' => skip_escape(&mut chars),
            '\n' if keep_newlines => out.push('\n'),
            '\n' | '\t' => out.push(' '),
            ch if ch.is_control() => {}
            ch => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// Consumes the rest of an escape sequence whose ESC was already read.
fn skip_escape(chars: &mut Peekable<Chars<'_>>) {
    match chars.next() {
        Some('[') => {
            for ch in chars.by_ref() {
                if ('\u{40}'..='\u{7e}').contains(&ch) {
                    break;
                }
            }
        }
        // OSC, DCS, PM and APC run until BEL or ESC \.
        Some(']' | 'P' | '^' | '_') => {
            while let Some(ch) = chars.next() {
                if ch == '\u{7}' {
                    break;
                }
                if ch == '\u{1b}' {
                    if chars.peek() == Some(&'\\') {
                        chars.next();
                    }
                    break;
                }
            }
        }
        _ => {}
    }
}

/// Which piece of a rendered record a span belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    SourceTag,
    Time,
    Marker,
    Logger,
    Message,
    Ellipsis,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub part: Part,
    pub text: String,
}

pub type Row = Vec<Span>;

/// Fixed-width prefix drawn before the first message row:
/// `[SRC] hh:mm:ss.mmm [L] logger: `.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefix {
    pub source_tag: String,
    pub time: String,
    pub marker: String,
    pub logger: Option<String>,
}

impl Prefix {
    pub fn for_record(record: &Record) -> Self {
        let source = sanitize(&record.source, false);
        let short_source = source.chars().take(3).collect::<String>().to_uppercase();
        let time = sanitize(record.time_part(), false)
            .chars()
            .take(TIME_CELLS)
            .collect::<String>();
        let logger_name = sanitize(&record.logger_name, false);
        let logger = (!logger_name.is_empty()).then(|| {
            let skip = logger_name.chars().count().saturating_sub(LOGGER_MAX_CHARS);
            format!("{}: ", logger_name.chars().skip(skip).collect::<String>())
        });

        Self {
            source_tag: format!("[{short_source:<3}] "),
            time: format!("{time:<TIME_CELLS$} "),
            marker: format!("{} ", record.level.marker()),
            logger,
        }
    }

    pub fn width(&self) -> usize {
        cell_width(&self.source_tag)
            + cell_width(&self.time)
            + cell_width(&self.marker)
            + self.logger.as_deref().map(cell_width).unwrap_or(0)
    }

    fn parts(&self) -> impl Iterator<Item = (Part, &str)> {
        [
            (Part::SourceTag, self.source_tag.as_str()),
            (Part::Time, self.time.as_str()),
            (Part::Marker, self.marker.as_str()),
        ]
        .into_iter()
        .chain(self.logger.as_deref().map(|logger| (Part::Logger, logger)))
    }
}

/// Message after the width and line caps were applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimmedMessage<'a> {
    pub segments: Vec<&'a str>,
    pub truncated: bool,
}

/// Strips trailing newlines, caps the message at `width * max_rows` cells and
/// keeps at most `max_rows` newline-separated segments.
pub fn trim_message(message: &str, width: usize, max_rows: usize) -> TrimmedMessage<'_> {
    let stripped = message.trim_end_matches('\n');
    let cap = width.max(1).saturating_mul(max_rows.max(1));

    let mut msg = match stripped.char_indices().nth(cap) {
        Some((cut, _)) => &stripped[..cut],
        None => stripped,
    };
    let mut visual = cell_width(msg);
    while visual > cap {
        let Some(last) = msg.chars().next_back() else {
            break;
        };
        visual -= char_width(last);
        msg = &msg[..msg.len() - last.len_utf8()];
    }

    let mut truncated = msg.len() < stripped.len();
    let mut segments = msg.split('\n').collect::<Vec<_>>();
    if segments.len() > max_rows.max(1) {
        segments.truncate(max_rows.max(1));
        truncated = true;
    }

    TrimmedMessage {
        segments,
        truncated,
    }
}

/// Number of terminal rows `record` occupies at `width` columns, in
/// `1..=max_rows`.
pub fn rows_for(record: &Record, width: usize, max_rows: usize) -> usize {
    let width = width.max(1);
    let max_rows = max_rows.max(1);
    let prefix_width = Prefix::for_record(record).width();
    let message = sanitize(&record.message, true);
    let trimmed = trim_message(&message, width, max_rows);

    let mut total = 0usize;
    for (index, segment) in trimmed.segments.iter().enumerate() {
        let mut visual = cell_width(segment);
        if index == 0 {
            visual += prefix_width;
        }
        total += visual.div_ceil(width).max(1);
        if total >= max_rows {
            return max_rows;
        }
    }

    total.clamp(1, max_rows)
}

/// Lays `record` out into exactly `rows_for(record, width, max_rows)` rows,
/// ending in an ellipsis when anything was cut.
pub fn layout_record(record: &Record, width: usize, max_rows: usize) -> Vec<Row> {
    let width = width.max(1);
    let max_rows = max_rows.max(1);
    let allotted = rows_for(record, width, max_rows);
    let prefix = Prefix::for_record(record);
    let message = sanitize(&record.message, true);
    let trimmed = trim_message(&message, width, max_rows);

    let mut rows: Vec<Vec<(char, Part)>> = vec![Vec::new()];
    let mut used = 0usize;
    let place = |rows: &mut Vec<Vec<(char, Part)>>, used: &mut usize, ch: char, part: Part| {
        let w = char_width(ch);
        let row_is_empty = rows.last().is_none_or(Vec::is_empty);
        if *used + w > width && !row_is_empty {
            rows.push(Vec::new());
            *used = 0;
        }
        if let Some(row) = rows.last_mut() {
            row.push((ch, part));
        }
        *used += w;
    };

    for (part, text) in prefix.parts() {
        for ch in text.chars() {
            place(&mut rows, &mut used, ch, part);
        }
    }
    for (index, segment) in trimmed.segments.iter().enumerate() {
        if index > 0 {
            rows.push(Vec::new());
            used = 0;
        }
        for ch in segment.chars() {
            place(&mut rows, &mut used, ch, Part::Message);
        }
    }

    let mut truncated = trimmed.truncated;
    if rows.len() > allotted {
        rows.truncate(allotted);
        truncated = true;
    }
    while rows.len() < allotted {
        rows.push(Vec::new());
    }

    if truncated && let Some(last) = rows.last_mut() {
        let ellipsis_width = ELLIPSIS.len().min(width);
        let mut last_width = last.iter().map(|(ch, _)| char_width(*ch)).sum::<usize>();
        while last_width + ellipsis_width > width {
            let Some((ch, _)) = last.pop() else {
                break;
            };
            last_width -= char_width(ch);
        }
        last.extend(ELLIPSIS.chars().take(ellipsis_width).map(|ch| (ch, Part::Ellipsis)));
    }

    rows.into_iter().map(merge_spans).collect()
}

fn merge_spans(cells: Vec<(char, Part)>) -> Row {
    let mut spans: Row = Vec::new();
    for (ch, part) in cells {
        match spans.last_mut() {
            Some(span) if span.part == part => span.text.push(ch),
            _ => spans.push(Span {
                part,
                text: ch.to_string(),
            }),
        }
    }
    spans
}

/// Plain text of a laid-out row.
pub fn row_text(row: &Row) -> String {
    row.iter().map(|span| span.text.as_str()).collect()
}

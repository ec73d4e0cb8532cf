use std::sync::Arc;

use crate::layout::rows_for;
use crate::record::Record;

/// Scroll requests past the top rely on the next clamp to settle at the oldest row.
pub const SCROLL_TO_TOP: usize = usize::MAX / 2;

/// Body area available for records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub rows: usize,
    pub width: usize,
}

impl Viewport {
    pub fn new(rows: usize, width: usize) -> Self {
        Self { rows, width }
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.width == 0
    }
}

/// Offset in visual rows back from the newest row. Zero is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollState {
    offset: usize,
    max_rows_per_record: usize,
}

impl ScrollState {
    pub fn new(max_rows_per_record: usize) -> Self {
        Self {
            offset: 0,
            max_rows_per_record: max_rows_per_record.max(1),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_live(&self) -> bool {
        self.offset == 0
    }

    pub fn scroll_up(&mut self, rows: usize) {
        self.offset = self.offset.saturating_add(rows);
    }

    pub fn scroll_down(&mut self, rows: usize) {
        self.offset = self.offset.saturating_sub(rows);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = 0;
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_up(SCROLL_TO_TOP);
    }

    /// Row count per view entry, oldest first.
    pub fn row_counts(&self, view: &[Arc<Record>], width: usize) -> Vec<usize> {
        view.iter()
            .map(|record| rows_for(record, width, self.max_rows_per_record))
            .collect()
    }

    /// Caps the offset so the oldest row can at most reach the top of the viewport.
    pub fn clamp(&mut self, view: &[Arc<Record>], viewport: Viewport) {
        let total = self.row_counts(view, viewport.width).into_iter().sum::<usize>();
        let max_offset = total.saturating_sub(viewport.rows);
        self.offset = self.offset.min(max_offset);
    }

    /// Records to draw, oldest first. Only whole records are returned and
    /// their rows never add up to more than `viewport.rows`.
    pub fn select_window(&self, view: &[Arc<Record>], viewport: Viewport) -> Vec<Arc<Record>> {
        if view.is_empty() || viewport.is_empty() {
            return Vec::new();
        }

        let counts = self.row_counts(view, viewport.width);
        let end = anchor_index(&counts, self.offset);

        let mut used = 0usize;
        let mut start = end + 1;
        for index in (0..=end).rev() {
            if used + counts[index] > viewport.rows {
                break;
            }
            used += counts[index];
            start = index;
        }

        view[start..=end].to_vec()
    }
}

/// Entry that sits at the bottom of the window for `offset`.
fn anchor_index(counts: &[usize], offset: usize) -> usize {
    let last = counts.len().saturating_sub(1);
    if offset == 0 {
        return last;
    }

    let mut from_end = 0usize;
    for index in (0..counts.len()).rev() {
        from_end += counts[index];
        if from_end >= offset {
            return index;
        }
    }
    0
}

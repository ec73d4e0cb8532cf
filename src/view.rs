//! Filter state, the versioned view cache and the store that ties them to the
//! history buffer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::history::{HistoryBuffer, Stats};
use crate::record::{Level, Record};

pub type View = Arc<[Arc<Record>]>;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub level: Option<Level>,
    pub source: Option<String>,
    search: String,
    search_folded: String,
}

impl FilterState {
    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
        self.search_folded = self.search.to_lowercase();
    }

    pub fn is_empty(&self) -> bool {
        self.level.is_none() && self.source.is_none() && self.search.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        if let Some(level) = self.level
            && record.level != level
        {
            return false;
        }
        if let Some(source) = &self.source
            && record.source != *source
        {
            return false;
        }
        self.search_folded.is_empty() || record.raw.to_lowercase().contains(&self.search_folded)
    }
}

/// Shared staleness signal. Bumping it from any thread marks every cache
/// built from an older version as stale.
#[derive(Debug, Clone, Default)]
pub struct Invalidator(Arc<AtomicU64>);

impl Invalidator {
    pub fn invalidate(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    pub fn version(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
struct ViewCache {
    invalidator: Invalidator,
    built_at: Option<u64>,
    entries: View,
}

impl ViewCache {
    fn new(invalidator: Invalidator) -> Self {
        Self {
            invalidator,
            built_at: None,
            entries: Arc::from(Vec::new()),
        }
    }

    fn is_valid(&self) -> bool {
        self.built_at == Some(self.invalidator.version())
    }

    fn get_or_rebuild(&mut self, history: &HistoryBuffer, filter: &FilterState) -> View {
        if self.is_valid() {
            return Arc::clone(&self.entries);
        }

        // The version is read before the snapshot: an invalidation that lands
        // while filtering leaves `built_at` behind the counter, so the next
        // read rebuilds again.
        let version = self.invalidator.version();
        let entries = history
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect::<Vec<_>>();
        self.entries = Arc::from(entries);
        self.built_at = Some(version);
        Arc::clone(&self.entries)
    }
}

/// History buffer plus the filtered view over it. Owned by the UI loop.
#[derive(Debug)]
pub struct LogStore {
    history: HistoryBuffer,
    filter: FilterState,
    cache: ViewCache,
    paused: bool,
}

impl LogStore {
    pub fn new(max_lines: usize) -> Self {
        Self {
            history: HistoryBuffer::new(max_lines),
            filter: FilterState::default(),
            cache: ViewCache::new(Invalidator::default()),
            paused: false,
        }
    }

    /// Handle other threads can use to mark the view stale.
    pub fn invalidator(&self) -> Invalidator {
        self.cache.invalidator.clone()
    }

    /// Appends a record unless paused. Returns whether it was accepted.
    pub fn add(&mut self, record: Record) -> bool {
        if self.paused {
            return false;
        }
        self.history.push(record);
        self.cache.invalidator.invalidate();
        true
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.cache.entries = Arc::from(Vec::new());
        self.cache.invalidator.invalidate();
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: FilterState) {
        self.filter = filter;
        self.cache.invalidator.invalidate();
    }

    pub fn set_level_filter(&mut self, level: Option<Level>) {
        self.filter.level = level;
        self.cache.invalidator.invalidate();
    }

    pub fn set_source_filter(&mut self, source: Option<String>) {
        self.filter.source = source;
        self.cache.invalidator.invalidate();
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.filter.set_search(search);
        self.cache.invalidator.invalidate();
    }

    pub fn clear_filters(&mut self) {
        self.set_filter(FilterState::default());
    }

    /// Filtered view, rebuilt first if anything changed since the last build.
    pub fn view(&mut self) -> View {
        self.cache.get_or_rebuild(&self.history, &self.filter)
    }

    pub fn is_view_fresh(&self) -> bool {
        self.cache.is_valid()
    }

    pub fn stats(&self) -> Stats {
        self.history.stats().clone()
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }
}

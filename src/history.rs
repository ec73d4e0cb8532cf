use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use crate::record::{Level, Record};

pub const DEFAULT_MAX_LINES: usize = 1_000;

/// Per-source, per-level counters. Only ever incremented; reset by `clear`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stats {
    by_source: BTreeMap<String, BTreeMap<Level, u64>>,
}

impl Stats {
    fn record(&mut self, source: &str, level: Level) {
        if !self.by_source.contains_key(source) {
            self.by_source.insert(source.to_owned(), BTreeMap::new());
        }
        if let Some(levels) = self.by_source.get_mut(source) {
            *levels.entry(level).or_insert(0) += 1;
        }
    }

    pub fn count(&self, source: &str, level: Level) -> u64 {
        self.by_source
            .get(source)
            .and_then(|levels| levels.get(&level))
            .copied()
            .unwrap_or(0)
    }

    pub fn source_total(&self, source: &str) -> u64 {
        self.by_source
            .get(source)
            .map(|levels| levels.values().sum())
            .unwrap_or(0)
    }

    pub fn source_errors(&self, source: &str) -> u64 {
        self.by_source
            .get(source)
            .map(|levels| {
                levels
                    .iter()
                    .filter(|(level, _)| level.is_error())
                    .map(|(_, n)| *n)
                    .sum()
            })
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.by_source
            .values()
            .flat_map(|levels| levels.values())
            .sum()
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.by_source.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }
}

/// Fixed-capacity FIFO of accepted records.
#[derive(Debug)]
pub struct HistoryBuffer {
    lines: VecDeque<Arc<Record>>,
    max_lines: usize,
    stats: Stats,
}

impl HistoryBuffer {
    pub fn new(max_lines: usize) -> Self {
        let max_lines = max_lines.max(1);
        Self {
            lines: VecDeque::with_capacity(max_lines),
            max_lines,
            stats: Stats::default(),
        }
    }

    pub fn push(&mut self, record: Record) {
        self.stats.record(&record.source, record.level);
        if self.lines.len() >= self.max_lines {
            let _ = self.lines.pop_front();
        }
        self.lines.push_back(Arc::new(record));
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.stats = Stats::default();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Record>> {
        self.lines.iter()
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::HistoryBuffer;
    use crate::record::{Level, Record};

    fn record(source: &str, level: Level, message: &str) -> Record {
        Record {
            source: source.to_owned(),
            timestamp: String::new(),
            level,
            logger_name: String::new(),
            message: message.to_owned(),
            raw: message.to_owned(),
        }
    }

    fn messages(buffer: &HistoryBuffer) -> Vec<String> {
        buffer.iter().map(|r| r.message.clone()).collect()
    }

    #[test]
    fn eviction_keeps_newest_but_stats_keep_counting() {
        let mut buffer = HistoryBuffer::new(3);
        for n in 1..=5 {
            buffer.push(record("backend", Level::Info, &format!("R{n}")));
        }

        assert_eq!(messages(&buffer), vec!["R3", "R4", "R5"]);
        assert_eq!(buffer.stats().total(), 5);
        assert_eq!(buffer.stats().count("backend", Level::Info), 5);
    }

    #[test]
    fn stats_split_by_source_and_level() {
        let mut buffer = HistoryBuffer::new(10);
        buffer.push(record("backend", Level::Error, "a"));
        buffer.push(record("backend", Level::Critical, "b"));
        buffer.push(record("backend", Level::Info, "c"));
        buffer.push(record("batch", Level::Warning, "d"));

        let stats = buffer.stats();
        assert_eq!(stats.source_total("backend"), 3);
        assert_eq!(stats.source_errors("backend"), 2);
        assert_eq!(stats.source_errors("batch"), 0);
        assert_eq!(stats.sources().collect::<Vec<_>>(), vec!["backend", "batch"]);
    }

    #[test]
    fn clear_empties_lines_and_stats() {
        let mut buffer = HistoryBuffer::new(2);
        buffer.push(record("ray", Level::Debug, "x"));
        buffer.clear();

        assert!(buffer.is_empty());
        assert!(buffer.stats().is_empty());
        assert_eq!(buffer.stats().total(), 0);
    }

    proptest! {
        #[test]
        fn length_never_exceeds_capacity(capacity in 1usize..20, adds in 0usize..80) {
            let mut buffer = HistoryBuffer::new(capacity);
            for n in 0..adds {
                buffer.push(record("backend", Level::Info, &n.to_string()));
                prop_assert!(buffer.len() <= capacity);
            }

            let expected = (adds.saturating_sub(capacity)..adds)
                .map(|n| n.to_string())
                .collect::<Vec<_>>();
            prop_assert_eq!(messages(&buffer), expected);
            prop_assert_eq!(buffer.stats().total(), adds as u64);
        }
    }
}

// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! The log of applied operations, addressed by document version.
//!
//! Each entry remembers the versions it spans. A freshly applied operation
//! spans exactly one version (`from + 1 == to`); compaction merges runs of
//! entries into one that spans several. Entries are contiguous: each one
//! starts where the previous one ended, and the first starts at `start`.
//!
//! Trimming drops the oldest entries and moves `start` forward. A version
//! older than `start`, or one that falls inside a merged entry, can no
//! longer be replayed from.

use crate::error::Error;
use crate::error::Result;
use super::op::compose;
use super::op::Operation;

/// One applied operation and the versions it covers.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub operation: Operation,
    pub from: u64,
    pub to: u64,
}

#[derive(Clone, Debug, Default)]
pub struct History {
    entries: Vec<Entry>,
    start: u64,
}

impl History {
    /// An empty history whose first entry will start at `start`.
    pub fn new(start: u64) -> History {
        return History { entries: Vec::new(), start };
    }

    /// Number of entries (not versions).
    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    /// Oldest version that can still be replayed from.
    pub fn start(&self) -> u64 {
        return self.start;
    }

    /// Version reached after the last entry.
    pub fn end(&self) -> u64 {
        return self.entries.last().map_or(self.start, |entry| entry.to);
    }

    pub fn entries(&self) -> &[Entry] {
        return &self.entries;
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        return self.entries.iter().map(|entry| &entry.operation);
    }

    /// Record `operation` as the step from `end()` to `end() + 1`.
    pub fn push(&mut self, operation: Operation) {
        let from = self.end();
        self.entries.push(Entry { operation, from, to: from + 1 });
    }

    /// Entries applied since `version`.
    pub fn since(&self, version: u64) -> Result<&[Entry]> {
        let unavailable = Error::HistoryUnavailable { base: version, oldest: self.start };
        if version < self.start {
            return Err(unavailable);
        }
        return match self.entries.binary_search_by_key(&version, |entry| entry.from) {
            Ok(index) => Ok(&self.entries[index..]),
            Err(_) if version == self.end() => Ok(&[]),
            Err(_) => Err(unavailable),
        };
    }

    /// Once there are more than `limit` entries, keep the newest `retain`.
    /// Returns the number of entries dropped.
    pub fn trim(&mut self, limit: usize, retain: usize) -> usize {
        if self.entries.len() <= limit {
            return 0;
        }
        let end = self.end();
        let dropped = self.entries.len() - retain.min(self.entries.len());
        self.entries.drain(..dropped);
        self.start = self.entries.first().map_or(end, |entry| entry.from);
        return dropped;
    }

    /// Merge composable neighbours that both end at or before `watermark`.
    /// Returns the number of entries removed.
    pub fn compact(&mut self, watermark: u64) -> usize {
        let before = self.entries.len();
        let mut entries = std::mem::take(&mut self.entries).into_iter();
        let Some(mut current) = entries.next() else {
            return 0;
        };

        let mut compacted = Vec::with_capacity(before);
        for next in entries {
            if next.to <= watermark {
                if let Some(operation) = compose(&current.operation, &next.operation) {
                    current = Entry { operation, from: current.from, to: next.to };
                    continue;
                }
            }
            compacted.push(current);
            current = next;
        }
        compacted.push(current);

        self.entries = compacted;
        return before - self.entries.len();
    }

    /// Forget everything and restart at `start`.
    pub fn clear(&mut self, start: u64) {
        self.entries.clear();
        self.start = start;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ot::op::delete;
    use crate::ot::op::insert;

    fn typed(history: &mut History, text: &str) {
        for ch in text.chars() {
            let at = history.end() as usize;
            history.push(insert(at, ch.to_string()).unwrap());
        }
    }

    #[test]
    fn push_tracks_versions() {
        let mut history = History::new(3);
        history.push(insert(0, "a").unwrap());
        history.push(delete(0, 1).unwrap());
        assert_eq!(history.start(), 3);
        assert_eq!(history.end(), 5);
        assert_eq!(history.entries()[1].from, 4);
    }

    #[test]
    fn since_slices_by_version() {
        let mut history = History::new(0);
        typed(&mut history, "abcd");
        assert_eq!(history.since(1).unwrap().len(), 3);
        assert_eq!(history.since(4).unwrap().len(), 0);
        assert!(history.since(5).is_err());
    }

    #[test]
    fn trim_moves_start() {
        let mut history = History::new(0);
        typed(&mut history, "abcdefghijk");
        assert_eq!(history.trim(20, 5), 0);
        assert_eq!(history.trim(10, 5), 6);
        assert_eq!(history.len(), 5);
        assert_eq!(history.start(), 6);
        assert_eq!(history.end(), 11);

        let err = history.since(2).unwrap_err();
        assert_eq!(err, Error::HistoryUnavailable { base: 2, oldest: 6 });
        assert_eq!(err.kind(), ErrorKind::History);
        assert_eq!(history.since(6).unwrap().len(), 5);
    }

    #[test]
    fn trim_to_nothing_starts_at_end() {
        let mut history = History::new(0);
        typed(&mut history, "abc");
        assert_eq!(history.trim(2, 0), 3);
        assert_eq!(history.start(), 3);
        assert_eq!(history.since(3).unwrap().len(), 0);
    }

    #[test]
    fn compact_respects_watermark() {
        let mut history = History::new(0);
        typed(&mut history, "abcdef");
        assert_eq!(history.compact(3), 2);
        assert_eq!(history.len(), 4);
        assert_eq!(history.entries()[0].operation, insert(0, "abc").unwrap());
        assert_eq!((history.entries()[0].from, history.entries()[0].to), (0, 3));

        // Versions inside the merged span are gone; boundaries remain.
        assert!(history.since(1).is_err());
        assert_eq!(history.since(3).unwrap().len(), 3);
    }

    #[test]
    fn compact_everything() {
        let mut history = History::new(0);
        typed(&mut history, "hello");
        history.push(delete(0, 1).unwrap());
        history.push(delete(0, 2).unwrap());
        assert_eq!(history.compact(u64::MAX), 5);
        let ops: Vec<_> = history.operations().cloned().collect();
        assert_eq!(ops, vec![insert(0, "hello").unwrap(), delete(0, 3).unwrap()]);
        assert_eq!(history.end(), 7);
    }

    #[test]
    fn clear_restarts() {
        let mut history = History::new(0);
        typed(&mut history, "ab");
        history.clear(9);
        assert!(history.is_empty());
        assert_eq!(history.start(), 9);
        assert_eq!(history.end(), 9);
        assert!(history.since(8).is_err());
    }
}

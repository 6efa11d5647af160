//! Append-only transcript and activity log
//!
//! Entries and log lines are only ever appended. A turn's entries and its
//! log line go in under one write lock, so a snapshot never shows half a
//! turn.

use crate::state_machine::{ChatEntry, LogLine};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Ordered view of the transcript and log at one instant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub entries: Vec<ChatEntry>,
    pub log: Vec<LogLine>,
}

#[derive(Default)]
struct Inner {
    entries: Vec<ChatEntry>,
    log: Vec<LogLine>,
}

/// Transcript & log store owned by one session
#[derive(Default)]
pub struct TranscriptStore {
    inner: RwLock<Inner>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_entry(&self, entry: ChatEntry) {
        self.commit(std::iter::once(entry), std::iter::empty::<LogLine>());
    }

    pub fn append_log(&self, line: LogLine) {
        self.commit(std::iter::empty::<ChatEntry>(), std::iter::once(line));
    }

    /// Append everything one transition produced as a single unit
    pub fn commit(
        &self,
        entries: impl IntoIterator<Item = ChatEntry>,
        lines: impl IntoIterator<Item = LogLine>,
    ) {
        // A poisoned lock still holds a consistent append-only history
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.entries.extend(entries);
        inner.log.extend(lines);
    }

    pub fn snapshot(&self) -> Snapshot {
        let inner = self
            .inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Snapshot {
            entries: inner.entries.clone(),
            log: inner.log.clone(),
        }
    }

    pub fn entry_count(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entries
            .len()
    }
}

//! Linear undo/redo history with time-based coalescing.
//!
//! Each [`HistoryEntry`] stores the full text before and after one batch of edits. Rapid user
//! edits are fed through [`HistoryStack::observe`]: the first edit of a burst captures a baseline,
//! later edits only move the pending "current" text and re-arm the commit timer. When the timer
//! fires (see [`HistoryStack::poll`]) the burst becomes a single entry.
//!
//! Undo and redo flush any pending burst first, so the entry the user just typed is always the
//! one that gets undone.

use crate::timer::Debouncer;
use std::time::{Duration, Instant};
use tracing::trace;

/// Quiet period after which a burst of edits is committed as one entry.
pub const DEFAULT_COALESCE_WINDOW: Duration = Duration::from_millis(500);

/// History tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Coalescing window for user edits.
    pub coalesce_window: Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            coalesce_window: DEFAULT_COALESCE_WINDOW,
        }
    }
}

/// One coalesced batch of edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Text before the batch.
    pub before: String,
    /// Text after the batch.
    pub after: String,
}

#[derive(Debug, Clone)]
struct PendingBatch {
    baseline: String,
    current: String,
}

/// Undo/redo stack.
///
/// `undo_stack` holds applied entries (newest last); `redo_stack` holds undone entries (most
/// recently undone last). Recording a new entry discards the redo tail.
#[derive(Debug, Clone)]
pub struct HistoryStack {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    pending: Option<PendingBatch>,
    commit: Debouncer,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl HistoryStack {
    /// Create an empty history.
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            pending: None,
            commit: Debouncer::new(config.coalesce_window),
        }
    }

    /// The coalescing window.
    pub fn coalesce_window(&self) -> Duration {
        self.commit.delay()
    }

    /// Append an entry directly, bypassing coalescing.
    ///
    /// Returns `false` (and records nothing) when `before == after`.
    pub fn record(&mut self, before: impl Into<String>, after: impl Into<String>) -> bool {
        let before = before.into();
        let after = after.into();
        if before == after {
            return false;
        }

        self.redo_stack.clear();
        self.undo_stack.push(HistoryEntry { before, after });
        trace!(depth = self.undo_stack.len(), "history entry recorded");
        true
    }

    /// Feed one finalized user edit into the coalescer.
    ///
    /// If the previous burst's window has already elapsed at `now` it is committed first, so the
    /// result does not depend on how often the host polls.
    pub fn observe(&mut self, before: &str, after: &str, now: Instant) {
        if self.commit.fire_if_due(now) {
            self.flush();
        }

        match &mut self.pending {
            Some(batch) => {
                batch.current.clear();
                batch.current.push_str(after);
            }
            None => {
                self.pending = Some(PendingBatch {
                    baseline: before.to_string(),
                    current: after.to_string(),
                });
            }
        }
        self.commit.schedule(now);
    }

    /// Commit the pending burst if its window has elapsed. Returns `true` if an entry was added.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.commit.fire_if_due(now) {
            self.flush()
        } else {
            false
        }
    }

    /// Commit the pending burst immediately. Returns `true` if an entry was added.
    pub fn flush(&mut self) -> bool {
        self.commit.cancel();
        match self.pending.take() {
            Some(batch) => self.record(batch.baseline, batch.current),
            None => false,
        }
    }

    /// Returns `true` if a burst is waiting to be committed.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Deadline of the pending commit, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.commit.deadline()
    }

    /// Undo the newest entry, returning the text to restore.
    pub fn undo(&mut self) -> Option<String> {
        self.flush();
        let entry = self.undo_stack.pop()?;
        let restored = entry.before.clone();
        self.redo_stack.push(entry);
        Some(restored)
    }

    /// Redo the most recently undone entry, returning the text to restore.
    pub fn redo(&mut self) -> Option<String> {
        self.flush();
        let entry = self.redo_stack.pop()?;
        let restored = entry.after.clone();
        self.undo_stack.push(entry);
        Some(restored)
    }

    /// Returns `true` if [`undo`](Self::undo) would restore something (pending bursts count).
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
            || self
                .pending
                .as_ref()
                .is_some_and(|batch| batch.baseline != batch.current)
    }

    /// Returns `true` if [`redo`](Self::redo) would restore something.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of committed, undoable entries.
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of redoable entries.
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Committed entries, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.undo_stack
    }

    /// Drop all history, including any pending burst.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.pending = None;
        self.commit.cancel();
    }
}

// src/watch/aggregator.rs

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;

use crate::types::ChangeKind;

/// Changed paths (relative to the project root) and their latest kind.
pub type ChangeSet = BTreeMap<String, ChangeKind>;

/// Shared record of which files changed since the last run started.
///
/// Cloning the aggregator yields another handle to the same map; the
/// coordinator records into it and the lifecycle reporter flushes it. Every
/// access goes through one mutex, so a `record` either lands before a flush
/// (and is reported by it) or after (and is kept for the next one).
#[derive(Debug, Clone, Default)]
pub struct ChangeAggregator {
    inner: Arc<Mutex<ChangeSet>>,
}

impl ChangeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `path`.
    ///
    /// Returns the kind previously recorded for this path in the current
    /// cycle, if any.
    pub fn record(&self, path: impl Into<String>, kind: ChangeKind) -> Option<ChangeKind> {
        let path = path.into();
        trace!(path = %path, %kind, "recording change");
        self.lock().insert(path, kind)
    }

    /// Atomically take the current map, leaving an empty one behind.
    pub fn flush_and_reset(&self) -> ChangeSet {
        std::mem::take(&mut *self.lock())
    }

    /// Paths recorded so far in this cycle, without resetting.
    pub fn paths(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn kind_of(&self, path: &str) -> Option<ChangeKind> {
        self.lock().get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock can't leave the map half-written
    // (every mutation is a single insert or swap), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, ChangeSet> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

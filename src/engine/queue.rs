// src/engine/queue.rs

use std::collections::VecDeque;

use tracing::debug;

use crate::types::TargetName;

/// Targets waiting for their next run.
///
/// Semantics:
/// - FIFO: targets run in the order their requests first arrived.
/// - Idempotent: a target that is already waiting is not added again, so a
///   burst of requests for the same target collapses into one run.
#[derive(Debug, Default)]
pub struct RunQueue {
    pending: VecDeque<TargetName>,
}

impl RunQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `target` unless it is already waiting. Returns whether it was
    /// added.
    pub fn push(&mut self, target: &str) -> bool {
        if self.contains(target) {
            debug!(target_name = %target, "run already queued; coalescing");
            return false;
        }
        self.pending.push_back(target.to_string());
        debug!(target_name = %target, queued = self.pending.len(), "run queued");
        true
    }

    pub fn pop(&mut self) -> Option<TargetName> {
        self.pending.pop_front()
    }

    /// Drop every waiting request.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    pub fn contains(&self, target: &str) -> bool {
        self.pending.iter().any(|t| t == target)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

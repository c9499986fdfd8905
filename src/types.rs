use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical target name type used throughout the crate.
pub type TargetName = String;

/// Kind of change observed for a single path.
///
/// Only the most recent kind per path survives in the change aggregator, so
/// a delete followed by a re-create within one cycle reports `Added`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Changed,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Changed => "changed",
            ChangeKind::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "added" => Ok(ChangeKind::Added),
            "changed" => Ok(ChangeKind::Changed),
            "deleted" => Ok(ChangeKind::Deleted),
            other => Err(format!(
                "invalid change kind: {other} (expected \"added\", \"changed\" or \"deleted\")"
            )),
        }
    }
}

/// What happens to an in-flight run when a target sees new changes.
///
/// - `interrupt = false` (default): the new run request queues behind the
///   in-flight run.
/// - `interrupt = true`: the in-flight run is cancelled and a fresh run
///   starts right away.
/// - `nospawn = true`: task commands share the watcher's terminal instead of
///   having their output captured. Such runs cannot be cancelled, so
///   `nospawn` disables `interrupt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TargetPolicy {
    pub interrupt: bool,
    pub nospawn: bool,
}

impl TargetPolicy {
    /// Whether a new change for this target preempts the in-flight run.
    pub fn effective_interrupt(&self) -> bool {
        self.interrupt && !self.nospawn
    }
}

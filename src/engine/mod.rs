// src/engine/mod.rs

//! Orchestration engine for taskwatch.
//!
//! This module ties together:
//! - the run coordinator (per-change decisions: reload, broadcast, run)
//! - the run queue (what happens when requests arrive while a run is active)
//! - the lifecycle reporter (status lines on start/end/interrupt/reload)
//! - the main runtime event loop that reacts to:
//!   - file changes and watch errors
//!   - debounce timers
//!   - run completions
//!   - reload results
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::sync::Arc;
use std::time::Duration;

use crate::config::{Target, WatchSnapshot};
use crate::errors::WatchFailure;
use crate::types::{ChangeKind, TargetName};

/// Monotonically increasing identifier of a run.
pub type RunId = u64;

/// A run handed to the task engine.
///
/// Carries the target as it was when the run started, so a reload during
/// the run doesn't change what it executes.
#[derive(Debug, Clone)]
pub struct ScheduledRun {
    pub run_id: RunId,
    pub target: Arc<Target>,
}

impl PartialEq for ScheduledRun {
    fn eq(&self, other: &Self) -> bool {
        self.run_id == other.run_id && self.target.name == other.target.name
    }
}

/// Outcome of a whole run (all of a target's tasks).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    /// The named task failed; later tasks of the run were skipped.
    Failed { task: String, code: i32 },
}

/// Lifecycle notifications consumed by the [`reporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Start { run_id: RunId, target: TargetName },
    End {
        run_id: RunId,
        target: TargetName,
        duration: Duration,
        outcome: RunOutcome,
    },
    Interrupt { run_id: RunId, target: TargetName },
    Reload,
}

/// Events flowing into the runtime from sessions, timers, the task engine
/// and signal handling.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A watched file changed. `generation` is the snapshot version of the
    /// session that saw it.
    FileChanged {
        generation: u64,
        target: TargetName,
        path: String,
        kind: ChangeKind,
    },
    /// An established session reported an error.
    WatchFailed { generation: u64, failure: WatchFailure },
    /// The debounce window armed for `target` under `generation` has closed.
    DebounceElapsed { generation: u64, target: TargetName },
    /// The task engine finished a run.
    RunFinished {
        run_id: RunId,
        outcome: RunOutcome,
        elapsed: Duration,
    },
    /// A reload built a new snapshot and its sessions.
    ReloadSucceeded(Arc<WatchSnapshot>),
    /// A reload failed; the message is already formatted for display.
    ReloadFailed(String),
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod coordinator;
pub mod core;
pub mod queue;
pub mod reporter;
pub mod runtime;

pub use coordinator::{ChangeDecision, ReloadDetector, RunCoordinator};
pub use self::core::{CoreCommand, CoreRuntime, CoreStep};
pub use queue::RunQueue;
pub use reporter::LifecycleReporter;
pub use runtime::Runtime;

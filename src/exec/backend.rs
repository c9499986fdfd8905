// src/exec/backend.rs

//! Pluggable task engine abstraction.
//!
//! The runtime talks to a `TaskEngine` instead of spawning processes itself.
//! This makes it easy to swap in a fake engine in tests.
//!
//! - `ProcessEngine` is the implementation used by `taskwatch`. Each run
//!   executes in its own Tokio task and can be cancelled through a oneshot.
//! - Tests can provide an engine that records scheduled runs and emits
//!   `RunFinished` events directly.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::engine::{RunId, RuntimeEvent, ScheduledRun};
use crate::errors::Result;

use super::task_runner::run_target;

/// Trait abstracting how runs are executed.
///
/// Completion is reported asynchronously as `RuntimeEvent::RunFinished`; an
/// interrupted run must not report completion.
pub trait TaskEngine: Send {
    /// Begin executing `run`.
    fn start_run(
        &mut self,
        run: ScheduledRun,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Cancel the run with `run_id` if it is still executing.
    fn interrupt(&mut self, run_id: RunId) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Internal handle for an executing run.
struct ActiveRun {
    cancel: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

/// Runs task commands as child processes in the project root.
pub struct ProcessEngine {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    root: PathBuf,
    active: HashMap<RunId, ActiveRun>,
}

impl std::fmt::Debug for ProcessEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessEngine")
            .field("root", &self.root)
            .field("active", &self.active.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ProcessEngine {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, root: impl Into<PathBuf>) -> Self {
        Self {
            runtime_tx,
            root: root.into(),
            active: HashMap::new(),
        }
    }

    fn reap_finished(&mut self) {
        self.active.retain(|_, run| !run.handle.is_finished());
    }
}

impl TaskEngine for ProcessEngine {
    fn start_run(
        &mut self,
        run: ScheduledRun,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.reap_finished();

            let run_id = run.run_id;
            let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
            let runtime_tx = self.runtime_tx.clone();
            let root = self.root.clone();

            let handle = tokio::spawn(async move {
                run_target(run, root, runtime_tx, cancel_rx).await;
                debug!(run_id, "run future finished");
            });

            self.active.insert(
                run_id,
                ActiveRun {
                    cancel: Some(cancel_tx),
                    handle,
                },
            );
            Ok(())
        })
    }

    fn interrupt(&mut self, run_id: RunId) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let Some(mut run) = self.active.remove(&run_id) else {
                debug!(run_id, "interrupt requested for unknown run");
                return Ok(());
            };

            info!(run_id, "cancelling run");
            if let Some(cancel) = run.cancel.take() {
                if cancel.send(()).is_err() {
                    debug!(run_id, "run already finished while cancelling");
                }
            }
            Ok(())
        })
    }
}

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskwatch::engine::{RunId, RunOutcome, RuntimeEvent, ScheduledRun};
use taskwatch::errors::Result;
use taskwatch::exec::TaskEngine;
use tokio::sync::mpsc;

/// What the fake engine was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Start { run_id: RunId, target: String },
    Interrupt { run_id: RunId },
}

/// A fake task engine that:
/// - records every start and interrupt
/// - optionally reports `RunFinished(Success)` right away with a fixed
///   elapsed time (`auto_complete`)
pub struct FakeEngine {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    calls: Arc<Mutex<Vec<EngineCall>>>,
    auto_complete: Option<Duration>,
}

impl FakeEngine {
    /// Engine whose runs never finish unless the test sends `RunFinished`.
    pub fn manual(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            runtime_tx,
            calls: Arc::new(Mutex::new(Vec::new())),
            auto_complete: None,
        }
    }

    /// Engine that completes every run successfully after recording it.
    pub fn completing(runtime_tx: mpsc::Sender<RuntimeEvent>, elapsed: Duration) -> Self {
        Self {
            auto_complete: Some(elapsed),
            ..Self::manual(runtime_tx)
        }
    }

    /// Handle to the recorded calls; stays valid after the engine is moved
    /// into a runtime.
    pub fn calls(&self) -> Arc<Mutex<Vec<EngineCall>>> {
        Arc::clone(&self.calls)
    }
}

impl TaskEngine for FakeEngine {
    fn start_run(
        &mut self,
        run: ScheduledRun,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let calls = Arc::clone(&self.calls);
        let auto_complete = self.auto_complete;

        Box::pin(async move {
            calls.lock().unwrap().push(EngineCall::Start {
                run_id: run.run_id,
                target: run.target.name.clone(),
            });

            if let Some(elapsed) = auto_complete {
                tx.send(RuntimeEvent::RunFinished {
                    run_id: run.run_id,
                    outcome: RunOutcome::Success,
                    elapsed,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }

    fn interrupt(&mut self, run_id: RunId) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let calls = Arc::clone(&self.calls);
        Box::pin(async move {
            calls.lock().unwrap().push(EngineCall::Interrupt { run_id });
            Ok(())
        })
    }
}

// src/engine/runtime.rs

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Write};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::SnapshotLoader;
use crate::errors::Result;
use crate::exec::TaskEngine;
use crate::watch::{WatchSession, open_sessions};

use super::core::CoreRuntime;
use super::reporter::LifecycleReporter;
use super::{CoreCommand, RuntimeEvent};

/// Drives the core state machine in response to `RuntimeEvent`s and carries
/// out its commands.
///
/// This is the IO shell around `CoreRuntime`, which holds all the semantics.
/// The shell owns the sessions, the task engine, the reporter and the
/// snapshot loader, and is the only consumer of the event channel.
pub struct Runtime<E: TaskEngine, W: Write = io::Stdout> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    /// Handed to debounce timers and to sessions opened on reload.
    event_tx: mpsc::Sender<RuntimeEvent>,
    engine: E,
    reporter: LifecycleReporter<W>,
    loader: SnapshotLoader,
    sessions: Vec<WatchSession>,
}

impl<E: TaskEngine, W: Write> fmt::Debug for Runtime<E, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl<E: TaskEngine, W: Write> Runtime<E, W> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        event_tx: mpsc::Sender<RuntimeEvent>,
        engine: E,
        reporter: LifecycleReporter<W>,
        loader: SnapshotLoader,
    ) -> Self {
        Self {
            core,
            event_rx,
            event_tx,
            engine,
            reporter,
            loader,
            sessions: Vec::new(),
        }
    }

    /// Install the sessions opened for the initial snapshot.
    pub fn with_sessions(mut self, sessions: Vec<WatchSession>) -> Self {
        self.sessions = sessions;
        self
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Feeds them into the core runtime.
    /// - Executes the commands returned by the core. A reload is performed
    ///   inline and its result is fed back to the core before the next
    ///   channel event.
    ///
    /// Returns the reporter so callers can inspect what was written.
    pub async fn run(mut self) -> Result<LifecycleReporter<W>> {
        info!(
            version = self.core.snapshot().version(),
            sessions = self.sessions.len(),
            "taskwatch runtime started"
        );

        if self.core.is_idle() {
            self.reporter.waiting()?;
        }

        let mut pending = VecDeque::new();

        'outer: loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };
            pending.push_back(event);

            while let Some(event) = pending.pop_front() {
                debug!(?event, "runtime received event");

                let step = self.core.step(event);

                for command in step.commands {
                    if let Some(follow_up) = self.execute_command(command).await? {
                        pending.push_back(follow_up);
                    }
                }

                if !step.keep_running {
                    info!("core requested exit; stopping runtime");
                    break 'outer;
                }
            }
        }

        info!("runtime exiting");
        Ok(self.reporter)
    }

    /// Execute a single command from the core, returning an event that must
    /// be handled before anything else.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<Option<RuntimeEvent>> {
        match command {
            CoreCommand::Lifecycle(event) => {
                self.reporter.report(&event, self.loader.cache_mut())?;
            }
            CoreCommand::StartRun(run) => {
                debug!(run_id = run.run_id, target_name = %run.target.name, "starting run");
                self.engine.start_run(run).await?;
            }
            CoreCommand::InterruptRun { run_id } => {
                self.engine.interrupt(run_id).await?;
            }
            CoreCommand::ArmDebounce {
                generation,
                target,
                delay,
            } => {
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if tx
                        .send(RuntimeEvent::DebounceElapsed { generation, target })
                        .await
                        .is_err()
                    {
                        debug!("runtime gone before debounce elapsed");
                    }
                });
            }
            CoreCommand::Reload => return Ok(Some(self.reload())),
            CoreCommand::ReportError(message) => {
                self.reporter.error(&message)?;
            }
        }
        Ok(None)
    }

    /// Rebuild the snapshot and its sessions.
    ///
    /// On failure the current sessions are left untouched.
    fn reload(&mut self) -> RuntimeEvent {
        let root = self.loader.root().to_path_buf();
        let result = self.loader.load().and_then(|snapshot| {
            let sessions = open_sessions(&snapshot, &root, &self.event_tx)?;
            Ok((snapshot, sessions))
        });

        match result {
            Ok((snapshot, sessions)) => {
                debug!(
                    old = self.sessions.len(),
                    new = sessions.len(),
                    "replacing watch sessions"
                );
                self.sessions = sessions;
                RuntimeEvent::ReloadSucceeded(snapshot)
            }
            Err(err) => {
                warn!(error = %err, "reload failed; keeping previous configuration");
                RuntimeEvent::ReloadFailed(err.to_string())
            }
        }
    }
}

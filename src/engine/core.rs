// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of commands describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from the channel
//! - arming debounce timers
//! - handing runs to the task engine and interrupting them
//! - rebuilding the snapshot and sessions on reload
//! - printing lifecycle status lines
//!
//! The core has no Tokio types, no channels and performs no IO, so it can be
//! tested event by event.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::{Target, WatchSnapshot};
use crate::engine::coordinator::RunCoordinator;
use crate::engine::queue::RunQueue;
use crate::engine::{LifecycleEvent, RunId, RunOutcome, RuntimeEvent, ScheduledRun};
use crate::types::TargetName;

/// Command produced by the pure core, executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreCommand {
    /// Hand a lifecycle event to the reporter.
    Lifecycle(LifecycleEvent),
    /// Start executing the target's tasks.
    StartRun(ScheduledRun),
    /// Cancel an in-flight run. Its completion, if any, will be stale.
    InterruptRun { run_id: RunId },
    /// Send `DebounceElapsed { generation, target }` after `delay`.
    ArmDebounce {
        generation: u64,
        target: TargetName,
        delay: Duration,
    },
    /// Rebuild the snapshot and its sessions, then report back with
    /// `ReloadSucceeded` / `ReloadFailed`.
    Reload,
    /// Print an error status line.
    ReportError(String),
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn cont(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

#[derive(Debug)]
struct ActiveRun {
    run_id: RunId,
    target: Arc<Target>,
}

/// Pure core runtime state.
///
/// Owns the current snapshot, the coordinator, the run queue and the
/// bookkeeping for the single in-flight run.
#[derive(Debug)]
pub struct CoreRuntime {
    snapshot: Arc<WatchSnapshot>,
    coordinator: RunCoordinator,
    queue: RunQueue,
    active: Option<ActiveRun>,
    /// Targets with an armed debounce timer, keyed to the generation the
    /// timer was armed under.
    debouncing: HashMap<TargetName, u64>,
    reloading: bool,
    run_counter: RunId,
}

impl CoreRuntime {
    pub fn new(snapshot: Arc<WatchSnapshot>, coordinator: RunCoordinator) -> Self {
        Self {
            snapshot,
            coordinator,
            queue: RunQueue::new(),
            active: None,
            debouncing: HashMap::new(),
            reloading: false,
            run_counter: 0,
        }
    }

    pub fn snapshot(&self) -> &Arc<WatchSnapshot> {
        &self.snapshot
    }

    pub fn coordinator(&self) -> &RunCoordinator {
        &self.coordinator
    }

    pub fn queue(&self) -> &RunQueue {
        &self.queue
    }

    /// Run id of the in-flight run, if any.
    pub fn active_run(&self) -> Option<RunId> {
        self.active.as_ref().map(|a| a.run_id)
    }

    pub fn active_target(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.target.name.as_str())
    }

    /// No run in flight and no reload in progress.
    pub fn is_idle(&self) -> bool {
        self.active.is_none() && !self.reloading
    }

    pub fn is_reloading(&self) -> bool {
        self.reloading
    }

    pub fn is_debouncing(&self, target: &str) -> bool {
        self.debouncing.contains_key(target)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        let mut commands = Vec::new();

        match event {
            RuntimeEvent::FileChanged {
                generation,
                target,
                path,
                kind,
            } => {
                if generation > self.snapshot.version() {
                    debug!(generation, target_name = %target, path, "ignoring change from unknown session");
                    return CoreStep::cont(commands);
                }
                let Some(t) = self.snapshot.target(&target).cloned() else {
                    debug!(target_name = %target, "ignoring change for unknown target");
                    return CoreStep::cont(commands);
                };
                // Sessions replaced by a reload may still have events in
                // flight; keep them if the current patterns still cover them.
                if !self.is_current(generation) && !t.matcher.matches(&path) {
                    debug!(generation, target_name = %target, path, "ignoring change no longer watched");
                    return CoreStep::cont(commands);
                }

                let decision = self.coordinator.on_change(&t, &path, kind);
                if !decision.run_requested && !decision.reload_requested {
                    return CoreStep::cont(commands);
                }

                if t.options.debounce.is_zero() {
                    self.request_run(&t, &mut commands);
                } else if !self.debouncing.contains_key(&t.name) {
                    let generation = self.snapshot.version();
                    self.debouncing.insert(t.name.clone(), generation);
                    commands.push(CoreCommand::ArmDebounce {
                        generation,
                        target: t.name.clone(),
                        delay: t.options.debounce,
                    });
                }
            }

            RuntimeEvent::DebounceElapsed { generation, target } => {
                if self.debouncing.get(&target) != Some(&generation) {
                    debug!(generation, target_name = %target, "ignoring stale debounce timer");
                    return CoreStep::cont(commands);
                }
                self.debouncing.remove(&target);
                if let Some(t) = self.snapshot.target(&target).cloned() {
                    self.request_run(&t, &mut commands);
                }
            }

            RuntimeEvent::RunFinished {
                run_id,
                outcome,
                elapsed,
            } => match self.active.take() {
                Some(active) if active.run_id == run_id => {
                    if let RunOutcome::Failed { task, code } = &outcome {
                        warn!(target_name = %active.target.name, task, code, "run failed");
                    }
                    commands.push(CoreCommand::Lifecycle(LifecycleEvent::End {
                        run_id,
                        target: active.target.name.clone(),
                        duration: elapsed,
                        outcome,
                    }));
                    self.start_next(&mut commands);
                }
                other => {
                    self.active = other;
                    debug!(run_id, "ignoring completion of a run that is no longer active");
                }
            },

            RuntimeEvent::ReloadSucceeded(snapshot) => {
                info!(version = snapshot.version(), "watch configuration reloaded");
                self.coordinator.set_detector(snapshot.detector().clone());
                self.snapshot = snapshot;
                self.reloading = false;
                // Pending timers keep running for targets that survived.
                let current = &self.snapshot;
                self.debouncing.retain(|name, _| {
                    let kept = current.target(name).is_some();
                    if !kept {
                        debug!(target_name = %name, "dropping debounce for removed target");
                    }
                    kept
                });
                self.start_next(&mut commands);
            }

            RuntimeEvent::ReloadFailed(message) => {
                self.reloading = false;
                let dropped = self.queue.clear();
                error!(dropped, "reload failed: {message}");
                commands.push(CoreCommand::ReportError(message));
            }

            RuntimeEvent::WatchFailed {
                generation,
                failure,
            } => {
                if self.is_current(generation) {
                    error!(generation, "watch error: {failure}");
                } else {
                    debug!(generation, "ignoring error from stale session: {failure}");
                }
            }

            RuntimeEvent::ShutdownRequested => {
                if let Some(active) = self.active.take() {
                    commands.push(CoreCommand::InterruptRun {
                        run_id: active.run_id,
                    });
                }
                return CoreStep {
                    commands,
                    keep_running: false,
                };
            }
        }

        CoreStep::cont(commands)
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.snapshot.version()
    }

    /// A debounced request for `target` arrived.
    ///
    /// - Idle: start the next run (or the pending reload).
    /// - Busy and the target's effective interrupt policy holds: interrupt
    ///   the in-flight run, then start the next run right away.
    /// - Otherwise wait for the in-flight run to finish.
    fn request_run(&mut self, target: &Arc<Target>, commands: &mut Vec<CoreCommand>) {
        if target.has_tasks() {
            self.queue.push(&target.name);
        }

        let preempt = match &self.active {
            Some(active) => {
                target.has_tasks()
                    && target.policy.effective_interrupt()
                    && !active.target.policy.nospawn
            }
            None => false,
        };

        if preempt {
            if let Some(active) = self.active.take() {
                info!(
                    run_id = active.run_id,
                    running = %active.target.name,
                    requested_by = %target.name,
                    "interrupting run"
                );
                commands.push(CoreCommand::Lifecycle(LifecycleEvent::Interrupt {
                    run_id: active.run_id,
                    target: active.target.name.clone(),
                }));
                commands.push(CoreCommand::InterruptRun {
                    run_id: active.run_id,
                });
            }
        } else if let Some(active) = &self.active {
            debug!(
                run_id = active.run_id,
                requested_by = %target.name,
                "run in flight; request waits"
            );
        }

        self.start_next(commands);
    }

    fn start_next(&mut self, commands: &mut Vec<CoreCommand>) {
        if !self.is_idle() {
            return;
        }

        if self.coordinator.take_reload() {
            self.reloading = true;
            commands.push(CoreCommand::Lifecycle(LifecycleEvent::Reload));
            commands.push(CoreCommand::Reload);
            return;
        }

        while let Some(name) = self.queue.pop() {
            let Some(target) = self.snapshot.target(&name).cloned() else {
                debug!(target_name = %name, "dropping queued run for target no longer configured");
                continue;
            };

            self.run_counter += 1;
            let run_id = self.run_counter;
            self.active = Some(ActiveRun {
                run_id,
                target: Arc::clone(&target),
            });

            commands.push(CoreCommand::Lifecycle(LifecycleEvent::Start {
                run_id,
                target: name,
            }));
            commands.push(CoreCommand::StartRun(ScheduledRun { run_id, target }));
            return;
        }
    }
}

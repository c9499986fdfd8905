// src/exec/task_runner.rs

//! Runs one target's tasks as child processes.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::TaskSpec;
use crate::engine::{RunOutcome, RuntimeEvent, ScheduledRun};

/// Execute the tasks of `run` in order, stopping at the first failure, and
/// send `RunFinished` with the total elapsed time.
///
/// If the cancel channel fires (or its sender is dropped), the current child
/// process is killed and **no** `RunFinished` is sent for this run.
pub async fn run_target(
    run: ScheduledRun,
    root: PathBuf,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    let started = Instant::now();
    let run_id = run.run_id;
    let nospawn = run.target.policy.nospawn;
    let mut outcome = RunOutcome::Success;

    for task in &run.target.tasks {
        match run_task(task, run_id, nospawn, &root, &mut cancel_rx).await {
            Ok(Some(0)) => {}
            Ok(Some(code)) => {
                outcome = RunOutcome::Failed {
                    task: task.name.clone(),
                    code,
                };
                break;
            }
            Ok(None) => {
                debug!(run_id, "run cancelled; not reporting completion");
                return;
            }
            Err(err) => {
                error!(task = %task.name, run_id, error = %err, "task execution error");
                outcome = RunOutcome::Failed {
                    task: task.name.clone(),
                    code: -1,
                };
                break;
            }
        }
    }

    let elapsed = started.elapsed();
    if runtime_tx
        .send(RuntimeEvent::RunFinished {
            run_id,
            outcome,
            elapsed,
        })
        .await
        .is_err()
    {
        warn!(run_id, "runtime gone; dropping RunFinished");
    }
}

/// Run one task. Returns the exit code, or `None` when cancelled.
async fn run_task(
    task: &TaskSpec,
    run_id: u64,
    nospawn: bool,
    root: &Path,
    cancel_rx: &mut oneshot::Receiver<()>,
) -> Result<Option<i32>> {
    info!(task = %task.name, run_id, cmd = %task.cmd, "starting task process");

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&task.cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&task.cmd);
        c
    };

    cmd.current_dir(root).kill_on_drop(true);
    if nospawn {
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
    } else {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for task '{}'", task.name))?;

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                println!("{line}");
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                eprintln!("{line}");
            }
        });
    }

    tokio::select! {
        status_res = child.wait() => {
            let status = status_res.with_context(|| {
                format!("waiting for process of task '{}'", task.name)
            })?;
            // Killed by a signal: no exit code.
            let code = status.code().unwrap_or(-1);
            info!(
                task = %task.name,
                run_id,
                exit_code = code,
                success = status.success(),
                "task process exited"
            );
            Ok(Some(code))
        }

        cancel = cancel_rx => {
            match cancel {
                Ok(()) => {
                    info!(task = %task.name, run_id, "cancellation requested; killing process");
                }
                Err(e) => {
                    debug!(task = %task.name, run_id, error = %e, "cancel channel closed; stopping run");
                }
            }
            if let Err(e) = child.kill().await {
                warn!(task = %task.name, run_id, error = %e, "failed to kill child process on cancellation");
            }
            Ok(None)
        }
    }
}

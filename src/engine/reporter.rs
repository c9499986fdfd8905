// src/engine/reporter.rs

//! Human-readable status lines for lifecycle events.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::config::ConfigCache;
use crate::engine::{LifecycleEvent, RunOutcome};
use crate::errors::Result;
use crate::watch::ChangeAggregator;

const WAITING: &str = "Waiting...";

/// Prints lifecycle status lines and owns the aggregator flush.
///
/// `Start` is the only place the aggregator is reset; `Reload` reads the
/// recorded paths but leaves them for the run that follows.
#[derive(Debug)]
pub struct LifecycleReporter<W: Write = io::Stdout> {
    aggregator: ChangeAggregator,
    root: PathBuf,
    out: W,
}

impl LifecycleReporter<io::Stdout> {
    pub fn stdout(aggregator: ChangeAggregator, root: impl Into<PathBuf>) -> Self {
        Self::new(aggregator, root, io::stdout())
    }
}

impl<W: Write> LifecycleReporter<W> {
    pub fn new(aggregator: ChangeAggregator, root: impl Into<PathBuf>, out: W) -> Self {
        Self {
            aggregator,
            root: root.into(),
            out,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn report(&mut self, event: &LifecycleEvent, cache: &mut ConfigCache) -> Result<()> {
        match event {
            LifecycleEvent::Start { run_id, target } => {
                debug!(run_id, target_name = %target, "run started");
                writeln!(self.out, "OK")?;
                for (path, kind) in self.aggregator.flush_and_reset() {
                    writeln!(self.out, "File \"{path}\" {kind}.")?;
                }
            }
            LifecycleEvent::End {
                run_id,
                target,
                duration,
                outcome,
            } => {
                debug!(run_id, target_name = %target, ?duration, "run ended");
                if let RunOutcome::Failed { task, code } = outcome {
                    writeln!(self.out, "Task \"{task}\" failed with exit code {code}.")?;
                }
                if !duration.is_zero() {
                    let now = humantime::format_rfc3339_seconds(SystemTime::now());
                    writeln!(
                        self.out,
                        "\nCompleted in {:.3}s at {now} - {WAITING}",
                        duration.as_secs_f64()
                    )?;
                }
            }
            LifecycleEvent::Interrupt { run_id, target } => {
                debug!(run_id, target_name = %target, "run interrupted");
                writeln!(self.out, "\nScheduled tasks have been interrupted...")?;
            }
            LifecycleEvent::Reload => {
                let paths = self.aggregator.paths();
                let removed = cache.invalidate(&self.root, &paths);
                debug!(removed, "invalidated cached configs before reload");
                writeln!(self.out, "\nReloading watch config...")?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    /// Initial idle line.
    pub fn waiting(&mut self) -> Result<()> {
        writeln!(self.out, "{WAITING}")?;
        self.out.flush()?;
        Ok(())
    }

    pub fn error(&mut self, message: &str) -> Result<()> {
        writeln!(self.out, "ERROR")?;
        writeln!(self.out, ">> {message}")?;
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

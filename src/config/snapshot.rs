// src/config/snapshot.rs

//! Immutable, versioned view of the watch configuration.
//!
//! A [`WatchSnapshot`] is built once at startup and again on every reload.
//! Reload never mutates a snapshot in place; the runtime swaps in a new
//! `Arc<WatchSnapshot>` and runs that are already in flight keep the
//! `Arc<Target>` they started with.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::loader::ConfigCache;
use crate::config::model::{ConfigFile, parse_duration};
use crate::engine::coordinator::ReloadDetector;
use crate::errors::{Result, TaskwatchError};
use crate::types::{TargetName, TargetPolicy};
use crate::watch::patterns::{CompiledPatterns, resolve_patterns};

/// One task command, resolved from `[task.<name>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: String,
    pub cmd: String,
}

/// Notification backend options for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Window during which raw events collapse into one run request.
    pub debounce: Duration,
}

/// A fully resolved watch target.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: TargetName,
    /// Resolved patterns, in configuration order.
    pub patterns: Vec<String>,
    pub matcher: CompiledPatterns,
    pub options: WatchOptions,
    /// Tasks to run, in order. Empty means "watch and broadcast only".
    pub tasks: Vec<TaskSpec>,
    pub policy: TargetPolicy,
}

impl Target {
    pub fn has_tasks(&self) -> bool {
        !self.tasks.is_empty()
    }
}

/// Versioned set of targets plus the config-source detector.
#[derive(Debug, Clone)]
pub struct WatchSnapshot {
    version: u64,
    targets: Vec<Arc<Target>>,
    detector: ReloadDetector,
}

impl WatchSnapshot {
    /// Resolve targets from a validated config.
    ///
    /// `only_target` restricts the snapshot to a single target (the
    /// `--target` flag); naming an unknown target is an error.
    pub fn from_config(
        version: u64,
        cfg: &ConfigFile,
        config_path: &Path,
        only_target: Option<&str>,
    ) -> Result<Self> {
        if let Some(name) = only_target {
            if !cfg.target.contains_key(name) {
                return Err(TaskwatchError::ConfigError(format!(
                    "target '{name}' not found in config"
                )));
            }
        }

        let default_debounce = cfg.config.debounce_duration()?;
        let mut targets = Vec::new();

        for (name, tc) in cfg.target.iter() {
            if only_target.is_some_and(|only| only != name) {
                continue;
            }

            let patterns = resolve_patterns(&tc.files, &cfg.vars).map_err(|e| {
                TaskwatchError::ConfigError(format!("target '{name}' files: {e}"))
            })?;
            let matcher = CompiledPatterns::compile(&patterns)?;

            let debounce = match &tc.options.debounce {
                Some(d) => parse_duration(d)?,
                None => default_debounce,
            };

            let tasks = tc
                .tasks
                .iter()
                .flatten()
                .map(|task_name| {
                    cfg.task
                        .get(task_name)
                        .map(|task| TaskSpec {
                            name: task_name.clone(),
                            cmd: task.cmd.clone(),
                        })
                        .ok_or_else(|| {
                            TaskwatchError::ConfigError(format!(
                                "target '{name}' references unknown task '{task_name}'"
                            ))
                        })
                })
                .collect::<Result<Vec<_>>>()?;

            let policy = TargetPolicy {
                interrupt: tc.interrupt.unwrap_or(cfg.config.interrupt),
                nospawn: tc.nospawn.unwrap_or(cfg.config.nospawn),
            };

            debug!(target_name = %name, ?patterns, ?policy, "resolved target");

            targets.push(Arc::new(Target {
                name: name.clone(),
                patterns,
                matcher,
                options: WatchOptions { debounce },
                tasks,
                policy,
            }));
        }

        Ok(Self {
            version,
            targets,
            detector: ReloadDetector::for_config_path(config_path)?,
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn targets(&self) -> &[Arc<Target>] {
        &self.targets
    }

    pub fn target(&self, name: &str) -> Option<&Arc<Target>> {
        self.targets.iter().find(|t| t.name == name)
    }

    pub fn detector(&self) -> &ReloadDetector {
        &self.detector
    }
}

/// Builds successive snapshots from the config file on disk.
///
/// Owns the [`ConfigCache`] so that a reload only re-parses files that were
/// invalidated since the last load.
#[derive(Debug)]
pub struct SnapshotLoader {
    config_path: PathBuf,
    root: PathBuf,
    only_target: Option<String>,
    cache: ConfigCache,
    next_version: u64,
}

impl SnapshotLoader {
    pub fn new(
        config_path: impl Into<PathBuf>,
        root: impl Into<PathBuf>,
        only_target: Option<String>,
    ) -> Self {
        Self {
            config_path: config_path.into(),
            root: root.into(),
            only_target,
            cache: ConfigCache::new(),
            next_version: 1,
        }
    }

    /// Project root that patterns and recorded paths are relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn cache_mut(&mut self) -> &mut ConfigCache {
        &mut self.cache
    }

    /// Load (or re-load) the config and build the next snapshot version.
    pub fn load(&mut self) -> Result<Arc<WatchSnapshot>> {
        let cfg = self.cache.load(&self.config_path)?;
        let snapshot = WatchSnapshot::from_config(
            self.next_version,
            &cfg,
            &self.config_path,
            self.only_target.as_deref(),
        )?;
        info!(
            version = snapshot.version(),
            targets = snapshot.targets().len(),
            "loaded watch configuration"
        );
        self.next_version += 1;
        Ok(Arc::new(snapshot))
    }
}

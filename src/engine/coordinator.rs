// src/engine/coordinator.rs

//! Per-change decisions: reload detection, aggregation, broadcast.
//!
//! Debouncing, queueing and interrupts live in the [`core`](super::core)
//! state machine; this module only answers "what does this one change
//! mean?".

use std::path::Path;

use regex::{Regex, RegexBuilder};
use tracing::{debug, info};

use crate::config::Target;
use crate::errors::{Result, TaskwatchError};
use crate::types::ChangeKind;
use crate::watch::{ChangeAggregator, ChangeBroadcast, ChangeNotification};

const DEFAULT_CONFIG_NAME: &str = "Taskwatch.toml";

/// Recognizes changes to the configuration source.
///
/// Only the file name is compared, so a same-named file in any watched
/// subdirectory (`sub/Taskwatch.toml`) also requests a reload. That reload
/// re-reads the config from the cache: invalidation only drops entries for
/// the recorded paths, and the root config is not among them.
#[derive(Debug, Clone)]
pub struct ReloadDetector {
    pattern: Regex,
}

impl ReloadDetector {
    /// Build a detector for the file name of `config_path`.
    ///
    /// Matching is case-insensitive and anchored at a path-segment boundary,
    /// so `Taskwatch.toml` and `sub/taskwatch.TOML` match but
    /// `MyTaskwatch.toml` does not.
    pub fn for_config_path(config_path: &Path) -> Result<Self> {
        let name = config_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_CONFIG_NAME.to_string());

        let pattern = RegexBuilder::new(&format!("(^|/){}$", regex::escape(&name)))
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                TaskwatchError::ConfigError(format!("invalid config file name '{name}': {e}"))
            })?;

        Ok(Self { pattern })
    }

    /// True if `rel_path` (forward slashes) is the configuration source.
    pub fn is_config_source(&self, rel_path: &str) -> bool {
        self.pattern.is_match(rel_path)
    }
}

/// What a single change event led to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeDecision {
    /// The change touched the configuration source.
    pub reload_requested: bool,
    /// At least one broadcast listener received a notification.
    pub notified: bool,
    /// The target has tasks and wants a (debounced) run.
    pub run_requested: bool,
}

#[derive(Debug)]
pub struct RunCoordinator {
    aggregator: ChangeAggregator,
    broadcast: ChangeBroadcast,
    detector: ReloadDetector,
    reload_pending: bool,
    reload_requests: u64,
}

impl RunCoordinator {
    pub fn new(
        aggregator: ChangeAggregator,
        broadcast: ChangeBroadcast,
        detector: ReloadDetector,
    ) -> Self {
        Self {
            aggregator,
            broadcast,
            detector,
            reload_pending: false,
            reload_requests: 0,
        }
    }

    /// Apply one observed change for `target`.
    pub fn on_change(&mut self, target: &Target, path: &str, kind: ChangeKind) -> ChangeDecision {
        let mut decision = ChangeDecision::default();

        if self.detector.is_config_source(path) {
            self.reload_pending = true;
            self.reload_requests += 1;
            decision.reload_requested = true;
            info!(path, %kind, "configuration source changed; reload pending");
        }

        self.aggregator.record(path, kind);

        decision.notified = self.broadcast.emit(ChangeNotification {
            kind,
            path: path.to_string(),
            target: target.name.clone(),
        });

        decision.run_requested = target.has_tasks();

        debug!(
            target_name = %target.name,
            path,
            %kind,
            ?decision,
            "change processed"
        );
        decision
    }

    /// Consume the pending reload flag.
    pub fn take_reload(&mut self) -> bool {
        std::mem::take(&mut self.reload_pending)
    }

    pub fn reload_pending(&self) -> bool {
        self.reload_pending
    }

    /// How many change events have requested a reload so far.
    pub fn reload_requests(&self) -> u64 {
        self.reload_requests
    }

    /// Swap in the detector of a freshly loaded snapshot.
    pub fn set_detector(&mut self, detector: ReloadDetector) {
        self.detector = detector;
    }

    pub fn aggregator(&self) -> &ChangeAggregator {
        &self.aggregator
    }

    pub fn broadcast(&self) -> &ChangeBroadcast {
        &self.broadcast
    }
}

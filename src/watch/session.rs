// src/watch/session.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::config::{Target, WatchSnapshot};
use crate::engine::RuntimeEvent;
use crate::errors::{Result, TaskwatchError, WatchFailure};
use crate::types::{ChangeKind, TargetName};
use crate::watch::path_utils::event_path;

/// One filesystem subscription for one target.
///
/// Keeps the underlying `RecommendedWatcher` alive; dropping the session
/// stops the subscription and ends its forwarding task.
pub struct WatchSession {
    target: TargetName,
    generation: u64,
    roots: Vec<PathBuf>,
    _inner: Option<RecommendedWatcher>,
}

impl std::fmt::Debug for WatchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSession")
            .field("target", &self.target)
            .field("generation", &self.generation)
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}

impl WatchSession {
    /// Subscribe to changes for `target`'s patterns under `root` and forward
    /// matching changes as `RuntimeEvent::FileChanged`.
    ///
    /// - `generation` is the version of the snapshot `target` belongs to;
    ///   it is stamped on every event so the runtime can drop events from
    ///   sessions that a reload has replaced.
    /// - A target without include patterns gets a session that observes
    ///   nothing.
    /// - Must be called from within a Tokio runtime.
    pub fn subscribe(
        generation: u64,
        target: Arc<Target>,
        root: &Path,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Result<Self> {
        let name = target.name.clone();

        if target.matcher.is_empty() {
            info!(target_name = %name, "target has no file patterns; nothing to watch");
            return Ok(Self {
                target: name,
                generation,
                roots: Vec::new(),
                _inner: None,
            });
        }

        let roots = target.matcher.watch_roots(root);

        // Channel from the blocking notify callback into the async world.
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if let Err(err) = event_tx.send(res) {
                    // Session is shutting down; notify's thread has no
                    // subscriber context, so fall back to stderr.
                    eprintln!("taskwatch: failed to forward notify event: {err}");
                }
            },
            Config::default(),
        )
        .map_err(|e| TaskwatchError::Subscription(WatchFailure::from_notify(&name, &e)))?;

        for dir in &roots {
            watcher
                .watch(dir, RecursiveMode::Recursive)
                .map_err(|e| TaskwatchError::Subscription(WatchFailure::from_notify(&name, &e)))?;
        }

        info!(target_name = %name, generation, ?roots, "watch session started");

        let async_root = root.to_path_buf();
        let async_target = Arc::clone(&target);
        tokio::spawn(async move {
            while let Some(res) = event_rx.recv().await {
                let event = match res {
                    Ok(event) => event,
                    Err(err) => {
                        let failure = WatchFailure::from_notify(&async_target.name, &err);
                        if runtime_tx
                            .send(RuntimeEvent::WatchFailed { generation, failure })
                            .await
                            .is_err()
                        {
                            return;
                        }
                        continue;
                    }
                };

                trace!(?event, "received notify event");

                for (path, kind) in classify_event(&event) {
                    let rel = event_path(&async_root, &path);
                    if !async_target.matcher.matches(&rel) {
                        continue;
                    }
                    debug!(
                        target_name = %async_target.name,
                        path = %rel,
                        %kind,
                        "watch match"
                    );
                    if let Err(err) = runtime_tx
                        .send(RuntimeEvent::FileChanged {
                            generation,
                            target: async_target.name.clone(),
                            path: rel,
                            kind,
                        })
                        .await
                    {
                        warn!("failed to send RuntimeEvent::FileChanged: {err}");
                        // Runtime is gone; nothing left to forward to.
                        return;
                    }
                }
            }
            debug!(target_name = %async_target.name, generation, "watch session loop finished");
        });

        Ok(Self {
            target: name,
            generation,
            roots,
            _inner: Some(watcher),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Directories this session subscribed to.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

/// Open one session per target of `snapshot`.
///
/// Fails on the first target whose subscription can't be established;
/// sessions opened before that are dropped (and stop watching).
pub fn open_sessions(
    snapshot: &WatchSnapshot,
    root: &Path,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> Result<Vec<WatchSession>> {
    snapshot
        .targets()
        .iter()
        .map(|target| {
            WatchSession::subscribe(
                snapshot.version(),
                Arc::clone(target),
                root,
                runtime_tx.clone(),
            )
        })
        .collect()
}

/// Map a raw `notify` event to `(path, kind)` pairs.
///
/// - create → added; remove → deleted
/// - rename from → deleted; rename to → added; rename with both paths →
///   deleted + added; rename of unknown direction → by existence on disk
/// - any other modification → changed
/// - access and "other" events are ignored, as are directories that were
///   created or modified (their files produce events of their own)
pub fn classify_event(event: &Event) -> Vec<(PathBuf, ChangeKind)> {
    let per_path = |kind: ChangeKind| -> Vec<(PathBuf, ChangeKind)> {
        event.paths.iter().map(|p| (p.clone(), kind)).collect()
    };

    let pairs = match &event.kind {
        EventKind::Create(_) => per_path(ChangeKind::Added),
        EventKind::Remove(_) => per_path(ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => per_path(ChangeKind::Deleted),
            RenameMode::To => per_path(ChangeKind::Added),
            RenameMode::Both => {
                let mut pairs = Vec::new();
                if let Some(from) = event.paths.first() {
                    pairs.push((from.clone(), ChangeKind::Deleted));
                }
                if let Some(to) = event.paths.get(1) {
                    pairs.push((to.clone(), ChangeKind::Added));
                }
                pairs
            }
            _ => event
                .paths
                .iter()
                .map(|p| {
                    let kind = if p.exists() {
                        ChangeKind::Added
                    } else {
                        ChangeKind::Deleted
                    };
                    (p.clone(), kind)
                })
                .collect(),
        },
        EventKind::Modify(_) | EventKind::Any => per_path(ChangeKind::Changed),
        EventKind::Access(_) | EventKind::Other => Vec::new(),
    };

    pairs
        .into_iter()
        .filter(|(path, kind)| *kind == ChangeKind::Deleted || !path.is_dir())
        .collect()
}

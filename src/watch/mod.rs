// src/watch/mod.rs

//! File watching and change bookkeeping.
//!
//! This module is responsible for:
//! - Resolving a target's `files` field into glob patterns (`patterns`).
//! - Wiring up one `notify` subscription per target (`session`).
//! - Accumulating changed paths between run starts (`aggregator`).
//! - The public change notification channel (`broadcast`).
//!
//! It does **not** decide when tasks run; sessions only turn filesystem
//! events into `RuntimeEvent::FileChanged` for the engine.

pub mod aggregator;
pub mod broadcast;
pub mod path_utils;
pub mod patterns;
pub mod session;

pub use aggregator::{ChangeAggregator, ChangeSet};
pub use broadcast::{ChangeBroadcast, ChangeNotification};
pub use patterns::{CompiledPatterns, resolve_patterns};
pub use session::{WatchSession, classify_event, open_sessions};

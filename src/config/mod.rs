// src/config/mod.rs

//! Configuration loading and validation for taskwatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, with a parse cache (`loader.rs`).
//! - Validate basic invariants like task references (`validate.rs`).
//! - Resolve a validated config into an immutable, versioned
//!   [`WatchSnapshot`] of targets (`snapshot.rs`).

pub mod loader;
pub mod model;
pub mod snapshot;
pub mod validate;

pub use loader::{ConfigCache, default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, ConfigSection, FilePatterns, RawConfigFile, TargetConfig, TargetOptionsConfig,
    TaskConfig,
};
pub use snapshot::{SnapshotLoader, Target, TaskSpec, WatchOptions, WatchSnapshot};

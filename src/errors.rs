// src/errors.rs

//! Crate-wide error type and the normalized watch failure.

use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskwatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Pattern error: {0}")]
    PatternError(String),

    #[error("Subscription failed: {0}")]
    Subscription(WatchFailure),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskwatchError>;

/// Uniform shape for failures reported by the notification backend.
///
/// `notify` hands us typed errors, but some of them only carry a message
/// (`ErrorKind::Generic`) and channel failures are plain strings. Everything
/// is folded into this struct before it reaches logs or callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchFailure {
    /// Target whose session produced the failure.
    pub target: String,
    pub message: String,
    /// Paths attached to the failure, if the backend reported any.
    pub paths: Vec<String>,
}

impl WatchFailure {
    /// Wrap a plain string failure.
    pub fn from_message(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            message: message.into(),
            paths: Vec::new(),
        }
    }

    /// Normalize a `notify` error.
    pub fn from_notify(target: impl Into<String>, err: &notify::Error) -> Self {
        let message = match &err.kind {
            notify::ErrorKind::Generic(msg) => msg.clone(),
            notify::ErrorKind::Io(io) => io.to_string(),
            other => format!("{other:?}"),
        };
        Self {
            target: target.into(),
            message,
            paths: err
                .paths
                .iter()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .collect(),
        }
    }
}

impl fmt::Display for WatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target '{}': {}", self.target, self.message)?;
        if !self.paths.is_empty() {
            write!(f, " ({})", self.paths.join(", "))?;
        }
        Ok(())
    }
}

// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{Result, TaskwatchError};

/// Default debounce window applied when neither `[config]` nor a target
/// overrides it.
pub const DEFAULT_DEBOUNCE: &str = "100ms";

/// Top-level configuration exactly as read from a TOML file, before
/// validation.
///
/// ```toml
/// [config]
/// debounce = "100ms"
/// interrupt = false
///
/// [vars]
/// scripts = ["src/*.js", "lib/**/*.js"]
///
/// [task.lint]
/// cmd = "eslint src"
///
/// [target.scripts]
/// files = ["{{ scripts }}"]
/// tasks = ["lint"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Values available to `{{ name }}` placeholders in `files`.
    #[serde(default)]
    pub vars: toml::Table,

    /// All tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// All watch targets from `[target.<name>]`.
    #[serde(default)]
    pub target: BTreeMap<String, TargetConfig>,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holding one means task references resolve and durations parse.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub vars: toml::Table,
    pub task: BTreeMap<String, TaskConfig>,
    pub target: BTreeMap<String, TargetConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        vars: toml::Table,
        task: BTreeMap<String, TaskConfig>,
        target: BTreeMap<String, TargetConfig>,
    ) -> Self {
        Self {
            config,
            vars,
            task,
            target,
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Debounce window as a humantime string (`"100ms"`, `"1s"`).
    ///
    /// Raw filesystem events arriving within this window after the first one
    /// collapse into a single run request.
    #[serde(default = "default_debounce")]
    pub debounce: String,

    /// Default `interrupt` policy for targets that don't set one.
    #[serde(default)]
    pub interrupt: bool,

    /// Default `nospawn` policy for targets that don't set one.
    #[serde(default)]
    pub nospawn: bool,
}

fn default_debounce() -> String {
    DEFAULT_DEBOUNCE.to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            debounce: default_debounce(),
            interrupt: false,
            nospawn: false,
        }
    }
}

impl ConfigSection {
    pub fn debounce_duration(&self) -> Result<Duration> {
        parse_duration(&self.debounce)
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Shell command to execute.
    pub cmd: String,
}

/// `[target.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TargetConfig {
    /// File patterns; a single string or a (possibly nested) list.
    #[serde(default)]
    pub files: FilePatterns,

    /// Task names to run, in order. A target without tasks still watches and
    /// broadcasts changes but never queues a run.
    #[serde(default)]
    pub tasks: Option<Vec<String>>,

    /// Overrides `[config].interrupt`.
    #[serde(default)]
    pub interrupt: Option<bool>,

    /// Overrides `[config].nospawn`.
    #[serde(default)]
    pub nospawn: Option<bool>,

    /// Notification backend options.
    #[serde(default)]
    pub options: TargetOptionsConfig,
}

/// `[target.<name>.options]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TargetOptionsConfig {
    /// Overrides `[config].debounce` for this target.
    #[serde(default)]
    pub debounce: Option<String>,
}

/// Raw `files` field of a target.
///
/// Accepts `files = "src/*.js"`, `files = ["a", "b"]` and nested lists such
/// as `files = [["a"], "b"]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FilePatterns {
    One(String),
    Many(Vec<FilePatterns>),
}

impl Default for FilePatterns {
    fn default() -> Self {
        FilePatterns::Many(Vec::new())
    }
}

impl From<&str> for FilePatterns {
    fn from(s: &str) -> Self {
        FilePatterns::One(s.to_string())
    }
}

impl From<Vec<&str>> for FilePatterns {
    fn from(list: Vec<&str>) -> Self {
        FilePatterns::Many(list.into_iter().map(FilePatterns::from).collect())
    }
}

/// Parse a humantime duration string such as `"250ms"` or `"2s"`.
pub fn parse_duration(s: &str) -> Result<Duration> {
    humantime::parse_duration(s.trim())
        .map_err(|e| TaskwatchError::ConfigError(format!("invalid duration '{s}': {e}")))
}

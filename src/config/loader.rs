// src/config/loader.rs

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Default config path: `Taskwatch.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Taskwatch.toml")
}

/// Parsed configurations keyed by canonical file path.
///
/// A reload goes through [`ConfigCache::load`]; entries are dropped with
/// [`ConfigCache::invalidate`] for every path that changed since the last
/// run, so an edited config file is re-read while untouched ones are not.
#[derive(Debug, Default)]
pub struct ConfigCache {
    entries: HashMap<PathBuf, ConfigFile>,
}

impl ConfigCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Return the cached config for `path`, loading and validating it on a miss.
    pub fn load(&mut self, path: &Path) -> Result<ConfigFile> {
        let key = cache_key(path);
        if let Some(cfg) = self.entries.get(&key) {
            debug!(path = ?key, "config cache hit");
            return Ok(cfg.clone());
        }

        debug!(path = ?key, "config cache miss: loading from disk");
        let cfg = load_and_validate(path)?;
        self.entries.insert(key, cfg.clone());
        Ok(cfg)
    }

    /// Drop cached entries for the given paths.
    ///
    /// `paths` are relative to `root` (as recorded by the change aggregator).
    /// Returns how many entries were removed.
    pub fn invalidate<S: AsRef<str>>(&mut self, root: &Path, paths: &[S]) -> usize {
        let mut removed = 0;
        for rel in paths {
            let key = cache_key(&root.join(rel.as_ref()));
            if self.entries.remove(&key).is_some() {
                debug!(path = ?key, "invalidated cached config");
                removed += 1;
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn cache_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

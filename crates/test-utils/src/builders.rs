#![allow(dead_code)]

use std::collections::BTreeMap;

use taskwatch::config::{
    ConfigFile, ConfigSection, FilePatterns, RawConfigFile, TargetConfig, TaskConfig,
};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                vars: toml::Table::new(),
                task: BTreeMap::new(),
                target: BTreeMap::new(),
            },
        }
    }

    /// Add `[task.<name>]` with the given command.
    pub fn with_task(mut self, name: &str, cmd: &str) -> Self {
        self.config.task.insert(
            name.to_string(),
            TaskConfig {
                cmd: cmd.to_string(),
            },
        );
        self
    }

    pub fn with_target(mut self, name: &str, target: TargetConfig) -> Self {
        self.config.target.insert(name.to_string(), target);
        self
    }

    pub fn with_var(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.config.vars.insert(key.to_string(), value.into());
        self
    }

    pub fn debounce(mut self, value: &str) -> Self {
        self.config.config.debounce = value.to_string();
        self
    }

    pub fn interrupt(mut self, val: bool) -> Self {
        self.config.config.interrupt = val;
        self
    }

    pub fn nospawn(mut self, val: bool) -> Self {
        self.config.config.nospawn = val;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TargetConfig`.
pub struct TargetConfigBuilder {
    target: TargetConfig,
}

impl TargetConfigBuilder {
    pub fn new(files: impl Into<FilePatterns>) -> Self {
        Self {
            target: TargetConfig {
                files: files.into(),
                ..TargetConfig::default()
            },
        }
    }

    pub fn task(mut self, name: &str) -> Self {
        self.target.tasks.get_or_insert_with(Vec::new).push(name.to_string());
        self
    }

    pub fn interrupt(mut self, val: bool) -> Self {
        self.target.interrupt = Some(val);
        self
    }

    pub fn nospawn(mut self, val: bool) -> Self {
        self.target.nospawn = Some(val);
        self
    }

    pub fn debounce(mut self, value: &str) -> Self {
        self.target.options.debounce = Some(value.to_string());
        self
    }

    pub fn build(self) -> TargetConfig {
        self.target
    }
}

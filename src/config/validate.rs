// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, parse_duration};
use crate::errors::{Result, TaskwatchError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.config, raw.vars, raw.task, raw.target,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_targets(cfg)?;
    validate_global_config(cfg)?;
    validate_tasks(cfg)?;
    validate_targets(cfg)?;
    Ok(())
}

fn ensure_has_targets(cfg: &RawConfigFile) -> Result<()> {
    if cfg.target.is_empty() {
        return Err(TaskwatchError::ConfigError(
            "config must contain at least one [target.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    cfg.config.debounce_duration().map_err(|e| {
        TaskwatchError::ConfigError(format!("[config].debounce: {e}"))
    })?;
    Ok(())
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if task.cmd.trim().is_empty() {
            return Err(TaskwatchError::ConfigError(format!(
                "task '{}' has an empty `cmd`",
                name
            )));
        }
    }
    Ok(())
}

fn validate_targets(cfg: &RawConfigFile) -> Result<()> {
    for (name, target) in cfg.target.iter() {
        if let Some(tasks) = &target.tasks {
            for task in tasks {
                if !cfg.task.contains_key(task) {
                    return Err(TaskwatchError::ConfigError(format!(
                        "target '{}' references unknown task '{}' in `tasks`",
                        name, task
                    )));
                }
            }
        }

        if let Some(debounce) = &target.options.debounce {
            parse_duration(debounce).map_err(|e| {
                TaskwatchError::ConfigError(format!(
                    "target '{}' options.debounce: {}",
                    name, e
                ))
            })?;
        }

        let interrupt = target.interrupt.unwrap_or(cfg.config.interrupt);
        let nospawn = target.nospawn.unwrap_or(cfg.config.nospawn);
        if interrupt && nospawn {
            tracing::warn!(
                target_name = %name,
                "interrupt = true has no effect together with nospawn = true"
            );
        }
    }
    Ok(())
}

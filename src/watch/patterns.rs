// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::Regex;

use crate::config::model::FilePatterns;
use crate::errors::{Result, TaskwatchError};

/// `{{ name }}` / `{{ a.b.c }}` placeholders inside file patterns.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_\-]+(?:\.[A-Za-z0-9_\-]+)*)\s*\}\}")
        .expect("placeholder regex is valid")
});

/// Guards against `[vars]` entries that reference each other in a loop.
const MAX_SUBSTITUTION_DEPTH: usize = 16;

/// Characters that make a path component a glob rather than a literal.
const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Expand a target's `files` field into a flat, ordered list of patterns.
///
/// - A bare string is treated as a one-element list.
/// - Nested lists are flattened depth-first, preserving order.
/// - `{{ name }}` placeholders are substituted from `vars` *before*
///   flattening. When a placeholder makes up the whole string and refers to
///   a list, the list is spliced in place.
/// - An empty input yields an empty list (a session that observes nothing).
pub fn resolve_patterns(files: &FilePatterns, vars: &toml::Table) -> Result<Vec<String>> {
    let mut out = Vec::new();
    resolve_into(files, vars, &mut out)?;
    Ok(out)
}

fn resolve_into(files: &FilePatterns, vars: &toml::Table, out: &mut Vec<String>) -> Result<()> {
    match files {
        FilePatterns::One(pattern) => out.extend(substitute(pattern, vars, 0)?),
        FilePatterns::Many(list) => {
            for item in list {
                resolve_into(item, vars, out)?;
            }
        }
    }
    Ok(())
}

fn substitute(pattern: &str, vars: &toml::Table, depth: usize) -> Result<Vec<String>> {
    if depth > MAX_SUBSTITUTION_DEPTH {
        return Err(TaskwatchError::PatternError(format!(
            "placeholder substitution too deep while expanding '{pattern}'"
        )));
    }

    // Whole-string placeholder: the value may be a list.
    if let Some(caps) = PLACEHOLDER.captures(pattern) {
        if let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) {
            if whole.start() == 0 && whole.end() == pattern.len() {
                let value = lookup(vars, key.as_str())?;
                return value_to_patterns(key.as_str(), value, vars, depth);
            }
        }
    }

    if !PLACEHOLDER.is_match(pattern) {
        return Ok(vec![pattern.to_string()]);
    }

    let mut result = String::with_capacity(pattern.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(pattern) {
        let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        result.push_str(&pattern[last..whole.start()]);
        let value = lookup(vars, key.as_str())?;
        result.push_str(&scalar_text(key.as_str(), value)?);
        last = whole.end();
    }
    result.push_str(&pattern[last..]);

    // Substituted values may carry placeholders of their own.
    substitute(&result, vars, depth + 1)
}

fn value_to_patterns(
    key: &str,
    value: &toml::Value,
    vars: &toml::Table,
    depth: usize,
) -> Result<Vec<String>> {
    match value {
        toml::Value::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                out.extend(value_to_patterns(key, item, vars, depth)?);
            }
            Ok(out)
        }
        toml::Value::String(s) => substitute(s, vars, depth + 1),
        other => Ok(vec![scalar_text(key, other)?]),
    }
}

fn scalar_text(key: &str, value: &toml::Value) -> Result<String> {
    match value {
        toml::Value::String(s) => Ok(s.clone()),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        toml::Value::Datetime(d) => Ok(d.to_string()),
        toml::Value::Array(_) => Err(TaskwatchError::PatternError(format!(
            "placeholder '{key}' refers to a list and must make up the whole pattern"
        ))),
        toml::Value::Table(_) => Err(TaskwatchError::PatternError(format!(
            "placeholder '{key}' refers to a table, not a value"
        ))),
    }
}

/// Look up a dotted key (`a.b.c`) in the `[vars]` table.
fn lookup<'a>(vars: &'a toml::Table, key: &str) -> Result<&'a toml::Value> {
    let unknown = || TaskwatchError::PatternError(format!("unknown placeholder '{{{{ {key} }}}}'"));

    let mut parts = key.split('.');
    let first = parts.next().ok_or_else(unknown)?;
    let mut current = vars.get(first).ok_or_else(unknown)?;
    for part in parts {
        current = current
            .as_table()
            .and_then(|t| t.get(part))
            .ok_or_else(unknown)?;
    }
    Ok(current)
}

/// Compiled include/exclude matcher for one target's resolved patterns.
///
/// Patterns starting with `!` are exclusions. Paths passed to
/// [`CompiledPatterns::matches`] are relative to the project root and use
/// forward slashes, e.g. `"src/main.rs"`. `*` does not cross `/`; use `**`
/// for recursive matches.
#[derive(Clone)]
pub struct CompiledPatterns {
    include: GlobSet,
    exclude: Option<GlobSet>,
    /// Static directory prefixes of the include patterns, relative to root.
    bases: Vec<PathBuf>,
}

impl fmt::Debug for CompiledPatterns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPatterns")
            .field("bases", &self.bases)
            .finish_non_exhaustive()
    }
}

impl CompiledPatterns {
    pub fn compile(patterns: &[String]) -> Result<Self> {
        let mut include = Vec::new();
        let mut exclude = Vec::new();

        for raw in patterns {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            match raw.strip_prefix('!') {
                Some(negated) => exclude.push(normalize_pattern(negated)),
                None => include.push(normalize_pattern(raw)),
            }
        }

        let bases = base_dirs(&include);
        let include_set = build_globset(&include)?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(&exclude)?)
        };

        Ok(Self {
            include: include_set,
            exclude: exclude_set,
            bases,
        })
    }

    /// True when no include pattern was given; such a target observes nothing.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
    }

    /// Returns true if the given root-relative path is watched.
    pub fn matches(&self, rel_path: &str) -> bool {
        let rel_path = rel_path.strip_prefix("./").unwrap_or(rel_path);
        if !self.include.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }

    /// Directories to subscribe to, recursively, so that every include
    /// pattern is covered.
    ///
    /// A base directory that doesn't exist yet is replaced by its closest
    /// existing ancestor (so files created later are still seen). Bases
    /// nested inside another base are dropped.
    pub fn watch_roots(&self, root: &Path) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = Vec::new();

        for base in &self.bases {
            let mut dir = if base.as_os_str().is_empty() {
                root.to_path_buf()
            } else {
                root.join(base)
            };
            while !dir.is_dir() && dir != root {
                match dir.parent() {
                    Some(parent) => dir = parent.to_path_buf(),
                    None => break,
                }
            }
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }

        let mut roots: Vec<PathBuf> = dirs
            .iter()
            .filter(|d| !dirs.iter().any(|other| other != *d && d.starts_with(other)))
            .cloned()
            .collect();
        roots.sort();
        roots
    }
}

fn normalize_pattern(pattern: &str) -> String {
    let pattern = pattern.replace('\\', "/");
    pattern
        .strip_prefix("./")
        .map(str::to_string)
        .unwrap_or(pattern)
}

/// Static directory prefix of each pattern (components before the first one
/// containing a glob metacharacter). A fully literal pattern names a file, so
/// its parent directory is used.
fn base_dirs(patterns: &[String]) -> Vec<PathBuf> {
    let mut bases = Vec::new();
    for pattern in patterns {
        let components: Vec<&str> = pattern.split('/').collect();
        let literal_len = components
            .iter()
            .position(|c| c.contains(GLOB_META))
            .unwrap_or(components.len().saturating_sub(1));
        let base: PathBuf = components[..literal_len]
            .iter()
            .filter(|c| !c.is_empty())
            .collect();
        if !bases.contains(&base) {
            bases.push(base);
        }
    }
    bases
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .map_err(|e| TaskwatchError::PatternError(format!("invalid glob pattern '{pat}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| TaskwatchError::PatternError(format!("building glob set: {e}")))
}

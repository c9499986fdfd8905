// src/watch/path_utils.rs

//! Path normalization for watch events.

use std::path::Path;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. due to symlinks or different absolute prefixes),
///   we canonicalize both paths and try again.
///
/// Returns `None` if the path cannot be related to `root`. Deleted files
/// can't be canonicalized, so for those only the fast path applies.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_forward_slashes(rel));
    }

    // macOS reports /private/var/... for /var/..., among others.
    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(to_forward_slashes(rel));
        }
    }

    None
}

/// Path as recorded in the change aggregator: relative to `root` when
/// possible, otherwise the full path as given by the backend.
pub fn event_path(root: &Path, path: &Path) -> String {
    relative_str(root, path).unwrap_or_else(|| to_forward_slashes(path))
}

fn to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

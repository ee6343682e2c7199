//! Path resolution and containment checks for the script store.
//!
//! Every caller-supplied collection or file name goes through
//! [`resolve_under`] before any filesystem call is made.

use std::path::{Component, Path, PathBuf};

use crate::{MddeError, Result};

/// Lexically normalize a path.
///
/// Resolves `.` and `..` components and collapses redundant separators
/// without touching the filesystem. A `..` at the root stays at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            Component::Normal(part) => out.push(part),
        }
    }

    out
}

/// Check that a caller-supplied name is a single, plain path segment.
///
/// Rejects empty names, `.` and `..`, names containing either separator,
/// and names with NUL bytes.
pub fn is_plain_segment(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Check that `candidate` lies within `root`.
///
/// Both paths must already be normalized. The comparison is done on the
/// string form: `candidate` must equal `root` (only when `allow_root` is set)
/// or start with `root` followed by a separator, so `/srv/scripts-old` is not
/// accepted under `/srv/scripts`.
pub fn is_contained(root: &Path, candidate: &Path, allow_root: bool) -> bool {
    let root = root.to_string_lossy();
    let candidate = candidate.to_string_lossy();

    if candidate == root {
        return allow_root;
    }

    let root = root.trim_end_matches(std::path::MAIN_SEPARATOR);
    candidate
        .strip_prefix(root)
        .is_some_and(|rest| rest.starts_with(std::path::MAIN_SEPARATOR))
}

/// Resolve `collection` (and optionally `file_name`) under `root`.
///
/// `root` must be absolute and normalized.
pub fn resolve_under(root: &Path, collection: &str, file_name: Option<&str>) -> Result<PathBuf> {
    if !is_plain_segment(collection) {
        return Err(MddeError::PathEscape);
    }

    let mut joined = root.join(collection);
    if let Some(file_name) = file_name {
        if !is_plain_segment(file_name) {
            return Err(MddeError::PathEscape);
        }
        joined.push(file_name);
    }

    let resolved = normalize(&joined);
    if !is_contained(root, &resolved, file_name.is_none()) {
        return Err(MddeError::PathEscape);
    }

    Ok(resolved)
}

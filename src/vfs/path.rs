//! Request-path canonicalization and the valid-path predicate.
//!
//! A canonical path is root-relative: no leading or trailing `/`, no `.` or
//! `..` segments, no empty segments, and the root itself is spelled `.`.

/// Root-relative spelling of the filesystem root.
pub const ROOT: &str = ".";

/// Turn a decoded URL path into a root-relative path usable against a VFS.
///
/// The path is lexically cleaned as if rooted at `/`, so `..` can never climb
/// above the root. Cleaning is idempotent: `canonicalize(canonicalize(p))`
/// equals `canonicalize(p)`.
pub fn canonicalize(raw: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }

    if parts.is_empty() {
        ROOT.to_string()
    } else {
        parts.join("/")
    }
}

/// Report whether `path` may be handed to a VFS operation.
///
/// `.` names the root. Anything else must be a `/`-separated sequence of
/// non-empty segments, none of which is `.` or `..`.
pub fn is_valid_path(path: &str) -> bool {
    if path == ROOT {
        return true;
    }
    !path.is_empty()
        && path
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

/// Join a root-relative directory and a child name.
pub fn join(dir: &str, name: &str) -> String {
    if dir == ROOT {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Final segment of a root-relative path (`.` for the root).
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Parent of a root-relative path (`.` for top-level entries and the root).
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => ROOT,
    }
}

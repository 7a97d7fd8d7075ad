//! Path normalization for the POSIX-style namespace the drive exposes.

/// Normalize a caller-supplied path to the internal representation: forward
/// slashes, a leading slash, and no trailing slash (except for the root).
///
/// `""`, `"/"`, `"foo"`, `"/foo"`, `"foo/"`, `"\\a\\b"` and `"/a//b/"` all
/// normalize sensibly; `..`/`.` segments are left untouched since the drive
/// never resolves them against a host filesystem.
pub fn normalize(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    let mut segments: Vec<&str> = replaced.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::with_capacity(replaced.len() + 1);
    for segment in segments.drain(..) {
        out.push('/');
        out.push_str(segment);
    }
    out
}

/// `true` iff `path` normalizes to the root directory.
pub fn is_root(path: &str) -> bool {
    normalize(path) == "/"
}

/// Split a normalized path into `(parent, name)`. The root has no parent.
pub fn split(path: &str) -> (String, String) {
    let norm = normalize(path);
    if norm == "/" {
        return ("/".to_string(), String::new());
    }
    match norm.rfind('/') {
        Some(0) => ("/".to_string(), norm[1..].to_string()),
        Some(idx) => (norm[..idx].to_string(), norm[idx + 1..].to_string()),
        None => ("/".to_string(), norm),
    }
}

/// Prefix used to list the direct and indirect children of a directory.
///
/// The root's prefix is `"/"`; every other directory's prefix ends in `/`.
pub fn child_prefix(path: &str) -> String {
    let norm = normalize(path);
    if norm == "/" {
        norm
    } else {
        format!("{norm}/")
    }
}

/// Project `child` (assumed to start with `prefix`) to its first path
/// segment relative to `prefix`, the way [`crate::drive::Drive::read_dir`]
/// reports entries.
///
/// Returns `None` if `child` does not actually fall under `prefix`.
pub fn first_segment_after(prefix: &str, child: &str) -> Option<String> {
    let rest = child.strip_prefix(prefix)?;
    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        return None;
    }
    match rest.find('/') {
        Some(idx) => Some(rest[..idx].to_string()),
        None => Some(rest.to_string()),
    }
}

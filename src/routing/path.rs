//! URL path ↔ unit file conventions.
//!
//! # Responsibilities
//! - Reject traversal sequences
//! - Split a URL path into routable segments
//! - Map segments to a unit file and back
//!
//! # Design Decisions
//! - Shared by the resolver and the doc scanner so both derive the same
//!   path for the same file
//! - Hidden segments (leading `.`) never route

use std::path::{Component, Path, PathBuf};

/// True when the path contains a `..` sequence anywhere.
pub fn has_traversal(path: &str) -> bool {
    path.contains("..")
}

/// Non-empty segments of a URL path.
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// A segment that may name a directory or unit.
pub fn is_routable_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with('.')
        && !segment.contains('\\')
        && !segment.contains('\0')
}

/// Whether `name` can be a routine name.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// A unit file derived from URL segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitLocation {
    /// Relative id, always `/`-separated (`users/list.rhai`).
    pub id: String,
    pub file: PathBuf,
}

impl UnitLocation {
    pub fn from_segments(root: &Path, segments: &[&str], extension: &str) -> Self {
        let id = format!("{}.{}", segments.join("/"), extension);
        let mut file = root.to_path_buf();
        for segment in &segments[..segments.len().saturating_sub(1)] {
            file.push(segment);
        }
        if let Some(last) = segments.last() {
            file.push(format!("{last}.{extension}"));
        }
        Self { id, file }
    }
}

/// Convention path of a unit file relative to the root, e.g.
/// `users/list.rhai` → `/users/list`.
///
/// Returns `None` for files with another extension or with a segment that
/// would not route.
pub fn convention_path(relative: &Path, extension: &str) -> Option<String> {
    if relative.extension()?.to_str()? != extension {
        return None;
    }
    let stem = relative.with_extension("");
    let mut segments = Vec::new();
    for component in stem.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str()?;
                if !is_routable_segment(part) {
                    return None;
                }
                segments.push(part.to_string());
            }
            _ => return None,
        }
    }
    if segments.is_empty() {
        return None;
    }
    Some(format!("/{}", segments.join("/")))
}

/// Relative id of a unit file (`/`-separated, with extension).
pub fn unit_id(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Map a decoded URL path under `root` using normal components only.
pub fn map_under_root(root: &Path, path: &str) -> Option<PathBuf> {
    let mut mapped = root.to_path_buf();
    for component in Path::new(path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => mapped.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traversal() {
        assert!(has_traversal("/a/../b"));
        assert!(has_traversal("/..."));
        assert!(!has_traversal("/a/b.c"));
    }

    #[test]
    fn test_segments_and_location() {
        let segs = segments("//users//list/");
        assert_eq!(segs, vec!["users", "list"]);

        let location = UnitLocation::from_segments(Path::new("/srv"), &segs, "rhai");
        assert_eq!(location.id, "users/list.rhai");
        assert_eq!(location.file, PathBuf::from("/srv/users/list.rhai"));
    }

    #[test]
    fn test_convention_path_round_trips_with_location() {
        let rel = Path::new("api/v1/items.rhai");
        let path = convention_path(rel, "rhai").unwrap();
        assert_eq!(path, "/api/v1/items");

        let location = UnitLocation::from_segments(Path::new("root"), &segments(&path), "rhai");
        assert_eq!(location.file, Path::new("root").join(rel));
        assert_eq!(location.id, unit_id(rel));
    }

    #[test]
    fn test_convention_path_rejects() {
        assert_eq!(convention_path(Path::new("a/b.txt"), "rhai"), None);
        assert_eq!(convention_path(Path::new(".hidden/b.rhai"), "rhai"), None);
        assert_eq!(convention_path(Path::new("../b.rhai"), "rhai"), None);
    }

    #[test]
    fn test_identifiers() {
        assert!(is_identifier("list_all"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_map_under_root() {
        assert_eq!(
            map_under_root(Path::new("/srv"), "/css/site.css"),
            Some(PathBuf::from("/srv/css/site.css"))
        );
        assert_eq!(map_under_root(Path::new("/srv"), "/../etc/passwd"), None);
    }
}

//! Normalized relative paths used as resource identity.
//!
//! Serializes as a plain string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("resource path must not be empty")]
    Empty,
    #[error("resource path '{0}' escapes the package root")]
    ParentTraversal(String),
    #[error("resource path '{0}' is not valid UTF-8")]
    NonUtf8(String),
    #[error("resource path '{0}' has an unsupported component")]
    Unsupported(String),
}

/// A forward-slash separated path relative to the package root.
///
/// Never empty, never absolute, never contains `.` or `..` components, so two
/// entries coming from different physical locations compare equal exactly when
/// they land on the same file in the working tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourcePath(String);

impl ResourcePath {
    /// Normalize a slash- or backslash-separated path string.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let mut parts: Vec<&str> = Vec::new();
        for part in raw.split(['/', '\\']) {
            match part {
                "" | "." => {}
                ".." => return Err(PathError::ParentTraversal(raw.to_owned())),
                p => parts.push(p),
            }
        }
        if parts.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self(parts.join("/")))
    }

    /// Build from a filesystem path that is already relative to some root.
    pub fn from_relative(path: &Path) -> Result<Self, PathError> {
        let shown = path.display().to_string();
        let mut parts = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(s) => {
                    let s = s.to_str().ok_or_else(|| PathError::NonUtf8(shown.clone()))?;
                    parts.push(s);
                }
                Component::CurDir => {}
                Component::ParentDir => return Err(PathError::ParentTraversal(shown)),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(PathError::Unsupported(shown));
                }
            }
        }
        if parts.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self(parts.join("/")))
    }

    /// Derive a key by stripping everything up to and including the first
    /// `marker` directory in `location`. Deeper directories with the same name
    /// stay part of the key.
    ///
    /// Returns `None` when `location` does not contain the marker directory.
    /// `strip_marker("jar!/skipper/templates/app.yml", "skipper")` yields
    /// `templates/app.yml`.
    pub fn strip_marker(location: &str, marker: &str) -> Option<Result<Self, PathError>> {
        let normalized = location.replace('\\', "/");
        let needle = format!("/{marker}/");
        let rest = if let Some(rest) = normalized.strip_prefix(&needle[1..]) {
            rest
        } else {
            let idx = normalized.find(&needle)?;
            &normalized[idx + needle.len()..]
        };
        Some(Self::parse(rest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final component, e.g. `app.yml` for `templates/app.yml`.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Resolve against a root directory using platform separators.
    pub fn to_path(&self, root: &Path) -> PathBuf {
        let mut out = root.to_path_buf();
        for part in self.0.split('/') {
            out.push(part);
        }
        out
    }
}

impl Deref for ResourcePath {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourcePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ResourcePath {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ResourcePath {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl TryFrom<String> for ResourcePath {
    type Error = PathError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ResourcePath> for String {
    fn from(p: ResourcePath) -> Self {
        p.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_separators_and_dots() {
        let p = ResourcePath::parse("/templates//./app.yml").unwrap();
        assert_eq!(p, "templates/app.yml");
        let p = ResourcePath::parse("templates\\app.yml").unwrap();
        assert_eq!(p, "templates/app.yml");
    }

    #[test]
    fn parse_rejects_empty() {
        assert_eq!(ResourcePath::parse(""), Err(PathError::Empty));
        assert_eq!(ResourcePath::parse("/./"), Err(PathError::Empty));
    }

    #[test]
    fn parse_rejects_parent_traversal() {
        assert!(matches!(
            ResourcePath::parse("../etc/passwd"),
            Err(PathError::ParentTraversal(_))
        ));
        assert!(matches!(
            ResourcePath::parse("a/../../b"),
            Err(PathError::ParentTraversal(_))
        ));
    }

    #[test]
    fn from_relative_joins_components() {
        let p = ResourcePath::from_relative(Path::new("templates/app.yml")).unwrap();
        assert_eq!(p.as_str(), "templates/app.yml");
    }

    #[test]
    fn from_relative_rejects_absolute() {
        assert!(matches!(
            ResourcePath::from_relative(Path::new("/abs/file")),
            Err(PathError::Unsupported(_))
        ));
    }

    #[test]
    fn strip_marker_uses_first_occurrence() {
        let p = ResourcePath::strip_marker("/work/skipper/x/skipper/values.yml", "skipper")
            .unwrap()
            .unwrap();
        assert_eq!(p, "x/skipper/values.yml");
    }

    #[test]
    fn strip_marker_keeps_nested_marker_directory() {
        let p = ResourcePath::strip_marker("skipper/templates/skipper/app.yml", "skipper")
            .unwrap()
            .unwrap();
        assert_eq!(p, "templates/skipper/app.yml");
    }

    #[test]
    fn strip_marker_accepts_leading_marker() {
        let p = ResourcePath::strip_marker("skipper/templates/app.yml", "skipper")
            .unwrap()
            .unwrap();
        assert_eq!(p, "templates/app.yml");
    }

    #[test]
    fn strip_marker_without_marker_is_none() {
        assert!(ResourcePath::strip_marker("other/values.yml", "skipper").is_none());
    }

    #[test]
    fn strip_marker_directory_only_is_empty() {
        assert_eq!(
            ResourcePath::strip_marker("jar!/skipper/", "skipper").unwrap(),
            Err(PathError::Empty)
        );
    }

    #[test]
    fn file_name_and_to_path() {
        let p = ResourcePath::parse("templates/app.yml").unwrap();
        assert_eq!(p.file_name(), "app.yml");
        assert_eq!(
            p.to_path(Path::new("/tmp/pkg")),
            PathBuf::from("/tmp/pkg/templates/app.yml")
        );
    }

    #[test]
    fn serde_roundtrip_validates() {
        let p = ResourcePath::parse("a/b.txt").unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"a/b.txt\"");
        let back: ResourcePath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
        assert!(serde_json::from_str::<ResourcePath>("\"../x\"").is_err());
    }

    #[test]
    fn ordering_is_lexicographic() {
        let mut v = vec![
            ResourcePath::parse("b.txt").unwrap(),
            ResourcePath::parse("a.txt").unwrap(),
            ResourcePath::parse("a/z.txt").unwrap(),
        ];
        v.sort();
        let names: Vec<&str> = v.iter().map(ResourcePath::as_str).collect();
        assert_eq!(names, vec!["a.txt", "a/z.txt", "b.txt"]);
    }
}

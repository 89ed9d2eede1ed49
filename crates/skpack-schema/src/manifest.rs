use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::context::ProjectContext;

pub const MANIFEST_FILE: &str = "skpack.toml";
pub const DEFAULT_OVERRIDE_DIR: &str = "skipper";
pub const DEFAULT_WORK_DIR: &str = "target/skipper";
pub const DEFAULT_REMOTE_URL: &str = "http://localhost:7577/api";
pub const DEFAULT_REPO_NAME: &str = "local";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("project.name must not be empty")]
    EmptyName,
    #[error("project.version must not be empty")]
    EmptyVersion,
    #[error("invalid project name '{0}': must not contain path separators or whitespace")]
    InvalidName(String),
    #[error("invalid project version '{0}': must not contain path separators or whitespace")]
    InvalidVersion(String),
    #[error("invalid property assignment '{0}', expected 'key=value'")]
    InvalidProperty(String),
    #[error("unsupported package.format '{0}', expected 'zip' or 'tar.gz'")]
    UnsupportedFormat(String),
}

/// Parsed `skpack.toml`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProjectManifest {
    pub project: ProjectSection,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub package: PackageSection,
    #[serde(default)]
    pub remote: RemoteSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PackageSection {
    #[serde(default = "default_override_dir")]
    pub override_dir: PathBuf,
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// Replaces the built-in base resources when set.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for PackageSection {
    fn default() -> Self {
        Self {
            override_dir: default_override_dir(),
            work_dir: default_work_dir(),
            base_dir: None,
            format: default_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RemoteSection {
    #[serde(default = "default_remote_url")]
    pub url: String,
    #[serde(default = "default_repo_name")]
    pub repo_name: String,
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            url: default_remote_url(),
            repo_name: default_repo_name(),
        }
    }
}

fn default_override_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OVERRIDE_DIR)
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(DEFAULT_WORK_DIR)
}

fn default_format() -> String {
    "zip".to_owned()
}

fn default_remote_url() -> String {
    DEFAULT_REMOTE_URL.to_owned()
}

fn default_repo_name() -> String {
    DEFAULT_REPO_NAME.to_owned()
}

impl ProjectManifest {
    /// Check the fields serde cannot express.
    pub fn validate(&self) -> Result<(), ManifestError> {
        validate_token(&self.project.name, ManifestError::EmptyName, |s| {
            ManifestError::InvalidName(s)
        })?;
        validate_token(&self.project.version, ManifestError::EmptyVersion, |s| {
            ManifestError::InvalidVersion(s)
        })?;
        match self.package.format.as_str() {
            "zip" | "tar.gz" => Ok(()),
            other => Err(ManifestError::UnsupportedFormat(other.to_owned())),
        }
    }

    /// Build the immutable substitution context for this project.
    pub fn context(&self) -> ProjectContext {
        ProjectContext::new(&self.project.name, &self.project.version)
            .with_description(self.project.description.as_deref())
            .with_properties(self.properties.clone())
    }

    /// Resolve a manifest-relative path against the directory holding the manifest.
    pub fn resolve_path(manifest_dir: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            manifest_dir.join(path)
        }
    }
}

fn validate_token(
    value: &str,
    empty: ManifestError,
    invalid: impl FnOnce(String) -> ManifestError,
) -> Result<(), ManifestError> {
    if value.trim().is_empty() {
        return Err(empty);
    }
    if value
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_whitespace())
        || value == "."
        || value == ".."
    {
        return Err(invalid(value.to_owned()));
    }
    Ok(())
}

/// Parse a `key=value` assignment as given to `--set`.
pub fn parse_property(input: &str) -> Result<(String, String), ManifestError> {
    match input.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_owned(), v.to_owned())),
        _ => Err(ManifestError::InvalidProperty(input.to_owned())),
    }
}

pub fn parse_manifest_str(input: &str) -> Result<ProjectManifest, ManifestError> {
    let manifest: ProjectManifest = toml::from_str(input)?;
    manifest.validate()?;
    Ok(manifest)
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<ProjectManifest, ManifestError> {
    let content = fs::read_to_string(path)?;
    parse_manifest_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[project]
name = "demo-app"
version = "1.0.0"
description = "A demo"

[properties]
"server.port" = "8080"

[package]
override_dir = "deploy/skipper"
work_dir = "out"
format = "tar.gz"

[remote]
url = "http://skipper.internal/api"
repo_name = "team"
"#;

    #[test]
    fn parses_full_manifest() {
        let m = parse_manifest_str(FULL).unwrap();
        assert_eq!(m.project.name, "demo-app");
        assert_eq!(m.project.version, "1.0.0");
        assert_eq!(m.project.description.as_deref(), Some("A demo"));
        assert_eq!(m.properties.get("server.port").map(String::as_str), Some("8080"));
        assert_eq!(m.package.override_dir, PathBuf::from("deploy/skipper"));
        assert_eq!(m.package.work_dir, PathBuf::from("out"));
        assert_eq!(m.package.format, "tar.gz");
        assert_eq!(m.remote.url, "http://skipper.internal/api");
        assert_eq!(m.remote.repo_name, "team");
    }

    #[test]
    fn minimal_manifest_uses_defaults() {
        let m = parse_manifest_str("[project]\nname = \"x\"\nversion = \"0.1\"\n").unwrap();
        assert_eq!(m.package.override_dir, PathBuf::from(DEFAULT_OVERRIDE_DIR));
        assert_eq!(m.package.work_dir, PathBuf::from(DEFAULT_WORK_DIR));
        assert_eq!(m.package.format, "zip");
        assert!(m.package.base_dir.is_none());
        assert_eq!(m.remote.url, DEFAULT_REMOTE_URL);
        assert_eq!(m.remote.repo_name, DEFAULT_REPO_NAME);
        assert!(m.properties.is_empty());
    }

    #[test]
    fn rejects_unknown_fields() {
        let r = parse_manifest_str("[project]\nname = \"x\"\nversion = \"1\"\nbogus = 1\n");
        assert!(matches!(r, Err(ManifestError::ParseToml(_))));
    }

    #[test]
    fn rejects_missing_version() {
        let r = parse_manifest_str("[project]\nname = \"x\"\n");
        assert!(matches!(r, Err(ManifestError::ParseToml(_))));
    }

    #[test]
    fn rejects_empty_name() {
        let r = parse_manifest_str("[project]\nname = \" \"\nversion = \"1\"\n");
        assert!(matches!(r, Err(ManifestError::EmptyName)));
    }

    #[test]
    fn rejects_name_with_separator() {
        let r = parse_manifest_str("[project]\nname = \"a/b\"\nversion = \"1\"\n");
        assert!(matches!(r, Err(ManifestError::InvalidName(_))));
    }

    #[test]
    fn rejects_version_with_whitespace() {
        let r = parse_manifest_str("[project]\nname = \"a\"\nversion = \"1 0\"\n");
        assert!(matches!(r, Err(ManifestError::InvalidVersion(_))));
    }

    #[test]
    fn rejects_unknown_format() {
        let r = parse_manifest_str(
            "[project]\nname = \"a\"\nversion = \"1\"\n[package]\nformat = \"rar\"\n",
        );
        assert!(matches!(r, Err(ManifestError::UnsupportedFormat(f)) if f == "rar"));
    }

    #[test]
    fn parse_property_splits_on_first_equals() {
        assert_eq!(
            parse_property("db.url=jdbc:x?a=b").unwrap(),
            ("db.url".to_owned(), "jdbc:x?a=b".to_owned())
        );
        assert!(parse_property("novalue").is_err());
        assert!(parse_property("=v").is_err());
    }

    #[test]
    fn resolve_path_keeps_absolute() {
        let dir = Path::new("/proj");
        assert_eq!(
            ProjectManifest::resolve_path(dir, Path::new("skipper")),
            PathBuf::from("/proj/skipper")
        );
        assert_eq!(
            ProjectManifest::resolve_path(dir, Path::new("/abs")),
            PathBuf::from("/abs")
        );
    }

    #[test]
    fn parse_manifest_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        fs::write(&path, FULL).unwrap();
        let m = parse_manifest_file(&path).unwrap();
        assert_eq!(m.project.name, "demo-app");
    }

    #[test]
    fn missing_file_is_io_error() {
        let r = parse_manifest_file("/nonexistent/skpack.toml");
        assert!(matches!(r, Err(ManifestError::Io(_))));
    }
}

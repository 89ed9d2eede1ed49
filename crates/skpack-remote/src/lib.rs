//! Package repository client and publish protocol for skpack.
//!
//! This crate provides the `PackageRepository` trait (metadata search and
//! package upload), an HTTP implementation speaking the Skipper repository API,
//! remote endpoint configuration with optional authentication, and `publish`,
//! which uploads a packaged artifact only if its name/version is not yet known
//! to the repository.

pub mod config;
pub mod http;
pub mod publish;

pub use config::RemoteConfig;
pub use http::HttpRepository;
pub use publish::{decide, publish, Decision, PublishError, PublishOutcome};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("remote config error: {0}")]
    Config(String),
    #[error("repository rejected package: {0}")]
    Conflict(String),
}

/// Package metadata as returned by the repository.
///
/// Only `name` and `version` take part in publish decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl PackageMetadata {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_owned(),
            version: version.to_owned(),
            ..Self::default()
        }
    }

    /// Exact, case-sensitive name and version match.
    pub fn matches(&self, name: &str, version: &str) -> bool {
        self.name == name && self.version == version
    }
}

impl std::fmt::Display for PackageMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.version)?;
        if let Some(repo) = &self.repository_name {
            write!(f, " in '{repo}'")?;
        }
        Ok(())
    }
}

/// An upload of one packaged archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub repo_name: String,
    pub name: String,
    pub version: String,
    pub extension: String,
    #[serde(rename = "packageFileAsBytes", with = "payload_base64")]
    pub payload: Vec<u8>,
}

mod payload_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// A remote package repository.
pub trait PackageRepository: Send + Sync {
    /// Search packages by name. With `fuzzy`, the repository matches any name
    /// containing `name` and does not filter by version.
    fn search(&self, name: &str, fuzzy: bool) -> Result<Vec<PackageMetadata>, RemoteError>;

    /// Upload a package and return the metadata the repository stored.
    fn upload(&self, request: &UploadRequest) -> Result<PackageMetadata, RemoteError>;
}

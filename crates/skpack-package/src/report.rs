use crate::artifact::PackageArtifact;
use serde::Serialize;
use skpack_schema::ResourcePath;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Scan,
    Filter,
}

/// A file that did not make it into the package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    /// Relative path when known, otherwise the physical location.
    pub path: String,
    pub stage: FailureStage,
    pub reason: String,
}

/// Outcome of a packaging run.
///
/// Per-file failures do not abort packaging; they are collected here so the
/// caller decides whether a partial package is acceptable.
#[derive(Debug, Clone, Serialize)]
pub struct PackagingReport {
    pub package_dir: PathBuf,
    pub artifact: PackageArtifact,
    pub succeeded: Vec<ResourcePath>,
    pub overridden: Vec<ResourcePath>,
    pub failed: Vec<FileFailure>,
}

impl PackagingReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_in(&self, stage: FailureStage) -> impl Iterator<Item = &FileFailure> {
        self.failed.iter().filter(move |f| f.stage == stage)
    }
}

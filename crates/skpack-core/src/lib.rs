//! Packaging and publish engine for skpack.
//!
//! This crate ties together manifest loading, the packaging pipeline
//! (catalog, merge, template stage, archiver) and the publish protocol into the
//! `Engine`. The two phases share nothing but the archive on disk and the
//! project metadata, so they can run as separate invocations.

pub mod engine;
pub mod project;

pub use engine::{list_archive, ArchiveEntry, ArchiveListing, Engine, PackageOptions};
pub use project::{init_project, InitResult, Project, ProjectOverrides};

use skpack_package::PackagingReport;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] skpack_schema::ManifestError),
    #[error("packaging error: {0}")]
    Package(#[from] skpack_package::PackageError),
    #[error("publish error: {0}")]
    Publish(#[from] skpack_remote::PublishError),
    #[error("remote error: {0}")]
    Remote(#[from] skpack_remote::RemoteError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("packaging finished with {failed} failed file(s); archive written to '{}'", report.artifact.path.display())]
    PartialPackage {
        failed: usize,
        report: Box<PackagingReport>,
    },
    #[error("project already initialized: '{}' exists", .0.display())]
    AlreadyInitialized(PathBuf),
    #[error("no archive for {0}; run 'skpack package' first")]
    MissingArchive(String),
}

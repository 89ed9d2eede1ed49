//! Resource catalog, merge, template filtering, and archiving for skpack packages.
//!
//! This crate provides the packaging phase: the built-in Skipper package skeleton,
//! `ResourceProvider` scans of base and override roots keyed by `ResourcePath`,
//! override-wins `merge` into a `MergedFileSet`, the `TemplateEngine` stage that
//! materializes the working tree, and `pack` which turns that tree into a single
//! archive described by a `PackageArtifact`.

pub mod archive;
pub mod artifact;
pub mod builtin;
pub mod catalog;
pub mod filter;
pub mod layout;
pub mod merge;
pub mod report;

pub use archive::{pack, read_archive, ArchiveFormat, ArchiveHandle};
pub use artifact::PackageArtifact;
pub use builtin::{BuiltinResource, BUILTIN_RESOURCES, RESOURCE_ROOT};
pub use catalog::{
    list_base, list_overrides, BuiltinResources, ContentSource, DirectoryResources, Origin,
    ResourceEntry, ResourceProvider, ScanFailure, ScanOutcome,
};
pub use filter::{materialize, FilterError, MaterializeOutcome, PlaceholderFilter, TemplateEngine};
pub use layout::WorkLayout;
pub use merge::{merge, MergedFileSet};
pub use report::{FailureStage, FileFailure, PackagingReport};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("package I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive error for '{}': {reason}", path.display())]
    Archive { path: PathBuf, reason: String },
    #[error("unsupported archive format '{0}', expected 'zip' or 'tar.gz'")]
    UnsupportedFormat(String),
    #[error("invalid resource path: {0}")]
    Path(#[from] skpack_schema::PathError),
}

impl PackageError {
    pub(crate) fn archive(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        PackageError::Archive {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_error_display_archive() {
        let e = PackageError::archive(std::path::Path::new("/tmp/x.zip"), "disk full");
        let msg = e.to_string();
        assert!(msg.contains("/tmp/x.zip"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn package_error_display_unsupported_format() {
        let e = PackageError::UnsupportedFormat("rar".to_owned());
        assert!(e.to_string().contains("rar"));
    }

    #[test]
    fn package_error_from_path_error() {
        let e: PackageError = skpack_schema::PathError::Empty.into();
        assert!(e.to_string().contains("invalid resource path"));
    }
}

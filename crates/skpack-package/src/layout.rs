use crate::archive::ArchiveFormat;
use crate::PackageError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory layout of the packaging working directory.
///
/// ```text
/// <work_dir>/
///   <name>-<version>/          merged, filtered tree
///   <name>-<version>.zip       archive
/// ```
#[derive(Debug, Clone)]
pub struct WorkLayout {
    root: PathBuf,
}

impl WorkLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn package_dir(&self, package_id: &str) -> PathBuf {
        self.root.join(package_id)
    }

    #[inline]
    pub fn archive_path(&self, package_id: &str, format: ArchiveFormat) -> PathBuf {
        self.root.join(format!("{package_id}.{}", format.extension()))
    }

    pub fn initialize(&self) -> Result<(), PackageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Remove any tree left by a previous run and recreate it empty.
    ///
    /// Idempotent: calling it on a fresh layout just creates the directory.
    pub fn reset_package_dir(&self, package_id: &str) -> Result<PathBuf, PackageError> {
        let dir = self.package_dir(package_id);
        if dir.exists() {
            debug!("clearing previous working tree {}", dir.display());
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

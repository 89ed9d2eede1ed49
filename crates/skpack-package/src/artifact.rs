use crate::archive::ArchiveFormat;
use crate::layout::WorkLayout;
use serde::{Deserialize, Serialize};
use skpack_schema::ProjectContext;
use std::fs;
use std::io;
use std::path::PathBuf;

/// The single archived output of a packaging run.
///
/// Read-only input to the publish phase; the two phases share nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageArtifact {
    pub path: PathBuf,
    pub name: String,
    pub version: String,
    pub extension: String,
}

impl PackageArtifact {
    /// Where a packaging run for `context` puts its archive.
    pub fn locate(layout: &WorkLayout, context: &ProjectContext, format: ArchiveFormat) -> Self {
        Self {
            path: layout.archive_path(&context.package_id(), format),
            name: context.name.clone(),
            version: context.version.clone(),
            extension: format.extension().to_owned(),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the whole archive into memory.
    pub fn read_payload(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }

    /// blake3 hex digest of the archive bytes.
    pub fn digest(&self) -> io::Result<String> {
        let data = self.read_payload()?;
        Ok(blake3::hash(&data).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_uses_package_id_and_extension() {
        let layout = WorkLayout::new("/w");
        let ctx = ProjectContext::new("demo", "2.0");
        let a = PackageArtifact::locate(&layout, &ctx, ArchiveFormat::Zip);
        assert_eq!(a.path, PathBuf::from("/w/demo-2.0.zip"));
        assert_eq!(a.name, "demo");
        assert_eq!(a.version, "2.0");
        assert_eq!(a.extension, "zip");

        let t = PackageArtifact::locate(&layout, &ctx, ArchiveFormat::TarGz);
        assert_eq!(t.path, PathBuf::from("/w/demo-2.0.tar.gz"));
        assert_eq!(t.extension, "tar.gz");
    }

    #[test]
    fn read_payload_and_digest() {
        let dir = tempfile::tempdir().unwrap();
        let layout = WorkLayout::new(dir.path());
        let a = PackageArtifact::locate(&layout, &ProjectContext::new("x", "1"), ArchiveFormat::Zip);
        assert!(!a.exists());
        assert!(a.read_payload().is_err());

        fs::write(&a.path, b"payload").unwrap();
        assert!(a.exists());
        assert_eq!(a.read_payload().unwrap(), b"payload");
        assert_eq!(
            a.digest().unwrap(),
            blake3::hash(b"payload").to_hex().to_string()
        );
    }
}

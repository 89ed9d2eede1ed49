//! Project manifest parsing, substitution context, and resource paths for skpack.
//!
//! This crate defines the schema layer: TOML manifest parsing (`ProjectManifest`),
//! the immutable `ProjectContext` handed to the template stage and the publisher,
//! and the normalized `ResourcePath` key shared by every resource source.

pub mod context;
pub mod manifest;
pub mod types;

pub use context::ProjectContext;
pub use manifest::{
    parse_manifest_file, parse_manifest_str, parse_property, ManifestError, PackageSection,
    ProjectManifest, ProjectSection, RemoteSection, DEFAULT_OVERRIDE_DIR, DEFAULT_REMOTE_URL,
    DEFAULT_REPO_NAME, DEFAULT_WORK_DIR, MANIFEST_FILE,
};
pub use types::{PathError, ResourcePath};

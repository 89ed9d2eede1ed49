use crate::builtin::{BuiltinResource, BUILTIN_RESOURCES, RESOURCE_ROOT};
use serde::Serialize;
use skpack_schema::ResourcePath;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Where an entry's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Embedded(&'static [u8]),
    File(PathBuf),
}

impl ContentSource {
    pub fn read(&self) -> io::Result<Vec<u8>> {
        match self {
            ContentSource::Embedded(bytes) => Ok(bytes.to_vec()),
            ContentSource::File(path) => fs::read(path),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ContentSource::Embedded(_) => "<built-in>".to_owned(),
            ContentSource::File(path) => path.display().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Base,
    Override,
}

/// One file of the package, identified by its relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub path: ResourcePath,
    pub source: ContentSource,
    pub origin: Origin,
}

/// An entry the scan had to skip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFailure {
    pub location: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub entries: Vec<ResourceEntry>,
    pub failures: Vec<ScanFailure>,
}

impl ScanOutcome {
    fn skip(&mut self, location: impl Into<String>, reason: impl Into<String>) {
        let failure = ScanFailure {
            location: location.into(),
            reason: reason.into(),
        };
        warn!("skipping {}: {}", failure.location, failure.reason);
        self.failures.push(failure);
    }
}

/// A source of package resources.
///
/// Scans never abort: unreadable entries land in [`ScanOutcome::failures`].
/// Directories never produce entries.
pub trait ResourceProvider {
    fn scan(&self) -> ScanOutcome;

    /// Human-readable description for log messages.
    fn describe(&self) -> String;
}

/// Resources compiled into the binary, keyed by stripping [`RESOURCE_ROOT`].
pub struct BuiltinResources {
    resources: &'static [BuiltinResource],
}

impl BuiltinResources {
    pub fn new() -> Self {
        Self {
            resources: BUILTIN_RESOURCES,
        }
    }

    pub fn with_resources(resources: &'static [BuiltinResource]) -> Self {
        Self { resources }
    }
}

impl Default for BuiltinResources {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceProvider for BuiltinResources {
    fn scan(&self) -> ScanOutcome {
        let mut out = ScanOutcome::default();
        for res in self.resources {
            if res.location.ends_with('/') {
                continue;
            }
            match ResourcePath::strip_marker(res.location, RESOURCE_ROOT) {
                Some(Ok(path)) => {
                    debug!("base resource: {path}");
                    out.entries.push(ResourceEntry {
                        path,
                        source: ContentSource::Embedded(res.content),
                        origin: Origin::Base,
                    });
                }
                Some(Err(e)) => out.skip(res.location, e.to_string()),
                None => out.skip(res.location, format!("not under '{RESOURCE_ROOT}/'")),
            }
        }
        out
    }

    fn describe(&self) -> String {
        format!("built-in resources ({} files)", self.resources.len())
    }
}

/// Every regular file below a filesystem root, keyed relative to that root.
///
/// A missing root yields an empty scan.
pub struct DirectoryResources {
    root: PathBuf,
    origin: Origin,
}

impl DirectoryResources {
    pub fn new(root: impl Into<PathBuf>, origin: Origin) -> Self {
        Self {
            root: root.into(),
            origin,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceProvider for DirectoryResources {
    fn scan(&self) -> ScanOutcome {
        let mut out = ScanOutcome::default();
        if !self.root.exists() {
            debug!("{} does not exist, nothing to scan", self.root.display());
            return out;
        }
        if !self.root.is_dir() {
            out.skip(self.root.display().to_string(), "not a directory");
            return out;
        }

        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name();
        for item in walker {
            let entry = match item {
                Ok(e) => e,
                Err(e) => {
                    let location = e.path().map_or_else(
                        || self.root.display().to_string(),
                        |p| p.display().to_string(),
                    );
                    out.skip(location, e.to_string());
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            let full = entry.path();
            let rel = match full.strip_prefix(&self.root) {
                Ok(r) => r,
                Err(e) => {
                    out.skip(full.display().to_string(), format!("path strip: {e}"));
                    continue;
                }
            };
            let path = match ResourcePath::from_relative(rel) {
                Ok(p) => p,
                Err(e) => {
                    out.skip(full.display().to_string(), e.to_string());
                    continue;
                }
            };
            if let Err(e) = fs::File::open(full) {
                out.skip(full.display().to_string(), format!("unreadable: {e}"));
                continue;
            }
            debug!("{:?} resource: {path}", self.origin);
            out.entries.push(ResourceEntry {
                path,
                source: ContentSource::File(full.to_path_buf()),
                origin: self.origin,
            });
        }
        out
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Enumerate the base set: `base_dir` when given, the built-in skeleton otherwise.
pub fn list_base(base_dir: Option<&Path>) -> ScanOutcome {
    let provider: Box<dyn ResourceProvider> = match base_dir {
        Some(dir) => Box::new(DirectoryResources::new(dir, Origin::Base)),
        None => Box::new(BuiltinResources::new()),
    };
    debug!("scanning base set from {}", provider.describe());
    provider.scan()
}

/// Enumerate the project's override set rooted at `override_root`.
pub fn list_overrides(override_root: &Path) -> ScanOutcome {
    let provider = DirectoryResources::new(override_root, Origin::Override);
    debug!("scanning overrides from {}", provider.describe());
    provider.scan()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(out: &ScanOutcome) -> Vec<&str> {
        out.entries.iter().map(|e| e.path.as_str()).collect()
    }

    #[test]
    fn builtin_scan_strips_root_marker() {
        let out = BuiltinResources::new().scan();
        assert!(out.failures.is_empty());
        let p = paths(&out);
        assert!(p.contains(&"package.yml"));
        assert!(p.contains(&"values.yml"));
        assert!(p.contains(&"templates/app.yml"));
        assert!(out.entries.iter().all(|e| e.origin == Origin::Base));
    }

    static ODD: &[BuiltinResource] = &[
        BuiltinResource {
            location: "skipper/templates/",
            content: b"",
        },
        BuiltinResource {
            location: "elsewhere/x.yml",
            content: b"x",
        },
        BuiltinResource {
            location: "skipper/ok.yml",
            content: b"ok",
        },
    ];

    #[test]
    fn builtin_scan_skips_directories_and_reports_foreign_locations() {
        let out = BuiltinResources::with_resources(ODD).scan();
        assert_eq!(paths(&out), vec!["ok.yml"]);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].location, "elsewhere/x.yml");
    }

    static NESTED: &[BuiltinResource] = &[
        BuiltinResource {
            location: "skipper/templates/skipper/app.yml",
            content: b"nested",
        },
        BuiltinResource {
            location: "skipper/app.yml",
            content: b"top",
        },
    ];

    #[test]
    fn builtin_scan_keeps_nested_root_named_directory() {
        let out = BuiltinResources::with_resources(NESTED).scan();
        assert!(out.failures.is_empty());
        assert_eq!(paths(&out), vec!["templates/skipper/app.yml", "app.yml"]);

        let merged = crate::merge(out.entries, Vec::new());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn directory_scan_yields_files_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("templates/empty")).unwrap();
        fs::write(dir.path().join("values.yml"), "v").unwrap();
        fs::write(dir.path().join("templates/app.yml"), "a").unwrap();

        let out = list_overrides(dir.path());
        assert!(out.failures.is_empty());
        assert_eq!(paths(&out), vec!["templates/app.yml", "values.yml"]);
        assert!(out.entries.iter().all(|e| e.origin == Origin::Override));
    }

    #[test]
    fn missing_override_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let out = list_overrides(&dir.path().join("absent"));
        assert!(out.entries.is_empty());
        assert!(out.failures.is_empty());
    }

    #[test]
    fn override_root_that_is_a_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("skipper");
        fs::write(&file, "oops").unwrap();
        let out = list_overrides(&file);
        assert!(out.entries.is_empty());
        assert_eq!(out.failures.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn broken_entry_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.yml"), "g").unwrap();
        std::os::unix::fs::symlink(dir.path().join("missing"), dir.path().join("dangling.yml"))
            .unwrap();

        let out = list_overrides(dir.path());
        assert_eq!(paths(&out), vec!["good.yml"]);
        assert_eq!(out.failures.len(), 1);
        assert!(out.failures[0].location.contains("dangling.yml"));
    }

    #[test]
    fn list_base_prefers_directory_when_given() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("custom.yml"), "c").unwrap();
        let out = list_base(Some(dir.path()));
        assert_eq!(paths(&out), vec!["custom.yml"]);
        assert!(out.entries.iter().all(|e| e.origin == Origin::Base));

        let builtin = list_base(None);
        assert_eq!(builtin.entries.len(), BUILTIN_RESOURCES.len());
    }

    #[test]
    fn content_source_reads_both_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("f.txt");
        fs::write(&f, "file").unwrap();
        assert_eq!(ContentSource::File(f).read().unwrap(), b"file");
        assert_eq!(ContentSource::Embedded(b"emb").read().unwrap(), b"emb");
        assert_eq!(ContentSource::Embedded(b"").describe(), "<built-in>");
    }
}

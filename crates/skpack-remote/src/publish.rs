use crate::{PackageMetadata, PackageRepository, RemoteError, UploadRequest};
use serde::Serialize;
use skpack_package::PackageArtifact;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("error reading packaged archive '{}': {source}", path.display())]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("package {name}@{version} is already published; upgrading a published package is not supported")]
    AlreadyPublished { name: String, version: String },
    #[error(transparent)]
    Repository(#[from] RemoteError),
}

/// Whether the repository already holds a name/version pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    AlreadyPublished,
    NotPublished,
}

/// Scan search results for an exact name and version match.
pub fn decide(results: &[PackageMetadata], name: &str, version: &str) -> Decision {
    if results.iter().any(|m| m.matches(name, version)) {
        Decision::AlreadyPublished
    } else {
        Decision::NotPublished
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishOutcome {
    pub metadata: PackageMetadata,
    pub repo_name: String,
    pub bytes: usize,
}

/// Upload `artifact` to `repo_name` unless its name/version is already known.
///
/// The archive is read before any network call. Then exactly one fuzzy search
/// is made and, only if no result matches, exactly one upload. Nothing is
/// retried.
pub fn publish(
    artifact: &PackageArtifact,
    repo: &dyn PackageRepository,
    repo_name: &str,
) -> Result<PublishOutcome, PublishError> {
    let payload = artifact
        .read_payload()
        .map_err(|source| PublishError::ArtifactRead {
            path: artifact.path.clone(),
            source,
        })?;

    let results = repo.search(&artifact.name, true)?;
    debug!(
        "search for '{}' returned {} package(s)",
        artifact.name,
        results.len()
    );

    match decide(&results, &artifact.name, &artifact.version) {
        Decision::AlreadyPublished => Err(PublishError::AlreadyPublished {
            name: artifact.name.clone(),
            version: artifact.version.clone(),
        }),
        Decision::NotPublished => {
            let bytes = payload.len();
            let request = UploadRequest {
                repo_name: repo_name.to_owned(),
                name: artifact.name.clone(),
                version: artifact.version.clone(),
                extension: artifact.extension.clone(),
                payload,
            };
            let metadata = repo.upload(&request)?;
            info!("uploaded package: {metadata}");
            Ok(PublishOutcome {
                metadata,
                repo_name: repo_name.to_owned(),
                bytes,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory repository that records every call.
    #[derive(Default)]
    struct MockRepository {
        packages: Mutex<Vec<PackageMetadata>>,
        searches: Mutex<Vec<(String, bool)>>,
        uploads: Mutex<Vec<UploadRequest>>,
        fail_search: bool,
    }

    impl MockRepository {
        fn with(packages: Vec<PackageMetadata>) -> Self {
            Self {
                packages: Mutex::new(packages),
                ..Self::default()
            }
        }

        fn search_count(&self) -> usize {
            self.searches.lock().unwrap().len()
        }

        fn upload_count(&self) -> usize {
            self.uploads.lock().unwrap().len()
        }
    }

    impl PackageRepository for MockRepository {
        fn search(&self, name: &str, fuzzy: bool) -> Result<Vec<PackageMetadata>, RemoteError> {
            self.searches
                .lock()
                .unwrap()
                .push((name.to_owned(), fuzzy));
            if self.fail_search {
                return Err(RemoteError::Http("HTTP 503".to_owned()));
            }
            Ok(self
                .packages
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.name.to_lowercase().contains(&name.to_lowercase()))
                .cloned()
                .collect())
        }

        fn upload(&self, request: &UploadRequest) -> Result<PackageMetadata, RemoteError> {
            self.uploads.lock().unwrap().push(request.clone());
            let mut meta = PackageMetadata::new(&request.name, &request.version);
            meta.repository_name = Some(request.repo_name.clone());
            self.packages.lock().unwrap().push(meta.clone());
            Ok(meta)
        }
    }

    fn artifact(dir: &std::path::Path, name: &str, version: &str) -> PackageArtifact {
        PackageArtifact {
            path: dir.join(format!("{name}-{version}.zip")),
            name: name.to_owned(),
            version: version.to_owned(),
            extension: "zip".to_owned(),
        }
    }

    #[test]
    fn decide_requires_name_and_version() {
        let results = vec![
            PackageMetadata::new("X", "0.9"),
            PackageMetadata::new("X-extra", "1.0"),
        ];
        assert_eq!(decide(&results, "X", "1.0"), Decision::NotPublished);
        assert_eq!(decide(&[], "X", "1.0"), Decision::NotPublished);

        let results = vec![PackageMetadata::new("X", "1.0")];
        assert_eq!(decide(&results, "X", "1.0"), Decision::AlreadyPublished);
    }

    #[test]
    fn already_published_never_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(dir.path(), "X", "1.0");
        std::fs::write(&a.path, b"zip").unwrap();
        let repo = MockRepository::with(vec![PackageMetadata::new("X", "1.0")]);

        let err = publish(&a, &repo, "local").unwrap_err();
        assert!(matches!(
            err,
            PublishError::AlreadyPublished { ref name, ref version } if name == "X" && version == "1.0"
        ));
        assert_eq!(repo.search_count(), 1);
        assert_eq!(repo.upload_count(), 0);
    }

    #[test]
    fn not_published_uploads_once_with_full_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(dir.path(), "X", "1.0");
        let bytes: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&a.path, &bytes).unwrap();
        let repo = MockRepository::with(vec![PackageMetadata::new("X", "0.9")]);

        let outcome = publish(&a, &repo, "team").unwrap();
        assert!(outcome.metadata.matches("X", "1.0"));
        assert_eq!(outcome.bytes, bytes.len());
        assert_eq!(outcome.repo_name, "team");

        assert_eq!(
            *repo.searches.lock().unwrap(),
            vec![("X".to_owned(), true)]
        );
        let uploads = repo.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].payload, bytes);
        assert_eq!(uploads[0].repo_name, "team");
        assert_eq!(uploads[0].extension, "zip");
    }

    #[test]
    fn second_publish_fails() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(dir.path(), "X", "1.0");
        std::fs::write(&a.path, b"zip").unwrap();
        let repo = MockRepository::default();

        publish(&a, &repo, "local").unwrap();
        let err = publish(&a, &repo, "local").unwrap_err();
        assert!(matches!(err, PublishError::AlreadyPublished { .. }));
        assert_eq!(repo.upload_count(), 1);
    }

    #[test]
    fn missing_artifact_fails_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(dir.path(), "X", "1.0");
        let repo = MockRepository::default();

        let err = publish(&a, &repo, "local").unwrap_err();
        assert!(matches!(err, PublishError::ArtifactRead { .. }));
        assert_eq!(repo.search_count(), 0);
        assert_eq!(repo.upload_count(), 0);
    }

    #[test]
    fn search_failure_is_surfaced_without_retry() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(dir.path(), "X", "1.0");
        std::fs::write(&a.path, b"zip").unwrap();
        let repo = MockRepository {
            fail_search: true,
            ..MockRepository::default()
        };

        let err = publish(&a, &repo, "local").unwrap_err();
        assert!(matches!(err, PublishError::Repository(RemoteError::Http(_))));
        assert_eq!(repo.search_count(), 1);
        assert_eq!(repo.upload_count(), 0);
    }

    #[test]
    fn tar_gz_artifact_keeps_its_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = artifact(dir.path(), "X", "2.0");
        a.path = dir.path().join("X-2.0.tar.gz");
        a.extension = "tar.gz".to_owned();
        std::fs::write(&a.path, b"tgz").unwrap();
        let repo = MockRepository::default();

        publish(&a, &repo, "local").unwrap();
        assert_eq!(repo.uploads.lock().unwrap()[0].extension, "tar.gz");
    }
}

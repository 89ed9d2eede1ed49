use crate::CoreError;
use serde::Serialize;
use skpack_package::{
    list_base, list_overrides, materialize, merge, pack, read_archive, ArchiveFormat,
    FailureStage, FileFailure, PackageArtifact, PackagingReport, PlaceholderFilter, ScanOutcome,
    TemplateEngine, WorkLayout,
};
use skpack_remote::{publish, PackageRepository, PublishOutcome};
use skpack_schema::ProjectContext;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Inputs of one packaging run.
#[derive(Debug, Clone)]
pub struct PackageOptions {
    pub override_dir: PathBuf,
    /// Replaces the built-in base resources when set.
    pub base_dir: Option<PathBuf>,
    pub format: ArchiveFormat,
    /// Fail the run when any file could not be scanned or filtered.
    pub strict: bool,
}

/// One file inside a package archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    pub path: String,
    pub size: u64,
}

/// Contents of an archive on disk.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveListing {
    pub path: PathBuf,
    pub format: ArchiveFormat,
    pub digest: String,
    pub entries: Vec<ArchiveEntry>,
}

/// List the files stored in the archive at `path`.
pub fn list_archive(path: &Path, format: ArchiveFormat) -> Result<ArchiveListing, CoreError> {
    if !path.is_file() {
        return Err(CoreError::MissingArchive(path.display().to_string()));
    }
    let files = read_archive(path, format)?;
    let digest = blake3::hash(&std::fs::read(path)?).to_hex().to_string();
    let entries = files
        .into_iter()
        .map(|(path, data)| ArchiveEntry {
            path,
            size: data.len() as u64,
        })
        .collect();
    Ok(ArchiveListing {
        path: path.to_path_buf(),
        format,
        digest,
        entries,
    })
}

/// Runs the packaging and publish phases against one working directory.
pub struct Engine {
    layout: WorkLayout,
    templates: Box<dyn TemplateEngine>,
}

impl Engine {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            layout: WorkLayout::new(work_dir),
            templates: Box::new(PlaceholderFilter),
        }
    }

    #[must_use]
    pub fn with_template_engine(mut self, templates: Box<dyn TemplateEngine>) -> Self {
        self.templates = templates;
        self
    }

    pub fn layout(&self) -> &WorkLayout {
        &self.layout
    }

    /// Where the archive for `context` lives, whether or not it exists yet.
    pub fn artifact(&self, context: &ProjectContext, format: ArchiveFormat) -> PackageArtifact {
        PackageArtifact::locate(&self.layout, context, format)
    }

    /// Assemble and archive the package for `context`.
    ///
    /// The working tree is reset first. Files that cannot be scanned or
    /// filtered are skipped and listed in the report; the archive is still
    /// written. With `options.strict` such a run ends in
    /// [`CoreError::PartialPackage`]. Archive failures are always fatal.
    pub fn package(
        &self,
        context: &ProjectContext,
        options: &PackageOptions,
    ) -> Result<PackagingReport, CoreError> {
        let package_id = context.package_id();
        info!("packaging {package_id} into {}", self.layout.root().display());

        self.layout.initialize()?;
        let package_dir = self.layout.reset_package_dir(&package_id)?;

        let mut failed = Vec::new();
        let base = list_base(options.base_dir.as_deref());
        collect_scan_failures(&base, &mut failed);
        let overrides = list_overrides(&options.override_dir);
        collect_scan_failures(&overrides, &mut failed);

        let merged = merge(base.entries, overrides.entries);
        let overridden = merged.replaced().cloned().collect();
        let outcome = materialize(&merged, context, &package_dir, self.templates.as_ref());
        failed.extend(outcome.failures);

        let artifact = self.artifact(context, options.format);
        let handle = pack(&package_dir, &artifact.path, options.format, true)?;
        info!(
            "wrote {} ({} files, {} bytes)",
            handle.path.display(),
            handle.entries,
            handle.size
        );

        let report = PackagingReport {
            package_dir,
            artifact,
            succeeded: outcome.written,
            overridden,
            failed,
        };
        if !report.is_clean() {
            warn!(
                "{} file(s) were left out of {package_id}",
                report.failed.len()
            );
            if options.strict {
                return Err(CoreError::PartialPackage {
                    failed: report.failed.len(),
                    report: Box::new(report),
                });
            }
        }
        Ok(report)
    }

    /// List the archive a previous packaging run left for `context`.
    pub fn inspect(
        &self,
        context: &ProjectContext,
        format: ArchiveFormat,
    ) -> Result<ArchiveListing, CoreError> {
        list_archive(&self.artifact(context, format).path, format)
    }

    /// Publish the previously packaged archive for `context`.
    pub fn publish(
        &self,
        context: &ProjectContext,
        format: ArchiveFormat,
        repo: &dyn PackageRepository,
        repo_name: &str,
    ) -> Result<PublishOutcome, CoreError> {
        let artifact = self.artifact(context, format);
        info!(
            "publishing {} to repository '{repo_name}'",
            artifact.path.display()
        );
        Ok(publish(&artifact, repo, repo_name)?)
    }
}

fn collect_scan_failures(scan: &ScanOutcome, failed: &mut Vec<FileFailure>) {
    failed.extend(scan.failures.iter().map(|f| FileFailure {
        path: f.location.clone(),
        stage: FailureStage::Scan,
        reason: f.reason.clone(),
    }));
}

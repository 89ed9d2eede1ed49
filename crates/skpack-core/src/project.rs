use crate::CoreError;
use skpack_package::{ArchiveFormat, BUILTIN_RESOURCES, RESOURCE_ROOT};
use skpack_remote::RemoteConfig;
use skpack_schema::{
    parse_manifest_file, ManifestError, ProjectContext, ProjectManifest, ResourcePath,
    DEFAULT_OVERRIDE_DIR, MANIFEST_FILE,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Command-line settings that take precedence over `skpack.toml`.
///
/// Relative directories are taken from the current working directory, not
/// the manifest directory.
#[derive(Debug, Clone, Default)]
pub struct ProjectOverrides {
    pub override_dir: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub format: Option<String>,
    pub properties: Vec<(String, String)>,
    pub remote_url: Option<String>,
    pub repo_name: Option<String>,
}

/// A loaded manifest together with the directory it was found in.
#[derive(Debug, Clone)]
pub struct Project {
    manifest: ProjectManifest,
    root: PathBuf,
}

impl Project {
    pub fn load(manifest_path: &Path) -> Result<Self, CoreError> {
        debug!("loading manifest {}", manifest_path.display());
        let manifest = parse_manifest_file(manifest_path)?;
        let root = manifest_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok(Self { manifest, root })
    }

    pub fn from_manifest(manifest: ProjectManifest, root: impl Into<PathBuf>) -> Self {
        Self {
            manifest,
            root: root.into(),
        }
    }

    /// Apply command-line overrides and re-validate.
    pub fn apply(&mut self, overrides: &ProjectOverrides) -> Result<(), CoreError> {
        let m = &mut self.manifest;
        if let Some(dir) = &overrides.override_dir {
            m.package.override_dir = from_cwd(dir)?;
        }
        if let Some(dir) = &overrides.work_dir {
            m.package.work_dir = from_cwd(dir)?;
        }
        if let Some(format) = &overrides.format {
            m.package.format.clone_from(format);
        }
        for (k, v) in &overrides.properties {
            m.properties.insert(k.clone(), v.clone());
        }
        if let Some(url) = &overrides.remote_url {
            m.remote.url.clone_from(url);
        }
        if let Some(repo) = &overrides.repo_name {
            m.remote.repo_name.clone_from(repo);
        }
        m.validate()?;
        Ok(())
    }

    pub fn manifest(&self) -> &ProjectManifest {
        &self.manifest
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn context(&self) -> ProjectContext {
        self.manifest.context()
    }

    pub fn override_dir(&self) -> PathBuf {
        ProjectManifest::resolve_path(&self.root, &self.manifest.package.override_dir)
    }

    pub fn work_dir(&self) -> PathBuf {
        ProjectManifest::resolve_path(&self.root, &self.manifest.package.work_dir)
    }

    pub fn base_dir(&self) -> Option<PathBuf> {
        self.manifest
            .package
            .base_dir
            .as_deref()
            .map(|p| ProjectManifest::resolve_path(&self.root, p))
    }

    pub fn format(&self) -> Result<ArchiveFormat, CoreError> {
        self.manifest
            .package
            .format
            .parse()
            .map_err(|_| ManifestError::UnsupportedFormat(self.manifest.package.format.clone()).into())
    }

    /// Remote settings from the manifest, with credentials and timeout taken
    /// from the user's remote config when present.
    pub fn remote_config(&self, user: Option<&RemoteConfig>) -> RemoteConfig {
        let remote = &self.manifest.remote;
        let mut config = RemoteConfig::new(&remote.url, &remote.repo_name);
        if let Some(user) = user {
            config.auth_token.clone_from(&user.auth_token);
            config.timeout_secs = user.timeout_secs;
        }
        config
    }
}

fn from_cwd(path: &Path) -> Result<PathBuf, CoreError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[derive(Debug, Clone)]
pub struct InitResult {
    pub manifest_path: PathBuf,
    pub ejected: Vec<PathBuf>,
}

/// Write a starter `skpack.toml` into `dir`.
///
/// With `with_templates`, the built-in resources are also copied into the
/// override directory so they can be edited. Existing files are never
/// overwritten.
pub fn init_project(
    dir: &Path,
    name: &str,
    version: &str,
    with_templates: bool,
) -> Result<InitResult, CoreError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if manifest_path.exists() {
        return Err(CoreError::AlreadyInitialized(manifest_path));
    }

    let content = starter_manifest(name, version);
    // Refuse to write something we could not load back.
    skpack_schema::parse_manifest_str(&content)?;

    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.persist(&manifest_path).map_err(|e| CoreError::Io(e.error))?;
    info!("wrote {}", manifest_path.display());

    let mut ejected = Vec::new();
    if with_templates {
        let override_root = dir.join(DEFAULT_OVERRIDE_DIR);
        for res in BUILTIN_RESOURCES {
            let Some(Ok(rel)) = ResourcePath::strip_marker(res.location, RESOURCE_ROOT) else {
                continue;
            };
            let dest = rel.to_path(&override_root);
            if dest.exists() {
                debug!("keeping existing {}", dest.display());
                continue;
            }
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&dest, res.content)?;
            ejected.push(dest);
        }
        info!(
            "ejected {} template(s) into {}",
            ejected.len(),
            override_root.display()
        );
    }

    Ok(InitResult {
        manifest_path,
        ejected,
    })
}

fn starter_manifest(name: &str, version: &str) -> String {
    format!(
        r#"[project]
name = "{name}"
version = "{version}"
description = ""

# Extra template variables, referenced as ${{key}} or @key@.
[properties]

[package]
override_dir = "{DEFAULT_OVERRIDE_DIR}"
work_dir = "{work_dir}"
format = "zip"

[remote]
url = "{url}"
repo_name = "{repo}"
"#,
        work_dir = skpack_schema::DEFAULT_WORK_DIR,
        url = skpack_schema::DEFAULT_REMOTE_URL,
        repo = skpack_schema::DEFAULT_REPO_NAME,
    )
}

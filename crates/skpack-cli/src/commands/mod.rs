pub mod completions;
pub mod deploy;
pub mod init;
pub mod inspect;
pub mod package;
pub mod publish;

use crate::{PackageArgs, RemoteArgs};
use indicatif::{ProgressBar, ProgressStyle};
use skpack_core::{Project, ProjectOverrides};
use skpack_remote::{HttpRepository, RemoteConfig};
use skpack_schema::parse_property;
use std::path::Path;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;
pub const EXIT_PACKAGE_ERROR: u8 = 3;
pub const EXIT_ALREADY_PUBLISHED: u8 = 4;

/// Map an error message to the process exit code.
pub fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("manifest error:")
        || msg.starts_with("failed to parse manifest")
        || msg.starts_with("failed to read manifest")
    {
        EXIT_MANIFEST_ERROR
    } else if msg.starts_with("packaging error:") || msg.starts_with("packaging finished with") {
        EXIT_PACKAGE_ERROR
    } else if msg.starts_with("publish error:") && msg.contains("is already published") {
        EXIT_ALREADY_PUBLISHED
    } else {
        EXIT_FAILURE
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

/// Spinner unless output is JSON.
pub fn maybe_spinner(json: bool, msg: &str) -> Option<ProgressBar> {
    if json {
        None
    } else {
        Some(spinner(msg))
    }
}

pub fn warn_text(text: &str) -> String {
    console::Style::new().yellow().apply_to(text).to_string()
}

/// Load the manifest and apply command-line overrides.
pub fn load_project(manifest: &Path, args: &PackageArgs) -> Result<Project, String> {
    let mut project = Project::load(manifest).map_err(|e| e.to_string())?;
    let properties = args
        .set
        .iter()
        .map(|s| parse_property(s))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("manifest error: {e}"))?;
    let overrides = ProjectOverrides {
        override_dir: args.override_dir.clone(),
        work_dir: args.work_dir.clone(),
        format: args.format.clone(),
        properties,
        remote_url: None,
        repo_name: None,
    };
    project.apply(&overrides).map_err(|e| e.to_string())?;
    Ok(project)
}

/// Resolve remote settings: flags, then the manifest, then the user config
/// for credentials.
pub fn make_repository(
    project: &mut Project,
    args: &RemoteArgs,
) -> Result<(HttpRepository, String), String> {
    project
        .apply(&ProjectOverrides {
            remote_url: args.remote.clone(),
            repo_name: args.repo.clone(),
            ..ProjectOverrides::default()
        })
        .map_err(|e| e.to_string())?;
    let user = RemoteConfig::load_default_if_present().unwrap_or_else(|e| {
        tracing::warn!("ignoring remote config: {e}");
        None
    });
    let mut config = project.remote_config(user.as_ref());
    if let Some(token) = &args.token {
        config.auth_token = Some(token.clone());
    }
    let repo_name = config.repo_name.clone();
    Ok((HttpRepository::new(config), repo_name))
}

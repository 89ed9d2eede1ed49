use super::{
    json_pretty, load_project, make_repository, maybe_spinner, spin_fail, spin_ok, EXIT_SUCCESS,
};
use crate::{PackageArgs, RemoteArgs};
use skpack_core::{Engine, Project};
use skpack_remote::PublishOutcome;
use std::path::Path;

pub fn run(
    manifest: &Path,
    package: &PackageArgs,
    remote: &RemoteArgs,
    json: bool,
) -> Result<u8, String> {
    let mut project = load_project(manifest, package)?;
    let outcome = publish_project(&mut project, remote, json)?;
    print_outcome(&outcome, json)?;
    Ok(EXIT_SUCCESS)
}

/// Publish the project's packaged archive.
pub fn publish_project(
    project: &mut Project,
    remote: &RemoteArgs,
    json: bool,
) -> Result<PublishOutcome, String> {
    let (repo, repo_name) = make_repository(project, remote)?;
    let format = project.format().map_err(|e| e.to_string())?;
    let engine = Engine::new(project.work_dir());
    let context = project.context();

    let pb = maybe_spinner(
        json,
        &format!("publishing {} to {}...", context.package_id(), repo.config().url),
    );
    match engine.publish(&context, format, &repo, &repo_name) {
        Ok(outcome) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, &format!("published {}", context.package_id()));
            }
            Ok(outcome)
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "publish failed");
            }
            Err(e.to_string())
        }
    }
}

pub fn print_outcome(outcome: &PublishOutcome, json: bool) -> Result<(), String> {
    if json {
        println!("{}", json_pretty(outcome)?);
    } else {
        println!(
            "uploaded {} ({} bytes) to '{}'",
            outcome.metadata, outcome.bytes, outcome.repo_name
        );
    }
    Ok(())
}

use super::{
    json_pretty, load_project, maybe_spinner, spin_fail, spin_ok, warn_text, EXIT_SUCCESS,
};
use crate::PackageArgs;
use skpack_core::{CoreError, Engine, PackageOptions, Project};
use skpack_package::PackagingReport;
use std::path::Path;

pub fn run(manifest: &Path, args: &PackageArgs, strict: bool, json: bool) -> Result<u8, String> {
    let project = load_project(manifest, args)?;
    let report = package_project(&project, strict, json)?;
    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(EXIT_SUCCESS)
}

/// Run the packaging phase for a loaded project, with a spinner unless
/// output is JSON.
pub fn package_project(
    project: &Project,
    strict: bool,
    json: bool,
) -> Result<PackagingReport, String> {
    let format = project.format().map_err(|e| e.to_string())?;
    let options = PackageOptions {
        override_dir: project.override_dir(),
        base_dir: project.base_dir(),
        format,
        strict,
    };
    let engine = Engine::new(project.work_dir());
    let context = project.context();

    let pb = maybe_spinner(json, &format!("packaging {}...", context.package_id()));
    match engine.package(&context, &options) {
        Ok(report) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, &format!("packaged {}", context.package_id()));
            }
            Ok(report)
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "packaging failed");
            }
            if let CoreError::PartialPackage { report, .. } = &e {
                if !json {
                    print_failures(report);
                }
            }
            Err(e.to_string())
        }
    }
}

fn print_report(report: &PackagingReport) {
    println!("archive:     {}", report.artifact.path.display());
    match report.artifact.digest() {
        Ok(digest) => println!("digest:      {digest}"),
        Err(e) => println!("digest:      {}", warn_text(&format!("unavailable ({e})"))),
    }
    println!("files:       {}", report.succeeded.len());
    println!("overridden:  {}", report.overridden.len());
    for path in &report.overridden {
        println!("  {path}");
    }
    if !report.is_clean() {
        print_failures(report);
    }
}

fn print_failures(report: &PackagingReport) {
    println!(
        "failed:      {}",
        warn_text(&report.failed.len().to_string())
    );
    for failure in &report.failed {
        println!(
            "  {} [{:?}]: {}",
            warn_text(&failure.path),
            failure.stage,
            failure.reason
        );
    }
}

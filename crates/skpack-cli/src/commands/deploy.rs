use super::{json_pretty, load_project, EXIT_SUCCESS};
use super::{package::package_project, publish::publish_project};
use crate::{PackageArgs, RemoteArgs};
use std::path::Path;

pub fn run(
    manifest: &Path,
    package: &PackageArgs,
    remote: &RemoteArgs,
    strict: bool,
    json: bool,
) -> Result<u8, String> {
    let mut project = load_project(manifest, package)?;
    let report = package_project(&project, strict, json)?;
    let outcome = publish_project(&mut project, remote, json)?;

    if json {
        let payload = serde_json::json!({
            "package": report,
            "publish": outcome,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        if !report.is_clean() {
            println!(
                "{}",
                super::warn_text(&format!(
                    "{} file(s) were left out of the package",
                    report.failed.len()
                ))
            );
        }
        super::publish::print_outcome(&outcome, false)?;
    }
    Ok(EXIT_SUCCESS)
}

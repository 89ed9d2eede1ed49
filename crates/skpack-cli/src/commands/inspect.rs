use super::{json_pretty, load_project, EXIT_SUCCESS};
use crate::PackageArgs;
use skpack_core::{list_archive, Engine};
use skpack_package::ArchiveFormat;
use std::path::Path;

pub fn run(
    manifest: &Path,
    archive: Option<&Path>,
    package: &PackageArgs,
    json: bool,
) -> Result<u8, String> {
    let listing = match archive {
        Some(path) => {
            let format = match ArchiveFormat::from_path(path) {
                Some(f) => f,
                None => match package.format.as_deref() {
                    Some(f) => f.parse().map_err(|e| format!("manifest error: {e}"))?,
                    None => ArchiveFormat::default(),
                },
            };
            list_archive(path, format).map_err(|e| e.to_string())?
        }
        None => {
            let project = load_project(manifest, package)?;
            let format = project.format().map_err(|e| e.to_string())?;
            Engine::new(project.work_dir())
                .inspect(&project.context(), format)
                .map_err(|e| e.to_string())?
        }
    };

    if json {
        println!("{}", json_pretty(&listing)?);
    } else {
        println!("archive:  {}", listing.path.display());
        println!("format:   {}", listing.format);
        println!("digest:   {}", listing.digest);
        println!("entries:  {}", listing.entries.len());
        for entry in &listing.entries {
            println!("  {:>10}  {}", entry.size, entry.path);
        }
    }
    Ok(EXIT_SUCCESS)
}

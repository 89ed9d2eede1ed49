use super::{json_pretty, EXIT_SUCCESS};
use skpack_core::init_project;
use std::path::Path;

pub fn run(
    dir: &Path,
    name: Option<&str>,
    version: &str,
    with_templates: bool,
    json: bool,
) -> Result<u8, String> {
    let name = match name {
        Some(n) => n.to_owned(),
        None => default_name(dir),
    };
    let result =
        init_project(dir, &name, version, with_templates).map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "manifest": result.manifest_path,
            "name": name,
            "version": version,
            "templates": result.ejected,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("wrote {}", result.manifest_path.display());
        for path in &result.ejected {
            println!("  template {}", path.display());
        }
    }
    Ok(EXIT_SUCCESS)
}

fn default_name(dir: &Path) -> String {
    dir.canonicalize()
        .unwrap_or_else(|_| dir.to_path_buf())
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "app".to_owned())
}

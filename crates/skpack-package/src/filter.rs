use crate::catalog::ResourceEntry;
use crate::merge::MergedFileSet;
use crate::report::{FailureStage, FileFailure};
use regex::{Captures, Regex};
use skpack_schema::{ProjectContext, ResourcePath};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("filter I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("template error: {0}")]
    Template(String),
}

/// Token substitution over one resource.
pub trait TemplateEngine {
    fn filter(
        &self,
        source: &[u8],
        destination: &mut dyn Write,
        context: &ProjectContext,
    ) -> Result<(), FilterError>;
}

// Group 1: escaped `\${key}`, emitted literally without the backslash.
// Group 2: `${key}`. Group 3: `@key@`.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(\$\{[A-Za-z0-9_.\-]+\})|\$\{([A-Za-z0-9_.\-]+)\}|@([A-Za-z0-9_.\-]+)@")
        .expect("valid placeholder pattern")
});

/// Replaces `${key}` and `@key@` tokens with context variables.
///
/// Unknown keys are left as written. Sources that are not UTF-8 are copied
/// through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderFilter;

impl PlaceholderFilter {
    pub fn substitute(text: &str, vars: &BTreeMap<String, String>) -> String {
        PLACEHOLDER
            .replace_all(text, |caps: &Captures<'_>| {
                if let Some(escaped) = caps.get(1) {
                    return escaped.as_str().to_owned();
                }
                let key = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
                match vars.get(key) {
                    Some(value) => value.clone(),
                    None => caps[0].to_owned(),
                }
            })
            .into_owned()
    }
}

impl TemplateEngine for PlaceholderFilter {
    fn filter(
        &self,
        source: &[u8],
        destination: &mut dyn Write,
        context: &ProjectContext,
    ) -> Result<(), FilterError> {
        if let Ok(text) = std::str::from_utf8(source) {
            let rendered = Self::substitute(text, &context.variables());
            destination.write_all(rendered.as_bytes())?;
        } else {
            debug!("source is not UTF-8, copying verbatim");
            destination.write_all(source)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MaterializeOutcome {
    pub written: Vec<ResourcePath>,
    pub failures: Vec<FileFailure>,
}

/// Write every merged entry, filtered, below `dest_root`.
///
/// A failing entry is logged and recorded but does not stop the others.
/// Each destination is written to a temp file and renamed into place, so a
/// failed entry leaves nothing behind.
pub fn materialize(
    files: &MergedFileSet,
    context: &ProjectContext,
    dest_root: &Path,
    engine: &dyn TemplateEngine,
) -> MaterializeOutcome {
    let mut out = MaterializeOutcome::default();
    for entry in files.iter() {
        match materialize_entry(entry, context, dest_root, engine) {
            Ok(()) => {
                debug!("wrote {}", entry.path);
                out.written.push(entry.path.clone());
            }
            Err(e) => {
                warn!("failed to filter {}: {e}", entry.path);
                out.failures.push(FileFailure {
                    path: entry.path.to_string(),
                    stage: FailureStage::Filter,
                    reason: e.to_string(),
                });
            }
        }
    }
    out
}

fn materialize_entry(
    entry: &ResourceEntry,
    context: &ProjectContext,
    dest_root: &Path,
    engine: &dyn TemplateEngine,
) -> Result<(), FilterError> {
    let dest = entry.path.to_path(dest_root);
    let parent = dest.parent().unwrap_or(dest_root);
    fs::create_dir_all(parent)?;
    if dest.is_dir() {
        let reason = format!("{} is already a directory", entry.path);
        return Err(FilterError::Template(reason));
    }

    let source = entry.source.read()?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    engine.filter(&source, &mut tmp, context)?;
    tmp.flush()?;
    tmp.persist(&dest).map_err(|e| FilterError::Io(e.error))?;
    Ok(())
}

use crate::PackageError;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use skpack_schema::ResourcePath;
use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const FILE_MODE: u32 = 0o644;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveFormat {
    #[default]
    #[serde(rename = "zip")]
    Zip,
    #[serde(rename = "tar.gz")]
    TarGz,
}

impl ArchiveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarGz => "tar.gz",
        }
    }

    /// Guess the format from a file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else {
            None
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ArchiveFormat {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zip" => Ok(ArchiveFormat::Zip),
            "tar.gz" | "tgz" => Ok(ArchiveFormat::TarGz),
            other => Err(PackageError::UnsupportedFormat(other.to_owned())),
        }
    }
}

/// A finished archive on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHandle {
    pub path: PathBuf,
    pub format: ArchiveFormat,
    pub entries: usize,
    pub size: u64,
}

/// Pack every regular file under `source_dir` into a single archive at `dest`.
///
/// Entries are sorted by path and carry no directory records. With
/// `include_root_dir` each entry is prefixed by the name of `source_dir`.
/// The archive is written to a temp file next to `dest` and renamed into place;
/// on failure no archive is left at `dest`, not even one from an earlier run.
pub fn pack(
    source_dir: &Path,
    dest: &Path,
    format: ArchiveFormat,
    include_root_dir: bool,
) -> Result<ArchiveHandle, PackageError> {
    let fail = |e: &dyn fmt::Display| PackageError::archive(dest, e);

    if dest.exists() {
        fs::remove_file(dest).map_err(|e| fail(&e))?;
    }
    if !source_dir.is_dir() {
        return Err(fail(&format!(
            "source directory {} is not readable",
            source_dir.display()
        )));
    }

    let prefix = if include_root_dir {
        let root = source_dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| fail(&"source directory has no usable name"))?;
        Some(root.to_owned())
    } else {
        None
    };
    let files = collect_files(source_dir, prefix.as_deref()).map_err(|e| fail(&e))?;

    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| fail(&e))?;
    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| fail(&e))?;

    match format {
        ArchiveFormat::Zip => write_zip(tmp.as_file_mut(), &files).map_err(|e| fail(&e))?,
        ArchiveFormat::TarGz => write_tar_gz(tmp.as_file_mut(), &files).map_err(|e| fail(&e))?,
    }
    tmp.as_file().sync_all().map_err(|e| fail(&e))?;
    let file = tmp.persist(dest).map_err(|e| fail(&e.error))?;
    let size = file.metadata().map_err(|e| fail(&e))?.len();

    debug!(
        "packed {} files into {} ({size} bytes)",
        files.len(),
        dest.display()
    );
    Ok(ArchiveHandle {
        path: dest.to_path_buf(),
        format,
        entries: files.len(),
        size,
    })
}

/// List `(entry name, content)` for every file in an archive.
pub fn read_archive(
    path: &Path,
    format: ArchiveFormat,
) -> Result<Vec<(String, Vec<u8>)>, PackageError> {
    let fail = |e: &dyn fmt::Display| PackageError::archive(path, e);
    let file = fs::File::open(path)?;
    let mut out = Vec::new();
    match format {
        ArchiveFormat::Zip => {
            let mut archive = ZipArchive::new(file).map_err(|e| fail(&e))?;
            for i in 0..archive.len() {
                let mut entry = archive.by_index(i).map_err(|e| fail(&e))?;
                if entry.is_dir() {
                    continue;
                }
                let name = entry.name().to_owned();
                let mut data = Vec::new();
                entry.read_to_end(&mut data)?;
                out.push((name, data));
            }
        }
        ArchiveFormat::TarGz => {
            let mut archive = tar::Archive::new(GzDecoder::new(file));
            for entry in archive.entries()? {
                let mut entry = entry?;
                if !entry.header().entry_type().is_file() {
                    continue;
                }
                let name = entry.path()?.to_string_lossy().into_owned();
                let mut data = Vec::new();
                entry.read_to_end(&mut data)?;
                out.push((name, data));
            }
        }
    }
    Ok(out)
}

/// Sorted `(entry name, full path)` pairs for every regular file.
fn collect_files(root: &Path, prefix: Option<&str>) -> io::Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for item in WalkDir::new(root).sort_by_file_name() {
        let entry = item.map_err(io::Error::other)?;
        let ft = entry.file_type();
        if ft.is_dir() {
            continue;
        }
        if !ft.is_file() {
            warn!("skipping non-regular file {}", entry.path().display());
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| io::Error::other(format!("path strip: {e}")))?;
        let rel = ResourcePath::from_relative(rel).map_err(io::Error::other)?;
        let name = match prefix {
            Some(p) => format!("{p}/{rel}"),
            None => rel.into(),
        };
        files.push((name, entry.path().to_path_buf()));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

fn write_zip(out: &mut fs::File, files: &[(String, PathBuf)]) -> Result<(), String> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(FILE_MODE);
    let mut zip = ZipWriter::new(out);
    for (name, full) in files {
        zip.start_file(name.as_str(), options)
            .map_err(|e| e.to_string())?;
        let mut src = fs::File::open(full).map_err(|e| format!("{}: {e}", full.display()))?;
        io::copy(&mut src, &mut zip).map_err(|e| e.to_string())?;
    }
    zip.finish().map_err(|e| e.to_string())?;
    Ok(())
}

fn write_tar_gz(out: &mut fs::File, files: &[(String, PathBuf)]) -> Result<(), String> {
    let encoder = GzEncoder::new(out, Compression::default());
    let mut ar = tar::Builder::new(encoder);
    for (name, full) in files {
        let data = fs::read(full).map_err(|e| format!("{}: {e}", full.display()))?;
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        header.set_mode(FILE_MODE);
        header.set_size(data.len() as u64);
        header.set_cksum();
        ar.append_data(&mut header, name, data.as_slice())
            .map_err(|e| e.to_string())?;
    }
    let encoder = ar.into_inner().map_err(|e| e.to_string())?;
    encoder.finish().map_err(|e| e.to_string())?;
    Ok(())
}

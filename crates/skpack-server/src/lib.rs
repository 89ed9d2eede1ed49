//! Reference HTTP package repository for skpack.
//!
//! Implements the subset of the Skipper repository API that `skpack publish`
//! uses: package metadata search and package upload. Storage is file-backed:
//! archives go into `{data_dir}/packages/{repo}/{name}/{name}-{version}.{ext}`,
//! the metadata index lives at `{data_dir}/index.json`. A name/version pair can
//! be uploaded only once; a second upload is answered with `409 Conflict`.
//!
//! Routes are served both at the root and below `/api`.
//!
//! The [`TestServer`] helper starts a server on a random port for integration testing.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use skpack_remote::{PackageMetadata, UploadRequest};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{debug, error, info, warn};

const INDEX_FILE: &str = "index.json";
const SEARCH_PREFIX: &str = "/packageMetadata/search/";

/// One uploaded package as recorded in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPackage {
    pub metadata: PackageMetadata,
    pub extension: String,
    /// Archive location relative to the data directory.
    pub file: String,
    /// blake3 hex digest of the archive.
    pub digest: String,
    pub size: u64,
    pub uploaded_at: String,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid upload: {0}")]
    Invalid(String),
    #[error("package {0} already exists")]
    Duplicate(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// File-backed package store with an in-memory index.
pub struct PackageStore {
    data_dir: PathBuf,
    index: RwLock<Vec<StoredPackage>>,
}

impl PackageStore {
    /// Open the store, loading `index.json` when present.
    ///
    /// An index that exists but cannot be parsed is an error: starting empty
    /// would let published name/version pairs be uploaded again.
    pub fn new(data_dir: PathBuf) -> io::Result<Self> {
        let index_path = data_dir.join(INDEX_FILE);
        let index = match fs::read(&index_path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("corrupt index {}: {e}", index_path.display()),
                )
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e),
        };
        Ok(Self {
            data_dir,
            index: RwLock::new(index),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn packages(&self) -> Vec<StoredPackage> {
        self.index.read().expect("index lock poisoned").clone()
    }

    /// Case-insensitive search; `containing` matches substrings, otherwise the
    /// whole name must match.
    pub fn search(&self, name: &str, containing: bool) -> Vec<PackageMetadata> {
        let needle = name.to_lowercase();
        self.index
            .read()
            .expect("index lock poisoned")
            .iter()
            .filter(|p| {
                let candidate = p.metadata.name.to_lowercase();
                if containing {
                    candidate.contains(&needle)
                } else {
                    candidate == needle
                }
            })
            .map(|p| p.metadata.clone())
            .collect()
    }

    pub fn find(&self, name: &str, version: &str) -> Option<StoredPackage> {
        self.index
            .read()
            .expect("index lock poisoned")
            .iter()
            .find(|p| p.metadata.matches(name, version))
            .cloned()
    }

    pub fn read_archive(&self, stored: &StoredPackage) -> io::Result<Vec<u8>> {
        fs::read(self.data_dir.join(&stored.file))
    }

    pub fn upload(&self, request: &UploadRequest) -> Result<PackageMetadata, UploadError> {
        validate_upload(request)?;

        // Hold the write lock across the duplicate check and the insert.
        let mut index = self.index.write().expect("index lock poisoned");
        if index
            .iter()
            .any(|p| p.metadata.matches(&request.name, &request.version))
        {
            return Err(UploadError::Duplicate(format!(
                "{}@{}",
                request.name, request.version
            )));
        }

        let file = format!(
            "packages/{repo}/{name}/{name}-{version}.{ext}",
            repo = request.repo_name,
            name = request.name,
            version = request.version,
            ext = request.extension
        );
        let path = self.data_dir.join(&file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &request.payload)?;

        let mut metadata = PackageMetadata::new(&request.name, &request.version);
        metadata.repository_name = Some(request.repo_name.clone());
        let mut updated = index.clone();
        updated.push(StoredPackage {
            metadata: metadata.clone(),
            extension: request.extension.clone(),
            file,
            digest: blake3::hash(&request.payload).to_hex().to_string(),
            size: request.payload.len() as u64,
            uploaded_at: chrono::Utc::now().to_rfc3339(),
        });
        // The in-memory index only changes once the new one is on disk.
        if let Err(e) = self.persist_index(&updated) {
            if let Err(rm) = fs::remove_file(&path) {
                warn!("failed to remove {}: {rm}", path.display());
            }
            return Err(e.into());
        }
        *index = updated;
        Ok(metadata)
    }

    fn persist_index(&self, index: &[StoredPackage]) -> io::Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        let json = serde_json::to_vec_pretty(index).map_err(io::Error::other)?;
        let tmp = self.data_dir.join(format!("{INDEX_FILE}.tmp"));
        fs::write(&tmp, json)?;
        fs::rename(tmp, self.data_dir.join(INDEX_FILE))
    }
}

fn validate_upload(request: &UploadRequest) -> Result<(), UploadError> {
    for (field, value) in [
        ("repoName", request.repo_name.as_str()),
        ("name", request.name.as_str()),
        ("version", request.version.as_str()),
    ] {
        if value.trim().is_empty()
            || value.contains(['/', '\\'])
            || value == "."
            || value == ".."
        {
            return Err(UploadError::Invalid(format!("invalid {field} '{value}'")));
        }
    }
    if !matches!(request.extension.as_str(), "zip" | "tar.gz") {
        return Err(UploadError::Invalid(format!(
            "unsupported extension '{}'",
            request.extension
        )));
    }
    Ok(())
}

/// HAL collection body for search results.
pub fn search_page(results: Vec<PackageMetadata>) -> serde_json::Value {
    if results.is_empty() {
        serde_json::json!({ "_links": {} })
    } else {
        serde_json::json!({ "_embedded": { "packageMetadata": results }, "_links": {} })
    }
}

/// Decode a form-encoded query component (`+` is a space).
fn decode_component(input: &str) -> String {
    let spaced = input.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Value of `key` in a raw query string.
pub fn query_param(query: &str, key: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        (decode_component(k) == key).then(|| decode_component(v))
    })
}

fn respond_err(req: tiny_http::Request, code: u16, msg: &str) {
    let _ = req.respond(Response::from_string(msg).with_status_code(StatusCode(code)));
}

fn respond_json(req: tiny_http::Request, code: u16, json: impl Into<Vec<u8>>) {
    let header = Header::from_bytes("Content-Type", "application/json").expect("valid header");
    let _ = req.respond(
        Response::from_data(json.into())
            .with_header(header)
            .with_status_code(StatusCode(code)),
    );
}

fn read_body(req: &mut tiny_http::Request) -> Option<Vec<u8>> {
    let mut body = Vec::new();
    if req.as_reader().read_to_end(&mut body).is_ok() {
        Some(body)
    } else {
        None
    }
}

fn handle_search(store: &PackageStore, req: tiny_http::Request, finder: &str, query: &str) {
    let containing = match finder {
        "findByNameContainingIgnoreCase" => true,
        "findByNameIgnoreCase" => false,
        _ => {
            respond_err(req, 404, "unknown search");
            return;
        }
    };
    let name = query_param(query, "name").unwrap_or_default();
    let results = store.search(&name, containing);
    debug!("search {finder} '{name}': {} result(s)", results.len());
    respond_json(req, 200, search_page(results).to_string());
}

fn handle_upload(store: &PackageStore, mut req: tiny_http::Request) {
    let Some(body) = read_body(&mut req) else {
        respond_err(req, 500, "read error");
        return;
    };
    let request: UploadRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            respond_err(req, 400, &format!("invalid upload request: {e}"));
            return;
        }
    };
    match store.upload(&request) {
        Ok(metadata) => {
            info!(
                "stored {metadata}: {} bytes, {}",
                request.payload.len(),
                request.extension
            );
            let json = serde_json::to_vec(&metadata).unwrap_or_default();
            respond_json(req, 201, json);
        }
        Err(UploadError::Duplicate(what)) => {
            warn!("rejected duplicate upload of {what}");
            respond_err(req, 409, &format!("package {what} already exists"));
        }
        Err(UploadError::Invalid(msg)) => respond_err(req, 400, &msg),
        Err(UploadError::Io(e)) => {
            error!("upload of {}@{}: {e}", request.name, request.version);
            respond_err(req, 500, &format!("write error: {e}"));
        }
    }
}

/// Handle a single HTTP request, dispatching to the appropriate route handler.
pub fn handle_request(store: &PackageStore, req: tiny_http::Request) {
    let method = req.method().clone();
    let url = req.url().to_owned();
    debug!("{method} {url}");

    let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));
    let path = path.strip_prefix("/api").unwrap_or(path);

    if let Some(finder) = path.strip_prefix(SEARCH_PREFIX) {
        if method == Method::Get {
            handle_search(store, req, finder, query);
        } else {
            respond_err(req, 405, "method not allowed");
        }
    } else if path == "/packageMetadata" && method == Method::Get {
        let all = store.packages().into_iter().map(|p| p.metadata).collect();
        respond_json(req, 200, search_page(all).to_string());
    } else if path == "/package/upload" {
        if method == Method::Post {
            handle_upload(store, req);
        } else {
            respond_err(req, 405, "method not allowed");
        }
    } else if path == "/health" && method == Method::Get {
        let _ = req.respond(Response::from_string(r#"{"status":"ok"}"#));
    } else {
        respond_err(req, 404, "not found");
    }
}

/// Start the server loop, blocking the current thread.
pub fn run_server(store: &Arc<PackageStore>, addr: &str) -> io::Result<()> {
    let server = Server::http(addr).map_err(io::Error::other)?;
    for request in server.incoming_requests() {
        handle_request(store, request);
    }
    Ok(())
}

/// A test helper that starts a repository on a random port in a background thread.
///
/// `url` already includes the `/api` prefix, ready for `RemoteConfig::new`.
pub struct TestServer {
    pub url: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub store: Arc<PackageStore>,
    server: Arc<Server>,
    _handle: std::thread::JoinHandle<()>,
}

impl TestServer {
    /// Binds to `127.0.0.1:0` (random port).
    pub fn start(data_dir: PathBuf) -> Self {
        fs::create_dir_all(&data_dir).expect("failed to create test data dir");
        let server =
            Arc::new(Server::http("127.0.0.1:0").expect("failed to bind test HTTP server"));
        let port = server.server_addr().to_ip().expect("not an IP addr").port();
        let url = format!("http://127.0.0.1:{port}/api");

        let store =
            Arc::new(PackageStore::new(data_dir.clone()).expect("failed to open test store"));
        let srv = Arc::clone(&server);
        let handler_store = Arc::clone(&store);
        let handle = std::thread::spawn(move || {
            for request in srv.incoming_requests() {
                handle_request(&handler_store, request);
            }
        });

        Self {
            url,
            port,
            data_dir,
            store,
            server,
            _handle: handle,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

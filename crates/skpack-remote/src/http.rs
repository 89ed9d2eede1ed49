use crate::{PackageMetadata, PackageRepository, RemoteConfig, RemoteError, UploadRequest};
use serde::Deserialize;
use std::io::Read;
use std::time::Duration;

/// HTTP client for a Skipper package repository.
///
/// Uses a subset of the Skipper REST API:
/// - `GET  /packageMetadata/search/findByNameContainingIgnoreCase?name=<n>` (fuzzy)
/// - `GET  /packageMetadata/search/findByNameIgnoreCase?name=<n>` (exact)
/// - `POST /package/upload` with a JSON [`UploadRequest`]
///
/// Search results are HAL documents; a body without `_embedded` means no match.
pub struct HttpRepository {
    config: RemoteConfig,
    agent: ureq::Agent,
}

#[derive(Debug, Default, Deserialize)]
struct SearchPage {
    #[serde(rename = "_embedded", default)]
    embedded: Option<Embedded>,
}

#[derive(Debug, Default, Deserialize)]
struct Embedded {
    #[serde(rename = "packageMetadata", default)]
    package_metadata: Vec<PackageMetadata>,
}

impl HttpRepository {
    pub fn new(config: RemoteConfig) -> Self {
        // A zero timeout means no limit.
        let timeout = (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(timeout)
            .build();
        let agent = ureq::Agent::new_with_config(agent_config);
        Self { config, agent }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn search_url(&self, fuzzy: bool) -> String {
        let finder = if fuzzy {
            "findByNameContainingIgnoreCase"
        } else {
            "findByNameIgnoreCase"
        };
        format!("{}/packageMetadata/search/{finder}", self.config.url)
    }

    fn upload_url(&self) -> String {
        format!("{}/package/upload", self.config.url)
    }

    fn status_error(code: u16, url: &str) -> RemoteError {
        match code {
            404 => RemoteError::NotFound(url.to_owned()),
            409 => RemoteError::Conflict(format!("HTTP 409 for {url}")),
            _ => RemoteError::Http(format!("HTTP {code} for {url}")),
        }
    }

    fn read_body(resp: ureq::http::Response<ureq::Body>) -> Result<Vec<u8>, RemoteError> {
        let mut reader = resp.into_body().into_reader();
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| RemoteError::Http(e.to_string()))?;
        Ok(body)
    }

    fn do_get(&self, url: &str, name: &str) -> Result<Vec<u8>, RemoteError> {
        let mut req = self
            .agent
            .get(url)
            .query("name", name)
            .header("Accept", "application/hal+json, application/json");
        if let Some(ref token) = self.config.auth_token {
            req = req.header("Authorization", &format!("Bearer {token}"));
        }
        match req.call() {
            Ok(resp) => Self::read_body(resp),
            Err(ureq::Error::StatusCode(code)) => Err(Self::status_error(code, url)),
            Err(e) => Err(RemoteError::Http(e.to_string())),
        }
    }

    fn do_post(&self, url: &str, data: &[u8]) -> Result<Vec<u8>, RemoteError> {
        let mut req = self
            .agent
            .post(url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        if let Some(ref token) = self.config.auth_token {
            req = req.header("Authorization", &format!("Bearer {token}"));
        }
        match req.send(data) {
            Ok(resp) => Self::read_body(resp),
            Err(ureq::Error::StatusCode(code)) => Err(Self::status_error(code, url)),
            Err(e) => Err(RemoteError::Http(e.to_string())),
        }
    }
}

impl PackageRepository for HttpRepository {
    fn search(&self, name: &str, fuzzy: bool) -> Result<Vec<PackageMetadata>, RemoteError> {
        let url = self.search_url(fuzzy);
        tracing::debug!("GET {url}?name={name}");
        let body = self.do_get(&url, name)?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let page: SearchPage =
            serde_json::from_slice(&body).map_err(|e| RemoteError::Serialization(e.to_string()))?;
        Ok(page
            .embedded
            .map(|e| e.package_metadata)
            .unwrap_or_default())
    }

    fn upload(&self, request: &UploadRequest) -> Result<PackageMetadata, RemoteError> {
        let url = self.upload_url();
        let body =
            serde_json::to_vec(request).map_err(|e| RemoteError::Serialization(e.to_string()))?;
        tracing::debug!(
            "POST {url} ({} bytes payload, {} bytes body)",
            request.payload.len(),
            body.len()
        );
        let resp = self.do_post(&url, &body)?;
        serde_json::from_slice(&resp).map_err(|e| RemoteError::Serialization(e.to_string()))
    }
}

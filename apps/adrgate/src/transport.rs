//! HTTP transport: manifest query and violation upload.
//!
//! Uses a blocking `reqwest` client with a caller-supplied timeout. Any
//! non-2xx response becomes `Error::Transport` with the status and body;
//! there is no retry here.

use crate::aggregate::Uploader;
use crate::error::{Error, Result};
use crate::models::wire::{ManifestDocument, UploadPayload};
use reqwest::blocking::{Client, Response};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("adrgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Unreachable {
                url: String::new(),
                reason: format!("cannot build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    /// `GET {base}/{repo}` and decode the manifest document.
    pub fn fetch_manifest(&self, base_url: &str, repo: &str) -> Result<ManifestDocument> {
        let url = manifest_url(base_url, repo);
        debug!(url = %url, "fetching manifest");
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| unreachable(&url, e))?;
        let resp = check_status(&url, resp)?;
        let body = resp.text().map_err(|e| unreachable(&url, e))?;
        serde_json::from_str(&body).map_err(|e| Error::malformed(url, e))
    }

    /// `POST` the payload as JSON.
    pub fn post_violations(&self, url: &str, payload: &UploadPayload) -> Result<()> {
        debug!(url, count = payload.violations.len(), "uploading violations");
        let resp = self
            .client
            .post(url)
            .json(payload)
            .send()
            .map_err(|e| unreachable(url, e))?;
        check_status(url, resp).map(|_| ())
    }
}

/// Uploader posting to a fixed endpoint.
pub struct HttpUploader {
    transport: HttpTransport,
    url: String,
}

impl HttpUploader {
    pub fn new(transport: HttpTransport, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
        }
    }
}

impl Uploader for HttpUploader {
    fn upload(&self, payload: &UploadPayload) -> Result<()> {
        self.transport.post_violations(&self.url, payload)
    }
}

pub fn manifest_url(base_url: &str, repo: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), repo)
}

fn unreachable(url: &str, e: reqwest::Error) -> Error {
    Error::Unreachable {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

fn check_status(url: &str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(Error::Transport {
        url: url.to_string(),
        status: status.as_u16(),
        body,
    })
}

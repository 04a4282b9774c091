//! Blocking HTTP client for a running hamfts server.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::api::types::{AddResponse, DocumentRequest, SearchRequest};
use crate::config::ClientConfig;
use crate::models::{CompactionReport, Document, IndexStats};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("invalid server URL: {0}")]
    InvalidUrl(String),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone)]
pub struct HamftsClient {
    base_url: String,
    http: Client,
}

impl HamftsClient {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/documents/{id}` with the id percent-encoded as a single segment
    fn document_url(&self, id: &str) -> ClientResult<Url> {
        let mut url = Url::parse(&self.url("/documents"))
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?
            .push(id);
        Ok(url)
    }

    pub fn search(&self, query: &str) -> ClientResult<Vec<Document>> {
        let resp = self
            .http
            .post(self.url("/search"))
            .json(&SearchRequest {
                query: query.to_string(),
            })
            .send()?;
        json_body(resp)
    }

    pub fn add_document(&self, request: &DocumentRequest) -> ClientResult<()> {
        let resp = self
            .http
            .post(self.url("/documents"))
            .json(request)
            .send()?;
        json_body::<AddResponse>(resp).map(|_| ())
    }

    pub fn add_documents(&self, requests: &[DocumentRequest]) -> ClientResult<usize> {
        let resp = self
            .http
            .post(self.url("/documents/batch"))
            .json(requests)
            .send()?;
        json_body::<AddResponse>(resp).map(|r| r.added)
    }

    pub fn list_documents(&self) -> ClientResult<Vec<String>> {
        let resp = self.http.get(self.url("/documents")).send()?;
        json_body(resp)
    }

    /// `Ok(None)` when the server has no document with this id
    pub fn get_document(&self, id: &str) -> ClientResult<Option<Document>> {
        let resp = self
            .http
            .get(self.document_url(id)?)
            .send()?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        json_body(resp).map(Some)
    }

    pub fn delete_document(&self, id: &str) -> ClientResult<()> {
        let resp = self
            .http
            .delete(self.document_url(id)?)
            .send()?;
        check_status(resp).map(|_| ())
    }

    pub fn stats(&self) -> ClientResult<IndexStats> {
        let resp = self.http.get(self.url("/stats")).send()?;
        json_body(resp)
    }

    pub fn compact(&self) -> ClientResult<CompactionReport> {
        let resp = self.http.post(self.url("/compact")).send()?;
        json_body(resp)
    }
}

fn check_status(resp: Response) -> ClientResult<Response> {
    let status = resp.status();
    tracing::debug!(url = %resp.url(), %status, "response received");
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(ClientError::Status { status, body })
}

fn json_body<T: DeserializeOwned>(resp: Response) -> ClientResult<T> {
    Ok(check_status(resp)?.json()?)
}

/// Parse a command-line metadata argument, which must be a JSON object
pub fn parse_metadata_arg(raw: &str) -> ClientResult<serde_json::Value> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| ClientError::InvalidMetadata(e.to_string()))?;
    if !value.is_object() {
        return Err(ClientError::InvalidMetadata(
            "metadata must be a JSON object".to_string(),
        ));
    }
    Ok(value)
}

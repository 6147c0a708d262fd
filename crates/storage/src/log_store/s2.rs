//! HTTP client for an S2 basin

use super::client::{LogClient, LogRecord};
use crate::backend::BackendKind;
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const READ_BATCH: usize = 1000;

/// Client for one S2 basin
#[derive(Debug, Clone)]
pub struct S2HttpClient {
    client: Client,
    base_url: Url,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ListStreamsResponse {
    #[serde(default)]
    streams: Vec<StreamInfo>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct StreamInfo {
    name: String,
    #[serde(default)]
    deleted_at: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ReadResponse {
    #[serde(default)]
    records: Vec<WireRecord>,
    #[serde(default)]
    batch: Option<ReadBatch>,
}

#[derive(Debug, Deserialize)]
struct ReadBatch {
    #[serde(default)]
    records: Vec<WireRecord>,
}

#[derive(Debug, Deserialize)]
struct WireRecord {
    seq_num: u64,
    #[serde(default)]
    body: String,
}

impl S2HttpClient {
    /// Create a client for `basin` at the public endpoint
    pub fn new(basin: &str, access_token: impl Into<String>) -> Result<Self> {
        Self::with_endpoint(&format!("https://{}.b.aws.s2.dev/v1", basin), access_token)
    }

    /// Create a client for a basin served at `endpoint`
    pub fn with_endpoint(endpoint: &str, access_token: impl Into<String>) -> Result<Self> {
        let trimmed = endpoint.trim_end_matches('/');
        let base_url = Url::parse(&format!("{}/", trimmed))
            .map_err(|e| protocol_error(format!("invalid endpoint {:?}: {}", endpoint, e)))?;
        Ok(Self {
            client: Client::new(),
            base_url,
            access_token: access_token.into(),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| protocol_error("endpoint cannot be a base URL"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn check(resp: Response) -> Result<Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        Err(protocol_error(format!("HTTP {}: {}", status.as_u16(), text)))
    }
}

fn protocol_error(message: impl Into<String>) -> StorageError {
    StorageError::backend(BackendKind::S2, message)
}

fn http_error(err: reqwest::Error) -> StorageError {
    protocol_error(err.to_string())
}

#[async_trait]
impl LogClient for S2HttpClient {
    async fn list_streams(&self, prefix: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut start_after = String::new();
        loop {
            let resp = self
                .client
                .get(self.url(&["streams"])?)
                .bearer_auth(&self.access_token)
                .query(&[("prefix", prefix), ("start_after", start_after.as_str())])
                .send()
                .await
                .map_err(http_error)?;
            let page: ListStreamsResponse = Self::check(resp)
                .await?
                .json()
                .await
                .map_err(http_error)?;

            let Some(last) = page.streams.last().map(|s| s.name.clone()) else {
                break;
            };
            names.extend(
                page.streams
                    .into_iter()
                    .filter(|s| s.deleted_at.as_ref().map_or(true, |v| v.is_null()))
                    .map(|s| s.name),
            );
            if !page.has_more {
                break;
            }
            start_after = last;
        }
        Ok(names)
    }

    async fn create_stream(&self, name: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.url(&["streams"])?)
            .bearer_auth(&self.access_token)
            .json(&json!({ "stream": name }))
            .send()
            .await
            .map_err(http_error)?;
        if resp.status() == StatusCode::CONFLICT {
            return Ok(());
        }
        Self::check(resp).await.map(|_| ())
    }

    async fn delete_stream(&self, name: &str) -> Result<()> {
        let resp = self
            .client
            .delete(self.url(&["streams", name])?)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(http_error)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(resp).await.map(|_| ())
    }

    async fn append(&self, name: &str, bodies: Vec<String>) -> Result<()> {
        let records: Vec<_> = bodies.iter().map(|b| json!({ "body": b })).collect();
        debug!(stream = name, records = records.len(), "s2 append");
        let resp = self
            .client
            .post(self.url(&["streams", name, "records"])?)
            .bearer_auth(&self.access_token)
            .header("s2-format", "raw")
            .json(&json!({ "records": records }))
            .send()
            .await
            .map_err(http_error)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(name.to_string()));
        }
        Self::check(resp).await.map(|_| ())
    }

    async fn read(&self, name: &str) -> Result<Option<Vec<LogRecord>>> {
        let mut records = Vec::new();
        let mut seq_num = 0u64;
        loop {
            let resp = self
                .client
                .get(self.url(&["streams", name, "records"])?)
                .bearer_auth(&self.access_token)
                .header("s2-format", "raw")
                .query(&[("seq_num", seq_num.to_string()), ("count", READ_BATCH.to_string())])
                .send()
                .await
                .map_err(http_error)?;
            match resp.status() {
                StatusCode::NOT_FOUND => return Ok(None),
                StatusCode::RANGE_NOT_SATISFIABLE => break,
                _ => {}
            }
            let page: ReadResponse = Self::check(resp)
                .await?
                .json()
                .await
                .map_err(http_error)?;
            let batch = match page.batch {
                Some(batch) => batch.records,
                None => page.records,
            };
            let Some(last) = batch.last().map(|r| r.seq_num) else {
                break;
            };
            let full = batch.len() >= READ_BATCH;
            records.extend(batch.into_iter().map(|r| LogRecord {
                seq_num: r.seq_num,
                body: r.body,
            }));
            if !full {
                break;
            }
            seq_num = last + 1;
        }
        Ok(Some(records))
    }
}

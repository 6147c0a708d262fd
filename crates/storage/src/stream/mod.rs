//! Redis stream backend
//!
//! Every file is a stream under `key_prefix + path`. Each entry carries one
//! field, `data`. Writing a file deletes the key and adds one entry;
//! appending adds an entry; reading joins the `data` values in stream order
//! with `\n`. Keys are listed with `SCAN`, so listing cost grows with the
//! keyspace.

mod client;
#[cfg(feature = "redis")]
mod redis;

pub use client::{MemoryStreamClient, StreamClient};
#[cfg(feature = "redis")]
pub use self::redis::RedisStreamClient;

use crate::backend::{BackendKind, Entry, Stat, StorageBackend};
use crate::error::Result;
use crate::keyspace::{
    dir_prefix, entries_from_keys, is_at_or_under, join_key, normalize_key, stat_from_keys,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Field holding file content in each stream entry
pub const DATA_FIELD: &str = "data";

/// Storage over keyed streams
#[derive(Debug, Clone)]
pub struct StreamBackend {
    client: Arc<dyn StreamClient>,
    key_prefix: String,
    max_len: Option<usize>,
}

impl StreamBackend {
    /// Create a backend over `client`
    pub fn new(client: Arc<dyn StreamClient>) -> Self {
        Self {
            client,
            key_prefix: String::new(),
            max_len: None,
        }
    }

    /// Backend over a fresh in-memory stream server
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStreamClient::new()))
    }

    /// Namespace every key under `prefix`
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Trim each stream to about `max_len` entries on append
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }

    fn key(&self, path: &str) -> String {
        format!("{}{}", self.key_prefix, normalize_key(path))
    }

    /// Paths of all keys under `prefix`, with the key prefix removed
    async fn paths(&self, prefix: &str) -> Result<Vec<String>> {
        let keys = self
            .client
            .keys(&format!("{}{}", self.key_prefix, prefix))
            .await?;
        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(&self.key_prefix).map(str::to_string))
            .collect())
    }
}

#[async_trait]
impl StorageBackend for StreamBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Redis
    }

    async fn list(&self, dir: &str) -> Result<Vec<Entry>> {
        let paths = self.paths(&dir_prefix(dir)).await?;
        Ok(entries_from_keys(dir, paths))
    }

    async fn stat(&self, path: &str) -> Result<Option<Stat>> {
        let paths = self.paths(&normalize_key(path)).await?;
        Ok(stat_from_keys(path, paths))
    }

    async fn read(&self, path: &str) -> Result<String> {
        let values = self.client.range(&self.key(path), DATA_FIELD).await?;
        Ok(values.join("\n"))
    }

    async fn write(&self, path: &str, content: &str) -> Result<()> {
        let key = self.key(path);
        debug!(key = %key, bytes = content.len(), "stream write");
        self.client.delete(&key).await?;
        self.client.add(&key, DATA_FIELD, content, None).await
    }

    fn supports_append(&self) -> bool {
        true
    }

    async fn append(&self, path: &str, content: &str) -> Result<()> {
        self.client
            .add(&self.key(path), DATA_FIELD, content, self.max_len)
            .await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let path = normalize_key(path);
        for found in self.paths(&path).await? {
            if is_at_or_under(&found, &path) {
                self.client.delete(&self.key(&found)).await?;
            }
        }
        Ok(())
    }

    fn join(&self, segments: &[&str]) -> String {
        join_key(segments)
    }

    async fn close(&self) -> Result<()> {
        self.client.close().await
    }
}

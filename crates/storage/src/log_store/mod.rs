//! Append-only log store backend
//!
//! Every file is a named log. Writing a file recreates its log with one
//! record; appending adds a record; reading concatenates record bodies in
//! sequence order separated by `\n`. Directories do not exist in the medium
//! and are synthesized from stream names (see [`crate::keyspace`]).
//!
//! Whole-file `write` is delete-then-create-then-append. A crash between the
//! delete and the append loses the file.

mod client;
#[cfg(feature = "s2")]
mod s2;

pub use client::{LogClient, LogRecord, MemoryLogClient};
#[cfg(feature = "s2")]
pub use s2::S2HttpClient;

use crate::backend::{BackendKind, Entry, Stat, StorageBackend};
use crate::error::Result;
use crate::keyspace::{
    dir_prefix, entries_from_keys, is_at_or_under, join_key, normalize_key, stat_from_keys,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage over an append-only log service
#[derive(Debug, Clone)]
pub struct LogStoreBackend {
    client: Arc<dyn LogClient>,
}

impl LogStoreBackend {
    /// Create a backend over `client`
    pub fn new(client: Arc<dyn LogClient>) -> Self {
        Self { client }
    }

    /// Backend over a fresh in-memory log service
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryLogClient::new()))
    }
}

#[async_trait]
impl StorageBackend for LogStoreBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::S2
    }

    async fn list(&self, dir: &str) -> Result<Vec<Entry>> {
        let names = self.client.list_streams(&dir_prefix(dir)).await?;
        Ok(entries_from_keys(dir, names))
    }

    async fn stat(&self, path: &str) -> Result<Option<Stat>> {
        let names = self.client.list_streams(&normalize_key(path)).await?;
        Ok(stat_from_keys(path, names))
    }

    async fn read(&self, path: &str) -> Result<String> {
        let name = normalize_key(path);
        let Some(mut records) = self.client.read(&name).await? else {
            return Ok(String::new());
        };
        records.sort_by_key(|r| r.seq_num);
        Ok(records
            .into_iter()
            .map(|r| r.body)
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn write(&self, path: &str, content: &str) -> Result<()> {
        let name = normalize_key(path);
        debug!(stream = %name, bytes = content.len(), "log store write");
        self.client.delete_stream(&name).await?;
        self.client.create_stream(&name).await?;
        self.client.append(&name, vec![content.to_string()]).await
    }

    fn supports_append(&self) -> bool {
        true
    }

    async fn append(&self, path: &str, content: &str) -> Result<()> {
        let name = normalize_key(path);
        match self.client.append(&name, vec![content.to_string()]).await {
            Err(e) if e.is_not_found() => {
                self.client.create_stream(&name).await?;
                self.client.append(&name, vec![content.to_string()]).await
            }
            other => other,
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let name = normalize_key(path);
        let names = self.client.list_streams(&name).await?;
        for stream in names.iter().filter(|n| is_at_or_under(n, &name)) {
            if let Err(e) = self.client.delete_stream(stream).await {
                warn!(stream = %stream, error = %e, "failed to delete stream");
                return Err(e);
            }
        }
        Ok(())
    }

    fn join(&self, segments: &[&str]) -> String {
        join_key(segments)
    }
}

//! Stream client seam and the in-memory client

use crate::backend::BackendKind;
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Minimal surface of a keyed stream server
#[async_trait]
pub trait StreamClient: Send + Sync + fmt::Debug {
    /// All stream keys starting with `prefix`
    async fn keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Add one entry holding `field = value`, creating the stream.
    ///
    /// With `max_len`, the stream is trimmed to roughly that many entries.
    async fn add(&self, key: &str, field: &str, value: &str, max_len: Option<usize>) -> Result<()>;

    /// Values of `field` across all entries, oldest first. Missing keys are empty.
    async fn range(&self, key: &str, field: &str) -> Result<Vec<String>>;

    /// Remove a stream. Missing keys are not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Drop the connection
    async fn close(&self) -> Result<()>;
}

type Fields = Vec<(String, String)>;

/// Stream server kept in process memory
///
/// Trimming with `max_len` is exact.
#[derive(Debug, Default)]
pub struct MemoryStreamClient {
    streams: DashMap<String, Vec<Fields>>,
    closed: AtomicBool,
}

impl MemoryStreamClient {
    /// Create an empty stream server
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in `key`
    pub fn entry_count(&self, key: &str) -> usize {
        self.streams.get(key).map_or(0, |s| s.len())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed(BackendKind::Redis));
        }
        Ok(())
    }
}

#[async_trait]
impl StreamClient for MemoryStreamClient {
    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        self.ensure_open()?;
        let mut keys: Vec<String> = self
            .streams
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn add(&self, key: &str, field: &str, value: &str, max_len: Option<usize>) -> Result<()> {
        self.ensure_open()?;
        let mut stream = self.streams.entry(key.to_string()).or_default();
        stream.push(vec![(field.to_string(), value.to_string())]);
        if let Some(max) = max_len {
            let excess = stream.len().saturating_sub(max);
            stream.drain(..excess);
        }
        Ok(())
    }

    async fn range(&self, key: &str, field: &str) -> Result<Vec<String>> {
        self.ensure_open()?;
        let Some(stream) = self.streams.get(key) else {
            return Ok(Vec::new());
        };
        Ok(stream
            .iter()
            .filter_map(|fields| {
                fields
                    .iter()
                    .find(|(name, _)| name == field)
                    .map(|(_, value)| value.clone())
            })
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.ensure_open()?;
        self.streams.remove(key);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

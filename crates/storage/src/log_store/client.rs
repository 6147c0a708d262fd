//! Log client seam and the in-memory client

use crate::error::{Result, StorageError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;

/// One record of a named log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Position in the log, strictly increasing
    pub seq_num: u64,
    /// Record body
    pub body: String,
}

/// Minimal surface of an append-only log service
#[async_trait]
pub trait LogClient: Send + Sync + fmt::Debug {
    /// Names of live streams starting with `prefix`
    async fn list_streams(&self, prefix: &str) -> Result<Vec<String>>;

    /// Create a stream. Creating an existing stream is not an error.
    async fn create_stream(&self, name: &str) -> Result<()>;

    /// Delete a stream. Deleting a missing stream is not an error.
    async fn delete_stream(&self, name: &str) -> Result<()>;

    /// Append records in order. Fails with `NotFound` if the stream is missing.
    async fn append(&self, name: &str, bodies: Vec<String>) -> Result<()>;

    /// All records of a stream, or `None` if it does not exist
    async fn read(&self, name: &str) -> Result<Option<Vec<LogRecord>>>;
}

#[derive(Debug, Default)]
struct MemoryStream {
    next_seq: u64,
    records: Vec<LogRecord>,
}

/// Log service kept in process memory
#[derive(Debug, Default)]
pub struct MemoryLogClient {
    streams: Mutex<BTreeMap<String, MemoryStream>>,
}

impl MemoryLogClient {
    /// Create an empty log service
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live streams
    pub fn stream_count(&self) -> usize {
        self.streams.lock().len()
    }
}

#[async_trait]
impl LogClient for MemoryLogClient {
    async fn list_streams(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .streams
            .lock()
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn create_stream(&self, name: &str) -> Result<()> {
        self.streams.lock().entry(name.to_string()).or_default();
        Ok(())
    }

    async fn delete_stream(&self, name: &str) -> Result<()> {
        self.streams.lock().remove(name);
        Ok(())
    }

    async fn append(&self, name: &str, bodies: Vec<String>) -> Result<()> {
        let mut streams = self.streams.lock();
        let stream = streams
            .get_mut(name)
            .ok_or_else(|| StorageError::NotFound(name.to_string()))?;
        for body in bodies {
            let seq_num = stream.next_seq;
            stream.next_seq += 1;
            stream.records.push(LogRecord { seq_num, body });
        }
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Option<Vec<LogRecord>>> {
        Ok(self.streams.lock().get(name).map(|s| s.records.clone()))
    }
}

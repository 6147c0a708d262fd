//! The storage contract
//!
//! Every medium implements [`StorageBackend`]. The contract is deliberately
//! small: it is the intersection of what a filesystem, an append-only log
//! service and a Redis stream can all express.
//!
//! ## Absence
//!
//! - `stat` returns `None` for a missing path on every backend.
//! - `list` returns an empty list for a missing directory on every backend.
//! - `read` of a missing path is a [`StorageError::NotFound`] on the local
//!   backend and the empty string on log/stream backends. Callers that expect
//!   absence `stat` first.
//!
//! [`StorageError::NotFound`]: crate::StorageError::NotFound

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage medium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Local filesystem
    Local,
    /// Append-only log store (S2-style)
    S2,
    /// Redis streams
    Redis,
}

impl BackendKind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::S2 => "s2",
            BackendKind::Redis => "redis",
        }
    }

    /// True if paths are logical keys with no filesystem meaning
    pub fn is_keyed(&self) -> bool {
        !matches!(self, BackendKind::Local)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "fs" | "filesystem" => Ok(BackendKind::Local),
            "s2" => Ok(BackendKind::S2),
            "redis" => Ok(BackendKind::Redis),
            other => Err(format!(
                "unknown storage backend {:?} (expected local, s2 or redis)",
                other
            )),
        }
    }
}

/// One entry returned by [`StorageBackend::list`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entry {
    /// Last path segment
    pub id: String,
    /// Full backend path (usable with every other operation)
    pub path: String,
    /// True for directories and synthesized key prefixes
    pub is_directory: bool,
}

impl Entry {
    /// Create a file entry
    pub fn file(id: impl Into<String>, path: impl Into<String>) -> Self {
        Entry {
            id: id.into(),
            path: path.into(),
            is_directory: false,
        }
    }

    /// Create a directory entry
    pub fn directory(id: impl Into<String>, path: impl Into<String>) -> Self {
        Entry {
            id: id.into(),
            path: path.into(),
            is_directory: true,
        }
    }
}

/// Result of [`StorageBackend::stat`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    /// True for directories and key prefixes
    pub is_directory: bool,
}

/// Capability contract implemented by every storage medium
///
/// Implementations hold no locks across calls; concurrent writers to the same
/// path race and the last `write` wins.
#[async_trait]
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Which medium this is
    fn kind(&self) -> BackendKind;

    /// List the direct children of `dir`. Missing directories are empty.
    async fn list(&self, dir: &str) -> Result<Vec<Entry>>;

    /// Describe `path`, or `None` if nothing exists there.
    async fn stat(&self, path: &str) -> Result<Option<Stat>>;

    /// Read the full textual contents of `path`.
    async fn read(&self, path: &str) -> Result<String>;

    /// Overwrite `path` with `content`, creating parent structure.
    async fn write(&self, path: &str, content: &str) -> Result<()>;

    /// Whether `append` is a native operation of the medium
    fn supports_append(&self) -> bool {
        false
    }

    /// Extend `path` with `content`.
    ///
    /// The default emulates append with read-modify-write, so it is not atomic.
    async fn append(&self, path: &str, content: &str) -> Result<()> {
        let existing = match self.stat(path).await? {
            Some(stat) if !stat.is_directory => self.read(path).await?,
            _ => String::new(),
        };
        let mut combined = existing;
        combined.push_str(content);
        self.write(path, &combined).await
    }

    /// Remove `path`. Directories and key prefixes are removed recursively;
    /// deleting a missing path is not an error.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Build a path from segments
    fn join(&self, segments: &[&str]) -> String;

    /// Release live resources. Later calls may fail with `Closed`.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

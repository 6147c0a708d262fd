//! Local filesystem backend
//!
//! Paths are real filesystem paths; the backend holds no state and no open
//! handles between calls. `append` uses the contract's read-modify-write
//! default since no atomic append primitive is assumed.

use crate::backend::{BackendKind, Entry, Stat, StorageBackend};
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Filesystem-backed storage
#[derive(Debug, Clone, Default)]
pub struct LocalBackend;

impl LocalBackend {
    /// Create a local backend
    pub fn new() -> Self {
        LocalBackend
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn list(&self, dir: &str) -> Result<Vec<Entry>> {
        let mut reader = match fs::read_dir(dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(dir, e)),
        };

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| StorageError::io(dir, e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| StorageError::io(dir, e))?;
            entries.push(Entry {
                id: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path().to_string_lossy().into_owned(),
                is_directory: file_type.is_dir(),
            });
        }
        entries.sort();
        Ok(entries)
    }

    async fn stat(&self, path: &str) -> Result<Option<Stat>> {
        match fs::metadata(path).await {
            Ok(meta) => Ok(Some(Stat {
                is_directory: meta.is_dir(),
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    async fn read(&self, path: &str) -> Result<String> {
        fs::read_to_string(path)
            .await
            .map_err(|e| StorageError::io(path, e))
    }

    async fn write(&self, path: &str, content: &str) -> Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StorageError::io(parent.to_string_lossy(), e))?;
            }
        }
        debug!(path, bytes = content.len(), "local write");
        fs::write(path, content)
            .await
            .map_err(|e| StorageError::io(path, e))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let result = match self.stat(path).await? {
            None => return Ok(()),
            Some(stat) if stat.is_directory => fs::remove_dir_all(path).await,
            Some(_) => fs::remove_file(path).await,
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    fn join(&self, segments: &[&str]) -> String {
        segments
            .iter()
            .filter(|s| !s.is_empty())
            .collect::<PathBuf>()
            .to_string_lossy()
            .into_owned()
    }
}

//! Storage error types

use crate::backend::BackendKind;
use thiserror::Error;

/// Errors raised by storage backends
#[derive(Debug, Error)]
pub enum StorageError {
    /// Path does not exist (local `read`)
    #[error("not found: {0}")]
    NotFound(String),

    /// Filesystem error
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being accessed
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Remote backend rejected or failed a request
    #[error("{backend} backend error: {message}")]
    Backend {
        /// Backend that failed
        backend: BackendKind,
        /// Error description
        message: String,
    },

    /// Backend selected without the settings it needs
    #[error("misconfigured {backend} backend: {message}")]
    Misconfigured {
        /// Backend being configured
        backend: BackendKind,
        /// What is missing or invalid
        message: String,
    },

    /// Backend client was not compiled in
    #[error("{backend} backend is unavailable: {hint}")]
    BackendUnavailable {
        /// Backend that was selected
        backend: BackendKind,
        /// How to enable it
        hint: String,
    },

    /// Backend was used after `close()`
    #[error("{0} backend is closed")]
    Closed(BackendKind),
}

impl StorageError {
    /// Build an I/O error for a path, mapping `NotFound` to [`StorageError::NotFound`]
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(path)
        } else {
            StorageError::Io { path, source }
        }
    }

    /// Build a remote backend error
    pub fn backend(backend: BackendKind, message: impl Into<String>) -> Self {
        StorageError::Backend {
            backend,
            message: message.into(),
        }
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

//! Unified error type for Tally.
//!
//! Wraps the storage, codec, id and configuration errors of the member
//! crates and adds the store-level failures (missing documents, run kind
//! mismatches).

use crate::config::ConfigError;
use crate::run::RunKind;
use tally_core::IdError;
use tally_storage::StorageError;
use tally_wire::CodecError;
use thiserror::Error;

/// All Tally errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Document or run does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Document could not be decoded, encoded or validated
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Invalid conversation or run identifier
    #[error(transparent)]
    Id(#[from] IdError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A run with this id already exists
    #[error("run {run_id} already exists ({kind} run)")]
    RunExists {
        /// Conflicting run id
        run_id: String,
        /// Kind of the existing run
        kind: RunKind,
    },

    /// Payload or accessor does not match the run's kind
    #[error("run {run_id} is a {actual} run, not a {expected} run")]
    RunKindMismatch {
        /// Run being accessed
        run_id: String,
        /// Kind the caller asked for
        expected: RunKind,
        /// Kind of the run
        actual: RunKind,
    },

    /// Document id disagrees with the handle it is saved through
    #[error("{kind} id mismatch: handle is {expected:?}, document has {actual:?}")]
    IdMismatch {
        /// What kind of id disagreed
        kind: &'static str,
        /// Id of the handle
        expected: String,
        /// Id inside the document
        actual: String,
    },

    /// Stored metadata could not be parsed
    #[error("invalid {path}: {message}")]
    Corrupt {
        /// Path of the document
        path: String,
        /// Parser message
        message: String,
    },
}

/// Result type for Tally operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this is a not-found error, at any layer.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Storage(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error came from document validation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::Codec(CodecError::Validation(_)) | Error::Codec(CodecError::NoValidSteps { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_across_layers() {
        assert!(Error::NotFound("x".into()).is_not_found());
        assert!(Error::from(StorageError::NotFound("/tmp/x".into())).is_not_found());
        assert!(!Error::from(CodecError::NoValidSteps { skipped: 1 }).is_not_found());
    }

    #[test]
    fn test_kind_mismatch_message() {
        let err = Error::RunKindMismatch {
            run_id: "run-1-abcdefg".into(),
            expected: RunKind::Tally,
            actual: RunKind::Trajectory,
        };
        assert_eq!(
            err.to_string(),
            "run run-1-abcdefg is a trajectory run, not a tally run"
        );
    }

    #[test]
    fn test_codec_errors_pass_through() {
        let err = Error::from(CodecError::Empty {
            document: "conversation",
        });
        assert!(err.to_string().contains("empty"));
        assert!(!err.is_validation());
    }
}

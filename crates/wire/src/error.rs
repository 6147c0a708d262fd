//! Codec errors

use crate::validate::ValidationError;
use thiserror::Error;

/// Errors raised while decoding or encoding a document
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CodecError {
    /// Input was empty or whitespace only
    #[error("cannot decode empty {document} document")]
    Empty {
        /// Document kind being decoded
        document: &'static str,
    },

    /// Input was not valid JSON
    #[error("{}", json_message(.line, .message))]
    Json {
        /// 1-based line number for line-oriented formats
        line: Option<usize>,
        /// Parser message
        message: String,
    },

    /// Document parsed but failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Every line of a conversation was skipped
    #[error("conversation has no valid steps ({skipped} line(s) skipped)")]
    NoValidSteps {
        /// Number of lines that were skipped
        skipped: usize,
    },
}

fn json_message(line: &Option<usize>, message: &str) -> String {
    match line {
        Some(line) => format!("invalid JSON on line {}: {}", line, message),
        None => format!("invalid JSON: {}", message),
    }
}

impl CodecError {
    /// Build a JSON error for a whole document
    pub fn json(err: serde_json::Error) -> Self {
        CodecError::Json {
            line: None,
            message: err.to_string(),
        }
    }

    /// Build a JSON error for one line of a line-oriented document
    pub fn json_at(line: usize, err: serde_json::Error) -> Self {
        CodecError::Json {
            line: Some(line),
            message: err.to_string(),
        }
    }

    /// Check if the input was empty
    pub fn is_empty_input(&self) -> bool {
        matches!(self, CodecError::Empty { .. })
    }
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ValidationIssue;

    #[test]
    fn test_empty_message() {
        let err = CodecError::Empty {
            document: "conversation",
        };
        assert_eq!(err.to_string(), "cannot decode empty conversation document");
        assert!(err.is_empty_input());
    }

    #[test]
    fn test_json_error_carries_line() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = CodecError::json_at(3, parse);
        assert!(err.to_string().starts_with("invalid JSON on line 3:"));
    }

    #[test]
    fn test_validation_is_transparent() {
        let err: CodecError = ValidationError::new(
            "run artifact",
            vec![ValidationIssue::new("$.schemaVersion", "must be 1")],
        )
        .into();
        assert_eq!(
            err.to_string(),
            "invalid run artifact: $.schemaVersion: must be 1"
        );
    }
}

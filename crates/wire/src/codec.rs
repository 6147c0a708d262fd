//! The codec contract shared by every document format

use crate::error::{CodecError, Result};
use crate::validate::ValidationError;
use serde::Serialize;

/// What to do with a record that parses as JSON but fails its schema
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Log the record and keep decoding
    #[default]
    SkipInvalidRecords,
    /// Fail the whole document
    RejectDocument,
}

/// A record dropped during a lenient decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number
    pub line: usize,
    /// Why the line was dropped
    pub reason: String,
}

/// Decoded value plus everything that was dropped on the way
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeReport<T> {
    /// Decoded value
    pub value: T,
    /// Records skipped under [`DecodePolicy::SkipInvalidRecords`]
    pub skipped: Vec<SkippedLine>,
}

impl<T> DecodeReport<T> {
    /// Report for a decode that dropped nothing
    pub fn clean(value: T) -> Self {
        DecodeReport {
            value,
            skipped: Vec::new(),
        }
    }

    /// True if nothing was skipped
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Text format for one document type
pub trait Codec {
    /// In-memory document
    type Value;

    /// Document name used in errors
    const DOCUMENT: &'static str;

    /// How schema-invalid records are treated
    fn policy(&self) -> DecodePolicy {
        DecodePolicy::RejectDocument
    }

    /// Parse text into a validated document
    fn decode(&self, input: &str) -> Result<Self::Value>;

    /// Validate then render a document
    fn encode(&self, value: &Self::Value) -> Result<String>;

    /// Check a document without rendering it
    fn validate(&self, value: &Self::Value) -> std::result::Result<(), ValidationError>;

    /// Decode and report dropped records
    fn decode_report(&self, input: &str) -> Result<DecodeReport<Self::Value>> {
        self.decode(input).map(DecodeReport::clean)
    }
}

/// Reject empty or whitespace-only input
pub(crate) fn non_empty<'a>(input: &'a str, document: &'static str) -> Result<&'a str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CodecError::Empty { document });
    }
    Ok(trimmed)
}

/// Pretty-print a whole JSON document with a trailing newline
pub(crate) fn to_document<T: Serialize>(value: &T) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value).map_err(CodecError::json)?;
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert!(non_empty("", "x").unwrap_err().is_empty_input());
        assert!(non_empty(" \n\t ", "x").unwrap_err().is_empty_input());
        assert_eq!(non_empty(" {} ", "x").unwrap(), "{}");
    }

    #[test]
    fn test_default_policy_skips() {
        assert_eq!(DecodePolicy::default(), DecodePolicy::SkipInvalidRecords);
    }
}

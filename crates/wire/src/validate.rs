//! Validation issues
//!
//! Validators never stop at the first problem. Every issue is collected with
//! the JSON path it was found at, and the whole list is reported as one
//! [`ValidationError`].

use std::fmt;
use thiserror::Error;

/// One problem found in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// JSON path of the offending value (`$.result.stepCount`)
    pub path: String,
    /// What is wrong
    pub message: String,
}

impl ValidationIssue {
    /// Create an issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every issue found while validating one document
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid {document}: {}", join_issues(.issues))]
pub struct ValidationError {
    /// Document kind
    pub document: &'static str,
    /// Issues in discovery order
    pub issues: Vec<ValidationIssue>,
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// Create an error from collected issues
    pub fn new(document: &'static str, issues: Vec<ValidationIssue>) -> Self {
        ValidationError { document, issues }
    }

    /// True if any issue was reported at or below `path`
    pub fn has_issue_at(&self, path: &str) -> bool {
        self.issues.iter().any(|i| i.path.starts_with(path))
    }
}

/// Issue collector used by the validators
#[derive(Debug)]
pub(crate) struct Issues {
    document: &'static str,
    issues: Vec<ValidationIssue>,
}

impl Issues {
    pub(crate) fn new(document: &'static str) -> Self {
        Issues {
            document,
            issues: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue::new(path, message));
    }

    /// Record an issue when `ok` is false
    pub(crate) fn check(&mut self, ok: bool, path: impl Into<String>, message: impl Into<String>) {
        if !ok {
            self.push(path, message);
        }
    }

    /// Check that an optional value lies in `[0, 1]`
    pub(crate) fn unit_interval(&mut self, value: Option<f64>, path: impl Into<String>) {
        if let Some(v) = value {
            self.check(
                v.is_finite() && (0.0..=1.0).contains(&v),
                path,
                format!("must be within [0, 1], got {}", v),
            );
        }
    }

    pub(crate) fn finish(self) -> Result<(), ValidationError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(self.document, self.issues))
        }
    }
}

/// Append a key to a JSON path
pub(crate) fn key_path(base: &str, key: &str) -> String {
    if !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        format!("{}.{}", base, key)
    } else {
        format!("{}[{:?}]", base, key)
    }
}

/// Append an index to a JSON path
pub(crate) fn index_path(base: &str, index: usize) -> String {
    format!("{}[{}]", base, index)
}

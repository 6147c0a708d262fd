//! Identifier generation
//!
//! Run ids embed their creation time so run order can be recovered from a
//! directory listing without opening any file:
//!
//! ```text
//! run-1718035200123-k3x9a0b
//!     └── epoch ms ─┘ └ base36 ┘
//! ```
//!
//! Explicit ids supplied by callers are accepted as long as they are usable as
//! a single path segment; they simply have no recoverable timestamp.

use chrono::{DateTime, TimeZone, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const RUN_ID_PREFIX: &str = "run-";
const RUN_ID_SUFFIX_LEN: usize = 7;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Identifier errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdError {
    /// Identifier is empty
    #[error("{kind} id must not be empty")]
    Empty {
        /// What kind of identifier was rejected
        kind: &'static str,
    },

    /// Identifier cannot be used as one path segment
    #[error("{kind} id {id:?} is not a valid path segment: {reason}")]
    InvalidSegment {
        /// What kind of identifier was rejected
        kind: &'static str,
        /// The rejected identifier
        id: String,
        /// Why it was rejected
        reason: &'static str,
    },
}

/// Check that `id` can be used as a single directory or key segment.
///
/// Separators and the relative components `.`/`..` are rejected on every
/// backend, even those where `/` has no filesystem meaning, so a layout is
/// portable between backends.
pub fn validate_path_segment(kind: &'static str, id: &str) -> Result<(), IdError> {
    if id.is_empty() {
        return Err(IdError::Empty { kind });
    }
    let reason = if id.contains('/') || id.contains('\\') {
        Some("contains a path separator")
    } else if id == "." || id == ".." {
        Some("is a relative path component")
    } else if id.chars().any(char::is_control) {
        Some("contains control characters")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(IdError::InvalidSegment {
            kind,
            id: id.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Generate a fresh conversation id (`conv-<uuid>`).
pub fn generate_conversation_id() -> String {
    format!("conv-{}", Uuid::new_v4().simple())
}

/// Identifier of one run of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunId(String);

impl RunId {
    /// Wrap an explicit id after checking it is a valid path segment.
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        validate_path_segment("run", &id)?;
        Ok(RunId(id))
    }

    /// Generate a new id stamped with the current time.
    pub fn generate() -> Self {
        Self::generate_at(Utc::now(), &mut rand::thread_rng())
    }

    /// Generate an id for a given creation time and random source.
    pub fn generate_at<R: Rng + ?Sized>(created_at: DateTime<Utc>, rng: &mut R) -> Self {
        let suffix: String = (0..RUN_ID_SUFFIX_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        RunId(format!(
            "{}{}-{}",
            RUN_ID_PREFIX,
            created_at.timestamp_millis(),
            suffix
        ))
    }

    /// Parse an id that must have the generated `run-<millis>-<suffix>` shape.
    pub fn parse(id: &str) -> Result<Self, IdError> {
        let run_id = Self::new(id)?;
        let suffix_ok = run_id
            .0
            .strip_prefix(RUN_ID_PREFIX)
            .and_then(|rest| rest.split_once('-'))
            .map(|(_, suffix)| {
                suffix.len() == RUN_ID_SUFFIX_LEN && suffix.bytes().all(|b| BASE36.contains(&b))
            })
            .unwrap_or(false);
        if run_id.timestamp_millis().is_none() || !suffix_ok {
            return Err(IdError::InvalidSegment {
                kind: "run",
                id: id.to_string(),
                reason: "is not a generated run id",
            });
        }
        Ok(run_id)
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creation time in epoch milliseconds, if the id carries one.
    pub fn timestamp_millis(&self) -> Option<i64> {
        let rest = self.0.strip_prefix(RUN_ID_PREFIX)?;
        let (millis, suffix) = rest.split_once('-')?;
        if millis.is_empty() || suffix.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        millis.parse().ok()
    }

    /// Creation time recovered from the id.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp_millis()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Orders by creation time; ids without a timestamp sort last, then by text.
impl Ord for RunId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let key = |id: &RunId| {
            let millis = id.timestamp_millis();
            (millis.is_none(), millis)
        };
        key(self)
            .cmp(&key(other))
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for RunId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl AsRef<str> for RunId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RunId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RunId::new(value)
    }
}

impl std::str::FromStr for RunId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RunId::new(s)
    }
}

impl From<RunId> for String {
    fn from(id: RunId) -> Self {
        id.0
    }
}

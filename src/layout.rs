//! Storage layout
//!
//! ```text
//! <base>/conversations/<conversationId>/
//!     meta.json
//!     conversation.jsonl
//!     trajectory.meta.json
//!     stepTraces.json
//!     runs/
//!         tally/<runId>.json
//!         trajectory/<runId>.json
//! ```
//!
//! Every path is built through the backend's `join`, so the same layout is
//! a directory tree on disk and a key namespace on log and stream media.

use crate::run::RunKind;
use std::path::Path;
use std::sync::Arc;
use tally_core::RunId;
use tally_storage::{BackendKind, StorageBackend};

/// Directory holding every conversation
pub const CONVERSATIONS_DIR: &str = "conversations";
/// Conversation metadata document
pub const META_FILE: &str = "meta.json";
/// Conversation steps, one JSON line each
pub const CONVERSATION_FILE: &str = "conversation.jsonl";
/// Trajectory generation snapshot
pub const TRAJECTORY_META_FILE: &str = "trajectory.meta.json";
/// Per-turn trajectory traces
pub const STEP_TRACES_FILE: &str = "stepTraces.json";
/// Directory holding runs, one subdirectory per kind
pub const RUNS_DIR: &str = "runs";
/// Extension of run documents
pub const RUN_FILE_EXTENSION: &str = ".json";

/// Resolve the configured base path for a backend.
///
/// Local relative paths are joined onto `working_dir`; keyed backends take
/// the path verbatim as a key prefix.
pub fn resolve_base(kind: BackendKind, path: &str, working_dir: Option<&Path>) -> String {
    if kind.is_keyed() {
        return path.to_string();
    }
    let path = Path::new(path);
    match working_dir {
        Some(dir) if path.is_relative() => dir.join(path).to_string_lossy().into_owned(),
        _ => path.to_string_lossy().into_owned(),
    }
}

/// Path builder bound to one backend and base
#[derive(Debug, Clone)]
pub struct Layout {
    backend: Arc<dyn StorageBackend>,
    base: String,
}

impl Layout {
    /// Create a layout rooted at `base`
    pub fn new(backend: Arc<dyn StorageBackend>, base: impl Into<String>) -> Self {
        Layout {
            backend,
            base: base.into(),
        }
    }

    /// Root of the layout
    pub fn base(&self) -> &str {
        &self.base
    }

    /// `<base>/conversations`
    pub fn conversations_dir(&self) -> String {
        self.backend.join(&[self.base.as_str(), CONVERSATIONS_DIR])
    }

    /// `<base>/conversations/<id>`
    pub fn conversation_dir(&self, conversation_id: &str) -> String {
        self.backend
            .join(&[self.base.as_str(), CONVERSATIONS_DIR, conversation_id])
    }

    /// A document directly inside a conversation directory
    pub fn conversation_file(&self, conversation_id: &str, file: &str) -> String {
        self.backend
            .join(&[self.base.as_str(), CONVERSATIONS_DIR, conversation_id, file])
    }

    /// `<base>/conversations/<id>/runs/<kind>`
    pub fn runs_dir(&self, conversation_id: &str, kind: RunKind) -> String {
        self.backend.join(&[
            self.base.as_str(),
            CONVERSATIONS_DIR,
            conversation_id,
            RUNS_DIR,
            kind.dir_name(),
        ])
    }

    /// `<base>/conversations/<id>/runs/<kind>/<runId>.json`
    pub fn run_file(&self, conversation_id: &str, kind: RunKind, run_id: &RunId) -> String {
        let file = format!("{}{}", run_id, RUN_FILE_EXTENSION);
        self.backend.join(&[
            self.base.as_str(),
            CONVERSATIONS_DIR,
            conversation_id,
            RUNS_DIR,
            kind.dir_name(),
            file.as_str(),
        ])
    }
}

//! Conversation handles
//!
//! A [`ConversationHandle`] addresses one `conversations/<id>/` directory and
//! every document inside it: the step log, its metadata, the trajectory
//! snapshot and traces, and the runs.

use crate::error::{Error, Result};
use crate::layout::{
    Layout, CONVERSATION_FILE, META_FILE, RUN_FILE_EXTENSION, STEP_TRACES_FILE,
    TRAJECTORY_META_FILE,
};
use crate::run::{RunHandle, RunKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tally_core::{Conversation, ConversationStep, RunId, StepTrace, TrajectoryMeta};
use tally_storage::StorageBackend;
use tally_wire::{Codec, ConversationCodec, StepTracesCodec, TrajectoryMetaCodec};
use tracing::{debug, warn};

/// Contents of `meta.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMeta {
    /// Conversation id
    pub id: String,
    /// When the conversation directory was created
    pub created_at: DateTime<Utc>,
    /// Last time the step log was written through a handle
    pub updated_at: DateTime<Utc>,
}

impl ConversationMeta {
    /// Fresh metadata stamped with `at`
    pub fn new(id: impl Into<String>, at: DateTime<Utc>) -> Self {
        ConversationMeta {
            id: id.into(),
            created_at: at,
            updated_at: at,
        }
    }
}

/// Handle on one conversation directory
#[derive(Debug, Clone)]
pub struct ConversationHandle {
    backend: Arc<dyn StorageBackend>,
    layout: Layout,
    id: String,
}

impl ConversationHandle {
    pub(crate) fn new(backend: Arc<dyn StorageBackend>, layout: Layout, id: String) -> Self {
        ConversationHandle {
            backend,
            layout,
            id,
        }
    }

    /// Conversation id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Backend path of the conversation directory
    pub fn path(&self) -> String {
        self.layout.conversation_dir(&self.id)
    }

    fn file(&self, name: &str) -> String {
        self.layout.conversation_file(&self.id, name)
    }

    async fn is_file(&self, path: &str) -> Result<bool> {
        Ok(matches!(
            self.backend.stat(path).await?,
            Some(stat) if !stat.is_directory
        ))
    }

    /// True if the conversation directory holds anything
    pub async fn exists(&self) -> Result<bool> {
        Ok(self.backend.stat(&self.path()).await?.is_some())
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Read `meta.json`, if present
    pub async fn meta(&self) -> Result<Option<ConversationMeta>> {
        let path = self.file(META_FILE);
        if !self.is_file(&path).await? {
            return Ok(None);
        }
        let text = self.backend.read(&path).await?;
        serde_json::from_str(&text).map(Some).map_err(|e| Error::Corrupt {
            path,
            message: e.to_string(),
        })
    }

    async fn write_meta(&self, meta: &ConversationMeta) -> Result<()> {
        let text = serde_json::to_string_pretty(meta).map_err(|e| Error::Corrupt {
            path: self.file(META_FILE),
            message: e.to_string(),
        })?;
        self.backend.write(&self.file(META_FILE), &text).await?;
        Ok(())
    }

    /// Rewrite `meta.json` with `updatedAt` set to now.
    ///
    /// `createdAt` survives from an existing stamp that still parses.
    pub(crate) async fn stamp_meta(&self) -> Result<ConversationMeta> {
        let now = Utc::now();
        let meta = match self.meta().await {
            Ok(Some(mut meta)) => {
                meta.updated_at = now;
                meta
            }
            Ok(None) | Err(Error::Corrupt { .. }) => ConversationMeta::new(&self.id, now),
            Err(e) => return Err(e),
        };
        self.write_meta(&meta).await?;
        Ok(meta)
    }

    // =========================================================================
    // Steps
    // =========================================================================

    /// Read and decode `conversation.jsonl`
    pub async fn load(&self) -> Result<Conversation> {
        let path = self.file(CONVERSATION_FILE);
        if !self.is_file(&path).await? {
            return Err(Error::NotFound(format!("conversation {}", self.id)));
        }
        let text = self.backend.read(&path).await?;
        Ok(ConversationCodec::new().decode(&text)?)
    }

    /// Encode and overwrite `conversation.jsonl`
    pub async fn save(&self, conversation: &Conversation) -> Result<()> {
        if conversation.id != self.id {
            return Err(Error::IdMismatch {
                kind: "conversation",
                expected: self.id.clone(),
                actual: conversation.id.clone(),
            });
        }
        let text = ConversationCodec::new().encode(conversation)?;
        debug!(
            conversation = %self.id,
            steps = conversation.steps.len(),
            "saving conversation"
        );
        self.backend
            .write(&self.file(CONVERSATION_FILE), &text)
            .await?;
        self.stamp_meta().await?;
        Ok(())
    }

    /// Append one step line to `conversation.jsonl`
    pub async fn append_step(&self, step: &ConversationStep) -> Result<()> {
        let line = ConversationCodec::new().encode_line(&self.id, step, None)?;
        debug!(conversation = %self.id, step = step.step_index, "appending step");
        self.backend
            .append(&self.file(CONVERSATION_FILE), &line)
            .await?;
        self.stamp_meta().await?;
        Ok(())
    }

    // =========================================================================
    // Trajectory documents
    // =========================================================================

    /// Read `trajectory.meta.json`, if present
    pub async fn load_trajectory_meta(&self) -> Result<Option<TrajectoryMeta>> {
        let path = self.file(TRAJECTORY_META_FILE);
        if !self.is_file(&path).await? {
            return Ok(None);
        }
        let text = self.backend.read(&path).await?;
        Ok(Some(TrajectoryMetaCodec::new().decode(&text)?))
    }

    /// Write `trajectory.meta.json`
    pub async fn save_trajectory_meta(&self, meta: &TrajectoryMeta) -> Result<()> {
        let text = TrajectoryMetaCodec::new().encode(meta)?;
        self.backend
            .write(&self.file(TRAJECTORY_META_FILE), &text)
            .await?;
        Ok(())
    }

    /// Read `stepTraces.json`, if present
    pub async fn load_step_traces(&self) -> Result<Option<Vec<StepTrace>>> {
        let path = self.file(STEP_TRACES_FILE);
        if !self.is_file(&path).await? {
            return Ok(None);
        }
        let text = self.backend.read(&path).await?;
        Ok(Some(StepTracesCodec::new().decode(&text)?))
    }

    /// Write `stepTraces.json`
    pub async fn save_step_traces(&self, traces: &[StepTrace]) -> Result<()> {
        let text = StepTracesCodec::new().encode(&traces.to_vec())?;
        self.backend
            .write(&self.file(STEP_TRACES_FILE), &text)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Runs
    // =========================================================================

    fn run_handle(&self, id: RunId, kind: RunKind) -> RunHandle {
        let path = self.layout.run_file(&self.id, kind, &id);
        RunHandle::new(Arc::clone(&self.backend), self.id.clone(), id, kind, path)
    }

    /// Every run of both kinds, oldest first
    ///
    /// Runs whose id carries no timestamp sort last, by id.
    pub async fn list_runs(&self) -> Result<Vec<RunHandle>> {
        let mut runs = Vec::new();
        for kind in RunKind::ALL {
            let dir = self.layout.runs_dir(&self.id, kind);
            for entry in self.backend.list(&dir).await? {
                if entry.is_directory {
                    continue;
                }
                let Some(stem) = entry.id.strip_suffix(RUN_FILE_EXTENSION) else {
                    continue;
                };
                match RunId::new(stem) {
                    Ok(id) => runs.push(self.run_handle(id, kind)),
                    Err(e) => warn!(path = %entry.path, error = %e, "skipping run with invalid id"),
                }
            }
        }
        runs.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(runs)
    }

    /// Handle for a new run
    ///
    /// Generates an id when none is given. Nothing is written until the
    /// handle saves a payload.
    pub async fn create_run(&self, kind: RunKind, id: Option<RunId>) -> Result<RunHandle> {
        let id = id.unwrap_or_else(RunId::generate);
        for existing in RunKind::ALL {
            let candidate = self.run_handle(id.clone(), existing);
            if candidate.exists().await? {
                return Err(Error::RunExists {
                    run_id: id.to_string(),
                    kind: existing,
                });
            }
        }
        debug!(conversation = %self.id, run = %id, kind = %kind, "creating run");
        Ok(self.run_handle(id, kind))
    }

    /// Open an existing run, inferring its kind from where it is stored
    pub async fn open_run(&self, id: &RunId) -> Result<RunHandle> {
        for kind in RunKind::ALL {
            let run = self.run_handle(id.clone(), kind);
            if run.exists().await? {
                return Ok(run);
            }
        }
        Err(Error::NotFound(format!(
            "run {} of conversation {}",
            id, self.id
        )))
    }

    /// Remove a run of either kind; missing runs are ignored
    pub async fn delete_run(&self, id: &RunId) -> Result<()> {
        match self.open_run(id).await {
            Ok(run) => run.delete().await,
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}

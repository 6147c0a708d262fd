//! Runs of a conversation
//!
//! A run is one document under `runs/<kind>/<runId>.json`. The kind is
//! resolved once, when the handle is created, and decides which codec reads
//! and writes the document.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tally_core::{RunArtifact, RunId, TrajectoryMeta};
use tally_storage::StorageBackend;
use tally_wire::{Codec, RunArtifactCodec, TrajectoryMetaCodec};
use tracing::debug;

/// What a run document holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    /// Evaluation report (`runs/tally/`)
    Tally,
    /// Trajectory generation snapshot (`runs/trajectory/`)
    Trajectory,
}

impl RunKind {
    /// Every kind, in listing order
    pub const ALL: [RunKind; 2] = [RunKind::Tally, RunKind::Trajectory];

    /// Directory name under `runs/`
    pub fn dir_name(&self) -> &'static str {
        match self {
            RunKind::Tally => "tally",
            RunKind::Trajectory => "trajectory",
        }
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Content of a run document
#[derive(Debug, Clone, PartialEq)]
pub enum RunPayload {
    /// Evaluation report
    Artifact(RunArtifact),
    /// Trajectory snapshot
    TrajectoryMeta(TrajectoryMeta),
}

impl RunPayload {
    /// Kind of run this payload belongs to
    pub fn kind(&self) -> RunKind {
        match self {
            RunPayload::Artifact(_) => RunKind::Tally,
            RunPayload::TrajectoryMeta(_) => RunKind::Trajectory,
        }
    }
}

impl From<RunArtifact> for RunPayload {
    fn from(artifact: RunArtifact) -> Self {
        RunPayload::Artifact(artifact)
    }
}

impl From<TrajectoryMeta> for RunPayload {
    fn from(meta: TrajectoryMeta) -> Self {
        RunPayload::TrajectoryMeta(meta)
    }
}

/// Handle on one run document
#[derive(Debug, Clone)]
pub struct RunHandle {
    backend: Arc<dyn StorageBackend>,
    conversation_id: String,
    id: RunId,
    kind: RunKind,
    path: String,
}

impl RunHandle {
    pub(crate) fn new(
        backend: Arc<dyn StorageBackend>,
        conversation_id: impl Into<String>,
        id: RunId,
        kind: RunKind,
        path: String,
    ) -> Self {
        RunHandle {
            backend,
            conversation_id: conversation_id.into(),
            id,
            kind,
            path,
        }
    }

    /// Run id
    pub fn id(&self) -> &RunId {
        &self.id
    }

    /// Run kind
    pub fn kind(&self) -> RunKind {
        self.kind
    }

    /// Conversation the run belongs to
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Backend path of the run document
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Creation time encoded in the run id, if any
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.id.created_at()
    }

    /// True once the run document has been written
    pub async fn exists(&self) -> Result<bool> {
        Ok(matches!(
            self.backend.stat(&self.path).await?,
            Some(stat) if !stat.is_directory
        ))
    }

    /// Read and decode the run document
    pub async fn load(&self) -> Result<RunPayload> {
        if !self.exists().await? {
            return Err(Error::NotFound(format!(
                "{} run {} of conversation {}",
                self.kind, self.id, self.conversation_id
            )));
        }
        let text = self.backend.read(&self.path).await?;
        let payload = match self.kind {
            RunKind::Tally => RunPayload::Artifact(RunArtifactCodec::new().decode(&text)?),
            RunKind::Trajectory => {
                RunPayload::TrajectoryMeta(TrajectoryMetaCodec::new().decode(&text)?)
            }
        };
        Ok(payload)
    }

    /// Encode and overwrite the run document
    pub async fn save(&self, payload: &RunPayload) -> Result<()> {
        self.expect_kind(payload.kind())?;
        let text = match payload {
            RunPayload::Artifact(artifact) => {
                if artifact.run_id != self.id {
                    return Err(Error::IdMismatch {
                        kind: "run",
                        expected: self.id.to_string(),
                        actual: artifact.run_id.to_string(),
                    });
                }
                RunArtifactCodec::new().encode(artifact)?
            }
            RunPayload::TrajectoryMeta(meta) => TrajectoryMetaCodec::new().encode(meta)?,
        };
        debug!(run = %self.id, kind = %self.kind, path = %self.path, "saving run");
        self.backend.write(&self.path, &text).await?;
        Ok(())
    }

    /// Load a tally run's artifact
    pub async fn load_artifact(&self) -> Result<RunArtifact> {
        self.expect_kind(RunKind::Tally)?;
        match self.load().await? {
            RunPayload::Artifact(artifact) => Ok(artifact),
            other => Err(self.mismatch(RunKind::Tally, other.kind())),
        }
    }

    /// Save a tally run's artifact
    pub async fn save_artifact(&self, artifact: &RunArtifact) -> Result<()> {
        self.expect_kind(RunKind::Tally)?;
        self.save(&RunPayload::Artifact(artifact.clone())).await
    }

    /// Load a trajectory run's snapshot
    pub async fn load_trajectory_meta(&self) -> Result<TrajectoryMeta> {
        self.expect_kind(RunKind::Trajectory)?;
        match self.load().await? {
            RunPayload::TrajectoryMeta(meta) => Ok(meta),
            other => Err(self.mismatch(RunKind::Trajectory, other.kind())),
        }
    }

    /// Save a trajectory run's snapshot
    pub async fn save_trajectory_meta(&self, meta: &TrajectoryMeta) -> Result<()> {
        self.expect_kind(RunKind::Trajectory)?;
        self.save(&RunPayload::TrajectoryMeta(meta.clone())).await
    }

    /// Remove the run document
    pub async fn delete(&self) -> Result<()> {
        self.backend.delete(&self.path).await?;
        Ok(())
    }

    fn expect_kind(&self, expected: RunKind) -> Result<()> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(self.mismatch(expected, self.kind))
        }
    }

    fn mismatch(&self, expected: RunKind, actual: RunKind) -> Error {
        Error::RunKindMismatch {
            run_id: self.id.to_string(),
            expected,
            actual,
        }
    }
}

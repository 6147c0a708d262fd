//! Store entry point
//!
//! [`TallyStore`] binds a backend to a base path and hands out
//! [`ConversationHandle`]s. Open it from a [`TallyConfig`], through the
//! builder, or directly from a backend you constructed yourself.

use crate::config::{TallyConfig, DEFAULT_STORAGE_PATH};
use crate::conversation::ConversationHandle;
use crate::error::Result;
use crate::layout::{resolve_base, Layout};
use std::path::PathBuf;
use std::sync::Arc;
use tally_core::{generate_conversation_id, validate_path_segment};
use tally_storage::{connect, BackendConfig, StorageBackend};
use tracing::{debug, info};

/// Conversations and runs on one backend
#[derive(Debug, Clone)]
pub struct TallyStore {
    backend: Arc<dyn StorageBackend>,
    layout: Layout,
}

impl TallyStore {
    /// Open the store described by a loaded configuration.
    ///
    /// Only the selected backend is constructed.
    pub async fn open(config: &TallyConfig) -> Result<Self> {
        let backend_config = config.backend_config()?;
        let backend = connect(&backend_config).await?;
        let base = config.base_path();
        info!(backend = %backend.kind(), base = %base, "opened tally store");
        Ok(Self::new(backend, base))
    }

    /// Create a builder for custom setup.
    pub fn builder() -> TallyStoreBuilder {
        TallyStoreBuilder::new()
    }

    /// Store over an existing backend, rooted at `base`
    pub fn new(backend: Arc<dyn StorageBackend>, base: impl Into<String>) -> Self {
        let layout = Layout::new(Arc::clone(&backend), base);
        TallyStore { backend, layout }
    }

    /// Shared backend
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Base path every document lives under
    pub fn base(&self) -> &str {
        self.layout.base()
    }

    /// Ids of every stored conversation, sorted
    pub async fn list_conversations(&self) -> Result<Vec<String>> {
        let entries = self.backend.list(&self.layout.conversations_dir()).await?;
        let mut ids: Vec<String> = entries
            .into_iter()
            .filter(|e| e.is_directory)
            .map(|e| e.id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Handle for a conversation; nothing is read or written
    pub fn conversation(&self, id: &str) -> Result<ConversationHandle> {
        validate_path_segment("conversation", id)?;
        Ok(ConversationHandle::new(
            Arc::clone(&self.backend),
            self.layout.clone(),
            id.to_string(),
        ))
    }

    /// Create a conversation, or re-stamp `meta.json` if it already exists
    pub async fn create_conversation(&self, id: &str) -> Result<ConversationHandle> {
        let handle = self.conversation(id)?;
        let meta = handle.stamp_meta().await?;
        debug!(conversation = %id, created_at = %meta.created_at, "conversation ready");
        Ok(handle)
    }

    /// Create a conversation with a generated id
    pub async fn new_conversation(&self) -> Result<ConversationHandle> {
        self.create_conversation(&generate_conversation_id()).await
    }

    /// True if anything is stored for the conversation
    pub async fn conversation_exists(&self, id: &str) -> Result<bool> {
        self.conversation(id)?.exists().await
    }

    /// Remove a conversation and every document under it
    pub async fn delete_conversation(&self, id: &str) -> Result<()> {
        let handle = self.conversation(id)?;
        debug!(conversation = %id, "deleting conversation");
        self.backend.delete(&handle.path()).await?;
        Ok(())
    }

    /// Release the backend's connection
    pub async fn close(&self) -> Result<()> {
        self.backend.close().await?;
        Ok(())
    }
}

/// Builder for [`TallyStore`]
///
/// ```ignore
/// let store = TallyStore::builder()
///     .backend_config(BackendConfig::Local)
///     .base(".tally")
///     .cwd("/work/project")
///     .open()
///     .await?;
/// ```
#[derive(Debug, Default)]
pub struct TallyStoreBuilder {
    backend: Option<Arc<dyn StorageBackend>>,
    backend_config: Option<BackendConfig>,
    base: Option<String>,
    cwd: Option<PathBuf>,
}

impl TallyStoreBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an already constructed backend.
    ///
    /// Takes precedence over [`TallyStoreBuilder::backend_config`].
    pub fn backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Construct the backend from settings when the store opens.
    pub fn backend_config(mut self, config: BackendConfig) -> Self {
        self.backend_config = Some(config);
        self
    }

    /// Set the base path (default `.tally`).
    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Directory a relative local base is resolved against.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Open the store.
    pub async fn open(self) -> Result<TallyStore> {
        let backend = match self.backend {
            Some(backend) => backend,
            None => connect(&self.backend_config.unwrap_or_default()).await?,
        };
        let base = self.base.as_deref().unwrap_or(DEFAULT_STORAGE_PATH);
        let base = resolve_base(backend.kind(), base, self.cwd.as_deref());
        info!(backend = %backend.kind(), base = %base, "opened tally store");
        Ok(TallyStore::new(backend, base))
    }
}

//! Convenient imports for Tally.
//!
//! ```ignore
//! use tally::prelude::*;
//!
//! let store = TallyStore::builder().open().await?;
//! let conv = store.new_conversation().await?;
//! ```

// Main entry point
pub use crate::store::{TallyStore, TallyStoreBuilder};
pub use crate::config::TallyConfig;

// Error handling
pub use crate::error::{Error, Result};

// Handles
pub use crate::conversation::{ConversationHandle, ConversationMeta};
pub use crate::run::{RunHandle, RunKind, RunPayload};

// Data model
pub use tally_core::{
    Conversation, ConversationStep, Message, RunArtifact, RunId, StepTrace, TrajectoryMeta,
};

// Backends
pub use tally_storage::{BackendConfig, StorageBackend};

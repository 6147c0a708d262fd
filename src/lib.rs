//! # Tally
//!
//! Storage for evaluation data: conversations, evaluation run reports and
//! trajectory snapshots, persisted through one backend interface onto local
//! disk, an S2 log store or Redis streams.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tally::prelude::*;
//!
//! let config = TallyConfig::load(&std::env::current_dir()?)?;
//! let store = TallyStore::open(&config).await?;
//!
//! let conv = store.create_conversation("checkout-flow").await?;
//! let mut conversation = Conversation::new("checkout-flow");
//! conversation.push_step(Message::user("hi"), vec![Message::assistant("hello")]);
//! conv.save(&conversation).await?;
//!
//! let run = conv.create_run(RunKind::Tally, None).await?;
//! run.save_artifact(&RunArtifact::new(run.id().clone(), chrono::Utc::now(), 1)).await?;
//! ```
//!
//! ## Crates
//!
//! | Crate | Contents |
//! |-------|----------|
//! | `tally-core` | Data model and id utilities |
//! | `tally-storage` | [`StorageBackend`] and its implementations |
//! | `tally-wire` | Codecs and validators for every persisted format |
//! | `tally` | Configuration, layout and the [`TallyStore`] handles |

#![warn(missing_docs)]

pub mod config;
mod conversation;
mod error;
pub mod layout;
mod run;
mod store;

pub mod prelude;

// Re-export main entry points
pub use config::{discover_config_file, ConfigError, TallyConfig};
pub use conversation::{ConversationHandle, ConversationMeta};
pub use error::{Error, Result};
pub use run::{RunHandle, RunKind, RunPayload};
pub use store::{TallyStore, TallyStoreBuilder};

// Re-export the most used member crate items
pub use tally_core::{
    generate_conversation_id, Conversation, ConversationStep, Message, RunArtifact, RunId,
    StepTrace, TrajectoryMeta,
};
pub use tally_storage::{BackendConfig, BackendKind, StorageBackend, StorageError};
pub use tally_wire::{Codec, CodecError, DecodePolicy, ValidationError};

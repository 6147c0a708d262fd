//! Document codecs for Tally
//!
//! Every persisted document has a codec implementing [`Codec`]:
//!
//! | Document | Codec | Shape |
//! |----------|-------|-------|
//! | `conversation.jsonl` | [`ConversationCodec`] | one JSON line per step |
//! | `runs/tally/<runId>.json` | [`RunArtifactCodec`] | JSON document |
//! | `trajectory.meta.json` | [`TrajectoryMetaCodec`] | JSON document |
//! | `runs/trajectory/<runId>.json` | [`TrajectoryMetaCodec`] | JSON document |
//! | `stepTraces.json` | [`StepTracesCodec`] | JSON array |
//!
//! Encoding always validates first. Decoding validates the result, and
//! reports every problem of a document at once (see [`ValidationError`]).
//!
//! ## Examples
//!
//! ```
//! use tally_core::{Conversation, Message};
//! use tally_wire::{Codec, ConversationCodec};
//!
//! let mut conv = Conversation::new("c1");
//! conv.push_step(Message::user("hi"), vec![Message::assistant("hello")]);
//!
//! let codec = ConversationCodec::new();
//! let text = codec.encode(&conv).unwrap();
//! assert_eq!(codec.decode(&text).unwrap(), conv);
//! assert!(codec.decode("   ").unwrap_err().to_string().contains("empty"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod artifact;
pub mod codec;
pub mod conversation;
pub mod error;
pub mod trajectory;
pub mod validate;

pub use artifact::{validate_run_artifact, RunArtifactCodec};
pub use codec::{Codec, DecodePolicy, DecodeReport, SkippedLine};
pub use conversation::{
    validate_conversation, validate_step_line, ConversationCodec, ConversationLine,
};
pub use error::{CodecError, Result};
pub use trajectory::{
    validate_step_traces, validate_trajectory_meta, StepTracesCodec, TrajectoryMetaCodec,
};
pub use validate::{ValidationError, ValidationIssue};

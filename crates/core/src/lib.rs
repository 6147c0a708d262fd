//! Core types for Tally
//!
//! This crate defines the in-memory domain model shared by the storage,
//! wire and store layers:
//!
//! - [`Conversation`] / [`ConversationStep`] / [`Message`]: user and agent turns
//! - [`RunArtifact`]: a schema-versioned evaluation report for one conversation
//! - [`TrajectoryMeta`] / [`StepTrace`]: how a simulated conversation was generated
//! - [`RunId`]: timestamp-embedding run identifiers
//!
//! Nothing here performs I/O. Encoding to the on-disk formats lives in
//! `tally-wire`, persistence in `tally-storage`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod artifact;
pub mod conversation;
pub mod ids;
pub mod message;
pub mod trajectory;

pub use artifact::{
    ArtifactPaths, ArtifactStoreRef, EvalDef, EvalKind, EvalResult, EvalSummary, Measurement,
    MetricDef, MetricScope, MetricValue, MultiTurnResult, Outcome, RunArtifact, RunDefs,
    RunResult, ScorerDef, ScorerInput, ScorerResult, ScorerSeries, SingleTurnSeries, Summaries,
    ValueType, Verdict, VerdictSummary, RUN_ARTIFACT_SCHEMA_VERSION,
};
pub use conversation::{Conversation, ConversationStep, Metadata};
pub use ids::{generate_conversation_id, validate_path_segment, IdError, RunId};
pub use message::{Message, MessageContent, Role};
pub use trajectory::{
    LoopDetection, Persona, SelectionCandidate, SelectionMethod, StepDefinition, StepGraph,
    StepSelection, StepTrace, TraceEnd, TrajectoryMeta,
};

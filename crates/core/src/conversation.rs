//! Conversations and their steps
//!
//! A conversation is an ordered list of steps. Each step pairs one input
//! message with the messages the agent produced in response. `step_index` is
//! the canonical order; storage order is not.

use crate::message::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form JSON metadata attached to conversations, steps and runs
pub type Metadata = Map<String, Value>;

/// One user turn and the agent's response to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationStep {
    /// Position of the step; unique within a conversation
    pub step_index: u32,
    /// The message that started the step
    pub input: Message,
    /// Messages produced by the agent, in order
    pub output: Vec<Message>,
    /// Optional caller-assigned step id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// When the step happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Step-level metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl ConversationStep {
    /// Create a step without id, timestamp or metadata
    pub fn new(step_index: u32, input: Message, output: Vec<Message>) -> Self {
        ConversationStep {
            step_index,
            input,
            output,
            id: None,
            timestamp: None,
            metadata: None,
        }
    }

    /// Set the step timestamp
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set step metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A full conversation snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Conversation id; also its directory name in storage
    pub id: String,
    /// Steps, kept sorted by `step_index`
    pub steps: Vec<ConversationStep>,
    /// Conversation-level metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new(id: impl Into<String>) -> Self {
        Conversation {
            id: id.into(),
            steps: Vec::new(),
            metadata: None,
        }
    }

    /// Set conversation metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Index the next appended step will receive.
    ///
    /// `None` once a step holds `u32::MAX`; no index follows it.
    pub fn next_step_index(&self) -> Option<u32> {
        match self.steps.iter().map(|s| s.step_index).max() {
            Some(last) => last.checked_add(1),
            None => Some(0),
        }
    }

    /// Append a step after the current last one and return its index.
    ///
    /// Returns `None`, leaving the conversation unchanged, when no index is left.
    pub fn push_step(&mut self, input: Message, output: Vec<Message>) -> Option<u32> {
        let index = self.next_step_index()?;
        self.steps.push(ConversationStep::new(index, input, output));
        Some(index)
    }

    /// Insert or replace a step, keeping steps ordered by index.
    ///
    /// Steps are re-sorted first, since `steps` may have been edited directly.
    pub fn upsert_step(&mut self, step: ConversationStep) {
        self.sort_steps();
        match self
            .steps
            .binary_search_by_key(&step.step_index, |s| s.step_index)
        {
            Ok(pos) => self.steps[pos] = step,
            Err(pos) => self.steps.insert(pos, step),
        }
    }

    /// Look up a step by its index
    pub fn step(&self, step_index: u32) -> Option<&ConversationStep> {
        self.steps.iter().find(|s| s.step_index == step_index)
    }

    /// Restore canonical order
    pub fn sort_steps(&mut self) {
        self.steps.sort_by_key(|s| s.step_index);
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True if the conversation has no steps
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

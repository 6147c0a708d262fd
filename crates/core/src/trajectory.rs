//! Trajectory types
//!
//! A trajectory is a simulated conversation produced by driving an agent
//! with a persona toward a goal. [`TrajectoryMeta`] is the declarative plan
//! (no callbacks, no executable values) and [`StepTrace`] records what
//! actually happened on each turn.

use crate::conversation::{Conversation, ConversationStep, Metadata};
use crate::message::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Simulated user persona
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Who the user is and how they behave
    pub description: String,
    /// Things the persona must never do
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guardrails: Vec<String>,
}

/// One node of the step graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDefinition {
    /// Step id, unique within the graph
    pub id: String,
    /// What the simulated user should try to do
    pub instruction: String,
    /// Optional hints for the user simulator
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
    /// Declarative preconditions (snapshots only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preconditions: Vec<Value>,
    /// Retry budget for this step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    /// Extra metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Steps the simulator may walk through
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepGraph {
    /// All steps
    pub steps: Vec<StepDefinition>,
    /// Id of the first step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    /// Ids of steps that end the trajectory
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub terminals: Vec<String>,
}

impl StepGraph {
    /// Look up a step by id
    pub fn step(&self, id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id == id)
    }
}

/// Limits used to stop a trajectory that keeps revisiting steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopDetection {
    /// Maximum consecutive turns on the same step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_consecutive_same_step: Option<u32>,
    /// Maximum repeated cycles inside the window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cycles_in_window: Option<u32>,
    /// Window size for cycle detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_window_size: Option<u32>,
}

/// Snapshot of how a simulated conversation was generated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryMeta {
    /// Trajectory id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trajectory_id: Option<String>,
    /// When generation started
    pub created_at: DateTime<Utc>,
    /// What the simulated user is trying to achieve
    pub goal: String,
    /// Simulated user
    pub persona: Persona,
    /// Turn budget
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
    /// Step graph, when generation was graph-driven
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_graph: Option<StepGraph>,
    /// Loop-detection limits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_detection: Option<LoopDetection>,
    /// Extra metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl TrajectoryMeta {
    /// Create a meta snapshot with only goal and persona
    pub fn new(goal: impl Into<String>, persona: Persona, created_at: DateTime<Utc>) -> Self {
        TrajectoryMeta {
            trajectory_id: None,
            created_at,
            goal: goal.into(),
            persona,
            max_turns: None,
            step_graph: None,
            loop_detection: None,
            metadata: None,
        }
    }
}

/// How the next step was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionMethod {
    /// Graph start step
    Start,
    /// First step whose preconditions held
    PreconditionsOrdered,
    /// Ranked by a model
    LlmRanked,
    /// No step applied
    None,
}

/// A step considered during selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionCandidate {
    /// Candidate step id
    pub step_id: String,
    /// Ranking score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Why it was (not) chosen
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

/// Step selection record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSelection {
    /// Selection method
    pub method: SelectionMethod,
    /// Candidates considered
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<SelectionCandidate>,
}

/// Marks the turn that ended the trajectory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEnd {
    /// True if this was the last turn
    pub is_final: bool,
    /// Why generation stopped (`goalReached`, `maxTurns`, `loopDetected`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Free-form summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// What happened on one generated turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTrace {
    /// Turn number, unique within the trace list
    pub turn_index: u32,
    /// Message sent by the simulated user
    pub user_message: Message,
    /// Messages produced by the agent
    #[serde(default)]
    pub agent_messages: Vec<Message>,
    /// When the turn happened
    pub timestamp: DateTime<Utc>,
    /// Step of the graph this turn executed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    /// Selection record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<StepSelection>,
    /// End marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<TraceEnd>,
}

impl StepTrace {
    /// Convert traces into a conversation, one step per turn.
    ///
    /// Traces are ordered by `turn_index`; step indices are the turn indices.
    pub fn to_conversation(
        conversation_id: impl Into<String>,
        traces: &[StepTrace],
    ) -> Conversation {
        let mut conversation = Conversation::new(conversation_id);
        for trace in traces {
            let mut step = ConversationStep::new(
                trace.turn_index,
                trace.user_message.clone(),
                trace.agent_messages.clone(),
            )
            .with_timestamp(trace.timestamp);
            step.id = trace.step_id.clone();
            conversation.upsert_step(step);
        }
        conversation
    }
}

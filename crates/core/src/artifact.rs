//! Run artifact types
//!
//! A run artifact is the persisted report of one evaluation pass over a
//! conversation. Metric, eval and scorer definitions are stored once in
//! [`RunDefs`], keyed by name; every result refers to its definition by name
//! only.
//!
//! ```text
//! RunArtifact
//! ├── defs    { metrics{name→MetricDef}, evals{name→EvalDef}, scorers{name→ScorerDef} }
//! └── result  { stepCount,
//!               singleTurn{eval→byStepIndex[stepCount]},
//!               multiTurn{eval→Measurement+Outcome},
//!               scorers{eval→series|scalar},
//!               summaries? }
//! ```
//!
//! In memory every dictionary is a `BTreeMap`, so encoding is deterministic
//! and diff-friendly.

use crate::conversation::Metadata;
use crate::ids::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The only artifact schema version this crate reads or writes
pub const RUN_ARTIFACT_SCHEMA_VERSION: u32 = 1;

// ============================================================================
// Definitions
// ============================================================================

/// Whether a metric is computed per step or over the whole conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricScope {
    /// One value per step
    Single,
    /// One value per conversation
    Multi,
}

/// Raw value type of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    /// Numeric
    Number,
    /// Boolean
    Boolean,
    /// Free text
    String,
    /// Ordered categories
    Ordinal,
}

/// Metric definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDef {
    /// Metric name (also its key in `defs.metrics`)
    pub name: String,
    /// Per-step or per-conversation
    pub scope: MetricScope,
    /// Type of the raw value
    pub value_type: ValueType,
    /// Human description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declarative normalization snapshot (how raw values map to scores)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalization: Option<Value>,
    /// Extra metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Kind of eval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EvalKind {
    /// Evaluated on every step
    SingleTurn,
    /// Evaluated once over the conversation
    MultiTurn,
    /// Combines other metrics through a scorer
    Scorer,
}

/// Eval definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalDef {
    /// Eval name (also its key in `defs.evals`)
    pub name: String,
    /// Eval kind
    pub kind: EvalKind,
    /// Name of the metric in `defs.metrics` this eval measures
    pub metric: String,
    /// Name of the scorer in `defs.scorers` (scorer evals only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scorer: Option<String>,
    /// Declarative verdict policy snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Value>,
    /// Human description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Extra metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// One weighted scorer input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorerInput {
    /// Name of the input metric in `defs.metrics`
    pub metric: String,
    /// Relative weight
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Scorer definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorerDef {
    /// Scorer name (also its key in `defs.scorers`)
    pub name: String,
    /// Metrics combined by the scorer
    pub inputs: Vec<ScorerInput>,
    /// Metric the combined score is reported as
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_metric: Option<String>,
    /// Combination strategy label (e.g. `weightedAverage`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combine: Option<String>,
    /// Human description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Deduplicated definitions referenced by name from results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDefs {
    /// Metric definitions
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricDef>,
    /// Eval definitions
    #[serde(default)]
    pub evals: BTreeMap<String, EvalDef>,
    /// Scorer definitions
    #[serde(default)]
    pub scorers: BTreeMap<String, ScorerDef>,
}

// ============================================================================
// Results
// ============================================================================

/// Raw metric value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// Boolean value
    Bool(bool),
    /// Numeric value
    Number(f64),
    /// Text or ordinal label
    Text(String),
}

/// Raw value plus normalized score for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    /// Name of the metric in `defs.metrics`
    pub metric_ref: String,
    /// Raw value; `null` when the metric produced nothing
    #[serde(default)]
    pub value: Option<MetricValue>,
    /// Normalized score in `[0, 1]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Confidence in `[0, 1]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Judge reasoning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Time spent computing the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<f64>,
    /// When the value was computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Measurement {
    /// Create a measurement with a raw value and no score
    pub fn new(metric_ref: impl Into<String>, value: Option<MetricValue>) -> Self {
        Measurement {
            metric_ref: metric_ref.into(),
            value,
            score: None,
            confidence: None,
            reasoning: None,
            execution_time_ms: None,
            timestamp: None,
        }
    }

    /// Set the score, clamped into `[0, 1]`
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(Self::clamped_score(score));
        self
    }

    /// Set the confidence, clamped into `[0, 1]`
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(Self::clamped_score(confidence));
        self
    }

    /// Set the judge reasoning
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Clamp a raw score into `[0, 1]`; NaN becomes 0.
    pub fn clamped_score(score: f64) -> f64 {
        if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0)
        }
    }
}

/// Verdict of an eval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Passed the verdict policy
    Pass,
    /// Failed the verdict policy
    Fail,
    /// Policy could not decide (missing value, no policy)
    Unknown,
}

/// Pass/fail outcome and the policy that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    /// The verdict
    pub verdict: Verdict,
    /// Policy snapshot
    pub policy: Value,
    /// Value the policy looked at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<Value>,
}

/// Measurement with an optional outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalResult {
    /// What was measured
    pub measurement: Measurement,
    /// Verdict, when the eval declares a policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

/// Per-step results of a single-turn eval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleTurnSeries {
    /// Name of the eval in `defs.evals`
    pub eval_ref: String,
    /// One slot per step; `None` means "not evaluated"
    pub by_step_index: Vec<Option<EvalResult>>,
}

impl SingleTurnSeries {
    /// Create a series with `step_count` empty slots
    pub fn new(eval_ref: impl Into<String>, step_count: u32) -> Self {
        SingleTurnSeries {
            eval_ref: eval_ref.into(),
            by_step_index: vec![None; step_count as usize],
        }
    }

    /// Fill one slot. Returns false if `step_index` is out of range.
    pub fn set(&mut self, step_index: u32, result: EvalResult) -> bool {
        match self.by_step_index.get_mut(step_index as usize) {
            Some(slot) => {
                *slot = Some(result);
                true
            }
            None => false,
        }
    }

    /// Number of evaluated steps
    pub fn evaluated(&self) -> usize {
        self.by_step_index.iter().filter(|r| r.is_some()).count()
    }
}

/// Result of a multi-turn eval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiTurnResult {
    /// Name of the eval in `defs.evals`
    pub eval_ref: String,
    /// What was measured
    pub measurement: Measurement,
    /// Verdict, when the eval declares a policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

/// Per-step scorer output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorerSeries {
    /// Name of the eval in `defs.evals`
    pub eval_ref: String,
    /// One slot per step; `None` means "not evaluated"
    pub by_step_index: Vec<Option<EvalResult>>,
}

/// Scorer output, either per step or one value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "camelCase")]
pub enum ScorerResult {
    /// One slot per step
    SeriesByStepIndex(ScorerSeries),
    /// One value for the conversation
    Scalar(MultiTurnResult),
}

impl ScorerResult {
    /// Name of the eval this result belongs to
    pub fn eval_ref(&self) -> &str {
        match self {
            ScorerResult::SeriesByStepIndex(s) => &s.eval_ref,
            ScorerResult::Scalar(r) => &r.eval_ref,
        }
    }
}

/// Pass/fail counts over an eval's outcomes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictSummary {
    /// `pass_count / total_count`, 0 when there are no outcomes
    pub pass_rate: f64,
    /// Passing outcomes
    pub pass_count: u32,
    /// Failing outcomes
    pub fail_count: u32,
    /// Undecided outcomes
    pub unknown_count: u32,
    /// All outcomes
    pub total_count: u32,
}

impl VerdictSummary {
    /// Count verdicts
    pub fn from_verdicts<I: IntoIterator<Item = Verdict>>(verdicts: I) -> Self {
        let (mut pass, mut fail, mut unknown) = (0u32, 0u32, 0u32);
        for v in verdicts {
            match v {
                Verdict::Pass => pass += 1,
                Verdict::Fail => fail += 1,
                Verdict::Unknown => unknown += 1,
            }
        }
        let total = pass + fail + unknown;
        VerdictSummary {
            pass_rate: if total == 0 {
                0.0
            } else {
                f64::from(pass) / f64::from(total)
            },
            pass_count: pass,
            fail_count: fail,
            unknown_count: unknown,
            total_count: total,
        }
    }
}

/// Aggregated view of one eval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalSummary {
    /// Name of the eval in `defs.evals`
    pub eval_ref: String,
    /// Eval kind
    pub kind: EvalKind,
    /// Named aggregates of scores (`mean`, `p50`, ...)
    #[serde(default)]
    pub aggregations: BTreeMap<String, f64>,
    /// Verdict counts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict_summary: Option<VerdictSummary>,
}

/// Summaries keyed by eval name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summaries {
    /// One summary per eval
    #[serde(default)]
    pub by_eval: BTreeMap<String, EvalSummary>,
}

/// All results of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    /// Number of steps in the evaluated conversation
    pub step_count: u32,
    /// Single-turn eval series keyed by eval name
    #[serde(default)]
    pub single_turn: BTreeMap<String, SingleTurnSeries>,
    /// Multi-turn eval results keyed by eval name
    #[serde(default)]
    pub multi_turn: BTreeMap<String, MultiTurnResult>,
    /// Scorer eval results keyed by eval name
    #[serde(default)]
    pub scorers: BTreeMap<String, ScorerResult>,
    /// Optional aggregates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summaries: Option<Summaries>,
}

// ============================================================================
// Artifact
// ============================================================================

/// Where the run was stored when it was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactStoreRef {
    /// Backend name (`local`, `s2`, `redis`)
    pub backend: String,
    /// Conversation the run belongs to
    pub conversation_id: String,
    /// Backend path of the run document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_path: Option<String>,
}

/// Paths of sibling documents the run was computed from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactPaths {
    /// Conversation log
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_jsonl: Option<String>,
    /// Trajectory meta snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trajectory_meta: Option<String>,
    /// Step traces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_traces: Option<String>,
}

/// Persisted evaluation report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunArtifact {
    /// Always [`RUN_ARTIFACT_SCHEMA_VERSION`]
    pub schema_version: u32,
    /// Run id
    pub run_id: RunId,
    /// When the run was produced
    pub created_at: DateTime<Utc>,
    /// Storage location at production time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<ArtifactStoreRef>,
    /// Input document paths
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<ArtifactPaths>,
    /// Deduplicated definitions
    pub defs: RunDefs,
    /// Results
    pub result: RunResult,
    /// Extra metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl RunArtifact {
    /// Create an empty artifact for a conversation of `step_count` steps
    pub fn new(run_id: RunId, created_at: DateTime<Utc>, step_count: u32) -> Self {
        RunArtifact {
            schema_version: RUN_ARTIFACT_SCHEMA_VERSION,
            run_id,
            created_at,
            store: None,
            artifacts: None,
            defs: RunDefs::default(),
            result: RunResult {
                step_count,
                ..RunResult::default()
            },
            metadata: None,
        }
    }

    /// Names of every eval that has a result
    pub fn evaluated_evals(&self) -> Vec<&str> {
        let r = &self.result;
        let mut names: Vec<&str> = r
            .single_turn
            .keys()
            .chain(r.multi_turn.keys())
            .chain(r.scorers.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

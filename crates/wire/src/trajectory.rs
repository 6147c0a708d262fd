//! Trajectory snapshot codecs
//!
//! `trajectory.meta.json` holds a [`TrajectoryMeta`] and `stepTraces.json`
//! an array of [`StepTrace`]. Both are whole JSON documents; dates are
//! RFC 3339 strings on disk and `DateTime<Utc>` in memory.

use crate::codec::{non_empty, to_document, Codec};
use crate::error::{CodecError, Result};
use crate::validate::{index_path, Issues, ValidationError, ValidationIssue};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use tally_core::{StepTrace, TrajectoryMeta};

/// Check a trajectory meta snapshot.
pub fn validate_trajectory_meta(meta: &TrajectoryMeta) -> std::result::Result<(), ValidationError> {
    let mut issues = Issues::new("trajectory meta");
    issues.check(!meta.goal.trim().is_empty(), "$.goal", "must not be empty");
    issues.check(
        !meta.persona.description.trim().is_empty(),
        "$.persona.description",
        "must not be empty",
    );
    issues.check(
        meta.max_turns != Some(0),
        "$.maxTurns",
        "must be positive",
    );

    if let Some(graph) = &meta.step_graph {
        let mut ids = HashSet::new();
        for (i, step) in graph.steps.iter().enumerate() {
            let path = index_path("$.stepGraph.steps", i);
            issues.check(!step.id.is_empty(), format!("{}.id", path), "must not be empty");
            issues.check(
                ids.insert(step.id.as_str()),
                format!("{}.id", path),
                format!("duplicate step id {:?}", step.id),
            );
            issues.check(
                step.max_attempts != Some(0),
                format!("{}.maxAttempts", path),
                "must be positive",
            );
        }
        if let Some(start) = &graph.start {
            issues.check(
                ids.contains(start.as_str()),
                "$.stepGraph.start",
                format!("unknown step {:?}", start),
            );
        }
        for (i, terminal) in graph.terminals.iter().enumerate() {
            issues.check(
                ids.contains(terminal.as_str()),
                index_path("$.stepGraph.terminals", i),
                format!("unknown step {:?}", terminal),
            );
        }
    }

    if let Some(limits) = &meta.loop_detection {
        for (field, value) in [
            ("maxConsecutiveSameStep", limits.max_consecutive_same_step),
            ("maxCyclesInWindow", limits.max_cycles_in_window),
            ("cycleWindowSize", limits.cycle_window_size),
        ] {
            issues.check(
                value != Some(0),
                format!("$.loopDetection.{}", field),
                "must be positive",
            );
        }
    }

    issues.finish()
}

/// Check a list of step traces.
pub fn validate_step_traces(traces: &[StepTrace]) -> std::result::Result<(), ValidationError> {
    let mut issues = Issues::new("step traces");
    let mut seen = HashSet::new();
    for (i, trace) in traces.iter().enumerate() {
        issues.check(
            seen.insert(trace.turn_index),
            format!("{}.turnIndex", index_path("$", i)),
            format!("duplicate turn index {}", trace.turn_index),
        );
    }
    let finals = traces
        .iter()
        .filter(|t| t.end.as_ref().map_or(false, |e| e.is_final))
        .count();
    issues.check(finals <= 1, "$", format!("{} turns are marked final", finals));
    issues.finish()
}

fn decode_document<T: DeserializeOwned>(input: &str, document: &'static str) -> Result<T> {
    let input = non_empty(input, document)?;
    let value: serde_json::Value = serde_json::from_str(input).map_err(CodecError::json)?;
    serde_json::from_value(value).map_err(|e| {
        CodecError::Validation(ValidationError::new(
            document,
            vec![ValidationIssue::new("$", e.to_string())],
        ))
    })
}

/// Codec for `trajectory.meta.json` and trajectory run snapshots
#[derive(Debug, Clone, Copy, Default)]
pub struct TrajectoryMetaCodec;

impl TrajectoryMetaCodec {
    /// Create the codec
    pub fn new() -> Self {
        TrajectoryMetaCodec
    }
}

impl Codec for TrajectoryMetaCodec {
    type Value = TrajectoryMeta;

    const DOCUMENT: &'static str = "trajectory meta";

    fn decode(&self, input: &str) -> Result<TrajectoryMeta> {
        let meta: TrajectoryMeta = decode_document(input, Self::DOCUMENT)?;
        validate_trajectory_meta(&meta)?;
        Ok(meta)
    }

    fn encode(&self, meta: &TrajectoryMeta) -> Result<String> {
        validate_trajectory_meta(meta)?;
        to_document(meta)
    }

    fn validate(&self, meta: &TrajectoryMeta) -> std::result::Result<(), ValidationError> {
        validate_trajectory_meta(meta)
    }
}

/// Codec for `stepTraces.json`
///
/// Decoded traces are ordered by `turnIndex`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepTracesCodec;

impl StepTracesCodec {
    /// Create the codec
    pub fn new() -> Self {
        StepTracesCodec
    }
}

impl Codec for StepTracesCodec {
    type Value = Vec<StepTrace>;

    const DOCUMENT: &'static str = "step traces";

    fn decode(&self, input: &str) -> Result<Vec<StepTrace>> {
        let mut traces: Vec<StepTrace> = decode_document(input, Self::DOCUMENT)?;
        validate_step_traces(&traces)?;
        traces.sort_by_key(|t| t.turn_index);
        Ok(traces)
    }

    fn encode(&self, traces: &Vec<StepTrace>) -> Result<String> {
        validate_step_traces(traces)?;
        to_document(traces)
    }

    fn validate(&self, traces: &Vec<StepTrace>) -> std::result::Result<(), ValidationError> {
        validate_step_traces(traces)
    }
}

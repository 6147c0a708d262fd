//! Run artifact codec
//!
//! Artifacts are whole JSON documents. Unknown fields are tolerated at every
//! level so newer producers can add data, but the schema version must match
//! exactly and every cross-reference must resolve.

use crate::codec::{non_empty, to_document, Codec};
use crate::error::{CodecError, Result};
use crate::validate::{index_path, key_path, Issues, ValidationError, ValidationIssue};
use serde_json::Value;
use tally_core::{
    EvalResult, EvalSummary, Measurement, RunArtifact, RunDefs, ScorerResult,
    RUN_ARTIFACT_SCHEMA_VERSION,
};

const DOCUMENT: &str = "run artifact";

/// Codec for `runs/tally/<runId>.json`
#[derive(Debug, Clone, Copy, Default)]
pub struct RunArtifactCodec;

impl RunArtifactCodec {
    /// Create the codec
    pub fn new() -> Self {
        RunArtifactCodec
    }
}

/// Validate an artifact, collecting every issue.
pub fn validate_run_artifact(artifact: &RunArtifact) -> std::result::Result<(), ValidationError> {
    let mut issues = Issues::new(DOCUMENT);
    issues.check(
        artifact.schema_version == RUN_ARTIFACT_SCHEMA_VERSION,
        "$.schemaVersion",
        format!(
            "unsupported schema version {} (expected {})",
            artifact.schema_version, RUN_ARTIFACT_SCHEMA_VERSION
        ),
    );
    check_defs(&artifact.defs, &mut issues);

    let defs = &artifact.defs;
    let result = &artifact.result;
    let step_count = result.step_count as usize;

    for (name, series) in &result.single_turn {
        let path = key_path("$.result.singleTurn", name);
        check_eval_ref(defs, &series.eval_ref, name, &path, &mut issues);
        check_series(defs, &series.by_step_index, step_count, &path, &mut issues);
    }

    for (name, multi) in &result.multi_turn {
        let path = key_path("$.result.multiTurn", name);
        check_eval_ref(defs, &multi.eval_ref, name, &path, &mut issues);
        check_measurement(defs, &multi.measurement, &format!("{}.measurement", path), &mut issues);
    }

    for (name, scorer) in &result.scorers {
        let path = key_path("$.result.scorers", name);
        check_eval_ref(defs, scorer.eval_ref(), name, &path, &mut issues);
        match scorer {
            ScorerResult::SeriesByStepIndex(series) => {
                check_series(defs, &series.by_step_index, step_count, &path, &mut issues)
            }
            ScorerResult::Scalar(scalar) => check_measurement(
                defs,
                &scalar.measurement,
                &format!("{}.measurement", path),
                &mut issues,
            ),
        }
    }

    if let Some(summaries) = &result.summaries {
        for (name, summary) in &summaries.by_eval {
            let path = key_path("$.result.summaries.byEval", name);
            check_summary(defs, name, summary, &path, &mut issues);
        }
    }

    issues.finish()
}

fn check_defs(defs: &RunDefs, issues: &mut Issues) {
    for (key, metric) in &defs.metrics {
        issues.check(
            metric.name == *key,
            format!("{}.name", key_path("$.defs.metrics", key)),
            format!("name {:?} does not match its key", metric.name),
        );
    }
    for (key, eval) in &defs.evals {
        let path = key_path("$.defs.evals", key);
        issues.check(
            eval.name == *key,
            format!("{}.name", path),
            format!("name {:?} does not match its key", eval.name),
        );
        issues.check(
            defs.metrics.contains_key(&eval.metric),
            format!("{}.metric", path),
            format!("unknown metric {:?}", eval.metric),
        );
        if let Some(scorer) = &eval.scorer {
            issues.check(
                defs.scorers.contains_key(scorer),
                format!("{}.scorer", path),
                format!("unknown scorer {:?}", scorer),
            );
        }
    }
    for (key, scorer) in &defs.scorers {
        let path = key_path("$.defs.scorers", key);
        issues.check(
            scorer.name == *key,
            format!("{}.name", path),
            format!("name {:?} does not match its key", scorer.name),
        );
        for (i, input) in scorer.inputs.iter().enumerate() {
            issues.check(
                defs.metrics.contains_key(&input.metric),
                format!("{}.metric", index_path(&format!("{}.inputs", path), i)),
                format!("unknown metric {:?}", input.metric),
            );
        }
    }
}

fn check_eval_ref(defs: &RunDefs, eval_ref: &str, key: &str, path: &str, issues: &mut Issues) {
    issues.check(
        eval_ref == key,
        format!("{}.evalRef", path),
        format!("evalRef {:?} does not match its key", eval_ref),
    );
    issues.check(
        defs.evals.contains_key(eval_ref),
        format!("{}.evalRef", path),
        format!("unknown eval {:?}", eval_ref),
    );
}

fn check_series(
    defs: &RunDefs,
    by_step_index: &[Option<EvalResult>],
    step_count: usize,
    path: &str,
    issues: &mut Issues,
) {
    let series_path = format!("{}.byStepIndex", path);
    issues.check(
        by_step_index.len() == step_count,
        series_path.clone(),
        format!(
            "has {} entries but stepCount is {}",
            by_step_index.len(),
            step_count
        ),
    );
    for (i, slot) in by_step_index.iter().enumerate() {
        if let Some(result) = slot {
            let measurement_path = format!("{}.measurement", index_path(&series_path, i));
            check_measurement(defs, &result.measurement, &measurement_path, issues);
        }
    }
}

fn check_measurement(defs: &RunDefs, m: &Measurement, path: &str, issues: &mut Issues) {
    issues.check(
        defs.metrics.contains_key(&m.metric_ref),
        format!("{}.metricRef", path),
        format!("unknown metric {:?}", m.metric_ref),
    );
    issues.unit_interval(m.score, format!("{}.score", path));
    issues.unit_interval(m.confidence, format!("{}.confidence", path));
}

fn check_summary(
    defs: &RunDefs,
    key: &str,
    summary: &EvalSummary,
    path: &str,
    issues: &mut Issues,
) {
    issues.check(
        summary.eval_ref == key && defs.evals.contains_key(key),
        format!("{}.evalRef", path),
        format!("unknown or mismatched eval {:?}", summary.eval_ref),
    );
    if let Some(v) = &summary.verdict_summary {
        let vpath = format!("{}.verdictSummary", path);
        let counted =
            u64::from(v.pass_count) + u64::from(v.fail_count) + u64::from(v.unknown_count);
        issues.check(
            counted == u64::from(v.total_count),
            format!("{}.totalCount", vpath),
            format!(
                "totalCount {} does not equal pass + fail + unknown ({})",
                v.total_count, counted
            ),
        );
        let expected_rate = if v.total_count == 0 {
            0.0
        } else {
            f64::from(v.pass_count) / f64::from(v.total_count)
        };
        issues.check(
            v.pass_rate.is_finite() && (v.pass_rate - expected_rate).abs() <= 1e-9,
            format!("{}.passRate", vpath),
            format!("passRate {} does not match counts", v.pass_rate),
        );
    }
}

fn schema_error(message: impl Into<String>) -> CodecError {
    ValidationError::new(DOCUMENT, vec![ValidationIssue::new("$", message)]).into()
}

impl Codec for RunArtifactCodec {
    type Value = RunArtifact;

    const DOCUMENT: &'static str = DOCUMENT;

    fn decode(&self, input: &str) -> Result<RunArtifact> {
        let input = non_empty(input, DOCUMENT)?;
        let value: Value = serde_json::from_str(input).map_err(CodecError::json)?;
        if !value.is_object() {
            return Err(schema_error("must be a JSON object"));
        }
        match value.get("schemaVersion").and_then(Value::as_u64) {
            Some(v) if v == u64::from(RUN_ARTIFACT_SCHEMA_VERSION) => {}
            other => {
                return Err(ValidationError::new(
                    DOCUMENT,
                    vec![ValidationIssue::new(
                        "$.schemaVersion",
                        format!(
                            "unsupported schema version {} (expected {})",
                            other.map_or_else(|| "missing".to_string(), |v| v.to_string()),
                            RUN_ARTIFACT_SCHEMA_VERSION
                        ),
                    )],
                )
                .into())
            }
        }
        let artifact: RunArtifact =
            serde_json::from_value(value).map_err(|e| schema_error(e.to_string()))?;
        validate_run_artifact(&artifact)?;
        Ok(artifact)
    }

    fn encode(&self, artifact: &RunArtifact) -> Result<String> {
        validate_run_artifact(artifact)?;
        to_document(artifact)
    }

    fn validate(&self, artifact: &RunArtifact) -> std::result::Result<(), ValidationError> {
        validate_run_artifact(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tally_core::{
        EvalDef, EvalKind, EvalSummary, MetricDef, MetricScope, MetricValue, MultiTurnResult,
        Outcome, RunId, SingleTurnSeries, Summaries, ValueType, Verdict, VerdictSummary,
    };

    fn metric(name: &str, scope: MetricScope) -> MetricDef {
        MetricDef {
            name: name.into(),
            scope,
            value_type: ValueType::Number,
            description: None,
            normalization: None,
            metadata: None,
        }
    }

    fn eval(name: &str, kind: EvalKind, metric: &str) -> EvalDef {
        EvalDef {
            name: name.into(),
            kind,
            metric: metric.into(),
            scorer: None,
            verdict: None,
            description: None,
            metadata: None,
        }
    }

    fn measured(metric: &str, score: f64, verdict: Verdict) -> EvalResult {
        EvalResult {
            measurement: Measurement::new(metric, Some(MetricValue::Number(score)))
                .with_score(score),
            outcome: Some(Outcome {
                verdict,
                policy: json!({"kind": "threshold", "passAt": 0.5}),
                observed: None,
            }),
        }
    }

    fn artifact() -> RunArtifact {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut a = RunArtifact::new(RunId::new("run-1748779200000-abc1234").unwrap(), at, 2);
        a.defs.metrics.insert("helpfulness".into(), metric("helpfulness", MetricScope::Single));
        a.defs.metrics.insert("goal".into(), metric("goal", MetricScope::Multi));
        a.defs.evals.insert("helpful".into(), eval("helpful", EvalKind::SingleTurn, "helpfulness"));
        a.defs.evals.insert("goalMet".into(), eval("goalMet", EvalKind::MultiTurn, "goal"));

        let mut series = SingleTurnSeries::new("helpful", 2);
        series.set(0, measured("helpfulness", 0.9, Verdict::Pass));
        series.set(1, measured("helpfulness", 0.2, Verdict::Fail));
        a.result.single_turn.insert("helpful".into(), series);
        a.result.multi_turn.insert(
            "goalMet".into(),
            MultiTurnResult {
                eval_ref: "goalMet".into(),
                measurement: Measurement::new("goal", Some(MetricValue::Bool(true)))
                    .with_score(1.0),
                outcome: None,
            },
        );

        let mut summaries = Summaries::default();
        summaries.by_eval.insert(
            "helpful".into(),
            EvalSummary {
                eval_ref: "helpful".into(),
                kind: EvalKind::SingleTurn,
                aggregations: [("mean".to_string(), 0.55)].into_iter().collect(),
                verdict_summary: Some(VerdictSummary::from_verdicts([
                    Verdict::Pass,
                    Verdict::Fail,
                ])),
            },
        );
        a.result.summaries = Some(summaries);
        a
    }

    // ========================================================================
    // Round trip
    // ========================================================================

    #[test]
    fn test_round_trip() {
        let codec = RunArtifactCodec::new();
        let original = artifact();
        let text = codec.encode(&original).unwrap();
        let decoded = codec.decode(&text).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(
            decoded.result.single_turn["helpful"].by_step_index.len(),
            decoded.result.step_count as usize
        );
    }

    #[test]
    fn test_unknown_fields_tolerated() {
        let codec = RunArtifactCodec::new();
        let mut value: Value = serde_json::to_value(artifact()).unwrap();
        value["producer"] = json!({"name": "tally", "version": "9.9"});
        value["result"]["extra"] = json!(true);
        let decoded = codec.decode(&value.to_string()).unwrap();
        assert_eq!(decoded, artifact());
    }

    #[test]
    fn test_decode_empty_mentions_empty() {
        let codec = RunArtifactCodec::new();
        assert!(codec.decode("").unwrap_err().to_string().contains("empty"));
        assert!(codec.decode("  \n ").unwrap_err().to_string().contains("empty"));
    }

    // ========================================================================
    // Validation
    // ========================================================================

    #[test]
    fn test_wrong_schema_version_rejected() {
        let mut value: Value = serde_json::to_value(artifact()).unwrap();
        value["schemaVersion"] = json!(2);
        let err = RunArtifactCodec::new().decode(&value.to_string()).unwrap_err();
        assert!(err.to_string().contains("$.schemaVersion"));
    }

    #[test]
    fn test_all_issues_reported_together() {
        let mut a = artifact();
        a.result.step_count = 3;
        a.defs.evals.get_mut("goalMet").unwrap().metric = "missing".into();
        a.result
            .single_turn
            .get_mut("helpful")
            .unwrap()
            .by_step_index[0]
            .as_mut()
            .unwrap()
            .measurement
            .score = Some(1.5);

        let err = validate_run_artifact(&a).unwrap_err();
        assert!(err.has_issue_at("$.defs.evals.goalMet.metric"));
        assert!(err.has_issue_at("$.result.singleTurn.helpful.byStepIndex"));
        assert!(err.has_issue_at("$.result.singleTurn.helpful.byStepIndex[0].measurement.score"));
        assert_eq!(err.issues.len(), 3);

        let message = RunArtifactCodec::new().encode(&a).unwrap_err().to_string();
        assert!(message.contains("; "));
    }

    #[test]
    fn test_dangling_eval_ref_rejected() {
        let mut a = artifact();
        let series = a.result.single_turn.remove("helpful").unwrap();
        a.result.single_turn.insert("ghost".into(), SingleTurnSeries {
            eval_ref: "ghost".into(),
            ..series
        });
        let err = validate_run_artifact(&a).unwrap_err();
        assert!(err.to_string().contains("unknown eval \"ghost\""));
    }

    #[test]
    fn test_inconsistent_summary_rejected() {
        let mut a = artifact();
        if let Some(s) = a.result.summaries.as_mut() {
            let v = s.by_eval.get_mut("helpful").unwrap().verdict_summary.as_mut().unwrap();
            v.total_count = 5;
        }
        let err = validate_run_artifact(&a).unwrap_err();
        assert!(err.has_issue_at("$.result.summaries.byEval.helpful.verdictSummary.totalCount"));
        assert!(err.has_issue_at("$.result.summaries.byEval.helpful.verdictSummary.passRate"));
    }

    #[test]
    fn test_missing_required_field_is_validation_error() {
        let mut value: Value = serde_json::to_value(artifact()).unwrap();
        value.as_object_mut().unwrap().remove("runId");
        let err = RunArtifactCodec::new().decode(&value.to_string()).unwrap_err();
        assert!(matches!(err, CodecError::Validation(_)));
        assert!(err.to_string().contains("runId"));
    }
}

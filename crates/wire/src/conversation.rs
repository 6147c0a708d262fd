//! Conversation JSONL codec
//!
//! One JSON object per line, one line per step:
//!
//! ```text
//! {"conversationId":"c1","stepIndex":0,"input":{...},"output":[...],"conversationMetadata":{...}}
//! {"conversationId":"c1","stepIndex":1,"input":{...},"output":[...]}
//! ```
//!
//! A line that is not JSON fails the document. A line that is JSON but does
//! not describe a step is skipped (and logged) under the default policy.

use crate::codec::{non_empty, Codec, DecodePolicy, DecodeReport, SkippedLine};
use crate::error::{CodecError, Result};
use crate::validate::{index_path, Issues, ValidationError, ValidationIssue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::btree_map::{BTreeMap, Entry};
use std::collections::HashSet;
use tally_core::{Conversation, ConversationStep, Metadata};
use tracing::warn;

/// One persisted line of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationLine {
    /// Conversation the step belongs to
    pub conversation_id: String,
    /// The step itself
    #[serde(flatten)]
    pub step: ConversationStep,
    /// Conversation-level metadata, carried on the first line only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_metadata: Option<Metadata>,
}

/// Codec for `conversation.jsonl`
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversationCodec {
    policy: DecodePolicy,
}

impl ConversationCodec {
    /// Codec that skips schema-invalid lines
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec that rejects the document on any schema-invalid line
    pub fn strict() -> Self {
        Self::with_policy(DecodePolicy::RejectDocument)
    }

    /// Codec with an explicit policy
    pub fn with_policy(policy: DecodePolicy) -> Self {
        ConversationCodec { policy }
    }

    /// Render one step as a single JSONL line (with trailing newline)
    pub fn encode_line(
        &self,
        conversation_id: &str,
        step: &ConversationStep,
        conversation_metadata: Option<&Metadata>,
    ) -> Result<String> {
        let line = ConversationLine {
            conversation_id: conversation_id.to_string(),
            step: step.clone(),
            conversation_metadata: conversation_metadata.cloned(),
        };
        let mut out = serde_json::to_string(&line).map_err(CodecError::json)?;
        out.push('\n');
        Ok(out)
    }

    fn skip(
        &self,
        skipped: &mut Vec<SkippedLine>,
        line: usize,
        reason: String,
    ) -> Result<()> {
        match self.policy {
            DecodePolicy::SkipInvalidRecords => {
                warn!(line, reason = %reason, "skipping invalid conversation line");
                skipped.push(SkippedLine { line, reason });
                Ok(())
            }
            DecodePolicy::RejectDocument => Err(ValidationError::new(
                "conversation",
                vec![ValidationIssue::new(format!("line {}", line), reason)],
            )
            .into()),
        }
    }
}

/// Check one parsed JSONL value and convert it into a line.
pub fn validate_step_line(value: &Value) -> std::result::Result<ConversationLine, ValidationError> {
    if !value.is_object() {
        return Err(ValidationError::new(
            "conversation line",
            vec![ValidationIssue::new("$", "must be a JSON object")],
        ));
    }
    let mut issues = Issues::new("conversation line");
    match value.get("conversationId") {
        Some(Value::String(id)) => {
            issues.check(!id.trim().is_empty(), "$.conversationId", "must not be empty")
        }
        _ => issues.push("$.conversationId", "must be a string"),
    }
    if !value.get("stepIndex").map_or(false, Value::is_u64) {
        issues.push("$.stepIndex", "must be a non-negative integer");
    }
    if !value.get("input").map_or(false, Value::is_object) {
        issues.push("$.input", "must be a message object");
    }
    if !value.get("output").map_or(false, Value::is_array) {
        issues.push("$.output", "must be an array of messages");
    }
    issues.finish()?;

    serde_json::from_value(value.clone()).map_err(|e| {
        ValidationError::new(
            "conversation line",
            vec![ValidationIssue::new("$", e.to_string())],
        )
    })
}

/// Check a conversation can be persisted.
pub fn validate_conversation(
    conversation: &Conversation,
) -> std::result::Result<(), ValidationError> {
    let mut issues = Issues::new("conversation");
    issues.check(
        !conversation.id.trim().is_empty(),
        "$.id",
        "must not be empty",
    );
    issues.check(
        !conversation.steps.is_empty(),
        "$.steps",
        "must contain at least one step",
    );
    let mut seen = HashSet::new();
    for (i, step) in conversation.steps.iter().enumerate() {
        if !seen.insert(step.step_index) {
            issues.push(
                format!("{}.stepIndex", index_path("$.steps", i)),
                format!("duplicate step index {}", step.step_index),
            );
        }
    }
    issues.finish()
}

impl Codec for ConversationCodec {
    type Value = Conversation;

    const DOCUMENT: &'static str = "conversation";

    fn policy(&self) -> DecodePolicy {
        self.policy
    }

    fn decode(&self, input: &str) -> Result<Conversation> {
        self.decode_report(input).map(|report| report.value)
    }

    fn decode_report(&self, input: &str) -> Result<DecodeReport<Conversation>> {
        non_empty(input, Self::DOCUMENT)?;

        let mut conversation_id: Option<String> = None;
        let mut metadata: Option<Metadata> = None;
        let mut steps: BTreeMap<u32, ConversationStep> = BTreeMap::new();
        let mut skipped = Vec::new();

        for (idx, raw) in input.lines().enumerate() {
            let line_no = idx + 1;
            if raw.trim().is_empty() {
                continue;
            }
            let value: Value =
                serde_json::from_str(raw).map_err(|e| CodecError::json_at(line_no, e))?;

            let line = match validate_step_line(&value) {
                Ok(line) => line,
                Err(e) => {
                    self.skip(&mut skipped, line_no, e.to_string())?;
                    continue;
                }
            };

            let expected = conversation_id.get_or_insert_with(|| line.conversation_id.clone());
            if *expected != line.conversation_id {
                let reason = format!(
                    "conversationId {:?} does not match {:?}",
                    line.conversation_id, expected
                );
                self.skip(&mut skipped, line_no, reason)?;
                continue;
            }

            if metadata.is_none() {
                metadata = line.conversation_metadata;
            }

            match steps.entry(line.step.step_index) {
                Entry::Vacant(slot) => {
                    slot.insert(line.step);
                }
                Entry::Occupied(mut slot) => {
                    warn!(
                        line = line_no,
                        step_index = line.step.step_index,
                        "duplicate step index, later line wins"
                    );
                    slot.insert(line.step);
                }
            }
        }

        let Some(id) = conversation_id.filter(|_| !steps.is_empty()) else {
            return Err(CodecError::NoValidSteps {
                skipped: skipped.len(),
            });
        };

        Ok(DecodeReport {
            value: Conversation {
                id,
                steps: steps.into_values().collect(),
                metadata,
            },
            skipped,
        })
    }

    fn encode(&self, conversation: &Conversation) -> Result<String> {
        self.validate(conversation)?;

        let mut ordered: Vec<&ConversationStep> = conversation.steps.iter().collect();
        ordered.sort_by_key(|s| s.step_index);

        let mut out = String::new();
        for (i, step) in ordered.into_iter().enumerate() {
            let metadata = if i == 0 {
                conversation.metadata.as_ref()
            } else {
                None
            };
            out.push_str(&self.encode_line(&conversation.id, step, metadata)?);
        }
        Ok(out)
    }

    fn validate(&self, conversation: &Conversation) -> std::result::Result<(), ValidationError> {
        validate_conversation(conversation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tally_core::Message;

    fn sample() -> Conversation {
        let mut conv = Conversation::new("c1");
        conv.push_step(Message::user("hello"), vec![Message::assistant("hi")]);
        conv.push_step(Message::user("bye"), vec![Message::assistant("ciao")]);
        conv
    }

    fn line(conversation_id: &str, step_index: u64, text: &str) -> String {
        json!({
            "conversationId": conversation_id,
            "stepIndex": step_index,
            "input": {"role": "user", "content": text},
            "output": [{"role": "assistant", "content": "ok"}],
        })
        .to_string()
    }

    // ========================================================================
    // Empty and malformed input
    // ========================================================================

    #[test]
    fn test_decode_empty_mentions_empty() {
        let codec = ConversationCodec::new();
        for input in ["", "   ", "\n\n"] {
            let err = codec.decode(input).unwrap_err();
            assert!(err.to_string().contains("empty"), "{}", err);
        }
    }

    #[test]
    fn test_invalid_json_line_is_fatal_with_line_number() {
        let input = format!("{}\n{{not json\n", line("c1", 0, "a"));
        let err = ConversationCodec::new().decode(&input).unwrap_err();
        assert!(matches!(err, CodecError::Json { line: Some(2), .. }));
    }

    #[test]
    fn test_schema_invalid_line_is_skipped() {
        let input = format!(
            "{}\n{}\n{}\n",
            line("c1", 0, "a"),
            json!({"conversationId": "c1", "stepIndex": "one"}),
            line("c1", 1, "b"),
        );
        let report = ConversationCodec::new().decode_report(&input).unwrap();
        assert_eq!(report.value.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].line, 2);
        assert!(report.skipped[0].reason.contains("stepIndex"));
    }

    #[test]
    fn test_strict_rejects_schema_invalid_line() {
        let input = format!("{}\n{}\n", line("c1", 0, "a"), json!({"stepIndex": 1}));
        let err = ConversationCodec::strict().decode(&input).unwrap_err();
        match err {
            CodecError::Validation(v) => assert!(v.has_issue_at("line 2")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_all_lines_invalid_is_no_valid_steps() {
        let input = format!("{}\n{}\n", json!({"a": 1}), json!([1, 2]));
        let err = ConversationCodec::new().decode(&input).unwrap_err();
        assert_eq!(err, CodecError::NoValidSteps { skipped: 2 });
    }

    // ========================================================================
    // Ordering and identity
    // ========================================================================

    #[test]
    fn test_steps_sorted_and_duplicates_superseded() {
        let input = [
            line("c1", 2, "third"),
            line("c1", 0, "first"),
            line("c1", 1, "stale"),
            line("c1", 1, "second"),
        ]
        .join("\n");
        let conv = ConversationCodec::new().decode(&input).unwrap();
        let texts: Vec<String> = conv
            .steps
            .iter()
            .filter_map(|s| s.input.text())
            .collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_mismatched_conversation_id_skipped() {
        let input = [line("c1", 0, "a"), line("c2", 1, "b")].join("\n");
        let report = ConversationCodec::new().decode_report(&input).unwrap();
        assert_eq!(report.value.id, "c1");
        assert_eq!(report.value.len(), 1);
        assert!(report.skipped[0].reason.contains("c2"));
    }

    #[test]
    fn test_timestamps_and_metadata_revived() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap();
        let mut meta = Metadata::new();
        meta.insert("source".into(), json!("import"));

        let mut conv = Conversation::new("c1").with_metadata(meta.clone());
        conv.upsert_step(
            ConversationStep::new(0, Message::user("hi"), vec![]).with_timestamp(at),
        );

        let codec = ConversationCodec::new();
        let text = codec.encode(&conv).unwrap();
        assert!(text.contains("\"timestamp\":\"2025-06-01T09:30:00Z\""));
        assert!(text.contains("\"conversationMetadata\""));

        let decoded = codec.decode(&text).unwrap();
        assert_eq!(decoded.steps[0].timestamp, Some(at));
        assert_eq!(decoded.metadata, Some(meta));
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    #[test]
    fn test_encode_one_line_per_step() {
        let text = ConversationCodec::new().encode(&sample()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with('\n'));
        let first: Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(first["conversationId"], json!("c1"));
        assert_eq!(first["stepIndex"], json!(0));
    }

    #[test]
    fn test_encode_rejects_empty_and_duplicates() {
        let codec = ConversationCodec::new();
        let err = codec.encode(&Conversation::new("c1")).unwrap_err();
        assert!(err.to_string().contains("$.steps"));

        let mut conv = sample();
        conv.steps[1].step_index = 0;
        let err = codec.encode(&conv).unwrap_err();
        assert!(err.to_string().contains("duplicate step index 0"));
    }

    #[test]
    fn test_appended_lines_decode() {
        let codec = ConversationCodec::new();
        let mut text = codec.encode(&sample()).unwrap();
        let step = ConversationStep::new(2, Message::user("again"), vec![]);
        text.push_str(&codec.encode_line("c1", &step, None).unwrap());

        let conv = codec.decode(&text).unwrap();
        assert_eq!(conv.len(), 3);
        assert_eq!(conv.next_step_index(), Some(3));
    }

    #[test]
    fn test_max_step_index_decodes_without_successor() {
        let codec = ConversationCodec::new();
        let step = ConversationStep::new(u32::MAX, Message::user("last"), vec![]);
        let text = codec.encode_line("c1", &step, None).unwrap();

        let mut conv = codec.decode(&text).unwrap();
        assert_eq!(conv.step(u32::MAX).map(|s| s.step_index), Some(u32::MAX));
        assert_eq!(conv.push_step(Message::user("more"), vec![]), None);
        assert_eq!(conv.len(), 1);
    }

    mod round_trip {
        use super::*;
        use proptest::prelude::*;

        fn arb_conversation() -> impl Strategy<Value = Conversation> {
            (
                "[a-z][a-z0-9-]{0,12}",
                prop::collection::vec(("[ -~]{0,20}", "[ -~]{0,20}"), 1..8),
            )
                .prop_map(|(id, turns)| {
                    let mut conv = Conversation::new(id);
                    for (input, output) in turns {
                        conv.push_step(Message::user(input), vec![Message::assistant(output)]);
                    }
                    conv
                })
        }

        proptest! {
            #[test]
            fn test_conversation_round_trip(conv in arb_conversation()) {
                let codec = ConversationCodec::new();
                let text = codec.encode(&conv).unwrap();
                let decoded = codec.decode(&text).unwrap();
                prop_assert_eq!(decoded, conv);
            }
        }
    }
}

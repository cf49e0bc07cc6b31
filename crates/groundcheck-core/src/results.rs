use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conversation::ConversationData;
use crate::findings::{
    CompletenessFinding, DeepVerification, EscalationFinding, HallucinationFinding, QualityAssessment,
    QuestionQuality, RelevanceFinding, VerificationFinding,
};
use crate::labels::{EvaluationMode, Recommendation, Severity};

/// Everything learned about one conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResults {
    pub session_id: String,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub turn_number: u32,
    #[serde(default)]
    pub mode: EvaluationMode,
    pub success: bool,
    #[serde(default)]
    pub question_quality: Option<QuestionQuality>,
    #[serde(default)]
    pub hallucination: Option<HallucinationFinding>,
    #[serde(default)]
    pub document_relevance: Option<RelevanceFinding>,
    #[serde(default)]
    pub completeness: Option<CompletenessFinding>,
    #[serde(default)]
    pub escalation: Option<EscalationFinding>,
    #[serde(default)]
    pub verification: Option<VerificationFinding>,
    #[serde(default)]
    pub assessment: Option<QualityAssessment>,
    #[serde(default)]
    pub deep_verification: Option<DeepVerification>,
    #[serde(default)]
    pub verification_applied: bool,
    /// Agent name to error message, for agents that produced nothing.
    #[serde(default)]
    pub agent_errors: BTreeMap<String, String>,
    #[serde(default)]
    pub error: Option<String>,
    pub evaluated_at: DateTime<Utc>,
}

/// Final call on a conversation after every judge has spoken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub hallucination_detected: bool,
    pub severity: Severity,
    pub verified: bool,
    pub recommendation: Recommendation,
}

impl EvaluationResults {
    /// Creates an empty, successful result for a conversation.
    pub fn new(conversation: &ConversationData, mode: EvaluationMode) -> Self {
        Self {
            session_id: conversation.session_id.clone(),
            trace_id: conversation.trace_id.clone(),
            turn_number: conversation.turn_number,
            mode,
            success: true,
            question_quality: None,
            hallucination: None,
            document_relevance: None,
            completeness: None,
            escalation: None,
            verification: None,
            assessment: None,
            deep_verification: None,
            verification_applied: false,
            agent_errors: BTreeMap::new(),
            error: None,
            evaluated_at: Utc::now(),
        }
    }

    /// Creates a failed result carrying only the error.
    pub fn failed(conversation: &ConversationData, mode: EvaluationMode, error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::new(conversation, mode)
        }
    }

    /// Records an agent that produced no finding.
    pub fn record_agent_error(&mut self, agent: impl Into<String>, error: impl ToString) {
        self.agent_errors.insert(agent.into(), error.to_string());
    }

    /// Merges detector and verifier output into one verdict.
    ///
    /// An unconfirmed verification clears the finding; a confirmed one may
    /// move the severity. Without a verifier the recommendation follows
    /// severity: serious findings are rejected, minor ones reviewed.
    pub fn verdict(&self) -> Verdict {
        if let Some(assessment) = &self.assessment {
            let check = &assessment.hallucination_check;
            return Verdict {
                hallucination_detected: check.detected,
                severity: check.severity,
                verified: self.deep_verification.is_some(),
                recommendation: assessment.overall_quality.recommendation,
            };
        }

        let Some(finding) = &self.hallucination else {
            return Verdict::default();
        };

        let Some(verification) = &self.verification else {
            return Verdict {
                hallucination_detected: finding.hallucination_detected,
                severity: finding.severity,
                verified: false,
                recommendation: recommend(finding.hallucination_detected, finding.severity),
            };
        };

        if !verification.verified {
            return Verdict {
                hallucination_detected: false,
                severity: Severity::None,
                verified: true,
                recommendation: verification.final_recommendation,
            };
        }

        let severity = verification
            .new_severity
            .unwrap_or(finding.severity)
            .max(Severity::Minor);

        Verdict {
            hallucination_detected: true,
            severity,
            verified: true,
            recommendation: verification.final_recommendation,
        }
    }

    /// Flattens the result into one ordered record for tabular export.
    pub fn to_record(&self) -> FlatRecord {
        let mut record = FlatRecord::default();
        record.insert("session_id", Value::from(self.session_id.clone()));
        record.insert("trace_id", self.trace_id.clone().map(Value::from).unwrap_or(Value::Null));
        record.insert("turn_number", Value::from(self.turn_number));
        record.insert("mode", Value::from(self.mode.as_str()));
        record.insert("success", Value::from(self.success));
        record.insert("error", self.error.clone().map(Value::from).unwrap_or(Value::Null));

        record.extend_prefixed("qq_", &self.question_quality, 0);
        record.extend_prefixed("hall_", &self.hallucination, 0);
        record.extend_prefixed("doc_", &self.document_relevance, 0);
        record.extend_prefixed("comp_", &self.completeness, 0);
        record.extend_prefixed("esc_", &self.escalation, 0);
        record.extend_prefixed("ver_", &self.verification, 0);
        record.extend_prefixed("eval_", &self.assessment, 1);
        record.extend_prefixed("deep_", &self.deep_verification, 0);

        if !self.agent_errors.is_empty() {
            record.insert("agent_errors", serde_json::to_value(&self.agent_errors).unwrap_or(Value::Null));
        }
        record.insert("verification_applied", Value::from(self.verification_applied));
        record.insert("evaluated_at", Value::from(self.evaluated_at.to_rfc3339()));

        let verdict = self.verdict();
        record.insert("final_hallucination_detected", Value::from(verdict.hallucination_detected));
        record.insert("final_severity", Value::from(verdict.severity.as_str()));
        record.insert("final_severity_score", Value::from(verdict.severity.score()));
        record.insert("final_verified", Value::from(verdict.verified));
        record.insert("final_recommendation", Value::from(verdict.recommendation.as_str()));
        record
    }
}

fn recommend(detected: bool, severity: Severity) -> Recommendation {
    match (detected, severity.is_serious()) {
        (false, _) => Recommendation::Approve,
        (true, false) => Recommendation::Review,
        (true, true) => Recommendation::Reject,
    }
}

/// Ordered column/value pairs; lists and objects stay JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlatRecord {
    entries: Vec<(String, Value)>,
}

impl FlatRecord {
    /// Inserts or replaces a column, keeping first-insertion order.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds every field of `section` under `prefix`, descending `depth`
    /// levels into nested objects.
    fn extend_prefixed<T: Serialize>(&mut self, prefix: &str, section: &Option<T>, depth: usize) {
        let Some(section) = section else { return };
        let Ok(value) = serde_json::to_value(section) else { return };
        self.flatten(prefix, value, depth);
    }

    fn flatten(&mut self, prefix: &str, value: Value, depth: usize) {
        match value {
            Value::Object(map) => {
                for (key, inner) in map {
                    let nested = matches!(inner, Value::Object(_)) && depth > 0;
                    match nested {
                        true => self.flatten(&format!("{prefix}{key}_"), inner, depth - 1),
                        false => self.insert(format!("{prefix}{key}"), inner),
                    }
                }
            }
            other => self.insert(prefix.trim_end_matches('_'), other),
        }
    }
}

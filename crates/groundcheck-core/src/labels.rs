//! Categorical labels returned by the judges.
//!
//! Every label parses case-insensitively and never fails: an unknown or
//! missing value falls back to the label's default.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::lenient::value_to_text;

/// Wires `Display`, `FromStr` and lenient serde through `as_str` / `From<&str>`.
macro_rules! text_label {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self::from(s))
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = Value::deserialize(deserializer)?;
                Ok(Self::from(value_to_text(&raw).as_str()))
            }
        }
    };
}

/// How bad a hallucination is. Ordered from harmless to dangerous.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    #[default]
    None,
    /// Slightly imprecise wording, no practical impact.
    Minor,
    /// Wrong information that could mislead the customer.
    Major,
    /// Invented rates, amounts, contacts or procedures.
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Self::None, Self::Minor, Self::Major, Self::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Minor => "minor",
            Self::Major => "major",
            Self::Critical => "critical",
        }
    }

    /// Numeric score: none 0, minor 1, major 2, critical 3.
    pub fn score(&self) -> u8 {
        *self as u8
    }

    /// Returns true for major and critical.
    pub fn is_serious(&self) -> bool {
        *self >= Self::Major
    }
}

impl From<&str> for Severity {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "minor" | "low" | "leve" => Self::Minor,
            "major" | "medium" | "moderate" | "moderada" => Self::Major,
            "critical" | "high" | "critica" | "crítica" => Self::Critical,
            _ => Self::None,
        }
    }
}

text_label!(Severity);

/// Kind of hallucination reported by the detector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum HallucinationType {
    #[default]
    None,
    /// Information that appears in no document.
    Fabrication,
    /// Real information altered (numbers, conditions).
    Distortion,
    /// Facts from different documents combined incorrectly.
    Mixing,
    /// Statement contradicting a document.
    Contradiction,
    Other(String),
}

impl HallucinationType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "none",
            Self::Fabrication => "fabrication",
            Self::Distortion => "distortion",
            Self::Mixing => "mixing",
            Self::Contradiction => "contradiction",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for HallucinationType {
    fn from(s: &str) -> Self {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "" | "none" | "null" | "n/a" => Self::None,
            "fabrication" => Self::Fabrication,
            "distortion" => Self::Distortion,
            "mixing" | "mixed_sources" => Self::Mixing,
            "contradiction" => Self::Contradiction,
            _ => Self::Other(normalized),
        }
    }
}

text_label!(HallucinationType);

/// Grounding status of one claim in the evaluated answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ClaimStatus {
    Grounded,
    Hallucination,
    #[default]
    Unknown,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grounded => "grounded",
            Self::Hallucination => "hallucination",
            Self::Unknown => "unknown",
        }
    }
}

impl From<&str> for ClaimStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "grounded" | "supported" | "verified" => Self::Grounded,
            "hallucination" | "hallucinated" | "unsupported" | "fabricated" => Self::Hallucination,
            _ => Self::Unknown,
        }
    }
}

text_label!(ClaimStatus);

/// What should happen to the evaluated answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Recommendation {
    Approve,
    #[default]
    Review,
    Reject,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Review => "review",
            Self::Reject => "reject",
        }
    }
}

impl From<&str> for Recommendation {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "approve" | "approved" | "accept" => Self::Approve,
            "reject" | "rejected" => Self::Reject,
            _ => Self::Review,
        }
    }
}

text_label!(Recommendation);

/// Direction in which a verifier moved the detector's severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SeverityAdjustment {
    #[default]
    None,
    Increase,
    Decrease,
}

impl SeverityAdjustment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Increase => "increase",
            Self::Decrease => "decrease",
        }
    }
}

impl From<&str> for SeverityAdjustment {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "increase" | "increased" | "up" => Self::Increase,
            "decrease" | "decreased" | "down" => Self::Decrease,
            _ => Self::None,
        }
    }
}

text_label!(SeverityAdjustment);

/// Evaluation strategy used for a conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EvaluationMode {
    /// Specialized agents per dimension plus optional verification.
    #[default]
    MultiAgent,
    /// One question-aware judge call plus optional deep verification.
    Unified,
}

impl EvaluationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultiAgent => "multi_agent",
            Self::Unified => "unified",
        }
    }
}

impl From<&str> for EvaluationMode {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "unified" | "single" => Self::Unified,
            _ => Self::MultiAgent,
        }
    }
}

text_label!(EvaluationMode);

/// The judges a conversation can be put through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    QuestionQuality,
    Hallucination,
    Relevance,
    Completeness,
    Escalation,
    Verification,
    MainEvaluation,
    DeepVerification,
}

impl AgentKind {
    pub const ALL: [AgentKind; 8] = [
        Self::QuestionQuality,
        Self::Hallucination,
        Self::Relevance,
        Self::Completeness,
        Self::Escalation,
        Self::Verification,
        Self::MainEvaluation,
        Self::DeepVerification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuestionQuality => "question_quality",
            Self::Hallucination => "hallucination",
            Self::Relevance => "relevance",
            Self::Completeness => "completeness",
            Self::Escalation => "escalation",
            Self::Verification => "verification",
            Self::MainEvaluation => "main_evaluation",
            Self::DeepVerification => "deep_verification",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown agent '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_and_scores() {
        assert!(Severity::None < Severity::Minor);
        assert!(Severity::Major < Severity::Critical);
        assert_eq!(Severity::Critical.score(), 3);
        assert_eq!(Severity::None.score(), 0);
        assert!(Severity::Major.is_serious());
        assert!(!Severity::Minor.is_serious());
    }

    #[test]
    fn labels_parse_leniently() {
        let sev: Severity = serde_json::from_str("\" MAJOR \"").unwrap();
        assert_eq!(sev, Severity::Major);
        let sev: Severity = serde_json::from_str("null").unwrap();
        assert_eq!(sev, Severity::None);
        let sev: Severity = serde_json::from_str("\"catastrophic\"").unwrap();
        assert_eq!(sev, Severity::None);

        let rec: Recommendation = serde_json::from_str("\"???\"").unwrap();
        assert_eq!(rec, Recommendation::Review);

        assert_eq!(HallucinationType::from("url"), HallucinationType::Other("url".into()));
        assert_eq!(HallucinationType::from("null"), HallucinationType::None);
        assert_eq!("multi-agent".parse::<EvaluationMode>().unwrap(), EvaluationMode::MultiAgent);
        assert_eq!("unified".parse::<EvaluationMode>().unwrap(), EvaluationMode::Unified);
    }

    #[test]
    fn spanish_severities_parse_in_any_case() {
        assert_eq!(Severity::from("CRÍTICA"), Severity::Critical);
        assert_eq!(Severity::from("Crítica"), Severity::Critical);
        assert_eq!(Severity::from("LEVE"), Severity::Minor);
        assert_eq!(Severity::from("MODERADA"), Severity::Major);
    }

    #[test]
    fn labels_serialize_as_lowercase_text() {
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"critical\"");
        assert_eq!(serde_json::to_string(&EvaluationMode::MultiAgent).unwrap(), "\"multi_agent\"");
        assert_eq!(SeverityAdjustment::Decrease.to_string(), "decrease");
    }

    #[test]
    fn agent_kind_round_trips_names() {
        assert_eq!("main-evaluation".parse::<AgentKind>().unwrap(), AgentKind::MainEvaluation);
        assert!("judge".parse::<AgentKind>().is_err());
        assert_eq!(serde_json::to_string(&AgentKind::QuestionQuality).unwrap(), "\"question_quality\"");
    }
}

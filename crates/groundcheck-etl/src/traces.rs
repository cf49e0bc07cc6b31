//! Field extraction from the chatbot's JSON trace output.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use groundcheck_core::lenient::value_to_text;
use serde_json::Value;
use tracing::warn;

/// Everything the evaluation needs from one trace's `output` column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceExtraction {
    /// Knowledge-base ids cited by the bot, first-seen order, no duplicates.
    pub sources: Vec<String>,
    pub user_question: Option<String>,
    pub ai_response: Option<String>,
    pub need_expert: bool,
    pub expert_category: Option<String>,
    pub user_message_count: Option<u32>,
}

impl TraceExtraction {
    /// Parses the raw `output` column; blank or invalid JSON yields an empty extraction.
    pub fn from_output(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self::default();
        }

        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                warn!("Failed to parse trace output JSON: {}", e);
                Self::default()
            }
        }
    }

    pub fn from_value(output: &Value) -> Self {
        let structured = output.get("structured_response");

        Self {
            sources: extract_sources(output),
            user_question: first_text(&[output.get("user_question"), structured.and_then(|s| s.get("advisor_query"))]),
            ai_response: first_text(&[output.get("lastMessage"), structured.and_then(|s| s.get("answer"))]),
            need_expert: structured
                .and_then(|s| s.get("need_expert"))
                .is_some_and(truthy),
            expert_category: output.get("expert_category").map(value_to_text).filter(|s| !s.is_empty()),
            user_message_count: output
                .get("user_message_count")
                .and_then(|v| v.as_f64().or_else(|| value_to_text(v).parse().ok()))
                .filter(|n| *n >= 0.0)
                .map(|n| n as u32),
        }
    }

    /// Question, response and at least one source are all present.
    pub fn is_complete(&self) -> bool {
        self.user_question.is_some() && self.ai_response.is_some() && !self.sources.is_empty()
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && !matches!(s.to_lowercase().as_str(), "false" | "0" | "no"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Null => false,
    }
}

fn first_text(candidates: &[Option<&Value>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .filter(|v| truthy(v))
        .map(|v| value_to_text(v))
        .find(|s| !s.is_empty())
}

/// Collects `sources`, `structured_response.sources` and `expert_category`.
fn extract_sources(output: &Value) -> Vec<String> {
    let locations = [
        output.get("sources"),
        output.get("structured_response").and_then(|s| s.get("sources")),
        output.get("expert_category"),
    ];

    let mut sources: Vec<String> = Vec::new();
    for value in locations.into_iter().flatten().filter(|v| truthy(v)) {
        let items: Vec<String> = match value {
            Value::Array(items) => items.iter().map(value_to_text).collect(),
            other => vec![value_to_text(other)],
        };
        for item in items {
            if !item.is_empty() && !sources.contains(&item) {
                sources.push(item);
            }
        }
    }
    sources
}

/// Parses trace timestamps: RFC 3339, then common naive formats as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    const FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f%#z"];
    for format in FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(raw, format) {
            return Some(ts.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn extracts_fields_from_structured_response() {
        let extraction = TraceExtraction::from_value(&json!({
            "sources": [12.0, "7"],
            "structured_response": {
                "sources": ["7", 30],
                "advisor_query": "¿Cómo bloqueo mi tarjeta?",
                "answer": "Llame a la línea de atención.",
                "need_expert": true
            },
            "expert_category": "tarjetas",
            "user_message_count": 3
        }));

        assert_eq!(extraction.sources, vec!["12", "7", "30", "tarjetas"]);
        assert_eq!(extraction.user_question.as_deref(), Some("¿Cómo bloqueo mi tarjeta?"));
        assert_eq!(extraction.ai_response.as_deref(), Some("Llame a la línea de atención."));
        assert!(extraction.need_expert);
        assert_eq!(extraction.expert_category.as_deref(), Some("tarjetas"));
        assert_eq!(extraction.user_message_count, Some(3));
        assert!(extraction.is_complete());
    }

    #[test]
    fn top_level_fields_win() {
        let extraction = TraceExtraction::from_value(&json!({
            "user_question": "q1",
            "lastMessage": "a1",
            "structured_response": {"advisor_query": "q2", "answer": "a2"}
        }));
        assert_eq!(extraction.user_question.as_deref(), Some("q1"));
        assert_eq!(extraction.ai_response.as_deref(), Some("a1"));
        assert!(!extraction.is_complete());
    }

    #[test]
    fn empty_values_fall_through() {
        let extraction = TraceExtraction::from_value(&json!({
            "user_question": "",
            "structured_response": {"advisor_query": "q2", "sources": []}
        }));
        assert_eq!(extraction.user_question.as_deref(), Some("q2"));
        assert!(extraction.sources.is_empty());
    }

    #[test]
    fn invalid_json_is_empty() {
        assert_eq!(TraceExtraction::from_output("{not json"), TraceExtraction::default());
        assert_eq!(TraceExtraction::from_output("  "), TraceExtraction::default());
    }

    #[test]
    fn parses_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 9, 25, 14, 3, 7).unwrap();
        assert_eq!(parse_timestamp("2025-09-25T14:03:07Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-09-25T09:03:07-05:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-09-25 14:03:07"), Some(expected));
        assert_eq!(parse_timestamp("2025-09-25 14:03:07.000"), Some(expected));
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }
}

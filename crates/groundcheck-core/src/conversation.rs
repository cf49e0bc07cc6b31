use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One chatbot turn to be judged, with the documents the bot was shown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationData {
    pub session_id: String,
    #[serde(default)]
    pub trace_id: Option<String>,
    pub user_question: String,
    pub ai_response: String,
    /// Concatenated text of the retrieved documents.
    #[serde(default)]
    pub documents: String,
    #[serde(default)]
    pub document_ids: Vec<String>,
    #[serde(default)]
    pub escalated: bool,
    #[serde(default)]
    pub escalation_reason: Option<String>,
    #[serde(default)]
    pub prev_user_question: Option<String>,
    #[serde(default)]
    pub prev_ai_response: Option<String>,
    #[serde(default = "first_turn")]
    pub turn_number: u32,
    #[serde(default = "first_turn")]
    pub total_turns: u32,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

fn first_turn() -> u32 {
    1
}

/// The exchange immediately preceding the judged turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviousTurn<'a> {
    pub user_question: &'a str,
    pub ai_response: &'a str,
}

impl ConversationData {
    /// Creates a single-turn conversation.
    pub fn new(
        session_id: impl Into<String>,
        user_question: impl Into<String>,
        ai_response: impl Into<String>,
        documents: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_question: user_question.into(),
            ai_response: ai_response.into(),
            documents: documents.into(),
            turn_number: 1,
            total_turns: 1,
            ..Default::default()
        }
    }

    /// Attaches the previous exchange of the same session.
    pub fn with_previous_turn(mut self, question: impl Into<String>, response: impl Into<String>) -> Self {
        self.prev_user_question = Some(question.into());
        self.prev_ai_response = Some(response.into());
        self
    }

    /// Marks the conversation as handed off to a human.
    pub fn with_escalation(mut self, reason: Option<String>) -> Self {
        self.escalated = true;
        self.escalation_reason = reason;
        self
    }

    /// Previous exchange, only when both sides are present and non-blank.
    pub fn previous_turn(&self) -> Option<PreviousTurn<'_>> {
        let question = self.prev_user_question.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let response = self.prev_ai_response.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some(PreviousTurn { user_question: question, ai_response: response })
    }

    /// Escalation reason for prompts, `"Not specified"` when absent.
    pub fn escalation_reason_or_default(&self) -> &str {
        self.escalation_reason
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Not specified")
    }

    /// Whether there is anything to judge at all.
    pub fn is_evaluable(&self) -> bool {
        !self.user_question.trim().is_empty() && !self.ai_response.trim().is_empty()
    }
}

//! Judge agents: one prompt, one model call, one typed finding.

mod detector;
mod quality;
mod review;
mod single_call;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use groundcheck_core::{AgentKind, ConversationData, EvalError, QuestionQuality};
use groundcheck_llm::LlmProvider;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::prompts;

pub use detector::{HallucinationDetector, VerificationAgent};
pub use quality::QuestionQualityAgent;
pub use review::{CompletenessChecker, DocumentRelevanceChecker, EscalationValidator};
pub use single_call::{DeepVerificationAgent, MainEvaluationAgent};

/// Everything an agent may put into its prompt.
#[derive(Debug, Clone, Copy)]
pub struct AgentInput<'a> {
    pub conversation: &'a ConversationData,
    pub question_quality: Option<&'a QuestionQuality>,
    /// Earlier finding under review, for the verification agents.
    pub prior_finding: Option<&'a Value>,
}

impl<'a> AgentInput<'a> {
    pub fn new(conversation: &'a ConversationData) -> Self {
        Self { conversation, question_quality: None, prior_finding: None }
    }

    pub fn with_question_quality(mut self, quality: Option<&'a QuestionQuality>) -> Self {
        self.question_quality = quality;
        self
    }

    pub fn with_prior_finding(mut self, finding: &'a Value) -> Self {
        self.prior_finding = Some(finding);
        self
    }

    /// Slots shared by every template.
    fn base_slots(&self) -> BaseSlots {
        let conv = self.conversation;
        BaseSlots {
            history: prompts::conversation_history(conv),
            question_quality: prompts::question_quality_block(self.question_quality),
            prior_finding: self
                .prior_finding
                .map(|v| serde_json::to_string_pretty(v).unwrap_or_default())
                .unwrap_or_default(),
            escalated: if conv.escalated { "Yes" } else { "No" },
        }
    }

    /// Renders a template with the conversation fields plus shared slots.
    pub fn render(&self, template: &str) -> String {
        let conv = self.conversation;
        let slots = self.base_slots();
        prompts::render(
            template,
            &[
                ("conversation_history", slots.history.as_str()),
                ("user_question", conv.user_question.as_str()),
                ("ai_response", conv.ai_response.as_str()),
                ("documents", conv.documents.as_str()),
                ("question_quality", slots.question_quality.as_str()),
                ("escalated", slots.escalated),
                ("escalation_reason", conv.escalation_reason_or_default()),
                ("original_finding", slots.prior_finding.as_str()),
                ("initial_result", slots.prior_finding.as_str()),
            ],
        )
    }
}

struct BaseSlots {
    history: String,
    question_quality: String,
    prior_finding: String,
    escalated: &'static str,
}

/// A single judge.
///
/// Implementors provide the prompt and the parsing/repair step; [`Agent::run`]
/// does the model call and logging.
#[async_trait]
pub trait Agent: Send + Sync {
    type Output: Send;

    fn kind(&self) -> AgentKind;

    fn provider(&self) -> &Arc<dyn LlmProvider>;

    fn build_prompt(&self, input: &AgentInput<'_>) -> String;

    /// Turns the model's JSON into a consistent finding.
    fn parse(&self, value: Value) -> Result<Self::Output, EvalError>;

    async fn run(&self, input: &AgentInput<'_>) -> Result<Self::Output, EvalError> {
        let kind = self.kind();
        let provider = self.provider();
        let prompt = self.build_prompt(input);
        let start = Instant::now();

        info!("║ [{}] session {} via {}", kind, input.conversation.session_id, provider.model());
        debug!("║     Prompt: {} chars", prompt.len());

        let (value, metrics) = provider.generate_json(&prompt).await?;
        let output = self.parse(value)?;

        info!(
            "║ [{}] ✓ {:?} ({} in / {} out tokens)",
            kind,
            start.elapsed(),
            metrics.input_tokens,
            metrics.output_tokens
        );
        Ok(output)
    }
}

/// Deserializes a finding, reporting which agent produced the bad JSON.
pub(crate) fn parse_finding<T: DeserializeOwned>(kind: AgentKind, value: Value) -> Result<T, EvalError> {
    if !value.is_object() {
        return Err(EvalError::ParseError(format!("could not parse {kind} output: expected a JSON object")));
    }
    serde_json::from_value(value).map_err(|e| EvalError::ParseError(format!("could not parse {kind} output: {e}")))
}

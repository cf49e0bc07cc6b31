use std::sync::Arc;

use groundcheck_core::{AgentKind, EvalError, QuestionQuality};
use groundcheck_llm::LlmProvider;
use serde_json::Value;

use super::{parse_finding, Agent, AgentInput};
use crate::prompts;

/// Rates how clear and answerable the user's question was.
pub struct QuestionQualityAgent {
    provider: Arc<dyn LlmProvider>,
}

impl QuestionQualityAgent {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

impl Agent for QuestionQualityAgent {
    type Output = QuestionQuality;

    fn kind(&self) -> AgentKind {
        AgentKind::QuestionQuality
    }

    fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    fn build_prompt(&self, input: &AgentInput<'_>) -> String {
        input.render(prompts::QUESTION_QUALITY)
    }

    fn parse(&self, value: Value) -> Result<QuestionQuality, EvalError> {
        let mut quality: QuestionQuality = parse_finding(self.kind(), value)?;
        quality.normalize();
        Ok(quality)
    }
}

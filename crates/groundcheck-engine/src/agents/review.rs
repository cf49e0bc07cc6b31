use std::sync::Arc;

use groundcheck_core::{AgentKind, CompletenessFinding, EscalationFinding, EvalError, RelevanceFinding};
use groundcheck_llm::LlmProvider;
use serde_json::Value;

use super::{parse_finding, Agent, AgentInput};
use crate::prompts;

/// Judges whether the retrieved documents could answer the question.
pub struct DocumentRelevanceChecker {
    provider: Arc<dyn LlmProvider>,
}

impl DocumentRelevanceChecker {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

impl Agent for DocumentRelevanceChecker {
    type Output = RelevanceFinding;

    fn kind(&self) -> AgentKind {
        AgentKind::Relevance
    }

    fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    fn build_prompt(&self, input: &AgentInput<'_>) -> String {
        input.render(prompts::DOCUMENT_RELEVANCE)
    }

    fn parse(&self, value: Value) -> Result<RelevanceFinding, EvalError> {
        let mut finding: RelevanceFinding = parse_finding(self.kind(), value)?;
        finding.normalize();
        Ok(finding)
    }
}

/// Judges whether the answer used everything relevant the documents offered.
pub struct CompletenessChecker {
    provider: Arc<dyn LlmProvider>,
}

impl CompletenessChecker {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

impl Agent for CompletenessChecker {
    type Output = CompletenessFinding;

    fn kind(&self) -> AgentKind {
        AgentKind::Completeness
    }

    fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    fn build_prompt(&self, input: &AgentInput<'_>) -> String {
        input.render(prompts::COMPLETENESS)
    }

    fn parse(&self, value: Value) -> Result<CompletenessFinding, EvalError> {
        let mut finding: CompletenessFinding = parse_finding(self.kind(), value)?;
        finding.normalize();
        Ok(finding)
    }
}

/// Judges the hand-off decision.
pub struct EscalationValidator {
    provider: Arc<dyn LlmProvider>,
}

impl EscalationValidator {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

impl Agent for EscalationValidator {
    type Output = EscalationFinding;

    fn kind(&self) -> AgentKind {
        AgentKind::Escalation
    }

    fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    fn build_prompt(&self, input: &AgentInput<'_>) -> String {
        input.render(prompts::ESCALATION)
    }

    fn parse(&self, value: Value) -> Result<EscalationFinding, EvalError> {
        parse_finding(self.kind(), value)
    }
}

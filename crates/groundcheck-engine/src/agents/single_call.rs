use std::sync::Arc;

use groundcheck_core::{AgentKind, DeepVerification, EvalError, QualityAssessment, Severity};
use groundcheck_llm::LlmProvider;
use serde_json::Value;
use tracing::info;

use super::{parse_finding, Agent, AgentInput};
use crate::prompts;

/// Scores hallucination, fidelity, completeness, relevance and coherence in one call.
pub struct MainEvaluationAgent {
    provider: Arc<dyn LlmProvider>,
}

impl MainEvaluationAgent {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

impl Agent for MainEvaluationAgent {
    type Output = QualityAssessment;

    fn kind(&self) -> AgentKind {
        AgentKind::MainEvaluation
    }

    fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    fn build_prompt(&self, input: &AgentInput<'_>) -> String {
        input.render(prompts::MAIN_EVALUATION)
    }

    fn parse(&self, value: Value) -> Result<QualityAssessment, EvalError> {
        let mut assessment: QualityAssessment = parse_finding(self.kind(), value)?;
        assessment.normalize();

        let check = &assessment.hallucination_check;
        let overall = &assessment.overall_quality;
        info!(
            "║ EVALUATOR: Result = {} (score: {:.2}/5, hallucination: {})",
            overall.recommendation, overall.overall_score, check.severity
        );
        Ok(assessment)
    }
}

/// Sentence-by-sentence re-check of a suspicious single-call assessment.
pub struct DeepVerificationAgent {
    provider: Arc<dyn LlmProvider>,
}

impl DeepVerificationAgent {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

impl Agent for DeepVerificationAgent {
    type Output = DeepVerification;

    fn kind(&self) -> AgentKind {
        AgentKind::DeepVerification
    }

    fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    fn build_prompt(&self, input: &AgentInput<'_>) -> String {
        input.render(prompts::DEEP_VERIFICATION)
    }

    /// Accepts the answer either wrapped in a `verification` key or bare.
    fn parse(&self, mut value: Value) -> Result<DeepVerification, EvalError> {
        if let Some(inner) = value.get_mut("verification").filter(|v| v.is_object()) {
            value = inner.take();
        }

        let mut verification: DeepVerification = parse_finding(self.kind(), value)?;
        verification.confidence = verification.confidence.clamp(0.0, 1.0);
        verification.final_severity = match verification.final_hallucination_detected {
            false => Severity::None,
            true => verification.final_severity.max(Severity::Minor),
        };
        Ok(verification)
    }
}

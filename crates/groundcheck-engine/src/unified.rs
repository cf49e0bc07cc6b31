//! Single-call evaluation with a deep re-check for suspicious results.

use std::time::{Duration, Instant};

use groundcheck_config::EvaluatorConfig;
use groundcheck_core::{
    AgentKind, ConversationData, EvalError, EvaluationMode, EvaluationResults, QualityAssessment, QuestionQuality,
    Severity,
};
use groundcheck_llm::ProviderSet;
use tracing::{info, warn};

use crate::agents::{Agent, AgentInput, DeepVerificationAgent, MainEvaluationAgent, QuestionQualityAgent};

/// One judge scores every dimension at once; a stronger pass re-checks
/// major hallucinations and low scores.
pub struct UnifiedEvaluator {
    question_quality: QuestionQualityAgent,
    main: MainEvaluationAgent,
    deep: DeepVerificationAgent,
    question_quality_check: bool,
    low_score_threshold: f64,
    agent_timeout: Duration,
}

impl UnifiedEvaluator {
    pub fn new(providers: &ProviderSet, config: &EvaluatorConfig) -> Self {
        Self {
            question_quality: QuestionQualityAgent::new(providers.for_agent(AgentKind::QuestionQuality)),
            main: MainEvaluationAgent::new(providers.for_agent(AgentKind::MainEvaluation)),
            deep: DeepVerificationAgent::new(providers.for_agent(AgentKind::DeepVerification)),
            question_quality_check: config.question_quality_check,
            low_score_threshold: config.low_score_threshold,
            agent_timeout: config.agent_timeout(),
        }
    }

    pub fn from_config(config: &EvaluatorConfig) -> Result<Self, EvalError> {
        config.validate().map_err(|e| EvalError::Config(e.to_string()))?;
        let providers = ProviderSet::from_config(config)?;
        Ok(Self::new(&providers, config))
    }

    /// Whether an assessment warrants the deep verification pass.
    pub fn needs_deep_verification(&self, assessment: &QualityAssessment) -> bool {
        let check = &assessment.hallucination_check;
        (check.detected && check.severity >= Severity::Major)
            || assessment.overall_quality.overall_score < self.low_score_threshold
    }

    /// Evaluates one conversation; `run_verification = false` skips the deep pass.
    pub async fn evaluate_conversation(
        &self,
        conversation: &ConversationData,
        run_verification: bool,
    ) -> EvaluationResults {
        let mode = EvaluationMode::Unified;
        if !conversation.is_evaluable() {
            return EvaluationResults::failed(
                conversation,
                mode,
                EvalError::Data("conversation has no question or response".into()),
            );
        }

        let start = Instant::now();
        info!("╔══════════════════════════════════════════════════════════════");
        info!("║ UNIFIED EVALUATION: {}", conversation.session_id);
        info!("╠══════════════════════════════════════════════════════════════");

        let mut results = EvaluationResults::new(conversation, mode);

        if self.question_quality_check {
            let quality = match self.timed(self.question_quality.run(&AgentInput::new(conversation))).await {
                Ok(quality) => quality,
                Err(e) => {
                    warn!("║ ⚠ question quality failed, using neutral: {}", e);
                    results.record_agent_error(AgentKind::QuestionQuality.as_str(), &e);
                    QuestionQuality::neutral()
                }
            };
            results.question_quality = Some(quality);
        }

        let input = AgentInput::new(conversation).with_question_quality(results.question_quality.as_ref());
        let mut assessment = match self.timed(self.main.run(&input)).await {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!("║ ❌ main evaluation failed for {}: {}", conversation.session_id, e);
                info!("╚══════════════════════════════════════════════════════════════");
                let mut failed = EvaluationResults::failed(conversation, mode, &e);
                failed.question_quality = results.question_quality;
                failed.agent_errors = results.agent_errors;
                failed.record_agent_error(AgentKind::MainEvaluation.as_str(), e);
                return failed;
            }
        };

        if run_verification && self.needs_deep_verification(&assessment) {
            info!("║ Deep verification triggered (score {:.2})", assessment.overall_quality.overall_score);
            let initial = serde_json::to_value(&assessment).unwrap_or_default();
            let input = AgentInput::new(conversation).with_prior_finding(&initial);
            match self.timed(self.deep.run(&input)).await {
                Ok(verification) => {
                    assessment.apply_verification(&verification);
                    results.deep_verification = Some(verification);
                    results.verification_applied = true;
                }
                Err(e) => {
                    warn!("║ ⚠ deep verification failed, keeping initial result: {}", e);
                    results.record_agent_error(AgentKind::DeepVerification.as_str(), e);
                }
            }
        }

        let check = &assessment.hallucination_check;
        info!(
            "║ ✅ {} done in {:?}: hallucination={} severity={} recommendation={}",
            conversation.session_id,
            start.elapsed(),
            check.detected,
            check.severity,
            assessment.overall_quality.recommendation
        );
        info!("╚══════════════════════════════════════════════════════════════");

        results.assessment = Some(assessment);
        results
    }

    async fn timed<T>(&self, fut: impl std::future::Future<Output = Result<T, EvalError>>) -> Result<T, EvalError> {
        tokio::time::timeout(self.agent_timeout, fut)
            .await
            .unwrap_or(Err(EvalError::Timeout(self.agent_timeout.as_secs())))
    }
}

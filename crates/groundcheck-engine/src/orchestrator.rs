//! Multi-agent evaluation: question quality, four independent judges, then
//! verification of anything the detector flagged.

use std::future::Future;
use std::time::{Duration, Instant};

use groundcheck_config::{EvaluatorConfig, PromptVersion};
use groundcheck_core::{
    AgentKind, ConversationData, EvalError, EvaluationMode, EvaluationResults, HallucinationFinding,
    QuestionQuality, Severity,
};
use groundcheck_llm::ProviderSet;
use tracing::{info, warn};

use crate::agents::{
    Agent, AgentInput, CompletenessChecker, DocumentRelevanceChecker, EscalationValidator, HallucinationDetector,
    QuestionQualityAgent, VerificationAgent,
};

/// Knobs the orchestrator reads from [`EvaluatorConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrchestratorSettings {
    pub parallel_agents: bool,
    pub question_quality_check: bool,
    pub verification_threshold: Severity,
    pub agent_timeout: Duration,
    pub prompt_version: PromptVersion,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&EvaluatorConfig::default())
    }
}

impl From<&EvaluatorConfig> for OrchestratorSettings {
    fn from(config: &EvaluatorConfig) -> Self {
        Self {
            parallel_agents: config.parallel_agents,
            question_quality_check: config.question_quality_check,
            verification_threshold: config.verification_threshold,
            agent_timeout: config.agent_timeout(),
            prompt_version: config.prompt_version,
        }
    }
}

/// Runs every specialised judge on a conversation and assembles the results.
pub struct EvaluationOrchestrator {
    settings: OrchestratorSettings,
    question_quality: QuestionQualityAgent,
    detector: HallucinationDetector,
    relevance: DocumentRelevanceChecker,
    completeness: CompletenessChecker,
    escalation: EscalationValidator,
    verifier: VerificationAgent,
}

impl EvaluationOrchestrator {
    /// Creates the agents, each on the model tier configured for it.
    pub fn new(providers: &ProviderSet, settings: OrchestratorSettings) -> Self {
        Self {
            settings,
            question_quality: QuestionQualityAgent::new(providers.for_agent(AgentKind::QuestionQuality)),
            detector: HallucinationDetector::new(
                providers.for_agent(AgentKind::Hallucination),
                settings.prompt_version,
            ),
            relevance: DocumentRelevanceChecker::new(providers.for_agent(AgentKind::Relevance)),
            completeness: CompletenessChecker::new(providers.for_agent(AgentKind::Completeness)),
            escalation: EscalationValidator::new(providers.for_agent(AgentKind::Escalation)),
            verifier: VerificationAgent::new(providers.for_agent(AgentKind::Verification)),
        }
    }

    /// Validates the config and builds providers from it.
    pub fn from_config(config: &EvaluatorConfig) -> Result<Self, EvalError> {
        config.validate().map_err(|e| EvalError::Config(e.to_string()))?;
        let providers = ProviderSet::from_config(config)?;
        Ok(Self::new(&providers, OrchestratorSettings::from(config)))
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Evaluates one conversation. Agent failures are recorded, never raised.
    pub async fn evaluate_conversation(
        &self,
        conversation: &ConversationData,
        run_verification: bool,
    ) -> EvaluationResults {
        let mode = EvaluationMode::MultiAgent;
        if !conversation.is_evaluable() {
            warn!("Skipping {}: empty question or response", conversation.session_id);
            return EvaluationResults::failed(
                conversation,
                mode,
                EvalError::Data("conversation has no question or response".into()),
            );
        }

        let start = Instant::now();
        info!("╔══════════════════════════════════════════════════════════════");
        info!("║ EVALUATING: {} (turn {}/{})", conversation.session_id, conversation.turn_number, conversation.total_turns);
        info!("║ Question: {}...", conversation.user_question.chars().take(60).collect::<String>());
        info!("╠══════════════════════════════════════════════════════════════");

        let mut results = EvaluationResults::new(conversation, mode);

        // Stage 0
        if self.settings.question_quality_check {
            let outcome = self.with_timeout(self.question_quality.run(&AgentInput::new(conversation))).await;
            let quality = settle(&mut results, AgentKind::QuestionQuality, outcome).unwrap_or_else(QuestionQuality::neutral);
            results.question_quality = Some(quality);
        }

        // Stage 1
        let input = AgentInput::new(conversation).with_question_quality(results.question_quality.as_ref());
        let (hallucination, relevance, completeness, escalation) = if self.settings.parallel_agents {
            info!("║ PARALLEL EXECUTION: hallucination, relevance, completeness, escalation");
            futures::join!(
                self.with_timeout(self.detector.run(&input)),
                self.with_timeout(self.relevance.run(&input)),
                self.with_timeout(self.completeness.run(&input)),
                self.with_timeout(self.escalation.run(&input)),
            )
        } else {
            (
                self.with_timeout(self.detector.run(&input)).await,
                self.with_timeout(self.relevance.run(&input)).await,
                self.with_timeout(self.completeness.run(&input)).await,
                self.with_timeout(self.escalation.run(&input)).await,
            )
        };

        results.hallucination = settle(&mut results, AgentKind::Hallucination, hallucination);
        results.document_relevance = settle(&mut results, AgentKind::Relevance, relevance);
        results.completeness = settle(&mut results, AgentKind::Completeness, completeness);
        results.escalation = settle(&mut results, AgentKind::Escalation, escalation);

        // Stage 2
        if let Some(finding) = results.hallucination.as_ref().filter(|f| run_verification && self.needs_verification(f)) {
            info!("║ Running verification for {} hallucination...", finding.severity);
            let input = AgentInput::new(conversation);
            let outcome = self.with_timeout(self.verifier.verify(input, finding)).await;
            if let Some(verification) = settle(&mut results, AgentKind::Verification, outcome) {
                results.verification = Some(verification);
                results.verification_applied = true;
            }
        }

        let verdict = results.verdict();
        info!("╠══════════════════════════════════════════════════════════════");
        info!(
            "║ ✅ {} done in {:?}: hallucination={} severity={} recommendation={}",
            conversation.session_id,
            start.elapsed(),
            verdict.hallucination_detected,
            verdict.severity,
            verdict.recommendation
        );
        if !results.agent_errors.is_empty() {
            info!("║ Agent errors: {:?}", results.agent_errors.keys().collect::<Vec<_>>());
        }
        info!("╚══════════════════════════════════════════════════════════════");

        results
    }

    /// Whether a detector finding is serious enough for a second opinion.
    pub fn needs_verification(&self, finding: &HallucinationFinding) -> bool {
        finding.hallucination_detected && finding.severity >= self.settings.verification_threshold
    }

    async fn with_timeout<T>(&self, fut: impl Future<Output = Result<T, EvalError>>) -> Result<T, EvalError> {
        let limit = self.settings.agent_timeout;
        tokio::time::timeout(limit, fut)
            .await
            .unwrap_or(Err(EvalError::Timeout(limit.as_secs())))
    }
}

/// Keeps an agent's output, or records why there is none.
fn settle<T>(results: &mut EvaluationResults, agent: AgentKind, outcome: Result<T, EvalError>) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("║ ⚠ {} agent failed: {}", agent, e);
            results.record_agent_error(agent.as_str(), e);
            None
        }
    }
}

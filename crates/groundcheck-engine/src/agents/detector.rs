use std::sync::Arc;

use groundcheck_config::PromptVersion;
use groundcheck_core::{AgentKind, EvalError, HallucinationFinding, Severity, VerificationFinding};
use groundcheck_llm::LlmProvider;
use serde_json::Value;
use tracing::{info, warn};

use super::{parse_finding, Agent, AgentInput};
use crate::prompts;

/// Lists the answer's claims and checks each one against the documents.
pub struct HallucinationDetector {
    provider: Arc<dyn LlmProvider>,
    version: PromptVersion,
}

impl HallucinationDetector {
    pub fn new(provider: Arc<dyn LlmProvider>, version: PromptVersion) -> Self {
        Self { provider, version }
    }

    pub fn version(&self) -> PromptVersion {
        self.version
    }
}

impl Agent for HallucinationDetector {
    type Output = HallucinationFinding;

    fn kind(&self) -> AgentKind {
        AgentKind::Hallucination
    }

    fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    fn build_prompt(&self, input: &AgentInput<'_>) -> String {
        input.render(prompts::hallucination_template(self.version))
    }

    fn parse(&self, value: Value) -> Result<HallucinationFinding, EvalError> {
        let mut finding: HallucinationFinding = parse_finding(self.kind(), value)?;
        finding.reconcile();

        if finding.severity.is_serious() {
            warn!(
                "║ 🚨 {} hallucination detected! Type: {}, Claims: {}/{}",
                finding.severity.as_str().to_uppercase(),
                finding.hallucination_type,
                finding.hallucinated_claims,
                finding.total_claims
            );
        }
        Ok(finding)
    }
}

/// Second opinion on a detector finding, to weed out false positives.
pub struct VerificationAgent {
    provider: Arc<dyn LlmProvider>,
}

impl VerificationAgent {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Severity of the finding under review, read from the prompt input.
    fn original_severity(input: &AgentInput<'_>) -> Severity {
        input
            .prior_finding
            .and_then(|f| f.get("severity"))
            .and_then(Value::as_str)
            .map(Severity::from)
            .unwrap_or_default()
    }
}

impl Agent for VerificationAgent {
    type Output = VerificationFinding;

    fn kind(&self) -> AgentKind {
        AgentKind::Verification
    }

    fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    fn build_prompt(&self, input: &AgentInput<'_>) -> String {
        input.render(prompts::VERIFICATION)
    }

    fn parse(&self, value: Value) -> Result<VerificationFinding, EvalError> {
        parse_finding(self.kind(), value)
    }
}

impl VerificationAgent {
    /// Runs the verifier on `finding` and fills a missing new severity from it.
    pub async fn verify(
        &self,
        input: AgentInput<'_>,
        finding: &HallucinationFinding,
    ) -> Result<VerificationFinding, EvalError> {
        let prior = serde_json::to_value(finding)?;
        let input = input.with_prior_finding(&prior);
        let original = Self::original_severity(&input);

        let mut verification = self.run(&input).await?;
        verification.normalize(original);

        info!(
            "║ [verification] verified={} severity {} -> {} ({})",
            verification.verified,
            original,
            verification.new_severity.unwrap_or(original),
            verification.final_recommendation
        );
        Ok(verification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use groundcheck_core::{HallucinationType, Recommendation};
    use groundcheck_llm::LlmResponse;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Silent;

    #[async_trait]
    impl LlmProvider for Silent {
        fn name(&self) -> &str {
            "silent"
        }
        fn model(&self) -> &str {
            "silent"
        }
        async fn generate(&self, _prompt: &str) -> Result<LlmResponse, EvalError> {
            Err(EvalError::LlmError("unused".into()))
        }
    }

    #[test]
    fn detector_overrides_unsupported_verdict() {
        let detector = HallucinationDetector::new(Arc::new(Silent), PromptVersion::V1);
        let finding = detector
            .parse(json!({
                "hallucination_detected": true,
                "severity": "critical",
                "hallucination_type": "fabrication",
                "evidence": [{"claim": "La tasa es 2%", "status": "grounded"}],
                "confidence": 1.4
            }))
            .unwrap();

        assert!(!finding.hallucination_detected);
        assert_eq!(finding.severity, Severity::None);
        assert_eq!(finding.hallucination_type, HallucinationType::None);
        assert_eq!(finding.grounding_ratio, 1.0);
        assert_eq!(finding.confidence, 1.0);
    }

    #[test]
    fn detector_promotes_flagged_claims() {
        let detector = HallucinationDetector::new(Arc::new(Silent), PromptVersion::V2);
        let finding = detector
            .parse(json!({
                "hallucination_detected": "false",
                "evidence": ["Llame al 01-8000-INVENTADO", {"claim": "ok", "status": "grounded"}]
            }))
            .unwrap();

        assert!(finding.hallucination_detected);
        assert_eq!(finding.severity, Severity::Minor);
        assert_eq!(finding.hallucination_type, HallucinationType::Fabrication);
        assert_eq!((finding.hallucinated_claims, finding.total_claims), (1, 2));
    }

    #[test]
    fn detector_prompt_follows_version() {
        let conv = groundcheck_core::ConversationData::new("s", "q", "a", "d");
        let strict = HallucinationDetector::new(Arc::new(Silent), PromptVersion::V2);
        assert!(strict.build_prompt(&AgentInput::new(&conv)).contains("STRICT AUDITOR"));
    }

    #[test]
    fn verification_reads_original_severity() {
        let prior = json!({"severity": "major"});
        let conv = groundcheck_core::ConversationData::new("s", "q", "a", "d");
        let input = AgentInput::new(&conv).with_prior_finding(&prior);
        assert_eq!(VerificationAgent::original_severity(&input), Severity::Major);

        let verifier = VerificationAgent::new(Arc::new(Silent));
        let mut parsed = verifier.parse(json!({"verified": true, "final_recommendation": "reject"})).unwrap();
        parsed.normalize(Severity::Major);
        assert_eq!(parsed.new_severity, Some(Severity::Major));
        assert_eq!(parsed.final_recommendation, Recommendation::Reject);
    }
}

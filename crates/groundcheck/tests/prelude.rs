use std::sync::Arc;

use async_trait::async_trait;
use groundcheck::prelude::*;
use groundcheck::LlmMetrics;
use serde_json::json;

/// Always answers with the same clean single-call assessment.
struct CleanJudge;

#[async_trait]
impl LlmProvider for CleanJudge {
    fn name(&self) -> &str {
        "clean"
    }

    fn model(&self) -> &str {
        "clean-judge"
    }

    async fn generate(&self, _prompt: &str) -> Result<LlmResponse, EvalError> {
        let content = json!({
            "hallucination_check": {"detected": false, "evidence": []},
            "fidelity_score": {"score": 5, "total_claims": 2, "supported_claims": 2},
            "completeness": {"score": 5},
            "relevance": {"score": 5},
            "coherence": {"score": 5},
            "overall_quality": {"overall_score": 5.0, "recommendation": "approve"}
        });
        Ok(LlmResponse { content: content.to_string(), metrics: LlmMetrics::default() })
    }
}

#[tokio::test]
async fn prelude_runs_a_unified_batch_end_to_end() {
    let config = EvaluatorConfig {
        mode: EvaluationMode::Unified,
        question_quality_check: false,
        ..Default::default()
    };
    let providers = ProviderSet::uniform(Arc::new(CleanJudge));
    let evaluator = Arc::new(Evaluator::new(&providers, &config));
    let conversations = vec![ConversationData::new(
        "s-1",
        "¿Cuál es el horario de atención?",
        "De lunes a viernes de 8 a 5.",
        "Documento 3: Horarios\nLunes a viernes de 8:00 a 17:00",
    )];

    let results = evaluate_batch(evaluator, conversations, true, 1).await;

    assert_eq!(results.len(), 1);
    assert!(results[0].success);
    assert_eq!(results[0].verdict().recommendation, Recommendation::Approve);

    let report = QualityReport::from_results(&results);
    assert_eq!(report.successful, 1);
    assert_eq!(report.hallucinations, 0);
    assert!((report.avg_grounding_ratio - 1.0).abs() < 1e-9);
}

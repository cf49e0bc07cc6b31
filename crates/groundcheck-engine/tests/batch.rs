mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use groundcheck_config::EvaluatorConfig;
use groundcheck_core::{ConversationData, EvaluationMode};
use groundcheck_engine::{evaluate_batch, Evaluator};
use groundcheck_llm::ProviderSet;
use pretty_assertions::assert_eq;
use serde_json::json;

fn unified_config() -> EvaluatorConfig {
    EvaluatorConfig {
        mode: EvaluationMode::Unified,
        question_quality_check: false,
        ..Default::default()
    }
}

fn good_assessment() -> serde_json::Value {
    json!({
        "hallucination_check": {"detected": false, "evidence": []},
        "fidelity_score": {"score": 5},
        "completeness": {"score": 5},
        "relevance": {"score": 5},
        "coherence": {"score": 5},
        "overall_quality": {"overall_score": 5.0, "recommendation": "approve"}
    })
}

fn conversations(n: usize) -> Vec<ConversationData> {
    (0..n)
        .map(|i| ConversationData::new(format!("s{i}"), format!("question {i}"), "answer", "Documento 1: A\ntext"))
        .collect()
}

#[tokio::test]
async fn preserves_order_and_bounds_concurrency() {
    let provider = ScriptedProvider::new()
        .json(MAIN_EVALUATION, good_assessment())
        .with_delay(Duration::from_millis(20))
        .into_arc();
    let config = unified_config();
    let evaluator = Arc::new(Evaluator::new(&ProviderSet::uniform(provider.clone()), &config));
    assert_eq!(evaluator.mode(), EvaluationMode::Unified);

    let results = evaluate_batch(evaluator, conversations(12), true, 2).await;

    let ids: Vec<&str> = results.iter().map(|r| r.session_id.as_str()).collect();
    let expected: Vec<String> = (0..12).map(|i| format!("s{i}")).collect();
    assert_eq!(ids, expected.iter().map(String::as_str).collect::<Vec<_>>());
    assert!(results.iter().all(|r| r.success));
    assert!(provider.max_in_flight() <= 2);
    assert_eq!(provider.count(MAIN_EVALUATION), 12);
}

#[tokio::test]
async fn panicking_task_becomes_failed_result() {
    let provider = ScriptedProvider::new()
        .on("question 1", Reply::Panic)
        .json(MAIN_EVALUATION, good_assessment())
        .into_arc();
    let evaluator = Arc::new(Evaluator::new(&ProviderSet::uniform(provider), &unified_config()));

    let results = evaluate_batch(evaluator, conversations(3), true, 3).await;

    assert_eq!(results.len(), 3);
    assert!(results[0].success);
    assert!(!results[1].success);
    assert_eq!(results[1].session_id, "s1");
    assert!(results[1].error.as_deref().unwrap_or_default().contains("evaluation task failed"));
    assert!(results[2].success);
}

#[tokio::test]
async fn multi_agent_mode_is_default() {
    let provider = ScriptedProvider::new().into_arc();
    let evaluator = Evaluator::new(&ProviderSet::uniform(provider), &EvaluatorConfig::default());
    assert_eq!(evaluator.mode(), EvaluationMode::MultiAgent);
}

#[tokio::test]
async fn empty_batch_is_empty() {
    let provider = ScriptedProvider::new().into_arc();
    let evaluator = Arc::new(Evaluator::new(&ProviderSet::uniform(provider), &unified_config()));
    assert!(evaluate_batch(evaluator, Vec::new(), true, 3).await.is_empty());
}

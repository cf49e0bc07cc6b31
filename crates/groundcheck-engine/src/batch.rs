//! Mode dispatch and bounded-concurrency batch evaluation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use groundcheck_config::EvaluatorConfig;
use groundcheck_core::{ConversationData, EvalError, EvaluationMode, EvaluationResults};
use groundcheck_llm::ProviderSet;
use tracing::{error, info};

use crate::orchestrator::{EvaluationOrchestrator, OrchestratorSettings};
use crate::unified::UnifiedEvaluator;

const PROGRESS_EVERY: usize = 10;

/// Either evaluation strategy behind one interface.
pub enum Evaluator {
    MultiAgent(EvaluationOrchestrator),
    Unified(UnifiedEvaluator),
}

impl Evaluator {
    /// Builds the evaluator for `config.mode` on the given providers.
    pub fn new(providers: &ProviderSet, config: &EvaluatorConfig) -> Self {
        match config.mode {
            EvaluationMode::MultiAgent => {
                Self::MultiAgent(EvaluationOrchestrator::new(providers, OrchestratorSettings::from(config)))
            }
            EvaluationMode::Unified => Self::Unified(UnifiedEvaluator::new(providers, config)),
        }
    }

    /// Validates the config, builds providers, then the evaluator.
    pub fn from_config(config: &EvaluatorConfig) -> Result<Self, EvalError> {
        config.validate().map_err(|e| EvalError::Config(e.to_string()))?;
        let providers = ProviderSet::from_config(config)?;
        Ok(Self::new(&providers, config))
    }

    pub fn mode(&self) -> EvaluationMode {
        match self {
            Self::MultiAgent(_) => EvaluationMode::MultiAgent,
            Self::Unified(_) => EvaluationMode::Unified,
        }
    }

    pub async fn evaluate_conversation(
        &self,
        conversation: &ConversationData,
        run_verification: bool,
    ) -> EvaluationResults {
        match self {
            Self::MultiAgent(orchestrator) => orchestrator.evaluate_conversation(conversation, run_verification).await,
            Self::Unified(unified) => unified.evaluate_conversation(conversation, run_verification).await,
        }
    }
}

/// Evaluates conversations with at most `max_workers` in flight.
///
/// Results come back in input order. A task that panics or fails becomes a
/// failed [`EvaluationResults`]; the batch itself never fails.
pub async fn evaluate_batch(
    evaluator: Arc<Evaluator>,
    conversations: Vec<ConversationData>,
    run_verification: bool,
    max_workers: usize,
) -> Vec<EvaluationResults> {
    let total = conversations.len();
    let workers = max_workers.max(1);
    let mode = evaluator.mode();
    let completed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    info!("╔══════════════════════════════════════════════════════════════");
    info!("║ BATCH: {} conversations, {} workers, mode {}", total, workers, mode);
    info!("╚══════════════════════════════════════════════════════════════");

    let results: Vec<EvaluationResults> = stream::iter(conversations)
        .map(|conversation| {
            let evaluator = Arc::clone(&evaluator);
            let completed = Arc::clone(&completed);
            async move {
                let task = tokio::spawn({
                    let conversation = conversation.clone();
                    async move { evaluator.evaluate_conversation(&conversation, run_verification).await }
                });

                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => {
                        error!("Failed to evaluate {}: {}", conversation.session_id, e);
                        EvaluationResults::failed(&conversation, mode, format!("evaluation task failed: {e}"))
                    }
                };

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if done % PROGRESS_EVERY == 0 {
                    info!("Progress: {}/{} completed", done, total);
                }
                result
            }
        })
        .buffered(workers)
        .collect()
        .await;

    let successful = results.iter().filter(|r| r.success).count();
    info!(
        "✅ Batch evaluation completed: {}/{} successful in {:?}",
        successful,
        results.len(),
        start.elapsed()
    );
    results
}

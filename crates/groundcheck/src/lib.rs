//! # groundcheck — LLM judges for document-grounded chatbots
//!
//! groundcheck reads a chatbot's conversation exports, rebuilds each turn
//! together with the knowledge-base documents it was shown, and asks a panel
//! of LLM judges whether the answer is grounded in those documents.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use groundcheck::prelude::*;
//!
//! let config = EvaluatorConfig::from_env();
//! let dataset = groundcheck::etl::load_conversations(&config.data_paths())?;
//!
//! let evaluator = Arc::new(Evaluator::from_config(&config)?);
//! let results = evaluate_batch(evaluator, dataset.conversations, true, config.max_workers).await;
//!
//! println!("{}", QualityReport::from_results(&results));
//! ```
//!
//! ## Crate Structure
//!
//! | Crate | Description |
//! |-------|-------------|
//! | [`groundcheck_core`] | Conversations, findings, results, error types |
//! | [`groundcheck_config`] | Evaluator configuration, env and JSON loading |
//! | [`groundcheck_llm`] | Gemini, Vertex AI and OpenAI-compatible judge clients |
//! | [`groundcheck_engine`] | Agents, multi-agent orchestrator, unified evaluator, batching |
//! | `groundcheck_etl` | CSV loading and trace/knowledge-base merging (feature `etl`) |
//! | `groundcheck_report` | CSV/JSON export, summaries, A/B and pattern analysis (feature `report`) |
//!
//! ## Evaluation Modes
//!
//! - `MultiAgent` — Question quality, four independent judges, then verification
//! - `Unified` — One judge for every dimension, deep re-check when suspicious

// Re-export core types
pub use groundcheck_core::{
    AgentKind, ConversationData, EvalError, EvaluationMode, EvaluationResults, FlatRecord, HallucinationFinding,
    QualityAssessment, QuestionQuality, Recommendation, Severity, Verdict,
};

// Re-export config
pub use groundcheck_config::{ConfigError, EvaluatorConfig, ModelTier, PromptVersion, ProviderKind};

// Re-export engine
pub use groundcheck_engine::{
    evaluate_batch, Agent, AgentInput, EvaluationOrchestrator, Evaluator, OrchestratorSettings, UnifiedEvaluator,
};

// Re-export LLM clients
pub use groundcheck_llm::{
    GeminiClient, GenerationSettings, LlmMetrics, LlmProvider, LlmResponse, ModelInfo, ProviderSet, UnifiedLlmClient,
};

#[cfg(feature = "etl")]
pub use groundcheck_etl as etl;

#[cfg(feature = "report")]
pub use groundcheck_report as report;

// Backend-specific clients (use UnifiedLlmClient or ProviderSet instead)
#[doc(hidden)]
pub use groundcheck_llm::{GuardedProvider, LlmClient, VertexClient};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use groundcheck::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::{ConversationData, EvalError, EvaluationMode, EvaluationResults, Recommendation, Severity};

    // Config
    pub use crate::{EvaluatorConfig, PromptVersion, ProviderKind};

    // Engine
    pub use crate::{evaluate_batch, Evaluator};

    // LLM
    pub use crate::{LlmProvider, LlmResponse, ProviderSet};

    // Reporting
    #[cfg(feature = "report")]
    pub use groundcheck_report::{export, AbComparison, PatternAnalysis, QualityReport};
}

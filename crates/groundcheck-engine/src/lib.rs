//! Evaluation engine for groundcheck.
//!
//! This crate turns conversations into judged results:
//!
//! - [`EvaluationOrchestrator`] — Multi-agent mode: four specialised judges plus verification
//! - [`UnifiedEvaluator`] — Single-call mode with a deep re-check of suspicious results
//! - [`Evaluator`] — Picks one of the two from configuration
//! - [`evaluate_batch`] — Bounded-concurrency evaluation of many conversations
//! - [`agents`] — The individual judges behind the [`Agent`] trait
//! - [`prompts`] — Prompt templates and the slot renderer
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use groundcheck_config::EvaluatorConfig;
//! use groundcheck_engine::{evaluate_batch, Evaluator};
//!
//! let config = EvaluatorConfig::from_env();
//! let evaluator = Arc::new(Evaluator::from_config(&config)?);
//! let results = evaluate_batch(evaluator, conversations, true, config.max_workers).await;
//! ```
//!
//! # Execution Model
//!
//! Multi-agent mode runs in three stages:
//!
//! 0. **Question quality** — How clear the question was; a neutral rating on failure
//! 1. **Independent judges** — Hallucination, relevance, completeness and escalation,
//!    concurrently via `futures::join!`, each under its own timeout
//! 2. **Verification** — Only when the detector flags a hallucination at or
//!    above the configured severity
//!
//! A failing judge is recorded in `agent_errors`; the conversation still
//! gets a result.

pub mod agents;
mod batch;
mod orchestrator;
pub mod prompts;
mod unified;

pub use agents::{Agent, AgentInput};
pub use batch::{evaluate_batch, Evaluator};
pub use orchestrator::{EvaluationOrchestrator, OrchestratorSettings};
pub use unified::UnifiedEvaluator;

//! LLM client abstractions for the Gemini, Vertex AI and OpenAI-compatible APIs.
//!
//! Every judge talks to a model through one trait:
//!
//! - [`LlmProvider`] — `generate(prompt)` plus JSON extraction via `generate_json`
//! - [`GeminiClient`] — Generative Language API with an API key
//! - [`VertexClient`] — Vertex AI with a bearer token
//! - [`LlmClient`] — OpenAI-compatible endpoints (also works with Ollama)
//! - [`UnifiedLlmClient`] — Picks one of the above from [`EvaluatorConfig`]
//! - [`GuardedProvider`] — Adds pacing, per-call timeout and retries
//! - [`ProviderSet`] — Flash and pro providers, handed out per agent
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use groundcheck_llm::{LlmProvider, ProviderSet};
//! use groundcheck_core::AgentKind;
//!
//! let providers = ProviderSet::from_config(&config)?;
//! let judge = providers.for_agent(AgentKind::Hallucination);
//! let (json, metrics) = judge.generate_json("Return {\"ok\": true}").await?;
//! ```
//!
//! # Failure Handling
//!
//! Transport errors, timeouts, HTTP 429/5xx and empty completions are retried
//! with exponential backoff (1s, 2s, 4s, ...). Client errors and safety blocks
//! fail immediately. Unparseable output surfaces as
//! [`EvalError::ParseError`](groundcheck_core::EvalError::ParseError).
//!
//! [`EvaluatorConfig`]: groundcheck_config::EvaluatorConfig

mod client;
mod factory;
mod gemini;
mod google;
mod provider;
mod retry;
mod unified;
mod vertex;

pub use client::LlmClient;
pub use factory::ProviderSet;
pub use gemini::{GeminiClient, ModelInfo};
pub use provider::{extract_json, GenerationSettings, LlmMetrics, LlmProvider, LlmResponse};
pub use retry::{GuardedProvider, RateLimiter, RetryPolicy};
pub use unified::UnifiedLlmClient;
pub use vertex::VertexClient;

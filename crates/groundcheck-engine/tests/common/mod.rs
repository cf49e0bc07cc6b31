//! Scripted in-memory judge for engine tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use groundcheck_core::EvalError;
use groundcheck_llm::{LlmMetrics, LlmProvider, LlmResponse};
use serde_json::Value;

/// Text that identifies each judge's prompt.
pub const QUESTION_QUALITY: &str = "QUALITY of a question";
pub const DETECTOR_V1: &str = "CRITICAL EVALUATOR";
pub const DETECTOR_V2: &str = "STRICT AUDITOR";
pub const RELEVANCE: &str = "retrieved documents can answer";
pub const COMPLETENESS: &str = "response is complete given";
pub const ESCALATION: &str = "decision to escalate";
pub const VERIFICATION: &str = "VERIFICATION AGENT";
pub const MAIN_EVALUATION: &str = "expert evaluator of an internal";
pub const DEEP_VERIFICATION: &str = "ALERT: this conversation";

#[derive(Clone)]
pub enum Reply {
    Json(Value),
    Text(String),
    Fail(String),
    Slow(Duration),
    Panic,
}

/// Answers each prompt with the reply registered for the first marker it contains.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Vec<(&'static str, Reply)>,
    calls: Mutex<Vec<&'static str>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, marker: &'static str, reply: Reply) -> Self {
        self.script.push((marker, reply));
        self
    }

    pub fn json(self, marker: &'static str, value: Value) -> Self {
        self.on(marker, Reply::Json(value))
    }

    /// Delays every reply, to make concurrent calls overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, marker: &str) -> usize {
        self.calls().iter().filter(|m| **m == marker).count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-judge"
    }

    async fn generate(&self, prompt: &str) -> Result<LlmResponse, EvalError> {
        let Some((marker, reply)) = self.script.iter().find(|(m, _)| prompt.contains(m)).cloned() else {
            return Err(EvalError::LlmError("no scripted reply for prompt".into()));
        };
        self.calls.lock().unwrap().push(marker);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let content = match reply {
            Reply::Json(value) => value.to_string(),
            Reply::Text(text) => text,
            Reply::Fail(message) => return Err(EvalError::Http { provider: "scripted".into(), status: 400, body: message }),
            Reply::Slow(duration) => {
                tokio::time::sleep(duration).await;
                "{}".to_string()
            }
            Reply::Panic => panic!("scripted panic"),
        };

        Ok(LlmResponse { content, metrics: LlmMetrics { input_tokens: 10, output_tokens: 5, elapsed_ms: 1 } })
    }
}

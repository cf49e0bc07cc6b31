//! Provider trait and JSON extraction shared by every backend.

use async_trait::async_trait;
use groundcheck_config::EvaluatorConfig;
use groundcheck_core::EvalError;
use serde_json::Value;
use tracing::debug;

/// Token usage and timing metrics from an LLM call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlmMetrics {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub elapsed_ms: u64,
}

/// Complete response from an LLM call.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub metrics: LlmMetrics,
}

/// Sampling settings sent with every judge request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self { temperature: 0.1, max_output_tokens: 4096 }
    }
}

impl From<&EvaluatorConfig> for GenerationSettings {
    fn from(config: &EvaluatorConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

/// A judge model: text prompt in, text (ideally JSON) out.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Backend name for logs, e.g. `gemini`.
    fn name(&self) -> &str;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Sends one prompt and returns the raw completion.
    async fn generate(&self, prompt: &str) -> Result<LlmResponse, EvalError>;

    /// Sends one prompt and parses the completion as JSON.
    async fn generate_json(&self, prompt: &str) -> Result<(Value, LlmMetrics), EvalError> {
        let response = self.generate(prompt).await?;
        debug!("Structured response: {}", response.content);
        let value = extract_json(&response.content)?;
        Ok((value, response.metrics))
    }
}

/// Pulls a JSON document out of model output.
///
/// Looks inside a ```` ```json ```` fence first, then any ```` ``` ```` fence,
/// then the raw text, and finally the outermost `{...}` span.
pub fn extract_json(content: &str) -> Result<Value, EvalError> {
    let candidate = fenced_block(content).unwrap_or(content).trim();

    let first_error = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let braces = candidate
        .find('{')
        .zip(candidate.rfind('}'))
        .filter(|(start, end)| start < end)
        .map(|(start, end)| &candidate[start..=end]);

    if let Some(value) = braces.and_then(|span| serde_json::from_str::<Value>(span).ok()) {
        return Ok(value);
    }

    let preview: String = content.chars().take(200).collect();
    Err(EvalError::ParseError(format!(
        "Invalid JSON response from LLM: {} - content: {}",
        first_error, preview
    )))
}

fn fenced_block(content: &str) -> Option<&str> {
    if let Some(start) = content.find("```json") {
        let rest = &content[start + "```json".len()..];
        return Some(rest.find("```").map_or(rest, |end| &rest[..end]));
    }

    let start = content.find("```")?;
    let rest = &content[start + 3..];
    let end = rest.find("```")?;
    let block = &rest[..end];
    // Drop a language tag such as ```JSON or ```javascript
    match block.find('\n') {
        Some(newline) if !block[..newline].trim_start().starts_with(['{', '[']) => Some(&block[newline + 1..]),
        _ => Some(block),
    }
}

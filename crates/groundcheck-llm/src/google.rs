//! `generateContent` wire format shared by the Gemini and Vertex AI APIs.

use groundcheck_core::EvalError;
use reqwest::Response;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::provider::{GenerationSettings, LlmMetrics, LlmResponse};

/// Finish reasons that mean the model refused rather than ran dry.
const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "RECITATION", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII"];

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// Single user turn asking for a JSON answer.
    pub(crate) fn json_prompt(prompt: &str, settings: GenerationSettings) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part { text: Some(prompt.to_string()) }],
            }],
            generation_config: GenerationConfig {
                temperature: settings.temperature,
                max_output_tokens: settings.max_output_tokens,
                response_mime_type: "application/json",
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Joins the first candidate's text parts; empty text is an error.
    pub(crate) fn into_llm_response(self, provider: &str, elapsed_ms: u64) -> Result<LlmResponse, EvalError> {
        let (input_tokens, output_tokens) = self
            .usage_metadata
            .as_ref()
            .map(|u| (u.prompt_token_count.unwrap_or(0), u.candidates_token_count.unwrap_or(0)))
            .unwrap_or((0, 0));

        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);
        let candidate = self.candidates.into_iter().next();
        let finish_reason = candidate.as_ref().and_then(|c| c.finish_reason.clone());

        let content = candidate
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        if content.trim().is_empty() {
            let refusal = block_reason.or_else(|| {
                finish_reason.filter(|r| BLOCKING_FINISH_REASONS.contains(&r.as_str()))
            });
            warn!("{}: empty response (block reason: {:?})", provider, refusal);
            return Err(EvalError::EmptyResponse(refusal));
        }

        info!(
            "{}: {}ms, tokens: {}/{} (in/out)",
            provider, elapsed_ms, input_tokens, output_tokens
        );

        Ok(LlmResponse {
            content,
            metrics: LlmMetrics { input_tokens, output_tokens, elapsed_ms },
        })
    }
}

/// Maps a non-success HTTP status to an error, consuming the body.
pub(crate) async fn check_status(response: Response, provider: &str) -> Result<Response, EvalError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status.as_u16() == 429 {
        return Err(EvalError::RateLimited(format!("{provider}: {body}")));
    }

    Err(EvalError::Http {
        provider: provider.to_string(),
        status: status.as_u16(),
        body,
    })
}

/// Maps a transport error.
pub(crate) fn transport_err(e: reqwest::Error) -> EvalError {
    EvalError::LlmError(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn request_uses_camel_case_and_json_mime() {
        let request = GenerateContentRequest::json_prompt("hi", GenerationSettings::default());
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 4096);
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn joins_parts_and_reads_usage() {
        let response = parse(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "{\"a\":"}, {"text": "1}"}]}, "finishReason": "STOP"}],
            "usageMetadata": {"promptTokenCount": 120, "candidatesTokenCount": 8}
        }))
        .into_llm_response("gemini", 42)
        .unwrap();

        assert_eq!(response.content, "{\"a\":1}");
        assert_eq!(response.metrics, LlmMetrics { input_tokens: 120, output_tokens: 8, elapsed_ms: 42 });
    }

    #[test]
    fn blocked_prompt_is_not_retryable() {
        let err = parse(json!({"promptFeedback": {"blockReason": "SAFETY"}}))
            .into_llm_response("gemini", 1)
            .unwrap_err();
        assert!(matches!(err, EvalError::EmptyResponse(Some(ref r)) if r == "SAFETY"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn empty_candidate_is_retryable() {
        let err = parse(json!({"candidates": [{"content": {"parts": []}, "finishReason": "MAX_TOKENS"}]}))
            .into_llm_response("vertex", 1)
            .unwrap_err();
        assert!(err.is_retryable());
    }
}

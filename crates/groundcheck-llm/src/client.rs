//! OpenAI-compatible chat client in JSON mode.
//!
//! Works with the OpenAI API and any compatible endpoint (Ollama's `/v1`,
//! vLLM, LiteLLM proxies), which makes it handy for running the judges
//! against a local model.

use std::time::Instant;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
        ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use groundcheck_core::EvalError;
use tracing::info;

use crate::provider::{GenerationSettings, LlmMetrics, LlmProvider, LlmResponse};

const PROVIDER: &str = "openai";
const SYSTEM_PROMPT: &str = "You are a meticulous evaluator. Reply with a single JSON object and nothing else.";

/// Converts any error into an EvalError::LlmError.
fn llm_err(e: impl ToString) -> EvalError {
    EvalError::LlmError(e.to_string())
}

/// Builds the message list for a system + user request.
fn build_messages(system_prompt: &str, user_input: &str) -> Result<Vec<ChatCompletionRequestMessage>, EvalError> {
    Ok(vec![
        ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()
                .map_err(llm_err)?,
        ),
        ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_input)
                .build()
                .map_err(llm_err)?,
        ),
    ])
}

/// Extracts content and metrics from a completion response.
fn extract_response(response: CreateChatCompletionResponse, elapsed_ms: u64) -> Result<LlmResponse, EvalError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(EvalError::EmptyResponse(None))?;

    let (input_tokens, output_tokens) = response
        .usage
        .map(|u| (u.prompt_tokens, u.completion_tokens))
        .unwrap_or((0, 0));

    info!(
        "{}: {}ms, tokens: {}/{} (in/out)",
        PROVIDER, elapsed_ms, input_tokens, output_tokens
    );

    Ok(LlmResponse {
        content,
        metrics: LlmMetrics { input_tokens, output_tokens, elapsed_ms },
    })
}

/// Client for OpenAI-compatible chat completion APIs.
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model: String,
    settings: GenerationSettings,
}

impl LlmClient {
    /// Creates a new client for the given model, optional API base URL and key.
    ///
    /// Without a key the client falls back to `OPENAI_API_KEY`; local
    /// endpoints get a placeholder key since they ignore it.
    pub fn new(model: &str, api_base: Option<&str>, api_key: Option<&str>, settings: GenerationSettings) -> Self {
        let mut config = OpenAIConfig::default();
        if let Some(base) = api_base {
            config = config.with_api_base(base).with_api_key("ollama");
        }
        if let Some(key) = api_key {
            config = config.with_api_key(key);
        }

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            settings,
        }
    }
}

#[async_trait]
impl LlmProvider for LlmClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[allow(deprecated)]
    async fn generate(&self, prompt: &str) -> Result<LlmResponse, EvalError> {
        let start = Instant::now();
        let messages = build_messages(SYSTEM_PROMPT, prompt)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .response_format(ResponseFormat::JsonObject)
            .temperature(self.settings.temperature)
            .max_tokens(self.settings.max_output_tokens)
            .messages(messages)
            .build()
            .map_err(llm_err)?;

        let response = self.client.chat().create(request).await.map_err(llm_err)?;

        extract_response(response, start.elapsed().as_millis() as u64)
    }
}

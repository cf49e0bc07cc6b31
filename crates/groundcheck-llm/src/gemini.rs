//! Google Generative Language API client (API key auth).

use std::time::Instant;

use async_trait::async_trait;
use groundcheck_core::EvalError;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::google::{check_status, transport_err, GenerateContentRequest, GenerateContentResponse};
use crate::provider::{GenerationSettings, LlmProvider, LlmResponse};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const PROVIDER: &str = "gemini";

/// A model advertised by the Gemini API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Resource name, e.g. `models/gemini-1.5-pro`.
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    /// Model id without the `models/` prefix.
    pub fn id(&self) -> &str {
        self.name.strip_prefix("models/").unwrap_or(&self.name)
    }

    pub fn supports_generate_content(&self) -> bool {
        self.supported_generation_methods.iter().any(|m| m == "generateContent")
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: Client,
    model: String,
    api_key: String,
    settings: GenerationSettings,
    base_url: String,
}

impl GeminiClient {
    /// Creates a new Gemini client.
    pub fn new(model: &str, api_key: &str, settings: GenerationSettings) -> Self {
        info!("GeminiClient: model={}, api_key_len={}", model, api_key.len());
        Self {
            client: Client::new(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            settings,
            base_url: GEMINI_API_URL.to_string(),
        }
    }

    /// Points the client at another API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        let model = self.model.strip_prefix("models/").unwrap_or(&self.model);
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// Lists models that support `generateContent`, following pagination.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, EvalError> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(format!("{}/models", self.base_url))
                .header("x-goog-api-key", &self.api_key)
                .query(&[("pageSize", "1000")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(transport_err)?;
            let page: ModelList = check_status(response, PROVIDER)
                .await?
                .json()
                .await
                .map_err(transport_err)?;

            models.extend(page.models.into_iter().filter(ModelInfo::supports_generate_content));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(models)
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<LlmResponse, EvalError> {
        let start = Instant::now();
        let request = GenerateContentRequest::json_prompt(prompt, self.settings);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(transport_err)?;

        let body: GenerateContentResponse = check_status(response, PROVIDER)
            .await?
            .json()
            .await
            .map_err(transport_err)?;

        body.into_llm_response(PROVIDER, start.elapsed().as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_generate_content_endpoint() {
        let client = GeminiClient::new("gemini-1.5-pro", "key", GenerationSettings::default());
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-pro:generateContent"
        );

        let prefixed = GeminiClient::new("models/gemini-2.0-flash-exp", "key", GenerationSettings::default())
            .with_base_url("http://localhost:8080/v1beta/");
        assert_eq!(
            prefixed.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-2.0-flash-exp:generateContent"
        );
    }

    #[test]
    fn model_info_filters_generation_methods() {
        let info: ModelInfo = serde_json::from_str(
            r#"{"name": "models/gemini-1.5-pro", "displayName": "Gemini 1.5 Pro",
                "supportedGenerationMethods": ["generateContent", "countTokens"]}"#,
        )
        .unwrap();
        assert_eq!(info.id(), "gemini-1.5-pro");
        assert!(info.supports_generate_content());

        let embed: ModelInfo =
            serde_json::from_str(r#"{"name": "models/embedding-001", "supportedGenerationMethods": ["embedContent"]}"#)
                .unwrap();
        assert!(!embed.supports_generate_content());
    }
}

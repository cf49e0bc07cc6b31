//! Vertex AI client for Gemini models (project + bearer token auth).

use std::time::Instant;

use async_trait::async_trait;
use groundcheck_core::EvalError;
use reqwest::{Client, StatusCode};
use tokio::process::Command;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::google::{check_status, transport_err, GenerateContentRequest, GenerateContentResponse};
use crate::provider::{GenerationSettings, LlmProvider, LlmResponse};

const PROVIDER: &str = "vertex";
const TOKEN_ENV: &str = "VERTEX_ACCESS_TOKEN";

/// Client for `publishers/google/models/*:generateContent` on Vertex AI.
///
/// The access token comes from `VERTEX_ACCESS_TOKEN` when set, otherwise
/// from `gcloud auth print-access-token`. It is cached and dropped after a
/// 401 so the next attempt fetches a fresh one.
pub struct VertexClient {
    client: Client,
    model: String,
    project_id: String,
    location: String,
    settings: GenerationSettings,
    token: RwLock<Option<String>>,
}

impl VertexClient {
    /// Creates a new Vertex AI client.
    pub fn new(model: &str, project_id: &str, location: &str, settings: GenerationSettings) -> Self {
        info!("VertexClient: model={}, project={}, location={}", model, project_id, location);
        Self {
            client: Client::new(),
            model: model.to_string(),
            project_id: project_id.to_string(),
            location: location.to_string(),
            settings,
            token: RwLock::new(None),
        }
    }

    fn endpoint(&self) -> String {
        let host = match self.location.as_str() {
            "global" => "aiplatform.googleapis.com".to_string(),
            region => format!("{region}-aiplatform.googleapis.com"),
        };
        format!(
            "https://{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            host, self.project_id, self.location, self.model
        )
    }

    async fn access_token(&self) -> Result<String, EvalError> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }

        let token = match std::env::var(TOKEN_ENV).ok().filter(|t| !t.trim().is_empty()) {
            Some(token) => token.trim().to_string(),
            None => gcloud_access_token().await?,
        };

        *self.token.write().await = Some(token.clone());
        Ok(token)
    }
}

/// Asks the gcloud CLI for an application access token.
async fn gcloud_access_token() -> Result<String, EvalError> {
    let output = Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .output()
        .await
        .map_err(|e| EvalError::Config(format!("cannot run gcloud for Vertex credentials: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EvalError::Config(format!("gcloud auth failed: {}", stderr.trim())));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    match token.is_empty() {
        true => Err(EvalError::Config("gcloud returned an empty access token".into())),
        false => Ok(token),
    }
}

#[async_trait]
impl LlmProvider for VertexClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<LlmResponse, EvalError> {
        let start = Instant::now();
        let token = self.access_token().await?;
        let request = GenerateContentRequest::json_prompt(prompt, self.settings);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(token)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(transport_err)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("{}: access token rejected, refreshing on next attempt", PROVIDER);
            *self.token.write().await = None;
            return Err(EvalError::LlmError("Vertex AI rejected the access token".into()));
        }

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
    fn builds_regional_endpoint() {
        let client = VertexClient::new("gemini-1.5-pro", "bank-eval", "us-central1", GenerationSettings::default());
        assert_eq!(
            client.endpoint(),
            "https://us-central1-aiplatform.googleapis.com/v1/projects/bank-eval/locations/us-central1/publishers/google/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn builds_global_endpoint() {
        let client = VertexClient::new("gemini-2.0-flash-exp", "p", "global", GenerationSettings::default());
        assert!(client.endpoint().starts_with("https://aiplatform.googleapis.com/v1/projects/p/locations/global/"));
    }

    #[tokio::test]
    async fn uses_cached_token() {
        let client = VertexClient::new("m", "p", "us-central1", GenerationSettings::default());
        *client.token.write().await = Some("cached".into());
        assert_eq!(client.access_token().await.unwrap(), "cached");
    }
}

//! Unified client that routes to the backend selected in configuration.

use async_trait::async_trait;
use groundcheck_config::{EvaluatorConfig, ProviderKind};
use groundcheck_core::EvalError;

use crate::client::LlmClient;
use crate::gemini::GeminiClient;
use crate::provider::{GenerationSettings, LlmProvider, LlmResponse};
use crate::vertex::VertexClient;

enum Backend {
    Gemini(GeminiClient),
    Vertex(VertexClient),
    OpenAi(LlmClient),
}

/// One judge model on whichever backend the config selects.
pub struct UnifiedLlmClient {
    backend: Backend,
}

impl UnifiedLlmClient {
    /// Creates a client for `model` on the configured provider.
    pub fn from_config(config: &EvaluatorConfig, model: &str) -> Result<Self, EvalError> {
        let settings = GenerationSettings::from(config);
        let missing = |var: &str| EvalError::Config(format!("{} provider requires {}", config.provider, var));

        let backend = match config.provider {
            ProviderKind::Gemini => {
                let key = config.gemini_api_key.as_deref().ok_or_else(|| missing("GEMINI_API_KEY"))?;
                Backend::Gemini(GeminiClient::new(model, key, settings))
            }
            ProviderKind::Vertex => {
                let project = config.vertex_project_id.as_deref().ok_or_else(|| missing("VERTEX_PROJECT_ID"))?;
                Backend::Vertex(VertexClient::new(model, project, &config.vertex_location, settings))
            }
            ProviderKind::OpenAi => Backend::OpenAi(LlmClient::new(
                model,
                config.openai_api_base.as_deref(),
                config.openai_api_key.as_deref(),
                settings,
            )),
        };

        Ok(Self { backend })
    }

    /// Returns true if this client talks to Vertex AI.
    pub fn is_vertex(&self) -> bool {
        matches!(self.backend, Backend::Vertex(_))
    }

    fn provider(&self) -> &dyn LlmProvider {
        match &self.backend {
            Backend::Gemini(client) => client,
            Backend::Vertex(client) => client,
            Backend::OpenAi(client) => client,
        }
    }
}

#[async_trait]
impl LlmProvider for UnifiedLlmClient {
    fn name(&self) -> &str {
        self.provider().name()
    }

    fn model(&self) -> &str {
        self.provider().model()
    }

    async fn generate(&self, prompt: &str) -> Result<LlmResponse, EvalError> {
        self.provider().generate(prompt).await
    }
}

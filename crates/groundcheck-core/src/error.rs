use thiserror::Error;

/// Errors that can occur while calling a judge model or evaluating a conversation.
#[derive(Error, Debug)]
pub enum EvalError {
    /// LLM API request failed at the transport level.
    #[error("LLM request failed: {0}")]
    LlmError(String),

    /// Provider answered with a non-success HTTP status.
    #[error("{provider} API error {status}: {body}")]
    Http {
        provider: String,
        status: u16,
        body: String,
    },

    /// A single call exceeded its time budget.
    #[error("LLM call timed out after {0}s")]
    Timeout(u64),

    /// Provider signalled quota or rate exhaustion.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Provider returned no text (filtered, blocked or truncated).
    #[error("Empty response from model{}", .0.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    EmptyResponse(Option<String>),

    /// Failed to parse structured output from LLM.
    #[error("Failed to parse structured output: {0}")]
    ParseError(String),

    /// Maximum retry attempts exceeded.
    #[error("Max retries exceeded after {attempts} attempts: {last}")]
    MaxRetriesExceeded { attempts: u32, last: String },

    /// One agent could not produce a finding.
    #[error("Agent '{agent}' failed: {message}")]
    AgentFailed { agent: String, message: String },

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input data could not be used.
    #[error("Data error: {0}")]
    Data(String),
}

impl EvalError {
    /// Creates an agent failure error.
    pub fn agent(agent: impl Into<String>, message: impl ToString) -> Self {
        Self::AgentFailed { agent: agent.into(), message: message.to_string() }
    }

    /// Whether a retry of the same request might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LlmError(_) | Self::Timeout(_) | Self::RateLimited(_) => true,
            Self::EmptyResponse(reason) => reason.is_none(),
            Self::Http { status, .. } => *status == 429 || *status == 408 || *status >= 500,
            _ => false,
        }
    }

    /// Returns true for 429-style errors.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Http { status: 429, .. })
    }
}

impl From<serde_json::Error> for EvalError {
    fn from(err: serde_json::Error) -> Self {
        EvalError::ParseError(err.to_string())
    }
}

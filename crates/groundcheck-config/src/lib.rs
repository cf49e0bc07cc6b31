//! Evaluator configuration: providers, model tiers, limits and data paths.
//!
//! This crate defines how a groundcheck run is configured:
//!
//! - [`EvaluatorConfig`] — Complete run configuration with defaults
//! - [`ProviderKind`] — Which LLM backend serves the judges
//! - [`ModelTier`] and [`AgentTiers`] — Fast vs. strong model per agent
//! - [`PromptVersion`] — Lenient (v1) or strict (v2) hallucination prompt
//! - [`DataFiles`] and [`DataPaths`] — Input CSV locations
//!
//! Configuration layers, lowest to highest: built-in defaults, an optional
//! JSON file, then environment variables.
//!
//! # Loading
//!
//! ```rust,ignore
//! use groundcheck_config::EvaluatorConfig;
//!
//! let config = EvaluatorConfig::from_file("groundcheck.json")?.with_env();
//! config.validate()?;
//! ```
//!
//! # Defaults
//!
//! ```rust
//! use groundcheck_config::{EvaluatorConfig, ModelTier, ProviderKind};
//! use groundcheck_core::AgentKind;
//!
//! let config = EvaluatorConfig::default();
//! assert_eq!(config.provider, ProviderKind::Gemini);
//! assert_eq!(config.tiers.tier(AgentKind::Hallucination), ModelTier::Pro);
//! assert_eq!(config.model_for(AgentKind::Relevance), "gemini-2.0-flash-exp");
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use groundcheck_core::{AgentKind, EvaluationMode, Severity};
use serde::{Deserialize, Serialize};

/// Errors that can occur when loading or validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse JSON configuration.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// The selected provider has no credential.
    #[error("{provider} provider requires {variable} to be set")]
    MissingCredential {
        provider: ProviderKind,
        variable: &'static str,
    },

    /// A field holds an unusable value.
    #[error("Invalid value for '{field}': {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    /// Creates an IO error with path context.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Creates a validation error for a field.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Enums
// ============================================================================

/// LLM backend serving the judges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Generative Language API with an API key.
    #[default]
    Gemini,
    /// Google Vertex AI with project credentials.
    Vertex,
    /// Any OpenAI-compatible chat completions endpoint.
    OpenAi,
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "vertex" | "vertexai" | "vertex_ai" => Ok(Self::Vertex),
            "openai" => Ok(Self::OpenAi),
            other => Err(ConfigError::invalid("provider", format!("unknown provider '{other}'"))),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::Vertex => write!(f, "vertex"),
            Self::OpenAi => write!(f, "openai"),
        }
    }
}

/// Model strength class: a fast default and a stronger one for hard calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Flash,
    Pro,
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flash => write!(f, "flash"),
            Self::Pro => write!(f, "pro"),
        }
    }
}

/// Hallucination prompt variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptVersion {
    /// Lenient: tolerates paraphrase and general banking knowledge.
    #[default]
    V1,
    /// Strict: every specific fact must appear in a document.
    V2,
}

impl PromptVersion {
    /// Short label used in file names and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::V1 => "v1_lenient",
            Self::V2 => "v2_strict",
        }
    }
}

impl FromStr for PromptVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" | "lenient" => Ok(Self::V1),
            "v2" | "2" | "strict" => Ok(Self::V2),
            other => Err(ConfigError::invalid("prompt_version", format!("unknown version '{other}'"))),
        }
    }
}

impl fmt::Display for PromptVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "v1"),
            Self::V2 => write!(f, "v2"),
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Which model tier each agent runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentTiers {
    pub question_quality: ModelTier,
    pub hallucination: ModelTier,
    pub relevance: ModelTier,
    pub completeness: ModelTier,
    pub escalation: ModelTier,
    pub verification: ModelTier,
    pub main_evaluation: ModelTier,
    pub deep_verification: ModelTier,
}

impl Default for AgentTiers {
    fn default() -> Self {
        Self {
            question_quality: ModelTier::Flash,
            hallucination: ModelTier::Pro,
            relevance: ModelTier::Flash,
            completeness: ModelTier::Flash,
            escalation: ModelTier::Flash,
            verification: ModelTier::Pro,
            main_evaluation: ModelTier::Pro,
            deep_verification: ModelTier::Pro,
        }
    }
}

impl AgentTiers {
    pub fn tier(&self, agent: AgentKind) -> ModelTier {
        match agent {
            AgentKind::QuestionQuality => self.question_quality,
            AgentKind::Hallucination => self.hallucination,
            AgentKind::Relevance => self.relevance,
            AgentKind::Completeness => self.completeness,
            AgentKind::Escalation => self.escalation,
            AgentKind::Verification => self.verification,
            AgentKind::MainEvaluation => self.main_evaluation,
            AgentKind::DeepVerification => self.deep_verification,
        }
    }
}

/// File names of the four input tables, relative to the data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataFiles {
    pub conversations: String,
    pub escalations: String,
    pub traces: String,
    pub knowledge_base: String,
}

impl Default for DataFiles {
    fn default() -> Self {
        Self {
            conversations: "df_merged_final_oct_v3.csv".into(),
            escalations: "df_merged_genesys.csv".into(),
            traces: "lf-traces-export.csv".into(),
            knowledge_base: "base_conocimiento.csv".into(),
        }
    }
}

/// Resolved input file locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub conversations: PathBuf,
    pub escalations: PathBuf,
    pub traces: PathBuf,
    pub knowledge_base: PathBuf,
}

impl DataPaths {
    /// All paths with their table names.
    pub fn entries(&self) -> [(&'static str, &Path); 4] {
        [
            ("conversations", self.conversations.as_path()),
            ("escalations", self.escalations.as_path()),
            ("traces", self.traces.as_path()),
            ("knowledge_base", self.knowledge_base.as_path()),
        ]
    }
}

// ============================================================================
// EvaluatorConfig
// ============================================================================

/// Complete configuration for an evaluation run.
///
/// Every field has a default, so a JSON file only needs the overrides.
/// Credentials are never written back by [`EvaluatorConfig::to_json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    pub provider: ProviderKind,
    #[serde(skip_serializing)]
    pub gemini_api_key: Option<String>,
    pub vertex_project_id: Option<String>,
    pub vertex_location: String,
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    pub openai_api_base: Option<String>,

    pub flash_model: String,
    pub pro_model: String,
    pub tiers: AgentTiers,

    pub temperature: f32,
    pub max_output_tokens: u32,
    pub requests_per_minute: u32,
    pub max_retries: u32,
    pub api_timeout_secs: u64,
    pub agent_timeout_secs: u64,

    pub mode: EvaluationMode,
    pub prompt_version: PromptVersion,
    pub parallel_agents: bool,
    pub question_quality_check: bool,
    /// Minimum detector severity that triggers secondary verification.
    pub verification_threshold: Severity,
    /// Single-call overall score below which deep verification runs.
    pub low_score_threshold: f64,
    pub max_workers: usize,

    pub data_dir: PathBuf,
    pub data_files: DataFiles,
    pub output_dir: PathBuf,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Gemini,
            gemini_api_key: None,
            vertex_project_id: None,
            vertex_location: "us-central1".into(),
            openai_api_key: None,
            openai_api_base: None,
            flash_model: "gemini-2.0-flash-exp".into(),
            pro_model: "gemini-1.5-pro".into(),
            tiers: AgentTiers::default(),
            temperature: 0.1,
            max_output_tokens: 4096,
            requests_per_minute: 60,
            max_retries: 3,
            api_timeout_secs: 120,
            agent_timeout_secs: 120,
            mode: EvaluationMode::MultiAgent,
            prompt_version: PromptVersion::V1,
            parallel_agents: true,
            question_quality_check: true,
            verification_threshold: Severity::Minor,
            low_score_threshold: 3.0,
            max_workers: 3,
            data_dir: PathBuf::from("."),
            data_files: DataFiles::default(),
            output_dir: PathBuf::from("./results"),
        }
    }
}

impl EvaluatorConfig {
    /// Loads configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        Self::from_json(&content)
    }

    /// Parses configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes configuration to pretty JSON, without credentials.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Defaults overlaid with process environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Overlays process environment variables.
    pub fn with_env(self) -> Self {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    /// Overlays variables resolved by `lookup`. Unparseable values are ignored.
    pub fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(provider) = get("GROUNDCHECK_PROVIDER").and_then(|v| v.parse().ok()) {
            self.provider = provider;
        }
        if let Some(key) = get("GEMINI_API_KEY") {
            self.gemini_api_key = Some(key);
        }
        if let Some(project) = get("VERTEX_PROJECT_ID") {
            self.vertex_project_id = Some(project);
        }
        if let Some(location) = get("VERTEX_LOCATION") {
            self.vertex_location = location;
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(base) = get("OPENAI_API_BASE") {
            self.openai_api_base = Some(base);
        }
        if let Some(model) = get("GROUNDCHECK_FLASH_MODEL") {
            self.flash_model = model;
        }
        if let Some(model) = get("GROUNDCHECK_PRO_MODEL") {
            self.pro_model = model;
        }
        if let Some(version) = get("GROUNDCHECK_PROMPT_VERSION").and_then(|v| v.parse().ok()) {
            self.prompt_version = version;
        }
        if let Some(mode) = get("GROUNDCHECK_MODE") {
            self.mode = EvaluationMode::from(mode.as_str());
        }
        if let Some(dir) = get("GROUNDCHECK_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        self
    }

    /// Checks credentials for the selected provider and numeric limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing = |variable| ConfigError::MissingCredential { provider: self.provider, variable };
        match self.provider {
            ProviderKind::Gemini if self.gemini_api_key.is_none() => return Err(missing("GEMINI_API_KEY")),
            ProviderKind::Vertex if self.vertex_project_id.is_none() => return Err(missing("VERTEX_PROJECT_ID")),
            ProviderKind::OpenAi if self.openai_api_key.is_none() && self.openai_api_base.is_none() => {
                return Err(missing("OPENAI_API_KEY"))
            }
            _ => {}
        }

        if self.max_retries == 0 {
            return Err(ConfigError::invalid("max_retries", "must be at least 1"));
        }
        if self.requests_per_minute == 0 {
            return Err(ConfigError::invalid("requests_per_minute", "must be at least 1"));
        }
        if self.max_workers == 0 {
            return Err(ConfigError::invalid("max_workers", "must be at least 1"));
        }
        if self.api_timeout_secs == 0 || self.agent_timeout_secs == 0 {
            return Err(ConfigError::invalid("timeout", "must be positive"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::invalid("temperature", "must be between 0 and 2"));
        }
        if self.flash_model.trim().is_empty() || self.pro_model.trim().is_empty() {
            return Err(ConfigError::invalid("model", "model names cannot be empty"));
        }
        Ok(())
    }

    /// Model name for a tier.
    pub fn model(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Flash => &self.flash_model,
            ModelTier::Pro => &self.pro_model,
        }
    }

    /// Model name an agent should run on.
    pub fn model_for(&self, agent: AgentKind) -> &str {
        self.model(self.tiers.tier(agent))
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_secs)
    }

    /// Input file locations under `data_dir`.
    pub fn data_paths(&self) -> DataPaths {
        let dir = &self.data_dir;
        DataPaths {
            conversations: dir.join(&self.data_files.conversations),
            escalations: dir.join(&self.data_files.escalations),
            traces: dir.join(&self.data_files.traces),
            knowledge_base: dir.join(&self.data_files.knowledge_base),
        }
    }
}

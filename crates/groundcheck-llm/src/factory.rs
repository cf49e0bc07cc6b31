//! Builds one guarded provider per model tier and hands them out per agent.

use std::sync::Arc;

use groundcheck_config::{AgentTiers, EvaluatorConfig, ModelTier};
use groundcheck_core::{AgentKind, EvalError};
use tracing::info;

use crate::provider::LlmProvider;
use crate::retry::{GuardedProvider, RateLimiter, RetryPolicy};
use crate::unified::UnifiedLlmClient;

/// The providers available to a run, keyed by model tier.
#[derive(Clone)]
pub struct ProviderSet {
    flash: Arc<dyn LlmProvider>,
    pro: Arc<dyn LlmProvider>,
    tiers: AgentTiers,
}

impl ProviderSet {
    /// Creates flash and pro providers sharing one rate limiter.
    pub fn from_config(config: &EvaluatorConfig) -> Result<Self, EvalError> {
        let limiter = Arc::new(RateLimiter::per_minute(config.requests_per_minute));
        let policy = RetryPolicy::from(config);

        let build = |model: &str| -> Result<Arc<dyn LlmProvider>, EvalError> {
            let client = UnifiedLlmClient::from_config(config, model)?;
            Ok(Arc::new(GuardedProvider::new(client, policy, Arc::clone(&limiter))))
        };

        let flash = build(&config.flash_model)?;
        let pro = build(&config.pro_model)?;

        info!("╔══════════════════════════════════════════════════════════════");
        info!("║ PROVIDERS: {}", config.provider);
        info!("║ flash = {}, pro = {}", flash.model(), pro.model());
        info!("║ {} req/min, {} attempts, {}s timeout", config.requests_per_minute, policy.max_attempts, policy.timeout.as_secs());
        info!("╚══════════════════════════════════════════════════════════════");

        Ok(Self { flash, pro, tiers: config.tiers.clone() })
    }

    /// Uses the same provider for every agent.
    pub fn uniform(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            flash: Arc::clone(&provider),
            pro: provider,
            tiers: AgentTiers::default(),
        }
    }

    /// Uses explicit flash and pro providers with a custom tier mapping.
    pub fn with_tiers(flash: Arc<dyn LlmProvider>, pro: Arc<dyn LlmProvider>, tiers: AgentTiers) -> Self {
        Self { flash, pro, tiers }
    }

    pub fn tier(&self, tier: ModelTier) -> Arc<dyn LlmProvider> {
        match tier {
            ModelTier::Flash => Arc::clone(&self.flash),
            ModelTier::Pro => Arc::clone(&self.pro),
        }
    }

    /// Provider an agent should call.
    pub fn for_agent(&self, agent: AgentKind) -> Arc<dyn LlmProvider> {
        self.tier(self.tiers.tier(agent))
    }
}

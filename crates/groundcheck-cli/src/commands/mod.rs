//! Subcommand implementations.

pub mod analyze;
pub mod evaluate;
pub mod setup;

use anyhow::{Context, Result};
use groundcheck::etl::{first_turn_per_session, load_conversations};
use groundcheck::{ConversationData, EvaluatorConfig};
use tracing::info;

/// Which turns of the merged dataset a command works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turns {
    All,
    FirstPerSession,
}

/// Loads and merges the input exports, keeping the requested turns.
pub fn load(config: &EvaluatorConfig, turns: Turns) -> Result<Vec<ConversationData>> {
    let paths = config.data_paths();
    let dataset = load_conversations(&paths)
        .with_context(|| format!("loading input data from {}", config.data_dir.display()))?;

    let stats = &dataset.stats;
    info!(
        "📂 {} traces, {} sessions, {:.1}% of cited documents found",
        stats.traces,
        stats.sessions,
        stats.match_rate()
    );

    let conversations = match turns {
        Turns::All => dataset.conversations,
        Turns::FirstPerSession => first_turn_per_session(dataset.conversations),
    };
    info!("📋 {} conversations available", conversations.len());
    Ok(conversations)
}

/// Keeps the first `limit` conversations; `None` keeps all.
pub fn take(mut conversations: Vec<ConversationData>, limit: Option<usize>) -> Vec<ConversationData> {
    if let Some(limit) = limit {
        conversations.truncate(limit);
    }
    conversations
}

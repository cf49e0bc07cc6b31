//! Input loading for groundcheck: four CSV exports in, evaluable turns out.
//!
//! - [`RawTables`] and [`read_table`] — Typed CSV readers with column checks
//! - [`TraceExtraction`] — Question, answer, sources and escalation flags from a trace's JSON output
//! - [`merge`] — Orders turns per session, joins escalations and renders cited documents
//! - [`session_summaries`] — One aggregate row per session
//!
//! # Example
//!
//! ```rust,ignore
//! use groundcheck_config::EvaluatorConfig;
//! use groundcheck_etl::{merge, RawTables};
//!
//! let config = EvaluatorConfig::from_env();
//! let tables = RawTables::load(&config.data_paths())?;
//! let dataset = merge(&tables);
//! println!("{} evaluable turns", dataset.conversations.len());
//! ```

mod error;
mod loader;
mod merger;
mod traces;

pub use error::EtlError;
pub use loader::{read_table, ConversationRow, EscalationRow, KnowledgeRow, RawTables, Table, TraceRow};
pub use merger::{
    build_turns, first_turn_per_session, merge, parse_numeric_id, session_summaries, EscalationIndex,
    KnowledgeBase, MergeStats, MergedDataset, RenderedDocuments, SessionSummary, TurnRecord,
};
pub use traces::{parse_timestamp, TraceExtraction};

use groundcheck_config::DataPaths;

/// Loads and merges every input table in one step.
pub fn load_conversations(paths: &DataPaths) -> Result<MergedDataset, EtlError> {
    let tables = RawTables::load(paths)?;
    Ok(merge(&tables))
}

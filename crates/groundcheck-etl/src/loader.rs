//! Typed readers for the four input CSV files.

use std::fs::File;
use std::path::Path;

use groundcheck_config::DataPaths;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::info;

use crate::error::EtlError;

/// A CSV table with a known set of required columns.
pub trait Table: DeserializeOwned {
    const NAME: &'static str;
    const REQUIRED: &'static [&'static str];
}

/// Chatbot conversation registry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConversationRow {
    pub id: String,
    #[serde(default)]
    pub session_id: String,
}

impl Table for ConversationRow {
    const NAME: &'static str = "conversations";
    const REQUIRED: &'static [&'static str] = &["id", "session_id"];
}

/// Hand-off of a conversation to a human expert.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EscalationRow {
    #[serde(rename = "fk_tbl_conversaciones_conecta2")]
    pub conversation_id: String,
    #[serde(default)]
    pub expert_category: String,
    #[serde(default)]
    pub escalation_reason: String,
}

impl Table for EscalationRow {
    const NAME: &'static str = "escalations";
    const REQUIRED: &'static [&'static str] = &["fk_tbl_conversaciones_conecta2"];
}

/// One observability trace: a single bot turn with its JSON output.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TraceRow {
    pub id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(default)]
    pub input: String,
    pub output: String,
    #[serde(rename = "totalCost", default)]
    pub total_cost: String,
    #[serde(rename = "inputTokens", default)]
    pub input_tokens: String,
    #[serde(rename = "outputTokens", default)]
    pub output_tokens: String,
}

impl Table for TraceRow {
    const NAME: &'static str = "traces";
    const REQUIRED: &'static [&'static str] = &["id", "sessionId", "output"];
}

/// One knowledge-base article the bot can cite as a source.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct KnowledgeRow {
    #[serde(rename = "idtbl_pregunta")]
    pub document_id: String,
    #[serde(rename = "titulo", default)]
    pub title: String,
    #[serde(rename = "respuesta", default)]
    pub content: String,
    #[serde(rename = "keywords_rag", default)]
    pub keywords: String,
}

impl Table for KnowledgeRow {
    const NAME: &'static str = "knowledge_base";
    const REQUIRED: &'static [&'static str] = &["idtbl_pregunta", "titulo", "respuesta"];
}

/// Reads a whole table, checking its required columns first.
pub fn read_table<T: Table>(path: &Path) -> Result<Vec<T>, EtlError> {
    let path_str = path.display().to_string();
    let file = File::open(path).map_err(|e| EtlError::io(&path_str, e))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(file);

    let headers = reader.headers().map_err(|e| EtlError::csv(&path_str, e))?.clone();
    if let Some(missing) = T::REQUIRED.iter().find(|col| !headers.iter().any(|h| h == **col)) {
        return Err(EtlError::MissingColumn { path: path_str, column: missing.to_string() });
    }

    let rows = reader
        .deserialize::<T>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| EtlError::csv(&path_str, e))?;

    info!("Loaded {} {} rows from {}", rows.len(), T::NAME, path_str);
    Ok(rows)
}

/// All four input tables.
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub conversations: Vec<ConversationRow>,
    pub escalations: Vec<EscalationRow>,
    pub traces: Vec<TraceRow>,
    pub knowledge_base: Vec<KnowledgeRow>,
}

impl RawTables {
    /// Loads every table from its configured path.
    pub fn load(paths: &DataPaths) -> Result<Self, EtlError> {
        Ok(Self {
            conversations: read_table(&paths.conversations)?,
            escalations: read_table(&paths.escalations)?,
            traces: read_table(&paths.traces)?,
            knowledge_base: read_table(&paths.knowledge_base)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_rows_and_defaults_optional_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.csv");
        fs::write(
            &path,
            "idtbl_pregunta, titulo ,respuesta\n12,Tarjetas,\"Bloqueo: llame al 018000, opción 2\"\n",
        )
        .unwrap();

        let rows: Vec<KnowledgeRow> = read_table(&path).unwrap();
        assert_eq!(
            rows,
            vec![KnowledgeRow {
                document_id: "12".into(),
                title: "Tarjetas".into(),
                content: "Bloqueo: llame al 018000, opción 2".into(),
                keywords: String::new(),
            }]
        );
    }

    #[test]
    fn reports_missing_required_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traces.csv");
        fs::write(&path, "id,timestamp,output\n1,2024-01-01,{}\n").unwrap();

        let err = read_table::<TraceRow>(&path).unwrap_err();
        assert!(matches!(err, EtlError::MissingColumn { ref column, .. } if column == "sessionId"));
    }

    #[test]
    fn reports_missing_file_with_path() {
        let err = read_table::<ConversationRow>(Path::new("/nonexistent/conversations.csv")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/conversations.csv"));
    }
}

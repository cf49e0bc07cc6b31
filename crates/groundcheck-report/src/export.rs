//! CSV and JSON writers for evaluation output.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use groundcheck_core::{EvaluationResults, FlatRecord};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::ReportError;

/// Local timestamp used in output file names, e.g. `20241031_142501`.
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// `{dir}/{stem}_{ts}.{ext}`
pub fn output_path(dir: &Path, stem: &str, ts: &str, ext: &str) -> PathBuf {
    dir.join(format!("{stem}_{ts}.{ext}"))
}

/// Renders one CSV cell: null is empty, lists and objects are JSON-encoded.
pub fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Column names across all records, in first-seen order.
pub fn header_union(records: &[FlatRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut header = Vec::new();
    for key in records.iter().flat_map(FlatRecord::keys) {
        if seen.insert(key) {
            header.push(key.to_string());
        }
    }
    header
}

/// Writes flat records as CSV; a record missing a column gets an empty cell.
pub fn write_records_csv(path: &Path, records: &[FlatRecord]) -> Result<(), ReportError> {
    ensure_parent(path)?;
    let path_str = path.display().to_string();
    let mut writer = csv::Writer::from_path(path).map_err(|e| ReportError::csv(&path_str, e))?;

    let header = header_union(records);
    writer.write_record(&header).map_err(|e| ReportError::csv(&path_str, e))?;
    for record in records {
        let row = header.iter().map(|key| record.get(key).map(cell).unwrap_or_default());
        writer.write_record(row).map_err(|e| ReportError::csv(&path_str, e))?;
    }
    writer.flush().map_err(|e| ReportError::io(&path_str, e))?;

    info!("✅ Saved {} rows to {}", records.len(), path_str);
    Ok(())
}

/// Flattens results with [`EvaluationResults::to_record`] and writes them as CSV.
pub fn write_results_csv(path: &Path, results: &[EvaluationResults]) -> Result<(), ReportError> {
    let records: Vec<FlatRecord> = results.iter().map(EvaluationResults::to_record).collect();
    write_records_csv(path, &records)
}

/// Writes any serializable value as pretty JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ReportError> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|e| ReportError::io(path.display().to_string(), e))?;
    info!("✅ Saved {}", path.display());
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), ReportError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| ReportError::io(dir.display().to_string(), e))
        }
        _ => Ok(()),
    }
}

//! Reporting for groundcheck evaluation runs.
//!
//! - [`export`] — CSV (flattened records) and pretty JSON writers
//! - [`QualityReport`] — Batch totals, detection rate and severity distribution
//! - [`AbComparison`] — Hallucination rates of two prompt versions side by side
//! - [`PatternAnalysis`] — Text and retrieval factors of hallucinating vs clean answers
//!
//! # Example
//!
//! ```rust,ignore
//! use groundcheck_report::{export, QualityReport};
//!
//! let ts = export::timestamp();
//! export::write_results_csv(&export::output_path(dir, "evaluation", &ts, "csv"), &results)?;
//! println!("{}", QualityReport::from_results(&results));
//! ```

mod ab_test;
mod error;
pub mod export;
mod patterns;
mod summary;

pub use ab_test::{AbComparison, AbTestMetadata, AbTestRun, ArmSummary, Strictness};
pub use error::ReportError;
pub use patterns::{
    indicator, sample_indices, BooleanFactor, FactorComparison, PatternAnalysis, PatternRow, SeveritySummary,
    TextMetrics, VAGUE_WORD_LIMIT,
};
pub use summary::{unnecessary_clarification, HallucinationView, QualityReport};

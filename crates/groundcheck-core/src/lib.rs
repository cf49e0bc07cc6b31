//! Core domain types and error definitions for groundcheck.
//!
//! This crate provides the types shared across the groundcheck workspace:
//!
//! - [`EvalError`] — Error type for judge calls and evaluations
//! - [`ConversationData`] — One chatbot turn plus the documents it was shown
//! - Findings per judge: [`QuestionQuality`], [`HallucinationFinding`],
//!   [`RelevanceFinding`], [`CompletenessFinding`], [`EscalationFinding`],
//!   [`VerificationFinding`], [`QualityAssessment`], [`DeepVerification`]
//! - [`EvaluationResults`] and [`Verdict`] — Assembled outcome per turn
//! - [`FlatRecord`] — Ordered flat view for CSV export
//!
//! Findings deserialize leniently from whatever JSON a judge returns and
//! carry the repair rules that keep them self-consistent.
//!
//! # Example
//!
//! ```rust
//! use groundcheck_core::{HallucinationFinding, Severity};
//!
//! let mut finding: HallucinationFinding = serde_json::from_str(
//!     r#"{"hallucination_detected": true, "severity": "major", "evidence": []}"#,
//! ).unwrap();
//! finding.reconcile();
//!
//! assert!(!finding.hallucination_detected);
//! assert_eq!(finding.severity, Severity::None);
//! ```

mod conversation;
mod error;
mod findings;
mod labels;
pub mod lenient;
mod results;

pub use conversation::{ConversationData, PreviousTurn};
pub use error::EvalError;
pub use findings::{
    clamp_score, AnswerCompleteness, ClaimEvidence, Coherence, CompletenessFinding, DeepVerification,
    EscalationFinding, FidelityScore, HallucinationCheck, HallucinationFinding, OverallQuality,
    QualityAssessment, QuestionQuality, RelevanceFinding, TopicRelevance, VerificationFinding,
};
pub use labels::{
    AgentKind, ClaimStatus, EvaluationMode, HallucinationType, Recommendation, Severity, SeverityAdjustment,
};
pub use results::{EvaluationResults, FlatRecord, Verdict};

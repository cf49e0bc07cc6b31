//! Aggregate quality figures over a batch of results.

use std::collections::BTreeMap;
use std::fmt;

use groundcheck_core::{EvaluationMode, EvaluationResults, Severity};
use serde::Serialize;

const RULE: &str = "════════════════════════════════════════════════════════════";

/// Hallucination figures of one result, whichever mode produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HallucinationView {
    pub detected: bool,
    pub severity: Severity,
    /// Judge confidence, when the judge reported one.
    pub confidence: Option<f64>,
    pub total_claims: u32,
    pub grounding_ratio: f64,
}

impl HallucinationView {
    /// Reads the final (post-verification) verdict plus claim counts.
    /// `None` for failed results and results without a hallucination judgement.
    pub fn of(result: &EvaluationResults) -> Option<Self> {
        if !result.success {
            return None;
        }
        let verdict = result.verdict();
        match result.mode {
            EvaluationMode::MultiAgent => {
                let finding = result.hallucination.as_ref()?;
                Some(Self {
                    detected: verdict.hallucination_detected,
                    severity: verdict.severity,
                    confidence: Some(finding.confidence),
                    total_claims: finding.total_claims,
                    grounding_ratio: finding.grounding_ratio,
                })
            }
            EvaluationMode::Unified => {
                let assessment = result.assessment.as_ref()?;
                Some(Self {
                    detected: verdict.hallucination_detected,
                    severity: verdict.severity,
                    confidence: result.deep_verification.as_ref().map(|d| d.confidence),
                    total_claims: assessment.fidelity_score.total_claims,
                    grounding_ratio: assessment.fidelity_score.grounding_ratio,
                })
            }
        }
    }
}

/// Whether the answer asked for clarification the documents made unnecessary.
pub fn unnecessary_clarification(result: &EvaluationResults) -> bool {
    match (&result.completeness, &result.assessment) {
        (Some(completeness), _) => completeness.unnecessary_clarification,
        (None, Some(assessment)) => assessment.completeness.unnecessary_clarification,
        (None, None) => false,
    }
}

/// Batch-level quality summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub hallucinations: usize,
    /// Share of judged results with a hallucination, 0-1.
    pub detection_rate: f64,
    pub avg_confidence: Option<f64>,
    pub severity_distribution: BTreeMap<Severity, usize>,
    pub avg_claims: f64,
    pub avg_grounding_ratio: f64,
    pub verification_applied: usize,
    pub unnecessary_clarifications: usize,
    /// Results where at least one agent failed but the evaluation still completed.
    pub partial_results: usize,
}

impl QualityReport {
    pub fn from_results(results: &[EvaluationResults]) -> Self {
        let views: Vec<HallucinationView> = results.iter().filter_map(HallucinationView::of).collect();
        let successful = results.iter().filter(|r| r.success).count();

        let mut severity_distribution: BTreeMap<Severity, usize> =
            Severity::ALL.iter().map(|s| (*s, 0)).collect();
        for view in &views {
            *severity_distribution.entry(view.severity).or_default() += 1;
        }

        let hallucinations = views.iter().filter(|v| v.detected).count();
        let confidences: Vec<f64> = views.iter().filter_map(|v| v.confidence).collect();

        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            hallucinations,
            detection_rate: ratio(hallucinations, views.len()),
            avg_confidence: (!confidences.is_empty()).then(|| mean(&confidences)),
            severity_distribution,
            avg_claims: mean(&views.iter().map(|v| f64::from(v.total_claims)).collect::<Vec<_>>()),
            avg_grounding_ratio: mean(&views.iter().map(|v| v.grounding_ratio).collect::<Vec<_>>()),
            verification_applied: results.iter().filter(|r| r.verification_applied).count(),
            unnecessary_clarifications: results.iter().filter(|r| r.success && unnecessary_clarification(r)).count(),
            partial_results: results.iter().filter(|r| r.success && !r.agent_errors.is_empty()).count(),
        }
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, " EVALUATION QUALITY REPORT")?;
        writeln!(f, "{RULE}")?;
        writeln!(f, " {:<32}{:>10}", "Conversations", self.total)?;
        writeln!(f, " {:<32}{:>10}", "Successful", self.successful)?;
        writeln!(f, " {:<32}{:>10}", "Failed", self.failed)?;
        writeln!(f, " {:<32}{:>10}", "Partial (agent errors)", self.partial_results)?;
        writeln!(f, "{RULE}")?;
        writeln!(f, " {:<32}{:>10}", "Hallucinations", self.hallucinations)?;
        writeln!(f, " {:<32}{:>9.1}%", "Detection rate", self.detection_rate * 100.0)?;
        match self.avg_confidence {
            Some(confidence) => writeln!(f, " {:<32}{:>10.2}", "Average confidence", confidence)?,
            None => writeln!(f, " {:<32}{:>10}", "Average confidence", "n/a")?,
        }
        writeln!(f, " {:<32}{:>10.1}", "Average claims", self.avg_claims)?;
        writeln!(f, " {:<32}{:>9.1}%", "Average grounding", self.avg_grounding_ratio * 100.0)?;
        writeln!(f, " {:<32}{:>10}", "Verified findings", self.verification_applied)?;
        writeln!(f, " {:<32}{:>10}", "Unnecessary clarifications", self.unnecessary_clarifications)?;
        writeln!(f, "{RULE}")?;
        writeln!(f, " Severity distribution")?;
        for (severity, count) in self.severity_distribution.iter().rev() {
            writeln!(f, "   {:<30}{:>10}", severity.as_str().to_uppercase(), count)?;
        }
        write!(f, "{RULE}")
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

pub(crate) fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

//! Side-by-side comparison of two prompt versions on the same conversations.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Local;
use groundcheck_core::{EvaluationResults, Severity};
use serde::Serialize;

use crate::summary::{ratio, HallucinationView};

const RULE: &str = "════════════════════════════════════════════════════════════";

#[derive(Debug, Clone, Serialize)]
pub struct AbTestMetadata {
    pub test_date: String,
    pub conversation_count: usize,
    pub conversations_tested: Vec<String>,
}

/// Both arms of an A/B run, serialized as the full JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct AbTestRun {
    pub v1_lenient: Vec<EvaluationResults>,
    pub v2_strict: Vec<EvaluationResults>,
    pub metadata: AbTestMetadata,
}

impl AbTestRun {
    pub fn new(session_ids: Vec<String>, v1_lenient: Vec<EvaluationResults>, v2_strict: Vec<EvaluationResults>) -> Self {
        Self {
            metadata: AbTestMetadata {
                test_date: Local::now().to_rfc3339(),
                conversation_count: session_ids.len(),
                conversations_tested: session_ids,
            },
            v1_lenient,
            v2_strict,
        }
    }

    pub fn comparison(&self) -> AbComparison {
        AbComparison::new(
            ArmSummary::from_results("V1 (LENIENT PROMPT)", &self.v1_lenient),
            ArmSummary::from_results("V2 (STRICT PROMPT)", &self.v2_strict),
        )
    }
}

/// Figures for one prompt version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArmSummary {
    pub label: String,
    pub total: usize,
    pub successful: usize,
    pub hallucinations: usize,
    /// Detected hallucinations by severity; `none` is never counted.
    pub severity_breakdown: BTreeMap<Severity, usize>,
}

impl ArmSummary {
    pub fn from_results(label: impl Into<String>, results: &[EvaluationResults]) -> Self {
        let mut severity_breakdown = BTreeMap::new();
        let mut hallucinations = 0;
        for view in results.iter().filter_map(HallucinationView::of).filter(|v| v.detected) {
            hallucinations += 1;
            if view.severity != Severity::None {
                *severity_breakdown.entry(view.severity).or_insert(0) += 1;
            }
        }

        Self {
            label: label.into(),
            total: results.len(),
            successful: results.iter().filter(|r| r.success).count(),
            hallucinations,
            severity_breakdown,
        }
    }

    /// Percent of results that completed.
    pub fn success_rate(&self) -> f64 {
        ratio(self.successful, self.total) * 100.0
    }

    /// Percent of all results, failed ones included, with a hallucination.
    pub fn hallucination_rate(&self) -> f64 {
        ratio(self.hallucinations, self.total) * 100.0
    }
}

/// How the second prompt compares with the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    SignificantlyStricter,
    ModeratelyStricter,
    Similar,
    MoreLenient,
}

impl Strictness {
    /// Classifies a hallucination-rate difference in percentage points.
    pub fn from_difference(diff: f64) -> Self {
        if diff > 10.0 {
            Self::SignificantlyStricter
        } else if diff > 5.0 {
            Self::ModeratelyStricter
        } else if diff.abs() <= 5.0 {
            Self::Similar
        } else {
            Self::MoreLenient
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignificantlyStricter => "significantly stricter",
            Self::ModeratelyStricter => "moderately stricter",
            Self::Similar => "similar strictness",
            Self::MoreLenient => "more lenient",
        }
    }
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbComparison {
    pub v1: ArmSummary,
    pub v2: ArmSummary,
    /// V2 minus V1 hallucination rate, in percentage points.
    pub difference: f64,
    pub verdict: Strictness,
}

impl AbComparison {
    pub fn new(v1: ArmSummary, v2: ArmSummary) -> Self {
        let difference = v2.hallucination_rate() - v1.hallucination_rate();
        Self { verdict: Strictness::from_difference(difference), v1, v2, difference }
    }
}

fn write_arm(f: &mut fmt::Formatter<'_>, arm: &ArmSummary) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "📊 {}:", arm.label)?;
    writeln!(f, "   Success rate: {:.1}%", arm.success_rate())?;
    writeln!(
        f,
        "   Hallucination rate: {:.1}% ({}/{})",
        arm.hallucination_rate(),
        arm.hallucinations,
        arm.total
    )?;
    if !arm.severity_breakdown.is_empty() {
        writeln!(f, "   Severity breakdown:")?;
        for (severity, count) in arm.severity_breakdown.iter().rev() {
            writeln!(f, "      {severity}: {count}")?;
        }
    }
    Ok(())
}

impl fmt::Display for AbComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "A/B TEST SUMMARY")?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "Conversations tested: {}", self.v1.total.max(self.v2.total))?;
        write_arm(f, &self.v1)?;
        write_arm(f, &self.v2)?;
        writeln!(f)?;
        writeln!(f, "🔍 COMPARISON:")?;
        writeln!(f, "   Hallucination rate difference: {:+.1}%", self.difference)?;
        match self.verdict {
            Strictness::SignificantlyStricter | Strictness::ModeratelyStricter => {
                writeln!(f, "   → V2 is {} (+{:.1}%)", self.verdict, self.difference)?
            }
            Strictness::Similar => writeln!(f, "   → Similar strictness (±{:.1}%)", self.difference.abs())?,
            Strictness::MoreLenient => writeln!(f, "   → V2 is more lenient ({:.1}%)", self.difference)?,
        }
        write!(f, "{RULE}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundcheck_core::{ConversationData, EvaluationMode, HallucinationFinding};
    use pretty_assertions::assert_eq;

    fn results(severities: &[Severity]) -> Vec<EvaluationResults> {
        severities
            .iter()
            .enumerate()
            .map(|(i, severity)| {
                let conversation = ConversationData::new(format!("s{i}"), "q", "a", "d");
                let mut result = EvaluationResults::new(&conversation, EvaluationMode::MultiAgent);
                result.hallucination = Some(HallucinationFinding {
                    hallucination_detected: *severity != Severity::None,
                    severity: *severity,
                    ..Default::default()
                });
                result
            })
            .collect()
    }

    #[test]
    fn classifies_rate_differences() {
        assert_eq!(Strictness::from_difference(12.0), Strictness::SignificantlyStricter);
        assert_eq!(Strictness::from_difference(10.0), Strictness::ModeratelyStricter);
        assert_eq!(Strictness::from_difference(5.0), Strictness::Similar);
        assert_eq!(Strictness::from_difference(-5.0), Strictness::Similar);
        assert_eq!(Strictness::from_difference(-7.5), Strictness::MoreLenient);
    }

    #[test]
    fn compares_arms() {
        let mut v1 = vec![Severity::None; 10];
        v1[2] = Severity::Minor;
        let mut v2 = v1.clone();
        v2[0] = Severity::Critical;
        v2[3] = Severity::Major;
        let (v1, v2) = (results(&v1), results(&v2));
        let run = AbTestRun::new((0..10).map(|i| format!("s{i}")).collect(), v1, v2);

        let comparison = run.comparison();

        assert_eq!(comparison.v1.hallucinations, 1);
        assert_eq!(comparison.v2.hallucinations, 3);
        assert!((comparison.difference - 20.0).abs() < 1e-9);
        assert_eq!(comparison.verdict, Strictness::SignificantlyStricter);
        assert_eq!(comparison.v2.severity_breakdown.get(&Severity::Critical), Some(&1));
        assert_eq!(comparison.v2.severity_breakdown.get(&Severity::None), None);

        let text = comparison.to_string();
        assert!(text.contains("+20.0%"));
        assert!(text.contains("significantly stricter"));
        assert_eq!(run.metadata.conversation_count, 10);
    }

    #[test]
    fn failed_results_count_against_rates() {
        let conversation = ConversationData::new("x", "q", "a", "d");
        let mut arm = results(&[Severity::Major]);
        arm.push(EvaluationResults::failed(&conversation, EvaluationMode::MultiAgent, "boom"));

        let summary = ArmSummary::from_results("arm", &arm);

        assert_eq!(summary.success_rate(), 50.0);
        assert_eq!(summary.hallucination_rate(), 50.0);
    }
}

//! What hallucinating answers have in common: text metrics per conversation
//! joined with the judges' findings, then compared against clean answers.

use std::fmt;
use std::path::Path;

use groundcheck_core::{ConversationData, EvaluationMode, EvaluationResults, FlatRecord, Severity};
use serde::Serialize;
use serde_json::Value;

use crate::error::ReportError;
use crate::export::write_records_csv;
use crate::summary::{mean, ratio, unnecessary_clarification};

/// Questions with fewer words than this count as vague.
pub const VAGUE_WORD_LIMIT: usize = 5;

/// Simple shape metrics of a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextMetrics {
    pub length: usize,
    pub word_count: usize,
    pub avg_word_length: f64,
    pub sentence_count: usize,
    pub has_question_mark: bool,
    pub is_vague: bool,
}

impl TextMetrics {
    pub fn of(text: &str) -> Self {
        let words: Vec<&str> = text.split_whitespace().collect();
        let word_lengths: Vec<f64> = words.iter().map(|w| w.chars().count() as f64).collect();
        Self {
            length: text.chars().count(),
            word_count: words.len(),
            avg_word_length: mean(&word_lengths),
            sentence_count: text.split('.').filter(|s| !s.trim().is_empty()).count(),
            has_question_mark: text.contains('?'),
            is_vague: words.len() < VAGUE_WORD_LIMIT,
        }
    }
}

/// One judged conversation with everything the factor comparison looks at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternRow {
    pub session_id: String,
    pub has_hallucination: bool,
    pub severity: Severity,
    pub grounding_ratio: f64,
    pub hallucination_type: String,
    pub question: TextMetrics,
    pub response: TextMetrics,
    pub doc_count: usize,
    pub total_doc_length: usize,
    pub avg_doc_length: f64,
    pub doc_has_answer: bool,
    pub doc_relevance_score: u32,
    pub unnecessary_clarification: bool,
    pub completeness_score: u32,
    pub user_question: String,
    pub ai_response: String,
    pub evidence: Vec<String>,
    pub reasoning: String,
}

impl PatternRow {
    /// `None` when the evaluation failed.
    pub fn build(conversation: &ConversationData, result: &EvaluationResults) -> Option<Self> {
        if !result.success {
            return None;
        }

        let verdict = result.verdict();
        let doc_count = conversation.document_ids.len();
        let total_doc_length = conversation.documents.chars().count();
        let mut row = Self {
            session_id: conversation.session_id.clone(),
            has_hallucination: verdict.hallucination_detected,
            severity: verdict.severity,
            grounding_ratio: 1.0,
            hallucination_type: "none".into(),
            question: TextMetrics::of(&conversation.user_question),
            response: TextMetrics::of(&conversation.ai_response),
            doc_count,
            total_doc_length,
            avg_doc_length: if doc_count > 0 { total_doc_length as f64 / doc_count as f64 } else { 0.0 },
            doc_has_answer: false,
            doc_relevance_score: 0,
            unnecessary_clarification: unnecessary_clarification(result),
            completeness_score: 0,
            user_question: conversation.user_question.clone(),
            ai_response: conversation.ai_response.clone(),
            evidence: Vec::new(),
            reasoning: String::new(),
        };

        match result.mode {
            EvaluationMode::MultiAgent => {
                if let Some(finding) = &result.hallucination {
                    row.grounding_ratio = finding.grounding_ratio;
                    row.hallucination_type = finding.hallucination_type.as_str().to_string();
                    row.evidence = finding.hallucinated().map(|e| e.claim.clone()).collect();
                    row.reasoning = finding.overall_assessment.clone();
                }
                if let Some(relevance) = &result.document_relevance {
                    row.doc_has_answer = relevance.has_answer;
                    row.doc_relevance_score = relevance.relevance_score;
                }
                if let Some(completeness) = &result.completeness {
                    row.completeness_score = completeness.completeness_score;
                }
            }
            EvaluationMode::Unified => {
                if let Some(assessment) = &result.assessment {
                    let check = &assessment.hallucination_check;
                    row.grounding_ratio = assessment.fidelity_score.grounding_ratio;
                    if !check.types.is_empty() {
                        row.hallucination_type = check.types.join(", ");
                    }
                    row.evidence = check.evidence.clone();
                    row.reasoning = check.explanation.clone();
                    row.doc_has_answer = assessment.completeness.sources_had_answer;
                    row.doc_relevance_score = assessment.relevance.score;
                    row.completeness_score = assessment.completeness.score;
                }
            }
        }
        Some(row)
    }

    /// Flat CSV view with `q_`/`r_` prefixed text metrics.
    pub fn to_record(&self) -> FlatRecord {
        let mut record = FlatRecord::default();
        record.insert("session_id", Value::from(self.session_id.clone()));
        record.insert("has_hallucination", Value::from(self.has_hallucination));
        record.insert("severity", Value::from(self.severity.as_str()));
        record.insert("grounding_ratio", Value::from(self.grounding_ratio));
        record.insert("hallucination_type", Value::from(self.hallucination_type.clone()));
        record.insert("q_length", Value::from(self.question.length));
        record.insert("q_word_count", Value::from(self.question.word_count));
        record.insert("q_is_vague", Value::from(self.question.is_vague));
        record.insert("q_has_question_mark", Value::from(self.question.has_question_mark));
        record.insert("r_length", Value::from(self.response.length));
        record.insert("r_word_count", Value::from(self.response.word_count));
        record.insert("doc_count", Value::from(self.doc_count));
        record.insert("total_doc_length", Value::from(self.total_doc_length));
        record.insert("avg_doc_length", Value::from(self.avg_doc_length));
        record.insert("doc_has_answer", Value::from(self.doc_has_answer));
        record.insert("doc_relevance_score", Value::from(self.doc_relevance_score));
        record.insert("unnecessary_clarification", Value::from(self.unnecessary_clarification));
        record.insert("completeness_score", Value::from(self.completeness_score));
        record.insert("user_question", Value::from(self.user_question.clone()));
        record.insert("ai_response", Value::from(self.ai_response.clone()));
        record.insert("evidence", Value::from(self.evidence.clone()));
        record.insert("reasoning", Value::from(self.reasoning.clone()));
        record
    }

    /// Multi-line walkthrough of one hallucination for manual review.
    pub fn render_example(&self, number: usize, total: usize) -> String {
        let rule = "═".repeat(100);
        let thin = "─".repeat(100);
        let severity = self.severity.as_str().to_uppercase();
        let mut out = format!(
            "{rule}\nHALLUCINATION EXAMPLE {number}/{total}\nSeverity: {severity} | Grounding: {:.0}%\n{rule}\n\n",
            self.grounding_ratio * 100.0
        );
        out.push_str("📊 CONTEXT METRICS:\n");
        out.push_str(&format!("   Documents provided: {}\n", self.doc_count));
        out.push_str(&format!("   Total document length: {} chars\n", self.total_doc_length));
        out.push_str(&format!("   Document relevance: {}/5\n", self.doc_relevance_score));
        out.push_str(&format!("   Documents have answer: {}\n", if self.doc_has_answer { "✅ Yes" } else { "❌ No" }));
        out.push_str(&format!("   Question length: {} words\n", self.question.word_count));
        out.push_str(&format!("   Response length: {} words\n\n", self.response.word_count));
        out.push_str(&format!("❓ USER QUESTION:\n{thin}\n{}\n\n", self.user_question));
        out.push_str(&format!("🤖 ASSISTANT RESPONSE:\n{thin}\n{}\n\n", self.ai_response));
        out.push_str(&format!("🚨 HALLUCINATION DETECTED ({severity}), type: {}\n", self.hallucination_type));
        if !self.reasoning.is_empty() {
            out.push_str(&format!("\n💭 EVALUATOR REASONING:\n{}\n", self.reasoning));
        }
        if !self.evidence.is_empty() {
            out.push_str("\n🔍 UNSUPPORTED CLAIMS:\n");
            for claim in &self.evidence {
                out.push_str(&format!("   • {claim}\n"));
            }
        }
        out.push_str(&thin);
        out
    }
}

/// Mean of a numeric factor in hallucinating vs clean answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorComparison {
    pub label: &'static str,
    pub hallucination_avg: f64,
    pub clean_avg: f64,
    /// Relative difference in percent; 0 when the clean average is 0.
    pub difference_pct: f64,
}

/// Share of a yes/no factor in hallucinating vs clean answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BooleanFactor {
    pub label: &'static str,
    pub hallucination_pct: f64,
    pub clean_pct: f64,
    /// Difference in percentage points.
    pub difference_pp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeveritySummary {
    pub severity: Severity,
    pub cases: usize,
    pub avg_doc_length: f64,
    pub avg_doc_count: f64,
    pub avg_grounding_ratio: f64,
    pub had_answer: usize,
}

/// 🔴 above 20, 🟡 above 10, ✅ otherwise.
pub fn indicator(difference: f64) -> &'static str {
    match difference.abs() {
        d if d > 20.0 => "🔴",
        d if d > 10.0 => "🟡",
        _ => "✅",
    }
}

/// `n` indices spread evenly over `0..len`, first and last included.
pub fn sample_indices(len: usize, n: usize) -> Vec<usize> {
    let n = n.min(len);
    match n {
        0 => Vec::new(),
        1 => vec![0],
        _ => (0..n).map(|i| i * (len - 1) / (n - 1)).collect(),
    }
}

type NumericFactor = (&'static str, fn(&PatternRow) -> f64);
type FlagFactor = (&'static str, fn(&PatternRow) -> bool);

const NUMERIC_FACTORS: [NumericFactor; 6] = [
    ("Document Length", |r| r.avg_doc_length),
    ("Number of Documents", |r| r.doc_count as f64),
    ("Question Length", |r| r.question.length as f64),
    ("Response Length", |r| r.response.length as f64),
    ("Document Relevance Score", |r| f64::from(r.doc_relevance_score)),
    ("Completeness Score", |r| f64::from(r.completeness_score)),
];

const FLAG_FACTORS: [FlagFactor; 3] = [
    ("Vague Question", |r| r.question.is_vague),
    ("Documents Have Answer", |r| r.doc_has_answer),
    ("Unnecessary Clarification", |r| r.unnecessary_clarification),
];

/// Pattern rows for a sample plus the comparisons derived from them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatternAnalysis {
    pub rows: Vec<PatternRow>,
}

impl PatternAnalysis {
    /// Pairs conversations with their results by position; failed results are skipped.
    pub fn build(conversations: &[ConversationData], results: &[EvaluationResults]) -> Self {
        let rows = conversations
            .iter()
            .zip(results)
            .filter_map(|(conversation, result)| PatternRow::build(conversation, result))
            .collect();
        Self { rows }
    }

    pub fn hallucination_cases(&self) -> impl Iterator<Item = &PatternRow> {
        self.rows.iter().filter(|r| r.has_hallucination)
    }

    pub fn clean_cases(&self) -> impl Iterator<Item = &PatternRow> {
        self.rows.iter().filter(|r| !r.has_hallucination)
    }

    pub fn numeric_factors(&self) -> Vec<FactorComparison> {
        NUMERIC_FACTORS
            .iter()
            .map(|&(label, value)| {
                let hallucination_avg = mean(&self.hallucination_cases().map(value).collect::<Vec<_>>());
                let clean_avg = mean(&self.clean_cases().map(value).collect::<Vec<_>>());
                let difference_pct = if clean_avg > 0.0 { (hallucination_avg - clean_avg) / clean_avg * 100.0 } else { 0.0 };
                FactorComparison { label, hallucination_avg, clean_avg, difference_pct }
            })
            .collect()
    }

    pub fn boolean_factors(&self) -> Vec<BooleanFactor> {
        let hallucinated: Vec<&PatternRow> = self.hallucination_cases().collect();
        let clean: Vec<&PatternRow> = self.clean_cases().collect();
        FLAG_FACTORS
            .iter()
            .map(|&(label, flag)| {
                let hallucination_pct = ratio(hallucinated.iter().filter(|r| flag(r)).count(), hallucinated.len()) * 100.0;
                let clean_pct = ratio(clean.iter().filter(|r| flag(r)).count(), clean.len()) * 100.0;
                BooleanFactor { label, hallucination_pct, clean_pct, difference_pp: hallucination_pct - clean_pct }
            })
            .collect()
    }

    /// Hallucination cases, most severe first, at most `limit`.
    pub fn examples(&self, limit: usize) -> Vec<&PatternRow> {
        let mut cases: Vec<&PatternRow> = self.hallucination_cases().collect();
        cases.sort_by(|a, b| b.severity.cmp(&a.severity));
        cases.truncate(limit);
        cases
    }

    /// Critical, major and minor groups that have at least one case.
    pub fn severity_summaries(&self) -> Vec<SeveritySummary> {
        [Severity::Critical, Severity::Major, Severity::Minor]
            .into_iter()
            .filter_map(|severity| {
                let cases: Vec<&PatternRow> = self.hallucination_cases().filter(|r| r.severity == severity).collect();
                if cases.is_empty() {
                    return None;
                }
                Some(SeveritySummary {
                    severity,
                    cases: cases.len(),
                    avg_doc_length: mean(&cases.iter().map(|r| r.avg_doc_length).collect::<Vec<_>>()),
                    avg_doc_count: mean(&cases.iter().map(|r| r.doc_count as f64).collect::<Vec<_>>()),
                    avg_grounding_ratio: mean(&cases.iter().map(|r| r.grounding_ratio).collect::<Vec<_>>()),
                    had_answer: cases.iter().filter(|r| r.doc_has_answer).count(),
                })
            })
            .collect()
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), ReportError> {
        let records: Vec<FlatRecord> = self.rows.iter().map(PatternRow::to_record).collect();
        write_records_csv(path, &records)
    }
}

impl fmt::Display for PatternAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "═".repeat(100);
        writeln!(f, "{rule}")?;
        writeln!(f, "CORRELATION ANALYSIS: What Causes Hallucinations?")?;
        writeln!(f, "{rule}")?;

        let total = self.rows.len();
        let hallucinated = self.hallucination_cases().count();
        if hallucinated == 0 {
            return write!(f, "✅ No hallucinations detected in sample!");
        }

        writeln!(f, "📊 Sample Size:")?;
        writeln!(f, "   Total conversations: {total}")?;
        writeln!(f, "   With hallucinations: {hallucinated} ({:.1}%)", ratio(hallucinated, total) * 100.0)?;
        writeln!(f, "   Clean responses: {} ({:.1}%)", total - hallucinated, ratio(total - hallucinated, total) * 100.0)?;
        writeln!(f)?;

        writeln!(f, "🔍 Hallucination Severity:")?;
        for summary in self.severity_summaries() {
            writeln!(f, "   {}: {} cases", summary.severity.as_str().to_uppercase(), summary.cases)?;
        }
        writeln!(f)?;

        writeln!(f, "📈 FACTOR COMPARISON (Hallucination vs Clean):")?;
        for factor in self.numeric_factors() {
            writeln!(f, "{} {}:", indicator(factor.difference_pct), factor.label)?;
            writeln!(f, "   Hallucination cases: {:.1}", factor.hallucination_avg)?;
            writeln!(f, "   Clean cases: {:.1}", factor.clean_avg)?;
            writeln!(f, "   Difference: {:+.1}%", factor.difference_pct)?;
        }
        writeln!(f)?;

        writeln!(f, "🔍 BOOLEAN FACTOR ANALYSIS:")?;
        for factor in self.boolean_factors() {
            writeln!(f, "{} {}:", indicator(factor.difference_pp), factor.label)?;
            writeln!(f, "   In hallucination cases: {:.1}%", factor.hallucination_pct)?;
            writeln!(f, "   In clean cases: {:.1}%", factor.clean_pct)?;
            writeln!(f, "   Difference: {:+.1} percentage points", factor.difference_pp)?;
        }
        write!(f, "{rule}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundcheck_core::{ClaimEvidence, ClaimStatus, CompletenessFinding, HallucinationFinding, RelevanceFinding};
    use pretty_assertions::assert_eq;

    fn judged(id: &str, question: &str, severity: Severity, docs: &[&str]) -> (ConversationData, EvaluationResults) {
        let mut conversation = ConversationData::new(id, question, "Respuesta del asistente.", "x".repeat(100 * docs.len()));
        conversation.document_ids = docs.iter().map(|d| d.to_string()).collect();

        let mut result = EvaluationResults::new(&conversation, EvaluationMode::MultiAgent);
        let detected = severity != Severity::None;
        result.hallucination = Some(HallucinationFinding {
            hallucination_detected: detected,
            severity,
            grounding_ratio: if detected { 0.5 } else { 1.0 },
            evidence: vec![ClaimEvidence {
                claim: format!("claim for {id}"),
                status: if detected { ClaimStatus::Hallucination } else { ClaimStatus::Grounded },
                ..Default::default()
            }],
            ..Default::default()
        });
        result.document_relevance = Some(RelevanceFinding { relevance_score: 4, has_answer: !detected, ..Default::default() });
        result.completeness = Some(CompletenessFinding { completeness_score: 4, ..Default::default() });
        (conversation, result)
    }

    fn sample() -> PatternAnalysis {
        let pairs = vec![
            judged("a", "¿Cuál es el monto de inembargabilidad para cuentas de ahorro?", Severity::Minor, &["1"]),
            judged("b", "monto?", Severity::Critical, &["1", "2"]),
            judged("c", "¿Cómo bloqueo mi tarjeta débito desde la app?", Severity::None, &["3"]),
            judged("d", "¿Qué horario tiene la sucursal principal del banco?", Severity::None, &["4"]),
        ];
        let (conversations, results): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        PatternAnalysis::build(&conversations, &results)
    }

    #[test]
    fn text_metrics_flag_short_questions() {
        let metrics = TextMetrics::of("¿tasa?");
        assert_eq!(metrics.word_count, 1);
        assert!(metrics.is_vague);
        assert!(metrics.has_question_mark);

        let empty = TextMetrics::of("");
        assert_eq!(empty.length, 0);
        assert_eq!(empty.avg_word_length, 0.0);
        assert!(empty.is_vague);

        let sentences = TextMetrics::of("Primera frase. Segunda frase. ");
        assert_eq!(sentences.sentence_count, 2);
        assert_eq!(sentences.word_count, 4);
        assert!(sentences.is_vague);
    }

    #[test]
    fn compares_hallucinating_and_clean_answers() {
        let analysis = sample();
        assert_eq!(analysis.hallucination_cases().count(), 2);

        let docs = &analysis.numeric_factors()[1];
        assert_eq!(docs.label, "Number of Documents");
        assert!((docs.hallucination_avg - 1.5).abs() < 1e-9);
        assert!((docs.clean_avg - 1.0).abs() < 1e-9);
        assert!((docs.difference_pct - 50.0).abs() < 1e-9);
        assert_eq!(indicator(docs.difference_pct), "🔴");

        let vague = &analysis.boolean_factors()[0];
        assert_eq!(vague.hallucination_pct, 50.0);
        assert_eq!(vague.clean_pct, 0.0);

        let answer = &analysis.boolean_factors()[1];
        assert_eq!(answer.difference_pp, -100.0);
    }

    #[test]
    fn examples_are_sorted_by_severity() {
        let analysis = sample();
        let examples = analysis.examples(10);
        let ids: Vec<&str> = examples.iter().map(|r| r.session_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(examples[0].evidence, vec!["claim for b"]);
        assert!(examples[0].render_example(1, 2).contains("Severity: CRITICAL | Grounding: 50%"));

        let summaries = analysis.severity_summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].severity, Severity::Critical);
        assert_eq!(summaries[0].had_answer, 0);
    }

    #[test]
    fn skips_failed_results() {
        let conversation = ConversationData::new("f", "q", "a", "d");
        let failed = EvaluationResults::failed(&conversation, EvaluationMode::MultiAgent, "boom");
        let analysis = PatternAnalysis::build(&[conversation], &[failed]);
        assert!(analysis.rows.is_empty());
        assert!(analysis.to_string().contains("No hallucinations"));
    }

    #[test]
    fn samples_evenly() {
        assert_eq!(sample_indices(10, 4), vec![0, 3, 6, 9]);
        assert_eq!(sample_indices(3, 10), vec![0, 1, 2]);
        assert_eq!(sample_indices(5, 1), vec![0]);
        assert!(sample_indices(0, 5).is_empty());
    }

    #[test]
    fn writes_detail_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hallucination_analysis_detailed.csv");
        sample().write_csv(&path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(&reader.headers().unwrap()[0], "session_id");
        assert_eq!(reader.records().count(), 4);
    }
}

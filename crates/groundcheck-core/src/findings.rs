//! Typed findings produced by each judge, plus the repair rules that keep
//! them internally consistent.

use serde::{Deserialize, Serialize};

use crate::labels::{ClaimStatus, HallucinationType, Recommendation, Severity, SeverityAdjustment};
use crate::lenient;

const MIN_SCORE: u32 = 1;
const MAX_SCORE: u32 = 5;

/// Clamps a 1-5 score; 0 stays 0 and means "not reported".
pub fn clamp_score(score: u32) -> u32 {
    match score {
        0 => 0,
        s => s.clamp(MIN_SCORE, MAX_SCORE),
    }
}

fn ratio(part: u32, total: u32) -> f64 {
    match total {
        0 => 0.0,
        t => f64::from(part) / f64::from(t),
    }
}

// ============================================================================
// Question quality
// ============================================================================

/// How answerable the user's question was in the first place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionQuality {
    #[serde(deserialize_with = "lenient::u32")]
    pub clarity_score: u32,
    #[serde(deserialize_with = "lenient::u32")]
    pub context_completeness: u32,
    #[serde(deserialize_with = "lenient::bool")]
    pub is_ambiguous: bool,
    #[serde(deserialize_with = "lenient::string_list")]
    pub possible_interpretations: Vec<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub question_type: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub missing_information: Vec<String>,
    #[serde(deserialize_with = "lenient::bool")]
    pub needs_clarification: bool,
    #[serde(deserialize_with = "lenient::string_list")]
    pub clarification_needed: Vec<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub explanation: String,
}

impl Default for QuestionQuality {
    fn default() -> Self {
        Self {
            clarity_score: 3,
            context_completeness: 3,
            is_ambiguous: false,
            possible_interpretations: Vec::new(),
            question_type: "unknown".into(),
            missing_information: Vec::new(),
            needs_clarification: false,
            clarification_needed: Vec::new(),
            explanation: String::new(),
        }
    }
}

impl QuestionQuality {
    /// Neutral stand-in used when the quality check itself failed.
    pub fn neutral() -> Self {
        Self {
            explanation: "Question quality evaluation failed".into(),
            ..Default::default()
        }
    }

    /// Clamps scores to 1-5 and forces `needs_clarification` when warranted.
    pub fn normalize(&mut self) {
        self.clarity_score = self.clarity_score.clamp(MIN_SCORE, MAX_SCORE);
        self.context_completeness = self.context_completeness.clamp(MIN_SCORE, MAX_SCORE);
        if self.question_type.is_empty() {
            self.question_type = "unknown".into();
        }
        if self.clarity_score <= 2 || self.is_ambiguous || self.context_completeness <= 2 {
            self.needs_clarification = true;
        }
    }
}

// ============================================================================
// Hallucination detection
// ============================================================================

/// One claim extracted from the answer and checked against the documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "EvidenceRepr")]
pub struct ClaimEvidence {
    pub claim: String,
    pub status: ClaimStatus,
    pub document_support: String,
    pub explanation: String,
}

impl ClaimEvidence {
    pub fn is_hallucinated(&self) -> bool {
        self.status == ClaimStatus::Hallucination
    }
}

/// Judges sometimes list evidence as bare strings; those are flagged claims.
#[derive(Deserialize)]
#[serde(untagged)]
enum EvidenceRepr {
    Text(String),
    Detailed(DetailedEvidence),
}

#[derive(Deserialize)]
struct DetailedEvidence {
    #[serde(default, alias = "statement", deserialize_with = "lenient::string")]
    claim: String,
    #[serde(default)]
    status: ClaimStatus,
    #[serde(default, alias = "source", deserialize_with = "lenient::string")]
    document_support: String,
    #[serde(default, deserialize_with = "lenient::string")]
    explanation: String,
}

impl From<EvidenceRepr> for ClaimEvidence {
    fn from(repr: EvidenceRepr) -> Self {
        match repr {
            EvidenceRepr::Text(claim) => Self {
                claim,
                status: ClaimStatus::Hallucination,
                ..Default::default()
            },
            EvidenceRepr::Detailed(d) => Self {
                claim: d.claim,
                status: d.status,
                document_support: d.document_support,
                explanation: d.explanation,
            },
        }
    }
}

/// Output of the hallucination detector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HallucinationFinding {
    #[serde(deserialize_with = "lenient::bool")]
    pub hallucination_detected: bool,
    pub severity: Severity,
    #[serde(skip_deserializing)]
    pub severity_score: u8,
    pub hallucination_type: HallucinationType,
    #[serde(deserialize_with = "deserialize_evidence")]
    pub evidence: Vec<ClaimEvidence>,
    #[serde(skip_deserializing)]
    pub total_claims: u32,
    #[serde(skip_deserializing)]
    pub grounded_claims: u32,
    #[serde(skip_deserializing)]
    pub hallucinated_claims: u32,
    #[serde(skip_deserializing)]
    pub grounding_ratio: f64,
    #[serde(deserialize_with = "lenient::f64")]
    pub confidence: f64,
    #[serde(deserialize_with = "lenient::string")]
    pub overall_assessment: String,
}

fn deserialize_evidence<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Vec<ClaimEvidence>, D::Error> {
    let raw = serde_json::Value::deserialize(d)?;
    let items = match raw {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Null => Vec::new(),
        other => vec![other],
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<ClaimEvidence>(item).ok())
        .filter(|e| !e.claim.trim().is_empty() || e.status != ClaimStatus::Unknown)
        .collect())
}

impl HallucinationFinding {
    /// Recomputes claim counts and makes the verdict agree with the evidence.
    ///
    /// - no hallucinated claim: not detected, severity and type `none`
    /// - hallucinated claims but `detected = false`: detected, at least
    ///   `minor`, `fabrication` when no type was given
    pub fn reconcile(&mut self) {
        self.total_claims = self.evidence.len() as u32;
        self.hallucinated_claims = self.evidence.iter().filter(|e| e.is_hallucinated()).count() as u32;
        self.grounded_claims = self
            .evidence
            .iter()
            .filter(|e| e.status == ClaimStatus::Grounded)
            .count() as u32;
        self.grounding_ratio = ratio(self.grounded_claims, self.total_claims);
        self.confidence = self.confidence.clamp(0.0, 1.0);

        match self.hallucinated_claims {
            0 => {
                self.hallucination_detected = false;
                self.severity = Severity::None;
                self.hallucination_type = HallucinationType::None;
            }
            _ => {
                self.hallucination_detected = true;
                self.severity = self.severity.max(Severity::Minor);
                if self.hallucination_type == HallucinationType::None {
                    self.hallucination_type = HallucinationType::Fabrication;
                }
            }
        }

        self.severity_score = self.severity.score();
    }

    /// Claims flagged as hallucinated.
    pub fn hallucinated(&self) -> impl Iterator<Item = &ClaimEvidence> {
        self.evidence.iter().filter(|e| e.is_hallucinated())
    }
}

// ============================================================================
// Relevance, completeness, escalation
// ============================================================================

/// Whether the retrieved documents could answer the question at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceFinding {
    #[serde(deserialize_with = "lenient::u32")]
    pub relevance_score: u32,
    #[serde(deserialize_with = "lenient::bool")]
    pub has_answer: bool,
    #[serde(deserialize_with = "lenient::string")]
    pub missing_information: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub relevant_documents: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub irrelevant_documents: Vec<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub explanation: String,
}

impl RelevanceFinding {
    pub fn normalize(&mut self) {
        self.relevance_score = clamp_score(self.relevance_score);
    }
}

/// Whether the answer used what the documents offered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletenessFinding {
    #[serde(deserialize_with = "lenient::u32")]
    pub completeness_score: u32,
    #[serde(deserialize_with = "lenient::bool")]
    pub used_all_relevant_info: bool,
    #[serde(deserialize_with = "lenient::string")]
    pub missing_information: String,
    #[serde(deserialize_with = "lenient::bool")]
    pub unnecessary_clarification: bool,
    #[serde(deserialize_with = "lenient::string")]
    pub explanation: String,
}

impl CompletenessFinding {
    pub fn normalize(&mut self) {
        self.completeness_score = clamp_score(self.completeness_score);
    }
}

/// Whether handing off (or not) to a human expert was the right call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationFinding {
    #[serde(deserialize_with = "lenient::bool")]
    pub escalation_appropriate: bool,
    #[serde(deserialize_with = "lenient::bool")]
    pub should_have_escalated: bool,
    #[serde(deserialize_with = "lenient::string")]
    pub reason: String,
    #[serde(deserialize_with = "lenient::string")]
    pub alternative_action: String,
}

impl EscalationFinding {
    /// Escalation that should have happened but did not.
    pub fn is_missed(&self, escalated: bool) -> bool {
        !escalated && self.should_have_escalated
    }
}

// ============================================================================
// Verification
// ============================================================================

/// Second opinion on a detected hallucination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationFinding {
    /// True when the verifier confirms the original finding.
    #[serde(deserialize_with = "lenient::bool")]
    pub verified: bool,
    pub severity_adjustment: SeverityAdjustment,
    pub new_severity: Option<Severity>,
    #[serde(deserialize_with = "lenient::string")]
    pub explanation: String,
    pub final_recommendation: Recommendation,
}

impl VerificationFinding {
    /// Fills `new_severity` from the detector when the verifier left it out.
    pub fn normalize(&mut self, original: Severity) {
        if self.new_severity.is_none() {
            self.new_severity = Some(original);
        }
    }
}

// ============================================================================
// Single-call assessment
// ============================================================================

/// Hallucination section of the single-call assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HallucinationCheck {
    #[serde(deserialize_with = "lenient::bool")]
    pub detected: bool,
    pub severity: Severity,
    #[serde(deserialize_with = "lenient::string_list")]
    pub evidence: Vec<String>,
    /// Kinds of invented content, e.g. `url`, `email`, `fact`, `procedure`.
    #[serde(rename = "type", deserialize_with = "lenient::string_list")]
    pub types: Vec<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub explanation: String,
}

impl HallucinationCheck {
    /// Same two-way rule as [`HallucinationFinding::reconcile`], keyed on evidence.
    pub fn reconcile(&mut self) {
        if self.evidence.is_empty() {
            self.detected = false;
            self.severity = Severity::None;
            self.types.clear();
        } else if !self.detected {
            self.detected = true;
            self.severity = self.severity.max(Severity::Minor);
        }
    }

    /// Keeps severity in line with an externally decided `detected` flag.
    fn align_severity(&mut self) {
        if self.detected {
            self.severity = self.severity.max(Severity::Minor);
        } else {
            self.severity = Severity::None;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FidelityScore {
    #[serde(deserialize_with = "lenient::u32")]
    pub score: u32,
    #[serde(deserialize_with = "lenient::string")]
    pub grounding_level: String,
    #[serde(deserialize_with = "lenient::u32")]
    pub total_claims: u32,
    #[serde(deserialize_with = "lenient::u32")]
    pub supported_claims: u32,
    #[serde(deserialize_with = "lenient::u32")]
    pub unsupported_claims: u32,
    #[serde(deserialize_with = "lenient::f64")]
    pub grounding_ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerCompleteness {
    #[serde(deserialize_with = "lenient::u32")]
    pub score: u32,
    #[serde(deserialize_with = "lenient::string_list")]
    pub question_aspects: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub answered_aspects: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub missing_aspects: Vec<String>,
    #[serde(deserialize_with = "lenient::f64")]
    pub completeness_rate: f64,
    #[serde(deserialize_with = "lenient::bool")]
    pub sources_had_answer: bool,
    #[serde(deserialize_with = "lenient::bool")]
    pub unnecessary_clarification: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicRelevance {
    #[serde(deserialize_with = "lenient::u32")]
    pub score: u32,
    #[serde(deserialize_with = "lenient::bool")]
    pub is_on_topic: bool,
    #[serde(deserialize_with = "lenient::string")]
    pub main_topic: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub irrelevant_content: Vec<String>,
    #[serde(deserialize_with = "lenient::f64")]
    pub relevance_ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coherence {
    #[serde(deserialize_with = "lenient::u32")]
    pub score: u32,
    #[serde(deserialize_with = "lenient::bool")]
    pub has_contradictions: bool,
    #[serde(deserialize_with = "lenient::string_list")]
    pub contradictions: Vec<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub logical_flow: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverallQuality {
    #[serde(deserialize_with = "lenient::bool")]
    pub acceptable: bool,
    #[serde(deserialize_with = "lenient::string")]
    pub quality_tier: String,
    #[serde(deserialize_with = "lenient::f64")]
    pub overall_score: f64,
    #[serde(deserialize_with = "lenient::string_list")]
    pub critical_issues: Vec<String>,
    pub recommendation: Recommendation,
    #[serde(deserialize_with = "lenient::string")]
    pub reasoning: String,
}

/// Result of the single question-aware judge call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityAssessment {
    pub hallucination_check: HallucinationCheck,
    pub fidelity_score: FidelityScore,
    pub completeness: AnswerCompleteness,
    pub relevance: TopicRelevance,
    pub coherence: Coherence,
    pub overall_quality: OverallQuality,
}

/// Follow-up judgement on a suspicious single-call assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepVerification {
    #[serde(deserialize_with = "lenient::bool")]
    pub agrees_with_initial: bool,
    #[serde(deserialize_with = "lenient::bool")]
    pub final_hallucination_detected: bool,
    pub final_severity: Severity,
    #[serde(deserialize_with = "lenient::string_list")]
    pub detailed_evidence: Vec<String>,
    #[serde(deserialize_with = "lenient::f64")]
    pub confidence: f64,
    /// What the verifier changed relative to the first pass, and why.
    #[serde(deserialize_with = "lenient::string")]
    pub changed_from_initial: String,
}

impl QualityAssessment {
    /// Applies every consistency rule to a freshly parsed assessment.
    pub fn normalize(&mut self) {
        self.hallucination_check.reconcile();

        let fidelity = &mut self.fidelity_score;
        fidelity.score = clamp_score(fidelity.score);
        if fidelity.total_claims > 0 {
            fidelity.supported_claims = fidelity.supported_claims.min(fidelity.total_claims);
            fidelity.grounding_ratio = ratio(fidelity.supported_claims, fidelity.total_claims);
        }

        self.completeness.score = clamp_score(self.completeness.score);
        self.relevance.score = clamp_score(self.relevance.score);
        self.coherence.score = clamp_score(self.coherence.score);

        if self.overall_quality.overall_score <= 0.0 {
            self.overall_quality.overall_score = self.mean_dimension_score();
        }

        self.enforce_overall();
    }

    /// Overrides the hallucination verdict with a deep verification.
    pub fn apply_verification(&mut self, verification: &DeepVerification) {
        let check = &mut self.hallucination_check;
        check.detected = verification.final_hallucination_detected;
        check.severity = verification.final_severity;
        if !verification.detailed_evidence.is_empty() {
            check.evidence = verification.detailed_evidence.clone();
        }
        check.align_severity();
        self.enforce_overall();
    }

    /// Whether the answer passes: no critical hallucination and every core
    /// dimension at 3 or above.
    pub fn is_acceptable(&self) -> bool {
        self.hallucination_check.severity != Severity::Critical
            && self.fidelity_score.score >= 3
            && self.completeness.score >= 3
            && self.coherence.score >= 3
    }

    fn enforce_overall(&mut self) {
        self.overall_quality.acceptable = self.is_acceptable();
        if self.hallucination_check.severity == Severity::Critical {
            self.overall_quality.recommendation = Recommendation::Reject;
        }
    }

    fn mean_dimension_score(&self) -> f64 {
        let scores: Vec<u32> = [
            self.fidelity_score.score,
            self.completeness.score,
            self.relevance.score,
            self.coherence.score,
        ]
        .into_iter()
        .filter(|s| *s > 0)
        .collect();

        match scores.len() {
            0 => 0.0,
            n => f64::from(scores.iter().sum::<u32>()) / n as f64,
        }
    }
}

//! Prompt templates for every judge.
//!
//! Templates carry named `{placeholder}` slots. [`render`] fills the slots it
//! is given and leaves every other brace alone, so the JSON output examples
//! inside the templates need no escaping.

use groundcheck_config::PromptVersion;
use groundcheck_core::{ConversationData, QuestionQuality};

/// Fills `{key}` slots in a single pass; values are never re-scanned.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let slot = after
            .find('}')
            .map(|close| (&after[..close], close))
            .filter(|(name, _)| is_slot_name(name))
            .and_then(|(name, close)| values.iter().find(|(k, _)| *k == name).map(|(_, v)| (*v, close)));

        match slot {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

fn is_slot_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Previous-turn block for context-dependent follow-up questions; empty on a first turn.
pub fn conversation_history(conversation: &ConversationData) -> String {
    match conversation.previous_turn() {
        Some(prev) => format!(
            "\n**PREVIOUS TURN (for context):**\nUser: {}\nAssistant: {}\n\n",
            prev.user_question, prev.ai_response
        ),
        None => String::new(),
    }
}

/// Question-quality block handed to downstream judges.
pub fn question_quality_block(quality: Option<&QuestionQuality>) -> String {
    let Some(quality) = quality else {
        return "Not assessed.".to_string();
    };
    let json = serde_json::to_string_pretty(quality).unwrap_or_default();
    let guidance = if quality.needs_clarification {
        "The question is vague or ambiguous: asking for clarification is acceptable and should not be penalized."
    } else if quality.clarity_score >= 4 {
        "The question is specific: the answer must be complete and precise, unnecessary clarification requests are a defect."
    } else {
        "The question is moderately clear: judge with normal criteria."
    };
    format!("{json}\n{guidance}")
}

/// Detector template for a prompt version.
pub fn hallucination_template(version: PromptVersion) -> &'static str {
    match version {
        PromptVersion::V1 => HALLUCINATION_V1,
        PromptVersion::V2 => HALLUCINATION_V2,
    }
}

pub const QUESTION_QUALITY: &str = r#"You are assessing the QUALITY of a question sent to an internal banking assistant.

The users are bank employees who know banking terminology. "The bank" always means their own bank. Do not mark a question as ambiguous when its meaning is clear to an employee.

**QUESTION:**
{user_question}
{conversation_history}
**CRITERIA:**
1. clarity_score (1-5): 1 = extremely vague ("card"), 3 = moderately clear ("credit card requirements"), 5 = very specific ("Visa Gold requirements for individuals with income above 3M").
2. context_completeness (1-5): does the question include the needed context (customer type, product, desired action)?
3. is_ambiguous: can the question reasonably be read in several different ways?
4. possible_interpretations: the readings, when ambiguous.
5. question_type: "informational" | "procedural" | "comparative" | "troubleshooting" | "vague".
6. missing_information: what extra detail would allow a better answer.
7. needs_clarification: true if clarity_score <= 2 OR is_ambiguous OR context_completeness <= 2.
8. clarification_needed: the clarifying questions the assistant should ask.

**OUTPUT FORMAT (JSON only, no markdown):**
{
  "clarity_score": 1-5,
  "context_completeness": 1-5,
  "is_ambiguous": true/false,
  "possible_interpretations": ["..."],
  "question_type": "informational",
  "missing_information": ["..."],
  "needs_clarification": true/false,
  "clarification_needed": ["..."],
  "explanation": "Why the question has this quality"
}"#;

const HALLUCINATION_V1: &str = r#"You are a CRITICAL EVALUATOR detecting hallucinations in the answers of an AI banking assistant.

Identify information the assistant made up, mixed incorrectly, or stated without support in the provided documents.

**CONTEXT:**
{conversation_history}- User Question: {user_question}
- Assistant Response: {ai_response}
- Documents Used: {documents}

**QUESTION QUALITY:**
{question_quality}

If a previous turn is shown, use it to resolve context-dependent questions.

**HALLUCINATION TYPES:**
- fabrication: stated but present in no document
- distortion: taken from a document but modified or exaggerated
- mixing: information from several documents combined incorrectly
- contradiction: the response contradicts a document

**SEVERITY:**
- critical: false information that could harm the customer (wrong procedure, wrong amounts)
- major: significant inaccuracy that misleads without immediate harm
- minor: small details wrong, core message accurate
- none: everything is grounded in the documents

**NOT HALLUCINATIONS:**
- asking for clarification when the documents lack the information
- saying the information is unavailable when the documents truly lack it
- courtesy phrases
- clearer rewording of document content

**OUTPUT FORMAT (JSON):**
{
  "hallucination_detected": true/false,
  "severity": "critical" | "major" | "minor" | "none",
  "hallucination_type": "fabrication" | "distortion" | "mixing" | "contradiction" | "none",
  "evidence": [
    {
      "claim": "Specific claim from the response",
      "status": "hallucination" | "grounded",
      "document_support": "Quote from a document or 'NOT FOUND'",
      "explanation": "Why this is or is not a hallucination"
    }
  ],
  "overall_assessment": "Brief explanation of the finding",
  "confidence": 0.0-1.0
}

**INSTRUCTIONS:**
1. Extract every factual claim from the response.
2. Search the documents for support for each claim.
3. Quote the supporting text.
4. Every unsupported claim MUST appear in "evidence" with status "hallucination". If hallucination_detected is true, at least one claim must carry that status.

Begin your analysis:"#;

const HALLUCINATION_V2: &str = r#"You are a STRICT AUDITOR of an AI banking assistant. Any statement not literally backed by the documents is a hallucination.

**CONTEXT:**
{conversation_history}- User Question: {user_question}
- Assistant Response: {ai_response}
- Documents Used: {documents}

**QUESTION QUALITY:**
{question_quality}

**STRICT RULES:**
1. Numbers, amounts, rates, dates, deadlines, URLs, emails, phone numbers, product names and procedure steps must appear verbatim (or as an exact paraphrase) in the documents.
2. An inference, however plausible, that the documents do not state is a hallucination.
3. Applying a process documented for one product to another product is "mixing".
4. Adding steps, conditions or exceptions not in the documents is "fabrication".
5. When in doubt, flag it.
Courtesy phrases and faithful summaries are still acceptable.

**SEVERITY:**
- critical: invented amounts, rates, contacts, legal data or procedures a customer could act on
- major: substantive unsupported information (a requirement, condition or step)
- minor: trivial unsupported detail, core message accurate
- none: every claim is literally supported

**OUTPUT FORMAT (JSON):**
{
  "hallucination_detected": true/false,
  "severity": "critical" | "major" | "minor" | "none",
  "hallucination_type": "fabrication" | "distortion" | "mixing" | "contradiction" | "none",
  "evidence": [
    {
      "claim": "Exact text from the response",
      "status": "hallucination" | "grounded",
      "document_support": "Verbatim quote or 'NOT FOUND'",
      "explanation": "Why"
    }
  ],
  "overall_assessment": "Brief explanation",
  "confidence": 0.0-1.0
}

List EVERY claim in "evidence". The status of each claim must agree with hallucination_detected.

Begin your audit:"#;

pub const DOCUMENT_RELEVANCE: &str = r#"You are evaluating whether the retrieved documents can answer the user's question.

**CONTEXT:**
{conversation_history}- User Question: {user_question}
- Documents Retrieved: {documents}

**OUTPUT FORMAT (JSON):**
{
  "relevance_score": 1-5,
  "has_answer": true/false,
  "missing_information": ["What information is missing"],
  "relevant_documents": ["Ids of relevant documents"],
  "irrelevant_documents": ["Ids of irrelevant documents"],
  "explanation": "Brief explanation"
}

**SCORING:**
- 5: documents fully answer the question
- 4: documents mostly answer it
- 3: documents hold some relevant information
- 2: documents are barely relevant
- 1: documents are unrelated

Begin your analysis:"#;

pub const COMPLETENESS: &str = r#"You are evaluating whether the assistant's response is complete given the documents available.

**CONTEXT:**
{conversation_history}- User Question: {user_question}
- Assistant Response: {ai_response}
- Documents Available: {documents}

**QUESTION QUALITY:**
{question_quality}

**OUTPUT FORMAT (JSON):**
{
  "completeness_score": 1-5,
  "used_all_relevant_info": true/false,
  "missing_information": ["Relevant document information left out of the response"],
  "unnecessary_clarification": true/false,
  "explanation": "What was missing, or why clarification was unnecessary"
}

**SCORING:**
- 5: complete, uses all relevant information
- 4: mostly complete, minor details missing
- 3: partial, some important information missing
- 2: incomplete, major gaps
- 1: very incomplete, or only asks for clarification although the answer was available

If the assistant asks for clarification while the documents clearly contain the answer, score 2 or lower and set unnecessary_clarification to true.

Begin your analysis:"#;

pub const ESCALATION: &str = r#"You are validating whether the decision to escalate (or not) to a human expert was appropriate.

**CONTEXT:**
{conversation_history}- User Question: {user_question}
- Assistant Response: {ai_response}
- Documents Available: {documents}
- Escalated to Expert: {escalated}
- Escalation Reason: {escalation_reason}

**OUTPUT FORMAT (JSON):**
{
  "escalation_appropriate": true/false,
  "should_have_escalated": true/false,
  "reason": "Why the decision was or was not appropriate",
  "alternative_action": "What should have been done instead, if anything"
}

**SHOULD escalate when:**
- the question stays unclear after clarification
- the documents lack the needed information
- the issue is outside the assistant's scope

**SHOULD NOT escalate when:**
- the documents contain the answer
- better retrieval or a better clarifying question would have solved it

Begin your analysis:"#;

pub const VERIFICATION: &str = r#"You are a VERIFICATION AGENT reviewing a hallucination reported by another agent.

**CONTEXT:**
- Original Finding: {original_finding}
- User Question: {user_question}
- Assistant Response: {ai_response}
- Documents: {documents}

Decide whether the finding is correct or a false positive.

**OUTPUT FORMAT (JSON):**
{
  "verified": true/false,
  "severity_adjustment": "none" | "increase" | "decrease",
  "new_severity": "critical" | "major" | "minor" | "none",
  "explanation": "Why you agree or disagree with the original finding",
  "final_recommendation": "approve" | "reject" | "review"
}

**CRITERIA:**
1. Re-read every document.
2. Separate faithful rewording from fabrication.
3. Check that the quoted evidence is accurate.
4. Rate the severity realistically.
Only confirm hallucinations backed by strong evidence.

Begin your verification:"#;

pub const MAIN_EVALUATION: &str = r#"You are an expert evaluator of an internal AI banking assistant used by bank employees.

**DATA:**
{conversation_history}- User question: {user_question}
- Available sources: {documents}
- Assistant response: {ai_response}

**QUESTION QUALITY:**
{question_quality}

Evaluate the response on five criteria.

1. HALLUCINATION CHECK (critical). A hallucination is any information not explicitly present in the sources: invented URLs or emails, false facts (numbers, dates, names), invented procedure steps, incoherent mixing of documents.
   Severity: "none" (0 hallucinations), "minor" (trivial additions), "major" (substantive unsupported information), "critical" (dangerous false information such as a fake URL or wrong legal data).
   Put the EXACT invented text in "evidence".

2. FIDELITY (1-5): share of claims supported by the sources. 1 = <20%, 2 = 20-50%, 3 = 50-80%, 4 = 80-95%, 5 = 100%.

3. COMPLETENESS (1-5): are all aspects of the question answered? First check whether the sources contained the answer. If they did and the assistant only asked for clarification, score 1-2 and set unnecessary_clarification.

4. RELEVANCE (1-5): does the response stay on topic?

5. COHERENCE (1-5): is the response free of internal contradictions?

OVERALL:
- acceptable = severity != "critical" AND fidelity >= 3 AND completeness >= 3 AND coherence >= 3
- quality_tier: "excellent" | "good" | "acceptable" | "poor" | "critical"
- overall_score (1.0-5.0): fidelity x 0.35 + completeness x 0.25 + relevance x 0.20 + coherence x 0.20, minus 2 for a major or critical hallucination
- recommendation: "reject" if not acceptable or critical; "review" for scores of 2-3 or a major hallucination; otherwise "approve"

**OUTPUT (JSON only, no markdown):**
{
  "hallucination_check": {
    "detected": true/false,
    "severity": "none" | "minor" | "major" | "critical",
    "evidence": ["exact invented text"],
    "type": ["url", "email", "fact", "procedure", "mixed_sources"],
    "explanation": "..."
  },
  "fidelity_score": {
    "score": 1-5,
    "grounding_level": "fully_grounded" | "mostly_grounded" | "partially_grounded" | "ungrounded",
    "total_claims": 0,
    "supported_claims": 0,
    "unsupported_claims": 0,
    "grounding_ratio": 0.0
  },
  "completeness": {
    "score": 1-5,
    "question_aspects": ["..."],
    "answered_aspects": ["..."],
    "missing_aspects": ["..."],
    "completeness_rate": 0.0,
    "sources_had_answer": true/false,
    "unnecessary_clarification": true/false
  },
  "relevance": {
    "score": 1-5,
    "is_on_topic": true/false,
    "main_topic": "...",
    "irrelevant_content": ["..."],
    "relevance_ratio": 0.0
  },
  "coherence": {
    "score": 1-5,
    "has_contradictions": true/false,
    "contradictions": ["..."],
    "logical_flow": "smooth" | "acceptable" | "problematic"
  },
  "overall_quality": {
    "acceptable": true/false,
    "quality_tier": "good",
    "overall_score": 1.0-5.0,
    "critical_issues": ["..."],
    "recommendation": "approve" | "review" | "reject",
    "reasoning": "..."
  }
}"#;

pub const DEEP_VERIFICATION: &str = r#"ALERT: this conversation was flagged for possible critical problems.

**CONTEXT:**
- User question: {user_question}
- Available sources: {documents}
- Assistant response: {ai_response}

**INITIAL EVALUATION:**
{initial_result}

Run a deep hallucination check. Assume the initial evaluation may be wrong.
For EVERY sentence of the response:
a) Is it LITERALLY in the sources?
b) If it is an inference, is it logically valid?
c) Does every URL, email or specific figure appear exactly in the sources?

Mark as hallucination: URLs, emails, numbers, dates or names not in the sources; procedure steps not described; misleading combinations of documents.
Do not mark: faithful rewording, logical connectors, generic courtesy, accurate summaries.

**OUTPUT (JSON only):**
{
  "verification": {
    "agrees_with_initial": true/false,
    "final_hallucination_detected": true/false,
    "final_severity": "none" | "minor" | "major" | "critical",
    "detailed_evidence": ["exact excerpt with the reason"],
    "confidence": 0.0-1.0,
    "changed_from_initial": "What changed and why"
  }
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fills_known_slots_and_keeps_the_rest() {
        let out = render(
            "Q: {user_question}\n{\"a\": {unknown}} {user_question}",
            &[("user_question", "¿Tasa?")],
        );
        assert_eq!(out, "Q: ¿Tasa?\n{\"a\": {unknown}} ¿Tasa?");
    }

    #[test]
    fn does_not_rescan_substituted_values() {
        let out = render("{a} {b}", &[("a", "{b}"), ("b", "x")]);
        assert_eq!(out, "{b} x");
    }

    #[test]
    fn handles_unclosed_brace() {
        assert_eq!(render("tail {open", &[("open", "x")]), "tail {open");
    }

    #[test]
    fn history_only_for_follow_up_turns() {
        let first = ConversationData::new("s1", "q", "a", "docs");
        assert_eq!(conversation_history(&first), "");

        let follow_up = first.with_previous_turn("¿Qué es un CDT?", "Un depósito a término.");
        let history = conversation_history(&follow_up);
        assert!(history.contains("User: ¿Qué es un CDT?"));
        assert!(history.contains("Assistant: Un depósito a término."));
    }

    #[test]
    fn every_template_exposes_its_slots() {
        for template in [HALLUCINATION_V1, HALLUCINATION_V2, COMPLETENESS, MAIN_EVALUATION] {
            assert!(template.contains("{question_quality}"));
            assert!(template.contains("{conversation_history}"));
        }
        assert!(ESCALATION.contains("{escalation_reason}"));
        assert!(VERIFICATION.contains("{original_finding}"));
        assert!(DEEP_VERIFICATION.contains("{initial_result}"));
    }

    #[test]
    fn quality_block_reflects_clarity() {
        assert_eq!(question_quality_block(None), "Not assessed.");

        let vague = QuestionQuality { clarity_score: 1, needs_clarification: true, ..Default::default() };
        assert!(question_quality_block(Some(&vague)).contains("clarification is acceptable"));

        let specific = QuestionQuality { clarity_score: 5, ..Default::default() };
        assert!(question_quality_block(Some(&specific)).contains("must be complete"));
    }
}

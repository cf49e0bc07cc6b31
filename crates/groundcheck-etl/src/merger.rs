//! Joins traces, escalations and the knowledge base into evaluable turns.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use groundcheck_core::ConversationData;
use tracing::info;

use crate::loader::{ConversationRow, EscalationRow, KnowledgeRow, RawTables, TraceRow};
use crate::traces::{parse_timestamp, TraceExtraction};

const DOCUMENT_SEPARATOR: &str = "\n\n---\n\n";

/// Normalizes ids exported as floats (`"12.0"`) to integers.
pub fn parse_numeric_id(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

fn normalize_key(raw: &str) -> String {
    parse_numeric_id(raw).map_or_else(|| raw.trim().to_string(), |id| id.to_string())
}

fn parse_number(raw: &str) -> f64 {
    raw.trim().parse::<f64>().ok().filter(|f| f.is_finite()).unwrap_or(0.0)
}

// ============================================================================
// Turns
// ============================================================================

/// One complete bot turn, ordered within its session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnRecord {
    pub trace_id: String,
    pub session_id: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub user_question: String,
    pub ai_response: String,
    pub sources: Vec<String>,
    pub need_expert: bool,
    pub expert_category: Option<String>,
    pub user_message_count: Option<u32>,
    pub prev_user_question: Option<String>,
    pub prev_ai_response: Option<String>,
    pub turn_number: u32,
    pub total_turns: u32,
    pub total_cost: f64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Keeps complete traces, orders them per session and links each turn to
/// the one before it.
///
/// Traces sort by session, then timestamp. Unparseable timestamps sort
/// first within their session, keeping file order among themselves.
pub fn build_turns(traces: &[TraceRow]) -> Vec<TurnRecord> {
    let mut turns: Vec<TurnRecord> = traces
        .iter()
        .filter_map(|row| {
            let extraction = TraceExtraction::from_output(&row.output);
            if !extraction.is_complete() {
                return None;
            }
            Some(TurnRecord {
                trace_id: row.id.trim().to_string(),
                session_id: row.session_id.trim().to_string(),
                timestamp: parse_timestamp(&row.timestamp),
                user_question: extraction.user_question.unwrap_or_default(),
                ai_response: extraction.ai_response.unwrap_or_default(),
                sources: extraction.sources,
                need_expert: extraction.need_expert,
                expert_category: extraction.expert_category,
                user_message_count: extraction.user_message_count,
                total_cost: parse_number(&row.total_cost),
                input_tokens: parse_number(&row.input_tokens) as u64,
                output_tokens: parse_number(&row.output_tokens) as u64,
                ..Default::default()
            })
        })
        .collect();

    turns.sort_by(|a, b| (&a.session_id, a.timestamp).cmp(&(&b.session_id, b.timestamp)));

    let mut start = 0;
    while start < turns.len() {
        let session = turns[start].session_id.clone();
        let end = turns[start..]
            .iter()
            .position(|t| t.session_id != session)
            .map_or(turns.len(), |offset| start + offset);
        let total = (end - start) as u32;

        for index in start..end {
            let previous = (index > start).then(|| {
                let prev = &turns[index - 1];
                (prev.user_question.clone(), prev.ai_response.clone())
            });
            let turn = &mut turns[index];
            turn.turn_number = (index - start) as u32 + 1;
            turn.total_turns = total;
            if let Some((question, response)) = previous {
                turn.prev_user_question = Some(question);
                turn.prev_ai_response = Some(response);
            }
        }
        start = end;
    }

    turns
}

// ============================================================================
// Knowledge base
// ============================================================================

/// Knowledge-base articles indexed by numeric id.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    docs: HashMap<i64, KnowledgeRow>,
}

/// Document text assembled for one turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedDocuments {
    pub text: String,
    /// Cited ids that resolved to an article with content.
    pub matched_ids: Vec<String>,
    pub unmatched: usize,
}

impl KnowledgeBase {
    pub fn from_rows(rows: &[KnowledgeRow]) -> Self {
        let mut docs = HashMap::new();
        for row in rows {
            if let Some(id) = parse_numeric_id(&row.document_id) {
                docs.entry(id).or_insert_with(|| row.clone());
            }
        }
        Self { docs }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn get(&self, source: &str) -> Option<&KnowledgeRow> {
        parse_numeric_id(source).and_then(|id| self.docs.get(&id))
    }

    /// Renders cited articles as `Documento {id}: {title}\n{content}` blocks.
    pub fn render(&self, sources: &[String]) -> RenderedDocuments {
        let mut blocks = Vec::new();
        let mut matched_ids = Vec::new();

        for source in sources {
            let Some(id) = parse_numeric_id(source) else { continue };
            let Some(doc) = self.docs.get(&id).filter(|d| !d.content.trim().is_empty()) else { continue };
            blocks.push(format!("Documento {}: {}\n{}", id, doc.title.trim(), doc.content.trim()));
            matched_ids.push(id.to_string());
        }

        RenderedDocuments {
            text: blocks.join(DOCUMENT_SEPARATOR),
            unmatched: sources.len() - matched_ids.len(),
            matched_ids,
        }
    }
}

// ============================================================================
// Escalations
// ============================================================================

/// Escalation rows reachable from a trace session id.
#[derive(Debug, Clone, Default)]
pub struct EscalationIndex {
    by_session: HashMap<String, EscalationRow>,
}

impl EscalationIndex {
    /// Links escalations to sessions through the conversation registry.
    pub fn build(conversations: &[ConversationRow], escalations: &[EscalationRow]) -> Self {
        let session_by_conversation: HashMap<String, String> = conversations
            .iter()
            .filter(|c| !c.session_id.trim().is_empty())
            .map(|c| (normalize_key(&c.id), c.session_id.trim().to_string()))
            .collect();

        let mut by_session = HashMap::new();
        for row in escalations {
            if let Some(session) = session_by_conversation.get(&normalize_key(&row.conversation_id)) {
                by_session.entry(session.clone()).or_insert_with(|| row.clone());
            }
        }
        Self { by_session }
    }

    pub fn get(&self, session_id: &str) -> Option<&EscalationRow> {
        self.by_session.get(session_id)
    }

    pub fn len(&self) -> usize {
        self.by_session.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_session.is_empty()
    }
}

// ============================================================================
// Merge
// ============================================================================

/// Counters describing a merge, for logs and setup checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub traces: usize,
    pub complete_traces: usize,
    pub sessions: usize,
    pub multi_turn_sessions: usize,
    pub documents_cited: usize,
    pub documents_matched: usize,
    pub escalated_turns: usize,
}

impl MergeStats {
    /// Share of cited sources found in the knowledge base, in percent.
    pub fn match_rate(&self) -> f64 {
        match self.documents_cited {
            0 => 0.0,
            n => self.documents_matched as f64 / n as f64 * 100.0,
        }
    }
}

/// Result of joining all input tables.
#[derive(Debug, Clone, Default)]
pub struct MergedDataset {
    pub turns: Vec<TurnRecord>,
    pub conversations: Vec<ConversationData>,
    pub stats: MergeStats,
}

/// Joins all tables into one evaluable conversation per complete turn.
pub fn merge(tables: &RawTables) -> MergedDataset {
    let turns = build_turns(&tables.traces);
    let knowledge = KnowledgeBase::from_rows(&tables.knowledge_base);
    let escalations = EscalationIndex::build(&tables.conversations, &tables.escalations);

    let mut stats = MergeStats {
        traces: tables.traces.len(),
        complete_traces: turns.len(),
        ..Default::default()
    };

    let sessions: HashSet<&str> = turns.iter().map(|t| t.session_id.as_str()).collect();
    stats.sessions = sessions.len();
    stats.multi_turn_sessions = turns.iter().filter(|t| t.turn_number == 2).count();

    let conversations: Vec<ConversationData> = turns
        .iter()
        .map(|turn| {
            let documents = knowledge.render(&turn.sources);
            stats.documents_cited += turn.sources.len();
            stats.documents_matched += documents.matched_ids.len();

            let conversation = to_conversation(turn, documents, escalations.get(&turn.session_id));
            if conversation.escalated {
                stats.escalated_turns += 1;
            }
            conversation
        })
        .collect();

    info!("╔══════════════════════════════════════════════════════════════");
    info!("║ MERGE: {} traces -> {} complete turns", stats.traces, stats.complete_traces);
    info!("║ Sessions: {} ({} multi-turn)", stats.sessions, stats.multi_turn_sessions);
    info!(
        "║ Documents matched: {}/{} ({:.1}%)",
        stats.documents_matched,
        stats.documents_cited,
        stats.match_rate()
    );
    info!("║ Escalated turns: {} (index covers {} sessions)", stats.escalated_turns, escalations.len());
    info!("╚══════════════════════════════════════════════════════════════");

    MergedDataset { turns, conversations, stats }
}

fn to_conversation(turn: &TurnRecord, documents: RenderedDocuments, escalation: Option<&EscalationRow>) -> ConversationData {
    let escalation_reason = escalation
        .and_then(|row| {
            [&row.escalation_reason, &row.expert_category]
                .into_iter()
                .map(|s| s.trim())
                .find(|s| !s.is_empty())
                .map(str::to_string)
        })
        .or_else(|| turn.expert_category.clone());

    let mut metadata = std::collections::BTreeMap::new();
    if let Some(ts) = turn.timestamp {
        metadata.insert("timestamp".to_string(), ts.to_rfc3339());
    }
    if let Some(category) = &turn.expert_category {
        metadata.insert("expert_category".to_string(), category.clone());
    }
    if let Some(count) = turn.user_message_count {
        metadata.insert("user_message_count".to_string(), count.to_string());
    }
    metadata.insert("sources".to_string(), turn.sources.join(","));
    metadata.insert("documents_unmatched".to_string(), documents.unmatched.to_string());
    metadata.insert("total_cost".to_string(), turn.total_cost.to_string());
    metadata.insert("input_tokens".to_string(), turn.input_tokens.to_string());
    metadata.insert("output_tokens".to_string(), turn.output_tokens.to_string());

    let escalated = turn.need_expert || escalation.is_some();

    ConversationData {
        session_id: turn.session_id.clone(),
        trace_id: Some(turn.trace_id.clone()),
        user_question: turn.user_question.clone(),
        ai_response: turn.ai_response.clone(),
        documents: documents.text,
        document_ids: documents.matched_ids,
        escalated,
        escalation_reason: escalated.then_some(escalation_reason).flatten(),
        prev_user_question: turn.prev_user_question.clone(),
        prev_ai_response: turn.prev_ai_response.clone(),
        turn_number: turn.turn_number,
        total_turns: turn.total_turns,
        metadata,
    }
}

/// Keeps only the opening turn of every session.
pub fn first_turn_per_session(conversations: Vec<ConversationData>) -> Vec<ConversationData> {
    conversations.into_iter().filter(|c| c.turn_number == 1).collect()
}

// ============================================================================
// Session summaries
// ============================================================================

/// Session-level aggregate of its complete turns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    pub session_id: String,
    pub first_trace_id: String,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub turns: u32,
    pub last_user_question: String,
    pub last_ai_response: String,
    pub sources: Vec<String>,
    pub need_expert: bool,
    pub expert_category: Option<String>,
    pub total_cost: f64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Aggregates ordered turns (as returned by [`build_turns`]) per session.
pub fn session_summaries(turns: &[TurnRecord]) -> Vec<SessionSummary> {
    let mut summaries: Vec<SessionSummary> = Vec::new();

    for turn in turns {
        let is_new = summaries.last().map_or(true, |s| s.session_id != turn.session_id);
        if is_new {
            summaries.push(SessionSummary {
                session_id: turn.session_id.clone(),
                first_trace_id: turn.trace_id.clone(),
                first_timestamp: turn.timestamp,
                ..Default::default()
            });
        }

        let Some(summary) = summaries.last_mut() else { continue };
        summary.turns += 1;
        summary.last_user_question = turn.user_question.clone();
        summary.last_ai_response = turn.ai_response.clone();
        for source in &turn.sources {
            if !summary.sources.contains(source) {
                summary.sources.push(source.clone());
            }
        }
        summary.need_expert |= turn.need_expert;
        if turn.expert_category.is_some() {
            summary.expert_category = turn.expert_category.clone();
        }
        summary.total_cost += turn.total_cost;
        summary.input_tokens += turn.input_tokens;
        summary.output_tokens += turn.output_tokens;
    }

    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn trace(id: &str, session: &str, timestamp: &str, question: &str, sources: &str) -> TraceRow {
        TraceRow {
            id: id.into(),
            timestamp: timestamp.into(),
            session_id: session.into(),
            output: format!(
                r#"{{"user_question": "{question}", "lastMessage": "answer to {question}", "sources": {sources}}}"#
            ),
            total_cost: "0.5".into(),
            input_tokens: "100".into(),
            output_tokens: "20.0".into(),
            ..Default::default()
        }
    }

    fn kb(id: &str, title: &str, content: &str) -> KnowledgeRow {
        KnowledgeRow {
            document_id: id.into(),
            title: title.into(),
            content: content.into(),
            keywords: String::new(),
        }
    }

    #[test]
    fn orders_turns_and_links_previous_context() {
        let traces = vec![
            trace("t2", "s1", "2025-09-25T10:05:00Z", "second", "[1]"),
            trace("t3", "s2", "2025-09-25T09:00:00Z", "other", "[2]"),
            trace("t1", "s1", "2025-09-25T10:00:00Z", "first", "[1]"),
            trace("tx", "s1", "2025-09-25T10:10:00Z", "no sources", "[]"),
        ];

        let turns = build_turns(&traces);
        let ids: Vec<&str> = turns.iter().map(|t| t.trace_id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2", "t3"]);

        assert_eq!(turns[0].turn_number, 1);
        assert_eq!(turns[0].total_turns, 2);
        assert_eq!(turns[0].prev_user_question, None);
        assert_eq!(turns[1].turn_number, 2);
        assert_eq!(turns[1].prev_user_question.as_deref(), Some("first"));
        assert_eq!(turns[1].prev_ai_response.as_deref(), Some("answer to first"));
        assert_eq!(turns[2].total_turns, 1);
        assert_eq!(turns[2].output_tokens, 20);
    }

    #[test]
    fn renders_matched_documents_only() {
        let base = KnowledgeBase::from_rows(&[kb("1", "Tasas", "2% mensual"), kb("2.0", "Vacío", " "), kb("x", "Bad", "c")]);
        assert_eq!(base.len(), 2);

        let rendered = base.render(&["1.0".into(), "2".into(), "99".into(), "tarjetas".into()]);
        assert_eq!(rendered.text, "Documento 1: Tasas\n2% mensual");
        assert_eq!(rendered.matched_ids, vec!["1".to_string()]);
        assert_eq!(rendered.unmatched, 3);

        let two = KnowledgeBase::from_rows(&[kb("1", "A", "a"), kb("2", "B", "b")]).render(&["2".into(), "1".into()]);
        assert_eq!(two.text, "Documento 2: B\nb\n\n---\n\nDocumento 1: A\na");
    }

    #[test]
    fn merges_escalations_through_conversation_registry() {
        let tables = RawTables {
            conversations: vec![ConversationRow { id: "10.0".into(), session_id: "s1".into() }],
            escalations: vec![EscalationRow {
                conversation_id: "10".into(),
                expert_category: "tarjetas".into(),
                escalation_reason: String::new(),
            }],
            traces: vec![
                trace("t1", "s1", "2025-09-25T10:00:00Z", "first", "[1]"),
                trace("t2", "s2", "2025-09-25T10:00:00Z", "solo", "[1, 5]"),
            ],
            knowledge_base: vec![kb("1", "Tasas", "2% mensual")],
        };

        let merged = merge(&tables);
        assert_eq!(merged.conversations.len(), 2);

        let escalated = &merged.conversations[0];
        assert_eq!(escalated.session_id, "s1");
        assert!(escalated.escalated);
        assert_eq!(escalated.escalation_reason.as_deref(), Some("tarjetas"));
        assert_eq!(escalated.trace_id.as_deref(), Some("t1"));
        assert_eq!(escalated.documents, "Documento 1: Tasas\n2% mensual");

        let plain = &merged.conversations[1];
        assert!(!plain.escalated);
        assert_eq!(plain.escalation_reason, None);
        assert_eq!(plain.metadata.get("documents_unmatched").map(String::as_str), Some("1"));

        assert_eq!(merged.stats.documents_cited, 3);
        assert_eq!(merged.stats.documents_matched, 2);
        assert_eq!(merged.stats.escalated_turns, 1);
        assert_eq!(merged.stats.sessions, 2);
    }

    #[test]
    fn need_expert_alone_marks_escalation() {
        let mut row = trace("t1", "s9", "", "q", "[1]");
        row.output = r#"{"user_question": "q", "lastMessage": "a", "sources": [1],
            "structured_response": {"need_expert": true}, "expert_category": "creditos"}"#
            .into();

        let merged = merge(&RawTables { traces: vec![row], ..Default::default() });
        let conv = &merged.conversations[0];
        assert!(conv.escalated);
        assert_eq!(conv.escalation_reason.as_deref(), Some("creditos"));
        assert!(conv.documents.is_empty());
    }

    #[test]
    fn summarizes_sessions() {
        let traces = vec![
            trace("t1", "s1", "2025-09-25T10:00:00Z", "first", "[1, 2]"),
            trace("t2", "s1", "2025-09-25T10:05:00Z", "second", "[2, 3]"),
        ];
        let summaries = session_summaries(&build_turns(&traces));

        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.turns, 2);
        assert_eq!(summary.first_trace_id, "t1");
        assert_eq!(summary.last_user_question, "second");
        assert_eq!(summary.sources, vec!["1", "2", "3"]);
        assert_eq!(summary.total_cost, 1.0);
        assert_eq!(summary.input_tokens, 200);
    }

    #[test]
    fn keeps_first_turns() {
        let merged = merge(&RawTables {
            traces: vec![
                trace("t1", "s1", "2025-09-25T10:00:00Z", "first", "[1]"),
                trace("t2", "s1", "2025-09-25T10:05:00Z", "second", "[1]"),
            ],
            ..Default::default()
        });
        let firsts = first_turn_per_session(merged.conversations);
        assert_eq!(firsts.len(), 1);
        assert_eq!(firsts[0].user_question, "first");
    }
}

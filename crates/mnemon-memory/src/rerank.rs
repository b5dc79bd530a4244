// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM-based result reranking.
//!
//! Queries are classified into coarse types with a keyword/pattern table
//! (English-specific; the table is the contract), a candidate prompt is
//! assembled with stable `[i]` indices, and the model's JSON-array reply
//! remaps scores. Parse and transport failures are retried with linear
//! backoff; terminal failure falls back to the hybrid ordering.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use mnemon_core::traits::LlmAdapter;
use mnemon_core::types::SearchResult;

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_SECS: u64 = 1;

/// Candidate content is truncated to this many characters in the prompt.
const PROMPT_CONTENT_MAX_CHARS: usize = 1000;

/// Coarse query categories driving the rerank instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Temporal,
    KnowledgeUpdate,
    MultiHop,
    Preference,
    AssistantRecall,
    Factual,
    General,
}

/// Ordered classification table; the first matching pattern wins.
static CLASSIFIER: LazyLock<Vec<(QueryType, Regex)>> = LazyLock::new(|| {
    vec![
        (
            QueryType::Temporal,
            Regex::new(r"\b(when|what (date|time|day|month|year)|how long ago|how recently|last time|first time|before|after)\b").unwrap(),
        ),
        (
            QueryType::KnowledgeUpdate,
            Regex::new(r"\b(change|update|move|switch|new|current|now|still|anymore|used to|latest)\b").unwrap(),
        ),
        (
            QueryType::MultiHop,
            Regex::new(r"\bwhat .+ (of|for) .+ (the|my|a) .+\b").unwrap(),
        ),
        (
            QueryType::MultiHop,
            Regex::new(r"\b\w+'s \w+'s\b").unwrap(),
        ),
        (
            QueryType::Preference,
            Regex::new(r"\b(favorite|prefer|like|enjoy|love|hate|dislike|opinion)\b").unwrap(),
        ),
        (
            QueryType::AssistantRecall,
            Regex::new(r"\b(you (said|told|recommended|suggested|mentioned)|did you|your (advice|recommendation|suggestion))\b").unwrap(),
        ),
        (
            QueryType::Factual,
            Regex::new(r"\b(who|what|where|which|name|tell me about)\b").unwrap(),
        ),
    ]
});

/// Classify a query by the first matching pattern, else [`QueryType::General`].
pub fn classify_query(query: &str) -> QueryType {
    let query = query.to_lowercase();
    for (query_type, pattern) in CLASSIFIER.iter() {
        if pattern.is_match(&query) {
            return *query_type;
        }
    }
    QueryType::General
}

fn instruction(query_type: QueryType) -> &'static str {
    match query_type {
        QueryType::Temporal => {
            "Give the highest scores to results whose dates best match the time reference in the question."
        }
        QueryType::KnowledgeUpdate => {
            "Prefer the most recent information; score outdated states lower than the current one."
        }
        QueryType::MultiHop => {
            "Prefer results that connect the entities needed to answer the question, even indirectly."
        }
        QueryType::Preference => {
            "Prefer results that state the user's tastes, preferences, or opinions."
        }
        QueryType::AssistantRecall => {
            "Prefer results that record what the assistant previously said, suggested, or recommended."
        }
        QueryType::Factual => "Prefer results that directly state the requested fact.",
        QueryType::General => "Prefer the results most relevant to the question.",
    }
}

#[derive(Debug, Deserialize)]
struct RerankEntry {
    index: usize,
    score: f32,
}

/// LLM reranker over hybrid search results.
pub struct Reranker {
    llm: Arc<dyn LlmAdapter>,
    model: String,
}

impl Reranker {
    pub fn new(llm: Arc<dyn LlmAdapter>, model: String) -> Self {
        Self { llm, model }
    }

    /// Rescore `results` down to the top `k`.
    ///
    /// Returns the input unchanged when it already fits in `k`. On terminal
    /// rerank failure the hybrid ordering is kept and truncated to `k`.
    pub async fn rerank(
        &self,
        query: &str,
        mut results: Vec<SearchResult>,
        k: usize,
    ) -> Vec<SearchResult> {
        if results.len() <= k {
            return results;
        }

        let query_type = classify_query(query);
        let prompt = build_rerank_prompt(query, query_type, &results);

        for attempt in 1..=MAX_ATTEMPTS {
            match self.llm.generate(&self.model, &prompt).await {
                Ok(reply) => match parse_rerank_response(&reply) {
                    Some(entries) if !entries.is_empty() => {
                        debug!(candidates = results.len(), k, "rerank succeeded");
                        return apply_scores(results, &entries, k);
                    }
                    _ => warn!(attempt, "rerank reply did not contain a usable JSON array"),
                },
                Err(e) => warn!(attempt, error = %e, "rerank call failed"),
            }
            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(Duration::from_secs(BACKOFF_SECS * u64::from(attempt))).await;
            }
        }

        warn!("rerank exhausted retries, keeping hybrid ordering");
        results.truncate(k);
        results
    }
}

/// Enumerate candidates with stable indices, optional dates, and the
/// type-specific instruction.
fn build_rerank_prompt(query: &str, query_type: QueryType, results: &[SearchResult]) -> String {
    let mut prompt = format!(
        "You are reranking search results for the question below.\n\nQuestion: {query}\n\nResults:\n"
    );
    for (i, result) in results.iter().enumerate() {
        let content: String = result.content.chars().take(PROMPT_CONTENT_MAX_CHARS).collect();
        match &result.date {
            Some(date) => prompt.push_str(&format!("[{i}] ({date}) {content}\n")),
            None => prompt.push_str(&format!("[{i}] {content}\n")),
        }
    }
    prompt.push_str(&format!(
        "\n{}\nScore every result from 0 to 10 for how well it helps answer the question. \
         Respond with only a JSON array of objects, one per result, like \
         [{{\"index\": 0, \"score\": 7}}].",
        instruction(query_type)
    ));
    prompt
}

/// Pull the first `[...]` block out of the reply and parse it.
fn parse_rerank_response(reply: &str) -> Option<Vec<RerankEntry>> {
    let start = reply.find('[')?;
    let end = reply[start..].find(']')? + start;
    serde_json::from_str::<Vec<RerankEntry>>(&reply[start..=end]).ok()
}

/// Attach rerank scores, remap the fused score, and keep the top `k`.
fn apply_scores(
    mut results: Vec<SearchResult>,
    entries: &[RerankEntry],
    k: usize,
) -> Vec<SearchResult> {
    for entry in entries {
        if let Some(result) = results.get_mut(entry.index) {
            result.rerank_score = Some(entry.score.clamp(0.0, 10.0));
        }
    }
    for result in &mut results {
        result.score = result.rerank_score.unwrap_or(0.0) / 10.0;
    }
    results.sort_by(|a, b| {
        b.rerank_score
            .unwrap_or(0.0)
            .partial_cmp(&a.rerank_score.unwrap_or(0.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(k);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemon_test_utils::MockLlm;

    fn result(content: &str, score: f32) -> SearchResult {
        SearchResult {
            content: content.to_string(),
            score,
            vector_score: score,
            bm25_score: 0.0,
            rerank_score: None,
            session_id: Some("s1".to_string()),
            chunk_index: Some(0),
            date: None,
            event_date: None,
            metadata: None,
            kind: None,
            name: None,
            entity_type: None,
            source: None,
            target: None,
            relation: None,
        }
    }

    #[test]
    fn classifier_matches_the_pattern_table() {
        assert_eq!(classify_query("When did I buy the camera?"), QueryType::Temporal);
        assert_eq!(classify_query("what is my current address"), QueryType::KnowledgeUpdate);
        assert_eq!(
            classify_query("my sister's husband's job"),
            QueryType::MultiHop
        );
        assert_eq!(classify_query("what is my favorite food"), QueryType::Preference);
        assert_eq!(
            classify_query("what restaurant did you recommend"),
            QueryType::AssistantRecall
        );
        assert_eq!(classify_query("who is Alice"), QueryType::Factual);
        assert_eq!(classify_query("summarize everything"), QueryType::General);
    }

    #[test]
    fn classifier_order_resolves_overlaps() {
        // "when" (temporal) wins over "what" (factual).
        assert_eq!(
            classify_query("when did we talk about what matters"),
            QueryType::Temporal
        );
    }

    #[test]
    fn prompt_enumerates_and_truncates() {
        let long = "x".repeat(2000);
        let mut with_date = result("dated", 0.5);
        with_date.date = Some("2024-05-09".to_string());
        let results = vec![with_date, result(&long, 0.4)];

        let prompt = build_rerank_prompt("query", QueryType::General, &results);
        assert!(prompt.contains("[0] (2024-05-09) dated"));
        assert!(prompt.contains("[1] "));
        assert!(!prompt.contains(&long), "content must be truncated");
        assert!(prompt.contains("JSON array"));
    }

    #[test]
    fn parse_accepts_wrapped_arrays() {
        let reply = "Here you go:\n[{\"index\": 0, \"score\": 9}, {\"index\": 1, \"score\": 2}]\nDone.";
        let entries = parse_rerank_response(reply).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].index, 0);
        assert!((entries[0].score - 9.0).abs() < f32::EPSILON);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_rerank_response("no array here").is_none());
        assert!(parse_rerank_response("[not json]").is_none());
    }

    #[tokio::test]
    async fn small_result_sets_skip_the_llm() {
        let llm = Arc::new(MockLlm::new());
        let reranker = Reranker::new(Arc::clone(&llm) as Arc<dyn LlmAdapter>, "rerank-model".to_string());

        let results = vec![result("a", 0.9), result("b", 0.8)];
        let out = reranker.rerank("query", results, 2).await;
        assert_eq!(out.len(), 2);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn successful_rerank_reorders_and_remaps() {
        let llm = Arc::new(MockLlm::with_responses(vec![
            "[{\"index\": 0, \"score\": 2}, {\"index\": 1, \"score\": 9}, {\"index\": 2, \"score\": 5}]".into(),
        ]));
        let reranker = Reranker::new(Arc::clone(&llm) as Arc<dyn LlmAdapter>, "rerank-model".to_string());

        let results = vec![result("a", 0.9), result("b", 0.8), result("c", 0.7)];
        let out = reranker.rerank("query", results, 2).await;

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].content, "b");
        assert_eq!(out[0].rerank_score, Some(9.0));
        assert!((out[0].score - 0.9).abs() < 1e-6, "score remaps to rerank/10");
        assert_eq!(out[1].content, "c");
        // Component scores survive the remap.
        assert!(out[0].vector_score > 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_replies_fall_back_to_hybrid_order() {
        let llm = Arc::new(MockLlm::with_responses(vec![
            "nonsense".into(),
            "still nonsense".into(),
            "more nonsense".into(),
        ]));
        let reranker = Reranker::new(Arc::clone(&llm) as Arc<dyn LlmAdapter>, "rerank-model".to_string());

        let results = vec![result("a", 0.9), result("b", 0.8), result("c", 0.7)];
        let out = reranker.rerank("query", results, 2).await;

        assert_eq!(llm.call_count(), 3, "three attempts before falling back");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].content, "a", "hybrid order preserved on fallback");
        assert_eq!(out[1].content, "b");
        assert!(out[0].rerank_score.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_also_fall_back() {
        let llm = Arc::new(MockLlm::new());
        for _ in 0..3 {
            llm.push_transport_error("down");
        }
        let reranker = Reranker::new(Arc::clone(&llm) as Arc<dyn LlmAdapter>, "rerank-model".to_string());

        let results = vec![result("a", 0.9), result("b", 0.8), result("c", 0.7)];
        let out = reranker.rerank("query", results, 1).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].content, "a");
    }
}

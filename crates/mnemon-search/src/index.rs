// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-container hybrid search index.
//!
//! Combines the cosine vector index and the BM25 lexical index under one
//! upsert/query surface. Queries fetch the vector top-k first, evaluate
//! BM25 over exactly that candidate set, normalize the lexical scores by
//! the candidate-set maximum, and fuse with fixed weights.
//!
//! The lexical normalization is relative to the retrieved candidate set,
//! not the corpus; consumers combining results across containers must
//! rescale.

use std::collections::HashMap;

use mnemon_core::error::MnemonError;
use mnemon_core::types::Chunk;

use crate::lexical::LexicalIndex;
use crate::vector::VectorIndex;

/// A chunk with its fused and component scores.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
    pub vector_score: f32,
    pub bm25_score: f32,
}

/// Hybrid index over one container's chunks.
#[derive(Debug, Default)]
pub struct SearchIndex {
    chunks: HashMap<String, Chunk>,
    vector: VectorIndex,
    lexical: LexicalIndex,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an index from persisted chunks.
    ///
    /// Fails with a configuration error when the chunks disagree on
    /// embedding dimension.
    pub fn from_chunks(chunks: Vec<Chunk>) -> Result<Self, MnemonError> {
        let mut index = Self::new();
        index.upsert(chunks)?;
        Ok(index)
    }

    /// Insert or replace chunks by id.
    ///
    /// Every embedding must be non-empty and match the dimension already
    /// present in the index. The whole batch is validated before anything
    /// is inserted, so a rejected batch leaves the index untouched.
    pub fn upsert(&mut self, incoming: Vec<Chunk>) -> Result<(), MnemonError> {
        let mut dim = self.vector.dimension();
        for chunk in &incoming {
            if chunk.embedding.is_empty() {
                return Err(MnemonError::Config(format!(
                    "chunk {} has an empty embedding",
                    chunk.id
                )));
            }
            match dim {
                Some(expected) if chunk.embedding.len() != expected => {
                    return Err(MnemonError::Config(format!(
                        "chunk {} embedding dimension {} does not match index dimension {expected}",
                        chunk.id,
                        chunk.embedding.len()
                    )));
                }
                Some(_) => {}
                None => dim = Some(chunk.embedding.len()),
            }
        }
        for chunk in incoming {
            self.vector.insert(&chunk.id, chunk.embedding.clone());
            self.lexical.insert(&chunk.id, &chunk.content);
            self.chunks.insert(chunk.id.clone(), chunk);
        }
        Ok(())
    }

    /// Hybrid query: vector top-`limit`, candidate-restricted BM25,
    /// max-normalization, weighted fusion.
    pub fn query(
        &self,
        query_embedding: &[f32],
        query_text: &str,
        limit: usize,
        vector_weight: f32,
        bm25_weight: f32,
    ) -> Vec<ScoredChunk> {
        let top = self.vector.top_k(query_embedding, limit);
        if top.is_empty() {
            return Vec::new();
        }

        let candidate_ids = top.iter().map(|(id, _)| id.clone()).collect();
        let raw_lexical = self.lexical.scores(query_text, &candidate_ids);
        let max_lexical = raw_lexical.values().fold(0.0_f32, |acc, &s| acc.max(s));

        let mut results: Vec<ScoredChunk> = top
            .into_iter()
            .filter_map(|(id, vector_score)| {
                let chunk = self.chunks.get(&id)?;
                let bm25_score = if max_lexical > 0.0 {
                    raw_lexical.get(&id).copied().unwrap_or(0.0) / max_lexical
                } else {
                    0.0
                };
                Some(ScoredChunk {
                    chunk: chunk.clone(),
                    score: vector_weight * vector_score + bm25_weight * bm25_score,
                    vector_score,
                    bm25_score,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.vector_score
                        .partial_cmp(&a.vector_score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        results
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.vector.clear();
        self.lexical.clear();
    }

    /// All chunks ordered by id, for persistence.
    pub fn snapshot(&self) -> Vec<Chunk> {
        let mut chunks: Vec<Chunk> = self.chunks.values().cloned().collect();
        chunks.sort_by(|a, b| a.id.cmp(&b.id));
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, content: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: id.to_string(),
            container_tag: "t".to_string(),
            content: content.to_string(),
            session_id: "s1".to_string(),
            chunk_index: 0,
            embedding,
            date: None,
            event_date: None,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn exact_embedding_match_ranks_first() {
        let mut index = SearchIndex::new();
        index
            .upsert(vec![
                chunk("c1", "user met Alice in Berlin", vec![1.0, 0.0, 0.0]),
                chunk("c2", "user talked about travel", vec![0.0, 1.0, 0.0]),
            ])
            .unwrap();

        let results = index.query(&[1.0, 0.0, 0.0], "anything", 5, 0.7, 0.3);
        assert_eq!(results[0].chunk.id, "c1");
        assert!((results[0].vector_score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn lexical_match_breaks_vector_ties() {
        let mut index = SearchIndex::new();
        index
            .upsert(vec![
                chunk("c1", "user met Alice in Berlin", vec![1.0, 0.0]),
                chunk("c2", "user talked about travel", vec![1.0, 0.0]),
            ])
            .unwrap();

        let results = index.query(&[1.0, 0.0], "Alice Berlin", 5, 0.7, 0.3);
        assert_eq!(results[0].chunk.id, "c1");
        assert!(results[0].bm25_score > 0.0);
        assert_eq!(results[1].bm25_score, 0.0);
    }

    #[test]
    fn fused_score_obeys_the_weights() {
        let mut index = SearchIndex::new();
        index
            .upsert(vec![
                chunk("c1", "alpha beta", vec![1.0, 0.0]),
                chunk("c2", "gamma delta", vec![0.8, 0.2]),
            ])
            .unwrap();

        for result in index.query(&[1.0, 0.0], "alpha", 5, 0.7, 0.3) {
            assert!(result.vector_score >= 0.0 && result.vector_score <= 1.0);
            assert!(result.bm25_score >= 0.0 && result.bm25_score <= 1.0);
            let expected = 0.7 * result.vector_score + 0.3 * result.bm25_score;
            assert!((result.score - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn max_normalization_pins_best_lexical_to_one() {
        let mut index = SearchIndex::new();
        index
            .upsert(vec![
                chunk("c1", "camera camera camera", vec![1.0, 0.0]),
                chunk("c2", "camera once here", vec![0.9, 0.1]),
                chunk("c3", "nothing relevant", vec![0.8, 0.2]),
            ])
            .unwrap();

        let results = index.query(&[1.0, 0.0], "camera", 5, 0.7, 0.3);
        let best_lexical = results
            .iter()
            .map(|r| r.bm25_score)
            .fold(0.0_f32, f32::max);
        assert!((best_lexical - 1.0).abs() < 1e-6);
    }

    #[test]
    fn upsert_is_idempotent() {
        let mut index = SearchIndex::new();
        let chunks = vec![chunk("c1", "alpha", vec![1.0, 0.0])];
        index.upsert(chunks.clone()).unwrap();
        index.upsert(chunks).unwrap();
        assert_eq!(index.chunk_count(), 1);

        // Replacement changes both indices.
        index
            .upsert(vec![chunk("c1", "beta", vec![0.0, 1.0])])
            .unwrap();
        let results = index.query(&[0.0, 1.0], "beta", 5, 0.7, 0.3);
        assert_eq!(results.len(), 1);
        assert!(results[0].bm25_score > 0.0);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let mut index = SearchIndex::new();
        index.upsert(vec![chunk("c1", "alpha", vec![1.0, 0.0])]).unwrap();
        let err = index
            .upsert(vec![chunk("c2", "beta", vec![1.0, 0.0, 0.0])])
            .unwrap_err();
        assert!(matches!(err, MnemonError::Config(_)));
    }

    #[test]
    fn rejected_batch_leaves_the_index_untouched() {
        let mut index = SearchIndex::new();
        index
            .upsert(vec![
                chunk("c1", "alpha", vec![1.0, 0.0]),
                chunk("c2", "beta", vec![1.0, 0.0, 0.0]),
            ])
            .unwrap_err();
        assert!(index.is_empty(), "no chunk of a rejected batch may land");
    }

    #[test]
    fn empty_embedding_is_rejected() {
        let mut index = SearchIndex::new();
        let err = index.upsert(vec![chunk("c1", "alpha", vec![])]).unwrap_err();
        assert!(matches!(err, MnemonError::Config(_)));
    }

    #[test]
    fn query_on_empty_index_is_empty() {
        let index = SearchIndex::new();
        assert!(index.query(&[1.0, 0.0], "anything", 5, 0.7, 0.3).is_empty());
    }

    #[test]
    fn snapshot_round_trips() {
        let mut index = SearchIndex::new();
        index
            .upsert(vec![
                chunk("c1", "alpha", vec![1.0, 0.0]),
                chunk("c2", "beta", vec![0.0, 1.0]),
            ])
            .unwrap();
        let rebuilt = SearchIndex::from_chunks(index.snapshot()).unwrap();
        assert_eq!(rebuilt.chunk_count(), 2);
        assert_eq!(index.snapshot(), rebuilt.snapshot());
    }

    #[test]
    fn clear_removes_everything() {
        let mut index = SearchIndex::new();
        index.upsert(vec![chunk("c1", "alpha", vec![1.0, 0.0])]).unwrap();
        index.clear();
        assert!(index.is_empty());
        assert!(index.query(&[1.0, 0.0], "alpha", 5, 0.7, 0.3).is_empty());
    }
}

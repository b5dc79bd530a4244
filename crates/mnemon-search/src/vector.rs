// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cosine-similarity vector index.
//!
//! A flat id -> embedding map with a full-scan top-k query. Corpora here are
//! per-container memory chunks, small enough that a scan beats maintaining
//! an approximate structure.

use std::collections::HashMap;

use mnemon_core::types::cosine_similarity;

/// Flat vector index over chunk embeddings.
#[derive(Debug, Default)]
pub struct VectorIndex {
    embeddings: HashMap<String, Vec<f32>>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an embedding, replacing any previous vector under the same id.
    pub fn insert(&mut self, id: &str, embedding: Vec<f32>) {
        self.embeddings.insert(id.to_string(), embedding);
    }

    pub fn remove(&mut self, id: &str) {
        self.embeddings.remove(id);
    }

    /// Embedding dimension of the stored vectors, if any are present.
    pub fn dimension(&self) -> Option<usize> {
        self.embeddings.values().next().map(Vec::len)
    }

    /// Top-k ids by cosine similarity, scores clamped into `[0, 1]`.
    ///
    /// Ties break on id so ordering is deterministic.
    pub fn top_k(&self, query: &[f32], k: usize) -> Vec<(String, f32)> {
        let mut scored: Vec<(String, f32)> = self
            .embeddings
            .iter()
            .map(|(id, emb)| (id.clone(), cosine_similarity(query, emb).max(0.0)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);
        scored
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    pub fn clear(&mut self) {
        self.embeddings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_k_orders_by_similarity() {
        let mut index = VectorIndex::new();
        index.insert("a", vec![1.0, 0.0]);
        index.insert("b", vec![0.7, 0.7]);
        index.insert("c", vec![0.0, 1.0]);

        let top = index.top_k(&[1.0, 0.0], 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0, "a");
        assert!((top[0].1 - 1.0).abs() < 1e-6);
        assert_eq!(top[1].0, "b");
    }

    #[test]
    fn scores_clamp_at_zero() {
        let mut index = VectorIndex::new();
        index.insert("opposite", vec![-1.0, 0.0]);
        let top = index.top_k(&[1.0, 0.0], 1);
        assert_eq!(top[0].1, 0.0);
    }

    #[test]
    fn upsert_replaces_embedding() {
        let mut index = VectorIndex::new();
        index.insert("a", vec![1.0, 0.0]);
        index.insert("a", vec![0.0, 1.0]);
        assert_eq!(index.len(), 1);
        let top = index.top_k(&[0.0, 1.0], 1);
        assert!((top[0].1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn k_larger_than_corpus_returns_all() {
        let mut index = VectorIndex::new();
        index.insert("a", vec![1.0, 0.0]);
        assert_eq!(index.top_k(&[1.0, 0.0], 10).len(), 1);
    }

    #[test]
    fn empty_index_returns_nothing() {
        let index = VectorIndex::new();
        assert!(index.top_k(&[1.0, 0.0], 5).is_empty());
        assert_eq!(index.dimension(), None);
    }
}

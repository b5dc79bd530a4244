// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock embedding adapter with deterministic bag-of-words vectors.
//!
//! Each token hashes to a dimension bucket; vectors are L2-normalized.
//! Texts sharing tokens therefore score high cosine similarity, which is
//! enough to exercise ranking behavior without a real model. Transport
//! failures can be injected to test retry paths.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use mnemon_core::error::MnemonError;
use mnemon_core::traits::{EmbeddingAdapter, PluginAdapter};
use mnemon_core::types::{AdapterType, HealthStatus};

const DEFAULT_DIMENSION: usize = 256;

/// Deterministic, model-free embedding adapter.
pub struct MockEmbedder {
    dimension: usize,
    calls: AtomicUsize,
    failures_remaining: AtomicUsize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::with_dimension(DEFAULT_DIMENSION)
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension,
            calls: AtomicUsize::new(0),
            failures_remaining: AtomicUsize::new(0),
        }
    }

    /// Make the next `n` embed calls fail with a transport error.
    pub fn fail_next(&self, n: usize) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    /// Number of embed calls (single and batch) made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }

    fn take_failure(&self) -> Option<MnemonError> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0
            && self
                .failures_remaining
                .compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            Some(MnemonError::transport("injected embedding failure"))
        } else {
            None
        }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemonError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, _model: &str, text: &str) -> Result<Vec<f32>, MnemonError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(self.embed_text(text))
    }

    async fn embed_many(
        &self,
        _model: &str,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, MnemonError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

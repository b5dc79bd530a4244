// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait for vector embedding generation.

use async_trait::async_trait;

use crate::error::MnemonError;
use crate::traits::adapter::PluginAdapter;

/// Adapter for generating vector embeddings from text.
///
/// All embeddings produced for one container must share a dimension; the
/// engine verifies this on index insertion and snapshot load.
#[async_trait]
pub trait EmbeddingAdapter: PluginAdapter {
    /// Embeds a single text.
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, MnemonError>;

    /// Embeds a batch of texts, returning one vector per input in order.
    async fn embed_many(
        &self,
        model: &str,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, MnemonError>;
}

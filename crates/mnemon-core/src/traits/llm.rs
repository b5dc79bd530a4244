// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM adapter trait for text-generation collaborators.

use async_trait::async_trait;

use crate::error::MnemonError;
use crate::traits::adapter::PluginAdapter;

/// Adapter for text-to-text LLM endpoints.
///
/// The engine uses LLM adapters for memory extraction and result reranking.
/// Output is free-form text; the engine's parsers are tolerant of
/// malformed responses.
#[async_trait]
pub trait LlmAdapter: PluginAdapter {
    /// Generates a completion for the given prompt with the named model.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, MnemonError>;
}

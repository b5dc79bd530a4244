// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits implemented by Mnemon collaborators.

pub mod adapter;
pub mod embedding;
pub mod llm;
pub mod storage;

pub use adapter::PluginAdapter;
pub use embedding::EmbeddingAdapter;
pub use llm::LlmAdapter;
pub use storage::SnapshotBackend;

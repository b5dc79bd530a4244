// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Mnemon conversation-memory engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Mnemon workspace. Collaborator
//! implementations (LLM endpoints, embedders, storage backends) live in
//! sibling crates and implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::MnemonError;
pub use types::{AdapterType, HealthStatus};

pub use traits::{EmbeddingAdapter, LlmAdapter, PluginAdapter, SnapshotBackend};

// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Mnemon memory engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup. Defaults carry the tuned engine contract values;
//! changing the fusion weights or traversal caps changes ranking behavior.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level Mnemon configuration.
///
/// Loaded from TOML files with environment variable overrides. All sections
/// are optional and default to the engine contract values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MnemonConfig {
    /// API key for the remote LLM and embedding collaborators. Required by
    /// `MemoryProvider::initialize`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Chunker window and overlap.
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Embedding service settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Extraction pacing and model settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Hybrid ranking and rerank settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Entity-graph traversal caps.
    #[serde(default)]
    pub graph: GraphConfig,

    /// Snapshot storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Chunker window and carry-over.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Trailing context carried into the next chunk, in characters.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize {
    1600
}
fn default_chunk_overlap() -> usize {
    320
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Embedding service settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Identifier string passed to the embedding adapter.
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Texts per embedding call.
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_embedding_batch_size() -> usize {
    100
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            batch_size: default_embedding_batch_size(),
        }
    }
}

/// Extraction pacing and model settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractionConfig {
    /// Identifier string passed to the LLM adapter for extraction calls.
    #[serde(default = "default_extraction_model")]
    pub model: String,
    /// Sessions extracted per batch (progress pacing).
    #[serde(default = "default_extraction_concurrency")]
    pub concurrency: usize,
    /// Hard cap on concurrent extraction calls across all ingests.
    #[serde(default = "default_max_global_extractions")]
    pub max_global_extractions: usize,
}

fn default_extraction_model() -> String {
    "claude-haiku-4-5".to_string()
}
fn default_extraction_concurrency() -> usize {
    10
}
fn default_max_global_extractions() -> usize {
    300
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: default_extraction_model(),
            concurrency: default_extraction_concurrency(),
            max_global_extractions: default_max_global_extractions(),
        }
    }
}

/// Hybrid ranking and rerank settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Weight of the cosine component in score fusion.
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f32,
    /// Weight of the normalized BM25 component in score fusion.
    #[serde(default = "default_bm25_weight")]
    pub bm25_weight: f32,
    /// Candidate count fetched ahead of reranking.
    #[serde(default = "default_rerank_overfetch")]
    pub rerank_overfetch: usize,
    /// Identifier string passed to the LLM adapter for rerank calls.
    #[serde(default = "default_rerank_model")]
    pub rerank_model: String,
}

fn default_vector_weight() -> f32 {
    0.7
}
fn default_bm25_weight() -> f32 {
    0.3
}
fn default_rerank_overfetch() -> usize {
    40
}
fn default_rerank_model() -> String {
    "claude-haiku-4-5".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            vector_weight: default_vector_weight(),
            bm25_weight: default_bm25_weight(),
            rerank_overfetch: default_rerank_overfetch(),
            rerank_model: default_rerank_model(),
        }
    }
}

/// Entity-graph traversal caps.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GraphConfig {
    /// Maximum entities returned by context expansion.
    #[serde(default = "default_max_graph_entities")]
    pub max_entities: usize,
    /// Maximum relationships returned by context expansion.
    #[serde(default = "default_max_graph_relationships")]
    pub max_relationships: usize,
}

fn default_max_graph_entities() -> usize {
    10
}
fn default_max_graph_relationships() -> usize {
    20
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_entities: default_max_graph_entities(),
            max_relationships: default_max_graph_relationships(),
        }
    }
}

/// Snapshot storage settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Root directory for per-container snapshot files.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./mnemon-data")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Mnemon workspace.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A single message within an input conversation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    /// Who produced the message (e.g., "user", "assistant", a display name).
    pub speaker: String,
    /// Optional ISO 8601 timestamp of the message.
    pub timestamp: Option<String>,
    /// Message text.
    pub content: String,
}

/// An input conversation session to be ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Stable identifier of the session. Ingesting the same id twice reuses
    /// the cached extraction and overwrites previously derived chunks.
    pub id: String,
    /// Canonical session date (`YYYY-MM-DD`), when known.
    pub date: Option<String>,
    /// Ordered conversation messages.
    pub messages: Vec<SessionMessage>,
    /// Opaque metadata inherited by every chunk derived from this session.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A contiguous piece of extracted-memory text with its embedding.
///
/// Chunk ids are deterministic (`containerTag_sessionId_chunkIndex`) so a
/// repeated ingest of the same session overwrites rather than duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub id: String,
    pub container_tag: String,
    pub content: String,
    pub session_id: String,
    pub chunk_index: usize,
    pub embedding: Vec<f32>,
    /// Session-level date (`YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Earliest event date mentioned in this chunk's text; overrides `date`
    /// for presentation when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_date: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl Chunk {
    /// Compose the deterministic chunk id for a container/session/index triple.
    pub fn compose_id(container_tag: &str, session_id: &str, chunk_index: usize) -> String {
        format!("{container_tag}_{session_id}_{chunk_index}")
    }
}

/// A named entity in the per-container graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityNode {
    /// Canonical name (trimmed, non-empty); primary key within a container.
    pub name: String,
    /// Lowercased tag (person, organization, location, object, ...).
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Concatenated facts, capped at 500 characters.
    pub summary: String,
    /// Sessions that contributed to this node.
    pub session_ids: BTreeSet<String>,
}

/// A directed, labeled relationship between two entity names.
///
/// Source and target need not be registered as [`EntityNode`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipEdge {
    pub source: String,
    pub target: String,
    pub relation: String,
    /// Optional timeframe string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Session that produced this edge.
    pub session_id: String,
}

impl RelationshipEdge {
    /// Dedup key: the `(source, relation, target)` triple.
    pub fn key(&self) -> String {
        format!("{}|{}|{}", self.source, self.relation, self.target)
    }
}

/// Self-contained, portable persisted state for one container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSnapshot {
    pub chunks: Vec<Chunk>,
    pub nodes: Vec<EntityNode>,
    pub edges: Vec<RelationshipEdge>,
}

impl ContainerSnapshot {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty() && self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Discriminates chunk results from graph pseudo-results in search output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResultKind {
    Entity,
    Relationship,
}

/// A single search result: either a retrieved chunk or a graph pseudo-result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub content: String,
    /// Fused score; remapped to `rerankScore / 10` when the reranker ran.
    pub score: f32,
    pub vector_score: f32,
    pub bm25_score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    /// Absent for chunk results; `entity` / `relationship` for pseudo-results.
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ResultKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
}

impl SearchResult {
    /// Build a chunk result with its component scores.
    ///
    /// The event date, when present, takes the place of the session date in
    /// the `date` field; the session date remains recoverable via metadata.
    pub fn from_chunk(chunk: &Chunk, score: f32, vector_score: f32, bm25_score: f32) -> Self {
        SearchResult {
            content: chunk.content.clone(),
            score,
            vector_score,
            bm25_score,
            rerank_score: None,
            session_id: Some(chunk.session_id.clone()),
            chunk_index: Some(chunk.chunk_index),
            date: chunk.event_date.clone().or_else(|| chunk.date.clone()),
            event_date: chunk.event_date.clone(),
            metadata: if chunk.metadata.is_empty() {
                None
            } else {
                Some(chunk.metadata.clone())
            },
            kind: None,
            name: None,
            entity_type: None,
            source: None,
            target: None,
            relation: None,
        }
    }

    /// Build an entity pseudo-result (component scores are zero).
    pub fn from_entity(node: &EntityNode) -> Self {
        SearchResult {
            content: node.summary.clone(),
            score: 0.0,
            vector_score: 0.0,
            bm25_score: 0.0,
            rerank_score: None,
            session_id: None,
            chunk_index: None,
            date: None,
            event_date: None,
            metadata: None,
            kind: Some(ResultKind::Entity),
            name: Some(node.name.clone()),
            entity_type: Some(node.entity_type.clone()),
            source: None,
            target: None,
            relation: None,
        }
    }

    /// Build a relationship pseudo-result (component scores are zero).
    pub fn from_relationship(edge: &RelationshipEdge) -> Self {
        SearchResult {
            content: format!("{} {} {}", edge.source, edge.relation, edge.target),
            score: 0.0,
            vector_score: 0.0,
            bm25_score: 0.0,
            rerank_score: None,
            session_id: Some(edge.session_id.clone()),
            chunk_index: None,
            date: edge.date.clone(),
            event_date: None,
            metadata: None,
            kind: Some(ResultKind::Relationship),
            name: None,
            entity_type: None,
            source: Some(edge.source.clone()),
            target: Some(edge.target.clone()),
            relation: Some(edge.relation.clone()),
        }
    }
}

/// Receipt returned by `ingest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReceipt {
    /// Ids of the sessions accepted for ingestion, in input order.
    pub document_ids: Vec<String>,
}

/// Progress report delivered by `await_indexing`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingProgress {
    pub completed_ids: Vec<String>,
    pub failed_ids: Vec<String>,
    pub total: usize,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`crate::traits::PluginAdapter`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Llm,
    Embedding,
    Storage,
}

/// Convert an f32 vector to little-endian bytes for BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert a little-endian BLOB back to an f32 vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(chunk.try_into().unwrap()))
        .collect()
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero norm or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

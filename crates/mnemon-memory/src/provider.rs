// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ingest/search orchestrator and host-facing provider surface.
//!
//! [`MemoryProvider`] composes the extraction service, chunker, hybrid
//! index, entity graph, reranker, and storage backend. Per-container state
//! sits behind a fair read/write lock: searches share read access, ingest
//! and clear take write access, and a batch of chunks becomes visible
//! atomically or not at all.

use std::sync::Arc;

use tracing::{debug, info, warn};

use mnemon_config::{validate_config, MnemonConfig};
use mnemon_core::error::MnemonError;
use mnemon_core::traits::{EmbeddingAdapter, LlmAdapter, SnapshotBackend};
use mnemon_core::types::{
    Chunk, ContainerSnapshot, IndexingProgress, IngestReceipt, RelationshipEdge, SearchResult,
    Session,
};
use mnemon_graph::EntityGraph;
use mnemon_search::{split_text, SearchIndex};

use crate::extract::ExtractionService;
use crate::locks::ContainerLocks;
use crate::parser;
use crate::pool::FifoSemaphore;
use crate::rerank::Reranker;

const EMBED_MAX_ATTEMPTS: u32 = 3;
const EMBED_BACKOFF_SECS: u64 = 1;

/// Hops walked when expanding graph context around query entities.
const GRAPH_CONTEXT_HOPS: usize = 2;

/// In-memory state for one container, guarded by its read/write lock.
#[derive(Default)]
struct ContainerState {
    index: SearchIndex,
    graph: EntityGraph,
    /// Set once the snapshot backend has been consulted for this tag.
    loaded: bool,
}

/// Conversation-memory engine: ingest sessions, search memories.
pub struct MemoryProvider {
    config: MnemonConfig,
    embedder: Arc<dyn EmbeddingAdapter>,
    storage: Arc<dyn SnapshotBackend>,
    containers: ContainerLocks<ContainerState>,
    extraction: ExtractionService,
    reranker: Reranker,
}

impl MemoryProvider {
    /// Build a provider from configuration and collaborator adapters.
    ///
    /// Fails when the API key is missing or the configuration is
    /// semantically invalid.
    pub fn initialize(
        config: MnemonConfig,
        llm: Arc<dyn LlmAdapter>,
        embedder: Arc<dyn EmbeddingAdapter>,
        storage: Arc<dyn SnapshotBackend>,
    ) -> Result<Self, MnemonError> {
        match config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {}
            _ => return Err(MnemonError::Config("api_key is required".to_string())),
        }
        validate_config(&config).map_err(|errors| MnemonError::Config(errors.join("; ")))?;

        let pool = Arc::new(FifoSemaphore::new(config.extraction.max_global_extractions));
        let extraction =
            ExtractionService::new(Arc::clone(&llm), config.extraction.model.clone(), pool);
        let reranker = Reranker::new(llm, config.search.rerank_model.clone());

        Ok(Self {
            config,
            embedder,
            storage,
            containers: ContainerLocks::new(),
            extraction,
            reranker,
        })
    }

    /// Ingest conversation sessions into one container.
    ///
    /// Extraction runs in batches under the global pool; memory text is
    /// chunked and embedded, entities and relationships flow into the
    /// graph, and the whole batch is committed to the index under the
    /// write lock before the snapshot is written through.
    pub async fn ingest(
        &self,
        sessions: &[Session],
        container_tag: &str,
    ) -> Result<IngestReceipt, MnemonError> {
        let document_ids: Vec<String> = sessions.iter().map(|s| s.id.clone()).collect();
        if sessions.is_empty() {
            return Ok(IngestReceipt { document_ids });
        }
        self.ensure_loaded(container_tag).await?;

        let mut new_chunks: Vec<Chunk> = Vec::new();
        let mut graph_entities: Vec<(parser::ParsedEntity, String)> = Vec::new();
        let mut graph_edges: Vec<RelationshipEdge> = Vec::new();

        for batch in sessions.chunks(self.config.extraction.concurrency) {
            let raws =
                futures::future::try_join_all(batch.iter().map(|s| self.extraction.extract(s)))
                    .await?;
            debug!(container = %container_tag, batch = batch.len(), "extraction batch complete");

            for (session, raw) in batch.iter().zip(raws) {
                let parsed = parser::parse_extraction(&raw);
                for entity in parsed.entities {
                    graph_entities.push((entity, session.id.clone()));
                }
                for rel in parsed.relationships {
                    graph_edges.push(RelationshipEdge {
                        source: rel.source,
                        target: rel.target,
                        relation: rel.relation,
                        date: rel.date,
                        session_id: session.id.clone(),
                    });
                }
                if parsed.memory_text.is_empty() {
                    continue;
                }

                let heading = session.date.as_deref().unwrap_or("an unknown date");
                let full_text = format!("# Memories from {heading}\n\n{}", parsed.memory_text);
                let pieces = split_text(
                    &full_text,
                    self.config.chunking.chunk_size,
                    self.config.chunking.chunk_overlap,
                );
                for (chunk_index, content) in pieces.into_iter().enumerate() {
                    let mut metadata = session.metadata.clone();
                    if let Some(date) = &session.date {
                        metadata.insert("memoryDate".to_string(), date.clone());
                    }
                    let event_date = parser::earliest_event_date(&content);
                    new_chunks.push(Chunk {
                        id: Chunk::compose_id(container_tag, &session.id, chunk_index),
                        container_tag: container_tag.to_string(),
                        content,
                        session_id: session.id.clone(),
                        chunk_index,
                        embedding: Vec::new(),
                        date: session.date.clone(),
                        event_date,
                        metadata,
                    });
                }
            }
        }

        let texts: Vec<String> = new_chunks.iter().map(|c| c.content.clone()).collect();
        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.embedding.batch_size.max(1)) {
            embeddings.extend(self.embed_batch(batch).await?);
        }
        for (chunk, embedding) in new_chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        let chunk_count = new_chunks.len();
        {
            let mut state = self.containers.write(container_tag).await;
            for (entity, session_id) in &graph_entities {
                state
                    .graph
                    .add_entity(&entity.name, &entity.entity_type, &entity.summary, session_id);
            }
            for edge in graph_edges {
                state.graph.add_relationship(edge);
            }
            state.index.upsert(new_chunks)?;

            let (nodes, edges) = state.graph.to_parts();
            let snapshot = ContainerSnapshot {
                chunks: state.index.snapshot(),
                nodes,
                edges,
            };
            if let Err(e) = self.storage.save_container(container_tag, &snapshot).await {
                warn!(
                    container = %container_tag, error = %e,
                    "snapshot write failed; in-memory state unaffected"
                );
            }
        }

        info!(
            container = %container_tag,
            sessions = sessions.len(),
            chunks = chunk_count,
            "ingest complete"
        );
        Ok(IngestReceipt { document_ids })
    }

    /// Report indexing completion for a prior [`ingest`](Self::ingest).
    ///
    /// Ingest is synchronous end-to-end, so the callback fires exactly once
    /// with every document completed.
    pub async fn await_indexing(
        &self,
        receipt: &IngestReceipt,
        _container_tag: &str,
        on_progress: Option<&(dyn Fn(IndexingProgress) + Send + Sync)>,
    ) -> Result<(), MnemonError> {
        if let Some(callback) = on_progress {
            callback(IndexingProgress {
                completed_ids: receipt.document_ids.clone(),
                failed_ids: Vec::new(),
                total: receipt.document_ids.len(),
            });
        }
        Ok(())
    }

    /// Search one container's memories.
    ///
    /// Hybrid retrieval overfetches, the reranker trims to `limit` when
    /// there is a surplus, and graph context found for entities mentioned
    /// in the query is appended as pseudo-results. A container with no data
    /// yields an empty list.
    pub async fn search(
        &self,
        query: &str,
        container_tag: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, MnemonError> {
        self.ensure_loaded(container_tag).await?;
        let query_embedding = self.embed_query(query).await?;

        let (ranked, graph_context) = {
            let state = self.containers.read(container_tag).await;
            let overfetch = limit.max(self.config.search.rerank_overfetch);
            let ranked = state.index.query(
                &query_embedding,
                query,
                overfetch,
                self.config.search.vector_weight,
                self.config.search.bm25_weight,
            );
            let seeds = state.graph.find_entities_in_query(query);
            let graph_context = state.graph.context(
                &seeds,
                GRAPH_CONTEXT_HOPS,
                self.config.graph.max_entities,
                self.config.graph.max_relationships,
            );
            (ranked, graph_context)
        };

        let results: Vec<SearchResult> = ranked
            .iter()
            .map(|r| SearchResult::from_chunk(&r.chunk, r.score, r.vector_score, r.bm25_score))
            .collect();
        let mut results = if results.len() > limit {
            self.reranker.rerank(query, results, limit).await
        } else {
            results
        };

        for node in &graph_context.entities {
            results.push(SearchResult::from_entity(node));
        }
        for edge in &graph_context.relationships {
            results.push(SearchResult::from_relationship(edge));
        }
        Ok(results)
    }

    /// Destroy all state for one container, in memory and in storage.
    pub async fn clear(&self, container_tag: &str) -> Result<(), MnemonError> {
        let mut state = self.containers.write(container_tag).await;
        state.index.clear();
        state.graph = EntityGraph::new();
        // The cleared state is authoritative; do not resurrect the snapshot.
        state.loaded = true;
        self.storage.clear_container(container_tag).await?;
        info!(container = %container_tag, "container cleared");
        Ok(())
    }

    /// Whether the container holds any chunks or graph data.
    pub async fn has_data(&self, container_tag: &str) -> Result<bool, MnemonError> {
        self.ensure_loaded(container_tag).await?;
        let state = self.containers.read(container_tag).await;
        Ok(!state.index.is_empty() || !state.graph.is_empty())
    }

    /// Number of chunks indexed for the container.
    pub async fn chunk_count(&self, container_tag: &str) -> Result<usize, MnemonError> {
        self.ensure_loaded(container_tag).await?;
        let state = self.containers.read(container_tag).await;
        Ok(state.index.chunk_count())
    }

    /// Load the persisted snapshot on first touch of a container.
    async fn ensure_loaded(&self, container_tag: &str) -> Result<(), MnemonError> {
        {
            let state = self.containers.read(container_tag).await;
            if state.loaded {
                return Ok(());
            }
        }
        let mut state = self.containers.write(container_tag).await;
        if state.loaded {
            return Ok(());
        }
        if let Some(snapshot) = self.storage.load_container(container_tag).await? {
            // A dimension mismatch inside the snapshot is a config error
            // and must not leave partial state indexed.
            state.index = SearchIndex::from_chunks(snapshot.chunks)?;
            state.graph = EntityGraph::from_parts(snapshot.nodes, snapshot.edges);
            debug!(
                container = %container_tag,
                chunks = state.index.chunk_count(),
                "container loaded from snapshot"
            );
        }
        state.loaded = true;
        Ok(())
    }

    /// Embed one query, retrying transport failures with linear backoff.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, MnemonError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .embedder
                .embed(&self.config.embedding.model, text)
                .await
            {
                Ok(vector) => return Ok(vector),
                Err(MnemonError::Transport { message, .. }) if attempt < EMBED_MAX_ATTEMPTS => {
                    warn!(attempt, %message, "query embedding failed, backing off");
                    tokio::time::sleep(std::time::Duration::from_secs(
                        EMBED_BACKOFF_SECS * u64::from(attempt),
                    ))
                    .await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Embed one batch of chunk texts with the same retry policy.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MnemonError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .embedder
                .embed_many(&self.config.embedding.model, texts)
                .await
            {
                Ok(vectors) if vectors.len() == texts.len() => return Ok(vectors),
                Ok(vectors) => {
                    return Err(MnemonError::Internal(format!(
                        "embedder returned {} vectors for {} texts",
                        vectors.len(),
                        texts.len()
                    )))
                }
                Err(MnemonError::Transport { message, .. }) if attempt < EMBED_MAX_ATTEMPTS => {
                    warn!(attempt, %message, "batch embedding failed, backing off");
                    tokio::time::sleep(std::time::Duration::from_secs(
                        EMBED_BACKOFF_SECS * u64::from(attempt),
                    ))
                    .await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

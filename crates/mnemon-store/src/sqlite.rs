// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite snapshot backend.
//!
//! Normalized tables for chunks, entities, and relationships, all keyed by
//! container. Embeddings are stored as little-endian f32 BLOBs; an FTS5
//! mirror of chunk content is kept in sync by triggers so the durable form
//! stays queryable by external tooling. Saves replace the container's rows
//! inside one transaction.

use std::path::Path;

use async_trait::async_trait;
use tokio_rusqlite::Connection;

use mnemon_core::error::MnemonError;
use mnemon_core::traits::{PluginAdapter, SnapshotBackend};
use mnemon_core::types::{
    blob_to_vec, vec_to_blob, AdapterType, Chunk, ContainerSnapshot, EntityNode, HealthStatus,
    RelationshipEdge,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS chunks (
    container TEXT NOT NULL,
    id TEXT NOT NULL,
    content TEXT NOT NULL,
    session_id TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    date TEXT,
    event_date TEXT,
    metadata TEXT NOT NULL DEFAULT '{}',
    PRIMARY KEY (container, id)
);
CREATE INDEX IF NOT EXISTS idx_chunks_container ON chunks(container);

CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(
    content,
    content='chunks',
    content_rowid='rowid'
);

CREATE TRIGGER IF NOT EXISTS chunks_ai AFTER INSERT ON chunks BEGIN
    INSERT INTO chunks_fts(rowid, content) VALUES (new.rowid, new.content);
END;

CREATE TRIGGER IF NOT EXISTS chunks_ad AFTER DELETE ON chunks BEGIN
    INSERT INTO chunks_fts(chunks_fts, rowid, content)
        VALUES('delete', old.rowid, old.content);
END;

CREATE TRIGGER IF NOT EXISTS chunks_au AFTER UPDATE ON chunks BEGIN
    INSERT INTO chunks_fts(chunks_fts, rowid, content)
        VALUES('delete', old.rowid, old.content);
    INSERT INTO chunks_fts(rowid, content) VALUES (new.rowid, new.content);
END;

CREATE TABLE IF NOT EXISTS entities (
    container TEXT NOT NULL,
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    summary TEXT NOT NULL DEFAULT '',
    session_ids TEXT NOT NULL DEFAULT '[]',
    PRIMARY KEY (container, name)
);
CREATE INDEX IF NOT EXISTS idx_entities_container ON entities(container);

CREATE TABLE IF NOT EXISTS relationships (
    container TEXT NOT NULL,
    source TEXT NOT NULL,
    target TEXT NOT NULL,
    relation TEXT NOT NULL,
    date TEXT,
    session_id TEXT NOT NULL,
    PRIMARY KEY (container, source, relation, target)
);
CREATE INDEX IF NOT EXISTS idx_relationships_container ON relationships(container);
CREATE INDEX IF NOT EXISTS idx_relationships_source ON relationships(container, source);
CREATE INDEX IF NOT EXISTS idx_relationships_target ON relationships(container, target);
";

/// Helper to convert tokio_rusqlite errors into storage errors.
fn storage_err(e: tokio_rusqlite::Error) -> MnemonError {
    MnemonError::Storage {
        source: Box::new(e),
    }
}

/// Snapshot persistence in SQLite.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (and migrate) a store at the given path.
    pub async fn open(path: &Path) -> Result<Self, MnemonError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(MnemonError::storage)?;
        }
        let conn = Connection::open(path.to_path_buf())
            .await
            .map_err(storage_err)?;
        Self::migrate(&conn).await?;
        Ok(Self { conn })
    }

    /// Open an in-memory store (tests and ephemeral use).
    pub async fn open_in_memory() -> Result<Self, MnemonError> {
        let conn = Connection::open_in_memory().await.map_err(storage_err)?;
        Self::migrate(&conn).await?;
        Ok(Self { conn })
    }

    async fn migrate(conn: &Connection) -> Result<(), MnemonError> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(storage_err)
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemonError> {
        let result = self
            .conn
            .call(|conn| {
                conn.query_row("SELECT 1", [], |_| Ok(()))?;
                Ok(())
            })
            .await;
        match result {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }
}

#[async_trait]
impl SnapshotBackend for SqliteStore {
    async fn save_container(
        &self,
        container_tag: &str,
        snapshot: &ContainerSnapshot,
    ) -> Result<(), MnemonError> {
        let tag = container_tag.to_string();

        let chunk_rows = snapshot
            .chunks
            .iter()
            .map(|c| {
                Ok((
                    c.id.clone(),
                    c.content.clone(),
                    c.session_id.clone(),
                    c.chunk_index as i64,
                    vec_to_blob(&c.embedding),
                    c.date.clone(),
                    c.event_date.clone(),
                    serde_json::to_string(&c.metadata).map_err(MnemonError::storage)?,
                ))
            })
            .collect::<Result<Vec<_>, MnemonError>>()?;
        let entity_rows = snapshot
            .nodes
            .iter()
            .map(|n| {
                Ok((
                    n.name.clone(),
                    n.entity_type.clone(),
                    n.summary.clone(),
                    serde_json::to_string(&n.session_ids).map_err(MnemonError::storage)?,
                ))
            })
            .collect::<Result<Vec<_>, MnemonError>>()?;
        let edge_rows: Vec<_> = snapshot
            .edges
            .iter()
            .map(|e| {
                (
                    e.source.clone(),
                    e.target.clone(),
                    e.relation.clone(),
                    e.date.clone(),
                    e.session_id.clone(),
                )
            })
            .collect();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM chunks WHERE container = ?1", rusqlite::params![tag])?;
                tx.execute("DELETE FROM entities WHERE container = ?1", rusqlite::params![tag])?;
                tx.execute(
                    "DELETE FROM relationships WHERE container = ?1",
                    rusqlite::params![tag],
                )?;

                for (id, content, session_id, chunk_index, embedding, date, event_date, metadata) in
                    chunk_rows
                {
                    tx.execute(
                        "INSERT INTO chunks (container, id, content, session_id, chunk_index, embedding, date, event_date, metadata) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                        rusqlite::params![tag, id, content, session_id, chunk_index, embedding, date, event_date, metadata],
                    )?;
                }
                for (name, entity_type, summary, session_ids) in entity_rows {
                    tx.execute(
                        "INSERT INTO entities (container, name, type, summary, session_ids) VALUES (?1, ?2, ?3, ?4, ?5)",
                        rusqlite::params![tag, name, entity_type, summary, session_ids],
                    )?;
                }
                for (source, target, relation, date, session_id) in edge_rows {
                    tx.execute(
                        "INSERT INTO relationships (container, source, target, relation, date, session_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        rusqlite::params![tag, source, target, relation, date, session_id],
                    )?;
                }

                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    async fn load_container(
        &self,
        container_tag: &str,
    ) -> Result<Option<ContainerSnapshot>, MnemonError> {
        let tag = container_tag.to_string();
        let query_tag = tag.clone();

        type ChunkRow = (
            String,
            String,
            String,
            i64,
            Vec<u8>,
            Option<String>,
            Option<String>,
            String,
        );
        type EntityRow = (String, String, String, String);
        type EdgeRow = (String, String, String, Option<String>, String);

        let (chunk_rows, entity_rows, edge_rows): (Vec<ChunkRow>, Vec<EntityRow>, Vec<EdgeRow>) =
            self.conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(
                        "SELECT id, content, session_id, chunk_index, embedding, date, event_date, metadata FROM chunks WHERE container = ?1 ORDER BY id",
                    )?;
                    let chunks = stmt
                        .query_map(rusqlite::params![query_tag], |row| {
                            Ok((
                                row.get(0)?,
                                row.get(1)?,
                                row.get(2)?,
                                row.get(3)?,
                                row.get(4)?,
                                row.get(5)?,
                                row.get(6)?,
                                row.get(7)?,
                            ))
                        })?
                        .collect::<Result<Vec<_>, _>>()?;

                    let mut stmt = conn.prepare(
                        "SELECT name, type, summary, session_ids FROM entities WHERE container = ?1 ORDER BY name",
                    )?;
                    let entities = stmt
                        .query_map(rusqlite::params![query_tag], |row| {
                            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                        })?
                        .collect::<Result<Vec<_>, _>>()?;

                    let mut stmt = conn.prepare(
                        "SELECT source, target, relation, date, session_id FROM relationships WHERE container = ?1 ORDER BY source, relation, target",
                    )?;
                    let edges = stmt
                        .query_map(rusqlite::params![query_tag], |row| {
                            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                        })?
                        .collect::<Result<Vec<_>, _>>()?;

                    Ok((chunks, entities, edges))
                })
                .await
                .map_err(storage_err)?;

        if chunk_rows.is_empty() && entity_rows.is_empty() && edge_rows.is_empty() {
            return Ok(None);
        }

        let chunks = chunk_rows
            .into_iter()
            .map(
                |(id, content, session_id, chunk_index, embedding, date, event_date, metadata)| {
                    Ok(Chunk {
                        id,
                        container_tag: tag.clone(),
                        content,
                        session_id,
                        chunk_index: chunk_index as usize,
                        embedding: blob_to_vec(&embedding),
                        date,
                        event_date,
                        metadata: serde_json::from_str(&metadata).map_err(MnemonError::storage)?,
                    })
                },
            )
            .collect::<Result<Vec<_>, MnemonError>>()?;
        let nodes = entity_rows
            .into_iter()
            .map(|(name, entity_type, summary, session_ids)| {
                Ok(EntityNode {
                    name,
                    entity_type,
                    summary,
                    session_ids: serde_json::from_str(&session_ids).map_err(MnemonError::storage)?,
                })
            })
            .collect::<Result<Vec<_>, MnemonError>>()?;
        let edges = edge_rows
            .into_iter()
            .map(|(source, target, relation, date, session_id)| RelationshipEdge {
                source,
                target,
                relation,
                date,
                session_id,
            })
            .collect();

        Ok(Some(ContainerSnapshot {
            chunks,
            nodes,
            edges,
        }))
    }

    async fn clear_container(&self, container_tag: &str) -> Result<(), MnemonError> {
        let tag = container_tag.to_string();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM chunks WHERE container = ?1", rusqlite::params![tag])?;
                tx.execute("DELETE FROM entities WHERE container = ?1", rusqlite::params![tag])?;
                tx.execute(
                    "DELETE FROM relationships WHERE container = ?1",
                    rusqlite::params![tag],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashMap};

    fn sample_snapshot(tag: &str) -> ContainerSnapshot {
        ContainerSnapshot {
            chunks: vec![Chunk {
                id: format!("{tag}_s1_0"),
                container_tag: tag.to_string(),
                content: "The user got a Sony A7 camera.".to_string(),
                session_id: "s1".to_string(),
                chunk_index: 0,
                embedding: (0..8).map(|i| i as f32 / 8.0).collect(),
                date: Some("2024-05-10".to_string()),
                event_date: Some("2024-05-09".to_string()),
                metadata: HashMap::from([("memoryDate".to_string(), "2024-05-10".to_string())]),
            }],
            nodes: vec![EntityNode {
                name: "Sony A7".to_string(),
                entity_type: "object".to_string(),
                summary: "Camera owned by the user".to_string(),
                session_ids: BTreeSet::from(["s1".to_string()]),
            }],
            edges: vec![RelationshipEdge {
                source: "user".to_string(),
                target: "Sony A7".to_string(),
                relation: "owns".to_string(),
                date: None,
                session_id: "s1".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn round_trip_preserves_everything() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let snapshot = sample_snapshot("t");

        store.save_container("t", &snapshot).await.unwrap();
        let loaded = store.load_container("t").await.unwrap().unwrap();

        assert_eq!(loaded.chunks, snapshot.chunks);
        assert_eq!(loaded.nodes, snapshot.nodes);
        assert_eq!(loaded.edges, snapshot.edges);
    }

    #[tokio::test]
    async fn missing_container_loads_as_none() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        assert!(store.load_container("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn containers_are_isolated() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.save_container("a", &sample_snapshot("a")).await.unwrap();
        store.save_container("b", &sample_snapshot("b")).await.unwrap();

        store.clear_container("a").await.unwrap();
        assert!(store.load_container("a").await.unwrap().is_none());
        assert!(store.load_container("b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn save_replaces_prior_rows() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.save_container("t", &sample_snapshot("t")).await.unwrap();

        let mut second = sample_snapshot("t");
        second.chunks[0].content = "updated content".to_string();
        second.nodes.clear();
        store.save_container("t", &second).await.unwrap();

        let loaded = store.load_container("t").await.unwrap().unwrap();
        assert_eq!(loaded.chunks.len(), 1);
        assert_eq!(loaded.chunks[0].content, "updated content");
        assert!(loaded.nodes.is_empty());
    }

    #[tokio::test]
    async fn fts_mirror_stays_in_sync() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.save_container("t", &sample_snapshot("t")).await.unwrap();

        let hits: i64 = store
            .conn
            .call(|conn| {
                let count = conn.query_row(
                    "SELECT count(*) FROM chunks_fts WHERE chunks_fts MATCH 'camera'",
                    [],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await
            .unwrap();
        assert_eq!(hits, 1);

        store.clear_container("t").await.unwrap();
        let hits: i64 = store
            .conn
            .call(|conn| {
                let count = conn.query_row(
                    "SELECT count(*) FROM chunks_fts WHERE chunks_fts MATCH 'camera'",
                    [],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await
            .unwrap();
        assert_eq!(hits, 0, "delete triggers must prune the FTS mirror");
    }

    #[tokio::test]
    async fn embedding_blob_round_trips() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let mut snapshot = sample_snapshot("t");
        snapshot.chunks[0].embedding = (0..384).map(|i| (i as f32).sin()).collect();

        store.save_container("t", &snapshot).await.unwrap();
        let loaded = store.load_container("t").await.unwrap().unwrap();
        assert_eq!(loaded.chunks[0].embedding.len(), 384);
        for (a, b) in snapshot.chunks[0]
            .embedding
            .iter()
            .zip(loaded.chunks[0].embedding.iter())
        {
            assert!((a - b).abs() < f32::EPSILON);
        }
    }
}

// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File-based snapshot backend.
//!
//! Each container owns a directory under the store root holding
//! `search.json` (`{"chunks": [...]}` with embeddings as float arrays) and,
//! when the graph is non-empty, `graph.json` (`{"nodes": [...], "edges":
//! [...]}`). Files are written to a temporary sibling and renamed into
//! place so a crash never leaves a torn payload.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use mnemon_core::error::MnemonError;
use mnemon_core::traits::{PluginAdapter, SnapshotBackend};
use mnemon_core::types::{
    AdapterType, Chunk, ContainerSnapshot, EntityNode, HealthStatus, RelationshipEdge,
};

#[derive(Serialize, Deserialize)]
struct SearchPayload {
    chunks: Vec<Chunk>,
}

#[derive(Serialize, Deserialize)]
struct GraphPayload {
    nodes: Vec<EntityNode>,
    edges: Vec<RelationshipEdge>,
}

/// Snapshot persistence on the local filesystem.
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn container_dir(&self, container_tag: &str) -> PathBuf {
        self.root.join(sanitize_tag(container_tag))
    }
}

/// Make a container tag safe to use as a directory name.
fn sanitize_tag(tag: &str) -> String {
    let cleaned: String = tag
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

async fn write_json_atomic<T: Serialize>(path: &PathBuf, value: &T) -> Result<(), MnemonError> {
    let bytes = serde_json::to_vec(value).map_err(MnemonError::storage)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).await.map_err(MnemonError::storage)?;
    fs::rename(&tmp, path).await.map_err(MnemonError::storage)?;
    Ok(())
}

/// Read and parse a JSON file; `Ok(None)` when the file does not exist.
async fn read_json<T: for<'de> Deserialize<'de>>(
    path: &PathBuf,
) -> Result<Option<T>, MnemonError> {
    match fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(MnemonError::storage),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(MnemonError::storage(e)),
    }
}

#[async_trait]
impl PluginAdapter for SnapshotStore {
    fn name(&self) -> &str {
        "snapshot-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemonError> {
        match fs::create_dir_all(&self.root).await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "store root not writable: {e}"
            ))),
        }
    }
}

#[async_trait]
impl SnapshotBackend for SnapshotStore {
    async fn save_container(
        &self,
        container_tag: &str,
        snapshot: &ContainerSnapshot,
    ) -> Result<(), MnemonError> {
        let dir = self.container_dir(container_tag);
        fs::create_dir_all(&dir).await.map_err(MnemonError::storage)?;

        let search = SearchPayload {
            chunks: snapshot.chunks.clone(),
        };
        write_json_atomic(&dir.join("search.json"), &search).await?;

        let graph_path = dir.join("graph.json");
        if snapshot.nodes.is_empty() && snapshot.edges.is_empty() {
            match fs::remove_file(&graph_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(MnemonError::storage(e)),
            }
        } else {
            let graph = GraphPayload {
                nodes: snapshot.nodes.clone(),
                edges: snapshot.edges.clone(),
            };
            write_json_atomic(&graph_path, &graph).await?;
        }

        debug!(container = %container_tag, chunks = snapshot.chunks.len(), "snapshot written");
        Ok(())
    }

    async fn load_container(
        &self,
        container_tag: &str,
    ) -> Result<Option<ContainerSnapshot>, MnemonError> {
        let dir = self.container_dir(container_tag);
        let Some(search) = read_json::<SearchPayload>(&dir.join("search.json")).await? else {
            return Ok(None);
        };
        let graph = read_json::<GraphPayload>(&dir.join("graph.json")).await?;
        let (nodes, edges) = match graph {
            Some(graph) => (graph.nodes, graph.edges),
            None => (Vec::new(), Vec::new()),
        };
        Ok(Some(ContainerSnapshot {
            chunks: search.chunks,
            nodes,
            edges,
        }))
    }

    async fn clear_container(&self, container_tag: &str) -> Result<(), MnemonError> {
        match fs::remove_dir_all(self.container_dir(container_tag)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MnemonError::storage(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashMap};

    fn sample_snapshot() -> ContainerSnapshot {
        ContainerSnapshot {
            chunks: vec![Chunk {
                id: "t_s1_0".to_string(),
                container_tag: "t".to_string(),
                content: "The user got a Sony A7 camera.".to_string(),
                session_id: "s1".to_string(),
                chunk_index: 0,
                embedding: vec![0.25, -0.5, 1.0],
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
                date: Some("2024-05-09".to_string()),
                session_id: "s1".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn round_trip_preserves_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let snapshot = sample_snapshot();
        store.save_container("t", &snapshot).await.unwrap();
        let loaded = store.load_container("t").await.unwrap().unwrap();

        assert_eq!(loaded.chunks, snapshot.chunks);
        assert_eq!(loaded.nodes, snapshot.nodes);
        assert_eq!(loaded.edges, snapshot.edges);
    }

    #[tokio::test]
    async fn missing_container_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(store.load_container("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn graph_file_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let mut snapshot = sample_snapshot();
        snapshot.nodes.clear();
        snapshot.edges.clear();
        store.save_container("t", &snapshot).await.unwrap();

        assert!(!dir.path().join("t/graph.json").exists());
        let loaded = store.load_container("t").await.unwrap().unwrap();
        assert!(loaded.nodes.is_empty());
        assert_eq!(loaded.chunks.len(), 1);
    }

    #[tokio::test]
    async fn save_replaces_prior_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        store.save_container("t", &sample_snapshot()).await.unwrap();
        // Second save drops the graph; the stale graph file must go too.
        let mut second = sample_snapshot();
        second.nodes.clear();
        second.edges.clear();
        second.chunks[0].content = "updated".to_string();
        store.save_container("t", &second).await.unwrap();

        let loaded = store.load_container("t").await.unwrap().unwrap();
        assert_eq!(loaded.chunks[0].content, "updated");
        assert!(loaded.nodes.is_empty());
    }

    #[tokio::test]
    async fn clear_removes_the_container() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        store.save_container("t", &sample_snapshot()).await.unwrap();
        store.clear_container("t").await.unwrap();
        assert!(store.load_container("t").await.unwrap().is_none());

        // Clearing an absent container is not an error.
        store.clear_container("t").await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_payload_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        tokio::fs::create_dir_all(dir.path().join("t")).await.unwrap();
        tokio::fs::write(dir.path().join("t/search.json"), b"{broken")
            .await
            .unwrap();
        let err = store.load_container("t").await.unwrap_err();
        assert!(matches!(err, MnemonError::Storage { .. }));
    }

    #[tokio::test]
    async fn tags_with_separators_stay_inside_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        store
            .save_container("../escape/attempt", &sample_snapshot())
            .await
            .unwrap();
        let loaded = store.load_container("../escape/attempt").await.unwrap();
        assert!(loaded.is_some());
        assert!(!dir.path().join("../escape").exists());
    }
}

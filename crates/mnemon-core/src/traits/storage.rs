// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage backend trait for durable per-container snapshots.

use async_trait::async_trait;

use crate::error::MnemonError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ContainerSnapshot;

/// Adapter for durable persistence of per-container state.
///
/// Backends must round-trip [`ContainerSnapshot`] without loss, including
/// embeddings. The engine writes through after each successful ingest and
/// loads lazily on the first read of a container with empty in-memory state.
#[async_trait]
pub trait SnapshotBackend: PluginAdapter {
    /// Persist the full snapshot for one container, replacing prior state.
    async fn save_container(
        &self,
        container_tag: &str,
        snapshot: &ContainerSnapshot,
    ) -> Result<(), MnemonError>;

    /// Load the snapshot for one container; `None` when nothing was persisted.
    async fn load_container(
        &self,
        container_tag: &str,
    ) -> Result<Option<ContainerSnapshot>, MnemonError>;

    /// Remove all persisted state for one container.
    async fn clear_container(&self, container_tag: &str) -> Result<(), MnemonError>;
}

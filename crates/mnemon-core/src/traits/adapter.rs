// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait implemented by every pluggable collaborator.

use async_trait::async_trait;

use crate::error::MnemonError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for all Mnemon collaborator adapters.
///
/// Every adapter (LLM endpoint, embedder, storage backend) implements this
/// trait, which provides identity, health check, and shutdown capabilities.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Returns the kind of adapter (LLM, embedding, storage).
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, MnemonError>;

    /// Gracefully shuts down the adapter, releasing any held resources.
    async fn shutdown(&self) -> Result<(), MnemonError> {
        Ok(())
    }
}

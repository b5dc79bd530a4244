// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable snapshot backends for the Mnemon memory engine.
//!
//! Two interchangeable implementations of the storage contract: JSON files
//! per container ([`SnapshotStore`]) and SQLite ([`SqliteStore`]). Both
//! round-trip the container data model exactly; the engine depends only on
//! the contract.

pub mod snapshot;
pub mod sqlite;

pub use snapshot::SnapshotStore;
pub use sqlite::SqliteStore;

// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory pipeline for the Mnemon engine.
//!
//! Ties together LLM extraction (pooled, deduplicated, retried), the
//! tolerant extraction parser, per-container locking, LLM reranking, and
//! the [`MemoryProvider`] orchestrator that exposes the ingest/search
//! surface to hosts.

pub mod extract;
pub mod locks;
pub mod parser;
pub mod pool;
pub mod provider;
pub mod rerank;

pub use extract::ExtractionService;
pub use locks::ContainerLocks;
pub use pool::{FifoSemaphore, PoolPermit};
pub use provider::MemoryProvider;
pub use rerank::{classify_query, QueryType, Reranker};

// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity graph for the Mnemon memory engine.
//!
//! Maintains per-container entity nodes and relationship edges, supports
//! fuzzy spotting of entity names in query text, and produces bounded
//! multi-hop subgraphs around a seed set for context expansion.

pub mod graph;

pub use graph::{EntityGraph, GraphContext};

// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Mnemon memory engine.
//!
//! Layered loading (compiled defaults, TOML files, `MNEMON_*` environment
//! variables), strict unknown-key rejection, and collect-all semantic
//! validation.

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    ChunkingConfig, EmbeddingConfig, ExtractionConfig, GraphConfig, MnemonConfig, SearchConfig,
    StorageConfig,
};
pub use validation::validate_config;

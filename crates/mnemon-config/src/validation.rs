// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as fusion weights summing to one and overlap fitting
//! inside the chunk window.

use crate::model::MnemonConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<String>)` with all
/// collected validation errors (does not fail fast).
pub fn validate_config(config: &MnemonConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.chunking.chunk_size == 0 {
        errors.push("chunking.chunk_size must be greater than zero".to_string());
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        errors.push(format!(
            "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.chunk_overlap, config.chunking.chunk_size
        ));
    }

    if config.embedding.batch_size == 0 {
        errors.push("embedding.batch_size must be greater than zero".to_string());
    }
    if config.embedding.model.trim().is_empty() {
        errors.push("embedding.model must not be empty".to_string());
    }

    if config.extraction.concurrency == 0 {
        errors.push("extraction.concurrency must be greater than zero".to_string());
    }
    if config.extraction.max_global_extractions == 0 {
        errors.push("extraction.max_global_extractions must be greater than zero".to_string());
    }

    let weight_sum = config.search.vector_weight + config.search.bm25_weight;
    if (weight_sum - 1.0).abs() > 1e-6 {
        errors.push(format!(
            "search.vector_weight + search.bm25_weight must sum to 1.0 (got {weight_sum})"
        ));
    }
    if config.search.vector_weight < 0.0 || config.search.bm25_weight < 0.0 {
        errors.push("search fusion weights must be non-negative".to_string());
    }
    if config.search.rerank_overfetch == 0 {
        errors.push("search.rerank_overfetch must be greater than zero".to_string());
    }

    if config.graph.max_entities == 0 {
        errors.push("graph.max_entities must be greater than zero".to_string());
    }
    if config.graph.max_relationships == 0 {
        errors.push("graph.max_relationships must be greater than zero".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&MnemonConfig::default()).is_ok());
    }

    #[test]
    fn bad_weights_are_rejected() {
        let mut config = MnemonConfig::default();
        config.search.vector_weight = 0.9;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("sum to 1.0")));
    }

    #[test]
    fn overlap_must_fit_window() {
        let mut config = MnemonConfig::default();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("chunk_overlap")));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = MnemonConfig::default();
        config.chunking.chunk_size = 0;
        config.embedding.batch_size = 0;
        config.graph.max_entities = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 3, "expected every violation reported, got {errors:?}");
    }
}

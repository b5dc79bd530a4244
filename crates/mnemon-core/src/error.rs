// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Mnemon memory engine.

use thiserror::Error;

/// The primary error type used across all Mnemon adapter traits and engine operations.
#[derive(Debug, Error)]
pub enum MnemonError {
    /// Configuration errors (missing API key, invalid fusion weights,
    /// embedding-dimension mismatch on snapshot load).
    #[error("configuration error: {0}")]
    Config(String),

    /// Network or API failures from the embedding service or an LLM endpoint.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage backend errors (snapshot I/O, database failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Collaborator output that could not be parsed where a parse was required.
    ///
    /// Most LLM-output parsing in the engine is tolerant and degrades instead
    /// of surfacing this variant; it exists for the cases where a caller needs
    /// to distinguish "malformed" from "transport" inside a retry loop.
    #[error("parse error: {0}")]
    Parse(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MnemonError {
    /// Shorthand for a transport error with no underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        MnemonError::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an I/O or database error as a storage error.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        MnemonError::Storage {
            source: Box::new(source),
        }
    }
}

// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP implementations of the Mnemon collaborator adapters.
//!
//! [`RemoteLlm`] and [`RemoteEmbedder`] speak minimal JSON APIs with
//! bearer-key auth and transient-error retry. Engine-level retry policies
//! (extraction, embedding batches, reranking) sit above these clients.

mod transport;

pub mod embedder;
pub mod llm;

pub use embedder::RemoteEmbedder;
pub use llm::RemoteLlm;

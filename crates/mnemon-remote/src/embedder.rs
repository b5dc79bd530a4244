// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for an embedding endpoint.
//!
//! Posts `{model, input: [...]}` to `<base>/v1/embeddings` and expects
//! `{embeddings: [[...], ...]}` with one vector per input, in order.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use mnemon_core::error::MnemonError;
use mnemon_core::traits::{EmbeddingAdapter, PluginAdapter};
use mnemon_core::types::{AdapterType, HealthStatus};

use crate::transport::{build_client, is_transient, request_err};

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Remote embedding service speaking a minimal JSON embeddings API.
pub struct RemoteEmbedder {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl RemoteEmbedder {
    /// Create a client against the given API base URL.
    pub fn new(api_key: &str, base_url: impl Into<String>) -> Result<Self, MnemonError> {
        Ok(Self {
            client: build_client(api_key)?,
            base_url: base_url.into(),
            max_retries: 1,
        })
    }

    async fn request(&self, model: &str, input: &[String]) -> Result<Vec<Vec<f32>>, MnemonError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(&url)
                .json(&EmbeddingsRequest { model, input })
                .send()
                .await
                .map_err(request_err)?;

            let status = response.status();
            if status.is_success() {
                let parsed: EmbeddingsResponse =
                    response.json().await.map_err(|e| MnemonError::Transport {
                        message: format!("malformed embeddings response: {e}"),
                        source: Some(Box::new(e)),
                    })?;
                if parsed.embeddings.len() != input.len() {
                    return Err(MnemonError::Transport {
                        message: format!(
                            "embedding service returned {} vectors for {} inputs",
                            parsed.embeddings.len(),
                            input.len()
                        ),
                        source: None,
                    });
                }
                return Ok(parsed.embeddings);
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient(status) && attempt < self.max_retries {
                attempt += 1;
                warn!(attempt, status = %status, "transient embeddings error, will retry");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
            return Err(MnemonError::Transport {
                message: format!("embeddings request failed with {status}: {body}"),
                source: None,
            });
        }
    }
}

#[async_trait]
impl PluginAdapter for RemoteEmbedder {
    fn name(&self) -> &str {
        "remote-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemonError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl EmbeddingAdapter for RemoteEmbedder {
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, MnemonError> {
        let input = vec![text.to_string()];
        let mut vectors = self.request(model, &input).await?;
        vectors
            .pop()
            .ok_or_else(|| MnemonError::transport("embedding service returned no vectors"))
    }

    async fn embed_many(
        &self,
        model: &str,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, MnemonError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(model, texts).await
    }
}

// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for a text-generation endpoint.
//!
//! Posts `{model, prompt}` to `<base>/v1/generate` and expects `{text}`.
//! Transient failures (429, 500, 503) are retried once after a short
//! pause; the engine layers its own retry policies on top.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use mnemon_core::error::MnemonError;
use mnemon_core::traits::{LlmAdapter, PluginAdapter};
use mnemon_core::types::{AdapterType, HealthStatus};

use crate::transport::{build_client, is_transient, request_err};

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    text: String,
}

/// Remote LLM endpoint speaking a minimal JSON generate API.
pub struct RemoteLlm {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl RemoteLlm {
    /// Create a client against the given API base URL.
    pub fn new(api_key: &str, base_url: impl Into<String>) -> Result<Self, MnemonError> {
        Ok(Self {
            client: build_client(api_key)?,
            base_url: base_url.into(),
            max_retries: 1,
        })
    }
}

#[async_trait]
impl PluginAdapter for RemoteLlm {
    fn name(&self) -> &str {
        "remote-llm"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Llm
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemonError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl LlmAdapter for RemoteLlm {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, MnemonError> {
        let url = format!("{}/v1/generate", self.base_url);
        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(&url)
                .json(&GenerateRequest { model, prompt })
                .send()
                .await
                .map_err(request_err)?;

            let status = response.status();
            if status.is_success() {
                let parsed: GenerateResponse =
                    response.json().await.map_err(|e| MnemonError::Transport {
                        message: format!("malformed generate response: {e}"),
                        source: Some(Box::new(e)),
                    })?;
                return Ok(parsed.text);
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient(status) && attempt < self.max_retries {
                attempt += 1;
                warn!(attempt, status = %status, "transient generate error, will retry");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
            return Err(MnemonError::Transport {
                message: format!("generate request failed with {status}: {body}"),
                source: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn generate_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .and(body_partial_json(serde_json::json!({"model": "m1"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"text": "extracted memories"})),
            )
            .mount(&server)
            .await;

        let llm = RemoteLlm::new("key", server.uri()).unwrap();
        let text = llm.generate("m1", "prompt").await.unwrap();
        assert_eq!(text, "extracted memories");
    }

    #[tokio::test]
    async fn generate_retries_on_429() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "after retry"})),
            )
            .mount(&server)
            .await;

        let llm = RemoteLlm::new("key", server.uri()).unwrap();
        let text = llm.generate("m1", "prompt").await.unwrap();
        assert_eq!(text, "after retry");
    }

    #[tokio::test]
    async fn generate_fails_on_400() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string("{\"error\": \"bad model\"}"),
            )
            .mount(&server)
            .await;

        let llm = RemoteLlm::new("key", server.uri()).unwrap();
        let err = llm.generate("m1", "prompt").await.unwrap_err();
        assert!(matches!(err, MnemonError::Transport { .. }));
        assert!(err.to_string().contains("400"), "got: {err}");
    }
}

// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared HTTP plumbing for the remote adapters.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use mnemon_core::error::MnemonError;

/// Request timeout for remote calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Build a client with bearer-key auth and JSON content type.
pub(crate) fn build_client(api_key: &str) -> Result<reqwest::Client, MnemonError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        "authorization",
        HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| MnemonError::Config(format!("invalid API key header value: {e}")))?,
    );
    headers.insert("content-type", HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| MnemonError::Transport {
            message: format!("failed to build HTTP client: {e}"),
            source: Some(Box::new(e)),
        })
}

/// True for HTTP status codes that indicate transient errors worth retrying.
pub(crate) fn is_transient(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

/// Map a reqwest failure (connect, timeout) to a transport error.
pub(crate) fn request_err(e: reqwest::Error) -> MnemonError {
    MnemonError::Transport {
        message: format!("request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

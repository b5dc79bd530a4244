// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM adapter for deterministic testing.
//!
//! Replies are popped from a FIFO queue and may be scripted as text or as
//! transport errors. When the queue is empty a default "mock response"
//! text is returned. Calls are counted so tests can assert deduplication
//! and retry behavior.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use mnemon_core::error::MnemonError;
use mnemon_core::traits::{LlmAdapter, PluginAdapter};
use mnemon_core::types::{AdapterType, HealthStatus};

enum MockReply {
    Text(String),
    TransportError(String),
}

/// A mock LLM that returns pre-scripted replies.
pub struct MockLlm {
    replies: Mutex<VecDeque<MockReply>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl MockLlm {
    /// Create a mock with an empty reply queue.
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Create a mock pre-loaded with the given text replies.
    pub fn with_responses(responses: Vec<String>) -> Self {
        let mock = Self::new();
        for response in responses {
            mock.push_response(response);
        }
        mock
    }

    /// Sleep this long inside every `generate` call (for overlap tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a text reply.
    pub fn push_response(&self, text: impl Into<String>) {
        self.lock().push_back(MockReply::Text(text.into()));
    }

    /// Queue a transport failure.
    pub fn push_transport_error(&self, message: impl Into<String>) {
        self.lock()
            .push_back(MockReply::TransportError(message.into()));
    }

    /// Number of `generate` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<MockReply>> {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockLlm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockLlm {
    fn name(&self) -> &str {
        "mock-llm"
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
impl LlmAdapter for MockLlm {
    async fn generate(&self, _model: &str, _prompt: &str) -> Result<String, MnemonError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.lock().pop_front() {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::TransportError(message)) => Err(MnemonError::transport(message)),
            None => Ok("mock response".to_string()),
        }
    }
}

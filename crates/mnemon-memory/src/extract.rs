// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session memory extraction via the LLM adapter.
//!
//! Each session is extracted at most once: completed results live in a
//! process-wide cache keyed by session id, and concurrent requests for the
//! same session share a single in-flight future, so two overlapping
//! ingests of one session produce exactly one LLM call. Calls run under
//! the global FIFO pool and retry transport failures with exponential
//! backoff.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

use mnemon_core::error::MnemonError;
use mnemon_core::traits::LlmAdapter;
use mnemon_core::types::Session;

use crate::pool::FifoSemaphore;

const MAX_ATTEMPTS: u32 = 5;
const BASE_BACKOFF_SECS: u64 = 2;

/// Prompt template for memory extraction. `{date}` and `{conversation}`
/// are substituted per session.
const EXTRACTION_PROMPT: &str = r#"Extract long-term memories from this conversation. The conversation took place on {date}.

Output three sections:

<memories>
One memory per line, written as a standalone factual statement. When a line describes an event, start the line with the event date in the form [YYYY-MM-DD]; resolve relative references ("yesterday", "last week") against the conversation date.
</memories>

<entities>
name|type|summary
One entity per line. type is one of: person, organization, location, object, concept. Keep the summary to one sentence.
</entities>

<relationships>
source|relation|target|date
One relationship per line between named entities. The date field is optional.
</relationships>

Only include information actually stated in the conversation. Leave a section empty when there is nothing to report.

Conversation:
{conversation}"#;

type SharedExtraction = Shared<BoxFuture<'static, Result<String, Arc<MnemonError>>>>;

/// Deduplicating, pool-limited extraction driver.
pub struct ExtractionService {
    llm: Arc<dyn LlmAdapter>,
    model: String,
    pool: Arc<FifoSemaphore>,
    completed: Mutex<HashMap<String, String>>,
    in_flight: Mutex<HashMap<String, SharedExtraction>>,
}

impl ExtractionService {
    pub fn new(llm: Arc<dyn LlmAdapter>, model: String, pool: Arc<FifoSemaphore>) -> Self {
        Self {
            llm,
            model,
            pool,
            completed: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Extract memories from one session, reusing cached or in-flight work.
    ///
    /// All callers for the same session id receive the same result string.
    pub async fn extract(&self, session: &Session) -> Result<String, MnemonError> {
        if let Some(text) = lock(&self.completed).get(&session.id) {
            debug!(session = %session.id, "extraction cache hit");
            return Ok(text.clone());
        }

        let fut = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.get(&session.id) {
                Some(existing) => {
                    debug!(session = %session.id, "joining in-flight extraction");
                    existing.clone()
                }
                None => {
                    let llm = Arc::clone(&self.llm);
                    let model = self.model.clone();
                    let pool = Arc::clone(&self.pool);
                    let prompt = build_extraction_prompt(session);
                    let fut = async move {
                        let _permit = pool.acquire().await;
                        generate_with_retry(llm, &model, &prompt)
                            .await
                            .map_err(Arc::new)
                    }
                    .boxed()
                    .shared();
                    in_flight.insert(session.id.clone(), fut.clone());
                    fut
                }
            }
        };

        let result = fut.await;
        lock(&self.in_flight).remove(&session.id);

        match result {
            Ok(text) => {
                lock(&self.completed)
                    .insert(session.id.clone(), text.clone());
                Ok(text)
            }
            Err(shared) => Err(MnemonError::Transport {
                message: format!("extraction failed for session {}: {shared}", session.id),
                source: None,
            }),
        }
    }
}

/// Call the extraction model, retrying transport failures with
/// exponential backoff (2s, 4s, 8s, 16s).
async fn generate_with_retry(
    llm: Arc<dyn LlmAdapter>,
    model: &str,
    prompt: &str,
) -> Result<String, MnemonError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match llm.generate(model, prompt).await {
            Ok(text) => return Ok(text),
            Err(MnemonError::Transport { message, .. }) if attempt < MAX_ATTEMPTS => {
                let delay = Duration::from_secs(BASE_BACKOFF_SECS << (attempt - 1));
                warn!(attempt, %message, "extraction call failed, backing off");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

fn build_extraction_prompt(session: &Session) -> String {
    let mut conversation = String::new();
    for msg in &session.messages {
        match &msg.timestamp {
            Some(ts) => {
                conversation.push_str(&format!("{} ({ts}): {}\n", msg.speaker, msg.content))
            }
            None => conversation.push_str(&format!("{}: {}\n", msg.speaker, msg.content)),
        }
    }
    let date = session.date.as_deref().unwrap_or("an unknown date");
    EXTRACTION_PROMPT
        .replace("{date}", date)
        .replace("{conversation}", &conversation)
}

fn lock<'a, T>(mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemon_core::types::SessionMessage;
    use mnemon_test_utils::MockLlm;

    fn session(id: &str) -> Session {
        Session {
            id: id.to_string(),
            date: Some("2024-05-10".to_string()),
            messages: vec![SessionMessage {
                speaker: "user".to_string(),
                timestamp: None,
                content: "I got a Sony A7 camera yesterday.".to_string(),
            }],
            metadata: HashMap::new(),
        }
    }

    fn service(llm: Arc<MockLlm>) -> ExtractionService {
        ExtractionService::new(llm, "extract-model".to_string(), Arc::new(FifoSemaphore::new(4)))
    }

    #[test]
    fn prompt_carries_date_and_speakers() {
        let prompt = build_extraction_prompt(&session("s1"));
        assert!(prompt.contains("took place on 2024-05-10"));
        assert!(prompt.contains("user: I got a Sony A7 camera yesterday."));
        assert!(prompt.contains("<memories>"));
    }

    #[tokio::test]
    async fn sequential_calls_hit_the_cache() {
        let llm = Arc::new(MockLlm::with_responses(vec!["<memories>\nfact\n</memories>".into()]));
        let service = service(Arc::clone(&llm));

        let first = service.extract(&session("s1")).await.unwrap();
        let second = service.extract(&session("s1")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(llm.call_count(), 1, "second call must come from the cache");
    }

    #[tokio::test]
    async fn concurrent_calls_share_one_llm_call() {
        let llm = Arc::new(
            MockLlm::with_responses(vec!["<memories>\nshared\n</memories>".into()])
                .with_delay(Duration::from_millis(50)),
        );
        let service = Arc::new(service(Arc::clone(&llm)));

        let a = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.extract(&session("s1")).await })
        };
        let b = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.extract(&session("s1")).await })
        };
        let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());

        assert_eq!(a, b, "both callers must see the same result string");
        assert_eq!(llm.call_count(), 1, "in-flight work must be shared");
    }

    #[tokio::test]
    async fn distinct_sessions_extract_independently() {
        let llm = Arc::new(MockLlm::with_responses(vec![
            "first".into(),
            "second".into(),
        ]));
        let service = service(Arc::clone(&llm));

        let a = service.extract(&session("s1")).await.unwrap();
        let b = service.extract(&session("s2")).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failures_are_retried_with_backoff() {
        let llm = Arc::new(MockLlm::new());
        llm.push_transport_error("rate limited");
        llm.push_transport_error("rate limited");
        llm.push_response("<memories>\nrecovered\n</memories>");
        let service = service(Arc::clone(&llm));

        let text = service.extract(&session("s1")).await.unwrap();
        assert!(text.contains("recovered"));
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_a_transport_error() {
        let llm = Arc::new(MockLlm::new());
        for _ in 0..5 {
            llm.push_transport_error("down");
        }
        let service = service(Arc::clone(&llm));

        let err = service.extract(&session("s1")).await.unwrap_err();
        assert!(matches!(err, MnemonError::Transport { .. }));
        assert_eq!(llm.call_count(), 5, "five attempts, then give up");

        // A failure is not cached; the next call tries again.
        llm.push_response("late success");
        let text = service.extract(&session("s1")).await.unwrap();
        assert_eq!(text, "late success");
    }
}

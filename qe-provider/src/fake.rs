//! A deterministic, queueable [`Provider`] test double.
//!
//! Callers queue canned responses (or errors) up front, then assert on the
//! captured requests afterward. No network access, no timing dependency.

use crate::provider::{Provider, ProviderError};
use crate::types::{GenerateRequest, GenerateResponse};
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// A [`Provider`] that replays a queue of canned responses in order.
///
/// If the queue is exhausted, further calls return
/// [`ProviderError::RequestFailed`] with a message explaining the queue
/// ran dry — this is almost always a test bug (not enough responses
/// queued), so it's surfaced loudly rather than looping the last response.
pub struct FakeProvider {
    name: String,
    responses: Mutex<VecDeque<Result<GenerateResponse, ProviderError>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl FakeProvider {
    /// Build a fake provider that will hand out `responses` in order, one
    /// per call.
    pub fn new(responses: Vec<Result<GenerateResponse, ProviderError>>) -> Self {
        Self {
            name: "fake".to_string(),
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Convenience constructor for the common case: every call succeeds
    /// with the same JSON text (e.g. a fixed classification).
    pub fn constant(output_text: impl Into<String>, count: usize) -> Self {
        let output_text = output_text.into();
        let responses = (0..count)
            .map(|_| {
                Ok(GenerateResponse {
                    output_text: output_text.clone(),
                    usage: None,
                })
            })
            .collect();
        Self::new(responses)
    }

    /// All requests received so far, in call order.
    pub async fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().await.clone()
    }

    /// Number of calls made so far.
    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl Provider for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_structured(
        &self,
        request: GenerateRequest,
    ) -> Result<GenerateResponse, ProviderError> {
        self.requests.lock().await.push(request);
        let mut queue = self.responses.lock().await;
        queue.pop_front().unwrap_or_else(|| {
            Err(ProviderError::RequestFailed(
                "FakeProvider queue exhausted".to_string(),
            ))
        })
    }
}

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;

use crate::models::message::Message;
use crate::providers::base::{Provider, Usage};

/// A scripted reply of the [`MockProvider`]
#[derive(Debug, Clone)]
pub enum MockResponse {
    Text(String),
    /// Fail the call as a transport error would
    Failure(String),
}

/// A mock provider that returns pre-configured responses for testing
///
/// Every conversation it is called with is recorded so tests can assert on
/// exactly what was sent.
#[derive(Clone, Default)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<MockResponse>>>,
    calls: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of text responses
    pub fn new<S: Into<String>>(responses: Vec<S>) -> Self {
        Self::with_responses(
            responses
                .into_iter()
                .map(|text| MockResponse::Text(text.into()))
                .collect(),
        )
    }

    pub fn with_responses(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The conversations received so far, one entry per call
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or_default()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, messages: &[Message]) -> Result<(Message, Usage)> {
        self.calls
            .lock()
            .map_err(|_| anyhow!("mock provider lock poisoned"))?
            .push(messages.to_vec());

        let mut responses = self
            .responses
            .lock()
            .map_err(|_| anyhow!("mock provider lock poisoned"))?;
        if responses.is_empty() {
            // Return empty response if no more pre-configured responses
            return Ok((Message::assistant(""), Usage::default()));
        }
        match responses.remove(0) {
            MockResponse::Text(text) => Ok((Message::assistant(text), Usage::default())),
            MockResponse::Failure(reason) => Err(anyhow!(reason)),
        }
    }

    fn model(&self) -> &str {
        "mock"
    }
}

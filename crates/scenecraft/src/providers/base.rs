use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::message::Message;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// Base trait for completion services (OpenAI, Ollama, etc)
///
/// A provider is a stateless request/response boundary: it receives the whole
/// conversation, including its leading system message, and returns the
/// assistant turn. Failures are returned as-is and never retried here.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next assistant message for the conversation
    async fn complete(&self, messages: &[Message]) -> Result<(Message, Usage)>;

    /// The model identifier requests are sent for
    fn model(&self) -> &str;
}

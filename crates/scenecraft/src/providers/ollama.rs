use super::base::{Provider, Usage};
use super::configs::OllamaProviderConfig;
use super::utils::{get_usage, messages_to_openai_spec, openai_response_to_message};
use crate::models::message::Message;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

pub const OLLAMA_HOST: &str = "http://localhost:11434";
pub const OLLAMA_MODEL: &str = "qwen2.5";

/// Local models served through Ollama's OpenAI compatible endpoint
pub struct OllamaProvider {
    client: Client,
    config: OllamaProviderConfig,
}

impl OllamaProvider {
    pub fn new(config: OllamaProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self.client.post(&url).json(&payload).send().await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            _ => Err(anyhow!(
                "Request failed: {}\nPayload: {}",
                response.status(),
                payload
            )),
        }
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn complete(&self, messages: &[Message]) -> Result<(Message, Usage)> {
        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_to_openai_spec(messages)
        });

        if let Some(object) = payload.as_object_mut() {
            if let Some(temp) = self.config.temperature {
                object.insert("temperature".to_string(), json!(temp));
            }
            if let Some(tokens) = self.config.max_tokens {
                object.insert("max_tokens".to_string(), json!(tokens));
            }
        }

        let response = self.post(payload).await?;
        if let Some(error) = response.get("error") {
            return Err(anyhow!("Ollama API error: {}", error));
        }

        let message = openai_response_to_message(&response)?;
        let usage = get_usage(&response).unwrap_or_default();

        Ok((message, usage))
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_complete_basic() -> Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "Hello!"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 3, "completion_tokens": 2}
            })))
            .mount(&mock_server)
            .await;

        let provider = OllamaProvider::new(OllamaProviderConfig {
            host: mock_server.uri(),
            ..OllamaProviderConfig::default()
        })?;

        let (message, usage) = provider.complete(&[Message::user("Hello?")]).await?;
        assert_eq!(message.content, "Hello!");
        assert_eq!(usage.total_tokens, Some(5));
        Ok(())
    }
}

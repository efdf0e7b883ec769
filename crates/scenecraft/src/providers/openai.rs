use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Provider, Usage};
use super::configs::OpenAiProviderConfig;
use super::utils::{
    check_openai_context_length_error, get_usage, messages_to_openai_spec,
    openai_response_to_message,
};
use crate::models::message::Message;

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
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

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(anyhow!(
                "Authentication failed: {}, check the configured API key",
                response.status()
            )),
            status => Err(anyhow!(
                "Request failed: {}\nResponse: {}",
                status,
                response.text().await.unwrap_or_default()
            )),
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(&self, messages: &[Message]) -> Result<(Message, Usage)> {
        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_to_openai_spec(messages)
        });

        // Add optional parameters
        if let Some(object) = payload.as_object_mut() {
            if let Some(temp) = self.config.temperature {
                object.insert("temperature".to_string(), json!(temp));
            }
            if let Some(tokens) = self.config.max_tokens {
                object.insert("max_tokens".to_string(), json!(tokens));
            }
        }

        let response = self.post(payload).await?;

        // Raise specific error if context length is exceeded
        if let Some(error) = response.get("error") {
            if let Some(err) = check_openai_context_length_error(error) {
                return Err(err.into());
            }
            return Err(anyhow!("OpenAI API error: {}", error));
        }

        let message = openai_response_to_message(&response)?;
        let usage = get_usage(&response).unwrap_or_default();

        Ok((message, usage))
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

use anyhow::{anyhow, Result};
use serde_json::{json, Value};

use super::base::Usage;
use crate::models::message::Message;

/// Convert internal Message format to OpenAI's API message specification
///
/// Messages with image attachments use the content-part array form, with the
/// text first followed by one `image_url` part per image.
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            if message.has_images() {
                let mut parts = vec![json!({
                    "type": "text",
                    "text": message.content,
                })];
                parts.extend(message.images.iter().map(|image| {
                    json!({
                        "type": "image_url",
                        "image_url": { "url": image.data_url() }
                    })
                }));
                json!({ "role": message.role, "content": parts })
            } else {
                json!({ "role": message.role, "content": message.content })
            }
        })
        .collect()
}

/// Convert OpenAI's API response to internal Message format
pub fn openai_response_to_message(response: &Value) -> Result<Message> {
    let original = &response["choices"][0]["message"];
    let text = original
        .get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("No text content in completion response: {}", response))?;
    Ok(Message::assistant(text))
}

/// Read token usage, computing the total when only the parts are reported
pub fn get_usage(data: &Value) -> Option<Usage> {
    let usage = data.get("usage")?;

    let input_tokens = usage
        .get("prompt_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);

    let output_tokens = usage
        .get("completion_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);

    let total_tokens = usage
        .get("total_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32)
        .or_else(|| match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        });

    Some(Usage::new(input_tokens, output_tokens, total_tokens))
}

#[derive(Debug, thiserror::Error)]
#[error("Input message too long. Message: {0}")]
pub struct InitialMessageTooLargeError(String);

pub fn check_openai_context_length_error(error: &Value) -> Option<InitialMessageTooLargeError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(InitialMessageTooLargeError(message))
    } else {
        None
    }
}

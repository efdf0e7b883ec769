use super::ollama::{OLLAMA_HOST, OLLAMA_MODEL};

pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const OPENAI_MODEL: &str = "gpt-4o";

// Unified enum to wrap different provider configurations
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    OpenAi(OpenAiProviderConfig),
    Ollama(OllamaProviderConfig),
}

#[derive(Debug, Clone)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

impl OpenAiProviderConfig {
    /// Config for the public OpenAI endpoint with default sampling
    pub fn new<S: Into<String>>(api_key: S, model: S) -> Self {
        Self {
            host: OPENAI_HOST.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OllamaProviderConfig {
    pub host: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

impl Default for OllamaProviderConfig {
    fn default() -> Self {
        Self {
            host: OLLAMA_HOST.to_string(),
            model: OLLAMA_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

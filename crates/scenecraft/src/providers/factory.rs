use super::{
    base::Provider, configs::ProviderConfig, ollama::OllamaProvider, openai::OpenAiProvider,
};
use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    OpenAi,
    Ollama,
}

impl ProviderConfig {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderConfig::OpenAi(_) => ProviderType::OpenAi,
            ProviderConfig::Ollama(_) => ProviderType::Ollama,
        }
    }
}

pub fn get_provider(config: ProviderConfig) -> Result<Box<dyn Provider>> {
    match config {
        ProviderConfig::OpenAi(openai_config) => Ok(Box::new(OpenAiProvider::new(openai_config)?)),
        ProviderConfig::Ollama(ollama_config) => Ok(Box::new(OllamaProvider::new(ollama_config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::configs::{OllamaProviderConfig, OpenAiProviderConfig};

    #[test]
    fn test_get_provider_keeps_model() -> Result<()> {
        let openai = get_provider(ProviderConfig::OpenAi(OpenAiProviderConfig::new(
            "key", "gpt-4o",
        )))?;
        assert_eq!(openai.model(), "gpt-4o");

        let config = ProviderConfig::Ollama(OllamaProviderConfig::default());
        assert_eq!(config.provider_type(), ProviderType::Ollama);
        let ollama = get_provider(config)?;
        assert_eq!(ollama.model(), crate::providers::ollama::OLLAMA_MODEL);
        Ok(())
    }
}

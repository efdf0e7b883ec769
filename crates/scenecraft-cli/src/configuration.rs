use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment};
use scenecraft::agent::DEFAULT_RETRY_BUDGET;
use scenecraft::providers::configs::{
    OllamaProviderConfig, OpenAiProviderConfig, ProviderConfig, OPENAI_HOST, OPENAI_MODEL,
};
use scenecraft::providers::factory::ProviderType;
use scenecraft::providers::ollama;
use scenecraft::scene::blender::{self, BlenderSettings as HostSettings};
use scenecraft::scene::describe::DEFAULT_MAX_CAMERAS;
use serde::Deserialize;

use crate::error::{to_env_var, ConfigError, ENV_PREFIX};

/// Read when no key is configured for the openai provider
const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    OpenAi {
        #[serde(default = "default_openai_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
    Ollama {
        #[serde(default = "default_ollama_host")]
        host: String,
        #[serde(default = "default_ollama_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
}

impl ProviderSettings {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderSettings::OpenAi { .. } => ProviderType::OpenAi,
            ProviderSettings::Ollama { .. } => ProviderType::Ollama,
        }
    }

    pub fn into_config(self) -> ProviderConfig {
        match self {
            ProviderSettings::OpenAi {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            } => ProviderConfig::OpenAi(OpenAiProviderConfig {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            }),
            ProviderSettings::Ollama {
                host,
                model,
                temperature,
                max_tokens,
            } => ProviderConfig::Ollama(OllamaProviderConfig {
                host,
                model,
                temperature,
                max_tokens,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            retry_budget: default_retry_budget(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BlenderSettings {
    #[serde(default = "default_blender_binary")]
    pub binary: PathBuf,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_cameras")]
    pub max_cameras: usize,
    #[serde(default)]
    pub render_timeout_secs: Option<u64>,
}

impl Default for BlenderSettings {
    fn default() -> Self {
        Self {
            binary: default_blender_binary(),
            poll_interval_ms: default_poll_interval_ms(),
            max_cameras: default_max_cameras(),
            render_timeout_secs: None,
        }
    }
}

impl BlenderSettings {
    pub fn host_settings(&self) -> HostSettings {
        HostSettings {
            binary: self.binary.clone(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            render_timeout: self.render_timeout_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub provider: ProviderSettings,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub blender: BlenderSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    pub fn provider_config(&self) -> ProviderConfig {
        self.provider.clone().into_config()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("provider.type", "openai")?
            .set_default("agent.retry_budget", default_retry_budget())?
            .set_default("blender.binary", blender::DEFAULT_BLENDER_BINARY)?
            .set_default("blender.poll_interval_ms", default_poll_interval_ms())?
            .set_default("blender.max_cameras", default_max_cameras() as u64)?;

        if let Ok(api_key) = std::env::var(OPENAI_API_KEY_VAR) {
            builder = builder.set_default("provider.api_key", api_key)?;
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if let Some(field) = missing_field(&error_str) {
                    // Every other section has a default for each field
                    let env_var = to_env_var(&format!("provider.{}", field));
                    Err(ConfigError::MissingEnvVar { env_var })
                } else if let config::ConfigError::NotFound(field) = &err {
                    let env_var = to_env_var(field);
                    Err(ConfigError::MissingEnvVar { env_var })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

/// Field name out of a "missing field `name`" error
fn missing_field(error: &str) -> Option<&str> {
    let rest = error.strip_prefix("missing field `")?;
    rest.split('`').next()
}

fn default_model() -> String {
    OPENAI_MODEL.to_string()
}

fn default_openai_host() -> String {
    OPENAI_HOST.to_string()
}

fn default_ollama_host() -> String {
    ollama::OLLAMA_HOST.to_string()
}

fn default_ollama_model() -> String {
    ollama::OLLAMA_MODEL.to_string()
}

fn default_retry_budget() -> u32 {
    DEFAULT_RETRY_BUDGET
}

fn default_blender_binary() -> PathBuf {
    PathBuf::from(blender::DEFAULT_BLENDER_BINARY)
}

fn default_poll_interval_ms() -> u64 {
    blender::DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_max_cameras() -> usize {
    DEFAULT_MAX_CAMERAS
}

use thiserror::Error;

pub const ENV_PREFIX: &str = "SCENECRAFT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Environment variable that sets the dotted configuration key `field_path`
pub fn to_env_var(field_path: &str) -> String {
    format!(
        "{}_{}",
        ENV_PREFIX,
        field_path.replace('.', "__").to_uppercase()
    )
}

use std::path::PathBuf;

use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AgentError {
    /// Transport or authentication failure of the completion service. Never retried.
    #[error("Completion service error: {0}")]
    Service(#[source] anyhow::Error),

    /// The model could not produce a conforming structured response within budget.
    #[error("LLM failed to produce a valid structured response after {attempts} corrective attempts")]
    StructuredOutputExhausted { attempts: u32 },

    #[error("Could not attach image {}: {source}", path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to persist conversation: {0}")]
    Persistence(#[from] std::io::Error),
}

pub type AgentResult<T> = Result<T, AgentError>;

//! Error types for the grounding agent.

use std::time::Duration;

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} not found in environment variables")]
    MissingEnvVar { key: String },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from the generation model.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Request to {provider} failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Authentication failed for {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by {provider}, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Tool loop exceeded {max_rounds} rounds without a final answer")]
    ToolLoopExhausted { max_rounds: usize },
}

/// Errors surfaced by the orchestrator to its callers.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Missing 'query' parameter")]
    EmptyQuery,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AgentError {
    /// True when the caller sent a bad request rather than the server failing.
    pub fn is_validation(&self) -> bool {
        matches!(self, AgentError::EmptyQuery)
    }
}

/// Errors from the front-end transports.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

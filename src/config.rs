//! Runtime configuration, resolved from the environment.
//!
//! A `.env` file in the working directory is loaded first (see `main.rs`), then
//! the values below are read from the process environment.

use std::net::SocketAddr;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Environment variable holding the Gemini API key.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MAX_TOOL_ROUNDS: usize = 10;

/// Settings for the Gemini API client.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
}

impl GoogleConfig {
    /// Read the Gemini settings from the environment.
    ///
    /// A missing API key is not an error here: servers still answer the
    /// tool-only endpoints without one. [`GoogleConfig::require_api_key`]
    /// enforces it where generation is needed.
    pub fn from_env() -> Self {
        let api_key = std::env::var(API_KEY_VAR)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);

        Self {
            api_key,
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        }
    }

    pub fn require_api_key(&self) -> Result<&SecretString, ConfigError> {
        self.api_key
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar {
                key: API_KEY_VAR.to_string(),
            })
    }
}

/// Tuning for the two-stage pipeline.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Sampling temperature for the tool-augmented grounding call.
    pub grounding_temperature: f32,
    /// Sampling temperature for the refinement call.
    pub refinement_temperature: f32,
    /// Upper bound on model turns that request tool calls.
    pub max_tool_rounds: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            grounding_temperature: 0.7,
            refinement_temperature: 0.3,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("GROUNDING_MAX_TOOL_ROUNDS") {
            config.max_tool_rounds =
                raw.parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| ConfigError::InvalidValue {
                        key: "GROUNDING_MAX_TOOL_ROUNDS".to_string(),
                        message: format!("expected a positive integer, got '{}'", raw),
                    })?;
        }
        Ok(config)
    }
}

/// Bind address for the HTTP front ends.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl HttpConfig {
    /// Resolve `host:port`, accepting hostnames such as `localhost` as well
    /// as IP literals. The first resolved address wins.
    pub async fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: "HOST".to_string(),
            message,
        };
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| invalid(format!("cannot resolve '{}': {}", self.host, e)))?
            .next()
            .ok_or_else(|| invalid(format!("'{}' resolved to no addresses", self.host)))
    }
}

//! LLM integration for the agent.
//!
//! The orchestrator talks to the model through [`LlmProvider`]; the only
//! backend is the Gemini `generateContent` API, which also provides web
//! search grounding.

mod google;
mod provider;

pub use google::GoogleGeminiProvider;
pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, GroundingCitation,
    GroundingMetadata, LlmProvider, Role, ToolCall, ToolDefinition,
};

use std::sync::Arc;

use crate::config::GoogleConfig;
use crate::error::ConfigError;

/// Create the LLM provider from configuration.
pub fn create_llm_provider(config: &GoogleConfig) -> Result<Arc<dyn LlmProvider>, ConfigError> {
    tracing::info!(model = %config.model, "Using Google Gemini API");
    Ok(Arc::new(GoogleGeminiProvider::new(config.clone())?))
}

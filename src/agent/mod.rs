//! Core agent logic.
//!
//! [`GroundingAgent`] runs the grounding and refinement stages; front ends
//! receive it through an [`AgentHandle`] built once at startup.

mod grounding;
mod result;

pub use grounding::{GroundingAgent, refinement_prompt};
pub use result::{FinalResult, StageResult, ToolInvocation};

use std::sync::Arc;

use crate::config::{AgentConfig, GoogleConfig};
use crate::error::{AgentError, ConfigError};
use crate::tools::ToolRegistry;

/// Shared access to the agent, or the configuration error that prevented
/// building it.
///
/// Servers start even without credentials so that tool-only endpoints keep
/// working; operations that need the model report the stored error.
#[derive(Clone)]
pub enum AgentHandle {
    Ready(Arc<GroundingAgent>),
    Unavailable(ConfigError),
}

impl AgentHandle {
    /// Build the agent from environment-derived configuration.
    pub fn from_config(
        google: &GoogleConfig,
        config: AgentConfig,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        match GroundingAgent::from_config(google, config, tools) {
            Ok(agent) => Self::Ready(Arc::new(agent)),
            Err(e) => {
                tracing::warn!(error = %e, "Grounding agent unavailable");
                Self::Unavailable(e)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn get(&self) -> Result<&Arc<GroundingAgent>, ConfigError> {
        match self {
            Self::Ready(agent) => Ok(agent),
            Self::Unavailable(e) => Err(e.clone()),
        }
    }

    /// Run a query through the agent.
    pub async fn process_query(
        &self,
        query: &str,
        use_search_grounding: bool,
        skip_refinement: bool,
    ) -> Result<FinalResult, AgentError> {
        if query.trim().is_empty() {
            return Err(AgentError::EmptyQuery);
        }
        self.get()?
            .process_query(query, use_search_grounding, skip_refinement)
            .await
    }
}

impl From<GroundingAgent> for AgentHandle {
    fn from(agent: GroundingAgent) -> Self {
        Self::Ready(Arc::new(agent))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted model for pipeline and adapter tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::LlmError;
    use crate::llm::{CompletionRequest, CompletionResponse, LlmProvider};

    /// Replays canned responses in order and records every request.
    pub struct ScriptedLlm {
        responses: Mutex<VecDeque<Result<CompletionResponse, LlmError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedLlm {
        pub fn new(responses: Vec<Result<CompletionResponse, LlmError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, req: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(req);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(LlmError::InvalidResponse {
                        provider: "scripted".to_string(),
                        reason: "script exhausted".to_string(),
                    })
                })
        }
    }
}

//! The two-stage grounding pipeline.
//!
//! Stage 1 sends the query to the model with every registered tool declared
//! (plus web search when asked) and runs the function-calling loop until the
//! model answers in text. Stage 2 asks the model, without tools, to polish
//! that answer. A failed stage 1 skips stage 2; a failed stage 2 falls back
//! to the stage 1 text.

use std::sync::Arc;

use crate::agent::result::{FinalResult, StageResult, ToolInvocation};
use crate::config::{AgentConfig, GoogleConfig};
use crate::error::{AgentError, ConfigError, LlmError};
use crate::llm::{
    ChatMessage, CompletionRequest, GroundingMetadata, LlmProvider, create_llm_provider,
};
use crate::tools::ToolRegistry;

/// Maximum number of source titles included in the refinement prompt.
const MAX_PROMPT_SOURCES: usize = 3;

/// Orchestrates the grounding and refinement stages.
pub struct GroundingAgent {
    llm: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl GroundingAgent {
    pub fn new(llm: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        tracing::info!(
            model = llm.model_name(),
            tools = ?tools.names(),
            "Grounding agent initialized"
        );
        Self { llm, tools, config }
    }

    /// Build an agent backed by the Gemini API.
    pub fn from_config(
        google: &GoogleConfig,
        config: AgentConfig,
        tools: Arc<ToolRegistry>,
    ) -> Result<Self, ConfigError> {
        let llm = create_llm_provider(google)?;
        Ok(Self::new(llm, tools, config))
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Stage 1: tool-augmented generation. Never fails; errors are folded
    /// into the returned [`StageResult`].
    pub async fn grounding_stage(&self, query: &str, use_search_grounding: bool) -> StageResult {
        tracing::info!(search = use_search_grounding, "Stage 1: grounding with tools");

        match self.run_tool_loop(query, use_search_grounding).await {
            Ok(stage) => stage,
            Err(e) => {
                tracing::error!(error = %e, "Error in grounding stage");
                StageResult::failed(query, e.to_string())
            }
        }
    }

    async fn run_tool_loop(
        &self,
        query: &str,
        use_search_grounding: bool,
    ) -> Result<StageResult, LlmError> {
        let definitions = self.tools.definitions();
        let mut messages = vec![ChatMessage::user(query)];
        let mut function_calls = Vec::new();
        let mut grounding: Option<GroundingMetadata> = None;

        for round in 0..=self.config.max_tool_rounds {
            let request = CompletionRequest {
                messages: messages.clone(),
                tools: definitions.clone(),
                search_grounding: use_search_grounding,
                temperature: Some(self.config.grounding_temperature),
                max_tokens: None,
            };
            let response = self.llm.complete(request).await?;

            tracing::debug!(
                round,
                input_tokens = response.input_tokens,
                output_tokens = response.output_tokens,
                finish_reason = ?response.finish_reason,
                "grounding response"
            );

            if response.grounding.is_some() {
                grounding = response.grounding;
            }

            if response.tool_calls.is_empty() {
                let text = response.content.unwrap_or_default();
                if text.trim().is_empty() {
                    return Err(LlmError::InvalidResponse {
                        provider: self.llm.model_name().to_string(),
                        reason: "model returned no text".to_string(),
                    });
                }

                if let Some(meta) = &grounding {
                    if !meta.web_search_queries.is_empty() {
                        tracing::info!(queries = ?meta.web_search_queries, "Search queries");
                    }
                    if !meta.grounding_chunks.is_empty() {
                        tracing::info!(sources = meta.grounding_chunks.len(), "Sources found");
                    }
                }
                tracing::info!(chars = text.len(), "Grounded response generated");

                return Ok(StageResult {
                    query: query.to_string(),
                    grounded_response: text,
                    function_calls,
                    grounding_metadata: grounding,
                    error: None,
                });
            }

            if round == self.config.max_tool_rounds {
                break;
            }

            let calls = response.tool_calls;
            messages.push(ChatMessage::assistant_with_tool_calls(
                response.content,
                calls.clone(),
            ));

            for call in &calls {
                tracing::info!(tool = %call.name, args = %call.arguments, "Function call");
                let output = self
                    .tools
                    .invoke_by_name(&call.name, call.arguments.clone())
                    .await;
                function_calls.push(ToolInvocation::new(&call.name, &call.arguments));
                messages.push(ChatMessage::tool_result(call, output));
            }
        }

        Err(LlmError::ToolLoopExhausted {
            max_rounds: self.config.max_tool_rounds,
        })
    }

    /// Stage 2: polish the grounded answer. `None` when the call fails or
    /// produces no text.
    pub async fn refinement_stage(&self, stage: &StageResult) -> Option<String> {
        tracing::info!("Stage 2: refinement");

        let request = CompletionRequest::prompt(refinement_prompt(stage))
            .with_temperature(self.config.refinement_temperature);

        match self.llm.complete(request).await {
            Ok(response) => {
                let text = response.content.filter(|t| !t.trim().is_empty());
                match &text {
                    Some(t) => tracing::info!(chars = t.len(), "Refined response generated"),
                    None => tracing::warn!("Refinement returned no text"),
                }
                text
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error in refinement stage");
                None
            }
        }
    }

    /// Run both stages for a query.
    pub async fn process_query(
        &self,
        query: &str,
        use_search_grounding: bool,
        skip_refinement: bool,
    ) -> Result<FinalResult, AgentError> {
        if query.trim().is_empty() {
            return Err(AgentError::EmptyQuery);
        }

        tracing::info!(query, "Processing query");

        let stage = self.grounding_stage(query, use_search_grounding).await;

        let refined = if skip_refinement || stage.error.is_some() {
            None
        } else {
            self.refinement_stage(&stage).await
        };

        let result = FinalResult::from_stages(stage, refined);
        tracing::info!(
            success = result.is_success(),
            tools = result.function_calls.len(),
            sources = result.source_count(),
            "Processing complete"
        );
        Ok(result)
    }
}

/// Build the refinement prompt from a grounding result.
pub fn refinement_prompt(stage: &StageResult) -> String {
    let mut parts = vec![
        "You are a helpful assistant that refines and improves responses.".to_string(),
        format!("\nOriginal Query: {}", stage.query),
        format!("\nGrounded Response: {}", stage.grounded_response),
    ];

    if !stage.function_calls.is_empty() {
        parts.push("\nTools Used:".to_string());
        for call in &stage.function_calls {
            parts.push(format!("  - {}", call.name));
        }
    }

    let citations = stage.citations();
    if !citations.is_empty() {
        parts.push("\nSources:".to_string());
        for citation in citations.iter().take(MAX_PROMPT_SOURCES) {
            parts.push(format!("  - {}", citation.title));
        }
    }

    parts.push(
        "\nPlease refine this response to be:\n\
         1. Clear and well-structured\n\
         2. Concise but informative\n\
         3. Easy to understand\n\
         4. Properly formatted\n\n\
         Provide ONLY the refined response, without any meta-commentary."
            .to_string(),
    );

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::agent::testing::ScriptedLlm;
    use crate::llm::{CompletionResponse, GroundingCitation, Role, ToolCall};

    fn agent(llm: Arc<ScriptedLlm>) -> GroundingAgent {
        GroundingAgent::new(
            llm,
            Arc::new(ToolRegistry::builtin()),
            AgentConfig::default(),
        )
    }

    fn call(name: &str, args: serde_json::Value) -> ToolCall {
        ToolCall {
            id: None,
            name: name.to_string(),
            arguments: args,
            thought_signature: None,
        }
    }

    fn failure() -> LlmError {
        LlmError::RequestFailed {
            provider: "google".to_string(),
            reason: "connection reset".to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_query_makes_no_calls() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let agent = agent(llm.clone());

        for query in ["", "   \n\t"] {
            let err = agent.process_query(query, true, false).await.unwrap_err();
            assert!(err.is_validation());
        }
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_tool_loop_records_invocations() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok(CompletionResponse::tool_calls(vec![call(
                "calculator",
                serde_json::json!({"expression": "sqrt(144)"}),
            )])),
            Ok(CompletionResponse::text("The square root of 144 is 12.")),
            Ok(CompletionResponse::text("**12**")),
        ]));
        let agent = agent(llm.clone());

        let result = agent
            .process_query("What is the square root of 144?", false, false)
            .await
            .unwrap();

        assert_eq!(result.tools_used(), vec!["calculator"]);
        assert_eq!(result.function_calls[0].args["expression"], "sqrt(144)");
        assert_eq!(result.grounded_response, "The square root of 144 is 12.");
        assert_eq!(result.refined_response.as_deref(), Some("**12**"));
        assert_eq!(result.final_answer, "**12**");
        assert!(result.is_success());

        let requests = llm.requests();
        assert_eq!(requests.len(), 3);

        let second = &requests[1];
        assert_eq!(second.messages.len(), 3);
        assert_eq!(second.messages[2].role, Role::Tool);
        assert_eq!(second.messages[2].content, "Result: 12");
        assert_eq!(second.tools.len(), 6);
        assert_eq!(second.temperature, Some(0.7));

        let refinement = &requests[2];
        assert!(refinement.tools.is_empty());
        assert!(!refinement.search_grounding);
        assert_eq!(refinement.temperature, Some(0.3));
        assert!(refinement.messages[0].content.contains("Tools Used:\n  - calculator"));
    }

    #[tokio::test]
    async fn test_refinement_failure_falls_back() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok(CompletionResponse::text("grounded answer")),
            Err(failure()),
        ]));
        let result = agent(llm)
            .process_query("hello", false, false)
            .await
            .unwrap();

        assert_eq!(result.refined_response, None);
        assert_eq!(result.final_answer, result.grounded_response);
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_empty_refinement_falls_back() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok(CompletionResponse::text("grounded answer")),
            Ok(CompletionResponse::text("  ")),
        ]));
        let result = agent(llm)
            .process_query("hello", false, false)
            .await
            .unwrap();

        assert_eq!(result.refined_response, None);
        assert_eq!(result.final_answer, "grounded answer");
    }

    #[tokio::test]
    async fn test_skip_refinement() {
        let llm = Arc::new(ScriptedLlm::new(vec![Ok(CompletionResponse::text("only"))]));
        let result = agent(llm.clone())
            .process_query("hello", false, true)
            .await
            .unwrap();

        assert_eq!(llm.call_count(), 1);
        assert_eq!(result.refined_response, None);
        assert_eq!(result.final_answer, "only");
    }

    #[tokio::test]
    async fn test_grounding_failure_skips_refinement() {
        let llm = Arc::new(ScriptedLlm::new(vec![Err(failure())]));
        let result = agent(llm.clone())
            .process_query("hello", true, false)
            .await
            .unwrap();

        assert_eq!(llm.call_count(), 1);
        assert!(!result.is_success());
        assert_eq!(
            result.grounded_response,
            "Error: Request to google failed: connection reset"
        );
        assert_eq!(result.final_answer, result.grounded_response);
        assert!(result.function_calls.is_empty());
    }

    #[tokio::test]
    async fn test_search_grounding_metadata_captured() {
        let mut grounded = CompletionResponse::text("Paris.");
        grounded.grounding = Some(GroundingMetadata {
            web_search_queries: vec!["capital of france".to_string()],
            grounding_chunks: (1..=5)
                .map(|i| GroundingCitation {
                    title: format!("Source {}", i),
                    uri: format!("https://example.com/{}", i),
                })
                .collect(),
        });
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok(grounded),
            Ok(CompletionResponse::text("Paris is the capital of France.")),
        ]));

        let result = agent(llm.clone())
            .process_query("capital of france?", true, false)
            .await
            .unwrap();

        assert_eq!(result.source_count(), 5);
        let requests = llm.requests();
        assert!(requests[0].search_grounding);

        let prompt = &requests[1].messages[0].content;
        assert!(prompt.contains("  - Source 3"));
        assert!(!prompt.contains("  - Source 4"));
    }

    #[tokio::test]
    async fn test_tool_loop_is_bounded() {
        let looping = || {
            Ok(CompletionResponse::tool_calls(vec![call(
                "get_current_datetime",
                serde_json::json!({}),
            )]))
        };
        let llm = Arc::new(ScriptedLlm::new((0..3).map(|_| looping()).collect()));
        let agent = GroundingAgent::new(
            llm.clone(),
            Arc::new(ToolRegistry::builtin()),
            AgentConfig {
                max_tool_rounds: 2,
                ..AgentConfig::default()
            },
        );

        let stage = agent.grounding_stage("time?", false).await;
        assert_eq!(llm.call_count(), 3);
        assert_eq!(
            stage.error.as_deref(),
            Some("Tool loop exceeded 2 rounds without a final answer")
        );
    }

    #[test]
    fn test_refinement_prompt_layout() {
        let stage = StageResult {
            query: "q".to_string(),
            grounded_response: "a".to_string(),
            function_calls: vec![],
            grounding_metadata: None,
            error: None,
        };
        let prompt = refinement_prompt(&stage);
        assert!(prompt.starts_with(
            "You are a helpful assistant that refines and improves responses.\n\nOriginal Query: q\n\nGrounded Response: a\n\nPlease refine"
        ));
        assert!(prompt.ends_with("without any meta-commentary."));
        assert!(!prompt.contains("Tools Used"));
        assert!(!prompt.contains("Sources"));
    }
}

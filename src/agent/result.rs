//! Results produced by the two pipeline stages.

use serde::{Deserialize, Serialize};

use crate::llm::{GroundingCitation, GroundingMetadata};

/// A tool call the model made during grounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub args: serde_json::Map<String, serde_json::Value>,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, arguments: &serde_json::Value) -> Self {
        Self {
            name: name.into(),
            args: arguments.as_object().cloned().unwrap_or_default(),
        }
    }
}

/// Output of the grounding stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub query: String,
    pub grounded_response: String,
    pub function_calls: Vec<ToolInvocation>,
    pub grounding_metadata: Option<GroundingMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageResult {
    /// A failed grounding stage.
    pub fn failed(query: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            query: query.into(),
            grounded_response: format!("Error: {}", message),
            function_calls: Vec::new(),
            grounding_metadata: None,
            error: Some(message),
        }
    }

    /// Cited sources, if search grounding produced any.
    pub fn citations(&self) -> &[GroundingCitation] {
        self.grounding_metadata
            .as_ref()
            .map(|m| m.grounding_chunks.as_slice())
            .unwrap_or_default()
    }
}

/// Combined output of both stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    pub query: String,
    pub grounded_response: String,
    pub refined_response: Option<String>,
    pub function_calls: Vec<ToolInvocation>,
    pub grounding_metadata: Option<GroundingMetadata>,
    pub final_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FinalResult {
    /// Assemble the result; the final answer is the refined text when there is
    /// one, otherwise the grounded text.
    pub fn from_stages(stage: StageResult, refined_response: Option<String>) -> Self {
        let final_answer = refined_response
            .clone()
            .unwrap_or_else(|| stage.grounded_response.clone());

        Self {
            query: stage.query,
            grounded_response: stage.grounded_response,
            refined_response,
            function_calls: stage.function_calls,
            grounding_metadata: stage.grounding_metadata,
            final_answer,
            error: stage.error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Names of the tools called, in call order.
    pub fn tools_used(&self) -> Vec<String> {
        self.function_calls.iter().map(|c| c.name.clone()).collect()
    }

    /// Number of web sources cited.
    pub fn source_count(&self) -> usize {
        self.grounding_metadata
            .as_ref()
            .map(|m| m.grounding_chunks.len())
            .unwrap_or(0)
    }

    /// Plain-text rendering: the answer, then the tools used and the number of
    /// sources when there are any.
    pub fn render_summary(&self) -> String {
        let mut out = self.final_answer.clone();

        let tools = self.tools_used();
        if !tools.is_empty() {
            out.push_str(&format!("\n\nTools used: {}", tools.join(", ")));
        }

        let sources = self.source_count();
        if sources > 0 {
            out.push_str(&format!("\n\nSources: {} web pages", sources));
        }

        out
    }
}

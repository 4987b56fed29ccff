//! Google Gemini provider using the native `generateContent` REST API.
//!
//! The native endpoint (rather than the OpenAI-compatible one) is needed for
//! the `googleSearch` tool and the grounding metadata it returns.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::GoogleConfig;
use crate::error::{ConfigError, LlmError};
use crate::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, GroundingCitation,
    GroundingMetadata, LlmProvider, Role, ToolCall,
};

const PROVIDER: &str = "google";

/// Google Gemini provider.
pub struct GoogleGeminiProvider {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl GoogleGeminiProvider {
    /// Create a new Gemini provider with API key auth.
    pub fn new(config: GoogleConfig) -> Result<Self, ConfigError> {
        let api_key = config.require_api_key()?.clone();

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self {
            client,
            api_key,
            model: config.model,
            base_url: config.base_url,
        })
    }

    fn api_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    async fn send_request(
        &self,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, LlmError> {
        let url = self.api_url();

        tracing::debug!("Sending request to Google Gemini: {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Google Gemini request failed: {}", e);
                LlmError::RequestFailed {
                    provider: PROVIDER.to_string(),
                    reason: e.to_string(),
                }
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let response_text = response.text().await.unwrap_or_default();

        tracing::debug!("Google Gemini response status: {}", status);
        tracing::trace!("Google Gemini response body: {}", response_text);

        if !status.is_success() {
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(LlmError::AuthFailed {
                    provider: PROVIDER.to_string(),
                });
            }
            if status.as_u16() == 429 {
                let retry_after = headers
                    .get("retry-after")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(Duration::from_secs);

                return Err(LlmError::RateLimited {
                    provider: PROVIDER.to_string(),
                    retry_after,
                });
            }
            return Err(LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("HTTP {}: {}", status, response_text),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: format!("JSON parse error: {}. Raw: {}", e, response_text),
        })
    }
}

#[async_trait]
impl LlmProvider for GoogleGeminiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, req: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let request = build_request(req);
        let response = self.send_request(&request).await?;
        parse_response(response)
    }
}

fn build_request(req: CompletionRequest) -> GenerateContentRequest {
    let mut tools = Vec::new();
    if !req.tools.is_empty() {
        tools.push(GeminiTool {
            function_declarations: Some(
                req.tools
                    .into_iter()
                    .map(|t| FunctionDeclaration {
                        name: t.name,
                        description: t.description,
                        parameters: t.parameters,
                    })
                    .collect(),
            ),
            google_search: None,
        });
    }
    if req.search_grounding {
        tools.push(GeminiTool {
            function_declarations: None,
            google_search: Some(serde_json::json!({})),
        });
    }

    let generation_config = if req.temperature.is_some() || req.max_tokens.is_some() {
        Some(GenerationConfig {
            temperature: req.temperature,
            max_output_tokens: req.max_tokens,
        })
    } else {
        None
    };

    GenerateContentRequest {
        contents: to_contents(req.messages),
        tools,
        generation_config,
    }
}

/// Convert chat messages into Gemini contents.
///
/// Consecutive messages that map to the same role are merged, so all tool
/// results answering one model turn travel in a single `user` content.
fn to_contents(messages: Vec<ChatMessage>) -> Vec<Content> {
    let mut contents: Vec<Content> = Vec::new();

    for msg in messages {
        let (role, parts) = match msg.role {
            Role::User => ("user", vec![Part::text(msg.content)]),
            Role::Assistant => {
                let mut parts = Vec::new();
                if !msg.content.is_empty() {
                    parts.push(Part::text(msg.content));
                }
                for call in msg.tool_calls.unwrap_or_default() {
                    parts.push(Part {
                        function_call: Some(FunctionCall {
                            id: call.id,
                            name: call.name,
                            args: call.arguments,
                        }),
                        thought_signature: call.thought_signature,
                        ..Part::default()
                    });
                }
                ("model", parts)
            }
            Role::Tool => (
                "user",
                vec![Part {
                    function_response: Some(FunctionResponse {
                        id: msg.tool_call_id,
                        name: msg.name.unwrap_or_default(),
                        response: serde_json::json!({ "result": msg.content }),
                    }),
                    ..Part::default()
                }],
            ),
        };

        match contents.last_mut() {
            Some(last) if last.role == role => last.parts.extend(parts),
            _ => contents.push(Content {
                role: role.to_string(),
                parts,
            }),
        }
    }

    contents
}

fn parse_response(response: GenerateContentResponse) -> Result<CompletionResponse, LlmError> {
    let usage = response.usage_metadata.unwrap_or_default();
    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        let reason = match response.prompt_feedback.and_then(|f| f.block_reason) {
            Some(block) => format!("No candidates in response (prompt blocked: {})", block),
            None => "No candidates in response".to_string(),
        };
        LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason,
        }
    })?;

    let mut text = String::new();
    let mut tool_calls = Vec::new();
    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if part.thought == Some(true) {
            continue;
        }
        if let Some(t) = part.text {
            text.push_str(&t);
        }
        if let Some(call) = part.function_call {
            tool_calls.push(ToolCall {
                id: call.id,
                name: call.name,
                arguments: call.args,
                thought_signature: part.thought_signature,
            });
        }
    }

    let grounding = candidate.grounding_metadata.map(|meta| GroundingMetadata {
        web_search_queries: meta.web_search_queries,
        grounding_chunks: meta
            .grounding_chunks
            .into_iter()
            .filter_map(|chunk| chunk.web)
            .map(|web| GroundingCitation {
                title: web.title.unwrap_or_else(|| "N/A".to_string()),
                uri: web.uri.unwrap_or_else(|| "N/A".to_string()),
            })
            .collect(),
    });

    let finish_reason = match candidate.finish_reason.as_deref() {
        _ if !tool_calls.is_empty() => FinishReason::ToolUse,
        Some("STOP") => FinishReason::Stop,
        Some("MAX_TOKENS") => FinishReason::Length,
        Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT") => {
            FinishReason::ContentFilter
        }
        _ => FinishReason::Unknown,
    };

    Ok(CompletionResponse {
        content: if text.is_empty() { None } else { Some(text) },
        tool_calls,
        grounding,
        finish_reason,
        input_tokens: usage.prompt_token_count,
        output_tokens: usage.candidates_token_count,
    })
}

// Gemini generateContent wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

impl Part {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    #[serde(skip_serializing_if = "Option::is_none")]
    function_declarations: Option<Vec<FunctionDeclaration>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    google_search: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
    grounding_metadata: Option<WireGroundingMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireGroundingMetadata {
    #[serde(default)]
    web_search_queries: Vec<String>,
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

//! Web page fetch tool.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

use crate::tools::tool::{Tool, ToolError, optional_str, require_str};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Characters kept by the `text` extraction.
const PREVIEW_CHARS: usize = 500;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<title>(.*?)</title>").expect("valid title regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extract {
    Text,
    Title,
    Metadata,
}

impl Extract {
    fn parse(raw: &str) -> Result<Self, ToolError> {
        match raw {
            "text" => Ok(Extract::Text),
            "title" => Ok(Extract::Title),
            "metadata" => Ok(Extract::Metadata),
            other => Err(ToolError::UnsupportedExtraction(other.to_string())),
        }
    }
}

#[derive(Debug, Serialize)]
struct PageMetadata {
    url: String,
    status_code: u16,
    content_type: String,
    content_length: usize,
    encoding: Option<String>,
}

/// Tool that fetches a single page over HTTP GET.
pub struct WebScraperTool {
    client: Client,
}

impl WebScraperTool {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }

    async fn fetch(&self, url: &str, extract: Extract) -> Result<String, ToolError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ToolError::Fetch(e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ToolError::Fetch(e.to_string()))?;
        let body = String::from_utf8_lossy(&bytes);

        tracing::debug!(url, status, bytes = bytes.len(), "fetched page");

        Ok(match extract {
            Extract::Text => format!("Preview of webpage content:\n{}...", preview(&body)),
            Extract::Title => format!("Page title: {}", extract_title(&body)),
            Extract::Metadata => {
                let encoding = content_type.as_deref().and_then(charset);
                let meta = PageMetadata {
                    url: url.to_string(),
                    status_code: status,
                    content_type: content_type.unwrap_or_else(|| "unknown".to_string()),
                    content_length: bytes.len(),
                    encoding,
                };
                serde_json::to_string_pretty(&meta)
                    .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?
            }
        })
    }
}

impl Default for WebScraperTool {
    fn default() -> Self {
        Self::new()
    }
}

fn preview(body: &str) -> String {
    body.chars().take(PREVIEW_CHARS).collect()
}

fn extract_title(body: &str) -> String {
    TITLE_RE
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "No title found".to_string())
}

/// Pull the `charset=` parameter out of a Content-Type header value.
fn charset(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}

#[async_trait]
impl Tool for WebScraperTool {
    fn name(&self) -> &str {
        "web_scraper"
    }

    fn description(&self) -> &str {
        "Fetches content from a URL and extracts information (text preview, title, or metadata)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to fetch"
                },
                "extract": {
                    "type": "string",
                    "enum": ["text", "title", "metadata"],
                    "description": "What to extract (default: text)"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<String, ToolError> {
        let url = require_str(&params, "url")?;
        let extract = Extract::parse(optional_str(&params, "extract", "text"))?;
        self.fetch(url, extract).await
    }
}

//! Text analysis tool: word counts, a naive summary, keyword sentiment.

use async_trait::async_trait;
use serde::Serialize;

use crate::tools::tool::{Tool, ToolError, optional_str, require_str};

const POSITIVE_WORDS: [&str; 7] = [
    "good",
    "great",
    "excellent",
    "happy",
    "love",
    "wonderful",
    "amazing",
];

const NEGATIVE_WORDS: [&str; 7] = [
    "bad", "terrible", "awful", "hate", "poor", "worst", "horrible",
];

/// Words kept by the `summary` analysis.
const SUMMARY_WORDS: usize = 100;

#[derive(Debug, Serialize)]
struct WordCount {
    words: usize,
    characters: usize,
    sentences: usize,
    avg_word_length: f64,
}

#[derive(Debug, Serialize)]
struct Sentiment {
    sentiment: &'static str,
    positive_indicators: usize,
    negative_indicators: usize,
}

fn to_json<T: Serialize>(value: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value).map_err(|e| ToolError::ExecutionFailed(e.to_string()))
}

fn word_count(text: &str) -> WordCount {
    let words = text.split_whitespace().count();
    let characters = text.chars().count();
    let sentences = text.chars().filter(|c| matches!(c, '.' | '!' | '?')).count();
    let avg = characters as f64 / words.max(1) as f64;

    WordCount {
        words,
        characters,
        sentences: sentences.max(1),
        avg_word_length: (avg * 100.0).round() / 100.0,
    }
}

fn summary(text: &str) -> String {
    let head: Vec<&str> = text.split_whitespace().take(SUMMARY_WORDS).collect();
    format!("Summary (first {} words):\n{}...", SUMMARY_WORDS, head.join(" "))
}

/// Counts keywords present in the text, not their occurrences.
fn sentiment(text: &str) -> Sentiment {
    let lowered = text.to_lowercase();
    let positive = POSITIVE_WORDS.iter().filter(|w| lowered.contains(*w)).count();
    let negative = NEGATIVE_WORDS.iter().filter(|w| lowered.contains(*w)).count();

    let label = match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => "Positive",
        std::cmp::Ordering::Less => "Negative",
        std::cmp::Ordering::Equal => "Neutral",
    };

    Sentiment {
        sentiment: label,
        positive_indicators: positive,
        negative_indicators: negative,
    }
}

/// Run one analysis over `text`.
pub fn analyze(text: &str, analysis_type: &str) -> Result<String, ToolError> {
    match analysis_type {
        "word_count" => to_json(&word_count(text)),
        "summary" => Ok(summary(text)),
        "sentiment" => to_json(&sentiment(text)),
        other => Err(ToolError::UnsupportedAnalysis(other.to_string())),
    }
}

/// Tool exposing [`analyze`].
pub struct TextAnalyzerTool;

#[async_trait]
impl Tool for TextAnalyzerTool {
    fn name(&self) -> &str {
        "text_analyzer"
    }

    fn description(&self) -> &str {
        "Analyzes text and provides insights (word count, summary, or sentiment)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "The text to analyze"
                },
                "analysis_type": {
                    "type": "string",
                    "enum": ["summary", "word_count", "sentiment"],
                    "description": "Kind of analysis (default: summary)"
                }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<String, ToolError> {
        let text = require_str(&params, "text")?;
        let analysis_type = optional_str(&params, "analysis_type", "summary");
        analyze(text, analysis_type)
    }
}

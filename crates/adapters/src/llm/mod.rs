//! LLM provider adapters

pub mod gemini;
pub mod openai;
pub mod stub;

pub use gemini::GeminiClassifier;
pub use openai::OpenAiClassifier;
pub use stub::StubClassifier;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use spam_shield_domain::{ClassificationError, Verdict, VerdictSchema};
use std::time::Duration;

/// Common LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name/ID
    pub model: String,
    /// Sampling temperature, provider default when unset
    pub temperature: Option<f64>,
    /// Maximum output tokens
    pub max_output_tokens: u32,
    /// Request timeout in seconds (0 = no client-side timeout)
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-3-flash-preview".to_string(),
            temperature: None,
            max_output_tokens: 1024,
            timeout_secs: 45,
        }
    }
}

/// System instruction shared by every provider
pub const SYSTEM_INSTRUCTION: &str =
    "You are an email security analyst. Output only JSON matching the provided schema.";

/// Build the classification prompt
pub fn build_classification_prompt(content: &str) -> String {
    format!(
        "Classify the following email text as SPAM, PHISHING, or LEGITIMATE. \
         Provide a detailed breakdown of its features.\n\nEmail Content:\n{}",
        content
    )
}

/// Parse and validate the model's JSON text
pub fn parse_verdict_response(response: &str) -> Result<Verdict, ClassificationError> {
    // Some models wrap structured output in markdown code blocks anyway
    VerdictSchema::parse(extract_json(response))
}

pub(crate) fn build_http_client(timeout_secs: u64) -> reqwest::Result<Client> {
    let mut builder = Client::builder();
    if timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(timeout_secs));
    }
    builder.build()
}

/// Map a transport failure to the error taxonomy
pub(crate) fn transport_error(error: reqwest::Error) -> ClassificationError {
    if error.is_timeout() {
        ClassificationError::Unreachable(format!("request timed out: {}", error))
    } else {
        ClassificationError::Unreachable(error.to_string())
    }
}

/// Map a non-success status to the error taxonomy
pub(crate) fn status_error(status: StatusCode, body: &str) -> ClassificationError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        ClassificationError::Unreachable(format!(
            "authentication rejected ({}), check the API key",
            status
        ))
    } else {
        ClassificationError::Unreachable(format!(
            "API returned {}: {}",
            status,
            truncate_body(body)
        ))
    }
}

const MAX_ERROR_BODY_CHARS: usize = 200;

fn truncate_body(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// Extract JSON from response (handles markdown code blocks)
fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    // Raw JSON wins, even when its strings quote a code fence
    if serde_json::from_str::<serde::de::IgnoredAny>(trimmed).is_ok() {
        return trimmed;
    }

    // Check for ```json ... ``` blocks
    if let Some(start) = trimmed.find("```json") {
        if let Some(end) = trimmed[start + 7..].find("```") {
            return trimmed[start + 7..start + 7 + end].trim();
        }
    }

    // Check for ``` ... ``` blocks
    if let Some(start) = trimmed.find("```") {
        if let Some(end) = trimmed[start + 3..].find("```") {
            let content = trimmed[start + 3..start + 3 + end].trim();
            // Skip language identifier if present
            if let Some(newline) = content.find('\n') {
                let first_line = &content[..newline];
                if !first_line.starts_with('{') {
                    return content[newline + 1..].trim();
                }
            }
            return content;
        }
    }

    // Assume raw JSON
    trimmed
}

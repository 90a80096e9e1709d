//! OpenAI Responses API adapter

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spam_shield_domain::{
    ClassificationError, ClassificationRecord, Classifier, Clock, SchemaDialect, SystemClock,
    VerdictSchema,
};
use std::sync::Arc;

use super::{
    LlmConfig, SYSTEM_INSTRUCTION, build_classification_prompt, build_http_client,
    parse_verdict_response, status_error, transport_error,
};

/// Default OpenAI REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI classifier using the Responses API with strict structured output
pub struct OpenAiClassifier {
    client: Client,
    api_key: SecretString,
    base_url: String,
    config: LlmConfig,
    clock: Arc<dyn Clock>,
}

impl OpenAiClassifier {
    pub fn new(api_key: SecretString, config: LlmConfig) -> reqwest::Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string(), config)
    }

    pub fn with_base_url(
        api_key: SecretString,
        base_url: String,
        config: LlmConfig,
    ) -> reqwest::Result<Self> {
        let client = build_http_client(config.timeout_secs)?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn call_api(&self, prompt: &str) -> Result<String, ClassificationError> {
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(ClassificationError::Unreachable(
                "no API key configured for openai".to_string(),
            ));
        }

        let request = OpenAiRequest {
            model: self.config.model.clone(),
            input: prompt.to_string(),
            instructions: Some(SYSTEM_INSTRUCTION.to_string()),
            temperature: self.config.temperature,
            max_output_tokens: Some(self.config.max_output_tokens),
            text: TextConfig {
                format: TextFormat {
                    r#type: "json_schema".to_string(),
                    name: "email_verdict".to_string(),
                    schema: VerdictSchema::response_schema(SchemaDialect::JsonSchema),
                    strict: true,
                },
            },
        };

        let url = format!("{}/responses", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body = response.text().await.map_err(transport_error)?;
        let api_response: OpenAiResponse = serde_json::from_str(&body).map_err(|e| {
            ClassificationError::MalformedResponse(format!("unexpected response envelope: {}", e))
        })?;

        // Extract text from response
        let text = api_response
            .output
            .into_iter()
            .filter(|item| item.r#type == "message")
            .flat_map(|item| item.content)
            .filter(|c| c.r#type == "output_text")
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(ClassificationError::MalformedResponse(
                "Empty response".to_string(),
            ));
        }

        Ok(text)
    }
}

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    text: TextConfig,
}

#[derive(Serialize)]
struct TextConfig {
    format: TextFormat,
}

#[derive(Serialize)]
struct TextFormat {
    r#type: String,
    name: String,
    schema: Value,
    strict: bool,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Deserialize)]
struct OutputItem {
    r#type: String,
    #[serde(default)]
    content: Vec<ContentItem>,
}

#[derive(Deserialize)]
struct ContentItem {
    r#type: String,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn classify(&self, text: &str) -> Result<ClassificationRecord, ClassificationError> {
        let prompt = build_classification_prompt(text);

        tracing::debug!(model = %self.config.model, text_length = text.len(), "Calling OpenAI");

        let response_text = self.call_api(&prompt).await?;
        let verdict = parse_verdict_response(&response_text).inspect_err(|e| {
            tracing::warn!(kind = %e.kind(), error = %e, "Rejected OpenAI response");
        })?;

        Ok(ClassificationRecord::from_verdict(
            text.to_string(),
            verdict,
            self.clock.now(),
        ))
    }
}

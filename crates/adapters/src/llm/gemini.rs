//! Google Gemini API adapter

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

/// Default Gemini REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini classifier using `generateContent` with a response schema
pub struct GeminiClassifier {
    client: Client,
    api_key: SecretString,
    base_url: String,
    config: LlmConfig,
    clock: Arc<dyn Clock>,
}

impl GeminiClassifier {
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

    /// Use a specific clock for record timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn build_request(&self, prompt: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: VerdictSchema::response_schema(SchemaDialect::Gemini),
                temperature: self.config.temperature,
                max_output_tokens: Some(self.config.max_output_tokens),
            },
            system_instruction: Some(SystemInstruction {
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            }),
        }
    }

    async fn call_api(&self, prompt: &str) -> Result<String, ClassificationError> {
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(ClassificationError::Unreachable(
                "no API key configured for gemini".to_string(),
            ));
        }

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.config.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .header("Content-Type", "application/json")
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body = response.text().await.map_err(transport_error)?;
        let api_response: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            ClassificationError::MalformedResponse(format!("unexpected response envelope: {}", e))
        })?;

        let text = api_response
            .candidates
            .into_iter()
            .flat_map(|c| c.content.map(|content| content.parts).unwrap_or_default())
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            let reason = api_response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .map(|r| format!("prompt blocked: {}", r))
                .unwrap_or_else(|| "empty response".to_string());
            return Err(ClassificationError::MalformedResponse(reason));
        }

        Ok(text)
    }
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none", rename = "systemInstruction")]
    system_instruction: Option<SystemInstruction>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[async_trait]
impl Classifier for GeminiClassifier {
    async fn classify(&self, text: &str) -> Result<ClassificationRecord, ClassificationError> {
        let prompt = build_classification_prompt(text);

        tracing::debug!(model = %self.config.model, text_length = text.len(), "Calling Gemini");

        let response_text = self.call_api(&prompt).await?;
        let verdict = parse_verdict_response(&response_text).inspect_err(|e| {
            tracing::warn!(kind = %e.kind(), error = %e, "Rejected Gemini response");
        })?;

        Ok(ClassificationRecord::from_verdict(
            text.to_string(),
            verdict,
            self.clock.now(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::test_support::{SPAM_EMAIL, SPAM_VERDICT_JSON};
    use spam_shield_domain::{ClassificationKind, FixedClock};
    use time::OffsetDateTime;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_PATH: &str = "/models/gemini-3-flash-preview:generateContent";

    fn envelope(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [
                {
                    "content": {
                        "role": "model",
                        "parts": [{ "text": text }]
                    },
                    "finishReason": "STOP"
                }
            ]
        })
    }

    fn classifier(server: &MockServer) -> GeminiClassifier {
        GeminiClassifier::with_base_url(
            SecretString::new("test-key".into()),
            server.uri(),
            LlmConfig::default(),
        )
        .unwrap()
    }

    async fn mount(server: &MockServer, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(response)
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_classify_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": {
                    "responseMimeType": "application/json",
                    "responseSchema": {
                        "required": ["classification", "confidence", "reasoning", "features"]
                    }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(SPAM_VERDICT_JSON)))
            .expect(1)
            .mount(&server)
            .await;

        let clock = FixedClock(OffsetDateTime::UNIX_EPOCH);
        let record = classifier(&server)
            .with_clock(Arc::new(clock))
            .classify(SPAM_EMAIL)
            .await
            .unwrap();

        assert_eq!(record.content, SPAM_EMAIL);
        assert_eq!(record.timestamp, OffsetDateTime::UNIX_EPOCH);
        assert_eq!(record.classification, ClassificationKind::Spam);
        assert_eq!(record.confidence, 0.97);
        assert_eq!(record.reasoning, vec!["Urgent tone", "Suspicious shortened link"]);
        assert_eq!(record.features.urgency_level, 9);
        assert!(record.features.suspicious_links);
    }

    #[tokio::test]
    async fn test_prompt_carries_email_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(body_partial_json(serde_json::json!({
                "contents": [{
                    "role": "user",
                    "parts": [{ "text": build_classification_prompt(SPAM_EMAIL) }]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(SPAM_VERDICT_JSON)))
            .expect(1)
            .mount(&server)
            .await;

        assert!(classifier(&server).classify(SPAM_EMAIL).await.is_ok());
    }

    #[tokio::test]
    async fn test_server_error_is_unreachable_without_retry() {
        let server = MockServer::start().await;
        mount(
            &server,
            ResponseTemplate::new(500).set_body_string("Internal error"),
        )
        .await;

        let err = classifier(&server).classify(SPAM_EMAIL).await.unwrap_err();

        assert!(matches!(err, ClassificationError::Unreachable(ref m) if m.contains("500")));
    }

    #[tokio::test]
    async fn test_rejected_key_is_unreachable() {
        let server = MockServer::start().await;
        mount(&server, ResponseTemplate::new(403)).await;

        let err = classifier(&server).classify(SPAM_EMAIL).await.unwrap_err();

        assert!(matches!(err, ClassificationError::Unreachable(ref m) if m.contains("authentication")));
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let classifier = GeminiClassifier::with_base_url(
            SecretString::new("  ".into()),
            server.uri(),
            LlmConfig::default(),
        )
        .unwrap();
        let err = classifier.classify(SPAM_EMAIL).await.unwrap_err();

        assert!(matches!(err, ClassificationError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let classifier = GeminiClassifier::with_base_url(
            SecretString::new("test-key".into()),
            uri,
            LlmConfig::default(),
        )
        .unwrap();
        let err = classifier.classify(SPAM_EMAIL).await.unwrap_err();

        assert!(matches!(err, ClassificationError::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let server = MockServer::start().await;
        mount(
            &server,
            ResponseTemplate::new(200).set_body_string("<html>oops</html>"),
        )
        .await;

        let err = classifier(&server).classify(SPAM_EMAIL).await.unwrap_err();

        assert!(matches!(err, ClassificationError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_non_json_model_text_is_malformed() {
        let server = MockServer::start().await;
        mount(
            &server,
            ResponseTemplate::new(200).set_body_json(envelope("This looks like spam to me.")),
        )
        .await;

        let err = classifier(&server).classify(SPAM_EMAIL).await.unwrap_err();

        assert!(matches!(err, ClassificationError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_blocked_prompt_is_malformed() {
        let server = MockServer::start().await;
        mount(
            &server,
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })),
        )
        .await;

        let err = classifier(&server).classify(SPAM_EMAIL).await.unwrap_err();

        assert!(matches!(err, ClassificationError::MalformedResponse(ref m) if m.contains("SAFETY")));
    }

    #[tokio::test]
    async fn test_unknown_classification_is_invalid_schema() {
        let server = MockServer::start().await;
        let payload = SPAM_VERDICT_JSON.replace("\"SPAM\"", "\"SCAM\"");
        mount(
            &server,
            ResponseTemplate::new(200).set_body_json(envelope(&payload)),
        )
        .await;

        let err = classifier(&server).classify(SPAM_EMAIL).await.unwrap_err();

        assert!(matches!(err, ClassificationError::InvalidSchema(_)));
    }

    #[tokio::test]
    async fn test_out_of_range_feature_is_invalid_schema() {
        let server = MockServer::start().await;
        let payload = SPAM_VERDICT_JSON.replace("\"urgencyLevel\":9", "\"urgencyLevel\":14");
        mount(
            &server,
            ResponseTemplate::new(200).set_body_json(envelope(&payload)),
        )
        .await;

        let err = classifier(&server).classify(SPAM_EMAIL).await.unwrap_err();

        assert!(matches!(err, ClassificationError::InvalidSchema(_)));
    }
}

//! Client for an OpenAI-compatible chat completion endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::parser::parse_record;
use super::prompt::{instruction, response_schema, SCHEMA_NAME};
use super::{Extractor, Result};
use crate::error::ExtractionError;
use crate::models::config::{ExtractionConfig, ServiceConfig};
use crate::models::payload::{NormalizedPayload, PayloadContent};
use crate::models::record::ExtractionRecord;

/// Chat completion request.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseFormat {
    JsonSchema { json_schema: JsonSchema },
}

#[derive(Debug, Serialize)]
struct JsonSchema {
    name: String,
    strict: bool,
    schema: Value,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: Vec<Content>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Content {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
    detail: String,
}

/// Chat completion response.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// Extraction backend talking to a remote model over HTTP.
pub struct ExtractionClient {
    http: reqwest::Client,
    api_key: String,
    service: ServiceConfig,
    extraction: ExtractionConfig,
}

impl ExtractionClient {
    /// Create a client, reading the API key from the configured variable.
    pub fn new(service: ServiceConfig, extraction: ExtractionConfig) -> Result<Self> {
        let api_key = service
            .api_key()
            .ok_or_else(|| ExtractionError::MissingApiKey(service.api_key_env.clone()))?;
        Self::with_api_key(service, extraction, api_key)
    }

    /// Create a client with an explicit API key.
    pub fn with_api_key(
        service: ServiceConfig,
        extraction: ExtractionConfig,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(service.timeout_secs.min(30)))
            .timeout(Duration::from_secs(service.timeout_secs))
            .user_agent(concat!("invex/", env!("CARGO_PKG_VERSION")))
            .build()?;

        info!("Extraction client: model {} at {}", service.model, service.base_url);
        Ok(Self {
            http,
            api_key: api_key.into(),
            service,
            extraction,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.service.base_url.trim_end_matches('/'))
    }

    fn build_request(&self, payload: &NormalizedPayload) -> ChatRequest {
        let request_registration = self.extraction.request_registration_number;

        let content = match &payload.content {
            PayloadContent::Image { .. } => vec![
                Content::Text {
                    text: "Extract the fields from this document image.".to_string(),
                },
                Content::ImageUrl {
                    image_url: ImageUrl {
                        url: payload.data_url().unwrap_or_default(),
                        detail: self.service.image_detail.clone(),
                    },
                },
            ],
            PayloadContent::Text { text } => vec![Content::Text {
                text: format!("Extract the fields from this document text.\n\n{}", text),
            }],
        };

        let response_format = self.extraction.structured_output.then(|| ResponseFormat::JsonSchema {
            json_schema: JsonSchema {
                name: SCHEMA_NAME.to_string(),
                strict: true,
                schema: response_schema(request_registration),
            },
        });

        ChatRequest {
            model: self.service.model.clone(),
            messages: vec![
                Message {
                    role: "system",
                    content: vec![Content::Text {
                        text: instruction(request_registration),
                    }],
                },
                Message { role: "user", content },
            ],
            max_tokens: self.service.max_tokens,
            temperature: 0.0,
            response_format,
        }
    }

    /// Send one payload and return the assistant's message text.
    async fn complete(&self, payload: &NormalizedPayload) -> Result<String> {
        let request = self.build_request(payload);
        debug!("POST {} for {}", self.endpoint(), payload.label());

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("{}: service returned {}: {}", payload.label(), status, body);
            return Err(ExtractionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let envelope: ChatResponse = serde_json::from_str(&body).inspect_err(|e| {
            warn!("{}: malformed response envelope ({}): {}", payload.label(), e, body);
        })?;

        let message = envelope
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or(ExtractionError::EmptyResponse)?;

        if let Some(refusal) = message.refusal.as_deref().filter(|r| !r.is_empty()) {
            warn!("{}: model refused: {}", payload.label(), refusal);
        }

        message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or(ExtractionError::EmptyResponse)
    }
}

impl Extractor for ExtractionClient {
    async fn extract(&self, payload: &NormalizedPayload) -> Result<ExtractionRecord> {
        let content = self.complete(payload).await?;
        debug!("{}: response {}", payload.label(), content);
        parse_record(&content, &self.extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn client(structured: bool, registration: bool) -> ExtractionClient {
        let extraction = ExtractionConfig {
            structured_output: structured,
            request_registration_number: registration,
            ..Default::default()
        };
        ExtractionClient::with_api_key(ServiceConfig::default(), extraction, "sk-test").unwrap()
    }

    #[test]
    fn test_image_request_shape() {
        let payload = NormalizedPayload::image("scan.png", None, "image/png", b"\x89PNG");
        let request = serde_json::to_value(client(true, true).build_request(&payload)).unwrap();

        assert_eq!(request["model"], "gpt-4o-2024-08-06");
        assert_eq!(request["max_tokens"], 2000);
        assert_eq!(request["messages"][0]["role"], "system");
        let image = &request["messages"][1]["content"][1];
        assert_eq!(image["type"], "image_url");
        assert_eq!(image["image_url"]["detail"], "high");
        assert!(image["image_url"]["url"].as_str().unwrap().starts_with("data:image/png;base64,"));
        assert_eq!(request["response_format"]["type"], "json_schema");
        assert_eq!(request["response_format"]["json_schema"]["strict"], true);
    }

    #[test]
    fn test_text_request_without_schema() {
        let payload = NormalizedPayload::text("book.xlsx", None, "合計 1,000");
        let request = serde_json::to_value(client(false, false).build_request(&payload)).unwrap();

        assert!(request.get("response_format").is_none());
        let content = &request["messages"][1]["content"];
        assert_eq!(content.as_array().unwrap().len(), 1);
        assert!(content[0]["text"].as_str().unwrap().ends_with("合計 1,000"));
    }

    #[test]
    fn test_missing_api_key() {
        let service = ServiceConfig {
            api_key_env: "INVEX_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ExtractionClient::new(service, ExtractionConfig::default()),
            Err(ExtractionError::MissingApiKey(_))
        ));
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let service = ServiceConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..Default::default()
        };
        let client = ExtractionClient::with_api_key(service, ExtractionConfig::default(), "k").unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
    }
}

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

const DESCRIBE_PROMPT: &str = "Describe this media file. Reply with a catchy title, a two-sentence description, five relevant hashtags and a suggested kebab-case file name that keeps the original extension.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub suggested_filename: String,
}

#[derive(Debug, Error)]
pub enum DescribeError {
    #[error("description request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("description service answered HTTP {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("description service returned no content")]
    Empty,
    #[error("description is not valid metadata JSON: {0}")]
    Decode(#[source] serde_json::Error),
}

#[async_trait]
pub trait ContentDescriber: Send + Sync {
    async fn describe(&self, bytes: &[u8], mime_type: &str) -> Result<MediaMetadata, DescribeError>;
}

#[derive(Debug, Clone)]
pub struct GeminiDescriber {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl GeminiDescriber {
    pub fn new(api_key: impl Into<String>) -> Result<Self, DescribeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(DescribeError::Request)?;

        Ok(Self {
            client,
            api_base: GEMINI_API_BASE.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn request_body(bytes: &[u8], mime_type: &str) -> Value {
        json!({
            "contents": [{
                "parts": [
                    { "inline_data": { "mime_type": mime_type, "data": STANDARD.encode(bytes) } },
                    { "text": DESCRIBE_PROMPT }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "tags": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "suggestedFilename": { "type": "STRING" }
                    },
                    "required": ["title", "description", "tags", "suggestedFilename"]
                }
            }
        })
    }
}

#[async_trait]
impl ContentDescriber for GeminiDescriber {
    async fn describe(&self, bytes: &[u8], mime_type: &str) -> Result<MediaMetadata, DescribeError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        );
        info!(model = %self.model, mime_type, size = bytes.len(), "requesting media description");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(bytes, mime_type))
            .send()
            .await
            .map_err(DescribeError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DescribeError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        let body: Value = response.json().await.map_err(DescribeError::Request)?;
        let text = body
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<String>();

        if text.trim().is_empty() {
            return Err(DescribeError::Empty);
        }
        serde_json::from_str(&text).map_err(DescribeError::Decode)
    }
}

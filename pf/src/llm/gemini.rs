//! Gemini API client implementation
//!
//! Implements the LlmClient trait over the `generateContent` REST endpoint.
//! No retries: a failed call surfaces immediately.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

use super::{Content, GenerateRequest, GenerateResponse, LlmClient, LlmError, Part, ResponseFormat};
use crate::config::LlmConfig;
use crate::domain::ImageData;

/// Gemini API client
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    http: Client,
    timeout: Duration,
}

impl GeminiClient {
    /// Create a new client from configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(base_url = %config.base_url, "from_config: called");
        let api_key = config
            .get_api_key()
            .map_err(|_| LlmError::MissingApiKey(config.api_key_env.clone()))?;

        let timeout = config.timeout();
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            timeout,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    /// Build the request body for the Gemini API
    fn build_request_body(request: &GenerateRequest) -> Value {
        debug!(model = %request.model, contents = request.contents.len(), "build_request_body: called");

        let mut body = json!({
            "contents": request.contents.iter().map(convert_content).collect::<Vec<_>>(),
        });

        if let Some(instruction) = &request.system_instruction {
            body["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
        }

        match &request.response {
            ResponseFormat::Text => {
                debug!("build_request_body: plain text response");
            }
            ResponseFormat::Json(schema) => {
                debug!("build_request_body: json response with schema");
                body["generationConfig"] = json!({
                    "responseMimeType": "application/json",
                    "responseSchema": schema,
                });
            }
            ResponseFormat::Image { aspect_ratio } => {
                debug!(%aspect_ratio, "build_request_body: image response");
                body["generationConfig"] = json!({
                    "responseModalities": ["TEXT", "IMAGE"],
                    "imageConfig": { "aspectRatio": aspect_ratio },
                });
            }
        }

        body
    }

    /// Keep the first candidate's parts
    fn parse_response(api_response: GeminiResponse) -> GenerateResponse {
        debug!(candidates = api_response.candidates.len(), "parse_response: called");
        let Some(candidate) = api_response.candidates.into_iter().next() else {
            if let Some(feedback) = api_response.prompt_feedback {
                warn!(?feedback, "parse_response: no candidates returned");
            }
            return GenerateResponse::default();
        };

        if let Some(reason) = candidate.finish_reason.as_deref()
            && reason != "STOP"
        {
            debug!(%reason, "parse_response: unusual finish reason");
        }

        let parts = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| match (p.text, p.inline_data) {
                (_, Some(inline)) => Some(Part::InlineData(ImageData {
                    mime_type: inline.mime_type,
                    data: inline.data,
                })),
                (Some(text), None) => Some(Part::Text(text)),
                (None, None) => None,
            })
            .collect();

        GenerateResponse { parts }
    }
}

fn convert_content(content: &Content) -> Value {
    let parts: Vec<Value> = content
        .parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => json!({ "text": text }),
            Part::InlineData(image) => json!({
                "inlineData": { "mimeType": image.mime_type, "data": image.data }
            }),
        })
        .collect();
    json!({ "role": content.role.as_str(), "parts": parts })
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
        debug!(model = %request.model, images = request.image_count(), "generate: called");
        let url = self.endpoint(&request.model);
        let body = Self::build_request_body(&request);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "generate: API error");
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message: text,
            });
        }

        let raw = response
            .text()
            .await
            .map_err(|e| LlmError::from_transport(e, self.timeout))?;
        let api_response: GeminiResponse = serde_json::from_str(&raw)?;
        debug!("generate: success");
        Ok(Self::parse_response(api_response))
    }
}

// Gemini API response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
    inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

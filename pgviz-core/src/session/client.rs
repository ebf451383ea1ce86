//! Gemini completion client
//!
//! The remote assistant is a stateless text-completion collaborator: it
//! receives one prompt string and returns one response string, or a
//! structured error whose message must reach the user verbatim.

use crate::config::GeminiConfig;
use crate::error::{Error, Result};
use crate::types::GeminiModel;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::json;
use std::time::Duration;

/// Text-completion interface for plan analysis.
pub trait AssistantClient: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Create the default HTTP-backed assistant client.
pub fn create_assistant_client(config: &GeminiConfig) -> Result<Box<dyn AssistantClient>> {
    Ok(Box::new(HttpAssistantClient::new(config)?))
}

/// HTTP client for the Gemini `generateContent` endpoint.
pub struct HttpAssistantClient {
    model: GeminiModel,
    endpoint: String,
    api_key: String,
    runtime: tokio::runtime::Runtime,
    http: reqwest::Client,
}

impl HttpAssistantClient {
    /// Build a client from config.
    ///
    /// A missing API key fails here, before any network I/O, so callers can
    /// surface an instructive message without recording a failed turn.
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .ok_or_else(|| {
                Error::Config(
                    "no Gemini API key configured; save one before requesting analysis"
                        .to_string(),
                )
            })?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Llm(format!("failed to build tokio runtime: {e}")))?;
        let timeout_secs = config.timeout_secs.max(1);
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Llm(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            model: config.model,
            endpoint: config.endpoint().to_string(),
            api_key,
            runtime,
            http,
        })
    }
}

impl AssistantClient for HttpAssistantClient {
    fn generate(&self, prompt: &str) -> Result<String> {
        self.runtime.block_on(async {
            let url = format!(
                "{}/v1beta/models/{}:generateContent",
                self.endpoint.trim_end_matches('/'),
                self.model.as_str()
            );
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

            let resp = self
                .http
                .post(url)
                .headers(headers)
                .query(&[("key", self.api_key.as_str())])
                .json(&json!({
                    "contents": [{ "parts": [{ "text": prompt }] }],
                }))
                .send()
                .await
                .map_err(|e| Error::Llm(format!("gemini request failed: {e}")))?;
            let status = resp.status();
            let body = resp
                .text()
                .await
                .map_err(|e| Error::Llm(format!("gemini read body failed: {e}")))?;
            if !status.is_success() {
                // Surface the API's own message verbatim when it has one
                let message = extract_error_message(&body)
                    .unwrap_or_else(|| format!("gemini returned {}: {}", status.as_u16(), body));
                return Err(Error::Llm(message));
            }
            let json: serde_json::Value = serde_json::from_str(&body)?;
            extract_candidate_text(&json)
                .ok_or_else(|| Error::Llm("gemini response missing candidate text".to_string()))
        })
    }
}

/// Pull `error.message` out of a Gemini error body.
fn extract_error_message(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    json.get("error")?
        .get("message")?
        .as_str()
        .map(ToString::to_string)
}

/// Pull `candidates[0].content.parts[0].text` out of a success body.
fn extract_candidate_text(json: &serde_json::Value) -> Option<String> {
    json.get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?
        .first()?
        .get("text")?
        .as_str()
        .map(ToString::to_string)
}

// src/extractors/llm.rs
//! Field extraction through an OpenAI-compatible chat completions endpoint.

use crate::extractors::record::{blank_if_null, ExtractedFields};
use crate::utils::error::ExtractError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SYSTEM_PROMPT: &str =
    "You are an expert at extracting structured data from aviation accident reports.";

const EXTRACTION_PROMPT: &str = r#"You are an aviation safety analyst. Extract the key facts from this UK AAIB aircraft accident report.

Return ONLY a JSON object with exactly these fields (use null when the report does not say):
{
  "title": "Report title or short description of the occurrence",
  "date": "Date of the occurrence, YYYY-MM-DD if possible",
  "aircraft_type": "Aircraft manufacturer and model",
  "registration": "Aircraft registration mark",
  "location": "Where the occurrence happened",
  "summary": "One or two sentence summary of what happened",
  "cause": "Primary cause or contributing factors"
}

Report text:
"#;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// What the model must return. Every key is required; values may be null.
#[derive(Debug, Deserialize)]
struct ModelFields {
    #[serde(deserialize_with = "blank_if_null")]
    title: String,
    #[serde(deserialize_with = "blank_if_null")]
    date: String,
    #[serde(deserialize_with = "blank_if_null")]
    aircraft_type: String,
    #[serde(deserialize_with = "blank_if_null")]
    registration: String,
    #[serde(deserialize_with = "blank_if_null")]
    location: String,
    #[serde(deserialize_with = "blank_if_null")]
    summary: String,
    #[serde(deserialize_with = "blank_if_null")]
    cause: String,
}

impl From<ModelFields> for ExtractedFields {
    fn from(m: ModelFields) -> Self {
        Self {
            title: m.title,
            date: m.date,
            aircraft_type: m.aircraft_type,
            registration: m.registration,
            location: m.location,
            summary: m.summary,
            cause: m.cause,
        }
    }
}

pub struct LlmExtractor {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_chars: usize,
}

impl LlmExtractor {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: &str,
        max_chars: usize,
        timeout: Duration,
    ) -> Result<Self, ExtractError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_chars,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends the (truncated) report text to the model.
    ///
    /// Transport and HTTP failures are errors. A reply that does not match the
    /// expected fields yields blank fields instead.
    pub async fn extract(&self, text: &str) -> Result<ExtractedFields, ExtractError> {
        let truncated = truncate_chars(text, self.max_chars);
        tracing::info!("Sending {} chars to {}", truncated.chars().count(), self.model);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message { role: "system", content: SYSTEM_PROMPT.to_string() },
                Message { role: "user", content: format!("{}{}", EXTRACTION_PROMPT, truncated) },
            ],
            temperature: 0.1,
            response_format: ResponseFormat { format_type: "json_object" },
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::LlmHttp(status));
        }

        let body = response.text().await?;
        match parse_completion(&body) {
            Ok(fields) => Ok(fields),
            Err(reason) => {
                tracing::warn!("Unusable reply from {}: {}; leaving fields blank", self.model, reason);
                Ok(ExtractedFields::default())
            }
        }
    }
}

fn parse_completion(body: &str) -> Result<ExtractedFields, String> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| format!("invalid completion envelope: {}", e))?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| "completion has no content".to_string())?;

    let json = strip_code_fence(&content);
    serde_json::from_str::<ModelFields>(json)
        .map(ExtractedFields::from)
        .map_err(|e| format!("fields do not match schema: {}", e))
}

/// Some models wrap JSON in a Markdown fence even in JSON mode.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

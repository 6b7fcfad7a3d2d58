// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{build_prompt, parse_extraction, ExtractionResult, ImageAttachment, MetadataExtractor};
use crate::error::{ConfigError, ExtractionError};

const PROVIDER: &str = "gemini";
const GEMINI_API: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";

/// Google Gemini `generateContent` with a schema-constrained JSON answer.
pub struct GeminiExtractor {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    language: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<u16>,
    message: String,
    status: Option<String>,
}

impl GeminiExtractor {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        language: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(concat!("scholarflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_API.to_string(),
            language: language.into(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn request_body(&self, text: &str, image: Option<&ImageAttachment>) -> Value {
        let mut parts = vec![json!({ "text": build_prompt(text, &self.language) })];
        if let Some(image) = image {
            parts.push(json!({
                "inlineData": {
                    "mimeType": image.mime_type(),
                    "data": image.data(),
                }
            }));
        }

        json!({
            "contents": [{ "parts": parts }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": gemini_schema(),
            }
        })
    }
}

// Gemini takes an OpenAPI-style schema with upper-case type names.
fn gemini_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "authors": { "type": "STRING" },
            "category": { "type": "STRING" },
            "tags": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            },
            "aiSummary": { "type": "STRING" }
        },
        "required": super::REQUIRED_FIELDS
    })
}

fn interpret_response(status: u16, raw: &str) -> Result<ExtractionResult, ExtractionError> {
    let success = (200..300).contains(&status);

    let parsed: GenerateContentResponse = match serde_json::from_str(raw) {
        Ok(parsed) => parsed,
        Err(e) if success => return Err(ExtractionError::MalformedResponse(e.to_string())),
        Err(_) => {
            return Err(ExtractionError::Provider {
                provider: PROVIDER,
                status: status.to_string(),
                message: raw.chars().take(300).collect(),
            })
        }
    };

    if let Some(error) = parsed.error {
        let status = error
            .status
            .or_else(|| error.code.map(|code| code.to_string()))
            .unwrap_or_else(|| status.to_string());
        return Err(ExtractionError::Provider {
            provider: PROVIDER,
            status,
            message: error.message,
        });
    }
    if !success {
        return Err(ExtractionError::Provider {
            provider: PROVIDER,
            status: status.to_string(),
            message: "request rejected".to_string(),
        });
    }
    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ExtractionError::Provider {
            provider: PROVIDER,
            status: "BLOCKED".to_string(),
            message: format!("prompt blocked: {}", reason),
        });
    }

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        return Err(ExtractionError::MalformedResponse(
            "response has no candidates".to_string(),
        ));
    };
    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(ExtractionError::MalformedResponse(format!(
            "candidate has no text (finish reason {})",
            reason
        )));
    }

    parse_extraction(&text)
}

#[async_trait]
impl MetadataExtractor for GeminiExtractor {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn extract(
        &self,
        text: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<ExtractionResult, ExtractionError> {
        let body = self.request_body(text, image);
        tracing::debug!(model = %self.model, has_image = image.is_some(), "calling gemini");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractionError::Transport {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let raw = response.text().await.map_err(|e| ExtractionError::Transport {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

        interpret_response(status, &raw)
    }
}

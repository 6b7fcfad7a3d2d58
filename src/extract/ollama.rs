// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use async_trait::async_trait;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::images::Image;
use ollama_rs::generation::parameters::FormatType;
use ollama_rs::Ollama;
use reqwest::Url;

use super::{build_prompt, parse_extraction, ExtractionResult, ImageAttachment, MetadataExtractor};
use crate::error::{ConfigError, ExtractionError};

const PROVIDER: &str = "ollama";

pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:latest";

/// A local model served by Ollama, asked for JSON output.
pub struct OllamaExtractor {
    ollama: Ollama,
    model: String,
    language: String,
}

impl OllamaExtractor {
    pub fn new(ollama: Ollama, model: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            ollama,
            model: model.into(),
            language: language.into(),
        }
    }

    pub fn from_url(
        url: &str,
        model: impl Into<String>,
        language: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let (host, port) = split_host_port(url)?;
        Ok(Self::new(Ollama::new(host, port), model, language))
    }
}

fn split_host_port(url: &str) -> Result<(String, u16), ConfigError> {
    let invalid = |message: &str| ConfigError::InvalidOllamaUrl {
        url: url.to_string(),
        message: message.to_string(),
    };

    let parsed = Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
    let host = parsed.host_str().ok_or_else(|| invalid("missing host"))?;
    let port = parsed
        .port_or_known_default()
        .ok_or_else(|| invalid("missing port"))?;
    Ok((format!("{}://{}", parsed.scheme(), host), port))
}

#[async_trait]
impl MetadataExtractor for OllamaExtractor {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn extract(
        &self,
        text: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<ExtractionResult, ExtractionError> {
        let prompt = build_prompt(text, &self.language);
        let mut request = GenerationRequest::new(self.model.clone(), prompt).format(FormatType::Json);
        if let Some(image) = image {
            request = request.images(vec![Image::from_base64(image.data())]);
        }

        tracing::debug!(model = %self.model, has_image = image.is_some(), "calling ollama");
        let response = self
            .ollama
            .generate(request)
            .await
            .map_err(|e| ExtractionError::Transport {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        parse_extraction(&response.response)
    }
}

// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use std::path::PathBuf;
use std::sync::Arc;

use clap::ValueEnum;

use crate::error::ConfigError;
use crate::extract::{
    GeminiExtractor, MetadataExtractor, OllamaExtractor, DEFAULT_GEMINI_MODEL, DEFAULT_OLLAMA_MODEL,
};
use crate::library::{FileStore, Library};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_LANGUAGE: &str = "English";
pub const DEFAULT_WEB_PORT: u16 = 6601;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    Gemini,
    Ollama,
}

/// Resolved runtime settings, independent of how they were supplied.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub provider: Provider,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub ollama_url: String,
    pub language: String,
    pub no_ai: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            provider: Provider::Gemini,
            model: None,
            api_key: None,
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            no_ai: false,
        }
    }
}

impl Settings {
    pub fn model(&self) -> &str {
        match (&self.model, self.provider) {
            (Some(model), _) => model,
            (None, Provider::Gemini) => DEFAULT_GEMINI_MODEL,
            (None, Provider::Ollama) => DEFAULT_OLLAMA_MODEL,
        }
    }

    pub fn open_library(&self) -> Library {
        Library::open(FileStore::new(&self.data_dir))
    }

    /// The configured extractor, or `None` when AI analysis is switched off.
    pub fn extractor(&self) -> Result<Option<Arc<dyn MetadataExtractor>>, ConfigError> {
        if self.no_ai {
            return Ok(None);
        }

        let extractor: Arc<dyn MetadataExtractor> = match self.provider {
            Provider::Gemini => {
                let api_key = self
                    .api_key
                    .as_deref()
                    .map(str::trim)
                    .filter(|key| !key.is_empty())
                    .ok_or(ConfigError::MissingApiKey)?;
                Arc::new(GeminiExtractor::new(
                    api_key,
                    self.model(),
                    self.language.as_str(),
                )?)
            }
            Provider::Ollama => Arc::new(OllamaExtractor::from_url(
                &self.ollama_url,
                self.model(),
                self.language.as_str(),
            )?),
        };
        Ok(Some(extractor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_defaults_follow_provider() {
        let mut settings = Settings::default();
        assert_eq!(settings.model(), DEFAULT_GEMINI_MODEL);
        settings.provider = Provider::Ollama;
        assert_eq!(settings.model(), DEFAULT_OLLAMA_MODEL);
        settings.model = Some("mistral".to_string());
        assert_eq!(settings.model(), "mistral");
    }

    #[test]
    fn gemini_requires_key_unless_ai_is_off() {
        let mut settings = Settings::default();
        assert!(matches!(settings.extractor(), Err(ConfigError::MissingApiKey)));

        settings.api_key = Some("   ".to_string());
        assert!(settings.extractor().is_err());

        settings.api_key = Some("secret".to_string());
        assert_eq!(settings.extractor().unwrap().unwrap().name(), "gemini");

        settings.no_ai = true;
        assert!(settings.extractor().unwrap().is_none());
    }

    #[test]
    fn ollama_needs_no_key() {
        let settings = Settings {
            provider: Provider::Ollama,
            ..Settings::default()
        };
        assert_eq!(settings.extractor().unwrap().unwrap().name(), "ollama");
    }
}

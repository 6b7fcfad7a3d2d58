// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use thiserror::Error;
use uuid::Uuid;

/// Failure of a single metadata extraction call. There is no partial result.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("request to {provider} failed: {message}")]
    Transport { provider: &'static str, message: String },
    #[error("{provider} returned an error ({status}): {message}")]
    Provider {
        provider: &'static str,
        status: String,
        message: String,
    },
    #[error("model response is not valid JSON: {0}")]
    MalformedResponse(String),
    #[error("model response did not match the metadata schema: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not serialize library: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("stored snapshot under {key} is not readable: {message}")]
    PersistenceLoad { key: String, message: String },
    #[error("a paper with id {0} already exists")]
    DuplicateId(Uuid),
}

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("nothing to submit: provide a title, an abstract or an image")]
    EmptyDraft,
    #[error("another paper is still being analyzed")]
    Busy,
    #[error("paper analysis failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set (pass --api-key, or --no-ai for manual intake)")]
    MissingApiKey,
    #[error("could not build HTTP client: {0}")]
    HttpClient(String),
    #[error("invalid Ollama URL {url}: {message}")]
    InvalidOllamaUrl { url: String, message: String },
}

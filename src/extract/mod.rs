// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Metadata extraction: one call to a generative model that turns free text
//! (and optionally a screenshot) into title, authors, category, tags and a
//! short summary.
//!
//! Providers differ only in transport. Prompt wording and response validation
//! are shared so every provider is held to the same schema.

mod gemini;
mod image;
mod ollama;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ExtractionError;

pub use gemini::{GeminiExtractor, DEFAULT_GEMINI_MODEL};
pub use image::ImageAttachment;
pub use ollama::{OllamaExtractor, DEFAULT_OLLAMA_MODEL};

/// Categories the prompt steers the model towards. The model may still answer
/// with something else and that answer is kept.
pub const SUGGESTED_CATEGORIES: [&str; 8] = [
    "AI/Machine Learning",
    "Biology",
    "Physics",
    "Medicine",
    "Social Sciences",
    "Engineering",
    "Mathematics",
    "Humanities",
];

pub const REQUIRED_FIELDS: [&str; 4] = ["title", "category", "tags", "aiSummary"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub title: Option<String>,
    pub authors: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub ai_summary: Option<String>,
}

impl ExtractionResult {
    /// Blank answers count as absent so the merge falls through to user input.
    fn normalized(self) -> Self {
        let tags = self.tags.map(|tags| {
            tags.into_iter()
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty())
                .collect::<Vec<_>>()
        });
        Self {
            title: non_blank(self.title),
            authors: non_blank(self.authors),
            category: non_blank(self.category),
            tags: tags.filter(|tags| !tags.is_empty()),
            ai_summary: non_blank(self.ai_summary),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Short provider name used in logs and errors.
    fn name(&self) -> &'static str;

    async fn extract(
        &self,
        text: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<ExtractionResult, ExtractionError>;
}

pub fn build_prompt(text: &str, language: &str) -> String {
    format!(
        "Analyze the details of the following research paper. Answer every field in {language}.\n\
        1. If there is no explicit title, provide a professional title.\n\
        2. Extract or suggest the author names.\n\
        3. Classify it into one of these categories: {categories}.\n\
        4. Generate 3-5 relevant tags.\n\
        5. Summarize its core contribution in two concise sentences.\n\n\
        Respond with a single JSON object with the keys \"title\", \"authors\", \"category\", \
        \"tags\" (an array of strings) and \"aiSummary\".\n\n\
        Data: {text}",
        categories = SUGGESTED_CATEGORIES.join(", "),
    )
}

/// JSON Schema every model response is validated against.
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "authors": { "type": "string" },
            "category": { "type": "string" },
            "tags": {
                "type": "array",
                "items": { "type": "string" }
            },
            "aiSummary": { "type": "string" }
        },
        "required": REQUIRED_FIELDS
    })
}

/// Parses the model's textual answer into a typed result.
pub fn parse_extraction(raw: &str) -> Result<ExtractionResult, ExtractionError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(ExtractionError::MalformedResponse(
            "empty response".to_string(),
        ));
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| ExtractionError::MalformedResponse(e.to_string()))?;

    let errors = schema_errors(&value)?;
    if !errors.is_empty() {
        return Err(ExtractionError::SchemaViolation(errors));
    }

    let result: ExtractionResult = serde_json::from_value(value)
        .map_err(|e| ExtractionError::MalformedResponse(e.to_string()))?;
    Ok(result.normalized())
}

fn schema_errors(value: &Value) -> Result<Vec<String>, ExtractionError> {
    let schema = response_schema();
    let compiled = jsonschema::JSONSchema::compile(&schema).map_err(|error| {
        ExtractionError::SchemaViolation(vec![format!("invalid metadata schema: {}", error)])
    })?;

    let errors = compiled
        .validate(value)
        .err()
        .map(|errors| {
            errors
                .map(|error| {
                    let path = error.instance_path.to_string();
                    if path.is_empty() {
                        error.to_string()
                    } else {
                        format!("{}: {}", path, error)
                    }
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    Ok(errors)
}

// Local models like to wrap JSON in ```json fences even in JSON mode.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complete_response() {
        let raw = r#"{
            "title": "Attention Is All You Need",
            "authors": "Ashish Vaswani, Noam Shazeer",
            "category": "AI/Machine Learning",
            "tags": ["transformer", "attention", "nlp"],
            "aiSummary": "Proposes the Transformer. It drops recurrence entirely."
        }"#;
        let result = parse_extraction(raw).unwrap();
        assert_eq!(result.title.as_deref(), Some("Attention Is All You Need"));
        assert_eq!(result.authors.as_deref(), Some("Ashish Vaswani, Noam Shazeer"));
        assert_eq!(result.tags.unwrap().len(), 3);
    }

    #[test]
    fn authors_are_optional() {
        let raw = r#"{"title": "T", "category": "Physics", "tags": [], "aiSummary": "S."}"#;
        let result = parse_extraction(raw).unwrap();
        assert!(result.authors.is_none());
        assert!(result.tags.is_none());
    }

    #[test]
    fn keeps_categories_outside_the_suggested_set() {
        let raw = r#"{"title": "T", "category": "Astrobiology", "tags": ["x"], "aiSummary": "S."}"#;
        let result = parse_extraction(raw).unwrap();
        assert_eq!(result.category.as_deref(), Some("Astrobiology"));
    }

    #[test]
    fn blank_fields_become_absent() {
        let raw = r#"{"title": "  ", "category": "", "tags": ["", " ml "], "aiSummary": ""}"#;
        let result = parse_extraction(raw).unwrap();
        assert!(result.title.is_none());
        assert!(result.category.is_none());
        assert!(result.ai_summary.is_none());
        assert_eq!(result.tags, Some(vec!["ml".to_string()]));
    }

    #[test]
    fn rejects_missing_required_fields() {
        let err = parse_extraction(r#"{"title": "Only a title"}"#).unwrap_err();
        match err {
            ExtractionError::SchemaViolation(errors) => assert!(!errors.is_empty()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_wrongly_typed_tags() {
        let raw = r#"{"title": "T", "category": "C", "tags": "a, b", "aiSummary": "S"}"#;
        assert!(matches!(
            parse_extraction(raw),
            Err(ExtractionError::SchemaViolation(_))
        ));
    }

    #[test]
    fn rejects_non_json_and_empty_text() {
        assert!(matches!(
            parse_extraction("Sure! Here is the metadata:"),
            Err(ExtractionError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_extraction("   "),
            Err(ExtractionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn accepts_fenced_json() {
        let raw = "```json\n{\"title\": \"T\", \"category\": \"C\", \"tags\": [\"a\"], \"aiSummary\": \"S\"}\n```";
        assert_eq!(parse_extraction(raw).unwrap().title.as_deref(), Some("T"));
    }

    #[test]
    fn prompt_carries_language_categories_and_data() {
        let prompt = build_prompt("We study protein folding.", "German");
        assert!(prompt.contains("in German"));
        assert!(prompt.contains("Social Sciences"));
        assert!(prompt.contains("3-5 relevant tags"));
        assert!(prompt.ends_with("Data: We study protein folding."));
    }
}

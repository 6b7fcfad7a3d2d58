// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Paper intake: user draft, optional AI extraction, merge into a record.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::IntakeError;
use crate::extract::{ExtractionResult, ImageAttachment, MetadataExtractor};
use crate::library::Library;
use crate::paper::{Paper, PaperStatus, UNCATEGORIZED, UNTITLED_PAPER};

/// What the user typed into the intake form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PaperDraft {
    pub title: String,
    pub authors: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub url: String,
    #[serde(skip)]
    pub image: Option<ImageAttachment>,
}

impl PaperDraft {
    /// A draft needs at least a title, an abstract or an image.
    pub fn is_submittable(&self) -> bool {
        !self.title.trim().is_empty()
            || !self.abstract_text.trim().is_empty()
            || self.image.is_some()
    }

    /// Text handed to the model: the abstract, or the title when there is none.
    pub fn analysis_text(&self) -> &str {
        let abstract_text = self.abstract_text.trim();
        if abstract_text.is_empty() {
            self.title.trim()
        } else {
            abstract_text
        }
    }
}

/// Builds the stored record from the draft and whatever the model returned.
pub fn merge(draft: &PaperDraft, extracted: Option<ExtractionResult>) -> Paper {
    merge_at(draft, extracted, Uuid::new_v4(), Utc::now())
}

pub fn merge_at(
    draft: &PaperDraft,
    extracted: Option<ExtractionResult>,
    id: Uuid,
    now: DateTime<Utc>,
) -> Paper {
    let ai = extracted.unwrap_or_default();

    Paper {
        id,
        title: ai
            .title
            .or_else(|| filled(&draft.title))
            .unwrap_or_else(|| UNTITLED_PAPER.to_string()),
        authors: ai
            .authors
            .or_else(|| filled(&draft.authors))
            .unwrap_or_default(),
        abstract_text: draft.abstract_text.trim().to_string(),
        category: ai.category.unwrap_or_else(|| UNCATEGORIZED.to_string()),
        tags: ai.tags.unwrap_or_default(),
        url: draft.url.trim().to_string(),
        date_added: now,
        ai_summary: ai.ai_summary,
        status: PaperStatus::Analyzed,
    }
}

fn filled(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Runs intakes one at a time. A second submission while one is being
/// analyzed is refused rather than queued.
pub struct IntakeDesk {
    extractor: Option<Arc<dyn MetadataExtractor>>,
    in_flight: AtomicBool,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl IntakeDesk {
    /// `None` disables extraction; drafts are then merged from user input only.
    pub fn new(extractor: Option<Arc<dyn MetadataExtractor>>) -> Self {
        Self {
            extractor,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn uses_ai(&self) -> bool {
        self.extractor.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Analyzes the draft and returns the new record without storing it.
    pub async fn prepare(&self, draft: &PaperDraft) -> Result<Paper, IntakeError> {
        if !draft.is_submittable() {
            return Err(IntakeError::EmptyDraft);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(IntakeError::Busy);
        }
        let _guard = InFlight(&self.in_flight);

        let extracted = match &self.extractor {
            Some(extractor) => {
                tracing::info!(provider = extractor.name(), "analyzing paper");
                let result = extractor
                    .extract(draft.analysis_text(), draft.image.as_ref())
                    .await
                    .map_err(|e| {
                        tracing::error!(provider = extractor.name(), error = %e, "paper analysis failed");
                        e
                    })?;
                Some(result)
            }
            None => None,
        };

        Ok(merge(draft, extracted))
    }

    /// Full intake: analyze, merge, then add to the library.
    pub async fn submit(&self, draft: &PaperDraft, library: &mut Library) -> Result<Paper, IntakeError> {
        let paper = self.prepare(draft).await?;
        library.add(paper.clone())?;
        Ok(paper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, abstract_text: &str) -> PaperDraft {
        PaperDraft {
            title: title.to_string(),
            abstract_text: abstract_text.to_string(),
            ..PaperDraft::default()
        }
    }

    fn ai_title(title: Option<&str>) -> ExtractionResult {
        ExtractionResult {
            title: title.map(str::to_string),
            ..ExtractionResult::default()
        }
    }

    #[test]
    fn ai_title_wins_over_user_title() {
        let paper = merge(&draft("Draft", ""), Some(ai_title(Some("Formal Title"))));
        assert_eq!(paper.title, "Formal Title");
    }

    #[test]
    fn user_title_used_when_ai_has_none() {
        let paper = merge(&draft("Draft", ""), Some(ai_title(None)));
        assert_eq!(paper.title, "Draft");
    }

    #[test]
    fn fallback_literals_when_nothing_supplied() {
        let paper = merge(&draft("", "Some abstract"), Some(ai_title(None)));
        assert_eq!(paper.title, UNTITLED_PAPER);
        assert_eq!(paper.category, UNCATEGORIZED);
        assert!(paper.tags.is_empty());
        assert!(paper.ai_summary.is_none());
        assert_eq!(paper.authors, "");
    }

    #[test]
    fn abstract_and_url_come_from_user_only() {
        let mut d = draft("T", "User abstract");
        d.url = "https://arxiv.org/abs/1706.03762".to_string();
        d.authors = "Someone".to_string();
        let ai = ExtractionResult {
            authors: Some("Vaswani et al.".to_string()),
            category: Some("AI/Machine Learning".to_string()),
            tags: Some(vec!["nlp".to_string(), "nlp".to_string()]),
            ai_summary: Some("Two sentences.".to_string()),
            ..ExtractionResult::default()
        };
        let now = Utc::now();
        let id = Uuid::new_v4();
        let paper = merge_at(&d, Some(ai), id, now);

        assert_eq!(paper.id, id);
        assert_eq!(paper.date_added, now);
        assert_eq!(paper.abstract_text, "User abstract");
        assert_eq!(paper.url, "https://arxiv.org/abs/1706.03762");
        assert_eq!(paper.authors, "Vaswani et al.");
        assert_eq!(paper.tags, ["nlp", "nlp"]);
        assert_eq!(paper.ai_summary.as_deref(), Some("Two sentences."));
        assert_eq!(paper.status, PaperStatus::Analyzed);
    }

    #[test]
    fn submittable_needs_title_abstract_or_image() {
        assert!(!PaperDraft::default().is_submittable());
        assert!(!draft("  ", "").is_submittable());
        assert!(draft("T", "").is_submittable());
        assert!(draft("", "A").is_submittable());

        let with_image = PaperDraft {
            image: Some(ImageAttachment::new("image/png", "AAAA")),
            ..PaperDraft::default()
        };
        assert!(with_image.is_submittable());
    }

    #[test]
    fn analysis_text_prefers_abstract() {
        assert_eq!(draft("Title", "Abstract").analysis_text(), "Abstract");
        assert_eq!(draft("Title", " ").analysis_text(), "Title");
    }

    #[test]
    fn draft_reads_form_json() {
        let d: PaperDraft =
            serde_json::from_str(r#"{"title": "T", "abstract": "A", "image": "ignored"}"#).unwrap();
        assert_eq!(d.abstract_text, "A");
        assert!(d.url.is_empty());
        assert!(d.image.is_none());
    }
}

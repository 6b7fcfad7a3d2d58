// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Personal research-paper catalog: AI-assisted intake, a write-through
//! library, filtering and category statistics.

pub mod config;
pub mod error;
pub mod extract;
pub mod intake;
pub mod library;
pub mod paper;
pub mod query;
pub mod web;

pub use config::{Provider, Settings};
pub use error::{ConfigError, ExtractionError, IntakeError, StoreError};
pub use extract::{ExtractionResult, ImageAttachment, MetadataExtractor};
pub use intake::{IntakeDesk, PaperDraft};
pub use library::{KeyValueStore, Library, Removal};
pub use paper::{CategoryStats, Paper, PaperStatus};

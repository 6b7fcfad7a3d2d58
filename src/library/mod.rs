// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! The paper library: an ordered in-memory collection written through to a
//! [`KeyValueStore`] after every mutation.

mod storage;

use std::collections::VecDeque;

use uuid::Uuid;

use crate::error::StoreError;
use crate::paper::Paper;

pub use storage::{FileStore, KeyValueStore, MemoryStore};

/// Namespace key the snapshot is stored under.
pub const LIBRARY_KEY: &str = "scholarflow_papers";

/// Outcome of a removal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    Removed(Paper),
    Declined,
    NotFound,
}

pub struct Library {
    papers: VecDeque<Paper>,
    backend: Box<dyn KeyValueStore>,
    key: String,
}

impl Library {
    /// Loads the previous snapshot. A missing or unreadable snapshot starts an
    /// empty library; the failure is only logged, and an unreadable snapshot is
    /// set aside (`<key>.json.bak` for [`FileStore`]) before anything new is written.
    pub fn open(backend: impl KeyValueStore + 'static) -> Self {
        Self::open_with_key(backend, LIBRARY_KEY)
    }

    pub fn open_with_key(backend: impl KeyValueStore + 'static, key: &str) -> Self {
        let papers = match load_snapshot(&backend, key) {
            Ok(papers) => papers,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load papers, starting with an empty library");
                if matches!(e, StoreError::PersistenceLoad { .. }) {
                    if let Err(e) = backend.set_aside(key) {
                        tracing::warn!(error = %e, "could not keep a backup of the unreadable snapshot");
                    }
                }
                VecDeque::new()
            }
        };
        tracing::debug!(count = papers.len(), key, "library opened");

        Self {
            papers,
            backend: Box::new(backend),
            key: key.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Paper> {
        self.papers.iter()
    }

    pub fn to_vec(&self) -> Vec<Paper> {
        self.papers.iter().cloned().collect()
    }

    pub fn get(&self, id: Uuid) -> Option<&Paper> {
        self.papers.iter().find(|p| p.id == id)
    }

    pub fn add(&mut self, paper: Paper) -> Result<(), StoreError> {
        if self.get(paper.id).is_some() {
            return Err(StoreError::DuplicateId(paper.id));
        }

        let id = paper.id;
        self.papers.push_front(paper);
        if let Err(e) = self.persist() {
            self.papers.pop_front();
            return Err(e);
        }

        tracing::info!(%id, total = self.papers.len(), "paper added");
        Ok(())
    }

    /// Removes the paper with `id` once `confirm` agrees. `confirm` is only
    /// asked when such a paper exists.
    pub fn remove<F>(&mut self, id: Uuid, confirm: F) -> Result<Removal, StoreError>
    where
        F: FnOnce(&Paper) -> bool,
    {
        let Some(index) = self.papers.iter().position(|p| p.id == id) else {
            return Ok(Removal::NotFound);
        };
        if !confirm(&self.papers[index]) {
            return Ok(Removal::Declined);
        }

        let Some(removed) = self.papers.remove(index) else {
            return Ok(Removal::NotFound);
        };
        if let Err(e) = self.persist() {
            self.papers.insert(index, removed);
            return Err(e);
        }

        tracing::info!(%id, total = self.papers.len(), "paper removed");
        Ok(Removal::Removed(removed))
    }

    fn persist(&self) -> Result<(), StoreError> {
        let blob = serde_json::to_string(&self.papers)?;
        self.backend.save(&self.key, &blob)
    }
}

fn load_snapshot(
    backend: &dyn KeyValueStore,
    key: &str,
) -> Result<VecDeque<Paper>, StoreError> {
    let Some(blob) = backend.load(key)? else {
        return Ok(VecDeque::new());
    };
    serde_json::from_str(&blob).map_err(|e| StoreError::PersistenceLoad {
        key: key.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::paper::PaperStatus;

    fn paper(title: &str) -> Paper {
        Paper {
            id: Uuid::new_v4(),
            title: title.to_string(),
            authors: String::new(),
            abstract_text: String::new(),
            category: "Physics".to_string(),
            tags: vec![],
            url: String::new(),
            date_added: Utc::now(),
            ai_summary: None,
            status: PaperStatus::Analyzed,
        }
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn load(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn save(&self, key: &str, _blob: &str) -> Result<(), StoreError> {
            Err(StoreError::Io {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            })
        }
    }

    #[test]
    fn add_prepends_and_writes_through() {
        let backend = Arc::new(MemoryStore::new());
        let mut library = Library::open(backend.clone());
        library.add(paper("first")).unwrap();
        library.add(paper("second")).unwrap();

        let titles: Vec<_> = library.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["second", "first"]);

        let stored: Vec<Paper> =
            serde_json::from_str(&backend.load(LIBRARY_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, library.to_vec());
    }

    #[test]
    fn rejects_duplicate_id() {
        let mut library = Library::open(MemoryStore::new());
        let p = paper("once");
        library.add(p.clone()).unwrap();
        assert!(matches!(library.add(p), Err(StoreError::DuplicateId(_))));
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn remove_targets_one_record_and_keeps_order() {
        let mut library = Library::open(MemoryStore::new());
        let (a, b, c) = (paper("a"), paper("b"), paper("c"));
        let target = b.id;
        for p in [a, b, c] {
            library.add(p).unwrap();
        }

        let removal = library.remove(target, |_| true).unwrap();
        assert!(matches!(removal, Removal::Removed(ref p) if p.title == "b"));
        let titles: Vec<_> = library.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["c", "a"]);
    }

    #[test]
    fn declined_or_unknown_removal_changes_nothing() {
        let mut library = Library::open(MemoryStore::new());
        let p = paper("keep");
        let id = p.id;
        library.add(p).unwrap();

        assert_eq!(library.remove(id, |_| false).unwrap(), Removal::Declined);

        let mut asked = false;
        let removal = library
            .remove(Uuid::new_v4(), |_| {
                asked = true;
                true
            })
            .unwrap();
        assert_eq!(removal, Removal::NotFound);
        assert!(!asked);
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn failed_write_rolls_back() {
        let mut library = Library::open(FailingStore);
        assert!(library.add(paper("lost")).is_err());
        assert!(library.is_empty());
    }

    #[test]
    fn corrupt_snapshot_starts_empty() {
        let backend = MemoryStore::new();
        backend.save(LIBRARY_KEY, "{not json").unwrap();
        let library = Library::open(backend);
        assert!(library.is_empty());
    }

    #[test]
    fn corrupt_file_is_backed_up_before_next_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.save(LIBRARY_KEY, "{not json").unwrap();

        let mut library = Library::open(FileStore::new(dir.path()));
        assert!(library.is_empty());
        library.add(paper("fresh")).unwrap();

        let backup = std::fs::read_to_string(store.backup_path_for(LIBRARY_KEY)).unwrap();
        assert_eq!(backup, "{not json");
        let reloaded = Library::open(FileStore::new(dir.path()));
        assert_eq!(reloaded.len(), 1);
    }
}

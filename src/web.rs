// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Local web interface: library and analytics views, the intake form and
//! confirmed deletion, all backed by the same library the CLI uses.

use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::{Filter, Rejection, Reply};

use crate::error::{IntakeError, StoreError};
use crate::extract::ImageAttachment;
use crate::intake::{IntakeDesk, PaperDraft};
use crate::library::{Library, Removal};
use crate::query::{self, ALL_CATEGORIES};

// Room for a base64 screenshot.
const MAX_BODY_BYTES: u64 = 20 * 1024 * 1024;

pub struct AppState {
    library: Mutex<Library>,
    intake: IntakeDesk,
}

impl AppState {
    pub fn new(library: Library, intake: IntakeDesk) -> Arc<Self> {
        Arc::new(Self {
            library: Mutex::new(library),
            intake,
        })
    }

    fn library(&self) -> MutexGuard<'_, Library> {
        self.library.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Serialize)]
struct StatusMessage {
    status: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    q: Option<String>,
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IntakeRequest {
    #[serde(flatten)]
    draft: PaperDraft,
    #[serde(default)]
    image: Option<String>,
}

impl IntakeRequest {
    fn into_draft(self) -> PaperDraft {
        let mut draft = self.draft;
        draft.image = self.image.as_deref().and_then(ImageAttachment::from_data_url);
        draft
    }
}

pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let state_filter = warp::any().map(move || state.clone());

    let index = warp::get()
        .and(warp::path::end())
        .map(|| warp::reply::html(INDEX_HTML.to_string()));

    let list = warp::get()
        .and(warp::path!("api" / "papers"))
        .and(warp::query::<ListQuery>())
        .and(state_filter.clone())
        .and_then(list_papers);

    let categories = warp::get()
        .and(warp::path!("api" / "categories"))
        .and(state_filter.clone())
        .and_then(list_categories);

    let stats = warp::get()
        .and(warp::path!("api" / "stats"))
        .and(state_filter.clone())
        .and_then(get_stats);

    let add = warp::post()
        .and(warp::path!("api" / "papers"))
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(add_paper);

    let delete = warp::delete()
        .and(warp::path!("api" / "papers" / Uuid))
        .and(state_filter)
        .and_then(delete_paper);

    index
        .or(list)
        .or(categories)
        .or(stats)
        .or(add)
        .or(delete)
}

pub async fn start_web_server(state: Arc<AppState>, port: u16) {
    tracing::info!(port, ai = state.intake.uses_ai(), "starting web interface");
    println!("Web interface running on http://localhost:{}", port);
    warp::serve(routes(state)).run(([127, 0, 0, 1], port)).await;
}

fn reply<T: Serialize>(body: &T, status: StatusCode) -> WithStatus<Json> {
    warp::reply::with_status(warp::reply::json(body), status)
}

fn error_reply(status: StatusCode, message: String) -> WithStatus<Json> {
    reply(
        &StatusMessage {
            status: "error".to_string(),
            message,
        },
        status,
    )
}

fn intake_status(error: &IntakeError) -> StatusCode {
    match error {
        IntakeError::EmptyDraft => StatusCode::BAD_REQUEST,
        IntakeError::Busy => StatusCode::CONFLICT,
        IntakeError::Extraction(_) => StatusCode::BAD_GATEWAY,
        IntakeError::Store(StoreError::DuplicateId(_)) => StatusCode::CONFLICT,
        IntakeError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn list_papers(query: ListQuery, state: Arc<AppState>) -> Result<WithStatus<Json>, Infallible> {
    let search = query.q.unwrap_or_default();
    let category = query.category.unwrap_or_else(|| ALL_CATEGORIES.to_string());

    let library = state.library();
    let papers = query::filter_papers(library.iter(), &search, &category);
    Ok(reply(&papers, StatusCode::OK))
}

async fn list_categories(state: Arc<AppState>) -> Result<WithStatus<Json>, Infallible> {
    let library = state.library();
    Ok(reply(&query::categories(library.iter()), StatusCode::OK))
}

async fn get_stats(state: Arc<AppState>) -> Result<WithStatus<Json>, Infallible> {
    let library = state.library();
    Ok(reply(&query::library_stats(library.iter()), StatusCode::OK))
}

async fn add_paper(request: IntakeRequest, state: Arc<AppState>) -> Result<WithStatus<Json>, Infallible> {
    let draft = request.into_draft();

    let paper = match state.intake.prepare(&draft).await {
        Ok(paper) => paper,
        Err(e) => return Ok(error_reply(intake_status(&e), e.to_string())),
    };

    let result = state.library().add(paper.clone());
    match result {
        Ok(()) => Ok(reply(&paper, StatusCode::CREATED)),
        Err(e) => {
            tracing::error!(error = %e, "could not store paper");
            let e = IntakeError::Store(e);
            Ok(error_reply(intake_status(&e), e.to_string()))
        }
    }
}

async fn delete_paper(id: Uuid, state: Arc<AppState>) -> Result<WithStatus<Json>, Infallible> {
    // The browser asks for confirmation before sending the request.
    let result = state.library().remove(id, |_| true);
    match result {
        Ok(Removal::Removed(paper)) => Ok(reply(&paper, StatusCode::OK)),
        Ok(Removal::NotFound) | Ok(Removal::Declined) => Ok(error_reply(
            StatusCode::NOT_FOUND,
            format!("no paper with id {}", id),
        )),
        Err(e) => {
            tracing::error!(error = %e, %id, "could not remove paper");
            Ok(error_reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>ScholarFlow</title>
    <style>
        body { font-family: Arial; margin: 20px; background: #f5f5f5; }
        h1 { color: #333; }

        .status-message { padding: 10px; margin: 10px 0; display: none; }
        .status-message.error { display: block; background: #f8d7da; color: #721c24; border: 1px solid #f5c6cb; }

        button { padding: 8px 16px; background: rgb(100, 149, 237); color: white; border: none; cursor: pointer; margin-right: 5px; }
        button:hover { background: #5a8dd4; }
        button:disabled { background: #a9c1ec; cursor: default; }
        button.danger { background: #dc3545; font-size: 12px; padding: 4px 8px; float: right; }
        button.chip { background: white; color: #333; border: 1px solid #ddd; }
        button.chip.active { background: #333; color: white; }

        input[type="text"], input[type="url"], textarea { padding: 8px; margin: 5px 0; width: 100%; box-sizing: border-box; }

        .tabs { margin: 20px 0; border-bottom: 2px solid #ddd; }
        .tab { display: inline-block; padding: 10px 20px; cursor: pointer; background: #e9ecef; margin-right: 5px; }
        .tab.active { background: white; border: 1px solid #ddd; border-bottom: none; }
        .tab-content { display: none; }
        .tab-content.active { display: block; }

        .filters { background: white; padding: 15px; margin-bottom: 15px; }
        .grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(280px, 1fr)); gap: 15px; }
        .card { background: white; padding: 15px; border: 1px solid #ddd; }
        .card h3 { margin: 8px 0; }
        .category { background: #e8eaf6; color: #3949ab; padding: 2px 8px; font-size: 12px; font-weight: bold; }
        .authors { color: #666; font-style: italic; font-size: 14px; }
        .summary { margin-top: 10px; padding: 10px; background: #f9f9f9; border-left: 3px solid #007bff; font-size: 14px; }
        .tag { display: inline-block; font-size: 11px; background: #eee; padding: 2px 6px; margin: 4px 4px 0 0; }
        .info { color: #999; font-size: 12px; margin-top: 10px; }
        .empty { background: white; padding: 40px; text-align: center; border: 1px dashed #bbb; }

        .bar-row { display: flex; align-items: center; margin: 6px 0; }
        .bar-label { width: 200px; font-size: 14px; }
        .bar { background: rgb(100, 149, 237); height: 18px; margin-right: 8px; }
        .total { background: #3949ab; color: white; padding: 20px; margin-bottom: 15px; font-size: 32px; font-weight: bold; }

        .modal { display: none; position: fixed; inset: 0; background: rgba(0, 0, 0, 0.5); }
        .modal.active { display: flex; align-items: center; justify-content: center; }
        .modal form { background: white; padding: 20px; width: 500px; }
        .modal label { display: block; margin: 10px 0 5px 0; font-weight: bold; }
    </style>
</head>
<body>
    <h1>ScholarFlow</h1>
    <button onclick="openForm()">Add paper</button>
    <div id="status" class="status-message"></div>

    <div class="tabs">
        <div class="tab active" data-tab="library" onclick="showTab('library')">Library</div>
        <div class="tab" data-tab="analytics" onclick="showTab('analytics')">Analytics</div>
    </div>

    <div id="library" class="tab-content active">
        <div class="filters">
            <input type="text" id="search" placeholder="Search title, authors or abstract..." oninput="loadPapers()">
            <div id="categories"></div>
        </div>
        <div id="papers" class="grid"></div>
    </div>

    <div id="analytics" class="tab-content">
        <div class="total"><span id="total">0</span> papers</div>
        <div class="card">
            <h3>Category distribution</h3>
            <div id="distribution"></div>
        </div>
        <div class="card" style="margin-top: 15px;">
            <h3>Top categories</h3>
            <div id="top"></div>
        </div>
    </div>

    <div id="modal" class="modal">
        <form onsubmit="submitPaper(event)">
            <h2>Add paper</h2>
            <label>Title (optional with AI analysis)</label>
            <input type="text" id="f_title" oninput="updateSubmit()" placeholder="e.g. Attention Is All You Need">
            <label>Authors</label>
            <input type="text" id="f_authors">
            <label>Abstract / excerpt</label>
            <textarea id="f_abstract" rows="4" oninput="updateSubmit()"></textarea>
            <label>Screenshot (optional)</label>
            <input type="file" id="f_image" accept="image/*" onchange="readImage(event)">
            <label>Link</label>
            <input type="url" id="f_url" placeholder="https://arxiv.org/abs/...">
            <div style="margin-top: 15px;">
                <button type="button" onclick="closeForm()">Cancel</button>
                <button type="submit" id="f_submit" disabled>Add and classify</button>
            </div>
        </form>
    </div>

    <script>
        let selectedCategory = 'All';
        let imageData = null;
        let loading = false;

        function escapeHtml(text) {
            const div = document.createElement('div');
            div.textContent = text == null ? '' : String(text);
            return div.innerHTML;
        }

        function showStatus(message) {
            const status = document.getElementById('status');
            status.textContent = message;
            status.className = 'status-message error';
            setTimeout(() => { status.className = 'status-message'; }, 6000);
        }

        function showTab(name) {
            document.querySelectorAll('.tab').forEach(t => t.classList.toggle('active', t.dataset.tab === name));
            document.querySelectorAll('.tab-content').forEach(c => c.classList.toggle('active', c.id === name));
            if (name === 'analytics') loadStats(); else refresh();
        }

        function refresh() {
            loadCategories();
            loadPapers();
        }

        function loadCategories() {
            fetch('/api/categories').then(r => r.json()).then(categories => {
                if (!categories.includes(selectedCategory)) selectedCategory = 'All';
                document.getElementById('categories').innerHTML = categories.map(c =>
                    `<button class="chip ${c === selectedCategory ? 'active' : ''}" data-category="${escapeHtml(c)}">${escapeHtml(c)}</button>`
                ).join('');
                document.querySelectorAll('#categories .chip').forEach(b => b.onclick = () => {
                    selectedCategory = b.dataset.category;
                    loadCategories();
                    loadPapers();
                });
            });
        }

        function loadPapers() {
            const q = document.getElementById('search').value;
            const params = new URLSearchParams({ q: q, category: selectedCategory });
            fetch('/api/papers?' + params).then(r => r.json()).then(papers => {
                const container = document.getElementById('papers');
                if (papers.length === 0) {
                    container.innerHTML = '<div class="empty">Your library is empty. Add a paper manually or let the AI analyze one.</div>';
                    return;
                }
                container.innerHTML = papers.map(p => `
                    <div class="card">
                        <button class="danger" data-id="${p.id}" data-title="${escapeHtml(p.title)}">Delete</button>
                        <span class="category">${escapeHtml(p.category)}</span>
                        <h3>${escapeHtml(p.title)}</h3>
                        <div class="authors">${escapeHtml(p.authors || 'Unknown authors')}</div>
                        ${p.aiSummary ? `<div class="summary"><b>AI summary</b><br>${escapeHtml(p.aiSummary)}</div>` : ''}
                        <div>${p.tags.map(t => `<span class="tag">#${escapeHtml(t)}</span>`).join('')}</div>
                        <div class="info">Added ${new Date(p.dateAdded).toLocaleDateString()}
                            ${p.url ? ` &middot; <a href="${escapeHtml(p.url)}" target="_blank" rel="noopener noreferrer">Open</a>` : ''}</div>
                    </div>`).join('');
                container.querySelectorAll('button.danger').forEach(b => b.onclick = () => deletePaper(b.dataset.id, b.dataset.title));
            });
        }

        function loadStats() {
            fetch('/api/stats').then(r => r.json()).then(stats => {
                document.getElementById('total').textContent = stats.total;
                const max = Math.max(1, ...stats.categories.map(c => c.count));
                document.getElementById('distribution').innerHTML = stats.categories.map(c => `
                    <div class="bar-row"><span class="bar-label">${escapeHtml(c.name)}</span>
                    <span class="bar" style="width: ${Math.round(300 * c.count / max)}px"></span>${c.count}</div>`).join('')
                    || '<p class="info">No data yet</p>';
                document.getElementById('top').innerHTML = stats.top.map(c =>
                    `<div class="bar-row"><span class="bar-label">${escapeHtml(c.name)}</span><b>${c.count}</b></div>`).join('')
                    || '<p class="info">No data yet</p>';
            });
        }

        function deletePaper(id, title) {
            if (!confirm(`Delete "${title}"?`)) return;
            fetch('/api/papers/' + id, { method: 'DELETE' }).then(r => r.json().then(body => {
                if (!r.ok) showStatus(body.message);
                refresh();
            }));
        }

        function openForm() { document.getElementById('modal').classList.add('active'); }

        function closeForm() {
            document.getElementById('modal').classList.remove('active');
            ['f_title', 'f_authors', 'f_abstract', 'f_url', 'f_image'].forEach(id => document.getElementById(id).value = '');
            imageData = null;
            updateSubmit();
        }

        function readImage(event) {
            const file = event.target.files[0];
            if (!file) { imageData = null; updateSubmit(); return; }
            const reader = new FileReader();
            reader.onloadend = () => { imageData = reader.result; updateSubmit(); };
            reader.readAsDataURL(file);
        }

        function updateSubmit() {
            const hasInput = document.getElementById('f_title').value.trim()
                || document.getElementById('f_abstract').value.trim()
                || imageData;
            const button = document.getElementById('f_submit');
            button.disabled = loading || !hasInput;
            button.textContent = loading ? 'Analyzing...' : 'Add and classify';
        }

        function submitPaper(event) {
            event.preventDefault();
            loading = true;
            updateSubmit();
            fetch('/api/papers', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({
                    title: document.getElementById('f_title').value,
                    authors: document.getElementById('f_authors').value,
                    abstract: document.getElementById('f_abstract').value,
                    url: document.getElementById('f_url').value,
                    image: imageData
                })
            }).then(r => r.json().then(body => {
                if (r.ok) {
                    closeForm();
                    refresh();
                } else {
                    alert('Paper analysis failed. Please try again.\n' + body.message);
                }
            })).catch(e => alert('Paper analysis failed. Please try again.\n' + e))
              .finally(() => { loading = false; updateSubmit(); });
        }

        refresh();
    </script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::error::ExtractionError;
    use crate::library::MemoryStore;

    fn manual_state() -> Arc<AppState> {
        AppState::new(Library::open(MemoryStore::new()), IntakeDesk::new(None))
    }

    fn body_json(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[test]
    fn intake_errors_map_to_http_statuses() {
        assert_eq!(intake_status(&IntakeError::EmptyDraft), StatusCode::BAD_REQUEST);
        assert_eq!(intake_status(&IntakeError::Busy), StatusCode::CONFLICT);
        assert_eq!(
            intake_status(&IntakeError::Extraction(ExtractionError::MalformedResponse(
                "x".to_string()
            ))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            intake_status(&IntakeError::Store(StoreError::DuplicateId(Uuid::nil()))),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn intake_request_decodes_data_url_image() {
        let request: IntakeRequest = serde_json::from_str(
            r#"{"title": "", "authors": "", "abstract": "", "url": "", "image": "data:image/png;base64,AAAA"}"#,
        )
        .unwrap();
        let draft = request.into_draft();
        assert!(draft.is_submittable());
        assert_eq!(draft.image.unwrap().mime_type(), "image/png");
    }

    #[test]
    fn null_image_means_none() {
        let request: IntakeRequest =
            serde_json::from_str(r#"{"title": "T", "image": null}"#).unwrap();
        assert!(request.into_draft().image.is_none());
    }

    #[tokio::test]
    async fn empty_intake_is_a_bad_request() {
        let api = routes(manual_state());
        let response = warp::test::request()
            .method("POST")
            .path("/api/papers")
            .json(&json!({}))
            .reply(&api)
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response.body())["status"], "error");
    }

    #[tokio::test]
    async fn papers_can_be_added_listed_and_deleted() {
        let state = manual_state();
        let api = routes(state.clone());

        let created = warp::test::request()
            .method("POST")
            .path("/api/papers")
            .json(&json!({ "title": "Attention Is All You Need" }))
            .reply(&api)
            .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let paper = body_json(created.body());
        assert_eq!(paper["category"], "Uncategorized");
        assert_eq!(paper["status"], "analyzed");
        let id = paper["id"].as_str().unwrap().to_string();

        let listed = warp::test::request()
            .path("/api/papers?q=ATTENTION&category=Uncategorized")
            .reply(&api)
            .await;
        assert_eq!(listed.status(), StatusCode::OK);
        assert_eq!(body_json(listed.body()).as_array().unwrap().len(), 1);

        let filtered_out = warp::test::request()
            .path("/api/papers?category=Physics")
            .reply(&api)
            .await;
        assert!(body_json(filtered_out.body()).as_array().unwrap().is_empty());

        let stats = warp::test::request().path("/api/stats").reply(&api).await;
        assert_eq!(stats.status(), StatusCode::OK);
        assert_eq!(body_json(stats.body())["total"], 1);

        let unknown = warp::test::request()
            .method("DELETE")
            .path(&format!("/api/papers/{}", Uuid::new_v4()))
            .reply(&api)
            .await;
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
        assert_eq!(state.library().len(), 1);

        let removed = warp::test::request()
            .method("DELETE")
            .path(&format!("/api/papers/{}", id))
            .reply(&api)
            .await;
        assert_eq!(removed.status(), StatusCode::OK);
        assert_eq!(body_json(removed.body())["id"], id.as_str());

        let remaining = warp::test::request().path("/api/papers").reply(&api).await;
        assert!(body_json(remaining.body()).as_array().unwrap().is_empty());
    }
}

//! In-memory content source for tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use super::{CmsError, ContentSource, Cursor, PostPage, PostQuery};
use crate::content::{ContentBlock, PostDetail, PostSummary, RichText};

const CURSOR_PREFIX: &str = "fake://page/";

pub(crate) fn summary(uid: &str) -> PostSummary {
    PostSummary {
        uid: uid.to_string(),
        publication_date: None,
        title: format!("Title {}", uid),
        subtitle: format!("Subtitle {}", uid),
        author: "Ana".to_string(),
    }
}

pub(crate) fn detail(uid: &str, body: &str) -> PostDetail {
    PostDetail {
        uid: uid.to_string(),
        publication_date: None,
        last_modified: None,
        title: format!("Title {}", uid),
        banner_url: format!("https://images.example/{}.png", uid),
        author: "Ana".to_string(),
        content: vec![ContentBlock {
            heading: "Section".to_string(),
            body: RichText::from_paragraphs(&[body]),
        }],
    }
}

/// Serves a fixed listing split into pages, with hooks to inject failures
/// and to hold a request in flight
#[derive(Default)]
pub(crate) struct FakeSource {
    pages: Vec<Vec<PostSummary>>,
    details: HashMap<String, PostDetail>,
    previews: HashMap<String, String>,
    requests: AtomicUsize,
    fail_next: AtomicBool,
    delay: Option<Duration>,
    gate: Option<Arc<Notify>>,
    pub started: Arc<Notify>,
    references: Mutex<Vec<Option<String>>>,
}

impl FakeSource {
    pub fn with_pages(pages: Vec<Vec<&str>>) -> Self {
        let pages: Vec<Vec<PostSummary>> = pages
            .into_iter()
            .map(|uids| uids.into_iter().map(summary).collect())
            .collect();
        let details = pages
            .iter()
            .flatten()
            .map(|p| (p.uid.clone(), detail(&p.uid, "Hello world")))
            .collect();
        Self {
            pages,
            details,
            ..Default::default()
        }
    }

    pub fn with_detail(mut self, post: PostDetail) -> Self {
        self.details.insert(post.uid.clone(), post);
        self
    }

    pub fn without_detail(mut self, uid: &str) -> Self {
        self.details.remove(uid);
        self
    }

    pub fn with_preview(mut self, token: &str, path: &str) -> Self {
        self.previews.insert(token.to_string(), path.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Continuation requests wait until `gate` is notified
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn references(&self) -> Vec<Option<String>> {
        self.references.lock().unwrap().clone()
    }

    fn page(&self, index: usize) -> PostPage {
        let results = self.pages.get(index).cloned().unwrap_or_default();
        let next_page = (index + 1 < self.pages.len())
            .then(|| Cursor::new(format!("{}{}", CURSOR_PREFIX, index + 1)));
        PostPage { results, next_page }
    }
}

#[async_trait]
impl ContentSource for FakeSource {
    async fn query(&self, query: &PostQuery) -> Result<PostPage, CmsError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.references.lock().unwrap().push(query.reference.clone());
        Ok(self.page(0))
    }

    async fn next_page(&self, cursor: &Cursor) -> Result<PostPage, CmsError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(CmsError::Network("connection reset".to_string()));
        }
        let index = cursor
            .as_str()
            .strip_prefix(CURSOR_PREFIX)
            .and_then(|i| i.parse().ok())
            .ok_or_else(|| CmsError::malformed("unknown cursor"))?;
        Ok(self.page(index))
    }

    async fn get_by_uid(
        &self,
        uid: &str,
        reference: Option<&str>,
    ) -> Result<PostDetail, CmsError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.references
            .lock()
            .unwrap()
            .push(reference.map(str::to_string));
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(CmsError::Network("connection reset".to_string()));
        }
        self.details
            .get(uid)
            .cloned()
            .ok_or_else(|| CmsError::NotFound {
                doc_type: "posts".to_string(),
                uid: uid.to_string(),
            })
    }

    async fn resolve_preview(&self, token: &str, _document_id: &str) -> Result<String, CmsError> {
        self.previews
            .get(token)
            .cloned()
            .ok_or_else(|| CmsError::Unauthorized("Invalid token".to_string()))
    }
}

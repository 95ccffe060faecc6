//! Headless CMS access
//!
//! Everything the site renders comes through [`ContentSource`]. The
//! production implementation talks to the Prismic REST API; tests swap in
//! an in-memory source.

pub(crate) mod document;
mod error;
mod prismic;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::content::{PostDetail, PostSummary};

pub use error::CmsError;
pub use prismic::PrismicClient;

/// Opaque location of the next listing page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of the post listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostPage {
    pub results: Vec<PostSummary>,
    /// `None` on the last page
    pub next_page: Option<Cursor>,
}

/// Parameters of the first listing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    pub page_size: usize,
    /// Content release to read from; the published content when `None`
    pub reference: Option<String>,
}

impl PostQuery {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: Option<String>) -> Self {
        self.reference = reference;
        self
    }
}

/// The remote content API
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// First page of posts, newest first
    async fn query(&self, query: &PostQuery) -> Result<PostPage, CmsError>;

    /// The page a cursor points at
    async fn next_page(&self, cursor: &Cursor) -> Result<PostPage, CmsError>;

    /// A single post by slug
    async fn get_by_uid(&self, uid: &str, reference: Option<&str>)
        -> Result<PostDetail, CmsError>;

    /// Validate a preview token and return the path to redirect to
    async fn resolve_preview(&self, token: &str, document_id: &str) -> Result<String, CmsError>;
}

/// Run a CMS call, failing with [`CmsError::Timeout`] after `timeout`
pub async fn with_timeout<T, F>(timeout: Duration, call: F) -> Result<T, CmsError>
where
    F: Future<Output = Result<T, CmsError>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(CmsError::Timeout(timeout)))
}

//! Post list accumulation across listing pages
//!
//! The listing is shown one CMS page at a time. Each "load more" follows the
//! cursor of the last page and appends its posts, until the CMS stops
//! returning a cursor. A failed fetch never touches what is already shown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::cms::{with_timeout, CmsError, ContentSource, Cursor, PostPage};
use crate::content::PostSummary;

/// Result of a single "load more"
#[derive(Debug)]
pub enum LoadMore {
    /// A page was fetched and appended
    Appended { count: usize, has_more: bool },
    /// No cursor left; nothing was requested
    Exhausted,
    /// Another fetch on the same list is still in flight; nothing was requested
    Busy,
    /// The fetch failed; list and cursor are unchanged
    Failed(CmsError),
}

/// Posts shown so far plus the cursor to the next page
#[derive(Debug, Clone, Default)]
pub struct PostAccumulator {
    posts: Vec<PostSummary>,
    cursor: Option<Cursor>,
    pages_loaded: usize,
}

impl PostAccumulator {
    /// Start from the first listing page
    pub fn new(first: PostPage) -> Self {
        Self {
            posts: first.results,
            cursor: first.next_page,
            pages_loaded: 1,
        }
    }

    pub fn posts(&self) -> &[PostSummary] {
        &self.posts
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    /// Whether "load more" should be offered
    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }

    /// Pages merged so far, including the first one
    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }

    pub fn into_posts(self) -> Vec<PostSummary> {
        self.posts
    }

    /// Fetch the page at the stored cursor and append it.
    ///
    /// `&mut self` keeps calls on one accumulator sequential; use
    /// [`SharedAccumulator`] when triggers can overlap.
    pub async fn fetch_more<S>(&mut self, source: &S, timeout: Duration) -> LoadMore
    where
        S: ContentSource + ?Sized,
    {
        let Some(cursor) = self.cursor.as_ref() else {
            return LoadMore::Exhausted;
        };

        match with_timeout(timeout, source.next_page(cursor)).await {
            Ok(page) => self.append(page),
            Err(e) => LoadMore::Failed(e),
        }
    }

    fn append(&mut self, page: PostPage) -> LoadMore {
        let count = page.results.len();
        self.posts.extend(page.results);
        self.cursor = page.next_page;
        self.pages_loaded += 1;

        tracing::debug!(
            "Appended {} posts ({} total, more: {})",
            count,
            self.posts.len(),
            self.has_more()
        );

        LoadMore::Appended {
            count,
            has_more: self.has_more(),
        }
    }

    /// Follow cursors until the listing is exhausted.
    ///
    /// Returns the first failure; posts fetched before it are discarded.
    pub async fn drain<S>(
        mut self,
        source: &S,
        timeout: Duration,
    ) -> Result<Vec<PostSummary>, CmsError>
    where
        S: ContentSource + ?Sized,
    {
        loop {
            match self.fetch_more(source, timeout).await {
                LoadMore::Appended { .. } => {}
                LoadMore::Exhausted | LoadMore::Busy => return Ok(self.posts),
                LoadMore::Failed(e) => return Err(e),
            }
        }
    }
}

/// An accumulator shared between request handlers.
///
/// A trigger arriving while another fetch is in flight is ignored
/// (`LoadMore::Busy`) so a page can never be appended twice. The state lock
/// is only held to read the cursor and to append, never across the fetch,
/// so readers neither wait on the CMS nor look like a fetch.
#[derive(Debug, Clone, Default)]
pub struct SharedAccumulator {
    state: Arc<Mutex<PostAccumulator>>,
    fetching: Arc<AtomicBool>,
}

/// Point-in-time copy of a shared accumulator
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub posts: Vec<PostSummary>,
    pub has_more: bool,
    pub pages_loaded: usize,
}

/// Clears the in-flight flag when the fetch ends or is cancelled
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SharedAccumulator {
    pub fn new(accumulator: PostAccumulator) -> Self {
        Self {
            state: Arc::new(Mutex::new(accumulator)),
            fetching: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn fetch_more<S>(&self, source: &S, timeout: Duration) -> LoadMore
    where
        S: ContentSource + ?Sized,
    {
        if self
            .fetching
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            tracing::debug!("Load more ignored, a fetch is already in flight");
            return LoadMore::Busy;
        }
        let _in_flight = InFlight(&self.fetching);

        let Some(cursor) = self.state.lock().await.cursor().cloned() else {
            return LoadMore::Exhausted;
        };

        match with_timeout(timeout, source.next_page(&cursor)).await {
            Ok(page) => self.state.lock().await.append(page),
            Err(e) => LoadMore::Failed(e),
        }
    }

    /// Current posts
    pub async fn snapshot(&self) -> Snapshot {
        let accumulator = self.state.lock().await;
        Snapshot {
            posts: accumulator.posts.clone(),
            has_more: accumulator.has_more(),
            pages_loaded: accumulator.pages_loaded,
        }
    }
}

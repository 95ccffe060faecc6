//! Post models and listing navigation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reading_time::ReadingTime;
use super::rich_text::RichText;
use crate::helpers::post_path;

/// A post as it appears in the listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    /// Unique slug, the post's identity
    pub uid: String,

    /// First publication date (absent for never-published drafts)
    pub publication_date: Option<DateTime<Utc>>,

    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// A fully fetched post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDetail {
    pub uid: String,
    pub publication_date: Option<DateTime<Utc>>,

    /// Last publication date, when the CMS reports one
    pub last_modified: Option<DateTime<Utc>>,

    pub title: String,
    pub banner_url: String,
    pub author: String,
    pub content: Vec<ContentBlock>,
}

/// A titled section of a post body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub heading: String,
    pub body: RichText,
}

impl ContentBlock {
    pub fn body_html(&self) -> String {
        self.body.as_html()
    }
}

impl PostDetail {
    /// Estimated reading time of the content
    pub fn reading_time(&self) -> ReadingTime {
        ReadingTime::from_content(&self.content)
    }

    /// Whether the post was republished after its first publication
    pub fn was_edited(&self) -> bool {
        match (self.publication_date, self.last_modified) {
            (Some(first), Some(last)) => last > first,
            _ => false,
        }
    }
}

/// Link to a neighbouring post
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavPost {
    pub uid: String,
    pub title: String,
    pub path: String,
}

impl From<&PostSummary> for NavPost {
    fn from(post: &PostSummary) -> Self {
        Self {
            uid: post.uid.clone(),
            title: post.title.clone(),
            path: post_path(&post.uid),
        }
    }
}

/// Previous/next posts around the current one
///
/// The listing is ordered newest first, so `previous` is the older post
/// (one position later) and `next` the newer one (one position earlier).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NavigationNeighbors {
    pub previous: Option<NavPost>,
    pub next: Option<NavPost>,
}

impl NavigationNeighbors {
    /// Resolve the neighbours of `uid` in `listing`.
    ///
    /// Returns `None` when `uid` is not in the listing.
    pub fn resolve(listing: &[PostSummary], uid: &str) -> Option<Self> {
        let pos = listing.iter().position(|p| p.uid == uid)?;
        Some(Self::at(listing, pos))
    }

    /// Neighbours of the post at `index`
    pub fn at(listing: &[PostSummary], index: usize) -> Self {
        let previous = listing.get(index + 1).map(NavPost::from);
        let next = index
            .checked_sub(1)
            .and_then(|i| listing.get(i))
            .map(NavPost::from);
        Self { previous, next }
    }
}

/// Site path a CMS document links to
///
/// Posts live under `/post/<uid>`; every other document resolves to the
/// home page.
pub fn document_path(doc_type: &str, uid: Option<&str>) -> String {
    match (doc_type, uid) {
        ("posts", Some(uid)) if !uid.is_empty() => post_path(uid),
        _ => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn summary(uid: &str) -> PostSummary {
        PostSummary {
            uid: uid.to_string(),
            publication_date: None,
            title: uid.to_uppercase(),
            subtitle: String::new(),
            author: "Author".to_string(),
        }
    }

    #[test]
    fn test_neighbors_middle() {
        let listing = vec![summary("a"), summary("b"), summary("c")];
        let nav = NavigationNeighbors::resolve(&listing, "b").unwrap();
        assert_eq!(nav.previous.unwrap().uid, "c");
        assert_eq!(nav.next.unwrap().uid, "a");
    }

    #[test]
    fn test_neighbors_edges() {
        let listing = vec![summary("a"), summary("b"), summary("c")];

        let first = NavigationNeighbors::resolve(&listing, "a").unwrap();
        assert_eq!(first.previous.as_ref().map(|p| p.uid.as_str()), Some("b"));
        assert!(first.next.is_none());

        let last = NavigationNeighbors::resolve(&listing, "c").unwrap();
        assert!(last.previous.is_none());
        assert_eq!(last.next.as_ref().map(|p| p.title.as_str()), Some("B"));
    }

    #[test]
    fn test_neighbors_follow_index_rule() {
        let listing: Vec<_> = ["p0", "p1", "p2", "p3", "p4"]
            .iter()
            .map(|uid| summary(uid))
            .collect();
        for i in 0..listing.len() {
            let nav = NavigationNeighbors::at(&listing, i);
            let expected_previous = listing.get(i + 1).map(|p| p.uid.clone());
            let expected_next = i.checked_sub(1).map(|j| listing[j].uid.clone());
            assert_eq!(nav.previous.map(|p| p.uid), expected_previous);
            assert_eq!(nav.next.map(|p| p.uid), expected_next);
        }
    }

    #[test]
    fn test_neighbors_unknown_uid() {
        let listing = vec![summary("a"), summary("b")];
        assert!(NavigationNeighbors::resolve(&listing, "zzz").is_none());
        assert!(NavigationNeighbors::resolve(&[], "a").is_none());
    }

    #[test]
    fn test_single_post_has_no_neighbors() {
        let listing = vec![summary("only")];
        let nav = NavigationNeighbors::resolve(&listing, "only").unwrap();
        assert_eq!(nav, NavigationNeighbors::default());
    }

    #[test]
    fn test_nav_post_path() {
        let nav = NavPost::from(&summary("hello-world"));
        assert_eq!(nav.path, "/post/hello-world");
    }

    #[test]
    fn test_document_path() {
        assert_eq!(document_path("posts", Some("hello")), "/post/hello");
        assert_eq!(document_path("posts", None), "/");
        assert_eq!(document_path("page", Some("about")), "/");
    }

    #[test]
    fn test_was_edited() {
        let first = Utc.with_ymd_and_hms(2021, 3, 25, 10, 0, 0).unwrap();
        let mut post = PostDetail {
            uid: "p".to_string(),
            publication_date: Some(first),
            last_modified: Some(first),
            title: "T".to_string(),
            banner_url: String::new(),
            author: "A".to_string(),
            content: Vec::new(),
        };
        assert!(!post.was_edited());

        post.last_modified = Some(Utc.with_ymd_and_hms(2021, 3, 26, 10, 0, 0).unwrap());
        assert!(post.was_edited());

        post.publication_date = None;
        assert!(!post.was_edited());
    }
}

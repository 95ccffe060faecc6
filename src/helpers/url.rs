//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::config::SiteConfig;

/// Characters escaped inside a single path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Site-relative path of a post page
///
/// # Examples
/// ```ignore
/// post_path("hello-world") // -> "/post/hello-world"
/// ```
pub fn post_path(uid: &str) -> String {
    format!("/post/{}", utf8_percent_encode(uid, PATH_SEGMENT))
}

/// Site-relative path of the n-th accumulated listing page (1-based)
pub fn listing_path(page: usize) -> String {
    if page <= 1 {
        "/".to_string()
    } else {
        format!("/page/{}/", page)
    }
}

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// full_url_for(&config, "/post/hello") // -> "https://example.com/post/hello"
/// ```
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    let base = config.url.trim_end_matches('/');
    format!("{}/{}", base, path.trim_start_matches('/'))
}

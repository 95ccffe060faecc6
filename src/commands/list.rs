//! List the posts published in the CMS

use anyhow::{Context, Result};

use crate::cms::{with_timeout, ContentSource, PostQuery};
use crate::content::PostSummary;
use crate::helpers::{full_url_for, post_path};
use crate::pagination::PostAccumulator;
use crate::Blog;

/// Print every post, newest first
pub async fn run(blog: &Blog, reference: Option<&str>) -> Result<()> {
    let source = blog.content_source()?;
    let posts = fetch_all(blog, &source, reference).await?;

    println!("Posts ({}):", posts.len());
    for post in &posts {
        println!("  {}", describe(blog, post));
    }

    Ok(())
}

async fn fetch_all(
    blog: &Blog,
    source: &dyn ContentSource,
    reference: Option<&str>,
) -> Result<Vec<PostSummary>> {
    let cms = &blog.config.cms;
    let query = PostQuery::new(cms.page_size).with_reference(reference.map(str::to_string));

    let first = with_timeout(cms.timeout(), source.query(&query))
        .await
        .context("Failed to fetch the post listing")?;
    let posts = PostAccumulator::new(first)
        .drain(source, cms.timeout())
        .await
        .context("Failed to fetch the post listing")?;
    Ok(posts)
}

fn describe(blog: &Blog, post: &PostSummary) -> String {
    let date = post
        .publication_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "draft".to_string());
    format!(
        "{} - {} [{}]",
        date,
        post.title,
        full_url_for(&blog.config, &post_path(&post.uid))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::testing::{summary, FakeSource};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fetch_all_follows_cursors_with_reference() {
        let dir = TempDir::new().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        let source = FakeSource::with_pages(vec![vec!["a", "b"], vec!["c"]]);

        let posts = fetch_all(&blog, &source, Some("release-ref")).await.unwrap();

        let uids: Vec<_> = posts.iter().map(|p| p.uid.as_str()).collect();
        assert_eq!(uids, ["a", "b", "c"]);
        assert_eq!(source.references(), [Some("release-ref".to_string())]);
    }

    #[test]
    fn test_describe() {
        let dir = TempDir::new().unwrap();
        let mut blog = Blog::new(dir.path()).unwrap();
        blog.config.url = "https://blog.example".to_string();

        let mut post = summary("hello");
        assert_eq!(
            describe(&blog, &post),
            "draft - Title hello [https://blog.example/post/hello]"
        );

        post.publication_date = Some(Utc.with_ymd_and_hms(2021, 3, 25, 12, 0, 0).unwrap());
        assert!(describe(&blog, &post).starts_with("2021-03-25 - "));
    }
}

//! Generator module - renders the CMS content into static HTML files

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cms::{with_timeout, ContentSource, PostQuery};
use crate::content::{NavigationNeighbors, PostSummary};
use crate::helpers::listing_path;
use crate::pagination::{LoadMore, PostAccumulator};
use crate::templates::{LoadMoreLink, PageState, TemplateRenderer, STYLESHEET};
use crate::Blog;

/// What a generation run wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateReport {
    /// Listing snapshots written (`index.html` plus `page/<n>/`)
    pub listing_pages: usize,
    /// Post pages written
    pub posts: usize,
    /// Posts that could not be fetched or rendered
    pub skipped: Vec<String>,
}

/// Static site generator
pub struct Generator {
    blog: Blog,
    renderer: TemplateRenderer,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self> {
        let renderer = TemplateRenderer::new(&blog.config)?;

        Ok(Self {
            blog: blog.clone(),
            renderer,
        })
    }

    /// Generate the entire site from `source`
    pub async fn generate(&self, source: &dyn ContentSource) -> Result<GenerateReport> {
        let public_dir = &self.blog.public_dir;
        fs::create_dir_all(public_dir)
            .with_context(|| format!("Failed to create {:?}", public_dir))?;

        let mut report = GenerateReport::default();

        let listing = self.generate_listing_pages(source, &mut report).await?;
        tracing::info!(
            "Generated {} listing pages for {} posts",
            report.listing_pages,
            listing.len()
        );

        self.generate_post_pages(source, &listing, &mut report).await?;

        write_file(&public_dir.join("style.css"), STYLESHEET)?;

        Ok(report)
    }

    /// Render one listing snapshot per loaded page and return the full
    /// listing, newest first
    async fn generate_listing_pages(
        &self,
        source: &dyn ContentSource,
        report: &mut GenerateReport,
    ) -> Result<Vec<PostSummary>> {
        let cms = &self.blog.config.cms;
        let timeout = cms.timeout();

        let first = with_timeout(timeout, source.query(&PostQuery::new(cms.page_size)))
            .await
            .context("Failed to fetch the post listing")?;
        let mut accumulator = PostAccumulator::new(first);
        self.write_listing_page(&accumulator, report)?;

        loop {
            match accumulator.fetch_more(source, timeout).await {
                LoadMore::Appended { count, .. } => {
                    tracing::debug!("Fetched {} more posts", count);
                    self.write_listing_page(&accumulator, report)?;
                }
                LoadMore::Exhausted => break,
                LoadMore::Busy => bail!("Listing is already being fetched"),
                LoadMore::Failed(e) => {
                    return Err(e).context(format!(
                        "Failed to fetch listing page {}",
                        accumulator.pages_loaded() + 1
                    ))
                }
            }
        }

        Ok(accumulator.into_posts())
    }

    fn write_listing_page(
        &self,
        accumulator: &PostAccumulator,
        report: &mut GenerateReport,
    ) -> Result<()> {
        let page = accumulator.pages_loaded();
        let load_more = accumulator
            .has_more()
            .then(|| LoadMoreLink::link(listing_path(page + 1)));

        let html = self.renderer.render_index(
            accumulator.posts(),
            load_more.as_ref(),
            &PageState::default(),
        )?;

        let output_path = self.listing_output_path(page);
        write_file(&output_path, &html)?;
        tracing::debug!("Generated: {:?}", output_path);

        report.listing_pages += 1;
        Ok(())
    }

    fn listing_output_path(&self, page: usize) -> PathBuf {
        if page <= 1 {
            self.blog.public_dir.join("index.html")
        } else {
            self.blog
                .public_dir
                .join(format!("page/{}/index.html", page))
        }
    }

    /// Render every post of the listing. A post that fails is skipped.
    async fn generate_post_pages(
        &self,
        source: &dyn ContentSource,
        listing: &[PostSummary],
        report: &mut GenerateReport,
    ) -> Result<()> {
        let timeout = self.blog.config.cms.timeout();

        for (i, summary) in listing.iter().enumerate() {
            match self.generate_post_page(source, listing, i, timeout).await {
                Ok(output_path) => {
                    tracing::debug!("Generated post: {:?}", output_path);
                    report.posts += 1;
                }
                Err(e) => {
                    tracing::warn!("Skipping post {}: {:#}", summary.uid, e);
                    report.skipped.push(summary.uid.clone());
                }
            }
        }

        tracing::info!(
            "Generated {} posts ({} skipped)",
            report.posts,
            report.skipped.len()
        );
        Ok(())
    }

    async fn generate_post_page(
        &self,
        source: &dyn ContentSource,
        listing: &[PostSummary],
        index: usize,
        timeout: Duration,
    ) -> Result<PathBuf> {
        let uid = &listing[index].uid;
        if uid.is_empty() || uid.contains(['/', '\\']) || uid == "." || uid == ".." {
            bail!("uid {:?} is not a valid file name", uid);
        }

        let post = with_timeout(timeout, source.get_by_uid(uid, None)).await?;
        let nav = NavigationNeighbors::at(listing, index);
        let html = self
            .renderer
            .render_post(&post, &nav, &PageState::default())?;

        let output_path = self
            .blog
            .public_dir
            .join("post")
            .join(uid)
            .join("index.html");
        write_file(&output_path, &html)?;
        Ok(output_path)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create dir {:?}", parent))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::testing::{detail, FakeSource};
    use tempfile::TempDir;

    fn setup() -> (TempDir, Blog) {
        let dir = TempDir::new().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        (dir, blog)
    }

    fn read(blog: &Blog, path: &str) -> String {
        fs::read_to_string(blog.public_dir.join(path)).unwrap()
    }

    #[tokio::test]
    async fn test_generate_listing_snapshots() {
        let (_dir, blog) = setup();
        let source = FakeSource::with_pages(vec![vec!["a", "b"], vec!["c", "d"], vec!["e"]]);

        let report = Generator::new(&blog)
            .unwrap()
            .generate(&source)
            .await
            .unwrap();

        assert_eq!(report.listing_pages, 3);
        assert_eq!(report.posts, 5);
        assert!(report.skipped.is_empty());

        let index = read(&blog, "index.html");
        assert!(index.contains("/post/b"));
        assert!(!index.contains("/post/c"));
        assert!(index.contains(r#"href="/page/2/""#));

        let page2 = read(&blog, "page/2/index.html");
        assert!(page2.contains("/post/a"));
        assert!(page2.contains("/post/d"));
        assert!(page2.contains(r#"href="/page/3/""#));

        let page3 = read(&blog, "page/3/index.html");
        assert!(page3.contains("/post/e"));
        assert!(!page3.contains("Carregar mais posts"));

        assert!(blog.public_dir.join("style.css").exists());
    }

    #[tokio::test]
    async fn test_generate_post_neighbours() {
        let (_dir, blog) = setup();
        let source = FakeSource::with_pages(vec![vec!["c", "b"], vec!["a"]]);

        Generator::new(&blog)
            .unwrap()
            .generate(&source)
            .await
            .unwrap();

        let newest = read(&blog, "post/c/index.html");
        assert!(newest.contains(r#"class="previous" href="/post/b""#));
        assert!(!newest.contains(r#"class="next""#));

        let middle = read(&blog, "post/b/index.html");
        assert!(middle.contains(r#"class="previous" href="/post/a""#));
        assert!(middle.contains(r#"class="next" href="/post/c""#));

        let oldest = read(&blog, "post/a/index.html");
        assert!(!oldest.contains(r#"class="previous""#));
        assert!(oldest.contains(r#"class="next" href="/post/b""#));
    }

    #[tokio::test]
    async fn test_generate_skips_missing_post() {
        let (_dir, blog) = setup();
        let source = FakeSource::with_pages(vec![vec!["a", "ghost"]])
            .with_detail(detail("a", "one two three"))
            .without_detail("ghost");

        let report = Generator::new(&blog)
            .unwrap()
            .generate(&source)
            .await
            .unwrap();

        assert_eq!(report.posts, 1);
        assert_eq!(report.skipped, ["ghost"]);
        assert!(blog.public_dir.join("post/a/index.html").exists());
        assert!(!blog.public_dir.join("post/ghost").exists());
    }

    #[tokio::test]
    async fn test_generate_listing_failure_aborts() {
        let (_dir, blog) = setup();
        let source = FakeSource::with_pages(vec![vec!["a"], vec!["b"]]);
        source.fail_next();

        let result = Generator::new(&blog).unwrap().generate(&source).await;
        assert!(result.is_err());
        assert!(!blog.public_dir.join("post/a/index.html").exists());
    }
}

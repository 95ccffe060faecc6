//! Built-in spacetravelling theme using the Tera template engine
//!
//! Templates are embedded in the binary. Autoescaping is off; templates
//! escape CMS text explicitly with `| escape` and emit pre-rendered rich
//! text as is.

use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::content::{NavigationNeighbors, PostDetail, PostSummary};
use crate::helpers::{date_xml, format_date, post_path};

/// Stylesheet written next to the generated pages
pub const STYLESHEET: &str = include_str!("spacetravelling/style.css");

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
    config: SiteConfig,
    site: SiteData,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("spacetravelling/layout.html")),
            ("index.html", include_str!("spacetravelling/index.html")),
            ("post.html", include_str!("spacetravelling/post.html")),
            ("not_found.html", include_str!("spacetravelling/not_found.html")),
            ("error.html", include_str!("spacetravelling/error.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("spacetravelling/partials/header.html"),
            ),
            (
                "partials/exit_preview.html",
                include_str!("spacetravelling/partials/exit_preview.html"),
            ),
            (
                "partials/comments.html",
                include_str!("spacetravelling/partials/comments.html"),
            ),
        ])?;

        Ok(Self {
            tera,
            config: config.clone(),
            site: SiteData::from_config(config),
        })
    }

    /// Render the post listing
    pub fn render_index(
        &self,
        posts: &[PostSummary],
        load_more: Option<&LoadMoreLink>,
        state: &PageState,
    ) -> Result<String> {
        let items: Vec<PostListItem> = posts.iter().map(|p| self.list_item(p)).collect();

        let mut context = self.base_context(state);
        context.insert("posts", &items);
        context.insert("load_more", &load_more);
        self.render("index.html", &context)
    }

    /// Render a post page
    pub fn render_post(
        &self,
        post: &PostDetail,
        nav: &NavigationNeighbors,
        state: &PageState,
    ) -> Result<String> {
        let view = self.post_view(post);
        let comments = self
            .config
            .comments
            .enable
            .then(|| CommentsData::from_config(&self.config));

        let mut context = self.base_context(state);
        context.insert("post", &view);
        context.insert("nav", nav);
        context.insert("comments", &comments);
        self.render("post.html", &context)
    }

    pub fn render_not_found(&self, state: &PageState) -> Result<String> {
        self.render("not_found.html", &self.base_context(state))
    }

    /// Render a failure page with a link retrying `retry`
    pub fn render_error(&self, message: &str, retry: &str, state: &PageState) -> Result<String> {
        let mut context = self.base_context(state);
        context.insert("message", message);
        context.insert("retry", retry);
        self.render("error.html", &context)
    }

    fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    fn base_context(&self, state: &PageState) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site);
        context.insert("state", state);
        context
    }

    fn format_date(&self, date: &chrono::DateTime<chrono::Utc>) -> String {
        format_date(
            date,
            &self.config.date_format,
            &self.config.language,
            &self.config.timezone,
        )
    }

    fn list_item(&self, post: &PostSummary) -> PostListItem {
        PostListItem {
            path: post_path(&post.uid),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            date: post.publication_date.as_ref().map(|d| self.format_date(d)),
            datetime: post.publication_date.as_ref().map(date_xml),
        }
    }

    fn post_view(&self, post: &PostDetail) -> PostView {
        let reading_time = post.reading_time();
        PostView {
            title: post.title.clone(),
            banner_url: post.banner_url.clone(),
            author: post.author.clone(),
            date: post.publication_date.as_ref().map(|d| self.format_date(d)),
            datetime: post.publication_date.as_ref().map(date_xml),
            edited: if post.was_edited() {
                post.last_modified.as_ref().map(|d| self.format_date(d))
            } else {
                None
            },
            reading_minutes: reading_time.minutes,
            words: reading_time.words,
            content: post
                .content
                .iter()
                .map(|block| BlockView {
                    heading: block.heading.clone(),
                    html: block.body_html(),
                })
                .collect(),
        }
    }
}

/// Per-request page state
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageState {
    /// Reading a preview ref; shows the exit button and the CMS toolbar
    pub preview: bool,
    /// Message shown above the content
    pub notice: Option<String>,
}

/// Target of the "load more" affordance
#[derive(Debug, Clone, Serialize)]
pub struct LoadMoreLink {
    pub href: String,
    /// `get` for a plain link, `post` for a form button
    pub method: &'static str,
}

impl LoadMoreLink {
    pub fn link(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            method: "get",
        }
    }

    pub fn form(action: impl Into<String>) -> Self {
        Self {
            href: action.into(),
            method: "post",
        }
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub language: String,
    pub url: String,
    /// Repository name for the Prismic preview toolbar
    pub prismic_repo: Option<String>,
}

impl SiteData {
    fn from_config(config: &SiteConfig) -> Self {
        let prismic_repo = reqwest::Url::parse(&config.cms.api_endpoint)
            .ok()
            .and_then(|url| {
                url.host_str()
                    .and_then(|host| host.split('.').next())
                    .map(str::to_string)
            });
        Self {
            title: config.title.clone(),
            description: config.description.clone(),
            language: config.language.clone(),
            url: config.url.clone(),
            prismic_repo,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostListItem {
    pub path: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: Option<String>,
    pub datetime: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub title: String,
    pub banner_url: String,
    pub author: String,
    pub date: Option<String>,
    pub datetime: Option<String>,
    pub edited: Option<String>,
    pub reading_minutes: usize,
    pub words: usize,
    pub content: Vec<BlockView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockView {
    pub heading: String,
    pub html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentsData {
    pub repo: String,
    pub issue_term: String,
    pub theme: String,
}

impl CommentsData {
    fn from_config(config: &SiteConfig) -> Self {
        Self {
            repo: config.comments.repo.clone(),
            issue_term: config.comments.issue_term.clone(),
            theme: config.comments.theme.clone(),
        }
    }
}

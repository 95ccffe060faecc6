//! Blog server
//!
//! Renders pages on demand from the CMS. Each browser gets its own post
//! accumulator, advanced by `POST /load-more` and shown again through
//! `GET /?continue=true`. Preview mode is carried by a cookie holding the
//! preview ref.

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use indexmap::IndexMap;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::cms::{with_timeout, CmsError, ContentSource, PostQuery};
use crate::config::SiteConfig;
use crate::content::NavigationNeighbors;
use crate::helpers::post_path;
use crate::pagination::{LoadMore, PostAccumulator, SharedAccumulator};
use crate::templates::{LoadMoreLink, PageState, TemplateRenderer, STYLESHEET};
use crate::Blog;

/// Cookie holding the preview ref
pub const PREVIEW_COOKIE: &str = "spacetravelling_preview";

/// Cookie holding the listing session id
pub const SESSION_COOKIE: &str = "spacetravelling_session";

/// Listing sessions kept in memory; the oldest is dropped first
const MAX_SESSIONS: usize = 256;

const LOAD_MORE_FAILED: &str = "Não foi possível carregar mais posts. Tente novamente.";
const LOAD_MORE_BUSY: &str = "Ainda estamos carregando mais posts. Aguarde e tente novamente.";

/// Server state
pub struct ServerState {
    source: Arc<dyn ContentSource>,
    renderer: TemplateRenderer,
    config: SiteConfig,
    public_dir: PathBuf,
    sessions: Mutex<IndexMap<String, SharedAccumulator>>,
}

impl ServerState {
    pub fn new(
        config: &SiteConfig,
        public_dir: PathBuf,
        source: Arc<dyn ContentSource>,
    ) -> Result<Self> {
        Ok(Self {
            source,
            renderer: TemplateRenderer::new(config)?,
            config: config.clone(),
            public_dir,
            sessions: Mutex::new(IndexMap::new()),
        })
    }

    async fn session(&self, jar: &CookieJar) -> Option<SharedAccumulator> {
        let id = jar.get(SESSION_COOKIE)?.value();
        self.sessions.lock().await.get(id).cloned()
    }

    /// Fetch the first listing page into a new session, replacing `previous`
    async fn start_session(
        &self,
        previous: Option<&str>,
        reference: Option<String>,
    ) -> Result<(String, SharedAccumulator), CmsError> {
        let cms = &self.config.cms;
        let query = PostQuery::new(cms.page_size).with_reference(reference);
        let first = with_timeout(cms.timeout(), self.source.query(&query)).await?;
        let accumulator = SharedAccumulator::new(PostAccumulator::new(first));

        let id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.lock().await;
        if let Some(previous) = previous {
            sessions.shift_remove(previous);
        }
        while sessions.len() >= MAX_SESSIONS {
            sessions.shift_remove_index(0);
        }
        sessions.insert(id.clone(), accumulator.clone());
        tracing::debug!("Started listing session {} ({} active)", id, sessions.len());

        Ok((id, accumulator))
    }

    /// Neighbours of `uid` in the full listing; none when it cannot be resolved
    async fn neighbors(&self, uid: &str, reference: Option<String>) -> NavigationNeighbors {
        let cms = &self.config.cms;
        let query = PostQuery::new(cms.page_size).with_reference(reference);
        let listing = match with_timeout(cms.timeout(), self.source.query(&query)).await {
            Ok(first) => {
                PostAccumulator::new(first)
                    .drain(self.source.as_ref(), cms.timeout())
                    .await
            }
            Err(e) => Err(e),
        };

        match listing {
            Ok(listing) => NavigationNeighbors::resolve(&listing, uid).unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Failed to load neighbours of {}: {}", uid, e);
                NavigationNeighbors::default()
            }
        }
    }

    fn error_response(&self, err: CmsError, retry: &str, page_state: &PageState) -> Response {
        let status = status_for(&err);
        let html = if status == StatusCode::NOT_FOUND {
            tracing::debug!("{}", err);
            self.renderer.render_not_found(page_state)
        } else {
            tracing::error!("CMS request failed: {}", err);
            self.renderer.render_error(&err.to_string(), retry, page_state)
        };

        match html {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => internal_error(e),
        }
    }
}

/// Build the application router
pub fn router(state: Arc<ServerState>) -> Router {
    let public = ServeDir::new(&state.public_dir).append_index_html_on_directories(true);

    Router::new()
        .route("/", get(home))
        .route("/load-more", post(load_more))
        .route("/post/:slug", get(post_page))
        .route("/api/preview", get(preview))
        .route("/api/exit-preview", get(exit_preview))
        .route("/style.css", get(stylesheet))
        .fallback_service(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(blog: &Blog, ip: &str, port: u16, open: bool) -> Result<()> {
    let source: Arc<dyn ContentSource> = Arc::new(blog.content_source()?);
    let state = Arc::new(ServerState::new(
        &blog.config,
        blog.public_dir.clone(),
        source,
    )?);
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    // Open browser if requested
    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Debug, Default, Deserialize)]
struct HomeParams {
    #[serde(rename = "continue", default)]
    resume: bool,
    #[serde(default)]
    failed: bool,
    #[serde(default)]
    busy: bool,
}

impl HomeParams {
    fn notice(&self) -> Option<String> {
        if self.failed {
            Some(LOAD_MORE_FAILED.to_string())
        } else if self.busy {
            Some(LOAD_MORE_BUSY.to_string())
        } else {
            None
        }
    }
}

async fn home(
    State(state): State<Arc<ServerState>>,
    jar: CookieJar,
    Query(params): Query<HomeParams>,
) -> Response {
    let page_state = page_state(&jar, params.notice());

    let existing = if params.resume {
        state.session(&jar).await
    } else {
        None
    };

    let (jar, accumulator) = match existing {
        Some(accumulator) => (jar, accumulator),
        None => {
            let previous = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
            match state
                .start_session(previous.as_deref(), preview_ref(&jar))
                .await
            {
                Ok((id, accumulator)) => (jar.add(session_cookie(id)), accumulator),
                Err(e) => return state.error_response(e, "/", &page_state),
            }
        }
    };

    let snapshot = accumulator.snapshot().await;
    let load_more = snapshot
        .has_more
        .then(|| LoadMoreLink::form("/load-more"));

    match state
        .renderer
        .render_index(&snapshot.posts, load_more.as_ref(), &page_state)
    {
        Ok(html) => (jar, Html(html)).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn load_more(State(state): State<Arc<ServerState>>, jar: CookieJar) -> Redirect {
    let Some(accumulator) = state.session(&jar).await else {
        return Redirect::to("/");
    };

    match accumulator
        .fetch_more(state.source.as_ref(), state.config.cms.timeout())
        .await
    {
        LoadMore::Failed(e) => {
            tracing::warn!("Load more failed: {}", e);
            Redirect::to("/?continue=true&failed=true")
        }
        LoadMore::Appended { count, has_more } => {
            tracing::debug!("Loaded {} more posts (more: {})", count, has_more);
            Redirect::to("/?continue=true")
        }
        LoadMore::Busy => {
            tracing::debug!("Load more ignored for a busy session");
            Redirect::to("/?continue=true&busy=true")
        }
        LoadMore::Exhausted => Redirect::to("/?continue=true"),
    }
}

async fn post_page(
    State(state): State<Arc<ServerState>>,
    jar: CookieJar,
    Path(slug): Path<String>,
) -> Response {
    let page_state = page_state(&jar, None);
    let reference = preview_ref(&jar);

    let post = match with_timeout(
        state.config.cms.timeout(),
        state.source.get_by_uid(&slug, reference.as_deref()),
    )
    .await
    {
        Ok(post) => post,
        Err(e) => return state.error_response(e, &post_path(&slug), &page_state),
    };

    let nav = state.neighbors(&post.uid, reference).await;
    match state.renderer.render_post(&post, &nav, &page_state) {
        Ok(html) => Html(html).into_response(),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Default, Deserialize)]
struct PreviewParams {
    #[serde(default)]
    token: String,
    #[serde(rename = "documentId", default)]
    document_id: String,
}

async fn preview(
    State(state): State<Arc<ServerState>>,
    jar: CookieJar,
    Query(params): Query<PreviewParams>,
) -> Response {
    let resolved = with_timeout(
        state.config.cms.timeout(),
        state.source.resolve_preview(&params.token, &params.document_id),
    )
    .await;

    match resolved {
        Ok(path) => {
            tracing::info!("Entering preview, redirecting to {}", path);
            let cookie = Cookie::build((PREVIEW_COOKIE, params.token))
                .path("/")
                .http_only(true);
            (jar.add(cookie), Redirect::temporary(&path)).into_response()
        }
        Err(e) => {
            tracing::warn!("Preview rejected: {}", e);
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "message": "Invalid token" })),
            )
                .into_response()
        }
    }
}

async fn exit_preview(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(Cookie::build(PREVIEW_COOKIE).path("/"));
    (jar, Redirect::temporary("/"))
}

async fn stylesheet() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLESHEET)
}

fn page_state(jar: &CookieJar, notice: Option<String>) -> PageState {
    PageState {
        preview: preview_ref(jar).is_some(),
        notice,
    }
}

fn preview_ref(jar: &CookieJar) -> Option<String> {
    jar.get(PREVIEW_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

fn session_cookie(id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .build()
}

/// HTTP status for a failed CMS call
fn status_for(err: &CmsError) -> StatusCode {
    match err {
        CmsError::NotFound { .. } => StatusCode::NOT_FOUND,
        CmsError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        CmsError::Malformed(_) | CmsError::Api { .. } => StatusCode::BAD_GATEWAY,
        CmsError::Network(_) | CmsError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn internal_error(err: anyhow::Error) -> Response {
    tracing::error!("Render failed: {:#}", err);
    (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}

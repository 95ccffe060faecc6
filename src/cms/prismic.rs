//! Prismic REST API v2 client

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::document::{self, AnyData, ApiRoot, DetailData, SearchResponse};
use super::{CmsError, ContentSource, Cursor, PostPage, PostQuery};
use crate::config::CmsConfig;
use crate::content::{document_path, PostDetail};

/// Client for a Prismic repository
#[derive(Clone)]
pub struct PrismicClient {
    client: Client,
    endpoint: String,
    access_token: Option<String>,
    document_type: String,
    timeout: Duration,
}

impl PrismicClient {
    /// Create a client from the CMS configuration
    pub fn new(config: &CmsConfig) -> Result<Self, CmsError> {
        let timeout = config.timeout();
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("spacetravelling/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CmsError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.api_endpoint.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
            document_type: config.document_type.clone(),
            timeout,
        })
    }

    /// GET a URL and return the body of a successful response
    async fn get(&self, mut url: Url) -> Result<Vec<u8>, CmsError> {
        if let Some(token) = &self.access_token {
            if !url.query_pairs().any(|(k, _)| k == "access_token") {
                url.query_pairs_mut().append_pair("access_token", token);
            }
        }

        tracing::debug!("GET {}", url.path());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CmsError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CmsError::Unauthorized(message),
                _ => CmsError::Api {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CmsError::from_reqwest(e, self.timeout))?;
        Ok(body.to_vec())
    }

    /// GET a URL and decode its JSON body
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CmsError> {
        let body = self.get(url).await?;
        document::decode(&body)
    }

    fn parse_url(&self, raw: &str) -> Result<Url, CmsError> {
        Url::parse(raw).map_err(|e| CmsError::Malformed(format!("invalid URL `{}`: {}", raw, e)))
    }

    /// The ref of the published content
    async fn master_ref(&self) -> Result<String, CmsError> {
        let url = self.parse_url(&self.endpoint)?;
        let root: ApiRoot = self.get_json(url).await?;
        root.master_ref()
            .map(str::to_string)
            .ok_or_else(|| CmsError::malformed("API root lists no master ref"))
    }

    async fn reference_or_master(&self, reference: Option<&str>) -> Result<String, CmsError> {
        match reference {
            Some(reference) if !reference.is_empty() => Ok(reference.to_string()),
            _ => self.master_ref().await,
        }
    }

    /// `documents/search` URL for a predicate
    fn search_url(&self, reference: &str, predicate: &str) -> Result<Url, CmsError> {
        let mut url = self.parse_url(&format!("{}/documents/search", self.endpoint))?;
        url.query_pairs_mut()
            .append_pair("ref", reference)
            .append_pair("q", &format!("[{}]", predicate));
        Ok(url)
    }

    /// Fields requested for listing documents; repositories name the
    /// author either `author` or `nome_do_autor`
    fn listing_fields(&self) -> String {
        ["title", "subtitle", "author", "nome_do_autor"]
            .iter()
            .map(|field| format!("{}.{}", self.document_type, field))
            .collect::<Vec<_>>()
            .join(",")
    }

    async fn fetch_page(&self, url: Url) -> Result<PostPage, CmsError> {
        let body = self.get(url).await?;
        document::decode_page(&body)
    }
}

/// `[at(path,"value")]` with the value quoted for the predicate language
fn at(path: &str, value: &str) -> String {
    let value = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!(r#"[at({},"{}")]"#, path, value)
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn query(&self, query: &PostQuery) -> Result<PostPage, CmsError> {
        let reference = self
            .reference_or_master(query.reference.as_deref())
            .await?;
        let mut url = self.search_url(&reference, &at("document.type", &self.document_type))?;
        url.query_pairs_mut()
            .append_pair("fetch", &self.listing_fields())
            .append_pair("pageSize", &query.page_size.max(1).to_string())
            .append_pair("orderings", "[document.first_publication_date desc]");

        let page = self.fetch_page(url).await?;
        tracing::debug!(
            "Fetched {} posts (more: {})",
            page.results.len(),
            page.next_page.is_some()
        );
        Ok(page)
    }

    async fn next_page(&self, cursor: &Cursor) -> Result<PostPage, CmsError> {
        let url = self.parse_url(cursor.as_str())?;
        self.fetch_page(url).await
    }

    async fn get_by_uid(
        &self,
        uid: &str,
        reference: Option<&str>,
    ) -> Result<PostDetail, CmsError> {
        let reference = self.reference_or_master(reference).await?;
        let predicate = at(&format!("my.{}.uid", self.document_type), uid);
        let mut url = self.search_url(&reference, &predicate)?;
        url.query_pairs_mut().append_pair("pageSize", "1");

        let response: SearchResponse<DetailData> = self.get_json(url).await?;
        match response.results.into_iter().next() {
            Some(doc) => doc.into_detail(),
            None => Err(CmsError::NotFound {
                doc_type: self.document_type.clone(),
                uid: uid.to_string(),
            }),
        }
    }

    async fn resolve_preview(&self, token: &str, document_id: &str) -> Result<String, CmsError> {
        if token.trim().is_empty() {
            return Err(CmsError::Unauthorized("missing preview token".to_string()));
        }

        let mut url = self.search_url(token, &at("document.id", document_id))?;
        url.query_pairs_mut().append_pair("pageSize", "1");

        // Prismic rejects unknown or expired refs with a client error
        let response: SearchResponse<AnyData> = match self.get_json(url).await {
            Ok(response) => response,
            Err(CmsError::Api { status, message }) if (400..500).contains(&status) => {
                return Err(CmsError::Unauthorized(message));
            }
            Err(e) => return Err(e),
        };

        let path = response
            .results
            .first()
            .map(|doc| document_path(&doc.doc_type, doc.uid.as_deref()))
            .unwrap_or_else(|| "/".to_string());
        Ok(path)
    }
}

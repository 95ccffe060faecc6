//! Prismic REST API payloads and their decoding into content models
//!
//! Decoding fails closed: a document missing a required field is a
//! `CmsError::Malformed`, never a partially filled post.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{CmsError, Cursor, PostPage};
use crate::content::{ContentBlock, PostDetail, PostSummary, RichText};

/// `GET /api/v2`
#[derive(Debug, Deserialize)]
pub(crate) struct ApiRoot {
    pub refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiRef {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(rename = "isMasterRef", default)]
    pub is_master: bool,
}

impl ApiRoot {
    pub fn master_ref(&self) -> Option<&str> {
        self.refs
            .iter()
            .find(|r| r.is_master)
            .map(|r| r.reference.as_str())
    }
}

/// `GET /api/v2/documents/search`
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse<D> {
    pub results: Vec<RawDocument<D>>,
    #[serde(default)]
    pub next_page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawDocument<D> {
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    #[serde(default)]
    pub last_publication_date: Option<String>,
    pub data: D,
}

/// Listing fields
#[derive(Debug, Deserialize)]
pub(crate) struct SummaryData {
    pub title: String,
    pub subtitle: String,
    #[serde(alias = "nome_do_autor")]
    pub author: String,
}

/// Post page fields
#[derive(Debug, Deserialize)]
pub(crate) struct DetailData {
    pub title: String,
    pub banner: Banner,
    #[serde(alias = "nome_do_autor")]
    pub author: String,
    pub content: Vec<RawContentBlock>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Banner {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawContentBlock {
    /// Key-text fields are `null` when left empty in the editor
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(alias = "content_body")]
    pub body: RichText,
}

/// Only the identity fields, used to resolve preview documents
#[derive(Debug, Deserialize)]
pub(crate) struct AnyData {}

/// Decode a JSON body, mapping failures to `Malformed`
pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, CmsError> {
    serde_json::from_slice(body).map_err(CmsError::malformed)
}

/// Decode a listing page
pub(crate) fn decode_page(body: &[u8]) -> Result<PostPage, CmsError> {
    let response: SearchResponse<SummaryData> = decode(body)?;
    let results = response
        .results
        .into_iter()
        .map(RawDocument::into_summary)
        .collect::<Result<Vec<_>, _>>()?;
    let next_page = response
        .next_page
        .filter(|url| !url.is_empty())
        .map(Cursor::new);
    Ok(PostPage { results, next_page })
}

impl<D> RawDocument<D> {
    fn required_uid(&self) -> Result<String, CmsError> {
        self.uid
            .clone()
            .filter(|uid| !uid.is_empty())
            .ok_or_else(|| CmsError::Malformed(format!("document {} has no uid", self.id)))
    }
}

impl RawDocument<SummaryData> {
    pub fn into_summary(self) -> Result<PostSummary, CmsError> {
        let uid = self.required_uid()?;
        Ok(PostSummary {
            uid,
            publication_date: parse_optional_timestamp(self.first_publication_date.as_deref())?,
            title: self.data.title,
            subtitle: self.data.subtitle,
            author: self.data.author,
        })
    }
}

impl RawDocument<DetailData> {
    pub fn into_detail(self) -> Result<PostDetail, CmsError> {
        let uid = self.required_uid()?;
        let content = self
            .data
            .content
            .into_iter()
            .map(|block| ContentBlock {
                heading: block.heading.unwrap_or_default(),
                body: block.body,
            })
            .collect();

        Ok(PostDetail {
            uid,
            publication_date: parse_optional_timestamp(self.first_publication_date.as_deref())?,
            last_modified: parse_optional_timestamp(self.last_publication_date.as_deref())?,
            title: self.data.title,
            banner_url: self.data.banner.url,
            author: self.data.author,
            content,
        })
    }
}

fn parse_optional_timestamp(value: Option<&str>) -> Result<Option<DateTime<Utc>>, CmsError> {
    value.map(parse_timestamp).transpose()
}

/// Parse a Prismic timestamp (`2021-03-25T19:25:28+0000`) or RFC 3339
pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, CmsError> {
    DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CmsError::Malformed(format!("invalid timestamp `{}`: {}", value, e)))
}

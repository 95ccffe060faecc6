//! Prismic structured text ("rich text")
//!
//! A rich-text field is an ordered list of blocks. Each block carries its
//! plain text and a list of style spans addressed by UTF-16 offsets into
//! that text. This module flattens blocks to plain text (for word counting)
//! and serialises them to HTML (for rendering).

use serde::{Deserialize, Serialize};

use super::post::document_path;
use crate::helpers::escape_html;

/// A rich-text field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichText(pub Vec<TextBlock>);

/// One block of a rich-text field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
    /// Image source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Image alt text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    /// Embed payload (`embed_url`, `html`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oembed: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    Heading4,
    Heading5,
    Heading6,
    Preformatted,
    ListItem,
    OListItem,
    Image,
    Embed,
    #[serde(other)]
    Unknown,
}

/// A style span over `[start, end)` of a block's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink,
    Label,
    #[serde(other)]
    Unknown,
}

impl TextBlock {
    /// Plain paragraph without styling
    #[cfg(test)]
    pub fn paragraph(text: &str) -> Self {
        Self {
            kind: BlockKind::Paragraph,
            text: text.to_string(),
            spans: Vec::new(),
            url: None,
            alt: None,
            oembed: None,
        }
    }
}

impl RichText {
    /// Build a rich-text field of plain paragraphs
    #[cfg(test)]
    pub fn from_paragraphs(paragraphs: &[&str]) -> Self {
        Self(paragraphs.iter().map(|p| TextBlock::paragraph(p)).collect())
    }

    /// Number of whitespace-separated words in the plain text
    pub fn word_count(&self) -> usize {
        self.0
            .iter()
            .map(|b| b.text.split_whitespace().count())
            .sum()
    }

    /// Serialise to HTML, grouping consecutive list items
    pub fn as_html(&self) -> String {
        let mut html = String::new();
        let mut open_list: Option<BlockKind> = None;

        for block in &self.0 {
            let list_kind = match block.kind {
                BlockKind::ListItem | BlockKind::OListItem => Some(block.kind),
                _ => None,
            };

            if open_list != list_kind {
                if let Some(kind) = open_list.take() {
                    html.push_str(list_close_tag(kind));
                }
                if let Some(kind) = list_kind {
                    html.push_str(list_open_tag(kind));
                    open_list = Some(kind);
                }
            }

            render_block(&mut html, block);
        }

        if let Some(kind) = open_list {
            html.push_str(list_close_tag(kind));
        }

        html
    }
}

fn list_open_tag(kind: BlockKind) -> &'static str {
    if kind == BlockKind::OListItem {
        "<ol>"
    } else {
        "<ul>"
    }
}

fn list_close_tag(kind: BlockKind) -> &'static str {
    if kind == BlockKind::OListItem {
        "</ol>"
    } else {
        "</ul>"
    }
}

fn render_block(html: &mut String, block: &TextBlock) {
    let tag = match block.kind {
        BlockKind::Paragraph => "p",
        BlockKind::Heading1 => "h1",
        BlockKind::Heading2 => "h2",
        BlockKind::Heading3 => "h3",
        BlockKind::Heading4 => "h4",
        BlockKind::Heading5 => "h5",
        BlockKind::Heading6 => "h6",
        BlockKind::Preformatted => "pre",
        BlockKind::ListItem | BlockKind::OListItem => "li",
        BlockKind::Image => {
            if let Some(url) = &block.url {
                html.push_str(&format!(
                    r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                    escape_html(url),
                    escape_html(block.alt.as_deref().unwrap_or(""))
                ));
            }
            return;
        }
        BlockKind::Embed => {
            if let Some(oembed) = &block.oembed {
                let embed_url = oembed
                    .get("embed_url")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                let inner = oembed.get("html").and_then(|v| v.as_str()).unwrap_or("");
                html.push_str(&format!(
                    r#"<div data-oembed="{}">{}</div>"#,
                    escape_html(embed_url),
                    inner
                ));
            }
            return;
        }
        BlockKind::Unknown => return,
    };

    html.push('<');
    html.push_str(tag);
    html.push('>');
    html.push_str(&render_inline(&block.text, &block.spans));
    html.push_str("</");
    html.push_str(tag);
    html.push('>');
}

/// Render text with its spans. Offsets are UTF-16 code units.
fn render_inline(text: &str, spans: &[Span]) -> String {
    let mut sorted: Vec<&Span> = spans.iter().filter(|s| s.start < s.end).collect();
    // Outer spans first when several start at the same offset
    sorted.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut out = String::with_capacity(text.len());
    let mut open: Vec<&Span> = Vec::new();
    let mut pending = sorted.into_iter().peekable();
    let mut pos = 0usize;

    for ch in text.chars() {
        close_ending(&mut out, &mut open, pos);
        while let Some(span) = pending.next_if(|s| s.start <= pos) {
            out.push_str(&open_tag(span));
            open.push(span);
        }
        push_escaped(&mut out, ch);
        pos += ch.len_utf16();
    }

    while let Some(span) = open.pop() {
        out.push_str(close_tag(span));
    }

    out
}

/// Close every open span ending at or before `pos`, reopening spans that
/// were nested inside it but continue past it.
fn close_ending<'a>(out: &mut String, open: &mut Vec<&'a Span>, pos: usize) {
    while let Some(idx) = open.iter().position(|s| s.end <= pos) {
        let mut reopen = Vec::new();
        while open.len() > idx + 1 {
            if let Some(inner) = open.pop() {
                out.push_str(close_tag(inner));
                reopen.push(inner);
            }
        }
        if let Some(span) = open.pop() {
            out.push_str(close_tag(span));
        }
        for inner in reopen.into_iter().rev() {
            out.push_str(&open_tag(inner));
            open.push(inner);
        }
    }
}

fn push_escaped(out: &mut String, ch: char) {
    match ch {
        '\n' => out.push_str("<br />"),
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        '\'' => out.push_str("&#39;"),
        _ => out.push(ch),
    }
}

fn open_tag(span: &Span) -> String {
    match span.kind {
        SpanKind::Strong => "<strong>".to_string(),
        SpanKind::Em => "<em>".to_string(),
        SpanKind::Hyperlink => {
            let data = span.data.as_ref();
            let href = data.map(hyperlink_href).unwrap_or_else(|| "/".to_string());
            let target = data
                .and_then(|d| d.get("target"))
                .and_then(|v| v.as_str())
                .map(|t| format!(r#" target="{}" rel="noopener""#, escape_html(t)))
                .unwrap_or_default();
            format!(r#"<a href="{}"{}>"#, escape_html(&href), target)
        }
        SpanKind::Label => {
            let label = span
                .data
                .as_ref()
                .and_then(|d| d.get("label"))
                .and_then(|v| v.as_str())
                .unwrap_or("");
            format!(r#"<span class="{}">"#, escape_html(label))
        }
        SpanKind::Unknown => "<span>".to_string(),
    }
}

fn close_tag(span: &Span) -> &'static str {
    match span.kind {
        SpanKind::Strong => "</strong>",
        SpanKind::Em => "</em>",
        SpanKind::Hyperlink => "</a>",
        SpanKind::Label | SpanKind::Unknown => "</span>",
    }
}

/// Resolve a hyperlink span's target
fn hyperlink_href(data: &serde_json::Value) -> String {
    let link_type = data.get("link_type").and_then(|v| v.as_str()).unwrap_or("");
    if link_type == "Document" {
        let doc_type = data.get("type").and_then(|v| v.as_str()).unwrap_or("");
        let uid = data.get("uid").and_then(|v| v.as_str());
        return document_path(doc_type, uid);
    }
    data.get("url")
        .and_then(|v| v.as_str())
        .unwrap_or("/")
        .to_string()
}

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::links::model::LinkRecord;

const NEXT_PAGE_SELECTORS: [&str; 3] = [
    r#"a[rel~="next"][href]"#,
    r#"link[rel~="next"][href]"#,
    r#"li.pager__item--next a[href]"#,
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExtractError {
    #[error("malformed markup: {0}")]
    MalformedMarkup(&'static str),
}

/// Turns page markup into raw link records. No network access.
#[derive(Debug, Clone)]
pub struct MarkupLinkExtractor {
    anchors: Selector,
}

impl MarkupLinkExtractor {
    pub fn new() -> Self {
        Self {
            anchors: Selector::parse("a[href]").expect("static selector"),
        }
    }

    /// One record per anchor; a broken page yields no records.
    pub fn extract(&self, html: &str) -> Vec<LinkRecord> {
        match self.try_extract(html) {
            Ok(records) => records,
            Err(e) => {
                warn!("Link extraction produced no records: {}", e);
                Vec::new()
            }
        }
    }

    pub fn try_extract(&self, html: &str) -> Result<Vec<LinkRecord>, ExtractError> {
        if html.trim().is_empty() {
            return Err(ExtractError::MalformedMarkup("empty document"));
        }
        if html.contains('\0') {
            return Err(ExtractError::MalformedMarkup("document contains NUL bytes"));
        }
        if !html.contains('<') {
            return Err(ExtractError::MalformedMarkup("no markup found"));
        }

        let document = Html::parse_document(html);
        if !document.errors.is_empty() {
            debug!("Parser recovered from {} markup errors", document.errors.len());
        }

        let records = document
            .select(&self.anchors)
            .filter_map(|anchor| {
                let href = anchor.value().attr("href")?.trim();
                if href.is_empty() {
                    return None;
                }
                Some(LinkRecord::new(href, anchor_text(anchor)))
            })
            .collect();

        Ok(records)
    }

    /// Absolute URL of the next page of a paginated listing, if any.
    pub fn next_page(&self, html: &str, page_url: &Url) -> Option<Url> {
        let document = Html::parse_document(html);

        NEXT_PAGE_SELECTORS
            .iter()
            .filter_map(|css| Selector::parse(css).ok())
            .find_map(|selector| {
                document
                    .select(&selector)
                    .filter_map(|el| el.value().attr("href"))
                    .find_map(|href| page_url.join(href.trim()).ok())
            })
            .filter(|next| next != page_url)
    }
}

impl Default for MarkupLinkExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Visible text of an anchor with whitespace collapsed.
fn anchor_text(anchor: ElementRef<'_>) -> String {
    anchor
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

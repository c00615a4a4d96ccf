//! Listing and detail extraction for the news pipeline.
//!
//! The news index is a single page of `news-contentcard` blocks with no type
//! column and no date filter; article pages carry the title themselves, so
//! the card only contributes the link and the raw display date.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use scraper::{Html, Selector};

use super::{absolutize, text_of, RowParse};
use crate::record::{
    generate_id, DetailEnrichment, PublishedDate, RecordStub, RelatedDocument, MISSING_HTML,
};

/// Fixed category for records from this source.
pub const NEWS_TYPE: &str = "news";

static CARD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.news-contentcard").unwrap());
static CARD_DATE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.search-date").unwrap());
static ARTICLE_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.field--name-title").unwrap());
static ARTICLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("article").unwrap());
static DOC_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.views-field-title").unwrap());
static DOC_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span").unwrap());
static ANY_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

/// Enumerate news cards on the rendered index page. A page with no cards is
/// simply empty, never an error.
pub fn parse_listing(listing_url: &str, html: &str) -> Result<Vec<RowParse>> {
    let doc = Html::parse_document(html);

    Ok(doc
        .select(&CARD)
        .map(|card| {
            let url = card
                .select(&ANY_LINK)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(absolutize)
                .unwrap_or_else(|| listing_url.to_string());

            let published = match card.select(&CARD_DATE).next() {
                Some(d) => PublishedDate::Text(text_of(d)),
                None => PublishedDate::Unknown,
            };

            RowParse::Stub(RecordStub {
                id: generate_id(&url),
                title: None,
                doc_type: NEWS_TYPE.to_string(),
                published,
                url,
            })
        })
        .collect())
}

/// Extract title, full markup and related documents from an article page.
/// The title element is required; its absence fails the row.
pub fn parse_detail(html: &str) -> Result<DetailEnrichment> {
    let doc = Html::parse_document(html);

    let title = doc
        .select(&ARTICLE_TITLE)
        .next()
        .map(text_of)
        .context("article page has no title element")?;

    let full_html = doc
        .select(&ARTICLE)
        .next()
        .map(|a| a.html())
        .unwrap_or_else(|| MISSING_HTML.to_string());

    let mut related = Vec::new();
    for cell in doc.select(&DOC_CELL) {
        let doc_title = cell
            .select(&DOC_TITLE)
            .next()
            .map(text_of)
            .context("document row has no title")?;
        let href = cell
            .select(&ANY_LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
            .context("document row has no link")?;
        related.push(RelatedDocument {
            title: doc_title,
            related_document_url: absolutize(href),
        });
    }

    Ok(DetailEnrichment {
        title: Some(title),
        html: full_html,
        related_documents: related,
    })
}

// ── Tests ──

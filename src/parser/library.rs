//! Listing and detail extraction for the documents-library pipeline.
//!
//! Library listing pages render a `views-view-table` with one row per
//! publication; detail pages carry the full content in a
//! `node--view-mode-full` article plus an optional document block.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};

use super::{absolutize, text_of, RowParse};
use crate::record::{
    generate_id, DetailEnrichment, PublishedDate, RecordStub, RelatedDocument, MISSING_HTML,
};

const DATE_FORMAT: &str = "%d/%m/%Y";

static TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.views-view-table").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tbody > tr").unwrap());
static TITLE_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.views-field-title a").unwrap());
static ROW_DATE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("time").unwrap());
static TYPE_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td.views-field-field-document-type").unwrap());
static CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article.node--view-mode-full").unwrap());
static MEDIA: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article.media--view-mode-full").unwrap());
static DOC_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.field--name-field-document-title").unwrap());
static ANY_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

/// Enumerate candidate rows on one rendered listing page, applying the
/// date-threshold filter. A missing results table is a page-level failure
/// and aborts the run; per-row problems surface as `RowParse::Skip`.
pub fn parse_listing(listing_url: &str, html: &str, threshold: NaiveDate) -> Result<Vec<RowParse>> {
    let doc = Html::parse_document(html);
    let table = doc
        .select(&TABLE)
        .next()
        .with_context(|| format!("no results table on {listing_url}"))?;

    Ok(table
        .select(&ROW)
        .map(|tr| parse_row(listing_url, tr, threshold))
        .collect())
}

fn parse_row(listing_url: &str, tr: ElementRef<'_>, threshold: NaiveDate) -> RowParse {
    let anchor = tr.select(&TITLE_LINK).next();

    // Rows without an href degrade to the listing URL itself.
    let url = anchor
        .and_then(|a| a.value().attr("href"))
        .map(absolutize)
        .unwrap_or_else(|| listing_url.to_string());

    let title = match anchor {
        Some(a) => text_of(a),
        None => {
            return RowParse::Skip {
                url,
                reason: "row has no title link".into(),
            }
        }
    };

    let raw_date = match tr.select(&ROW_DATE).next() {
        Some(t) => text_of(t),
        None => "Unknown".to_string(),
    };
    let published = match NaiveDate::parse_from_str(&raw_date, DATE_FORMAT) {
        Ok(d) => d,
        Err(e) => {
            return RowParse::Skip {
                url,
                reason: format!("unparsable date {raw_date:?}: {e}"),
            }
        }
    };
    // Inclusive lower bound: a date equal to the threshold is kept.
    if published < threshold {
        return RowParse::Excluded {
            url,
            date: published,
        };
    }

    let doc_type = match tr.select(&TYPE_CELL).next() {
        Some(td) => text_of(td),
        None => {
            return RowParse::Skip {
                url,
                reason: "row has no document type column".into(),
            }
        }
    };

    RowParse::Stub(RecordStub {
        id: generate_id(&url),
        title: Some(title),
        doc_type,
        published: PublishedDate::Date(published),
        url,
    })
}

/// Extract the full-content markup and related documents from a detail page.
/// A missing document block yields an empty related-documents list; a block
/// with a title but no link (or vice versa) fails the enrichment.
pub fn parse_detail(html: &str) -> Result<DetailEnrichment> {
    let doc = Html::parse_document(html);

    let full_html = doc
        .select(&CONTENT)
        .next()
        .map(|a| a.html())
        .unwrap_or_else(|| MISSING_HTML.to_string());

    let mut related = Vec::new();
    if let Some(media) = doc.select(&MEDIA).next() {
        let title = media
            .select(&DOC_TITLE)
            .next()
            .map(text_of)
            .context("document block has no title")?;
        let href = media
            .select(&ANY_LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
            .context("document block has no link")?;
        related.push(RelatedDocument {
            title,
            related_document_url: absolutize(href),
        });
    }

    Ok(DetailEnrichment {
        title: None,
        html: full_html,
        related_documents: related,
    })
}

// ── Tests ──

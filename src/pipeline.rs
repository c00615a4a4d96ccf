//! Pipeline orchestration: walk listing pages, enrich rows, dedup, classify.
//!
//! The two regulator sources (documents library, news index) share this run
//! loop but diverge in selectors, filtering and field derivation, so each is
//! its own `ListingSource` variant rather than one configuration-driven
//! pipeline.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::config::{LibraryConfig, NewsConfig, LIBRARY_URL, NEWS_SOURCE_WEBSITE, SOURCE_REGULATOR};
use crate::fetch::PageFetcher;
use crate::parser::{self, RowParse};
use crate::record::{Record, RecordStub};

/// One listing-derived source: knows its page set, row shape and detail shape.
#[async_trait]
pub trait ListingSource: Send + Sync {
    fn label(&self) -> &'static str;

    /// Canonical site attribution stamped on every record.
    fn source_website(&self) -> &str;

    /// Every listing page URL to visit, in order.
    fn page_urls(&self) -> Vec<String>;

    /// Parse one rendered listing page into per-row outcomes. Failure here
    /// (e.g. the results table is missing entirely) aborts the run.
    fn parse_listing(&self, listing_url: &str, html: &str) -> Result<Vec<RowParse>>;

    /// Fetch and parse the row's own page, merging it into the final record.
    async fn enrich(&self, fetcher: &dyn PageFetcher, stub: RecordStub) -> Result<Record>;

    /// Distinguished `type` routed to the secondary collection, if any.
    fn filtered_type(&self) -> Option<&str> {
        None
    }
}

pub struct LibrarySource {
    cfg: LibraryConfig,
}

impl LibrarySource {
    pub fn new(cfg: LibraryConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl ListingSource for LibrarySource {
    fn label(&self) -> &'static str {
        "library"
    }

    fn source_website(&self) -> &str {
        LIBRARY_URL
    }

    fn page_urls(&self) -> Vec<String> {
        let mut urls = Vec::new();
        for base in &self.cfg.listing_urls {
            for page in 0..self.cfg.pages_per_listing {
                urls.push(format!("{base}?page={page}"));
            }
        }
        urls
    }

    fn parse_listing(&self, listing_url: &str, html: &str) -> Result<Vec<RowParse>> {
        parser::library::parse_listing(listing_url, html, self.cfg.threshold)
    }

    async fn enrich(&self, fetcher: &dyn PageFetcher, stub: RecordStub) -> Result<Record> {
        let html = fetcher.fetch_rendered_html(&stub.url).await?;
        let detail = parser::library::parse_detail(&html)?;
        Ok(Record::assemble(
            SOURCE_REGULATOR,
            self.source_website(),
            stub,
            detail,
        ))
    }

    fn filtered_type(&self) -> Option<&str> {
        Some(&self.cfg.filtered_type)
    }
}

pub struct NewsSource {
    cfg: NewsConfig,
}

impl NewsSource {
    pub fn new(cfg: NewsConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl ListingSource for NewsSource {
    fn label(&self) -> &'static str {
        "news"
    }

    fn source_website(&self) -> &str {
        NEWS_SOURCE_WEBSITE
    }

    fn page_urls(&self) -> Vec<String> {
        self.cfg.listing_urls.clone()
    }

    fn parse_listing(&self, listing_url: &str, html: &str) -> Result<Vec<RowParse>> {
        parser::news::parse_listing(listing_url, html)
    }

    async fn enrich(&self, fetcher: &dyn PageFetcher, stub: RecordStub) -> Result<Record> {
        let html = fetcher.fetch_rendered_html(&stub.url).await?;
        let detail = parser::news::parse_detail(&html)?;
        Ok(Record::assemble(
            SOURCE_REGULATOR,
            self.source_website(),
            stub,
            detail,
        ))
    }
}

#[derive(Debug, Default)]
pub struct RunStats {
    pub pages: usize,
    pub kept: usize,
    pub excluded: usize,
    pub duplicates: usize,
    pub errors: usize,
}

pub struct RunOutput {
    pub records: Vec<Record>,
    /// Records whose `type` matched the source's distinguished value.
    pub filtered: Vec<Record>,
    pub stats: RunStats,
}

/// Drive one source across its page set: fetch, extract, enrich, dedup,
/// classify. Strictly sequential; each detail fetch completes before the
/// next row starts.
pub async fn run(source: &dyn ListingSource, fetcher: &dyn PageFetcher) -> Result<RunOutput> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::new();
    let mut filtered = Vec::new();
    let mut stats = RunStats::default();

    for page_url in source.page_urls() {
        info!("Scraping: {}", page_url);
        let html = fetcher.fetch_rendered_html(&page_url).await?;
        let rows = source.parse_listing(&page_url, &html)?;
        stats.pages += 1;

        let pb = ProgressBar::new(rows.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec})")?
                .progress_chars("=> "),
        );

        for row in rows {
            match row {
                RowParse::Excluded { url, date } => {
                    info!("Excluding {} (published {} before threshold)", url, date);
                    stats.excluded += 1;
                }
                RowParse::Skip { url, reason } => {
                    warn!("Error extracting data from {}: {}", url, reason);
                    stats.errors += 1;
                }
                RowParse::Stub(stub) => {
                    // Run-wide dedup; the fetch is skipped for repeats, but an
                    // id only counts as seen once a record actually assembled,
                    // so a failed first occurrence does not block a later one.
                    if seen.contains(&stub.id) {
                        stats.duplicates += 1;
                    } else {
                        match source.enrich(fetcher, stub).await {
                            Ok(record) => {
                                seen.insert(record.id.clone());
                                if source
                                    .filtered_type()
                                    .is_some_and(|t| t == record.doc_type)
                                {
                                    filtered.push(record.clone());
                                }
                                records.push(record);
                                stats.kept += 1;
                            }
                            Err(e) => {
                                warn!("Error extracting data from {}: {}", page_url, e);
                                stats.errors += 1;
                            }
                        }
                    }
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();
    }

    info!(
        "{}: {} kept, {} excluded, {} duplicates, {} errors across {} pages",
        source.label(),
        stats.kept,
        stats.excluded,
        stats.duplicates,
        stats.errors,
        stats.pages
    );

    Ok(RunOutput {
        records,
        filtered,
        stats,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use anyhow::anyhow;
    use chrono::NaiveDate;

    use crate::record::{generate_id, PublishedDate};

    const ORIGIN: &str = "https://www.esma.europa.eu";
    const LISTING: &str = "https://www.esma.europa.eu/databases-library/esma-library";
    const NEWS_LISTING: &str = "https://www.esma.europa.eu/press-news/esma-news";

    struct FakeFetcher {
        pages: HashMap<String, String>,
    }

    impl FakeFetcher {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(u, h)| (u.to_string(), h.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch_rendered_html(&self, url: &str) -> Result<String> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow!("no canned page for {url}"))
        }
    }

    fn library_source(pages: u32) -> LibrarySource {
        LibrarySource::new(LibraryConfig {
            pages_per_listing: pages,
            threshold: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            ..LibraryConfig::default()
        })
    }

    fn listing_page(rows: &str) -> String {
        format!(r#"<table class="views-view-table"><tbody>{rows}</tbody></table>"#)
    }

    fn row(date: &str, href: &str, title: &str, doc_type: &str) -> String {
        format!(
            r#"<tr>
                 <td><time>{date}</time></td>
                 <td class="views-field-title"><a href="{href}">{title}</a></td>
                 <td class="views-field-field-document-type">{doc_type}</td>
               </tr>"#
        )
    }

    const DETAIL: &str = r#"<article class="node--view-mode-full"><p>Full text</p></article>
        <article class="media--view-mode-full">
          <div class="field--name-field-document-title">Annex</div>
          <a href="/file.pdf">Download</a>
        </article>"#;

    #[tokio::test]
    async fn end_to_end_two_rows() {
        // Row A is after the threshold, Row B before; only A survives and
        // the press-release side channel stays empty.
        let listing = listing_page(&format!(
            "{}{}",
            row("15/03/2025", "/library/x", "Guidelines X", "Guidelines"),
            row("20/12/2024", "/library/y", "Notice Y", "Press Release"),
        ));
        let fetcher = FakeFetcher::new(&[
            (&format!("{LISTING}?page=0"), listing.as_str()),
            (&format!("{ORIGIN}/library/x"), DETAIL),
        ]);

        let out = run(&library_source(1), &fetcher).await.unwrap();

        assert_eq!(out.records.len(), 1);
        let r = &out.records[0];
        assert_eq!(r.id, generate_id(&format!("{ORIGIN}/library/x")));
        assert_eq!(r.title, "Guidelines X");
        assert_eq!(r.doc_type, "Guidelines");
        assert_eq!(
            r.published_date,
            PublishedDate::Date(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap())
        );
        assert_eq!(r.related_documents.len(), 1);
        assert!(out.filtered.is_empty());
        assert_eq!(out.stats.excluded, 1);
        assert_eq!(out.stats.kept, 1);
    }

    #[tokio::test]
    async fn duplicate_rows_collapse_to_one_record() {
        let listing = listing_page(&format!(
            "{}{}",
            row("15/03/2025", "/library/x", "Guidelines X", "Guidelines"),
            row("15/03/2025", "/library/x", "Guidelines X", "Guidelines"),
        ));
        let fetcher = FakeFetcher::new(&[
            (&format!("{LISTING}?page=0"), listing.as_str()),
            (&format!("{ORIGIN}/library/x"), DETAIL),
        ]);

        let out = run(&library_source(1), &fetcher).await.unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.stats.duplicates, 1);
    }

    #[tokio::test]
    async fn dedup_spans_pages_within_a_run() {
        let listing = listing_page(&row(
            "15/03/2025",
            "/library/x",
            "Guidelines X",
            "Guidelines",
        ));
        let fetcher = FakeFetcher::new(&[
            (&format!("{LISTING}?page=0"), listing.as_str()),
            (&format!("{LISTING}?page=1"), listing.as_str()),
            (&format!("{ORIGIN}/library/x"), DETAIL),
        ]);

        let out = run(&library_source(2), &fetcher).await.unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.stats.duplicates, 1);
        assert_eq!(out.stats.pages, 2);
    }

    #[tokio::test]
    async fn press_release_lands_in_both_collections() {
        let listing = listing_page(&format!(
            "{}{}",
            row("15/03/2025", "/library/x", "Guidelines X", "Guidelines"),
            row("05/02/2025", "/library/z", "Statement Z", "Press Release"),
        ));
        let fetcher = FakeFetcher::new(&[
            (&format!("{LISTING}?page=0"), listing.as_str()),
            (&format!("{ORIGIN}/library/x"), DETAIL),
            (&format!("{ORIGIN}/library/z"), DETAIL),
        ]);

        let out = run(&library_source(1), &fetcher).await.unwrap();
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.filtered.len(), 1);
        assert_eq!(out.filtered[0].doc_type, "Press Release");
        assert_eq!(out.filtered[0].id, out.records[1].id);
    }

    #[tokio::test]
    async fn malformed_row_is_isolated() {
        // Second row has no title anchor: skipped after falling back to the
        // listing URL, leaving exactly one record.
        let listing = listing_page(&format!(
            r#"{}<tr>
                 <td><time>10/02/2025</time></td>
                 <td class="views-field-title">No link here</td>
                 <td class="views-field-field-document-type">Opinion</td>
               </tr>"#,
            row("15/03/2025", "/library/x", "Guidelines X", "Guidelines"),
        ));
        let fetcher = FakeFetcher::new(&[
            (&format!("{LISTING}?page=0"), listing.as_str()),
            (&format!("{ORIGIN}/library/x"), DETAIL),
        ]);

        let out = run(&library_source(1), &fetcher).await.unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.stats.errors, 1);
    }

    #[tokio::test]
    async fn detail_fetch_failure_skips_only_that_row() {
        let listing = listing_page(&format!(
            "{}{}",
            row("15/03/2025", "/library/x", "Guidelines X", "Guidelines"),
            row("10/02/2025", "/library/unreachable", "Broken", "Opinion"),
        ));
        // No canned page for /library/unreachable.
        let fetcher = FakeFetcher::new(&[
            (&format!("{LISTING}?page=0"), listing.as_str()),
            (&format!("{ORIGIN}/library/x"), DETAIL),
        ]);

        let out = run(&library_source(1), &fetcher).await.unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.stats.errors, 1);
    }

    #[tokio::test]
    async fn listing_fetch_failure_is_fatal() {
        let fetcher = FakeFetcher::new(&[]);
        assert!(run(&library_source(1), &fetcher).await.is_err());
    }

    #[tokio::test]
    async fn news_records_take_title_from_detail_page() {
        let listing = format!(
            r#"<div class="news-contentcard">
                 <div class="search-date">14 March 2025</div>
                 <a href="/press-news/esma-news/a">teaser</a>
               </div>
               <div class="news-contentcard">
                 <a href="{ORIGIN}/press-news/esma-news/b">teaser</a>
               </div>"#
        );
        let detail_a = r#"<span class="field--name-title">Article A</span>
            <article><p>Body A</p></article>"#;
        let detail_b = r#"<span class="field--name-title">Article B</span>
            <article><p>Body B</p></article>"#;
        let fetcher = FakeFetcher::new(&[
            (NEWS_LISTING, listing.as_str()),
            (&format!("{ORIGIN}/press-news/esma-news/a"), detail_a),
            (&format!("{ORIGIN}/press-news/esma-news/b"), detail_b),
        ]);

        let source = NewsSource::new(NewsConfig::default());
        let out = run(&source, &fetcher).await.unwrap();

        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].title, "Article A");
        assert_eq!(out.records[0].doc_type, "news");
        assert_eq!(out.records[0].source_website, "www.esma.europa.eu");
        assert_eq!(
            out.records[0].published_date,
            PublishedDate::Text("14 March 2025".into())
        );
        assert_eq!(out.records[1].published_date, PublishedDate::Unknown);
        // News has no distinguished type.
        assert!(out.filtered.is_empty());
    }
}

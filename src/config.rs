use std::path::PathBuf;

use chrono::NaiveDate;

pub const SOURCE_REGULATOR: &str = "ESMA";
pub const LIBRARY_URL: &str = "https://www.esma.europa.eu/databases-library/esma-library";
pub const NEWS_URL: &str = "https://www.esma.europa.eu/press-news/esma-news";
/// The news dataset historically attributes records to the bare host.
pub const NEWS_SOURCE_WEBSITE: &str = "www.esma.europa.eu";

/// Documents-library pipeline configuration. Explicit, never ambient:
/// the orchestrator receives one of these at construction.
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    pub listing_urls: Vec<String>,
    /// Records published before this date are excluded (the date itself is kept).
    pub threshold: NaiveDate,
    /// Fixed page range per listing URL; there is no has-next detection.
    pub pages_per_listing: u32,
    pub all_out: PathBuf,
    pub filtered_out: PathBuf,
    /// Document type routed to the secondary output file.
    pub filtered_type: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            listing_urls: vec![LIBRARY_URL.to_string()],
            threshold: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            pages_per_listing: 3,
            all_out: "esma_scraped_all_data.json".into(),
            filtered_out: "esma_scraped_documents_filtered_type_data.json".into(),
            filtered_type: "Press Release".to_string(),
        }
    }
}

/// News pipeline configuration: one page per listing URL, single output.
#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub listing_urls: Vec<String>,
    pub out: PathBuf,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            listing_urls: vec![NEWS_URL.to_string()],
            out: "esma_scraped_news_data.json".into(),
        }
    }
}

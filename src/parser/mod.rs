pub mod library;
pub mod news;

use scraper::ElementRef;

use crate::record::RecordStub;

pub const SITE_ORIGIN: &str = "https://www.esma.europa.eu";

/// Outcome of parsing one listing row, before any detail fetch.
#[derive(Debug)]
pub enum RowParse {
    /// Candidate stub, ready for enrichment.
    Stub(RecordStub),
    /// Published before the configured threshold; never enriched.
    Excluded { url: String, date: chrono::NaiveDate },
    /// Row could not be extracted; the page and run continue.
    Skip { url: String, reason: String },
}

/// Prefix the site origin onto relative hrefs; absolute links pass through.
pub fn absolutize(href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{SITE_ORIGIN}{href}")
    }
}

/// Normalized text content of an element, surrounding whitespace trimmed.
pub fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_hrefs_gain_origin() {
        assert_eq!(
            absolutize("/library/x"),
            "https://www.esma.europa.eu/library/x"
        );
    }

    #[test]
    fn absolute_hrefs_untouched() {
        assert_eq!(
            absolutize("https://www.esma.europa.eu/library/x"),
            "https://www.esma.europa.eu/library/x"
        );
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

/// Marker stored when a detail page has no recognizable content element.
pub const MISSING_HTML: &str = "None";

/// Content-addressed identity: UUIDv5 over the URL namespace, so the same
/// URL yields the same id across runs and across pipelines.
pub fn generate_id(url: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, url.as_bytes()).to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedDocument {
    pub title: String,
    pub related_document_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PublishedDate {
    /// Parsed calendar date (library rows carry `%d/%m/%Y`).
    Date(NaiveDate),
    /// Raw display text, stored as shown (news cards).
    Text(String),
    /// The date element was missing entirely.
    Unknown,
}

impl Serialize for PublishedDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PublishedDate::Date(d) => serializer.serialize_str(&d.to_string()),
            PublishedDate::Text(t) => serializer.serialize_str(t),
            PublishedDate::Unknown => serializer.serialize_str("Unknown"),
        }
    }
}

/// One normalized publication, serialized with the dataset's field names.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub source_regulator: String,
    pub source_website: String,
    pub retrieved_at: DateTime<Utc>,
    pub id: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub title: String,
    pub url: String,
    pub published_date: PublishedDate,
    #[serde(rename = "HTML")]
    pub html: String,
    pub related_documents: Vec<RelatedDocument>,
}

/// Listing-row intermediate: link, type and date as read off the row.
/// Consumed once its record is assembled or the row is rejected.
#[derive(Debug, Clone)]
pub struct RecordStub {
    pub id: String,
    pub url: String,
    /// Library rows carry the title; news rows take it from the detail page.
    pub title: Option<String>,
    pub doc_type: String,
    pub published: PublishedDate,
}

/// Detail-page yield. `html` is always populated (possibly the missing
/// marker); related-document entries are never partial.
#[derive(Debug, Clone)]
pub struct DetailEnrichment {
    pub title: Option<String>,
    pub html: String,
    pub related_documents: Vec<RelatedDocument>,
}

impl Record {
    /// Merge a stub with its enrichment. `retrieved_at` is stamped here, at
    /// assembly time, so records assembled at different moments differ even
    /// when everything else matches.
    pub fn assemble(
        regulator: &str,
        website: &str,
        stub: RecordStub,
        detail: DetailEnrichment,
    ) -> Self {
        let title = detail.title.or(stub.title).unwrap_or_default();
        Record {
            source_regulator: regulator.to_string(),
            source_website: website.to_string(),
            retrieved_at: Utc::now(),
            id: stub.id,
            doc_type: stub.doc_type,
            title: title.trim().to_string(),
            url: stub.url,
            published_date: stub.published,
            html: detail.html,
            related_documents: detail.related_documents,
        }
    }
}

// ── Tests ──

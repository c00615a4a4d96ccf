use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::record::Record;

/// Write records as a human-readable JSON array: UTF-8, 4-space indent,
/// non-ASCII characters left unescaped.
pub fn persist(records: &[Record], dest: &Path) -> Result<()> {
    let file =
        File::create(dest).with_context(|| format!("cannot create {}", dest.display()))?;
    let mut out = BufWriter::new(file);

    {
        let fmt = PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, fmt);
        records
            .serialize(&mut ser)
            .with_context(|| format!("cannot serialize records to {}", dest.display()))?;
    }
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{generate_id, PublishedDate, RelatedDocument};
    use chrono::Utc;

    fn sample() -> Record {
        Record {
            source_regulator: "ESMA".into(),
            source_website: "https://www.esma.europa.eu/databases-library/esma-library".into(),
            retrieved_at: Utc::now(),
            id: generate_id("https://www.esma.europa.eu/library/x"),
            doc_type: "Guidelines".into(),
            title: "Lignes directrices sur les marchés".into(),
            url: "https://www.esma.europa.eu/library/x".into(),
            published_date: PublishedDate::Unknown,
            html: "<article></article>".into(),
            related_documents: vec![RelatedDocument {
                title: "Annexe".into(),
                related_document_url: "https://www.esma.europa.eu/file.pdf".into(),
            }],
        }
    }

    #[test]
    fn writes_readable_json_array() {
        let dest = std::env::temp_dir().join("esma_sink_test.json");
        persist(&[sample()], &dest).unwrap();

        let raw = std::fs::read_to_string(&dest).unwrap();
        // Non-ASCII stays literal, indentation is four spaces.
        assert!(raw.contains("marchés"));
        assert!(raw.contains("\n    {"));
        assert!(raw.contains("\"HTML\""));

        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 1);
        assert_eq!(parsed[0]["type"], "Guidelines");
        assert_eq!(parsed[0]["published_date"], "Unknown");

        std::fs::remove_file(&dest).ok();
    }

    #[test]
    fn empty_collection_is_an_empty_array() {
        let dest = std::env::temp_dir().join("esma_sink_empty_test.json");
        persist(&[], &dest).unwrap();
        let raw = std::fs::read_to_string(&dest).unwrap();
        assert_eq!(raw.trim(), "[]");
        std::fs::remove_file(&dest).ok();
    }
}

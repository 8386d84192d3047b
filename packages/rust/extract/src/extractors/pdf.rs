//! PDF text extraction via `lopdf`.
//!
//! One `page` record per page with non-blank text. Pages whose content
//! stream cannot be decoded are skipped rather than failing the file.

use std::path::Path;
use std::sync::LazyLock;

use lopdf::Document;
use regex::Regex;
use reportsmith_shared::{ContentRecord, DetectedHeading, FileType, Result};
use tracing::warn;

use super::{Extraction, Extractor};
use crate::ooxml::fail;

/// Extracts page text and heading-like lines from PDF files.
pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn file_type(&self) -> FileType {
        FileType::Pdf
    }

    fn extract(&self, path: &Path) -> Result<Extraction> {
        let doc = Document::load(path).map_err(|e| fail(format!("failed to load PDF: {e}")))?;
        if doc.is_encrypted() {
            return Err(fail("PDF is encrypted"));
        }

        let pages = doc.get_pages();
        let mut extraction = Extraction::default();
        extraction.metadata.count("pages", pages.len() as u64);

        for &page_num in pages.keys() {
            let text = match doc.extract_text(&[page_num]) {
                Ok(text) => text,
                Err(e) => {
                    warn!(page = page_num, error = %e, "skipping unreadable PDF page");
                    continue;
                }
            };
            if text.trim().is_empty() {
                continue;
            }

            for line in text.lines() {
                if is_heading(line) {
                    extraction.metadata.headings.push(DetectedHeading {
                        position: page_num,
                        text: line.trim().to_string(),
                        level: None,
                    });
                }
            }
            extraction.content.push(ContentRecord::Page {
                page: page_num,
                text,
            });
        }

        Ok(extraction)
    }

    fn name(&self) -> &str {
        "pdf"
    }
}

/// Whether a line looks like a heading: all caps, numbered, or title case,
/// between 3 and 100 characters.
pub(crate) fn is_heading(line: &str) -> bool {
    static PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
        [
            Regex::new(r"^[A-Z][A-Z\s]+$").expect("valid regex"),
            Regex::new(r"^\d+\.?\s+[A-Z]").expect("valid regex"),
            Regex::new(r"^[A-Z][a-z]+(\s+[A-Z][a-z]+)*$").expect("valid regex"),
        ]
    });

    let line = line.trim();
    let len = line.chars().count();
    if !(3..=100).contains(&len) {
        return false;
    }
    PATTERNS.iter().any(|re| re.is_match(line))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::fixtures::Scratch;

    #[test]
    fn heading_patterns() {
        assert!(is_heading("EXECUTIVE SUMMARY"));
        assert!(is_heading("2. Market Overview"));
        assert!(is_heading("Quarterly Results"));
        assert!(!is_heading("Revenue grew by 12% this quarter."));
        assert!(!is_heading("AB"));
        assert!(!is_heading(&"A".repeat(101)));
    }

    #[test]
    fn extracts_pages_and_skips_blank_ones() {
        let scratch = Scratch::new("pdf");
        let path = scratch.path("report.pdf");
        fixtures::write_pdf(&path, &[&["INTRODUCTION", "revenue grew by 12%"], &[]]);

        let extraction = PdfExtractor.extract(&path).unwrap();
        assert_eq!(extraction.metadata.counters["pages"], 2);
        assert_eq!(extraction.content.len(), 1);
        match &extraction.content[0] {
            ContentRecord::Page { page, text } => {
                assert_eq!(*page, 1);
                assert!(text.contains("INTRODUCTION"));
                assert!(text.contains("revenue grew"));
            }
            other => panic!("unexpected record {other:?}"),
        }
        assert_eq!(extraction.metadata.headings.len(), 1);
        assert_eq!(extraction.metadata.headings[0].text, "INTRODUCTION");
    }

    #[test]
    fn garbage_file_is_an_error() {
        let scratch = Scratch::new("pdf-bad");
        let path = scratch.path("broken.pdf");
        std::fs::write(&path, b"definitely not a pdf").unwrap();
        assert!(PdfExtractor.extract(&path).is_err());
    }
}

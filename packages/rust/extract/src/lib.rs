//! Source file extraction for ReportSmith.
//!
//! This crate provides:
//! - [`extractors`]: per-format extractors (PDF, DOCX, PPTX, XLSX, images, media)
//! - [`ExtractorRegistry`]: dispatches a file to its extractor by extension and
//!   normalizes every outcome into an [`ExtractedFileContent`]
//! - [`sanitize_filename`]: makes client-supplied names safe to store
//!
//! [`ExtractedFileContent`]: reportsmith_shared::ExtractedFileContent

pub mod extractors;
mod ooxml;

pub use extractors::{
    DocxExtractor, Extraction, Extractor, ExtractorRegistry, ImageExtractor, MediaExtractor,
    PdfExtractor, PptxExtractor, XlsxExtractor,
};

/// Fallback name when nothing usable survives sanitizing.
const FALLBACK_FILENAME: &str = "upload";

/// Reduce a client-supplied filename to a safe final path component.
///
/// Directory parts are dropped, characters outside `[A-Za-z0-9._ -]` become
/// `_`, and leading dots are removed so the result is never hidden or a
/// relative path.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').trim();

    if cleaned.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::fixtures::Scratch;
    use reportsmith_shared::{ContentRecord, ExtractionMetadata, FileType, Result};
    use std::path::Path;

    // -----------------------------------------------------------------------
    // Filename sanitizing
    // -----------------------------------------------------------------------

    #[test]
    fn sanitize_strips_paths() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename(r"C:\Users\me\Q3 deck.pptx"), "Q3 deck.pptx");
        assert_eq!(sanitize_filename(".hidden.pdf"), "hidden.pdf");
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("report<v2>.docx"), "report_v2_.docx");
        assert_eq!(sanitize_filename("résumé.pdf"), "r_sum_.pdf");
        assert_eq!(sanitize_filename(""), "upload");
        assert_eq!(sanitize_filename("dir/"), "upload");
        assert_eq!(sanitize_filename(".."), "upload");
    }

    // -----------------------------------------------------------------------
    // Registry dispatch
    // -----------------------------------------------------------------------

    #[test]
    fn unsupported_extension_is_annotated() {
        let registry = ExtractorRegistry::new();
        let extracted = registry.extract_file(Path::new("/nonexistent/notes.txt"), "notes.txt");
        assert_eq!(extracted.file_type, FileType::Unsupported);
        assert!(extracted.content.is_empty());
        assert_eq!(extracted.error(), Some("Unsupported file type"));
        assert_eq!(extracted.filename, "notes.txt");
    }

    #[test]
    fn extractor_failure_keeps_file_type() {
        let scratch = Scratch::new("registry");
        let path = scratch.path("broken.docx");
        std::fs::write(&path, b"not a zip").unwrap();

        let extracted = ExtractorRegistry::new().extract_file(&path, "broken.docx");
        assert_eq!(extracted.file_type, FileType::Docx);
        assert!(extracted.content.is_empty());
        assert!(extracted.error().is_some_and(|e| e.contains("not a valid package")));
    }

    #[test]
    fn missing_file_is_annotated_not_raised() {
        let extracted =
            ExtractorRegistry::new().extract_file(Path::new("/nonexistent/a.pdf"), "a.pdf");
        assert_eq!(extracted.file_type, FileType::Pdf);
        assert!(extracted.error().is_some());
    }

    struct Misbehaving;

    impl Extractor for Misbehaving {
        fn file_type(&self) -> FileType {
            FileType::Pdf
        }

        fn extract(&self, _path: &Path) -> Result<Extraction> {
            Ok(Extraction {
                content: vec![ContentRecord::Slide {
                    slide: 1,
                    title: "wrong".into(),
                    text: vec![],
                }],
                metadata: ExtractionMetadata::default(),
            })
        }

        fn name(&self) -> &str {
            "misbehaving"
        }
    }

    #[test]
    fn non_conforming_records_are_rejected() {
        let mut registry = ExtractorRegistry::empty();
        registry.register(Box::new(Misbehaving));

        let extracted = registry.extract_file(Path::new("x.pdf"), "x.pdf");
        assert_eq!(extracted.file_type, FileType::Pdf);
        assert!(extracted.content.is_empty());
        assert!(extracted.error().is_some_and(|e| e.contains("content shape")));
        assert!(extracted.conforms());
    }

    #[test]
    fn registry_dispatches_real_pdf() {
        let scratch = Scratch::new("registry-pdf");
        let path = scratch.path("report.pdf");
        crate::extractors::pdf_fixture(&path, &[&["Summary line"]]);

        let extracted = ExtractorRegistry::new().extract_file(&path, "report.pdf");
        assert_eq!(extracted.file_type, FileType::Pdf);
        assert!(extracted.error().is_none());
        assert_eq!(extracted.content.len(), 1);
        assert!(extracted.conforms());
    }
}

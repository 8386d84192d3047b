//! Extractor trait and built-in per-format extractors.
//!
//! Each extractor turns one file type into the canonical record shape for
//! that type. The [`ExtractorRegistry`] dispatches on the file extension and
//! turns every failure into an annotated [`ExtractedFileContent`].

mod docx;
mod media;
mod pdf;
mod pptx;
mod raster;
mod xlsx;

use std::collections::HashMap;
use std::path::Path;

use reportsmith_shared::{
    ContentRecord, ExtractedFileContent, ExtractionMetadata, FileType, ReportError, Result,
};
use tracing::{debug, instrument, warn};

pub use self::docx::DocxExtractor;
pub use self::media::MediaExtractor;
pub use self::pdf::PdfExtractor;
pub use self::pptx::PptxExtractor;
pub use self::raster::ImageExtractor;
pub use self::xlsx::XlsxExtractor;

#[cfg(test)]
pub(crate) use self::pdf::fixtures::write_pdf as pdf_fixture;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Records and metadata produced by a single extractor run.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub content: Vec<ContentRecord>,
    pub metadata: ExtractionMetadata,
}

/// Trait for format-specific content extraction.
///
/// Extractors are synchronous and may be slow; async callers should run
/// them on a blocking thread.
pub trait Extractor: Send + Sync {
    /// The file type this extractor handles.
    fn file_type(&self) -> FileType;

    /// Extract records from the file at `path`.
    fn extract(&self, path: &Path) -> Result<Extraction>;

    /// Human-readable extractor name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Lookup table from file type to extractor.
pub struct ExtractorRegistry {
    extractors: HashMap<FileType, Box<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Create a registry with all built-in extractors.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(PdfExtractor));
        registry.register(Box::new(DocxExtractor));
        registry.register(Box::new(PptxExtractor));
        registry.register(Box::new(XlsxExtractor));
        registry.register(Box::new(ImageExtractor));
        registry.register(Box::new(MediaExtractor::audio()));
        registry.register(Box::new(MediaExtractor::video()));
        registry
    }

    /// A registry with no extractors.
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Register an extractor, replacing any previous one for its type.
    pub fn register(&mut self, extractor: Box<dyn Extractor>) {
        self.extractors.insert(extractor.file_type(), extractor);
    }

    /// The extractor for `file_type`, if one is registered.
    pub fn get(&self, file_type: FileType) -> Option<&dyn Extractor> {
        self.extractors.get(&file_type).map(|e| e.as_ref())
    }

    /// Extract a file, classifying it by `filename`.
    ///
    /// Never fails: unsupported types, extractor errors, and results that do
    /// not match the canonical shape are all recorded in `metadata.error`.
    #[instrument(skip_all, fields(filename = %filename))]
    pub fn extract_file(&self, path: &Path, filename: &str) -> ExtractedFileContent {
        let file_type = FileType::from_filename(filename);
        let Some(extractor) = self.get(file_type) else {
            debug!(%file_type, "no extractor for file type");
            return ExtractedFileContent::unsupported(filename);
        };

        let extraction = match extractor.extract(path) {
            Ok(extraction) => extraction,
            Err(e) => {
                let cause = match e {
                    ReportError::Extraction(message) => message,
                    other => other.to_string(),
                };
                warn!(extractor = extractor.name(), error = %cause, "extraction failed");
                return ExtractedFileContent::failed(file_type, filename, cause);
            }
        };

        let extracted = ExtractedFileContent {
            file_type,
            content: extraction.content,
            metadata: extraction.metadata,
            filename: filename.to_string(),
        };

        if !extracted.conforms() {
            warn!(extractor = extractor.name(), "extractor produced non-conforming records");
            return ExtractedFileContent::failed(
                file_type,
                filename,
                format!("extracted records do not match the {file_type} content shape"),
            );
        }

        debug!(
            extractor = extractor.name(),
            records = extracted.content.len(),
            "extracted file"
        );
        extracted
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//! Core domain types: extracted source content, generated report content,
//! and the closed enumerations that drive dispatch across the pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ReportError;

// ---------------------------------------------------------------------------
// OutputFormat
// ---------------------------------------------------------------------------

/// Target document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Flowing paragraph document (WordprocessingML).
    Docx,
    /// Fixed-layout paginated document.
    Pdf,
    /// Slide deck (PresentationML).
    Pptx,
}

impl OutputFormat {
    /// Every supported format, in declaration order.
    pub const ALL: [OutputFormat; 3] = [Self::Docx, Self::Pdf, Self::Pptx];

    /// Lowercase name, also used as the file extension.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Pdf => "pdf",
            Self::Pptx => "pptx",
        }
    }

    /// File extension for rendered output.
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docx" => Ok(Self::Docx),
            "pdf" => Ok(Self::Pdf),
            "pptx" => Ok(Self::Pptx),
            _ => Err(ReportError::unsupported_format(s)),
        }
    }
}

// ---------------------------------------------------------------------------
// ContentType
// ---------------------------------------------------------------------------

/// How a section's content is generated and rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Flowing paragraphs.
    #[default]
    Text,
    /// Bulleted items.
    List,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::List => "list",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Generated content
// ---------------------------------------------------------------------------

/// A `[source: location]` reference parsed out of generated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub source: String,
    pub location: String,
    /// The full bracket body, as written by the model.
    pub full_citation: String,
}

/// Section body: a single block of text or an ordered list of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionBody {
    Text(String),
    List(Vec<String>),
}

impl SectionBody {
    /// Flatten to plain text (list items one per line).
    pub fn to_plain_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::List(items) => items.join("\n"),
        }
    }

    /// Character length of the flattened text.
    pub fn char_len(&self) -> usize {
        match self {
            Self::Text(text) => text.chars().count(),
            Self::List(items) => {
                items.iter().map(|i| i.chars().count()).sum::<usize>()
                    + items.len().saturating_sub(1)
            }
        }
    }
}

/// Generated output for one template section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionResult {
    pub title: String,
    pub content: SectionBody,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub word_count: usize,
    #[serde(rename = "type", default)]
    pub content_type: ContentType,
}

/// Provenance for a generated document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub generated_at: DateTime<Utc>,
    pub template_name: String,
    #[serde(default)]
    pub sources_used: Vec<String>,
    /// Set when the last refinement attempt could not be applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refinement_error: Option<String>,
}

/// A full generated document: per-section results keyed by section id,
/// in generation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub metadata: GenerationMetadata,
    pub sections: IndexMap<String, SectionResult>,
}

impl GeneratedContent {
    /// Empty content stamped with the current time.
    pub fn new(template_name: impl Into<String>, sources_used: Vec<String>) -> Self {
        Self {
            metadata: GenerationMetadata {
                generated_at: Utc::now(),
                template_name: template_name.into(),
                sources_used,
                refinement_error: None,
            },
            sections: IndexMap::new(),
        }
    }

    /// Total whitespace-delimited words across all sections.
    pub fn total_word_count(&self) -> usize {
        self.sections.values().map(|s| s.word_count).sum()
    }

    /// Total citations across all sections.
    pub fn total_citations(&self) -> usize {
        self.sections.values().map(|s| s.citations.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Extracted content
// ---------------------------------------------------------------------------

/// Source file categories recognised by extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Pptx,
    Docx,
    Xlsx,
    Image,
    Audio,
    Video,
    Unsupported,
}

impl FileType {
    /// Classify a filename by its extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Self {
        let ext = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("pdf") => Self::Pdf,
            Some("pptx") => Self::Pptx,
            Some("docx") => Self::Docx,
            Some("xlsx" | "xls") => Self::Xlsx,
            Some("png" | "jpg" | "jpeg") => Self::Image,
            Some("mp3" | "wav") => Self::Audio,
            Some("mp4" | "avi") => Self::Video,
            _ => Self::Unsupported,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Pptx => "pptx",
            Self::Docx => "docx",
            Self::Xlsx => "xlsx",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One positional record of extracted content. Indices are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentRecord {
    Page {
        page: u32,
        text: String,
    },
    Slide {
        slide: u32,
        title: String,
        text: Vec<String>,
    },
    Paragraph {
        paragraph: u32,
        text: String,
        style: String,
    },
    Sheet {
        sheet: String,
        rows: Vec<Vec<String>>,
    },
    Image {
        description: String,
    },
    Transcript {
        text: String,
    },
    Frame {
        frame: u64,
        timestamp_secs: f64,
    },
}

impl ContentRecord {
    /// Whether this record kind is part of the canonical shape for `file_type`.
    pub fn belongs_to(&self, file_type: FileType) -> bool {
        matches!(
            (self, file_type),
            (Self::Page { .. }, FileType::Pdf)
                | (Self::Slide { .. }, FileType::Pptx)
                | (Self::Paragraph { .. }, FileType::Docx)
                | (Self::Sheet { .. }, FileType::Xlsx)
                | (Self::Image { .. }, FileType::Image)
                | (Self::Transcript { .. }, FileType::Audio)
                | (Self::Frame { .. }, FileType::Video)
        )
    }
}

/// A heading-like line detected during extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedHeading {
    /// Page, slide, or paragraph index the heading was found at.
    pub position: u32,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

/// Format-specific counters and the per-file failure, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub counters: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headings: Vec<DetectedHeading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionMetadata {
    /// Set a named counter.
    pub fn count(&mut self, name: &str, value: u64) {
        self.counters.insert(name.to_string(), value);
    }
}

/// Normalized extraction result for one uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFileContent {
    #[serde(rename = "type")]
    pub file_type: FileType,
    #[serde(default)]
    pub content: Vec<ContentRecord>,
    #[serde(default)]
    pub metadata: ExtractionMetadata,
    pub filename: String,
}

impl ExtractedFileContent {
    /// An extraction result with no records yet.
    pub fn new(file_type: FileType, filename: impl Into<String>) -> Self {
        Self {
            file_type,
            content: Vec::new(),
            metadata: ExtractionMetadata::default(),
            filename: filename.into(),
        }
    }

    /// A failed extraction: no content, error recorded in metadata.
    pub fn failed(file_type: FileType, filename: impl Into<String>, error: impl Into<String>) -> Self {
        let mut extracted = Self::new(file_type, filename);
        extracted.metadata.error = Some(error.into());
        extracted
    }

    /// Result for a file whose type is not recognised.
    pub fn unsupported(filename: impl Into<String>) -> Self {
        Self::failed(FileType::Unsupported, filename, "Unsupported file type")
    }

    /// Whether every record matches the canonical shape for this file type.
    pub fn conforms(&self) -> bool {
        self.content.iter().all(|r| r.belongs_to(self.file_type))
    }

    /// The recorded extraction error, if any.
    pub fn error(&self) -> Option<&str> {
        self.metadata.error.as_deref()
    }
}

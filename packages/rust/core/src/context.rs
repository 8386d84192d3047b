//! Flattens extracted files into the plain-text context block used in
//! every prompt.

use indexmap::IndexMap;
use reportsmith_shared::{ContentRecord, ContextLimits, ExtractedFileContent, truncate_chars};

/// Extracted files keyed by filename, in upload order.
pub type SourceFiles = IndexMap<String, ExtractedFileContent>;

/// One segment per file, in map order, each preceded by a blank line.
pub fn assemble_context(sources: &SourceFiles, limits: &ContextLimits) -> String {
    sources
        .iter()
        .map(|(filename, file)| format!("\n{}", render_segment(filename, file, limits)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The `--- name (TYPE) ---` header followed by that file's records.
///
/// Image, video and unsupported files contribute the header only.
pub fn render_segment(filename: &str, file: &ExtractedFileContent, limits: &ContextLimits) -> String {
    let mut lines = vec![format!(
        "--- {filename} ({}) ---",
        file.file_type.as_str().to_uppercase()
    )];

    for record in &file.content {
        match record {
            ContentRecord::Page { page, text } => {
                lines.push(format!("Page {page}: {}", truncate_chars(text, limits.page_chars)));
            }
            ContentRecord::Slide { slide, title, text } => {
                lines.push(format!("Slide {slide}: {title}"));
                for shape in text {
                    lines.push(format!("  - {}", truncate_chars(shape, limits.slide_text_chars)));
                }
            }
            ContentRecord::Paragraph { paragraph, text, .. } => {
                lines.push(format!(
                    "Para {paragraph}: {}",
                    truncate_chars(text, limits.paragraph_chars)
                ));
            }
            ContentRecord::Sheet { sheet, rows } => {
                lines.push(format!("Sheet {sheet}:"));
                for row in rows.iter().take(limits.sheet_rows) {
                    lines.push(format!("  [{}]", row.join(", ")));
                }
            }
            ContentRecord::Transcript { text } => {
                lines.push(format!(
                    "Transcript: {}",
                    truncate_chars(text, limits.transcript_chars)
                ));
            }
            ContentRecord::Image { .. } | ContentRecord::Frame { .. } => {}
        }
    }

    lines.join("\n")
}

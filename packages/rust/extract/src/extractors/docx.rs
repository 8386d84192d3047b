//! DOCX paragraph extraction.
//!
//! DOCX files are ZIP archives; body text lives in `word/document.xml` and
//! human-readable style names in `word/styles.xml`.

use std::collections::HashMap;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use reportsmith_shared::{ContentRecord, DetectedHeading, FileType, Result};

use super::{Extraction, Extractor};
use crate::ooxml::{attr, fail, open_package, read_optional_part, read_part};

const DEFAULT_STYLE: &str = "Normal";

/// Extracts paragraphs and their styles from Word documents.
pub struct DocxExtractor;

impl Extractor for DocxExtractor {
    fn file_type(&self) -> FileType {
        FileType::Docx
    }

    fn extract(&self, path: &Path) -> Result<Extraction> {
        let mut package = open_package(path)?;
        let document = read_part(&mut package, "word/document.xml")?;
        let styles = match read_optional_part(&mut package, "word/styles.xml")? {
            Some(xml) => style_names(&xml)?,
            None => HashMap::new(),
        };

        let paragraphs = parse_paragraphs(&document)?;
        let mut extraction = Extraction::default();
        extraction
            .metadata
            .count("paragraphs", paragraphs.len() as u64);

        for (index, paragraph) in paragraphs.into_iter().enumerate() {
            if paragraph.text.trim().is_empty() {
                continue;
            }
            let position = index as u32 + 1;
            let style = paragraph
                .style_id
                .map(|id| styles.get(&id).cloned().unwrap_or(id))
                .unwrap_or_else(|| DEFAULT_STYLE.to_string());

            if style.to_ascii_lowercase().starts_with("heading") {
                extraction.metadata.headings.push(DetectedHeading {
                    position,
                    text: paragraph.text.clone(),
                    level: Some(style.clone()),
                });
            }
            extraction.content.push(ContentRecord::Paragraph {
                paragraph: position,
                text: paragraph.text,
                style,
            });
        }

        Ok(extraction)
    }

    fn name(&self) -> &str {
        "docx"
    }
}

#[derive(Debug, Default)]
struct RawParagraph {
    text: String,
    style_id: Option<String>,
}

/// Scan `document.xml`, returning every paragraph (blank ones included) in
/// document order. Paragraphs nested in text boxes are folded into their
/// enclosing paragraph.
fn parse_paragraphs(xml: &str) -> Result<Vec<RawParagraph>> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = RawParagraph::default();
    let mut depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(fail)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => {
                    if depth == 0 {
                        current = RawParagraph::default();
                    }
                    depth += 1;
                }
                b"t" if depth > 0 => in_text = true,
                b"pStyle" if depth == 1 => current.style_id = attr(&e, b"val"),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" if depth == 0 => paragraphs.push(RawParagraph::default()),
                b"pStyle" if depth == 1 => current.style_id = attr(&e, b"val"),
                b"tab" if depth > 0 => current.text.push('\t'),
                b"br" | b"cr" if depth > 0 => current.text.push('\n'),
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        paragraphs.push(std::mem::take(&mut current));
                    }
                }
                _ => {}
            },
            Event::Text(e) if in_text => {
                let text = e.unescape().map_err(fail)?;
                current.text.push_str(&text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// Map style ids to display names from `styles.xml`, normalising the
/// lowercase built-in heading names (`heading 1` -> `Heading 1`).
fn style_names(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut names = HashMap::new();
    let mut current_id: Option<String> = None;

    loop {
        match reader.read_event().map_err(fail)? {
            Event::Start(e) if e.local_name().as_ref() == b"style" => {
                current_id = attr(&e, b"styleId");
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"name" => {
                if let (Some(id), Some(name)) = (current_id.as_ref(), attr(&e, b"val")) {
                    names.insert(id.clone(), capitalize(&name));
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"style" => current_id = None,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(names)
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::fixtures::{write_package, Scratch};

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Overview</w:t></w:r></w:p>
    <w:p/>
    <w:p><w:r><w:t xml:space="preserve">Sales rose </w:t></w:r><w:r><w:t>&amp; margins held.</w:t></w:r></w:p>
    <w:p><w:pPr><w:pStyle w:val="Quote"/></w:pPr><w:r><w:t>Keep going</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style>
  <w:style w:type="paragraph" w:styleId="Normal"><w:name w:val="Normal"/></w:style>
</w:styles>"#;

    #[test]
    fn paragraphs_keep_document_positions() {
        let paragraphs = parse_paragraphs(DOCUMENT).unwrap();
        assert_eq!(paragraphs.len(), 4);
        assert_eq!(paragraphs[0].style_id.as_deref(), Some("Heading1"));
        assert!(paragraphs[1].text.is_empty());
        assert_eq!(paragraphs[2].text, "Sales rose & margins held.");
    }

    #[test]
    fn extracts_styled_paragraphs() {
        let scratch = Scratch::new("docx");
        let path = scratch.path("brief.docx");
        write_package(
            &path,
            &[("word/document.xml", DOCUMENT), ("word/styles.xml", STYLES)],
        );

        let extraction = DocxExtractor.extract(&path).unwrap();
        assert_eq!(extraction.metadata.counters["paragraphs"], 4);
        assert_eq!(extraction.content.len(), 3);

        assert_eq!(
            extraction.content[0],
            ContentRecord::Paragraph {
                paragraph: 1,
                text: "Overview".into(),
                style: "Heading 1".into(),
            }
        );
        assert_eq!(
            extraction.content[1],
            ContentRecord::Paragraph {
                paragraph: 3,
                text: "Sales rose & margins held.".into(),
                style: "Normal".into(),
            }
        );
        // unknown style ids fall back to the id itself
        assert!(matches!(
            &extraction.content[2],
            ContentRecord::Paragraph { style, .. } if style == "Quote"
        ));

        assert_eq!(extraction.metadata.headings.len(), 1);
        assert_eq!(
            extraction.metadata.headings[0].level.as_deref(),
            Some("Heading 1")
        );
    }

    #[test]
    fn missing_document_part_is_an_error() {
        let scratch = Scratch::new("docx-empty");
        let path = scratch.path("empty.docx");
        write_package(&path, &[("word/styles.xml", STYLES)]);
        let err = DocxExtractor.extract(&path).unwrap_err();
        assert!(err.to_string().contains("word/document.xml"));
    }
}

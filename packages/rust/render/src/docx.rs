//! WordprocessingML renderer.
//!
//! Template typography goes into `word/styles.xml` as document defaults;
//! page margins go into the body's `w:sectPr`.

use reportsmith_shared::{Formatting, OutputFormat, Result};

use crate::outline::{BULLET, Outline, OutlineBody, SOURCES_LABEL};
use crate::registry::DocumentRenderer;
use crate::xml::{Package, XmlDoc};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// A4 in twentieths of a point.
const PAGE_WIDTH_TWIPS: &str = "11906";
const PAGE_HEIGHT_TWIPS: &str = "16838";
const TWIPS_PER_INCH: f64 = 1440.0;

/// Indented paragraph style for list items. The bullet glyph is part of the
/// text, so the style carries no numbering and is not Word's built-in
/// "List Bullet".
const LIST_STYLE: &str = "ListItem";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

/// Renders outlines as `.docx` packages.
pub struct DocxRenderer;

impl DocumentRenderer for DocxRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Docx
    }

    fn render(&self, outline: &Outline) -> Result<Vec<u8>> {
        let mut package = Package::new();
        package.add("[Content_Types].xml", CONTENT_TYPES.as_bytes())?;
        package.add("_rels/.rels", PACKAGE_RELS.as_bytes())?;
        package.add("word/_rels/document.xml.rels", DOCUMENT_RELS.as_bytes())?;
        package.add("word/styles.xml", &styles_xml(&outline.formatting)?)?;
        package.add("word/document.xml", &document_xml(outline)?)?;
        package.finish()
    }
}

fn document_xml(outline: &Outline) -> Result<Vec<u8>> {
    let mut doc = XmlDoc::new()?;
    doc.open("w:document", &[("xmlns:w", W_NS), ("xmlns:r", R_NS)])?
        .open("w:body", &[])?;

    paragraph(&mut doc, Some("Title"), &outline.title)?;
    for line in outline.preamble() {
        paragraph(&mut doc, None, &line)?;
    }
    paragraph(&mut doc, None, "")?;

    for section in &outline.sections {
        paragraph(&mut doc, Some("Heading1"), &section.heading)?;
        match &section.body {
            OutlineBody::Items(items) => {
                for item in items {
                    paragraph(&mut doc, Some(LIST_STYLE), &format!("{BULLET}{item}"))?;
                }
            }
            OutlineBody::Block(text) => {
                for block in text.split("\n\n") {
                    paragraph(&mut doc, None, block)?;
                }
            }
        }
        if !section.citations.is_empty() {
            paragraph(&mut doc, Some("Heading3"), SOURCES_LABEL)?;
            for citation in &section.citations {
                paragraph(&mut doc, Some(LIST_STYLE), &format!("{BULLET}{citation}"))?;
            }
        }
        paragraph(&mut doc, None, "")?;
    }

    let margins = &outline.formatting.margins;
    let twips = |inches: f64| ((inches * TWIPS_PER_INCH).round() as i64).to_string();
    let (top, bottom, left, right) = (
        twips(margins.top),
        twips(margins.bottom),
        twips(margins.left),
        twips(margins.right),
    );
    doc.open("w:sectPr", &[])?
        .empty(
            "w:pgSz",
            &[("w:w", PAGE_WIDTH_TWIPS), ("w:h", PAGE_HEIGHT_TWIPS)],
        )?
        .empty(
            "w:pgMar",
            &[
                ("w:top", top.as_str()),
                ("w:right", right.as_str()),
                ("w:bottom", bottom.as_str()),
                ("w:left", left.as_str()),
                ("w:header", "720"),
                ("w:footer", "720"),
                ("w:gutter", "0"),
            ],
        )?
        .close("w:sectPr")?;

    doc.close("w:body")?.close("w:document")?;
    Ok(doc.finish())
}

/// One paragraph; single line breaks inside `text` become `w:br`.
fn paragraph(doc: &mut XmlDoc, style: Option<&str>, text: &str) -> Result<()> {
    doc.open("w:p", &[])?;
    if let Some(style) = style {
        doc.open("w:pPr", &[])?
            .empty("w:pStyle", &[("w:val", style)])?
            .close("w:pPr")?;
    }
    if !text.is_empty() {
        doc.open("w:r", &[])?;
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                doc.empty("w:br", &[])?;
            }
            doc.element("w:t", &[("xml:space", "preserve")], line)?;
        }
        doc.close("w:r")?;
    }
    doc.close("w:p")?;
    Ok(())
}

fn styles_xml(formatting: &Formatting) -> Result<Vec<u8>> {
    let font = formatting.font_family.as_str();
    let half_points = |pt: f64| ((pt * 2.0).round() as i64).to_string();
    let body_size = half_points(formatting.font_size);
    let line = ((formatting.line_spacing * 240.0).round() as i64).to_string();

    let mut doc = XmlDoc::new()?;
    doc.open("w:styles", &[("xmlns:w", W_NS)])?;

    doc.open("w:docDefaults", &[])?
        .open("w:rPrDefault", &[])?
        .open("w:rPr", &[])?
        .empty(
            "w:rFonts",
            &[("w:ascii", font), ("w:hAnsi", font), ("w:cs", font), ("w:eastAsia", font)],
        )?
        .empty("w:sz", &[("w:val", body_size.as_str())])?
        .empty("w:szCs", &[("w:val", body_size.as_str())])?
        .close("w:rPr")?
        .close("w:rPrDefault")?
        .open("w:pPrDefault", &[])?
        .open("w:pPr", &[])?
        .empty(
            "w:spacing",
            &[("w:after", "120"), ("w:line", line.as_str()), ("w:lineRule", "auto")],
        )?
        .close("w:pPr")?
        .close("w:pPrDefault")?
        .close("w:docDefaults")?;

    doc.open(
        "w:style",
        &[("w:type", "paragraph"), ("w:default", "1"), ("w:styleId", "Normal")],
    )?
    .empty("w:name", &[("w:val", "Normal")])?
    .close("w:style")?;

    heading_style(&mut doc, "Title", "Title", &half_points(26.0), true)?;
    heading_style(&mut doc, "Heading1", "heading 1", &half_points(16.0), false)?;
    heading_style(&mut doc, "Heading3", "heading 3", &half_points(12.0), false)?;

    doc.open("w:style", &[("w:type", "paragraph"), ("w:styleId", LIST_STYLE)])?
        .empty("w:name", &[("w:val", "List Item")])?
        .empty("w:basedOn", &[("w:val", "Normal")])?
        .open("w:pPr", &[])?
        .empty("w:ind", &[("w:left", "360")])?
        .close("w:pPr")?
        .close("w:style")?;

    doc.close("w:styles")?;
    Ok(doc.finish())
}

fn heading_style(doc: &mut XmlDoc, id: &str, name: &str, size: &str, centered: bool) -> Result<()> {
    doc.open("w:style", &[("w:type", "paragraph"), ("w:styleId", id)])?
        .empty("w:name", &[("w:val", name)])?
        .empty("w:basedOn", &[("w:val", "Normal")])?
        .empty("w:next", &[("w:val", "Normal")])?
        .open("w:pPr", &[])?
        .empty("w:keepNext", &[])?
        .empty("w:spacing", &[("w:before", "240"), ("w:after", "120")])?;
    if centered {
        doc.empty("w:jc", &[("w:val", "center")])?;
    }
    doc.close("w:pPr")?
        .open("w:rPr", &[])?
        .empty("w:b", &[])?
        .empty("w:sz", &[("w:val", size)])?
        .empty("w:szCs", &[("w:val", size)])?
        .close("w:rPr")?
        .close("w:style")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::fixtures::partial_report;
    use std::io::{Cursor, Read};

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut xml = String::new();
        part.read_to_string(&mut xml).unwrap();
        xml
    }

    #[test]
    fn document_contains_present_sections_only() {
        let (content, template) = partial_report();
        let outline = Outline::build(&content, &template);
        let bytes = DocxRenderer.render(&outline).unwrap();

        let document = read_part(&bytes, "word/document.xml");
        assert!(document.contains("Default Consulting Report"));
        assert!(document.contains("Executive Summary"));
        assert!(document.contains("Key Findings"));
        assert!(document.contains("\u{2022} Churn fell"));
        assert!(document.contains(r#"<w:pStyle w:val="Heading3"/>"#));
        assert!(document.contains("\u{2022} deck.pptx: slide 3"));
        assert!(!document.contains("Methodology"));
        assert!(!document.contains("Recommendations"));
    }

    #[test]
    fn list_items_carry_a_single_bullet() {
        let (content, template) = partial_report();
        let bytes = DocxRenderer.render(&Outline::build(&content, &template)).unwrap();

        let document = read_part(&bytes, "word/document.xml");
        assert!(document.contains(r#"<w:pStyle w:val="ListItem"/>"#));
        assert!(!document.contains("ListBullet"));
        assert!(!document.contains("\u{2022} \u{2022}"));

        let styles = read_part(&bytes, "word/styles.xml");
        assert!(!styles.contains("w:numPr"));
        assert!(!styles.contains("List Bullet"));
        assert!(!bytes.windows(b"numbering.xml".len()).any(|w| w == b"numbering.xml"));
    }

    #[test]
    fn formatting_flows_into_styles_and_margins() {
        let (content, mut template) = partial_report();
        template.formatting.font_family = "Georgia".into();
        template.formatting.font_size = 11.0;
        template.formatting.margins.left = 1.5;
        let outline = Outline::build(&content, &template);
        let bytes = DocxRenderer.render(&outline).unwrap();

        let styles = read_part(&bytes, "word/styles.xml");
        assert!(styles.contains(r#"w:ascii="Georgia""#));
        assert!(styles.contains(r#"<w:sz w:val="22"/>"#));
        assert!(styles.contains(r#"w:line="360""#));

        let document = read_part(&bytes, "word/document.xml");
        assert!(document.contains(r#"w:left="2160""#));
        assert!(document.contains(r#"w:top="1440""#));
    }

    #[test]
    fn package_has_required_parts() {
        let (content, template) = partial_report();
        let bytes = DocxRenderer.render(&Outline::build(&content, &template)).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/document.xml",
            "word/styles.xml",
            "word/_rels/document.xml.rels",
        ] {
            assert!(names.contains(&part), "missing {part}");
        }
    }
}

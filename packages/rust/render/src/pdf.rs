//! Fixed-layout PDF renderer.
//!
//! Lays the outline out on A4 pages with one of the standard Type1 fonts,
//! greedy word wrapping based on an average glyph width, and simple
//! top-to-bottom pagination. Content streams are left uncompressed.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};
use reportsmith_shared::{Formatting, OutputFormat, ReportError, Result};

use crate::outline::{BULLET, Outline, OutlineBody, SOURCES_LABEL};
use crate::registry::DocumentRenderer;

const PAGE_WIDTH: f64 = 595.0;
const PAGE_HEIGHT: f64 = 842.0;
const POINTS_PER_INCH: f64 = 72.0;

const TITLE_SIZE: f64 = 18.0;
const HEADING_SIZE: f64 = 14.0;
const LABEL_SIZE: f64 = 12.0;
const BULLET_INDENT: f64 = 14.0;

/// Renders outlines as PDF documents.
pub struct PdfRenderer;

impl DocumentRenderer for PdfRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Pdf
    }

    fn render(&self, outline: &Outline) -> Result<Vec<u8>> {
        let fonts = FontPair::for_family(&outline.formatting.font_family);
        let layout = Layout::new(&outline.formatting, fonts);
        let pages = layout.paginate(&lines(outline, &outline.formatting));
        write_document(&pages, fonts)
    }
}

// ---------------------------------------------------------------------------
// Fonts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Weight {
    Regular,
    Bold,
}

impl Weight {
    fn resource(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }
}

/// Regular and bold base fonts plus an average glyph width (em fraction).
#[derive(Debug, Clone, Copy)]
struct FontPair {
    regular: &'static str,
    bold: &'static str,
    avg_width: f64,
}

impl FontPair {
    /// Map a template font family onto the closest standard PDF font.
    fn for_family(family: &str) -> Self {
        let family = family.to_ascii_lowercase();
        if family.contains("courier") || family.contains("mono") || family.contains("consolas") {
            Self {
                regular: "Courier",
                bold: "Courier-Bold",
                avg_width: 0.6,
            }
        } else if family.contains("times")
            || family.contains("georgia")
            || family.contains("garamond")
            || (family.contains("serif") && !family.contains("sans"))
        {
            Self {
                regular: "Times-Roman",
                bold: "Times-Bold",
                avg_width: 0.47,
            }
        } else {
            Self {
                regular: "Helvetica",
                bold: "Helvetica-Bold",
                avg_width: 0.52,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// A logical line before wrapping.
#[derive(Debug, Clone)]
struct Line {
    text: String,
    weight: Weight,
    size: f64,
    indent: f64,
    space_before: f64,
    leading: f64,
}

/// A positioned, wrapped line on a page.
#[derive(Debug, Clone, PartialEq)]
struct Placed {
    text: String,
    weight: Weight,
    size: f64,
    x: f64,
    y: f64,
}

fn lines(outline: &Outline, formatting: &Formatting) -> Vec<Line> {
    let body = formatting.font_size;
    let body_leading = body * formatting.line_spacing.max(1.0);
    let line = |text: &str, weight, size: f64, indent, space_before| Line {
        text: text.to_string(),
        weight,
        size,
        indent,
        space_before,
        leading: if size == body { body_leading } else { size * 1.2 },
    };

    let mut out = vec![line(&outline.title, Weight::Bold, TITLE_SIZE, 0.0, 0.0)];
    for (i, text) in outline.preamble().iter().enumerate() {
        let gap = if i == 0 { TITLE_SIZE } else { 0.0 };
        out.push(line(text, Weight::Regular, body, 0.0, gap));
    }

    for section in &outline.sections {
        out.push(line(&section.heading, Weight::Bold, HEADING_SIZE, 0.0, 20.0));
        match &section.body {
            OutlineBody::Items(items) => {
                for item in items {
                    out.push(line(&format!("{BULLET}{item}"), Weight::Regular, body, BULLET_INDENT, 4.0));
                }
            }
            OutlineBody::Block(text) => {
                for (i, paragraph) in text.split('\n').enumerate() {
                    let gap = if i == 0 { 6.0 } else { 2.0 };
                    out.push(line(paragraph, Weight::Regular, body, 0.0, gap));
                }
            }
        }
        if !section.citations.is_empty() {
            out.push(line(SOURCES_LABEL, Weight::Bold, LABEL_SIZE, 0.0, 10.0));
            for citation in &section.citations {
                out.push(line(&format!("{BULLET}{citation}"), Weight::Regular, body, BULLET_INDENT, 2.0));
            }
        }
    }
    out
}

struct Layout {
    left: f64,
    top: f64,
    bottom: f64,
    width: f64,
    fonts: FontPair,
}

impl Layout {
    fn new(formatting: &Formatting, fonts: FontPair) -> Self {
        let m = &formatting.margins;
        let left = m.left * POINTS_PER_INCH;
        let right = m.right * POINTS_PER_INCH;
        Self {
            left,
            top: PAGE_HEIGHT - m.top * POINTS_PER_INCH,
            bottom: m.bottom * POINTS_PER_INCH,
            width: (PAGE_WIDTH - left - right).max(72.0),
            fonts,
        }
    }

    /// Wrap and place every line, starting a new page when the next line
    /// would cross the bottom margin. Always yields at least one page.
    fn paginate(&self, lines: &[Line]) -> Vec<Vec<Placed>> {
        let mut pages = vec![Vec::new()];
        let mut y = self.top;

        for line in lines {
            let max_chars = ((self.width - line.indent) / (line.size * self.fonts.avg_width))
                .floor()
                .max(1.0) as usize;
            let wrapped = wrap(&line.text, max_chars);

            for (i, text) in wrapped.into_iter().enumerate() {
                let gap = if i == 0 { line.space_before } else { 0.0 };
                let mut next = y - gap - line.leading;
                let page_is_empty = pages.last().is_some_and(|p| p.is_empty());
                if next < self.bottom && !page_is_empty {
                    pages.push(Vec::new());
                    next = self.top - line.leading;
                }
                y = next;
                if let Some(page) = pages.last_mut() {
                    page.push(Placed {
                        text,
                        weight: line.weight,
                        size: line.size,
                        x: self.left + line.indent,
                        y,
                    });
                }
            }
        }
        pages
    }
}

/// Greedy word wrap to at most `max_chars` per line; overlong words are split.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if current_len > 0 {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            out.push(word.into_iter().collect());
            word = rest;
        }
        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > max_chars && current_len > 0 {
            out.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if current_len > 0 || out.is_empty() {
        out.push(current);
    }
    out
}

// ---------------------------------------------------------------------------
// PDF objects
// ---------------------------------------------------------------------------

fn write_document(pages: &[Vec<Placed>], fonts: FontPair) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font = |doc: &mut Document, base: &str| -> ObjectId {
        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => Object::Name(base.as_bytes().to_vec()),
            "Encoding" => "WinAnsiEncoding",
        })
    };
    let regular_id = font(&mut doc, fonts.regular);
    let bold_id = font(&mut doc, fonts.bold);
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            Weight::Regular.resource() => regular_id,
            Weight::Bold.resource() => bold_id,
        },
    });

    let mut kids = Vec::with_capacity(pages.len());
    for placed in pages {
        let content = Content {
            operations: page_operations(placed),
        };
        let bytes = content
            .encode()
            .map_err(|e| ReportError::Render(format!("failed to encode page: {e}")))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, bytes));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), (PAGE_WIDTH as i64).into(), (PAGE_HEIGHT as i64).into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| ReportError::Render(format!("failed to write PDF: {e}")))?;
    Ok(out)
}

fn page_operations(placed: &[Placed]) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(placed.len() * 5);
    for line in placed {
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![line.weight.resource().into(), (line.size.round() as i64).into()],
        ));
        ops.push(Operation::new(
            "Td",
            vec![(line.x.round() as i64).into(), (line.y.round() as i64).into()],
        ));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(win_ansi(&line.text), StringFormat::Literal)],
        ));
        ops.push(Operation::new("ET", vec![]));
    }
    ops
}

/// Encode text for WinAnsiEncoding; unmappable characters become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u8,
            '\u{20ac}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\t' => b' ',
            _ => b'?',
        })
        .collect()
}

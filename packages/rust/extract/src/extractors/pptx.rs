//! PPTX slide extraction.
//!
//! Slides are read from `ppt/slides/slideN.xml` in numeric order. Each text
//! shape (`p:sp` with a text body) becomes one string; the title placeholder,
//! or failing that a short first shape, becomes the slide title.

use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use reportsmith_shared::{ContentRecord, DetectedHeading, FileType, Result};

use super::{Extraction, Extractor};
use crate::ooxml::{attr, fail, open_package, read_part};

/// A first shape shorter than this is treated as the title when the slide
/// has no title placeholder.
const MAX_IMPLICIT_TITLE_CHARS: usize = 100;

/// Extracts slide titles and text from PowerPoint decks.
pub struct PptxExtractor;

impl Extractor for PptxExtractor {
    fn file_type(&self) -> FileType {
        FileType::Pptx
    }

    fn extract(&self, path: &Path) -> Result<Extraction> {
        let mut package = open_package(path)?;

        let mut slide_parts: Vec<(u32, String)> = package
            .file_names()
            .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
            .collect();
        slide_parts.sort_by_key(|(n, _)| *n);

        let mut extraction = Extraction::default();
        extraction
            .metadata
            .count("slides", slide_parts.len() as u64);

        for (index, (_, part)) in slide_parts.iter().enumerate() {
            let xml = read_part(&mut package, part)?;
            let shapes = parse_shapes(&xml)?;
            let slide = index as u32 + 1;
            let (title, text) = split_title(shapes);

            if !title.is_empty() {
                extraction.metadata.headings.push(DetectedHeading {
                    position: slide,
                    text: title.clone(),
                    level: None,
                });
            }
            extraction
                .content
                .push(ContentRecord::Slide { slide, title, text });
        }

        Ok(extraction)
    }

    fn name(&self) -> &str {
        "pptx"
    }
}

/// `ppt/slides/slide12.xml` -> `12`.
fn slide_number(part: &str) -> Option<u32> {
    part.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

#[derive(Debug, Default)]
struct Shape {
    text: String,
    is_title: bool,
}

/// Collect non-blank text shapes in z-order.
fn parse_shapes(xml: &str) -> Result<Vec<Shape>> {
    let mut reader = Reader::from_str(xml);
    let mut shapes = Vec::new();
    let mut current: Option<Shape> = None;
    let mut paragraphs: Vec<String> = Vec::new();
    let mut paragraph = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(fail)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"sp" => {
                    current = Some(Shape::default());
                    paragraphs.clear();
                }
                b"ph" => mark_title(&mut current, attr(&e, b"type")),
                b"p" => paragraph.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"ph" => mark_title(&mut current, attr(&e, b"type")),
                b"br" => paragraph.push('\n'),
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut paragraph)),
                b"sp" => {
                    if let Some(mut shape) = current.take() {
                        shape.text = paragraphs.join("\n").trim().to_string();
                        if !shape.text.is_empty() {
                            shapes.push(shape);
                        }
                    }
                }
                _ => {}
            },
            Event::Text(e) if in_text => {
                let text = e.unescape().map_err(fail)?;
                paragraph.push_str(&text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(shapes)
}

fn mark_title(shape: &mut Option<Shape>, placeholder_type: Option<String>) {
    if let (Some(shape), Some("title" | "ctrTitle")) = (shape.as_mut(), placeholder_type.as_deref()) {
        shape.is_title = true;
    }
}

/// Pick the slide title and return the remaining shape texts in order.
fn split_title(mut shapes: Vec<Shape>) -> (String, Vec<String>) {
    let title_index = shapes.iter().position(|s| s.is_title).or_else(|| {
        shapes
            .first()
            .filter(|s| s.text.chars().count() < MAX_IMPLICIT_TITLE_CHARS)
            .map(|_| 0)
    });

    let title = match title_index {
        Some(i) => shapes.remove(i).text,
        None => String::new(),
    };
    (title, shapes.into_iter().map(|s| s.text).collect())
}

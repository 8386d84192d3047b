//! PresentationML (slide deck) renderer.
//!
//! Produces a 16:9 deck: a title slide, then one slide per section. A
//! section with more than [`MAX_INLINE_CITATIONS`] citations gets a separate
//! `{heading} - Sources` slide; fewer are listed under the body.

use reportsmith_shared::{OutputFormat, Result};

use crate::outline::{BULLET, Outline, OutlineBody, OutlineSection, SOURCES_LABEL};
use crate::registry::DocumentRenderer;
use crate::xml::{Package, XmlDoc};

/// Citations beyond this count move to their own slide.
pub const MAX_INLINE_CITATIONS: usize = 3;

const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const P_NS: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// 13.333in x 7.5in in EMU.
const SLIDE_CX: i64 = 12_192_000;
const SLIDE_CY: i64 = 6_858_000;
const MARGIN: i64 = 457_200;

const TITLE_SIZE: u32 = 4000;
const HEADING_SIZE: u32 = 3200;
const BODY_SIZE: u32 = 1800;
const CITATION_SIZE: u32 = 1400;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#;

const SLIDE_MASTER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#;

const SLIDE_MASTER_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="../theme/theme1.xml"/></Relationships>"#;

const SLIDE_LAYOUT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" type="blank" preserve="1"><p:cSld name="Blank"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#;

const SLIDE_LAYOUT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="../slideMasters/slideMaster1.xml"/></Relationships>"#;

const SLIDE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/></Relationships>"#;

const THEME: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Report"><a:themeElements><a:clrScheme name="Report"><a:dk1><a:srgbClr val="000000"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="44546A"/></a:dk2><a:lt2><a:srgbClr val="E7E6E6"/></a:lt2><a:accent1><a:srgbClr val="4472C4"/></a:accent1><a:accent2><a:srgbClr val="ED7D31"/></a:accent2><a:accent3><a:srgbClr val="A5A5A5"/></a:accent3><a:accent4><a:srgbClr val="FFC000"/></a:accent4><a:accent5><a:srgbClr val="5B9BD5"/></a:accent5><a:accent6><a:srgbClr val="70AD47"/></a:accent6><a:hlink><a:srgbClr val="0563C1"/></a:hlink><a:folHlink><a:srgbClr val="954F72"/></a:folHlink></a:clrScheme><a:fontScheme name="Report"><a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Report"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#;

/// Renders outlines as `.pptx` decks.
pub struct PptxRenderer;

impl DocumentRenderer for PptxRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Pptx
    }

    fn render(&self, outline: &Outline) -> Result<Vec<u8>> {
        let slides = plan_slides(outline);
        let font = outline.formatting.font_family.as_str();

        let mut package = Package::new();
        package.add("[Content_Types].xml", &content_types(slides.len())?)?;
        package.add("_rels/.rels", PACKAGE_RELS.as_bytes())?;
        package.add("ppt/presentation.xml", &presentation_xml(slides.len())?)?;
        package.add(
            "ppt/_rels/presentation.xml.rels",
            &presentation_rels(slides.len())?,
        )?;
        package.add("ppt/slideMasters/slideMaster1.xml", SLIDE_MASTER.as_bytes())?;
        package.add(
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            SLIDE_MASTER_RELS.as_bytes(),
        )?;
        package.add("ppt/slideLayouts/slideLayout1.xml", SLIDE_LAYOUT.as_bytes())?;
        package.add(
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            SLIDE_LAYOUT_RELS.as_bytes(),
        )?;
        package.add("ppt/theme/theme1.xml", THEME.as_bytes())?;

        for (i, slide) in slides.iter().enumerate() {
            let n = i + 1;
            package.add(&format!("ppt/slides/slide{n}.xml"), &slide_xml(slide, font)?)?;
            package.add(
                &format!("ppt/slides/_rels/slide{n}.xml.rels"),
                SLIDE_RELS.as_bytes(),
            )?;
        }
        package.finish()
    }
}

// ---------------------------------------------------------------------------
// Slide planning
// ---------------------------------------------------------------------------

/// A run of text in the body box.
#[derive(Debug, Clone, PartialEq)]
struct BodyLine {
    text: String,
    size: u32,
    bold: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct SlidePlan {
    title: String,
    title_size: u32,
    centered_title: bool,
    body: Vec<BodyLine>,
}

fn body_line(text: impl Into<String>, size: u32, bold: bool) -> BodyLine {
    BodyLine {
        text: text.into(),
        size,
        bold,
    }
}

fn plan_slides(outline: &Outline) -> Vec<SlidePlan> {
    let mut slides = vec![SlidePlan {
        title: outline.title.clone(),
        title_size: TITLE_SIZE,
        centered_title: true,
        body: outline
            .preamble()
            .into_iter()
            .map(|line| body_line(line, BODY_SIZE, false))
            .collect(),
    }];

    for section in &outline.sections {
        slides.extend(section_slides(section));
    }
    slides
}

fn section_slides(section: &OutlineSection) -> Vec<SlidePlan> {
    let mut body: Vec<BodyLine> = match &section.body {
        OutlineBody::Items(items) => items
            .iter()
            .map(|item| body_line(format!("{BULLET}{item}"), BODY_SIZE, false))
            .collect(),
        OutlineBody::Block(text) => text
            .split('\n')
            .map(|line| body_line(line, BODY_SIZE, false))
            .collect(),
    };

    let citations: Vec<BodyLine> = section
        .citations
        .iter()
        .map(|c| body_line(format!("{BULLET}{c}"), CITATION_SIZE, false))
        .collect();

    let overflow = citations.len() > MAX_INLINE_CITATIONS;
    if !citations.is_empty() && !overflow {
        body.push(body_line(SOURCES_LABEL, CITATION_SIZE, true));
        body.extend(citations.iter().cloned());
    }

    let mut slides = vec![SlidePlan {
        title: section.heading.clone(),
        title_size: HEADING_SIZE,
        centered_title: false,
        body,
    }];
    if overflow {
        slides.push(SlidePlan {
            title: format!("{} - Sources", section.heading),
            title_size: HEADING_SIZE,
            centered_title: false,
            body: citations,
        });
    }
    slides
}

// ---------------------------------------------------------------------------
// XML parts
// ---------------------------------------------------------------------------

fn content_types(slide_count: usize) -> Result<Vec<u8>> {
    let mut doc = XmlDoc::new()?;
    doc.open(
        "Types",
        &[("xmlns", "http://schemas.openxmlformats.org/package/2006/content-types")],
    )?
    .empty(
        "Default",
        &[
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ],
    )?
    .empty(
        "Default",
        &[("Extension", "xml"), ("ContentType", "application/xml")],
    )?;

    let overrides = [
        (
            "/ppt/presentation.xml",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml",
        ),
        (
            "/ppt/slideMasters/slideMaster1.xml",
            "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml",
        ),
        (
            "/ppt/slideLayouts/slideLayout1.xml",
            "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml",
        ),
        (
            "/ppt/theme/theme1.xml",
            "application/vnd.openxmlformats-officedocument.theme+xml",
        ),
    ];
    for (part, content_type) in overrides {
        doc.empty("Override", &[("PartName", part), ("ContentType", content_type)])?;
    }
    for n in 1..=slide_count {
        let part = format!("/ppt/slides/slide{n}.xml");
        doc.empty(
            "Override",
            &[
                ("PartName", part.as_str()),
                (
                    "ContentType",
                    "application/vnd.openxmlformats-officedocument.presentationml.slide+xml",
                ),
            ],
        )?;
    }
    doc.close("Types")?;
    Ok(doc.finish())
}

fn presentation_xml(slide_count: usize) -> Result<Vec<u8>> {
    let (cx, cy) = (SLIDE_CX.to_string(), SLIDE_CY.to_string());
    let mut doc = XmlDoc::new()?;
    doc.open(
        "p:presentation",
        &[("xmlns:a", A_NS), ("xmlns:r", R_NS), ("xmlns:p", P_NS)],
    )?
    .open("p:sldMasterIdLst", &[])?
    .empty("p:sldMasterId", &[("id", "2147483648"), ("r:id", "rId1")])?
    .close("p:sldMasterIdLst")?
    .open("p:sldIdLst", &[])?;
    for i in 0..slide_count {
        let id = (256 + i).to_string();
        let rel = format!("rId{}", i + 3);
        doc.empty("p:sldId", &[("id", id.as_str()), ("r:id", rel.as_str())])?;
    }
    doc.close("p:sldIdLst")?
        .empty("p:sldSz", &[("cx", cx.as_str()), ("cy", cy.as_str())])?
        .empty("p:notesSz", &[("cx", "6858000"), ("cy", "9144000")])?
        .close("p:presentation")?;
    Ok(doc.finish())
}

fn presentation_rels(slide_count: usize) -> Result<Vec<u8>> {
    let mut doc = XmlDoc::new()?;
    doc.open(
        "Relationships",
        &[("xmlns", "http://schemas.openxmlformats.org/package/2006/relationships")],
    )?;
    relationship(&mut doc, "rId1", "slideMaster", "slideMasters/slideMaster1.xml")?;
    relationship(&mut doc, "rId2", "theme", "theme/theme1.xml")?;
    for i in 0..slide_count {
        let id = format!("rId{}", i + 3);
        let target = format!("slides/slide{}.xml", i + 1);
        relationship(&mut doc, &id, "slide", &target)?;
    }
    doc.close("Relationships")?;
    Ok(doc.finish())
}

fn relationship(doc: &mut XmlDoc, id: &str, kind: &str, target: &str) -> Result<()> {
    let rel_type = format!("{REL_NS}/{kind}");
    doc.empty(
        "Relationship",
        &[("Id", id), ("Type", rel_type.as_str()), ("Target", target)],
    )?;
    Ok(())
}

fn slide_xml(slide: &SlidePlan, font: &str) -> Result<Vec<u8>> {
    let mut doc = XmlDoc::new()?;
    doc.open("p:sld", &[("xmlns:a", A_NS), ("xmlns:r", R_NS), ("xmlns:p", P_NS)])?
        .open("p:cSld", &[])?
        .open("p:spTree", &[])?
        .open("p:nvGrpSpPr", &[])?
        .empty("p:cNvPr", &[("id", "1"), ("name", "")])?
        .empty("p:cNvGrpSpPr", &[])?
        .empty("p:nvPr", &[])?
        .close("p:nvGrpSpPr")?
        .empty("p:grpSpPr", &[])?;

    let title_line = body_line(slide.title.clone(), slide.title_size, true);
    let title_height = if slide.centered_title { 2_286_000 } else { 1_143_000 };
    let title_y = if slide.centered_title { 1_828_800 } else { 274_320 };
    shape(
        &mut doc,
        ShapeLayout {
            id: 2,
            name: "Title",
            placeholder: Some(if slide.centered_title { "ctrTitle" } else { "title" }),
            y: title_y,
            cy: title_height,
            centered: slide.centered_title,
        },
        std::slice::from_ref(&title_line),
        font,
    )?;

    if !slide.body.is_empty() {
        let body_y = title_y + title_height + 182_880;
        shape(
            &mut doc,
            ShapeLayout {
                id: 3,
                name: "Content",
                placeholder: None,
                y: body_y,
                cy: SLIDE_CY - body_y - MARGIN,
                centered: slide.centered_title,
            },
            &slide.body,
            font,
        )?;
    }

    doc.close("p:spTree")?
        .close("p:cSld")?
        .open("p:clrMapOvr", &[])?
        .empty("a:masterClrMapping", &[])?
        .close("p:clrMapOvr")?
        .close("p:sld")?;
    Ok(doc.finish())
}

struct ShapeLayout<'a> {
    id: u32,
    name: &'a str,
    placeholder: Option<&'a str>,
    y: i64,
    cy: i64,
    centered: bool,
}

fn shape(doc: &mut XmlDoc, layout: ShapeLayout<'_>, lines: &[BodyLine], font: &str) -> Result<()> {
    let id = layout.id.to_string();
    let (x, y) = (MARGIN.to_string(), layout.y.to_string());
    let (cx, cy) = ((SLIDE_CX - 2 * MARGIN).to_string(), layout.cy.to_string());

    doc.open("p:sp", &[])?
        .open("p:nvSpPr", &[])?
        .empty("p:cNvPr", &[("id", id.as_str()), ("name", layout.name)])?;
    match layout.placeholder {
        Some(kind) => {
            doc.open("p:cNvSpPr", &[])?
                .empty("a:spLocks", &[("noGrp", "1")])?
                .close("p:cNvSpPr")?
                .open("p:nvPr", &[])?
                .empty("p:ph", &[("type", kind)])?
                .close("p:nvPr")?;
        }
        None => {
            doc.empty("p:cNvSpPr", &[("txBox", "1")])?.empty("p:nvPr", &[])?;
        }
    }
    doc.close("p:nvSpPr")?
        .open("p:spPr", &[])?
        .open("a:xfrm", &[])?
        .empty("a:off", &[("x", x.as_str()), ("y", y.as_str())])?
        .empty("a:ext", &[("cx", cx.as_str()), ("cy", cy.as_str())])?
        .close("a:xfrm")?
        .open("a:prstGeom", &[("prst", "rect")])?
        .empty("a:avLst", &[])?
        .close("a:prstGeom")?
        .close("p:spPr")?
        .open("p:txBody", &[])?
        .open("a:bodyPr", &[("wrap", "square")])?
        .empty("a:normAutofit", &[])?
        .close("a:bodyPr")?
        .empty("a:lstStyle", &[])?;

    for line in lines {
        let size = line.size.to_string();
        let mut run_attrs = vec![("lang", "en-US"), ("sz", size.as_str())];
        if line.bold {
            run_attrs.push(("b", "1"));
        }
        doc.open("a:p", &[])?;
        if layout.centered {
            doc.empty("a:pPr", &[("algn", "ctr")])?;
        }
        doc.open("a:r", &[])?
            .open("a:rPr", &run_attrs)?
            .empty("a:latin", &[("typeface", font)])?
            .close("a:rPr")?
            .element("a:t", &[], &line.text)?
            .close("a:r")?
            .close("a:p")?;
    }

    doc.close("p:txBody")?.close("p:sp")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::fixtures::{citation, partial_report, text_section};
    use std::io::{Cursor, Read};

    fn slide_texts(bytes: &[u8]) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut slides = Vec::new();
        let mut n = 1;
        loop {
            let Ok(mut part) = archive.by_name(&format!("ppt/slides/slide{n}.xml")) else {
                break;
            };
            let mut xml = String::new();
            part.read_to_string(&mut xml).unwrap();
            slides.push(xml);
            n += 1;
        }
        slides
    }

    #[test]
    fn title_slide_plus_one_per_present_section() {
        let (content, template) = partial_report();
        let bytes = PptxRenderer.render(&Outline::build(&content, &template)).unwrap();
        let slides = slide_texts(&bytes);

        assert_eq!(slides.len(), 3);
        assert!(slides[0].contains("Default Consulting Report"));
        assert!(slides[0].contains(r#"type="ctrTitle""#));
        assert!(slides[1].contains("Executive Summary"));
        assert!(slides[2].contains("Key Findings"));
        // one citation stays inline
        assert!(slides[2].contains("Sources:"));
        assert!(slides[2].contains("deck.pptx: slide 3"));
        assert!(slides.iter().all(|s| !s.contains("Methodology")));
    }

    #[test]
    fn many_citations_move_to_sources_slide() {
        let (mut content, template) = partial_report();
        let citations = (1..=4).map(|p| citation("report.pdf", &format!("page {p}"))).collect();
        content.sections.insert(
            "executive_summary".into(),
            text_section("Executive Summary", "Dense evidence.", citations),
        );

        let bytes = PptxRenderer.render(&Outline::build(&content, &template)).unwrap();
        let slides = slide_texts(&bytes);
        assert_eq!(slides.len(), 4);
        assert!(!slides[1].contains("report.pdf"));
        assert!(slides[2].contains("Executive Summary - Sources"));
        assert!(slides[2].contains("report.pdf: page 4"));
        assert!(slides[3].contains("Key Findings"));
    }

    #[test]
    fn presentation_lists_every_slide() {
        let (content, template) = partial_report();
        let bytes = PptxRenderer.render(&Outline::build(&content, &template)).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let mut xml = String::new();
        archive
            .by_name("ppt/presentation.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        assert_eq!(xml.matches("<p:sldId ").count(), 3);
        assert!(xml.contains(r#"cx="12192000""#));

        let mut types = String::new();
        archive
            .by_name("[Content_Types].xml")
            .unwrap()
            .read_to_string(&mut types)
            .unwrap();
        assert!(types.contains("/ppt/slides/slide3.xml"));
    }
}

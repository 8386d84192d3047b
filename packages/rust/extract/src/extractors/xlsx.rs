//! XLSX worksheet extraction.
//!
//! Sheets are visited in workbook order (`xl/workbook.xml`), resolved to
//! their parts through `xl/_rels/workbook.xml.rels`. Shared strings and
//! inline strings are resolved; gaps between referenced columns are kept as
//! empty cells so rows stay aligned.

use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use reportsmith_shared::{ContentRecord, FileType, Result};

use super::{Extraction, Extractor};
use crate::ooxml::{
    attr, fail, open_package, qualified_attr, read_optional_part, read_part, relationships,
    resolve_target,
};

/// Extracts non-empty rows from every worksheet of a workbook.
pub struct XlsxExtractor;

impl Extractor for XlsxExtractor {
    fn file_type(&self) -> FileType {
        FileType::Xlsx
    }

    fn extract(&self, path: &Path) -> Result<Extraction> {
        let mut package = open_package(path)?;
        let workbook = read_part(&mut package, "xl/workbook.xml")?;
        let rels = relationships(&read_part(&mut package, "xl/_rels/workbook.xml.rels")?)?;
        let shared = match read_optional_part(&mut package, "xl/sharedStrings.xml")? {
            Some(xml) => shared_strings(&xml)?,
            None => Vec::new(),
        };

        let sheets = workbook_sheets(&workbook)?;
        let mut extraction = Extraction::default();
        extraction.metadata.count("sheets", sheets.len() as u64);
        let mut cells = 0u64;

        for (name, rel_id) in sheets {
            let target = rels
                .get(&rel_id)
                .ok_or_else(|| fail(format!("sheet {name} has no relationship {rel_id}")))?;
            let xml = read_part(&mut package, &resolve_target("xl", target))?;
            let rows = sheet_rows(&xml, &shared)?;
            cells += rows
                .iter()
                .flatten()
                .filter(|cell| !cell.is_empty())
                .count() as u64;
            extraction
                .content
                .push(ContentRecord::Sheet { sheet: name, rows });
        }

        extraction.metadata.count("cells", cells);
        Ok(extraction)
    }

    fn name(&self) -> &str {
        "xlsx"
    }
}

/// `(sheet name, relationship id)` pairs in workbook order.
fn workbook_sheets(xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    let mut sheets = Vec::new();

    loop {
        match reader.read_event().map_err(fail)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr(&e, b"name").unwrap_or_default();
                let rel_id = qualified_attr(&e, b"r:id")
                    .or_else(|| attr(&e, b"id"))
                    .ok_or_else(|| fail(format!("sheet {name} has no r:id")))?;
                sheets.push((name, rel_id));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

/// The shared string table; rich-text runs are concatenated.
fn shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(fail)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(e) if in_text => current.push_str(&e.unescape().map_err(fail)?),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

#[derive(Debug, Default)]
struct Cell {
    column: Option<usize>,
    kind: Option<String>,
    value: String,
}

/// Rows with at least one non-empty cell, as display strings.
fn sheet_rows(xml: &str, shared: &[String]) -> Result<Vec<Vec<String>>> {
    let mut reader = Reader::from_str(xml);
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell: Option<Cell> = None;
    let mut in_value = false;

    loop {
        match reader.read_event().map_err(fail)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => row.clear(),
                b"c" => {
                    cell = Some(Cell {
                        column: attr(&e, b"r").and_then(|r| column_index(&r)),
                        kind: attr(&e, b"t"),
                        value: String::new(),
                    })
                }
                b"v" | b"t" => in_value = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                let column = attr(&e, b"r").and_then(|r| column_index(&r));
                place(&mut row, column, String::new());
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let Some(cell) = cell.take() {
                        let value = display_value(&cell, shared);
                        place(&mut row, cell.column, value);
                    }
                }
                b"row" => {
                    if row.iter().any(|v| !v.is_empty()) {
                        rows.push(std::mem::take(&mut row));
                    }
                }
                _ => {}
            },
            Event::Text(e) if in_value => {
                if let Some(cell) = cell.as_mut() {
                    cell.value.push_str(&e.unescape().map_err(fail)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rows)
}

fn display_value(cell: &Cell, shared: &[String]) -> String {
    match cell.kind.as_deref() {
        Some("s") => cell
            .value
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| shared.get(i).cloned())
            .unwrap_or_default(),
        Some("b") => match cell.value.trim() {
            "1" => "TRUE".into(),
            "0" => "FALSE".into(),
            other => other.into(),
        },
        _ => cell.value.clone(),
    }
}

/// Put `value` at `column`, padding any gap with empty cells. Cells without
/// a reference go after the last one.
fn place(row: &mut Vec<String>, column: Option<usize>, value: String) {
    match column {
        Some(col) if col >= row.len() => {
            row.resize(col, String::new());
            row.push(value);
        }
        Some(col) => row[col] = value,
        None => row.push(value),
    }
}

/// Zero-based column index from a cell reference (`"C7"` -> `2`).
fn column_index(reference: &str) -> Option<usize> {
    let letters: Vec<u8> = reference
        .bytes()
        .take_while(u8::is_ascii_alphabetic)
        .map(|b| b.to_ascii_uppercase())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let number = letters
        .iter()
        .fold(0usize, |acc, b| acc * 26 + usize::from(b - b'A' + 1));
    Some(number - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::fixtures::{write_package, Scratch};

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Revenue" sheetId="1" r:id="rId2"/>
    <sheet name="Notes" sheetId="2" r:id="rId1"/>
  </sheets>
</workbook>"#;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="worksheet" Target="worksheets/sheet2.xml"/>
  <Relationship Id="rId2" Type="worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

    const SHARED: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
  <si><t>Region</t></si>
  <si><t>Q1</t></si>
  <si><r><t>North</t></r><r><t xml:space="preserve"> East</t></r></si>
</sst>"#;

    const SHEET1: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1" t="s"><v>1</v></c></row>
    <row r="2"><c r="A2"/></row>
    <row r="3"><c r="A3" t="s"><v>2</v></c><c r="B3" t="b"><v>1</v></c><c r="C3"><v>1250.5</v></c></row>
  </sheetData>
</worksheet>"#;

    const SHEET2: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="B1" t="inlineStr"><is><t>Draft only</t></is></c></row>
  </sheetData>
</worksheet>"#;

    #[test]
    fn column_references() {
        assert_eq!(column_index("A1"), Some(0));
        assert_eq!(column_index("c7"), Some(2));
        assert_eq!(column_index("AA10"), Some(26));
        assert_eq!(column_index("12"), None);
    }

    #[test]
    fn extracts_sheets_in_workbook_order() {
        let scratch = Scratch::new("xlsx");
        let path = scratch.path("numbers.xlsx");
        write_package(
            &path,
            &[
                ("xl/workbook.xml", WORKBOOK),
                ("xl/_rels/workbook.xml.rels", RELS),
                ("xl/sharedStrings.xml", SHARED),
                ("xl/worksheets/sheet1.xml", SHEET1),
                ("xl/worksheets/sheet2.xml", SHEET2),
            ],
        );

        let extraction = XlsxExtractor.extract(&path).unwrap();
        assert_eq!(extraction.metadata.counters["sheets"], 2);
        assert_eq!(extraction.metadata.counters["cells"], 6);
        assert_eq!(
            extraction.content,
            vec![
                ContentRecord::Sheet {
                    sheet: "Revenue".into(),
                    rows: vec![
                        vec!["Region".into(), String::new(), "Q1".into()],
                        vec!["North East".into(), "TRUE".into(), "1250.5".into()],
                    ],
                },
                ContentRecord::Sheet {
                    sheet: "Notes".into(),
                    rows: vec![vec![String::new(), "Draft only".into()]],
                },
            ]
        );
    }

    #[test]
    fn legacy_binary_workbook_is_an_error() {
        let scratch = Scratch::new("xls");
        let path = scratch.path("old.xls");
        std::fs::write(&path, [0xD0, 0xCF, 0x11, 0xE0]).unwrap();
        assert!(XlsxExtractor.extract(&path).is_err());
    }
}

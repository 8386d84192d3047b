//! Helpers shared by the Office Open XML extractors (DOCX, PPTX, XLSX).
//!
//! All three formats are ZIP packages of XML parts; parts are read whole
//! into memory and scanned with a `quick-xml` pull reader.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reportsmith_shared::{ReportError, Result};
use zip::ZipArchive;
use zip::result::ZipError;

pub(crate) type Package = ZipArchive<BufReader<File>>;

/// Map any displayable failure into an extraction error.
pub(crate) fn fail(e: impl std::fmt::Display) -> ReportError {
    ReportError::Extraction(e.to_string())
}

/// Open an OOXML package.
pub(crate) fn open_package(path: &Path) -> Result<Package> {
    let file = File::open(path).map_err(|e| ReportError::io(path, e))?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| fail(format!("not a valid package: {e}")))
}

/// Read a part that must exist.
pub(crate) fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    read_optional_part(archive, name)?.ok_or_else(|| fail(format!("missing part {name}")))
}

/// Read a part that may be absent.
pub(crate) fn read_optional_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>> {
    let mut part = match archive.by_name(name) {
        Ok(part) => part,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(fail(format!("cannot open {name}: {e}"))),
    };
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| fail(format!("cannot read {name}: {e}")))?;
    Ok(Some(xml))
}

/// Unescaped value of the attribute whose local name is `key`.
pub(crate) fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Unescaped value of the attribute with the exact qualified name `key`.
pub(crate) fn qualified_attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Parse a `.rels` part into `Id -> Target`.
pub(crate) fn relationships(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut rels = HashMap::new();

    loop {
        match reader.read_event().map_err(fail)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(&e, b"Id"), attr(&e, b"Target")) {
                    rels.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rels)
}

/// Resolve a relationship target against the directory of its source part.
pub(crate) fn resolve_target(base_dir: &str, target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("{}/{}", base_dir.trim_end_matches('/'), target),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_relationships() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://x/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://x/worksheet" Target="/xl/worksheets/sheet2.xml"/>
</Relationships>"#;
        let rels = relationships(xml).unwrap();
        assert_eq!(rels.len(), 2);
        assert_eq!(resolve_target("xl", &rels["rId1"]), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("xl", &rels["rId2"]), "xl/worksheets/sheet2.xml");
    }
}

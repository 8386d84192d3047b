//! Thin wrapper over the `quick-xml` writer and the ZIP packaging shared by
//! the DOCX and PPTX renderers.

use std::io::{Cursor, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use reportsmith_shared::{ReportError, Result};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

fn render_err(e: impl std::fmt::Display) -> ReportError {
    ReportError::Render(e.to_string())
}

/// Streaming XML document builder.
pub(crate) struct XmlDoc {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlDoc {
    /// Start a document with the standard standalone declaration.
    pub fn new() -> Result<Self> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(render_err)?;
        Ok(Self { writer })
    }

    pub fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<&mut Self> {
        let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer
            .write_event(Event::Start(start))
            .map_err(render_err)?;
        Ok(self)
    }

    pub fn close(&mut self, name: &str) -> Result<&mut Self> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(render_err)?;
        Ok(self)
    }

    pub fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<&mut Self> {
        let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer
            .write_event(Event::Empty(start))
            .map_err(render_err)?;
        Ok(self)
    }

    pub fn text(&mut self, text: &str) -> Result<&mut Self> {
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(render_err)?;
        Ok(self)
    }

    /// `<name attrs>text</name>`
    pub fn element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<&mut Self> {
        self.open(name, attrs)?.text(text)?.close(name)
    }

    pub fn finish(self) -> Vec<u8> {
        self.writer.into_inner().into_inner()
    }
}

/// An in-memory ZIP package of named parts.
pub(crate) struct Package {
    zip: ZipWriter<Cursor<Vec<u8>>>,
}

impl Package {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    pub fn add(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        self.zip.start_file(name, options).map_err(render_err)?;
        self.zip.write_all(bytes).map_err(render_err)?;
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        Ok(self.zip.finish().map_err(render_err)?.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_text_and_attributes() {
        let mut doc = XmlDoc::new().unwrap();
        doc.open("root", &[("name", "a \"b\" & c")])
            .unwrap()
            .element("t", &[], "1 < 2 & 3")
            .unwrap()
            .close("root")
            .unwrap();
        let xml = String::from_utf8(doc.finish()).unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#));
        assert!(xml.contains("<t>1 &lt; 2 &amp; 3</t>"));
        assert!(xml.contains("&quot;b&quot;"));
    }
}

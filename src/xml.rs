//! Minimal XML writer for request fragments.
//!
//! Output is always in exclusive-canonical shape: explicit end tags, no
//! XML declaration, text escaped for `&`, `<` and `>` only.

use crate::error::HiError;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

pub struct XmlWriter {
    writer: Writer<Vec<u8>>,
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlWriter {
    pub fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    /// Open an element. Namespace declarations must come first in `attrs`.
    pub fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), HiError> {
        let mut start = BytesStart::new(name);
        for attr in attrs {
            start.push_attribute(*attr);
        }
        self.writer.write_event(Event::Start(start)).map_err(xml_error)
    }

    pub fn end(&mut self, name: &str) -> Result<(), HiError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_error)
    }

    pub fn text(&mut self, text: &str) -> Result<(), HiError> {
        self.writer
            .write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))
            .map_err(xml_error)
    }

    /// `<name>text</name>`
    pub fn element(&mut self, name: &str, text: &str) -> Result<(), HiError> {
        self.start(name, &[])?;
        self.text(text)?;
        self.end(name)
    }

    /// Write the element only when a value is present.
    pub fn optional(&mut self, name: &str, text: Option<&str>) -> Result<(), HiError> {
        match text {
            Some(text) => self.element(name, text),
            None => Ok(()),
        }
    }

    /// Append an already serialised fragment verbatim.
    pub fn raw(&mut self, fragment: &str) {
        self.writer.get_mut().extend_from_slice(fragment.as_bytes());
    }

    pub fn into_string(self) -> Result<String, HiError> {
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| HiError::Xml(format!("Invalid UTF-8 output: {}", e)))
    }
}

fn xml_error(e: impl std::fmt::Display) -> HiError {
    HiError::Xml(format!("XML write error: {}", e))
}

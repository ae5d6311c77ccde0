use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::meta::Error;

/// Streaming markup writer used by generated `marshal` functions.
pub struct Writer {
    inner: quick_xml::Writer<Vec<u8>>,
}

impl Writer {
    pub fn new() -> Self {
        Self {
            inner: quick_xml::Writer::new(Vec::new()),
        }
    }

    pub fn write_declaration(&mut self) -> Result<(), Error> {
        self.inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(())
    }

    pub fn start_element(&mut self, tag: &str, attributes: &[(&str, String)]) -> Result<(), Error> {
        let mut start = BytesStart::new(tag);
        for (name, value) in attributes {
            start.push_attribute((*name, value.as_str()));
        }
        self.inner.write_event(Event::Start(start))?;
        Ok(())
    }

    pub fn end_element(&mut self, tag: &str) -> Result<(), Error> {
        self.inner.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }

    pub fn text(&mut self, text: &str) -> Result<(), Error> {
        if !text.is_empty() {
            self.inner.write_event(Event::Text(BytesText::new(text)))?;
        }
        Ok(())
    }

    /// Writes `<tag>text</tag>`.
    pub fn text_element(&mut self, tag: &str, text: &str) -> Result<(), Error> {
        self.start_element(tag, &[])?;
        self.text(text)?;
        self.end_element(tag)
    }

    pub fn into_string(self) -> String {
        // Only `&str` is ever written
        String::from_utf8_lossy(&self.inner.into_inner()).into_owned()
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

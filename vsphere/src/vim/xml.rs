//! Minimal XML element tree for vim25 SOAP responses.
//!
//! Responses are small, so they are parsed into an owned tree and navigated
//! by local element name. Attribute keys keep their prefix so `type` and
//! `xsi:type` stay distinct.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};

/// An owned XML element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Local name (namespace prefix stripped).
    pub name: String,
    /// Attributes as `(qualified key, unescaped value)`.
    pub attributes: Vec<(String, String)>,
    /// Concatenated text content. Whitespace-only text between elements is
    /// dropped; everything else is kept as sent.
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<Element>,
}

impl Element {
    /// Parse a document and return its root element.
    pub fn parse(xml: &str) -> Result<Element> {
        let mut reader = Reader::from_str(xml);

        // stack[0] is a synthetic document node
        let mut stack: Vec<Element> = vec![Element::default()];

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(Element::from_start(&start)?),
                Event::Empty(start) => {
                    let element = Element::from_start(&start)?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(element);
                    }
                }
                Event::End(_) => {
                    if stack.len() < 2 {
                        return Err(Error::malformed("parse", "unbalanced end tag"));
                    }
                    if let Some(element) = stack.pop() {
                        if let Some(parent) = stack.last_mut() {
                            parent.children.push(element);
                        }
                    }
                }
                Event::Text(text) => {
                    let text = text.unescape()?;
                    if text.trim().is_empty() {
                        continue;
                    }
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .text
                            .push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if stack.len() != 1 {
            return Err(Error::malformed("parse", "unexpected end of document"));
        }

        stack
            .pop()
            .and_then(|document| document.children.into_iter().next())
            .ok_or_else(|| Error::malformed("parse", "empty document"))
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Element> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(Element {
            name,
            attributes,
            ..Default::default()
        })
    }

    /// First child with the given local name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Follow a chain of child names.
    pub fn path(&self, path: &[&str]) -> Option<&Element> {
        path.iter().try_fold(self, |element, name| element.child(name))
    }

    /// Attribute value by qualified key (`type`, `xsi:type`).
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Text content.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text content of a direct child.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(Element::text)
    }

    /// The `xsi:type` of this element, if any.
    pub fn xsi_type(&self) -> Option<&str> {
        self.attr("xsi:type")
    }
}

/// Escape text for inclusion in a request body.
pub fn escape(raw: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(raw)
}

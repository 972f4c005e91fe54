//! Minimal XML element tree for vCloud resource envelopes
//!
//! Elements and attributes are stored under their local names, so documents
//! using the default `vcloud` namespace and documents using an explicit
//! `vcloud:` prefix decode identically. Namespace declarations are dropped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Errors raised while parsing an XML document
#[derive(Error, Debug, Clone, PartialEq)]
pub enum XmlError {
    #[error("malformed XML at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    #[error("document has no root element")]
    Empty,

    #[error("element <{0}> is never closed")]
    Unclosed(String),
}

/// A parsed XML element
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    /// Create an empty element with the given local name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder helper to add an attribute
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Builder helper to add a child element
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Builder helper to set the text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Parse a complete document and return its root element
    pub fn parse(input: &[u8]) -> Result<Element, XmlError> {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().map_err(|e| XmlError::Syntax {
                position: reader.buffer_position() as u64,
                message: e.to_string(),
            })?;

            match event {
                Event::Start(start) => {
                    stack.push(Self::from_start(&start, reader.buffer_position() as u64)?);
                }
                Event::Empty(start) => {
                    let element = Self::from_start(&start, reader.buffer_position() as u64)?;
                    Self::attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    if let Some(element) = stack.pop() {
                        Self::attach(&mut stack, &mut root, element);
                    }
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        let text = text.unescape().map_err(|e| XmlError::Syntax {
                            position: reader.buffer_position() as u64,
                            message: e.to_string(),
                        })?;
                        current.text.push_str(text.trim());
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(String::from_utf8_lossy(&data).trim());
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(XmlError::Unclosed(open.name));
        }

        root.ok_or(XmlError::Empty)
    }

    fn from_start(start: &BytesStart<'_>, position: u64) -> Result<Element, XmlError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut element = Element::new(name);

        for attr in start.attributes() {
            let attr = attr.map_err(|e| XmlError::Syntax {
                position,
                message: e.to_string(),
            })?;
            if attr.key.as_namespace_binding().is_some() {
                continue;
            }
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| XmlError::Syntax {
                    position,
                    message: e.to_string(),
                })?
                .into_owned();
            element.attributes.push((key, value));
        }

        Ok(element)
    }

    fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
        match stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None => {
                if root.is_none() {
                    *root = Some(element);
                }
            }
        }
    }

    /// Look up an attribute value by local name
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First direct child with the given local name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First descendant (depth-first, document order) with the given local name
    pub fn find(&self, name: &str) -> Option<&Element> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants with the given local name, in document order
    pub fn descendants<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut out = Vec::new();
        self.collect_descendants(name, &mut out);
        out
    }

    fn collect_descendants<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            child.collect_descendants(name, out);
        }
    }

    /// Integer attribute, or `default` when absent or non-numeric
    pub fn int_attr_or(&self, key: &str, default: i64) -> i64 {
        self.attr(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// String attribute, or `default` when absent
    pub fn str_attr_or(&self, key: &str, default: &str) -> String {
        self.attr(key).unwrap_or(default).to_string()
    }

    /// Integer text of a direct child, or `default`
    pub fn int_child_or(&self, name: &str, default: i64) -> i64 {
        self.child(name)
            .and_then(|c| c.text.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Floating point text of the first matching descendant, or `default`
    pub fn float_descendant_or(&self, name: &str, default: f64) -> f64 {
        self.find(name)
            .and_then(|c| c.text.trim().parse().ok())
            .unwrap_or(default)
    }
}

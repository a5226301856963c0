//! Owned element tree built from markup text.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ParseError;

/// Turns document text into a navigable element tree.
pub trait DocumentParser {
    /// Parse the whole text. Any structural problem is a `ParseError`.
    fn parse(&self, text: &str) -> Result<Element, ParseError>;
}

/// A node inside an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element with its children, named by local (namespace-free) name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    name: String,
    nodes: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct child elements.
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// All elements named `name` in this subtree, self included, in document order.
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        if self.name == name {
            found.push(self);
        }
        for child in self.children() {
            child.collect_named(name, found);
        }
    }

    /// First element named `name` in this subtree, self included.
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.children().find_map(|child| child.find(name))
    }

    /// Concatenated text of this subtree.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.nodes {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }

    /// Trimmed text of the first element named `name`, if present and non-empty.
    pub fn field(&self, name: &str) -> Option<String> {
        let text = self.find(name)?.text();
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    pub fn push_element(&mut self, element: Element) {
        self.nodes.push(Node::Element(element));
    }

    pub fn push_text(&mut self, text: &str) {
        if let Some(Node::Text(last)) = self.nodes.last_mut() {
            last.push_str(text);
        } else {
            self.nodes.push(Node::Text(text.to_string()));
        }
    }
}

/// `DocumentParser` backed by `quick-xml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlTreeParser;

impl XmlTreeParser {
    pub fn new() -> Self {
        Self
    }
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

/// Builds the tree while events stream in.
struct TreeBuilder {
    stack: Vec<Element>,
    root: Option<Element>,
}

impl TreeBuilder {
    fn attach(&mut self, element: Element, position: u64) -> Result<(), ParseError> {
        if let Some(parent) = self.stack.last_mut() {
            parent.push_element(element);
            Ok(())
        } else if self.root.is_none() {
            self.root = Some(element);
            Ok(())
        } else {
            Err(ParseError::Malformed {
                position,
                message: format!("second root element <{}>", element.name),
            })
        }
    }

    fn text(&mut self, text: &str, position: u64) -> Result<(), ParseError> {
        match self.stack.last_mut() {
            Some(top) => {
                top.push_text(text);
                Ok(())
            }
            None if text.trim().is_empty() => Ok(()),
            None => Err(ParseError::Malformed {
                position,
                message: "text outside the root element".to_string(),
            }),
        }
    }
}

impl DocumentParser for XmlTreeParser {
    fn parse(&self, text: &str) -> Result<Element, ParseError> {
        let mut reader = Reader::from_str(text);
        let mut builder = TreeBuilder {
            stack: Vec::new(),
            root: None,
        };

        loop {
            let position = reader.buffer_position() as u64;
            let event = reader.read_event().map_err(|e| ParseError::Malformed {
                position: reader.error_position() as u64,
                message: e.to_string(),
            })?;

            match event {
                Event::Start(start) => builder.stack.push(Element::new(local_name(&start))),
                Event::Empty(start) => builder.attach(Element::new(local_name(&start)), position)?,
                Event::End(_) => {
                    let element = builder.stack.pop().ok_or_else(|| ParseError::Malformed {
                        position,
                        message: "closing tag without an open element".to_string(),
                    })?;
                    builder.attach(element, position)?;
                }
                Event::Text(t) => {
                    let unescaped = t.unescape().map_err(|e| ParseError::Malformed {
                        position,
                        message: e.to_string(),
                    })?;
                    builder.text(&unescaped, position)?;
                }
                Event::CData(data) => {
                    builder.text(&String::from_utf8_lossy(&data), position)?;
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions, doctype.
                _ => {}
            }
        }

        if let Some(open) = builder.stack.last() {
            return Err(ParseError::Unclosed(open.name.clone()));
        }
        builder.root.ok_or(ParseError::NoRoot)
    }
}

//! # XML Node Tree
//!
//! GMP speaks one XML document per request and per response. This module
//! holds the small owned tree both directions are expressed in, plus the
//! framing check the socket reader uses to know when a response is complete.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Malformed(String),

    #[error("document has no root element")]
    Empty,

    #[error("unexpected content after the root element")]
    TrailingContent,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<XmlNode>,
    pub text: String,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    /// Shorthand for `<name>text</name>` children.
    pub fn with_text_child(self, name: &str, text: impl Into<String>) -> Self {
        self.with_child(XmlNode::new(name).with_text(text))
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Walks a chain of first-match children, e.g. `["report_count", "finished"]`.
    pub fn descend(&self, path: &[&str]) -> Option<&XmlNode> {
        path.iter().try_fold(self, |node, name| node.child(name))
    }

    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut String) {
        let _ = write!(out, "<{}", self.name);
        for (key, value) in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", key, escape(value.as_str()));
        }

        if self.children.is_empty() && self.text.is_empty() {
            out.push_str("/>");
            return;
        }

        out.push('>');
        out.push_str(&escape(self.text.as_str()));
        for child in &self.children {
            child.write_into(out);
        }
        let _ = write!(out, "</{}>", self.name);
    }

    pub fn parse(xml: &str) -> Result<XmlNode, XmlError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    if root.is_some() {
                        return Err(XmlError::TrailingContent);
                    }
                    stack.push(node_from_start(&e)?);
                }
                Ok(Event::Empty(e)) => {
                    if root.is_some() {
                        return Err(XmlError::TrailingContent);
                    }
                    let node = node_from_start(&e)?;
                    attach(&mut stack, &mut root, node);
                }
                Ok(Event::End(_)) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| XmlError::Malformed("unbalanced end tag".into()))?;
                    attach(&mut stack, &mut root, node);
                }
                Ok(Event::Text(t)) => {
                    let text = t.unescape().map_err(|e| XmlError::Malformed(e.to_string()))?;
                    match stack.last_mut() {
                        Some(top) => top.text.push_str(&text),
                        None => return Err(XmlError::TrailingContent),
                    }
                }
                Ok(Event::CData(c)) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(XmlError::Malformed(e.to_string())),
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(XmlError::Malformed(format!(
                "unclosed element <{}>",
                stack[stack.len() - 1].name
            )));
        }

        root.ok_or(XmlError::Empty)
    }
}

fn node_from_start(e: &BytesStart<'_>) -> Result<XmlNode, XmlError> {
    let mut node = XmlNode::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for attr in e.attributes() {
        let attr = attr.map_err(|e| XmlError::Malformed(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| XmlError::Malformed(e.to_string()))?
            .into_owned();
        node.attributes.insert(key, value);
    }
    Ok(node)
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => *root = Some(node),
    }
}

/// Incremental end-of-document detector for a response stream.
///
/// Bytes are fed as they arrive and only the new ones are scanned, so a
/// reader can stop at the byte that closes the root element without parsing
/// the buffer again on every chunk. Chunks may split anywhere, including
/// inside a tag name, an attribute value or a comment.
#[derive(Debug, Default)]
pub struct DocumentFramer {
    depth: usize,
    state: Scan,
    /// Bytes consumed so far across all chunks.
    offset: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
enum Scan {
    #[default]
    Text,
    /// Just read `<`.
    TagStart,
    Tag {
        closing: bool,
        quote: Option<u8>,
        after_slash: bool,
    },
    /// `<?...?>`
    Instruction { after_question: bool },
    /// `<!` followed by this many bytes matching `--` or `[CDATA[`.
    Bang { matched: usize, comment: bool, cdata: bool },
    /// `<!DOCTYPE ...>` and similar.
    Declaration { quote: Option<u8> },
    Comment { dashes: usize },
    CData { brackets: usize },
}

const CDATA_OPEN: &[u8] = b"[CDATA[";

impl DocumentFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans `chunk`. Returns the length of the finished document counted
    /// from the first byte ever fed, once its root element has closed.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Option<usize>, XmlError> {
        for (i, &byte) in chunk.iter().enumerate() {
            if self.step(byte)? {
                let end = self.offset + i + 1;
                self.offset += chunk.len();
                return Ok(Some(end));
            }
        }
        self.offset += chunk.len();
        Ok(None)
    }

    /// Advances by one byte; `true` when the root element just closed.
    fn step(&mut self, byte: u8) -> Result<bool, XmlError> {
        self.state = match self.state {
            Scan::Text => match byte {
                b'<' => Scan::TagStart,
                _ => Scan::Text,
            },
            Scan::TagStart => match byte {
                b'/' => Scan::Tag {
                    closing: true,
                    quote: None,
                    after_slash: false,
                },
                b'?' => Scan::Instruction {
                    after_question: false,
                },
                b'!' => Scan::Bang {
                    matched: 0,
                    comment: true,
                    cdata: true,
                },
                b'>' => return Err(XmlError::Malformed("empty tag".into())),
                _ => Scan::Tag {
                    closing: false,
                    quote: None,
                    after_slash: false,
                },
            },
            Scan::Tag {
                closing,
                quote: Some(q),
                ..
            } => Scan::Tag {
                closing,
                quote: (byte != q).then_some(q),
                after_slash: false,
            },
            Scan::Tag {
                closing,
                quote: None,
                after_slash,
            } => match byte {
                b'>' => {
                    self.state = Scan::Text;
                    return self.close_tag(closing, after_slash);
                }
                b'"' | b'\'' => Scan::Tag {
                    closing,
                    quote: Some(byte),
                    after_slash: false,
                },
                _ => Scan::Tag {
                    closing,
                    quote: None,
                    after_slash: byte == b'/',
                },
            },
            Scan::Instruction { after_question } => match byte {
                b'>' if after_question => Scan::Text,
                _ => Scan::Instruction {
                    after_question: byte == b'?',
                },
            },
            Scan::Bang {
                matched,
                comment,
                cdata,
            } => {
                let comment = comment && matched < 2 && byte == b'-';
                let cdata = cdata && matched < CDATA_OPEN.len() && byte == CDATA_OPEN[matched];
                let matched = matched + 1;
                if comment && matched == 2 {
                    Scan::Comment { dashes: 0 }
                } else if cdata && matched == CDATA_OPEN.len() {
                    Scan::CData { brackets: 0 }
                } else if comment || cdata {
                    Scan::Bang {
                        matched,
                        comment,
                        cdata,
                    }
                } else if byte == b'>' {
                    Scan::Text
                } else {
                    Scan::Declaration {
                        quote: matches!(byte, b'"' | b'\'').then_some(byte),
                    }
                }
            }
            Scan::Declaration { quote: Some(q) } => Scan::Declaration {
                quote: (byte != q).then_some(q),
            },
            Scan::Declaration { quote: None } => match byte {
                b'>' => Scan::Text,
                b'"' | b'\'' => Scan::Declaration { quote: Some(byte) },
                _ => Scan::Declaration { quote: None },
            },
            Scan::Comment { dashes } => match byte {
                b'>' if dashes >= 2 => Scan::Text,
                b'-' => Scan::Comment { dashes: dashes + 1 },
                _ => Scan::Comment { dashes: 0 },
            },
            Scan::CData { brackets } => match byte {
                b'>' if brackets >= 2 => Scan::Text,
                b']' => Scan::CData {
                    brackets: brackets + 1,
                },
                _ => Scan::CData { brackets: 0 },
            },
        };
        Ok(false)
    }

    fn close_tag(&mut self, closing: bool, self_closing: bool) -> Result<bool, XmlError> {
        if closing {
            self.depth = self
                .depth
                .checked_sub(1)
                .ok_or_else(|| XmlError::Malformed("unbalanced end tag".into()))?;
            Ok(self.depth == 0)
        } else if self_closing {
            Ok(self.depth == 0)
        } else {
            self.depth += 1;
            Ok(false)
        }
    }
}

/// Reports whether `bytes` holds a complete document, i.e. the root element
/// has been closed. A document cut off anywhere, even mid-tag, is incomplete.
pub fn document_complete(bytes: &[u8]) -> Result<bool, XmlError> {
    Ok(DocumentFramer::new().feed(bytes)?.is_some())
}

//! XML record source
//!
//! Every child element of the document root is one record. The record
//! element is read whole into an [`XmlElement`] and fields are looked up
//! by segment and field node names.

use crate::element::XmlElement;
use flatbind_engine::{BeanError, Extract, FieldLocation, RecordSource, RecordView, Result, Scope, TranscodingReader};
use flatbind_schema::{StreamDefinition, XmlNode};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::io::{BufReader, Read};
use tracing::debug;

/// One record element
#[derive(Debug, Clone)]
pub struct XmlRecord {
    ordinal: usize,
    text: String,
    element: XmlElement,
}

impl XmlRecord {
    pub fn element(&self) -> &XmlElement {
        &self.element
    }

    /// Element holding the innermost segment occurrence of `scope`
    fn resolve(&self, scope: &[Scope<'_>]) -> Option<&XmlElement> {
        scope.iter().try_fold(&self.element, |parent, scope| {
            parent.child(scope.segment.node_name(), scope.occurrence)
        })
    }
}

impl RecordView for XmlRecord {
    /// Position of the record element under the root, from 1
    fn line_number(&self) -> usize {
        self.ordinal
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn element_name(&self) -> Option<&str> {
        Some(&self.element.name)
    }

    fn record_length(&self) -> Option<usize> {
        None
    }

    fn extract(&self, location: &FieldLocation<'_>) -> Extract {
        let Some(parent) = self.resolve(location.scope) else {
            return Extract::Absent;
        };
        let field = location.field;
        let text = match field.xml_node {
            XmlNode::Attribute => parent.attribute(field.node_name()),
            XmlNode::Text => Some(parent.text.as_str()),
            XmlNode::Element => parent
                .child(field.node_name(), location.occurrence)
                .map(|child| child.text.as_str()),
        };
        match text {
            Some(text) => Extract::Text(text.to_string()),
            None => Extract::Absent,
        }
    }

    fn has_segment(&self, scope: &[Scope<'_>], _offset: usize) -> bool {
        self.resolve(scope).is_some()
    }
}

/// Reads record elements from a byte stream in the stream's encoding
pub struct XmlSource<R: Read> {
    reader: Reader<BufReader<TranscodingReader<R>>>,
    buf: Vec<u8>,
    root: String,
    started: bool,
    finished: bool,
    count: usize,
}

impl<R: Read> XmlSource<R> {
    pub fn new(input: R, stream: &StreamDefinition) -> Self {
        let mut reader = Reader::from_reader(BufReader::new(TranscodingReader::new(input, stream.encoding())));
        reader.trim_text(true);
        debug!(stream = %stream.name(), root = %stream.xml_root(), "Opened XML source");
        Self {
            reader,
            buf: Vec::new(),
            root: stream.xml_root().to_string(),
            started: false,
            finished: false,
            count: 0,
        }
    }

    fn check_root(&self, root: &XmlElement) -> Result<()> {
        if root.name != self.root {
            return Err(BeanError::fatal(format!(
                "Expected root element '{}', found '{}'",
                self.root, root.name
            )));
        }
        Ok(())
    }

    fn record(&mut self, element: XmlElement) -> XmlRecord {
        self.count += 1;
        XmlRecord {
            ordinal: self.count,
            text: element.to_string(),
            element,
        }
    }

    /// Read the rest of an element whose start tag was just consumed
    fn read_element(&mut self, start: XmlElement) -> Result<XmlElement> {
        let mut stack = vec![start];
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf).map_err(xml_error)? {
                Event::Start(e) => stack.push(element(&e)?),
                Event::Empty(e) => {
                    let child = element(&e)?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(child);
                    }
                }
                Event::Text(e) => {
                    let text = e.unescape().map_err(xml_error)?;
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&text);
                    }
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&text);
                    }
                }
                Event::End(_) => {
                    let Some(done) = stack.pop() else {
                        return Err(BeanError::fatal("Unbalanced end tag"));
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(done),
                        None => return Ok(done),
                    }
                }
                Event::Eof => return Err(BeanError::fatal("Unexpected end of document")),
                _ => {}
            }
        }
    }
}

/// Owned summary of one top-level event
enum Token {
    Start(XmlElement),
    Empty(XmlElement),
    End,
    Eof,
}

impl<R: Read> RecordSource for XmlSource<R> {
    type View = XmlRecord;

    fn next_record(&mut self) -> Result<Option<XmlRecord>> {
        if self.finished {
            return Ok(None);
        }
        loop {
            self.buf.clear();
            let token = match self.reader.read_event_into(&mut self.buf).map_err(xml_error)? {
                Event::Start(e) => Token::Start(element(&e)?),
                Event::Empty(e) => Token::Empty(element(&e)?),
                Event::End(_) => Token::End,
                Event::Eof => Token::Eof,
                _ => continue,
            };
            match (self.started, token) {
                (false, Token::Start(root)) => {
                    self.check_root(&root)?;
                    self.started = true;
                }
                (false, Token::Empty(root)) => {
                    self.check_root(&root)?;
                    self.finished = true;
                    return Ok(None);
                }
                (true, Token::Start(start)) => {
                    let complete = self.read_element(start)?;
                    return Ok(Some(self.record(complete)));
                }
                (true, Token::Empty(complete)) => return Ok(Some(self.record(complete))),
                (true, Token::End) | (false, Token::Eof) => {
                    self.finished = true;
                    return Ok(None);
                }
                (true, Token::Eof) => return Err(BeanError::fatal("Unexpected end of document")),
                (false, Token::End) => return Err(BeanError::fatal("Unbalanced end tag")),
            }
        }
    }
}

fn element(start: &BytesStart<'_>) -> Result<XmlElement> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| BeanError::fatal(format!("XML error: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(xml_error)?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

pub(crate) fn xml_error(e: quick_xml::Error) -> BeanError {
    match e {
        quick_xml::Error::Io(io) => BeanError::fatal(format!("IO error: {io}")),
        other => BeanError::fatal(format!("XML error: {other}")),
    }
}

//! XML record sink

use crate::config::XmlConfig;
use crate::element::XmlElement;
use crate::reader::xml_error;
use flatbind_engine::{BeanError, RecordSink, RenderedRecord, Result, TranscodingWriter};
use flatbind_schema::{RecordDefinition, StreamDefinition, XmlNode};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write;
use tracing::{debug, trace};

/// Writes records as child elements of the document root
pub struct XmlSink<W: Write> {
    writer: Option<Writer<TranscodingWriter<W>>>,
    output: Option<W>,
    root: String,
    encoding: &'static str,
    declaration: bool,
    started: bool,
}

impl<W: Write> XmlSink<W> {
    pub fn new(output: W, stream: &StreamDefinition, config: &XmlConfig) -> Self {
        let inner = TranscodingWriter::new(output, stream.encoding());
        let writer = match config.indent {
            Some(spaces) => Writer::new_with_indent(inner, b' ', spaces),
            None => Writer::new(inner),
        };
        debug!(stream = %stream.name(), root = %stream.xml_root(), "Opened XML sink");
        Self {
            writer: Some(writer),
            output: None,
            root: stream.xml_root().to_string(),
            encoding: stream.encoding().name(),
            declaration: config.declaration,
            started: false,
        }
    }

    /// The underlying output once the sink is closed
    pub fn into_inner(self) -> Option<W> {
        self.output
    }

    fn writer(&mut self) -> Result<&mut Writer<TranscodingWriter<W>>> {
        self.writer.as_mut().ok_or_else(|| BeanError::fatal("Sink is closed"))
    }

    fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        let declaration = self.declaration;
        let encoding = self.encoding;
        let root = self.root.clone();
        let writer = self.writer()?;
        if declaration {
            writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some(encoding), None)))
                .map_err(xml_error)?;
        }
        writer.write_event(Event::Start(BytesStart::new(root))).map_err(xml_error)
    }
}

/// Element tree of one formatted record, leaving out unbound fields
pub fn render(record: &RecordDefinition, rendered: &RenderedRecord<'_>) -> XmlElement {
    let mut root = XmlElement::new(record.node_name());
    for field in rendered.fields.iter().filter(|f| !f.absent) {
        let parent = field.scope.iter().fold(&mut root, |parent, scope| {
            parent.child_mut(scope.segment.node_name(), scope.occurrence)
        });
        let definition = field.field;
        match definition.xml_node {
            XmlNode::Attribute => parent.set_attribute(definition.node_name(), field.text.as_str()),
            XmlNode::Text => parent.text.push_str(&field.text),
            XmlNode::Element => {
                let mut child = XmlElement::new(definition.node_name());
                child.text.push_str(&field.text);
                parent.children.push(child);
            }
        }
    }
    root
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if element.is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(xml_error);
    }
    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    if !element.text.is_empty() {
        writer
            .write_event(Event::Text(BytesText::new(&element.text)))
            .map_err(xml_error)?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(xml_error)
}

impl<W: Write> RecordSink for XmlSink<W> {
    fn write_record(&mut self, record: &RecordDefinition, rendered: &RenderedRecord<'_>) -> Result<()> {
        self.start()?;
        let element = render(record, rendered);
        write_element(self.writer()?, &element)?;
        trace!(record = %record.name, element = %element.name, "Wrote XML record");
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer()?.get_mut().flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.writer.is_none() {
            return Ok(());
        }
        self.start()?;
        let root = self.root.clone();
        let writer = self.writer()?;
        writer.write_event(Event::End(BytesEnd::new(root))).map_err(xml_error)?;
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };
        let mut inner = writer.into_inner();
        inner.write_all(b"\n")?;
        inner.finish()?;
        self.output = Some(inner.into_inner());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatbind_engine::BeanWriter;
    use flatbind_ir::Bean;
    use flatbind_schema::{FieldDefinition, SegmentDefinition, StreamFormat};
    use flatbind_types::TypeHandlerRegistry;
    use std::sync::Arc;

    fn stream() -> Arc<StreamDefinition> {
        StreamDefinition::builder("people", StreamFormat::Xml)
            .record(
                RecordDefinition::new("person")
                    .field(FieldDefinition::new("id").attribute())
                    .field(FieldDefinition::new("name"))
                    .segment(
                        SegmentDefinition::new("address")
                            .occurs(0, 1)
                            .field(FieldDefinition::new("city")),
                    ),
            )
            .build(&TypeHandlerRegistry::with_defaults())
            .unwrap()
    }

    fn write(config: &XmlConfig, beans: &[Bean]) -> String {
        let stream = stream();
        let mut writer = BeanWriter::new(Arc::clone(&stream), XmlSink::new(Vec::new(), &stream, config));
        for bean in beans {
            writer.write("person", bean).unwrap();
        }
        writer.close().unwrap();
        String::from_utf8(writer.into_sink().into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_compact_output() {
        let address = Bean::new().with("city", "Paris");
        let beans = [
            Bean::new().with("id", "1").with("name", "Ann").with("address", address),
            Bean::new().with("id", "2"),
        ];
        let output = write(&XmlConfig::new().compact(), &beans);
        assert_eq!(
            output,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><people>\
             <person id=\"1\"><name>Ann</name><address><city>Paris</city></address></person>\
             <person id=\"2\"/></people>\n"
        );
    }

    #[test]
    fn test_empty_document() {
        let output = write(&XmlConfig::new().compact().declaration(false), &[]);
        assert_eq!(output, "<people></people>\n");
    }
}

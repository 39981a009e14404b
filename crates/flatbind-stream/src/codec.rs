//! Single-record marshalling
//!
//! A [`RecordCodec`] converts one record of text to a bean and back
//! without a surrounding stream. Group order and occurrence bounds do
//! not apply: the first record definition whose identifying fields
//! match, in declaration order, is used.

use crate::error::{Error, Result};
use crate::format::{AnySink, AnySource, FormatConfig};
use flatbind_adapter_xml::render;
use flatbind_engine::{measure, BeanError, RecordBinder, RecordSink, RecordSource, RecordView};
use flatbind_ir::{Bean, PropertyAccess};
use flatbind_schema::{RecordDefinition, StreamDefinition, StreamFormat};
use flatbind_types::HandlerContext;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

pub struct RecordCodec {
    stream: Arc<StreamDefinition>,
    config: FormatConfig,
    handlers: HandlerContext,
}

impl RecordCodec {
    pub fn new(stream: Arc<StreamDefinition>) -> Self {
        let config = FormatConfig::default_for(stream.format());
        Self {
            stream,
            config,
            handlers: HandlerContext::new(),
        }
    }

    pub fn with_config(stream: Arc<StreamDefinition>, config: impl Into<FormatConfig>) -> Result<Self> {
        let config = config.into();
        if config.format() != stream.format() {
            return Err(Error::FormatMismatch {
                stream: stream.name().to_string(),
                format: stream.format().to_string(),
            });
        }
        Ok(Self {
            stream,
            config,
            handlers: HandlerContext::new(),
        })
    }

    pub fn stream(&self) -> &StreamDefinition {
        &self.stream
    }

    /// Bind one record of text
    pub fn unmarshal(&mut self, text: &str) -> flatbind_engine::Result<Bean> {
        let stream = Arc::clone(&self.stream);
        let text = match stream.format() {
            StreamFormat::Xml => format!("<{root}>{text}</{root}>", root = stream.xml_root()),
            _ => text.to_string(),
        };
        let (bytes, _) = measure::encode(&text, stream.encoding());
        let mut source = AnySource::open(bytes.as_ref(), &stream, &self.config)?;
        let view = source
            .next_record()?
            .ok_or_else(|| BeanError::malformed(1, "", "No record in input"))?;

        let binder = RecordBinder::new(&stream);
        let record = stream
            .records()
            .map(|(_, record)| record)
            .find(|record| binder.identifies(record, &view))
            .ok_or_else(|| BeanError::unidentified(view.line_number(), view.text()))?;
        trace!(record = %record.name, "Unmarshalling record");

        if let Some(message) = binder.check_length(record, &view) {
            return Err(BeanError::malformed(view.line_number(), view.text(), message));
        }
        binder
            .read(record, &view, &mut self.handlers)
            .map_err(|faults| BeanError::invalid(view.line_number(), &record.name, view.text(), faults))
    }

    /// Format `source` as the record named `record_name`, without a line terminator
    pub fn marshal(&mut self, record_name: &str, source: &dyn PropertyAccess) -> flatbind_engine::Result<String> {
        let stream = Arc::clone(&self.stream);
        let (_, record) = stream
            .find_record(record_name)
            .ok_or_else(|| BeanError::unidentified(1, record_name))?;
        self.render(&stream, record, source)
    }

    /// Format a bean as the first record bound to its type
    pub fn marshal_bean(&mut self, bean: &Bean) -> flatbind_engine::Result<String> {
        let stream = Arc::clone(&self.stream);
        let type_name = bean
            .type_name
            .as_deref()
            .ok_or_else(|| BeanError::unidentified(1, "bean without a type"))?;
        let (_, record) = stream
            .records_for_type(type_name)
            .next()
            .ok_or_else(|| BeanError::unidentified(1, type_name))?;
        self.render(&stream, record, bean)
    }

    fn render(
        &mut self,
        stream: &StreamDefinition,
        record: &RecordDefinition,
        source: &dyn PropertyAccess,
    ) -> flatbind_engine::Result<String> {
        let rendered = RecordBinder::new(stream)
            .write(record, source, &mut self.handlers)
            .map_err(|faults| BeanError::invalid(1, &record.name, "", faults))?;
        if stream.format() == StreamFormat::Xml {
            return Ok(render(record, &rendered).to_string());
        }

        let mut sink = AnySink::open(Vec::new(), stream, &self.config)?;
        sink.write_record(record, &rendered)?;
        sink.close()?;
        let bytes = sink.into_inner().unwrap_or_default();
        let (text, _) = stream.encoding().decode_without_bom_handling(&bytes);
        Ok(text.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl fmt::Debug for RecordCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordCodec")
            .field("stream", &self.stream.name())
            .field("config", &self.config)
            .finish()
    }
}

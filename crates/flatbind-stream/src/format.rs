//! Format-agnostic sources and sinks
//!
//! A stream's format is only known at runtime, so the factory wraps the
//! adapter types in enums that dispatch to the right one.

use flatbind_adapter_delimited::{DelimitedConfig, DelimitedRecord, DelimitedSink, DelimitedSource};
use flatbind_adapter_fixed::{FixedLengthConfig, FixedLengthSink, FixedLengthSource, FixedRecord};
use flatbind_adapter_xml::{XmlConfig, XmlRecord, XmlSink, XmlSource};
use flatbind_engine::{
    Extract, FieldLocation, RecordSink, RecordSource, RecordView, RenderedRecord, Result, Scope,
};
use flatbind_schema::{RecordDefinition, StreamDefinition, StreamFormat};
use std::io::{Read, Write};

/// Format options registered alongside a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatConfig {
    Delimited(DelimitedConfig),
    FixedLength(FixedLengthConfig),
    Xml(XmlConfig),
}

impl FormatConfig {
    /// Default options for `format`
    pub fn default_for(format: StreamFormat) -> Self {
        match format {
            StreamFormat::Delimited => Self::Delimited(DelimitedConfig::default()),
            StreamFormat::FixedLength => Self::FixedLength(FixedLengthConfig::default()),
            StreamFormat::Xml => Self::Xml(XmlConfig::default()),
        }
    }

    pub fn format(&self) -> StreamFormat {
        match self {
            Self::Delimited(_) => StreamFormat::Delimited,
            Self::FixedLength(_) => StreamFormat::FixedLength,
            Self::Xml(_) => StreamFormat::Xml,
        }
    }
}

impl From<DelimitedConfig> for FormatConfig {
    fn from(config: DelimitedConfig) -> Self {
        Self::Delimited(config)
    }
}

impl From<FixedLengthConfig> for FormatConfig {
    fn from(config: FixedLengthConfig) -> Self {
        Self::FixedLength(config)
    }
}

impl From<XmlConfig> for FormatConfig {
    fn from(config: XmlConfig) -> Self {
        Self::Xml(config)
    }
}

/// A record read by any adapter
#[derive(Debug, Clone)]
pub enum AnyRecord {
    Delimited(DelimitedRecord),
    FixedLength(FixedRecord),
    Xml(XmlRecord),
}

impl RecordView for AnyRecord {
    fn line_number(&self) -> usize {
        match self {
            Self::Delimited(r) => r.line_number(),
            Self::FixedLength(r) => r.line_number(),
            Self::Xml(r) => r.line_number(),
        }
    }

    fn text(&self) -> &str {
        match self {
            Self::Delimited(r) => r.text(),
            Self::FixedLength(r) => r.text(),
            Self::Xml(r) => r.text(),
        }
    }

    fn element_name(&self) -> Option<&str> {
        match self {
            Self::Delimited(r) => r.element_name(),
            Self::FixedLength(r) => r.element_name(),
            Self::Xml(r) => r.element_name(),
        }
    }

    fn record_length(&self) -> Option<usize> {
        match self {
            Self::Delimited(r) => r.record_length(),
            Self::FixedLength(r) => r.record_length(),
            Self::Xml(r) => r.record_length(),
        }
    }

    fn extract(&self, location: &FieldLocation<'_>) -> Extract {
        match self {
            Self::Delimited(r) => r.extract(location),
            Self::FixedLength(r) => r.extract(location),
            Self::Xml(r) => r.extract(location),
        }
    }

    fn has_segment(&self, scope: &[Scope<'_>], offset: usize) -> bool {
        match self {
            Self::Delimited(r) => r.has_segment(scope, offset),
            Self::FixedLength(r) => r.has_segment(scope, offset),
            Self::Xml(r) => r.has_segment(scope, offset),
        }
    }
}

/// Record source for any format
pub enum AnySource<R: Read> {
    Delimited(DelimitedSource<R>),
    FixedLength(FixedLengthSource<R>),
    Xml(XmlSource<R>),
}

impl<R: Read> AnySource<R> {
    /// Open `input` with the adapter selected by `config`
    pub fn open(input: R, stream: &StreamDefinition, config: &FormatConfig) -> Result<Self> {
        Ok(match config {
            FormatConfig::Delimited(config) => Self::Delimited(DelimitedSource::new(input, stream, config)?),
            FormatConfig::FixedLength(config) => Self::FixedLength(FixedLengthSource::new(input, stream, config)),
            FormatConfig::Xml(_) => Self::Xml(XmlSource::new(input, stream)),
        })
    }
}

impl<R: Read> RecordSource for AnySource<R> {
    type View = AnyRecord;

    fn next_record(&mut self) -> Result<Option<AnyRecord>> {
        Ok(match self {
            Self::Delimited(s) => s.next_record()?.map(AnyRecord::Delimited),
            Self::FixedLength(s) => s.next_record()?.map(AnyRecord::FixedLength),
            Self::Xml(s) => s.next_record()?.map(AnyRecord::Xml),
        })
    }

    fn close(&mut self) -> Result<()> {
        match self {
            Self::Delimited(s) => s.close(),
            Self::FixedLength(s) => s.close(),
            Self::Xml(s) => s.close(),
        }
    }
}

/// Record sink for any format
pub enum AnySink<W: Write> {
    Delimited(DelimitedSink<W>),
    FixedLength(FixedLengthSink<W>),
    Xml(XmlSink<W>),
}

impl<W: Write> AnySink<W> {
    /// Open `output` with the adapter selected by `config`
    pub fn open(output: W, stream: &StreamDefinition, config: &FormatConfig) -> Result<Self> {
        Ok(match config {
            FormatConfig::Delimited(config) => Self::Delimited(DelimitedSink::new(output, stream, config)?),
            FormatConfig::FixedLength(config) => Self::FixedLength(FixedLengthSink::new(output, stream, config)?),
            FormatConfig::Xml(config) => Self::Xml(XmlSink::new(output, stream, config)),
        })
    }

    /// The underlying output once the sink is closed
    pub fn into_inner(self) -> Option<W> {
        match self {
            Self::Delimited(s) => s.into_inner(),
            Self::FixedLength(s) => s.into_inner(),
            Self::Xml(s) => s.into_inner(),
        }
    }
}

impl<W: Write> RecordSink for AnySink<W> {
    fn write_record(&mut self, record: &RecordDefinition, rendered: &RenderedRecord<'_>) -> Result<()> {
        match self {
            Self::Delimited(s) => s.write_record(record, rendered),
            Self::FixedLength(s) => s.write_record(record, rendered),
            Self::Xml(s) => s.write_record(record, rendered),
        }
    }

    fn flush(&mut self) -> Result<()> {
        match self {
            Self::Delimited(s) => s.flush(),
            Self::FixedLength(s) => s.flush(),
            Self::Xml(s) => s.flush(),
        }
    }

    fn close(&mut self) -> Result<()> {
        match self {
            Self::Delimited(s) => s.close(),
            Self::FixedLength(s) => s.close(),
            Self::Xml(s) => s.close(),
        }
    }
}

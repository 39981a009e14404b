//! Delimited record sink

use crate::config::DelimitedConfig;
use crate::reader::convert;
use flatbind_engine::{BeanError, RecordSink, RenderedRecord, Result, TranscodingWriter};
use flatbind_schema::{RecordDefinition, StreamDefinition};
use std::io::Write;
use tracing::{debug, trace};

/// Writes delimited records to a byte stream in the stream's encoding
pub struct DelimitedSink<W: Write> {
    writer: Option<csv::Writer<TranscodingWriter<W>>>,
    output: Option<W>,
}

impl<W: Write> DelimitedSink<W> {
    pub fn new(output: W, stream: &StreamDefinition, config: &DelimitedConfig) -> Result<Self> {
        config.validate()?;
        let terminator = match config.line_ending.as_str() {
            "\r\n" => csv::Terminator::CRLF,
            "\r" => csv::Terminator::Any(b'\r'),
            _ => csv::Terminator::Any(b'\n'),
        };
        let quote_style = if config.quote.is_some() {
            csv::QuoteStyle::Necessary
        } else {
            csv::QuoteStyle::Never
        };
        let mut builder = csv::WriterBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .delimiter(config.delimiter_u8())
            .quote(config.quote_u8())
            .quote_style(quote_style)
            .double_quote(config.escape.is_none())
            .terminator(terminator);
        if let Some(escape) = config.escape_u8() {
            builder.escape(escape);
        }
        let writer = builder.from_writer(TranscodingWriter::new(output, stream.encoding()));
        debug!(stream = %stream.name(), delimiter = %config.delimiter, "Opened delimited sink");
        Ok(Self {
            writer: Some(writer),
            output: None,
        })
    }

    /// The underlying output once the sink is closed
    pub fn into_inner(self) -> Option<W> {
        self.output
    }

    fn writer(&mut self) -> Result<&mut csv::Writer<TranscodingWriter<W>>> {
        self.writer.as_mut().ok_or_else(|| BeanError::fatal("Sink is closed"))
    }
}

impl<W: Write> RecordSink for DelimitedSink<W> {
    fn write_record(&mut self, record: &RecordDefinition, rendered: &RenderedRecord<'_>) -> Result<()> {
        let width = rendered.fields.iter().map(|f| f.offset + 1).max().unwrap_or(0);
        let mut tokens = vec![""; width];
        for field in &rendered.fields {
            tokens[field.offset] = field.text.as_str();
        }
        self.writer()?.write_record(&tokens).map_err(convert)?;
        trace!(record = %record.name, tokens = tokens.len(), "Wrote delimited record");
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer()?.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };
        let mut inner = writer
            .into_inner()
            .map_err(|e| BeanError::fatal(format!("IO error: {}", e.error())))?;
        inner.finish()?;
        self.output = Some(inner.into_inner());
        Ok(())
    }
}

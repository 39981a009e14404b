//! Fixed-length record sink

use crate::config::FixedLengthConfig;
use encoding_rs::Encoding;
use flatbind_engine::measure::measure;
use flatbind_engine::{BeanError, RecordSink, RenderedRecord, Result, TranscodingWriter};
use flatbind_schema::{LengthUnit, RecordDefinition, StreamDefinition};
use std::io::{BufWriter, Write};
use tracing::{debug, trace};

/// Writes one record per line to a byte stream in the stream's encoding
pub struct FixedLengthSink<W: Write> {
    writer: Option<TranscodingWriter<BufWriter<W>>>,
    output: Option<W>,
    unit: LengthUnit,
    encoding: &'static Encoding,
    terminator: &'static str,
    filler: char,
}

impl<W: Write> FixedLengthSink<W> {
    pub fn new(output: W, stream: &StreamDefinition, config: &FixedLengthConfig) -> Result<Self> {
        let unit = stream.length_unit();
        let filler = config.filler_char();
        if measure(&filler.to_string(), unit, stream.encoding()) != 1 {
            return Err(BeanError::fatal(format!("Filler '{filler}' must be a single byte")));
        }
        debug!(stream = %stream.name(), unit = %unit, "Opened fixed-length sink");
        Ok(Self {
            writer: Some(TranscodingWriter::new(BufWriter::new(output), stream.encoding())),
            output: None,
            unit,
            encoding: stream.encoding(),
            terminator: config.line_ending.as_str(),
            filler,
        })
    }

    /// The underlying output once the sink is closed
    pub fn into_inner(self) -> Option<W> {
        self.output
    }

    fn writer(&mut self) -> Result<&mut TranscodingWriter<BufWriter<W>>> {
        self.writer.as_mut().ok_or_else(|| BeanError::fatal("Sink is closed"))
    }
}

impl<W: Write> RecordSink for FixedLengthSink<W> {
    fn write_record(&mut self, record: &RecordDefinition, rendered: &RenderedRecord<'_>) -> Result<()> {
        let mut fields: Vec<_> = rendered.fields.iter().collect();
        fields.sort_by_key(|field| field.offset);

        let mut line = String::new();
        let mut cursor = 0;
        for field in fields {
            if field.offset < cursor {
                return Err(BeanError::fatal(format!(
                    "Field '{}' of record '{}' overlaps the previous field",
                    field.field.name, record.name
                )));
            }
            line.extend(std::iter::repeat_n(self.filler, field.offset - cursor));
            line.push_str(&field.text);
            cursor = field.offset + measure(&field.text, self.unit, self.encoding);
        }
        line.push_str(self.terminator);

        self.writer()?.write_all(line.as_bytes())?;
        trace!(record = %record.name, width = cursor, "Wrote fixed-length record");
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer()?.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        writer.finish()?;
        let output = writer.into_inner().into_inner().map_err(|e| e.into_error())?;
        self.output = Some(output);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatbind_engine::{BeanWriter, ErrorKind};
    use flatbind_ir::Bean;
    use flatbind_schema::{FieldDefinition, Justify, StreamFormat};
    use flatbind_types::TypeHandlerRegistry;
    use std::sync::Arc;

    fn stream(unit: LengthUnit, encoding: &str) -> Arc<StreamDefinition> {
        StreamDefinition::builder("s", StreamFormat::FixedLength)
            .encoding(encoding)
            .length_unit(unit)
            .record(
                RecordDefinition::new("r")
                    .field(FieldDefinition::new("name").length(6))
                    .field(
                        FieldDefinition::new("id")
                            .at(8)
                            .length(4)
                            .padding('0')
                            .justify(Justify::Right)
                            .type_name("int"),
                    ),
            )
            .build(&TypeHandlerRegistry::with_defaults())
            .unwrap()
    }

    fn write(stream: Arc<StreamDefinition>, bean: &Bean) -> flatbind_engine::Result<Vec<u8>> {
        let sink = FixedLengthSink::new(Vec::new(), &stream, &FixedLengthConfig::new())?;
        let mut writer = BeanWriter::new(stream, sink);
        writer.write("r", bean)?;
        writer.close()?;
        Ok(writer.into_sink().into_inner().unwrap_or_default())
    }

    #[test]
    fn test_pads_and_fills_gaps() {
        let bean = Bean::new().with("name", "Ann").with("id", 7i64);
        let output = write(stream(LengthUnit::Characters, "UTF-8"), &bean).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "Ann     0007\n");
    }

    #[test]
    fn test_byte_widths_in_double_byte_encoding() {
        let stream = stream(LengthUnit::Bytes, "Shift_JIS");
        let bean = Bean::new().with("name", "ハロ").with("id", 1i64);
        let output = write(Arc::clone(&stream), &bean).unwrap();
        let (expected, _, _) = encoding_rs::SHIFT_JIS.encode("ハロ    0001\n");
        assert_eq!(output, expected.into_owned());

        let bean = Bean::new().with("name", "ハロー!").with("id", 1i64);
        let err = write(stream, &bean).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRecord);
        assert_eq!(err.field_errors()[0].message, "Value exceeds maximum field length of 6 bytes");
    }
}

//! Fixed-length record source

use crate::config::FixedLengthConfig;
use encoding_rs::Encoding;
use flatbind_engine::measure::{decode, encode};
use flatbind_engine::{Extract, FieldLocation, RecordSource, RecordView, Result, TranscodingReader};
use flatbind_schema::{LengthUnit, StreamDefinition};
use std::io::{BufRead, BufReader, Read};
use tracing::debug;

/// One input line, sliced by character or by encoded byte
#[derive(Debug, Clone)]
pub struct FixedRecord {
    line: usize,
    text: String,
    unit: LengthUnit,
    encoding: &'static Encoding,
    /// Byte offset of every character plus the end, in character mode
    boundaries: Vec<usize>,
    /// Encoded line, in byte mode
    bytes: Vec<u8>,
}

impl FixedRecord {
    fn new(line: usize, text: String, unit: LengthUnit, encoding: &'static Encoding) -> Self {
        let (boundaries, bytes) = match unit {
            LengthUnit::Characters => {
                let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
                boundaries.push(text.len());
                (boundaries, Vec::new())
            }
            LengthUnit::Bytes => (Vec::new(), encode(&text, encoding).0.into_owned()),
        };
        Self {
            line,
            text,
            unit,
            encoding,
            boundaries,
            bytes,
        }
    }

    /// Length in the stream's unit
    pub fn len(&self) -> usize {
        match self.unit {
            LengthUnit::Characters => self.boundaries.len() - 1,
            LengthUnit::Bytes => self.bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slice(&self, start: usize, end: usize) -> Option<String> {
        match self.unit {
            LengthUnit::Characters => Some(self.text[self.boundaries[start]..self.boundaries[end]].to_string()),
            LengthUnit::Bytes => decode(&self.bytes[start..end], self.encoding).map(|text| text.into_owned()),
        }
    }
}

impl RecordView for FixedRecord {
    fn line_number(&self) -> usize {
        self.line
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn record_length(&self) -> Option<usize> {
        Some(self.len())
    }

    fn extract(&self, location: &FieldLocation<'_>) -> Extract {
        let length = self.len();
        let start = location.offset;
        if start >= length {
            return Extract::Absent;
        }
        let field = location.field;
        let (end, short) = match field.length {
            Some(width) if start + width > length => (length, Some(width)),
            Some(width) => (start + width, None),
            None => (length, None),
        };
        let invalid = |width: usize| format!("Invalid field length, expected {width} {}", self.unit);
        match (self.slice(start, end), short) {
            (Some(text), None) => Extract::Text(text),
            (Some(text), Some(width)) => Extract::Fault {
                text,
                message: invalid(width),
            },
            (None, _) => Extract::Fault {
                text: String::from_utf8_lossy(&self.bytes[start..end]).into_owned(),
                message: invalid(field.length.unwrap_or(end - start)),
            },
        }
    }
}

/// Reads one record per line from a byte stream in the stream's encoding
pub struct FixedLengthSource<R: Read> {
    reader: BufReader<TranscodingReader<R>>,
    unit: LengthUnit,
    encoding: &'static Encoding,
    skip_empty_lines: bool,
    line: usize,
    buffer: String,
}

impl<R: Read> FixedLengthSource<R> {
    pub fn new(input: R, stream: &StreamDefinition, config: &FixedLengthConfig) -> Self {
        debug!(
            stream = %stream.name(),
            unit = %stream.length_unit(),
            encoding = stream.encoding().name(),
            "Opened fixed-length source"
        );
        Self {
            reader: BufReader::new(TranscodingReader::new(input, stream.encoding())),
            unit: stream.length_unit(),
            encoding: stream.encoding(),
            skip_empty_lines: config.skip_empty_lines,
            line: 0,
            buffer: String::new(),
        }
    }
}

impl<R: Read> RecordSource for FixedLengthSource<R> {
    type View = FixedRecord;

    fn next_record(&mut self) -> Result<Option<FixedRecord>> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let text = self.buffer.strip_suffix('\n').unwrap_or(&self.buffer);
            let text = text.strip_suffix('\r').unwrap_or(text);
            if text.is_empty() && self.skip_empty_lines {
                continue;
            }
            return Ok(Some(FixedRecord::new(self.line, text.to_string(), self.unit, self.encoding)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{SHIFT_JIS, UTF_8};
    use flatbind_schema::FieldDefinition;

    fn extract(record: &FixedRecord, field: &FieldDefinition, offset: usize) -> Extract {
        record.extract(&FieldLocation {
            field,
            offset,
            occurrence: 0,
            scope: &[],
        })
    }

    #[test]
    fn test_character_slicing() {
        let record = FixedRecord::new(1, "ハロー1234".to_string(), LengthUnit::Characters, UTF_8);
        assert_eq!(record.len(), 7);
        let field = FieldDefinition::new("a").length(3);
        assert_eq!(extract(&record, &field, 0), Extract::Text("ハロー".to_string()));
        assert_eq!(extract(&record, &field, 3), Extract::Text("123".to_string()));
        assert_eq!(extract(&record, &field, 7), Extract::Absent);
    }

    #[test]
    fn test_byte_slicing() {
        let record = FixedRecord::new(1, "ハロー1234".to_string(), LengthUnit::Bytes, SHIFT_JIS);
        assert_eq!(record.len(), 10);
        let field = FieldDefinition::new("a").length(6);
        assert_eq!(extract(&record, &field, 0), Extract::Text("ハロー".to_string()));

        let rest = FieldDefinition::new("rest");
        assert_eq!(extract(&record, &rest, 6), Extract::Text("1234".to_string()));
    }

    #[test]
    fn test_byte_slice_splitting_a_character() {
        let record = FixedRecord::new(1, "ハロー".to_string(), LengthUnit::Bytes, SHIFT_JIS);
        let field = FieldDefinition::new("a").length(3);
        let Extract::Fault { message, .. } = extract(&record, &field, 0) else {
            panic!("expected a fault");
        };
        assert_eq!(message, "Invalid field length, expected 3 bytes");
    }

    #[test]
    fn test_short_record() {
        let record = FixedRecord::new(1, "ハロー".to_string(), LengthUnit::Bytes, SHIFT_JIS);
        let field = FieldDefinition::new("a").length(10);
        assert_eq!(
            extract(&record, &field, 0),
            Extract::Fault {
                text: "ハロー".to_string(),
                message: "Invalid field length, expected 10 bytes".to_string(),
            }
        );
    }

    #[test]
    fn test_lines_and_terminators() {
        use flatbind_schema::{RecordDefinition, StreamFormat};
        use flatbind_types::TypeHandlerRegistry;

        let stream = StreamDefinition::builder("s", StreamFormat::FixedLength)
            .record(RecordDefinition::new("r").field(FieldDefinition::new("a")))
            .build(&TypeHandlerRegistry::with_defaults())
            .unwrap();
        let input = "ab\r\n\ncd";
        let config = FixedLengthConfig::new().skip_empty_lines(true);
        let mut source = FixedLengthSource::new(input.as_bytes(), &stream, &config);
        let first = source.next_record().unwrap().unwrap();
        assert_eq!((first.line_number(), first.text()), (1, "ab"));
        let second = source.next_record().unwrap().unwrap();
        assert_eq!((second.line_number(), second.text()), (3, "cd"));
        assert!(source.next_record().unwrap().is_none());
    }
}

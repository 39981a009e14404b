//! Delimited record source

use crate::config::DelimitedConfig;
use flatbind_engine::{BeanError, Extract, FieldLocation, RecordSource, RecordView, Result, TranscodingReader};
use flatbind_schema::StreamDefinition;
use std::io::Read;
use tracing::debug;

/// One tokenized input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedRecord {
    line: usize,
    text: String,
    tokens: Vec<String>,
}

impl DelimitedRecord {
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl RecordView for DelimitedRecord {
    fn line_number(&self) -> usize {
        self.line
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn record_length(&self) -> Option<usize> {
        Some(self.tokens.len())
    }

    fn extract(&self, location: &FieldLocation<'_>) -> Extract {
        match self.tokens.get(location.offset) {
            Some(token) => Extract::Text(token.clone()),
            None => Extract::Absent,
        }
    }
}

/// Reads delimited records from a byte stream in the stream's encoding
pub struct DelimitedSource<R: Read> {
    reader: csv::Reader<TranscodingReader<R>>,
    record: csv::StringRecord,
    delimiter: String,
}

impl<R: Read> DelimitedSource<R> {
    pub fn new(input: R, stream: &StreamDefinition, config: &DelimitedConfig) -> Result<Self> {
        config.validate()?;
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(config.delimiter_u8())
            .quoting(config.quote.is_some())
            .quote(config.quote_u8())
            .escape(config.escape_u8())
            .double_quote(config.escape.is_none())
            .comment(config.comment_u8())
            .from_reader(TranscodingReader::new(input, stream.encoding()));
        debug!(
            stream = %stream.name(),
            delimiter = %config.delimiter,
            encoding = stream.encoding().name(),
            "Opened delimited source"
        );
        Ok(Self {
            reader,
            record: csv::StringRecord::new(),
            delimiter: config.delimiter.to_string(),
        })
    }
}

impl<R: Read> RecordSource for DelimitedSource<R> {
    type View = DelimitedRecord;

    fn next_record(&mut self) -> Result<Option<DelimitedRecord>> {
        match self.reader.read_record(&mut self.record) {
            Ok(false) => Ok(None),
            Ok(true) => {
                let tokens: Vec<String> = self.record.iter().map(String::from).collect();
                Ok(Some(DelimitedRecord {
                    line: self.record.position().map_or(0, |p| p.line() as usize),
                    text: tokens.join(&self.delimiter),
                    tokens,
                }))
            }
            Err(e) => Err(convert(e)),
        }
    }
}

/// I/O failures are fatal, anything the tokenizer rejects is malformed
pub(crate) fn convert(e: csv::Error) -> BeanError {
    let line = e.position().map_or(0, |p| p.line() as usize);
    let message = e.to_string();
    match e.into_kind() {
        csv::ErrorKind::Io(io) => BeanError::from(io),
        _ => BeanError::malformed(line, "", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatbind_schema::{FieldDefinition, RecordDefinition, StreamFormat};
    use flatbind_types::TypeHandlerRegistry;
    use std::sync::Arc;

    fn stream() -> Arc<StreamDefinition> {
        StreamDefinition::builder("s", StreamFormat::Delimited)
            .record(RecordDefinition::new("r").field(FieldDefinition::new("a")))
            .build(&TypeHandlerRegistry::with_defaults())
            .unwrap()
    }

    fn read_all(input: &str, config: &DelimitedConfig) -> Vec<DelimitedRecord> {
        let mut source = DelimitedSource::new(input.as_bytes(), &stream(), config).unwrap();
        let mut records = Vec::new();
        while let Some(record) = source.next_record().unwrap() {
            records.push(record);
        }
        records
    }

    #[test]
    fn test_tokenizes_quoted_fields() {
        let records = read_all("a,\"b,c\",\"say \"\"hi\"\"\"\nd\n", &DelimitedConfig::new());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tokens(), ["a", "b,c", "say \"hi\""]);
        assert_eq!(records[0].line_number(), 1);
        assert_eq!(records[1].tokens(), ["d"]);
        assert_eq!(records[1].line_number(), 2);
        assert_eq!(records[1].record_length(), Some(1));
    }

    #[test]
    fn test_comments_and_custom_delimiter() {
        let config = DelimitedConfig::new().delimiter('|').comment('#');
        let records = read_all("# header\nx|y\n", &config);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tokens(), ["x", "y"]);
        assert_eq!(records[0].text(), "x|y");
    }

    #[test]
    fn test_unquoted_keeps_quotes() {
        let records = read_all("\"a\",b\n", &DelimitedConfig::new().unquoted());
        assert_eq!(records[0].tokens(), ["\"a\"", "b"]);
    }
}

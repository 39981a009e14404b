//! Fault taxonomy raised by readers and writers

use std::fmt;
use thiserror::Error;

/// Kind of a [`BeanError`], ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    /// Well-formed record with one or more field faults
    InvalidRecord,
    /// Record could not be tokenized or sliced
    MalformedRecord,
    /// No record definition recognises the input
    UnidentifiedRecord,
    /// A record matched but is not valid at this point of the stream
    UnexpectedRecord,
    /// I/O failure or configuration inconsistency
    Fatal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRecord => "invalid record",
            Self::MalformedRecord => "malformed record",
            Self::UnidentifiedRecord => "unidentified record",
            Self::UnexpectedRecord => "unexpected record",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversion or validation fault of a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field name
    pub field: String,
    /// Raw text before padding was removed; `None` when the field was absent
    pub text: Option<String>,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, text: Option<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            text,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.text {
            Some(text) => write!(f, "{}: {} ('{}')", self.field, self.message, text),
            None => write!(f, "{}: {}", self.field, self.message),
        }
    }
}

/// Errors raised while reading or writing a stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BeanError {
    #[error("Invalid '{record}' record at line {line}: {count} field error(s)", count = .faults.len())]
    InvalidRecord {
        line: usize,
        record: String,
        text: String,
        faults: Vec<FieldError>,
    },

    #[error("Malformed record at line {line}: {message}")]
    MalformedRecord {
        line: usize,
        text: String,
        message: String,
    },

    #[error("Unidentified record at line {line}")]
    UnidentifiedRecord { line: usize, text: String },

    #[error("Unexpected '{record}' record at line {line}: {message}")]
    UnexpectedRecord {
        line: usize,
        record: String,
        text: String,
        message: String,
    },

    #[error("{message}")]
    Fatal { message: String },
}

impl BeanError {
    pub fn invalid(
        line: usize,
        record: impl Into<String>,
        text: impl Into<String>,
        faults: Vec<FieldError>,
    ) -> Self {
        Self::InvalidRecord {
            line,
            record: record.into(),
            text: text.into(),
            faults,
        }
    }

    pub fn malformed(line: usize, text: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            text: text.into(),
            message: message.into(),
        }
    }

    pub fn unidentified(line: usize, text: impl Into<String>) -> Self {
        Self::UnidentifiedRecord {
            line,
            text: text.into(),
        }
    }

    pub fn unexpected(
        line: usize,
        record: impl Into<String>,
        text: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::UnexpectedRecord {
            line,
            record: record.into(),
            text: text.into(),
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRecord { .. } => ErrorKind::InvalidRecord,
            Self::MalformedRecord { .. } => ErrorKind::MalformedRecord,
            Self::UnidentifiedRecord { .. } => ErrorKind::UnidentifiedRecord,
            Self::UnexpectedRecord { .. } => ErrorKind::UnexpectedRecord,
            Self::Fatal { .. } => ErrorKind::Fatal,
        }
    }

    /// Line or record number the fault was raised at
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::InvalidRecord { line, .. }
            | Self::MalformedRecord { line, .. }
            | Self::UnidentifiedRecord { line, .. }
            | Self::UnexpectedRecord { line, .. } => Some(*line),
            Self::Fatal { .. } => None,
        }
    }

    pub fn record_name(&self) -> Option<&str> {
        match self {
            Self::InvalidRecord { record, .. } | Self::UnexpectedRecord { record, .. } => Some(record),
            _ => None,
        }
    }

    /// Raw record text
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::InvalidRecord { text, .. }
            | Self::MalformedRecord { text, .. }
            | Self::UnidentifiedRecord { text, .. }
            | Self::UnexpectedRecord { text, .. } => Some(text),
            Self::Fatal { .. } => None,
        }
    }

    /// Field faults of an invalid record, in field order
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::InvalidRecord { faults, .. } => faults,
            _ => &[],
        }
    }
}

impl From<std::io::Error> for BeanError {
    fn from(e: std::io::Error) -> Self {
        Self::fatal(format!("IO error: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, BeanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_ordered_by_severity() {
        assert!(ErrorKind::InvalidRecord < ErrorKind::MalformedRecord);
        assert!(ErrorKind::UnexpectedRecord < ErrorKind::Fatal);
    }

    #[test]
    fn test_invalid_record_display() {
        let err = BeanError::invalid(
            3,
            "detail",
            "D,abc",
            vec![FieldError::new("amount", Some("abc".into()), "Invalid Integer value 'abc'")],
        );
        assert_eq!(err.to_string(), "Invalid 'detail' record at line 3: 1 field error(s)");
        assert_eq!(err.kind(), ErrorKind::InvalidRecord);
        assert_eq!(err.line(), Some(3));
        assert_eq!(err.record_name(), Some("detail"));
        assert_eq!(err.field_errors()[0].to_string(), "amount: Invalid Integer value 'abc' ('abc')");
    }

    #[test]
    fn test_io_errors_are_fatal() {
        let err: BeanError = std::io::Error::other("closed").into();
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert_eq!(err.line(), None);
        assert!(err.field_errors().is_empty());
    }
}

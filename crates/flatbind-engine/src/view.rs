//! Format independent view of one input record

use flatbind_schema::{FieldDefinition, SegmentDefinition};

/// One enclosing segment occurrence
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub segment: &'a SegmentDefinition,
    pub occurrence: usize,
}

/// Where to find one occurrence of a field
#[derive(Debug, Clone, Copy)]
pub struct FieldLocation<'a> {
    pub field: &'a FieldDefinition,
    /// Token index (delimited) or unit offset (fixed-length)
    pub offset: usize,
    pub occurrence: usize,
    /// Enclosing segments, outermost first
    pub scope: &'a [Scope<'a>],
}

/// Raw text of one field occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extract {
    /// The record ends before the field
    Absent,
    Text(String),
    /// The field is present but cannot be sliced
    Fault { text: String, message: String },
}

/// A tokenized or sliced input record
pub trait RecordView {
    /// Line or record number for diagnostics
    fn line_number(&self) -> usize;

    /// Raw text of the whole record
    fn text(&self) -> &str;

    /// Element name of a hierarchical record
    fn element_name(&self) -> Option<&str> {
        None
    }

    /// Tokens or units in the record; `None` when not positional
    fn record_length(&self) -> Option<usize>;

    fn extract(&self, location: &FieldLocation<'_>) -> Extract;

    /// Whether the innermost segment occurrence of `scope`, starting at
    /// `offset`, is present
    fn has_segment(&self, scope: &[Scope<'_>], offset: usize) -> bool {
        let _ = scope;
        self.record_length().is_none_or(|length| offset < length)
    }
}

//! Fixed-length format options

use flatbind_engine::LineEnding;

/// Configuration for fixed-length reading and writing
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FixedLengthConfig {
    /// Record terminator for writing (default: LF)
    pub line_ending: LineEnding,
    /// Skip blank lines on read instead of treating them as records
    pub skip_empty_lines: bool,
    /// Character written into gaps between fields (default: space)
    pub filler: Option<char>,
}

impl FixedLengthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    pub fn skip_empty_lines(mut self, skip: bool) -> Self {
        self.skip_empty_lines = skip;
        self
    }

    pub fn filler(mut self, filler: char) -> Self {
        self.filler = Some(filler);
        self
    }

    pub(crate) fn filler_char(&self) -> char {
        self.filler.unwrap_or(' ')
    }
}

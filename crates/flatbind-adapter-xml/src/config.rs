//! XML format options

/// Configuration for XML reading and writing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlConfig {
    /// Write an XML declaration before the root element (default: true)
    pub declaration: bool,
    /// Spaces per nesting level, or `None` for compact output (default: 2)
    pub indent: Option<usize>,
}

impl Default for XmlConfig {
    fn default() -> Self {
        Self {
            declaration: true,
            indent: Some(2),
        }
    }
}

impl XmlConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declaration(mut self, declaration: bool) -> Self {
        self.declaration = declaration;
        self
    }

    pub fn indent(mut self, spaces: usize) -> Self {
        self.indent = Some(spaces);
        self
    }

    /// Write everything on one line
    pub fn compact(mut self) -> Self {
        self.indent = None;
        self
    }
}

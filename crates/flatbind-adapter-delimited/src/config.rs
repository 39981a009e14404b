//! Delimited format options

use flatbind_engine::{BeanError, LineEnding, Result};

/// Configuration for delimited reading and writing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedConfig {
    /// Field delimiter character (default: comma)
    pub delimiter: char,
    /// Quote character, or `None` to disable quoting (default: double quote)
    pub quote: Option<char>,
    /// Escape character inside quotes (default: none, quotes are doubled)
    pub escape: Option<char>,
    /// Lines starting with this character are skipped on read
    pub comment: Option<char>,
    /// Record terminator for writing (default: LF)
    pub line_ending: LineEnding,
}

impl Default for DelimitedConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: Some('"'),
            escape: None,
            comment: None,
            line_ending: LineEnding::LF,
        }
    }
}

impl DelimitedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn quote(mut self, quote: char) -> Self {
        self.quote = Some(quote);
        self
    }

    /// Disable quoting entirely
    pub fn unquoted(mut self) -> Self {
        self.quote = None;
        self
    }

    pub fn escape(mut self, escape: char) -> Self {
        self.escape = Some(escape);
        self
    }

    pub fn comment(mut self, comment: char) -> Self {
        self.comment = Some(comment);
        self
    }

    pub fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Every configured character must be a single ASCII byte
    pub fn validate(&self) -> Result<()> {
        let chars = [
            ("delimiter", Some(self.delimiter)),
            ("quote", self.quote),
            ("escape", self.escape),
            ("comment", self.comment),
        ];
        for (name, value) in chars {
            if let Some(c) = value.filter(|c| !c.is_ascii()) {
                return Err(BeanError::fatal(format!("Invalid {name} '{c}': must be an ASCII character")));
            }
        }
        if self.quote == Some(self.delimiter) {
            return Err(BeanError::fatal("Quote and delimiter must differ"));
        }
        Ok(())
    }

    pub(crate) fn delimiter_u8(&self) -> u8 {
        self.delimiter as u8
    }

    pub(crate) fn quote_u8(&self) -> u8 {
        self.quote.map_or(b'"', |c| c as u8)
    }

    pub(crate) fn escape_u8(&self) -> Option<u8> {
        self.escape.map(|c| c as u8)
    }

    pub(crate) fn comment_u8(&self) -> Option<u8> {
        self.comment.map(|c| c as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DelimitedConfig::default();
        assert_eq!(config.delimiter, ',');
        assert_eq!(config.quote, Some('"'));
        assert_eq!(config.escape, None);
        assert_eq!(config.line_ending, LineEnding::LF);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = DelimitedConfig::new()
            .delimiter('|')
            .unquoted()
            .comment('#')
            .line_ending(LineEnding::CRLF);
        assert_eq!(config.delimiter_u8(), b'|');
        assert_eq!(config.quote, None);
        assert_eq!(config.comment_u8(), Some(b'#'));
    }

    #[test]
    fn test_non_ascii_rejected() {
        let err = DelimitedConfig::new().delimiter('§').validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid delimiter '§': must be an ASCII character");
        assert!(DelimitedConfig::new().delimiter('"').validate().is_err());
    }
}

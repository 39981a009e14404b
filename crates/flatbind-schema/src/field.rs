//! Field definitions

use crate::stream::{Layout, StreamFormat};
use crate::{Error, Result};
use flatbind_types::{HandlerConfig, HandlerContext, StringTypeHandler, TypeHandler, TypeHandlerRegistry};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// How field widths are counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthUnit {
    #[default]
    Characters,
    Bytes,
}

impl LengthUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Characters => "characters",
            Self::Bytes => "bytes",
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side the content is aligned to; padding fills the other side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Justify {
    #[default]
    Left,
    Right,
}

/// XML node a field binds to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XmlNode {
    #[default]
    Element,
    Attribute,
    Text,
}

/// Rule deciding whether a key field's text identifies its record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRule {
    Literal(String),
    Pattern(String),
}

/// A leaf unit bound to one scalar or repeated scalar property
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub name: String,
    /// Property path on the bound bean; `None` reads and validates but never binds
    pub property: Option<String>,
    /// Explicit position; follows the previous member when unset
    pub position: Option<usize>,
    pub length: Option<usize>,
    /// Width unit; defaults to the stream's
    pub unit: Option<LengthUnit>,
    pub padding: char,
    pub justify: Justify,
    pub trim: bool,
    pub required: bool,
    pub min_occurs: usize,
    pub max_occurs: Option<usize>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub regex: Option<String>,
    pub literal: Option<String>,
    pub identifier: Option<KeyRule>,
    pub default: Option<String>,
    pub truncate: bool,
    pub xml_name: Option<String>,
    pub xml_node: XmlNode,
    pub type_name: Option<String>,
    pub type_config: HandlerConfig,
    handler: Arc<dyn TypeHandler>,
    explicit_handler: bool,
    compiled_regex: Option<Regex>,
    compiled_key: Option<Regex>,
    offset: usize,
    stride: usize,
    resolved_unit: LengthUnit,
}

impl FieldDefinition {
    /// New string field bound to the property of the same name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            property: Some(name.clone()),
            name,
            position: None,
            length: None,
            unit: None,
            padding: ' ',
            justify: Justify::Left,
            trim: false,
            required: false,
            min_occurs: 1,
            max_occurs: Some(1),
            min_length: None,
            max_length: None,
            regex: None,
            literal: None,
            identifier: None,
            default: None,
            truncate: false,
            xml_name: None,
            xml_node: XmlNode::Element,
            type_name: None,
            type_config: HandlerConfig::new(),
            handler: Arc::new(StringTypeHandler::new()),
            explicit_handler: false,
            compiled_regex: None,
            compiled_key: None,
            offset: 0,
            stride: 1,
            resolved_unit: LengthUnit::Characters,
        }
    }

    pub fn property(mut self, path: impl Into<String>) -> Self {
        self.property = Some(path.into());
        self
    }

    /// Do not bind the field to any property
    pub fn unbound(mut self) -> Self {
        self.property = None;
        self
    }

    pub fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    pub fn unit(mut self, unit: LengthUnit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn padding(mut self, padding: char) -> Self {
        self.padding = padding;
        self
    }

    pub fn justify(mut self, justify: Justify) -> Self {
        self.justify = justify;
        self
    }

    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn occurs(mut self, min: usize, max: usize) -> Self {
        self.min_occurs = min;
        self.max_occurs = Some(max);
        self
    }

    /// Repeat without an upper bound
    pub fn unbounded(mut self, min: usize) -> Self {
        self.min_occurs = min;
        self.max_occurs = None;
        self
    }

    pub fn min_length(mut self, length: usize) -> Self {
        self.min_length = Some(length);
        self
    }

    pub fn max_length(mut self, length: usize) -> Self {
        self.max_length = Some(length);
        self
    }

    /// Content must match the regular expression in full
    pub fn regex(mut self, pattern: impl Into<String>) -> Self {
        self.regex = Some(pattern.into());
        self
    }

    /// Constant text expected on read and emitted on write
    pub fn literal(mut self, literal: impl Into<String>) -> Self {
        self.literal = Some(literal.into());
        self
    }

    /// Identify the record by this field's literal text
    pub fn key(mut self, literal: impl Into<String>) -> Self {
        let literal = literal.into();
        self.identifier = Some(KeyRule::Literal(literal.clone()));
        self.literal = Some(literal);
        self
    }

    /// Identify the record when this field's text matches `pattern`
    pub fn key_regex(mut self, pattern: impl Into<String>) -> Self {
        self.identifier = Some(KeyRule::Pattern(pattern.into()));
        self
    }

    pub fn default_value(mut self, text: impl Into<String>) -> Self {
        self.default = Some(text.into());
        self
    }

    /// Cut formatted values that exceed the field width
    pub fn truncate(mut self) -> Self {
        self.truncate = true;
        self
    }

    /// Registered handler name, e.g. `int` or `xml:date`
    pub fn type_name(mut self, name: impl Into<String>) -> Self {
        self.type_name = Some(name.into());
        self
    }

    /// Handler format pattern
    pub fn format(mut self, pattern: impl Into<String>) -> Self {
        self.type_config = self.type_config.format(pattern);
        self
    }

    pub fn type_config(mut self, config: HandlerConfig) -> Self {
        self.type_config = config;
        self
    }

    /// Use `handler` instead of a registered one
    pub fn handler(mut self, handler: Arc<dyn TypeHandler>) -> Self {
        self.handler = handler;
        self.explicit_handler = true;
        self
    }

    pub fn xml_name(mut self, name: impl Into<String>) -> Self {
        self.xml_name = Some(name.into());
        self
    }

    /// Bind to an attribute of the enclosing element
    pub fn attribute(mut self) -> Self {
        self.xml_node = XmlNode::Attribute;
        self
    }

    /// Bind to the text content of the enclosing element
    pub fn text_node(mut self) -> Self {
        self.xml_node = XmlNode::Text;
        self
    }

    /// Resolved type handler
    pub fn type_handler(&self) -> &Arc<dyn TypeHandler> {
        &self.handler
    }

    /// Position of the first occurrence within the record
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Distance between consecutive occurrences
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Effective width unit
    pub fn length_unit(&self) -> LengthUnit {
        self.resolved_unit
    }

    /// Element or attribute name
    pub fn node_name(&self) -> &str {
        self.xml_name.as_deref().unwrap_or(&self.name)
    }

    pub fn is_repeating(&self) -> bool {
        self.max_occurs != Some(1)
    }

    pub fn is_identifier(&self) -> bool {
        self.identifier.is_some()
    }

    /// Content matches the configured regular expression
    pub fn matches_regex(&self, text: &str) -> bool {
        self.compiled_regex.as_ref().is_none_or(|r| r.is_match(text))
    }

    /// Unpadded text satisfies the identification rule
    pub fn key_matches(&self, text: &str) -> bool {
        match &self.identifier {
            Some(KeyRule::Literal(literal)) => text == literal,
            Some(KeyRule::Pattern(_)) => self.compiled_key.as_ref().is_some_and(|r| r.is_match(text)),
            None => true,
        }
    }

    /// Strip padding from raw field text, then trim if configured
    ///
    /// Padding only applies to fields with a width. A right-justified
    /// zero-padded field of all zeros reads as `0`.
    pub fn unpad<'a>(&self, raw: &'a str) -> &'a str {
        let mut text = raw;
        if self.length.is_some() {
            text = match self.justify {
                Justify::Left => text.trim_end_matches(self.padding),
                Justify::Right => text.trim_start_matches(self.padding),
            };
            if text.is_empty() && !raw.is_empty() && self.padding == '0' {
                text = "0";
            }
        }
        if self.trim { text.trim() } else { text }
    }

    /// Validate the definition and resolve its handler and layout
    pub(crate) fn compile(
        &mut self,
        offset: usize,
        variable_width: bool,
        layout: &Layout,
        registry: &TypeHandlerRegistry,
    ) -> Result<()> {
        let name = self.name.clone();
        if let Some(max) = self.max_occurs {
            if max == 0 {
                return Err(Error::invalid(&name, "maximum occurrences must be at least 1"));
            }
            if self.min_occurs > max {
                return Err(Error::invalid(
                    &name,
                    format!("minimum occurrences {} exceed maximum {max}", self.min_occurs),
                ));
            }
        }
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err(Error::invalid(&name, format!("minimum length {min} exceeds maximum {max}")));
            }
        }
        if self.length == Some(0) {
            return Err(Error::invalid(&name, "length must be at least 1"));
        }
        if self.identifier.is_some() && self.is_repeating() {
            return Err(Error::invalid(&name, "identifying fields cannot repeat"));
        }

        self.resolved_unit = self.unit.unwrap_or(layout.unit);
        match layout.format {
            StreamFormat::FixedLength => {
                if self.resolved_unit != layout.unit {
                    return Err(Error::invalid(
                        &name,
                        format!("field counts {} but the stream counts {}", self.resolved_unit, layout.unit),
                    ));
                }
                self.stride = match self.length {
                    Some(length) => length,
                    None if variable_width && !self.is_repeating() => 0,
                    None => {
                        return Err(Error::invalid(
                            &name,
                            "length is required except for the last field of a record",
                        ));
                    }
                };
            }
            StreamFormat::Delimited | StreamFormat::Xml => self.stride = 1,
        }
        if self.length.is_some() && self.resolved_unit == LengthUnit::Bytes {
            let mut buf = [0u8; 4];
            let (encoded, _, unmappable) = layout.encoding.encode(self.padding.encode_utf8(&mut buf));
            let wide = layout.encoding.output_encoding() != layout.encoding;
            if unmappable || wide || encoded.len() != 1 {
                return Err(Error::invalid(
                    &name,
                    format!("padding '{}' is not a single byte in {}", self.padding, layout.encoding.name()),
                ));
            }
        }
        if self.xml_node == XmlNode::Attribute && self.is_repeating() {
            return Err(Error::invalid(&name, "attribute fields cannot repeat"));
        }
        self.offset = offset;

        self.compiled_regex = self.regex.as_deref().map(|p| anchored(&name, p)).transpose()?;
        self.compiled_key = match &self.identifier {
            Some(KeyRule::Pattern(p)) => Some(anchored(&name, p)?),
            _ => None,
        };

        self.handler = if self.explicit_handler {
            if self.type_config.is_empty() {
                self.handler.clone()
            } else {
                self.handler
                    .configure(&self.type_config)
                    .map_err(|source| Error::Type { field: name.clone(), source })?
                    .unwrap_or_else(|| self.handler.clone())
            }
        } else {
            registry
                .resolve(self.type_name.as_deref().unwrap_or("string"), &self.type_config)
                .map_err(|source| Error::Type { field: name.clone(), source })?
        };

        if let Some(default) = &self.default {
            self.handler.parse(default, &mut HandlerContext::new()).map_err(|e| {
                Error::invalid(&name, format!("invalid default value '{default}': {}", e.message()))
            })?;
        }
        Ok(())
    }
}

fn anchored(field: &str, pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|e| Error::Regex {
        field: field.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatbind_types::ConfigError;

    fn layout(format: StreamFormat) -> Layout {
        Layout {
            format,
            unit: LengthUnit::Characters,
            encoding: encoding_rs::UTF_8,
        }
    }

    fn compile(mut field: FieldDefinition, format: StreamFormat) -> Result<FieldDefinition> {
        field.compile(0, false, &layout(format), &TypeHandlerRegistry::with_defaults())?;
        Ok(field)
    }

    #[test]
    fn test_unpad_by_justification() {
        let left = FieldDefinition::new("name").length(6);
        assert_eq!(left.unpad("ab    "), "ab");
        assert_eq!(left.unpad("  ab  "), "  ab");

        let right = FieldDefinition::new("amount").length(5).padding('0').justify(Justify::Right);
        assert_eq!(right.unpad("00042"), "42");
        assert_eq!(right.unpad("00000"), "0");
        assert_eq!(right.unpad(""), "");
    }

    #[test]
    fn test_unpad_without_width_only_trims() {
        let field = FieldDefinition::new("name");
        assert_eq!(field.unpad(" ab "), " ab ");
        assert_eq!(field.trim().unpad(" ab "), "ab");
    }

    #[test]
    fn test_literal_key() {
        let field = compile(FieldDefinition::new("type").key("HDR"), StreamFormat::Delimited).unwrap();
        assert!(field.key_matches("HDR"));
        assert!(!field.key_matches("HDRX"));
        assert_eq!(field.literal.as_deref(), Some("HDR"));
    }

    #[test]
    fn test_pattern_key_is_anchored() {
        let field = compile(FieldDefinition::new("type").key_regex("D[0-9]"), StreamFormat::Delimited).unwrap();
        assert!(field.key_matches("D1"));
        assert!(!field.key_matches("D12"));
        assert!(!field.key_matches("XD1"));
    }

    #[test]
    fn test_invalid_regex() {
        let err = compile(FieldDefinition::new("code").regex("("), StreamFormat::Delimited).unwrap_err();
        assert!(matches!(err, Error::Regex { field, .. } if field == "code"));
    }

    #[test]
    fn test_invalid_pattern_fails_at_build() {
        let field = FieldDefinition::new("amount").type_name("int").format("#,##0.0.0");
        let err = compile(field, StreamFormat::Delimited).unwrap_err();
        assert!(matches!(err, Error::Type { source: ConfigError::InvalidNumberPattern { .. }, .. }));
    }

    #[test]
    fn test_occurs_bounds_validated() {
        let err = compile(FieldDefinition::new("n").occurs(3, 2), StreamFormat::Delimited).unwrap_err();
        assert!(err.to_string().contains("minimum occurrences 3 exceed maximum 2"));

        let err = compile(FieldDefinition::new("n").key("A").occurs(1, 2), StreamFormat::Delimited).unwrap_err();
        assert!(err.to_string().contains("identifying fields cannot repeat"));
    }

    #[test]
    fn test_fixed_length_requires_width() {
        let err = compile(FieldDefinition::new("name"), StreamFormat::FixedLength).unwrap_err();
        assert!(err.to_string().contains("length is required"));

        let mut last = FieldDefinition::new("rest");
        last.compile(4, true, &layout(StreamFormat::FixedLength), &TypeHandlerRegistry::with_defaults())
            .unwrap();
        assert_eq!(last.stride(), 0);
        assert_eq!(last.offset(), 4);
    }

    #[test]
    fn test_unit_must_match_fixed_stream() {
        let field = FieldDefinition::new("name").length(4).unit(LengthUnit::Bytes);
        let err = compile(field, StreamFormat::FixedLength).unwrap_err();
        assert!(err.to_string().contains("field counts bytes but the stream counts characters"));
    }

    #[test]
    fn test_multibyte_padding_rejected_in_byte_mode() {
        let layout = Layout {
            format: StreamFormat::FixedLength,
            unit: LengthUnit::Bytes,
            encoding: encoding_rs::SHIFT_JIS,
        };
        let mut field = FieldDefinition::new("name").length(4).padding('ー');
        let err = field.compile(0, false, &layout, &TypeHandlerRegistry::with_defaults()).unwrap_err();
        assert!(err.to_string().contains("is not a single byte in Shift_JIS"));
    }

    #[test]
    fn test_default_must_parse() {
        let field = FieldDefinition::new("n").type_name("int").default_value("abc");
        let err = compile(field, StreamFormat::Delimited).unwrap_err();
        assert!(err.to_string().contains("invalid default value 'abc'"));
    }

    #[test]
    fn test_explicit_handler_is_configured() {
        let registry = TypeHandlerRegistry::with_defaults();
        let field = FieldDefinition::new("n").handler(registry.get("int").unwrap()).format("000");
        let field = compile(field, StreamFormat::Delimited).unwrap();
        let mut cx = HandlerContext::new();
        assert_eq!(field.type_handler().format(&7i64.into(), &mut cx).unwrap(), "007");
    }
}

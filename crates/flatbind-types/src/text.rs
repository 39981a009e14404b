//! String, character and boolean handlers

use crate::handler::{HandlerContext, TypeHandler};
use crate::{ConversionResult, TypeConversionError};
use flatbind_ir::{Value, ValueType};

/// Passes text through unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct StringTypeHandler;

impl StringTypeHandler {
    pub fn new() -> Self {
        Self
    }
}

impl TypeHandler for StringTypeHandler {
    fn target_type(&self) -> ValueType {
        ValueType::String
    }

    fn parse(&self, text: &str, _cx: &mut HandlerContext) -> ConversionResult<Value> {
        if text.is_empty() {
            return Ok(Value::Null);
        }
        Ok(Value::String(text.to_string()))
    }

    fn format(&self, value: &Value, _cx: &mut HandlerContext) -> ConversionResult<String> {
        Ok(value.to_string())
    }
}

/// Single character values
#[derive(Debug, Clone, Copy, Default)]
pub struct CharTypeHandler;

impl CharTypeHandler {
    pub fn new() -> Self {
        Self
    }
}

impl TypeHandler for CharTypeHandler {
    fn target_type(&self) -> ValueType {
        ValueType::Char
    }

    fn parse(&self, text: &str, _cx: &mut HandlerContext) -> ConversionResult<Value> {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (None, _) => Ok(Value::Null),
            (Some(c), None) => Ok(Value::Char(c)),
            _ => Err(TypeConversionError::new(format!("Invalid character '{text}'"))),
        }
    }

    fn format(&self, value: &Value, _cx: &mut HandlerContext) -> ConversionResult<String> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Char(c) => Ok(c.to_string()),
            Value::String(s) if s.chars().count() == 1 => Ok(s.clone()),
            other => Err(TypeConversionError::new(format!(
                "Cannot format {} value as a character",
                other.type_name()
            ))),
        }
    }
}

/// `true`/`false`, case-insensitive on read
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanTypeHandler;

impl BooleanTypeHandler {
    pub fn new() -> Self {
        Self
    }
}

impl TypeHandler for BooleanTypeHandler {
    fn target_type(&self) -> ValueType {
        ValueType::Boolean
    }

    fn parse(&self, text: &str, _cx: &mut HandlerContext) -> ConversionResult<Value> {
        if text.is_empty() {
            Ok(Value::Null)
        } else if text.eq_ignore_ascii_case("true") {
            Ok(Value::Boolean(true))
        } else if text.eq_ignore_ascii_case("false") {
            Ok(Value::Boolean(false))
        } else {
            Err(TypeConversionError::new(format!("Invalid boolean value '{text}'")))
        }
    }

    fn format(&self, value: &Value, _cx: &mut HandlerContext) -> ConversionResult<String> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Boolean(b) => Ok(b.to_string()),
            other => Err(TypeConversionError::new(format!(
                "Cannot format {} value as a boolean",
                other.type_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_handler() {
        let mut cx = HandlerContext::new();
        let handler = StringTypeHandler::new();
        assert_eq!(handler.parse("", &mut cx).unwrap(), Value::Null);
        assert_eq!(handler.parse("abc", &mut cx).unwrap(), Value::from("abc"));
        assert_eq!(handler.format(&Value::Null, &mut cx).unwrap(), "");
        assert_eq!(handler.format(&Value::Integer(5), &mut cx).unwrap(), "5");
    }

    #[test]
    fn test_char_handler() {
        let mut cx = HandlerContext::new();
        let handler = CharTypeHandler::new();
        assert_eq!(handler.parse("ハ", &mut cx).unwrap(), Value::Char('ハ'));
        assert_eq!(handler.parse("", &mut cx).unwrap(), Value::Null);
        let err = handler.parse("ab", &mut cx).unwrap_err();
        assert_eq!(err.message(), "Invalid character 'ab'");
    }

    #[test]
    fn test_boolean_handler() {
        let mut cx = HandlerContext::new();
        let handler = BooleanTypeHandler::new();
        assert_eq!(handler.parse("TRUE", &mut cx).unwrap(), Value::Boolean(true));
        assert_eq!(handler.parse("false", &mut cx).unwrap(), Value::Boolean(false));
        assert_eq!(handler.parse("", &mut cx).unwrap(), Value::Null);
        assert_eq!(
            handler.parse("yes", &mut cx).unwrap_err().message(),
            "Invalid boolean value 'yes'"
        );
        assert_eq!(handler.format(&Value::Boolean(true), &mut cx).unwrap(), "true");
        assert!(handler.format(&Value::Integer(1), &mut cx).is_err());
    }
}

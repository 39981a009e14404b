//! Integer and decimal handlers with optional number patterns

use crate::handler::{HandlerConfig, HandlerContext, HandlerId, TypeHandler};
use crate::locale::Locale;
use crate::pattern::{NumberFormatter, NumberPattern};
use crate::{ConfigResult, ConversionResult, TypeConversionError};
use flatbind_ir::{Value, ValueType};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::sync::Arc;

/// Width of an integer handler's values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerKind {
    Byte,
    Short,
    Int,
    Long,
}

impl IntegerKind {
    fn name(self) -> &'static str {
        match self {
            IntegerKind::Byte => "Byte",
            IntegerKind::Short => "Short",
            IntegerKind::Int => "Integer",
            IntegerKind::Long => "Long",
        }
    }

    fn contains(self, value: i64) -> bool {
        match self {
            IntegerKind::Byte => i8::try_from(value).is_ok(),
            IntegerKind::Short => i16::try_from(value).is_ok(),
            IntegerKind::Int => i32::try_from(value).is_ok(),
            IntegerKind::Long => true,
        }
    }
}

/// Precision of a floating point handler's values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatKind {
    Float,
    Double,
}

impl FloatKind {
    fn name(self) -> &'static str {
        match self {
            FloatKind::Float => "Float",
            FloatKind::Double => "Double",
        }
    }
}

/// State shared by the numeric handlers
#[derive(Debug, Clone)]
struct NumberFormat {
    id: HandlerId,
    pattern: Option<Arc<NumberPattern>>,
    locale: Locale,
}

impl NumberFormat {
    fn plain() -> Self {
        Self {
            id: HandlerId::next(),
            pattern: None,
            locale: Locale::root(),
        }
    }

    /// Variant for `config`, `None` when nothing changes
    fn reconfigure(&self, config: &HandlerConfig) -> ConfigResult<Option<Self>> {
        let current = self.pattern.as_ref().map(|p| p.as_str());
        let pattern = config.pattern().or(current);
        let locale = config.locale.as_ref().unwrap_or(&self.locale);

        if pattern == current && *locale == self.locale {
            return Ok(None);
        }

        let pattern = match pattern {
            Some(p) if Some(p) == current => self.pattern.clone(),
            Some(p) => Some(Arc::new(NumberPattern::compile(p)?)),
            None => None,
        };
        Ok(Some(Self {
            id: HandlerId::next(),
            pattern,
            locale: locale.clone(),
        }))
    }

    fn formatter<'c>(
        &self,
        pattern: &Arc<NumberPattern>,
        cx: &'c mut HandlerContext,
    ) -> ConversionResult<&'c mut NumberFormatter> {
        cx.formatter(self.id, || NumberFormatter::new(Arc::clone(pattern), &self.locale))
            .ok_or_else(|| TypeConversionError::new("Number formatter unavailable"))
    }

    fn mismatch(text: &str, pattern: &NumberPattern) -> TypeConversionError {
        TypeConversionError::new(format!(
            "Number value '{text}' does not match pattern '{}'",
            pattern.as_str()
        ))
    }
}

/// Integral values of a given width
#[derive(Debug, Clone)]
pub struct IntegerTypeHandler {
    kind: IntegerKind,
    format: NumberFormat,
}

impl IntegerTypeHandler {
    pub fn new(kind: IntegerKind) -> Self {
        Self {
            kind,
            format: NumberFormat::plain(),
        }
    }

    /// Currently configured pattern
    pub fn pattern(&self) -> Option<&str> {
        self.format.pattern.as_ref().map(|p| p.as_str())
    }

    fn invalid(&self, text: &str) -> TypeConversionError {
        TypeConversionError::new(format!("Invalid {} value '{text}'", self.kind.name()))
    }
}

impl TypeHandler for IntegerTypeHandler {
    fn target_type(&self) -> ValueType {
        ValueType::Integer
    }

    fn parse(&self, text: &str, cx: &mut HandlerContext) -> ConversionResult<Value> {
        if text.is_empty() {
            return Ok(Value::Null);
        }

        let value = match &self.format.pattern {
            None => text.parse::<i64>().map_err(|_| self.invalid(text))?,
            Some(pattern) => {
                let formatter = self.format.formatter(pattern, cx)?;
                let parsed = formatter
                    .parse(text)
                    .ok_or_else(|| NumberFormat::mismatch(text, pattern))?;
                parsed.to_i64().ok_or_else(|| self.invalid(text))?
            }
        };

        if !self.kind.contains(value) {
            return Err(self.invalid(text));
        }
        Ok(Value::Integer(value))
    }

    fn format(&self, value: &Value, cx: &mut HandlerContext) -> ConversionResult<String> {
        let value = match value {
            Value::Null => return Ok(String::new()),
            Value::Integer(i) => *i,
            other => {
                return Err(TypeConversionError::new(format!(
                    "Cannot format {} value as {}",
                    other.type_name(),
                    self.kind.name()
                )));
            }
        };
        if !self.kind.contains(value) {
            return Err(TypeConversionError::new(format!(
                "Value {value} out of range for {}",
                self.kind.name()
            )));
        }

        match &self.format.pattern {
            None => Ok(value.to_string()),
            Some(pattern) => Ok(self.format.formatter(pattern, cx)?.format_integer(value)),
        }
    }

    fn configure(&self, config: &HandlerConfig) -> ConfigResult<Option<Arc<dyn TypeHandler>>> {
        Ok(self.format.reconfigure(config)?.map(|format| {
            Arc::new(Self {
                kind: self.kind,
                format,
            }) as Arc<dyn TypeHandler>
        }))
    }
}

/// Floating point values
#[derive(Debug, Clone)]
pub struct FloatTypeHandler {
    kind: FloatKind,
    format: NumberFormat,
}

impl FloatTypeHandler {
    pub fn new(kind: FloatKind) -> Self {
        Self {
            kind,
            format: NumberFormat::plain(),
        }
    }

    /// Currently configured pattern
    pub fn pattern(&self) -> Option<&str> {
        self.format.pattern.as_ref().map(|p| p.as_str())
    }

    fn invalid(&self, text: &str) -> TypeConversionError {
        TypeConversionError::new(format!("Invalid {} value '{text}'", self.kind.name()))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn narrow(&self, value: f64) -> f64 {
        match self.kind {
            FloatKind::Float => f64::from(value as f32),
            FloatKind::Double => value,
        }
    }
}

impl TypeHandler for FloatTypeHandler {
    fn target_type(&self) -> ValueType {
        ValueType::Float
    }

    fn parse(&self, text: &str, cx: &mut HandlerContext) -> ConversionResult<Value> {
        if text.is_empty() {
            return Ok(Value::Null);
        }

        let value = match &self.format.pattern {
            None => match self.kind {
                FloatKind::Float => text.parse::<f32>().map(f64::from),
                FloatKind::Double => text.parse::<f64>(),
            }
            .map_err(|_| self.invalid(text))?,
            Some(pattern) => {
                let formatter = self.format.formatter(pattern, cx)?;
                let parsed = formatter
                    .parse(text)
                    .ok_or_else(|| NumberFormat::mismatch(text, pattern))?;
                let value = parsed.to_f64().ok_or_else(|| self.invalid(text))?;
                self.narrow(value)
            }
        };
        Ok(Value::Float(value))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn format(&self, value: &Value, cx: &mut HandlerContext) -> ConversionResult<String> {
        let value = match value {
            Value::Null => return Ok(String::new()),
            Value::Float(f) => *f,
            Value::Integer(i) => *i as f64,
            Value::Decimal(d) => d.to_f64().ok_or_else(|| self.invalid(&d.to_string()))?,
            other => {
                return Err(TypeConversionError::new(format!(
                    "Cannot format {} value as {}",
                    other.type_name(),
                    self.kind.name()
                )));
            }
        };

        match &self.format.pattern {
            None => Ok(match self.kind {
                FloatKind::Float => (value as f32).to_string(),
                FloatKind::Double => value.to_string(),
            }),
            Some(pattern) => self
                .format
                .formatter(pattern, cx)?
                .format_decimal(value)
                .ok_or_else(|| TypeConversionError::new(format!("Cannot format {value} with pattern"))),
        }
    }

    fn configure(&self, config: &HandlerConfig) -> ConfigResult<Option<Arc<dyn TypeHandler>>> {
        Ok(self.format.reconfigure(config)?.map(|format| {
            Arc::new(Self {
                kind: self.kind,
                format,
            }) as Arc<dyn TypeHandler>
        }))
    }
}

/// Exact decimal values
///
/// Text is read without rounding and the number of fraction digits is
/// kept, so `125.50` is written back as `125.50`. Values beyond 28
/// significant digits are rejected rather than rounded.
#[derive(Debug, Clone)]
pub struct DecimalTypeHandler {
    format: NumberFormat,
}

impl DecimalTypeHandler {
    pub fn new() -> Self {
        Self {
            format: NumberFormat::plain(),
        }
    }

    /// Currently configured pattern
    pub fn pattern(&self) -> Option<&str> {
        self.format.pattern.as_ref().map(|p| p.as_str())
    }

    fn invalid(text: &str) -> TypeConversionError {
        TypeConversionError::new(format!("Invalid Decimal value '{text}'"))
    }
}

impl Default for DecimalTypeHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeHandler for DecimalTypeHandler {
    fn target_type(&self) -> ValueType {
        ValueType::Decimal
    }

    fn parse(&self, text: &str, cx: &mut HandlerContext) -> ConversionResult<Value> {
        if text.is_empty() {
            return Ok(Value::Null);
        }

        let value = match &self.format.pattern {
            // rust_decimal also accepts digit separators, which are not numbers here
            None if text.contains('_') => return Err(Self::invalid(text)),
            None => Decimal::from_str_exact(text).map_err(|_| Self::invalid(text))?,
            Some(pattern) => {
                let formatter = self.format.formatter(pattern, cx)?;
                let parsed = formatter
                    .parse(text)
                    .ok_or_else(|| NumberFormat::mismatch(text, pattern))?;
                parsed.to_decimal().ok_or_else(|| Self::invalid(text))?
            }
        };
        Ok(Value::Decimal(value))
    }

    fn format(&self, value: &Value, cx: &mut HandlerContext) -> ConversionResult<String> {
        let value = match value {
            Value::Null => return Ok(String::new()),
            Value::Decimal(d) => *d,
            Value::Integer(i) => Decimal::from(*i),
            Value::Float(f) => Decimal::from_f64(*f)
                .ok_or_else(|| TypeConversionError::new(format!("Cannot format {f} as Decimal")))?,
            other => {
                return Err(TypeConversionError::new(format!(
                    "Cannot format {} value as Decimal",
                    other.type_name()
                )));
            }
        };

        match &self.format.pattern {
            None => Ok(value.to_string()),
            Some(pattern) => Ok(self.format.formatter(pattern, cx)?.format_exact(&value)),
        }
    }

    fn configure(&self, config: &HandlerConfig) -> ConfigResult<Option<Arc<dyn TypeHandler>>> {
        Ok(self
            .format
            .reconfigure(config)?
            .map(|format| Arc::new(Self { format }) as Arc<dyn TypeHandler>))
    }
}

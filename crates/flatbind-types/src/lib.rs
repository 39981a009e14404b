#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # flatbind-types
//!
//! Type handlers convert between the text of a single field and a typed
//! [`Value`](flatbind_ir::Value).
//!
//! Handlers are registered as shared, immutable prototypes in a
//! [`TypeHandlerRegistry`]. A field that needs a pattern, locale or time
//! zone asks the prototype for a configured variant; the prototype is
//! reused when it is already configured that way. Formatting machinery
//! that is expensive to build or not shareable lives in a
//! [`HandlerContext`] owned by each reader or writer, never in the
//! handler itself.

pub mod handler;
pub mod locale;
pub mod number;
pub mod pattern;
pub mod registry;
pub mod temporal;
pub mod text;
pub mod xml;
pub mod zone;

pub use handler::{FORMAT_SETTING, HandlerConfig, HandlerContext, HandlerId, TypeHandler};
pub use locale::Locale;
pub use number::{DecimalTypeHandler, FloatKind, FloatTypeHandler, IntegerKind, IntegerTypeHandler};
pub use pattern::NumberPattern;
pub use registry::TypeHandlerRegistry;
pub use temporal::{DateTypeHandler, TemporalKind};
pub use text::{BooleanTypeHandler, CharTypeHandler, StringTypeHandler};
pub use xml::XmlTemporalTypeHandler;
pub use zone::TimeZoneId;

use thiserror::Error;

/// A field value could not be converted to or from text
///
/// The message is what ends up in the field fault reported to the
/// application, e.g. `Invalid Integer value 'abc'`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TypeConversionError {
    message: String,
}

impl TypeConversionError {
    /// Build a conversion error with the user-facing message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// User-facing message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A handler could not be configured as requested
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid date format pattern '{pattern}': {reason}")]
    InvalidDatePattern { pattern: String, reason: String },

    #[error("Invalid decimal format '{pattern}': {reason}")]
    InvalidNumberPattern { pattern: String, reason: String },

    #[error("Unknown time zone '{0}'")]
    UnknownTimeZone(String),

    #[error("Invalid locale '{0}'")]
    InvalidLocale(String),

    #[error("No type handler named '{0}'")]
    UnknownHandler(String),
}

impl ConfigError {
    /// Build an invalid date pattern error.
    pub fn date_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDatePattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Build an invalid number pattern error.
    pub fn number_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNumberPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }
}

/// Result of a text/value conversion
pub type ConversionResult<T> = std::result::Result<T, TypeConversionError>;

/// Result of handler configuration
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

//! # flatbind-schema
//!
//! The definition tree describing a stream's layout.
//!
//! A stream is an implicit root group of records and nested groups.
//! Records hold fields and segments, and segments nest fields and
//! further segments. Definitions are assembled with builder-style
//! constructors and finished by [`StreamBuilder::build`], which
//! resolves type handlers, computes positions and spans, and rejects
//! invalid configuration up front. The finished tree is immutable and
//! shared behind an `Arc` by any number of readers and writers.

pub mod field;
pub mod group;
pub mod record;
pub mod stream;

pub use field::{FieldDefinition, Justify, KeyRule, LengthUnit, XmlNode};
pub use group::{Component, GroupDefinition};
pub use record::{Member, RecordDefinition, SegmentDefinition};
pub use stream::{StreamBuilder, StreamDefinition, StreamFormat};

use flatbind_types::ConfigError;
use thiserror::Error;

/// Errors raised while building a stream definition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid definition '{component}': {message}")]
    InvalidDefinition { component: String, message: String },

    #[error("Invalid type configuration for field '{field}': {source}")]
    Type {
        field: String,
        #[source]
        source: ConfigError,
    },

    #[error("Invalid regular expression for field '{field}': {message}")]
    Regex { field: String, message: String },

    #[error("Unknown encoding '{0}'")]
    UnknownEncoding(String),
}

impl Error {
    /// Build an invalid-definition error for a named component.
    pub fn invalid(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            component: component.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

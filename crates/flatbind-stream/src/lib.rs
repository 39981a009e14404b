#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # flatbind-stream
//!
//! Entry point for applications.
//!
//! A [`StreamFactory`] holds built stream definitions by name together
//! with their format options, and opens readers and writers over any
//! `Read` or `Write` value. The format of a registered stream decides
//! which adapter is used, so callers work with one reader and one
//! writer type for every format. A [`RecordCodec`] binds a single record
//! of text outside any stream.
//!
//! ## Example Usage
//!
//! ```rust
//! use flatbind_schema::{FieldDefinition, RecordDefinition, StreamDefinition, StreamFormat};
//! use flatbind_stream::StreamFactory;
//!
//! # fn main() -> anyhow::Result<()> {
//! let factory = StreamFactory::new();
//! factory.define(
//!     StreamDefinition::builder("contacts", StreamFormat::Delimited)
//!         .record(RecordDefinition::new("contact").field(FieldDefinition::new("name"))),
//! )?;
//!
//! let mut reader = factory.create_reader("contacts", "Ann\nBob\n".as_bytes())?;
//! let mut names = Vec::new();
//! while let Some(bean) = reader.read()? {
//!     names.extend(bean.value("name").cloned());
//! }
//! assert_eq!(names.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod error;
pub mod factory;
pub mod format;

pub use codec::RecordCodec;
pub use error::{Error, Result};
pub use factory::{StreamFactory, StreamReader, StreamWriter};
pub use format::{AnyRecord, AnySink, AnySource, FormatConfig};

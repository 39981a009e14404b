#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # flatbind-adapter-delimited
//!
//! Delimited text support for flatbind streams.
//!
//! Lines are split into tokens by the `csv` crate with quoting, escape
//! and comment handling taken from a [`DelimitedConfig`]. A field's
//! position is its token index. Input is decoded and output encoded in
//! the stream's character set.
//!
//! ```rust,ignore
//! let config = DelimitedConfig::new().delimiter('|');
//! let source = DelimitedSource::new(file, &stream, &config)?;
//! let mut reader = BeanReader::new(stream, source);
//! ```

pub mod config;
pub mod reader;
pub mod writer;

pub use config::DelimitedConfig;
pub use reader::{DelimitedRecord, DelimitedSource};
pub use writer::DelimitedSink;

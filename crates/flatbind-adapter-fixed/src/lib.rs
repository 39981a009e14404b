#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # flatbind-adapter-fixed
//!
//! Fixed-length text support for flatbind streams.
//!
//! Each line is one record. Field positions and widths count either
//! characters or encoded bytes, as selected by the stream's length
//! unit. In byte mode the line is re-encoded in the stream's character
//! set before slicing, so a double-byte character counts as two, and a
//! slice that would split a character is reported as a field fault.

pub mod config;
pub mod reader;
pub mod writer;

pub use config::FixedLengthConfig;
pub use reader::{FixedLengthSource, FixedRecord};
pub use writer::FixedLengthSink;

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # flatbind-adapter-xml
//!
//! XML document support for flatbind streams.
//!
//! The document root wraps the whole stream and each child element of
//! the root is one record. Segments map to nested elements and fields
//! map to attributes, child elements or the text of their parent,
//! depending on the field's XML node type.

pub mod config;
pub mod element;
pub mod reader;
pub mod writer;

pub use config::XmlConfig;
pub use element::XmlElement;
pub use reader::{XmlRecord, XmlSource};
pub use writer::{XmlSink, render};

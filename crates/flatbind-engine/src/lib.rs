#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # flatbind-engine
//!
//! Format independent core of the binding engine.
//!
//! A [`BeanReader`] pulls records from a [`RecordSource`], identifies
//! each against the group structure of its stream with a
//! [`Navigator`], and binds the record's fields into a
//! [`Bean`](flatbind_ir::Bean) with a [`RecordBinder`]. A [`BeanWriter`]
//! runs the same checks in reverse and hands formatted fields to a
//! [`RecordSink`]. Format adapters only implement the source, sink and
//! [`RecordView`] traits.
//!
//! Faults are classified by [`ErrorKind`] and routed through an
//! [`ErrorHandler`]; the default propagates everything to the caller.

pub mod binder;
pub mod dispatch;
pub mod error;
pub mod io;
pub mod measure;
pub mod navigate;
pub mod reader;
pub mod view;
pub mod writer;

pub use binder::{RecordBinder, RenderedField, RenderedRecord};
pub use dispatch::{DispatchTable, ErrorHandler, LenientErrorHandler, PropagateAll};
pub use error::{BeanError, ErrorKind, FieldError, Result};
pub use io::{LineEnding, TranscodingReader, TranscodingWriter};
pub use navigate::{Candidate, GroupContext, Missing, Navigator, Rejection};
pub use reader::{BeanReader, RecordSource};
pub use view::{Extract, FieldLocation, RecordView, Scope};
pub use writer::{BeanWriter, RecordSink};

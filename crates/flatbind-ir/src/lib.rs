#![deny(unsafe_op_in_unsafe_fn)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

//! # flatbind-ir
//!
//! The value graph that stream records are bound to and from.
//!
//! A record read from a stream becomes a [`Bean`]: a named bag of
//! [`Property`] values, which may be scalars ([`Value`]), nested beans
//! (segments) or lists (repeating fields and segments). Writers read
//! the same shapes back out through the [`PropertyAccess`] capability.

/// Bean and property containers.
pub mod bean;
/// Property path parsing and path-based access.
pub mod path;
/// Scalar values and their type tags.
pub mod value;

pub use bean::{Bean, Property};
pub use path::{PathSegment, PropertyAccess, PropertyPath};
pub use rust_decimal::Decimal;
pub use value::{Value, ValueType};

use thiserror::Error;

/// Errors raised while reading or assigning bean properties
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid property path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Property '{path}' is not a bean")]
    NotABean { path: String },

    #[error("Index {index} out of bounds for list '{path}' of length {len}")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("Type mismatch at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },
}

impl Error {
    /// Build an invalid-path error with input path and parsing reason.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Build an error for a path that walks through a scalar.
    pub fn not_a_bean(path: impl Into<String>) -> Self {
        Self::NotABean { path: path.into() }
    }

    /// Build a type mismatch error.
    pub fn type_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Crate-local result type for property operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Factory errors

use flatbind_engine::BeanError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Stream '{0}' is not registered")]
    UnknownStream(String),

    #[error("Stream '{0}' is already registered")]
    DuplicateStream(String),

    #[error("Format configuration for stream '{stream}' does not match its {format} format")]
    FormatMismatch { stream: String, format: String },

    #[error(transparent)]
    Schema(#[from] flatbind_schema::Error),

    #[error(transparent)]
    Bean(#[from] BeanError),
}

pub type Result<T> = std::result::Result<T, Error>;

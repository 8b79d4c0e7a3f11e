use std::io;

use thiserror::Error;

use crate::stripe::StreamKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Protobuf decode error: {0}")]
    Protobuf(#[from] prost::DecodeError),

    #[error("Malformed footer: {0}")]
    MalformedFooter(String),

    #[error("Missing required {kind:?} stream for column {column}")]
    MissingRequiredStream { column: u32, kind: StreamKind },

    #[error("Stream length mismatch: {0}")]
    StreamLengthMismatch(String),

    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    #[error("Run-length decode error: {0}")]
    RunLengthDecode(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

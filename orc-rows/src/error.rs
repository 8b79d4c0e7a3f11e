use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("ORC error: {0}")]
    Orc(#[from] orc_columnar::Error),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Invalid binding: {0}")]
    InvalidBinding(String),

    #[error("Row alignment error: {0}")]
    RowAlignment(String),
}

pub type Result<T> = std::result::Result<T, Error>;

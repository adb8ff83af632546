//! Error types for linear model training

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinearError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported solver: {0}")]
    UnsupportedSolver(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, LinearError>;

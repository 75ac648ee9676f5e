//! Error types for the ingestion pipeline
//!
//! Feed noise (short records, missing channel/theme, unparseable numbers) is
//! never an error. What remains are input-format failures, storage failures,
//! the "already running" rejection, and cancellation.

use thiserror::Error;

use crate::storage::StorageError;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    /// Another run of the same pipeline holds the run slot
    #[error("An import is already running")]
    AlreadyRunning,

    /// A cancellation request was observed at a poll point
    #[error("Import cancelled")]
    Cancelled,

    #[error("Decompression error: {0}")]
    Decompression(String),

    #[error("Unsupported compression format: {0}")]
    UnsupportedFormat(String),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: decompressed feed is not valid UTF-8 ({0})")]
    InvalidEncoding(#[from] std::string::FromUtf8Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Worker task failed: {0}")]
    Task(String),
}

impl IngestError {
    /// Whether this error is a cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, IngestError::Cancelled)
    }
}

impl From<tokio::task::JoinError> for IngestError {
    fn from(err: tokio::task::JoinError) -> Self {
        IngestError::Task(err.to_string())
    }
}

//! Error types for Kuckmal

use thiserror::Error;

/// Result type alias for shared Kuckmal operations
pub type Result<T> = std::result::Result<T, KuckmalError>;

/// Errors raised by the shared domain types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KuckmalError {
    #[error("Invalid import mode: {0} (expected 'full' or 'diff')")]
    InvalidImportMode(String),
}

//! Durable storage for media records
//!
//! The pipeline only needs one capability from its destination: apply a batch
//! of records atomically under a conflict policy. [`MediaStore`] is that seam;
//! [`SqliteMediaStore`] is the production implementation.

pub mod schema;
pub mod sqlite;

use kuckmal_common::{ImportMode, MediaRecord};
use thiserror::Error;

pub use sqlite::SqliteMediaStore;

/// Storage adapter errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// How a batch treats rows whose `(channel, theme, title)` key already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Keep the stored row, drop the incoming one
    Ignore,
    /// Overwrite every non-key column with the incoming values
    Update,
}

impl From<ImportMode> for ConflictPolicy {
    fn from(mode: ImportMode) -> Self {
        match mode {
            ImportMode::Full => ConflictPolicy::Ignore,
            ImportMode::Diff => ConflictPolicy::Update,
        }
    }
}

/// Destination of the batch writer
pub trait MediaStore {
    /// Apply `records` as one atomic unit
    ///
    /// Either every record is applied under `policy` or none is. Returns the
    /// number of rows inserted or updated.
    fn upsert_batch(
        &mut self,
        records: &[MediaRecord],
        policy: ConflictPolicy,
    ) -> Result<usize, StorageError>;

    /// Remove every record. Returns the number removed.
    fn clear(&mut self) -> Result<usize, StorageError>;

    /// Number of stored records
    fn count(&self) -> Result<u64, StorageError>;
}

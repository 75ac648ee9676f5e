//! Ingestion configuration
//!
//! Loaded from `KUCKMAL_*` environment variables (a `.env` file is honoured).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{IngestError, Result};

// ============================================================================
// Ingestion Configuration Constants
// ============================================================================

/// Default SQLite database location.
pub const DEFAULT_DATABASE_PATH: &str = "./data/kuckmal.db";

/// Records per flush transaction.
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Decompression read size in bytes; cancellation is polled once per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Directory name under the system temp dir used for intermediates.
pub const DEFAULT_WORK_DIR_NAME: &str = "kuckmal-ingest";

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Directory for decompressed intermediate files
    pub work_dir: PathBuf,
    /// Records per flush transaction
    pub batch_size: usize,
    /// Decompression chunk size in bytes
    pub chunk_size: usize,
    /// Keep the decompressed intermediate after a successful run
    pub keep_intermediate: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            work_dir: std::env::temp_dir().join(DEFAULT_WORK_DIR_NAME),
            batch_size: DEFAULT_BATCH_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            keep_intermediate: false,
        }
    }
}

impl IngestConfig {
    /// Load configuration from environment variables
    ///
    /// - `KUCKMAL_DATABASE_PATH`
    /// - `KUCKMAL_WORK_DIR`
    /// - `KUCKMAL_BATCH_SIZE`
    /// - `KUCKMAL_CHUNK_SIZE`
    /// - `KUCKMAL_KEEP_INTERMEDIATE`
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            database_path: std::env::var("KUCKMAL_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            work_dir: std::env::var("KUCKMAL_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            batch_size: std::env::var("KUCKMAL_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.batch_size),
            chunk_size: std::env::var("KUCKMAL_CHUNK_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.chunk_size),
            keep_intermediate: std::env::var("KUCKMAL_KEEP_INTERMEDIATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.keep_intermediate),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(IngestError::Config(
                "KUCKMAL_BATCH_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.chunk_size == 0 {
            return Err(IngestError::Config(
                "KUCKMAL_CHUNK_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.database_path.as_os_str().is_empty() {
            return Err(IngestError::Config("Database path cannot be empty".to_string()));
        }

        Ok(())
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_keep_intermediate(mut self, keep: bool) -> Self {
        self.keep_intermediate = keep;
        self
    }

    /// Path of the decompressed intermediate for a run
    pub fn intermediate_path(&self, run_id: &uuid::Uuid) -> PathBuf {
        self.work_dir.join(format!("filmliste-{}.json", run_id))
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }
}

//! Kuckmal Filmliste ingestion
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Turns a compressed Filmliste feed into rows of a SQLite media table.
//!
//! # Stages
//!
//! 1. [`decompression`]: xz or gzip to a plain-text intermediate, chunk by chunk
//! 2. [`filmliste::scanner`]: finds every `"X":[...]` record and tokenises it
//! 3. [`filmliste::inheritance`]: fills empty channel/theme from the previous record
//! 4. [`filmliste::mapper`]: positional tokens to [`kuckmal_common::MediaRecord`]
//! 5. [`writer`]: batched upserts, one transaction per batch
//!
//! [`status`] tracks progress and cancellation for all of them, [`pipeline`]
//! runs them in order, and [`orchestrator`] wraps a whole import including
//! store clearing and intermediate cleanup.
//!
//! # Example
//!
//! ```no_run
//! use kuckmal_common::ImportMode;
//! use kuckmal_ingest::{ImportOrchestrator, IngestConfig, SqliteMediaStore};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = IngestConfig::from_env()?;
//! let store = SqliteMediaStore::open(&config.database_path)?;
//! let orchestrator = ImportOrchestrator::new(config, store);
//!
//! let report = orchestrator.import("Filmliste-akt.xz", ImportMode::Full).await?;
//! println!("imported {} entries", report.records_imported);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod decompression;
pub mod error;
pub mod filmliste;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod status;
pub mod storage;
pub mod writer;

pub use config::IngestConfig;
pub use error::{IngestError, Result};
pub use orchestrator::{ImportOrchestrator, ImportReport};
pub use pipeline::{ActiveRun, FilmlistePipeline, ImportSummary};
pub use status::{CancellationFlag, PipelineController, PipelineState, PipelineStatus};
pub use storage::{ConflictPolicy, MediaStore, SqliteMediaStore, StorageError};

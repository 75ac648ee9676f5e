//! Import orchestration
//!
//! Drives one complete import on a blocking worker thread: claim the pipeline,
//! decompress, clear the store for a full import, parse and write, then remove
//! the intermediate file. The intermediate is always removed after a failed or
//! cancelled run, so a retry never reads a partial decompression.

use chrono::{DateTime, Utc};
use kuckmal_common::ImportMode;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::pipeline::{ActiveRun, FilmlistePipeline, ImportSummary};
use crate::status::{PipelineController, PipelineStatus};
use crate::storage::MediaStore;

/// Result of a finished import
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub run_id: Uuid,
    pub mode: ImportMode,
    /// Records in committed batches
    pub records_imported: u64,
    pub rows_affected: u64,
    pub records_scanned: u64,
    /// Records dropped because channel or theme could not be resolved
    pub records_dropped: u64,
    pub short_records: u64,
    pub batches: u64,
    pub bytes_decompressed: u64,
    /// Intermediate file, when kept
    pub intermediate: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_secs: f64,
}

/// Runs imports against a shared store
pub struct ImportOrchestrator<S> {
    pipeline: FilmlistePipeline,
    store: Arc<Mutex<S>>,
    config: IngestConfig,
}

impl<S> ImportOrchestrator<S>
where
    S: MediaStore + Send + 'static,
{
    pub fn new(config: IngestConfig, store: S) -> Self {
        let pipeline = FilmlistePipeline::new(config.batch_size, config.chunk_size);
        Self {
            pipeline,
            store: Arc::new(Mutex::new(store)),
            config,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn controller(&self) -> &Arc<PipelineController> {
        self.pipeline.controller()
    }

    /// Snapshot of the pipeline status
    pub fn status(&self) -> PipelineStatus {
        self.pipeline.status()
    }

    /// Request cancellation of the active import
    pub fn cancel(&self) {
        self.pipeline.cancel();
    }

    pub fn store(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.store)
    }

    /// Import `source` on a blocking worker
    pub async fn import(&self, source: impl Into<PathBuf>, mode: ImportMode) -> Result<ImportReport> {
        self.import_with_progress(source, mode, |_| {}).await
    }

    /// Import `source`, calling `on_progress` with the committed record total
    /// after every batch
    ///
    /// A concurrent call fails with [`IngestError::AlreadyRunning`] before any
    /// work is scheduled.
    pub async fn import_with_progress<F>(
        &self,
        source: impl Into<PathBuf>,
        mode: ImportMode,
        on_progress: F,
    ) -> Result<ImportReport>
    where
        F: FnMut(u64) + Send + 'static,
    {
        let run = self.pipeline.begin()?;
        let source = source.into();
        let store = Arc::clone(&self.store);
        let config = self.config.clone();

        tokio::task::spawn_blocking(move || {
            execute(&run, &store, &config, &source, mode, on_progress)
        })
        .await?
    }

    /// Import `source` on the current thread
    pub fn import_blocking(&self, source: &Path, mode: ImportMode) -> Result<ImportReport> {
        let run = self.pipeline.begin()?;
        execute(&run, &self.store, &self.config, source, mode, |_| {})
    }
}

fn lock<S>(store: &Mutex<S>) -> MutexGuard<'_, S> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

fn execute<S, F>(
    run: &ActiveRun,
    store: &Mutex<S>,
    config: &IngestConfig,
    source: &Path,
    mode: ImportMode,
    on_progress: F,
) -> Result<ImportReport>
where
    S: MediaStore,
    F: FnMut(u64),
{
    let started_at = Utc::now();
    let intermediate = config.intermediate_path(&run.run_id());
    info!(
        run_id = %run.run_id(),
        source = %source.display(),
        mode = %mode,
        "Starting import"
    );

    let result = run_stages(run, store, source, &intermediate, mode, on_progress);

    let keep = result.is_ok() && config.keep_intermediate;
    if !keep {
        remove_intermediate(&intermediate);
    }

    let (bytes_decompressed, summary) = result?;
    let completed_at = Utc::now();

    Ok(ImportReport {
        run_id: run.run_id(),
        mode,
        records_imported: summary.records_imported,
        rows_affected: summary.rows_affected,
        records_scanned: summary.parse.records_scanned,
        records_dropped: summary.parse.records_dropped,
        short_records: summary.parse.short_records,
        batches: summary.batches,
        bytes_decompressed,
        intermediate: keep.then_some(intermediate),
        started_at,
        completed_at,
        duration_secs: (completed_at - started_at).num_milliseconds() as f64 / 1000.0,
    })
}

fn run_stages<S, F>(
    run: &ActiveRun,
    store: &Mutex<S>,
    source: &Path,
    intermediate: &Path,
    mode: ImportMode,
    on_progress: F,
) -> Result<(u64, ImportSummary)>
where
    S: MediaStore,
    F: FnMut(u64),
{
    let decompressed = run.decompress(source, intermediate)?;

    let mut store = lock(store);

    if mode == ImportMode::Full {
        let cleared = run
            .cancellation_flag()
            .check()
            .and_then(|()| store.clear().map_err(IngestError::from));
        match cleared {
            Ok(removed) => debug!(removed, "Cleared store for full import"),
            Err(err) => {
                run.record_failure(&err);
                return Err(err);
            }
        }
    }

    let summary = run.parse_and_import(intermediate, &mut *store, mode, on_progress)?;
    Ok((decompressed.bytes_written, summary))
}

fn remove_intermediate(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed intermediate file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove intermediate file"),
    }
}

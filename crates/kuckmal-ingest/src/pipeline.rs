//! Filmliste ingestion pipeline
//!
//! Runs the stages of one import in order, on the calling thread:
//! decompress, then scan, inherit, map and write. Every stage reports into the
//! shared [`PipelineController`] and polls its cancellation flag. A failing
//! stage records `error` or `cancelled` in the status before returning `Err`.

use kuckmal_common::ImportMode;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::decompression::{decompress_file, DecompressionStats};
use crate::error::{IngestError, Result};
use crate::filmliste::{FilmlisteParser, ParseStats};
use crate::status::{CancellationFlag, PipelineController, PipelineState, PipelineStatus, RunGuard};
use crate::storage::{ConflictPolicy, MediaStore};
use crate::writer::BatchWriter;

/// Status is refreshed at least this often while parsing
const REPORT_EVERY_RECORDS: u64 = 1000;

/// Outcome of a successful parse-and-import stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Records in committed batches
    pub records_imported: u64,
    pub rows_affected: u64,
    pub batches: u64,
    pub parse: ParseStats,
}

/// Pipeline settings plus the controller shared with pollers
#[derive(Debug, Clone)]
pub struct FilmlistePipeline {
    controller: Arc<PipelineController>,
    batch_size: usize,
    chunk_size: usize,
}

impl FilmlistePipeline {
    pub fn new(batch_size: usize, chunk_size: usize) -> Self {
        Self::with_controller(Arc::new(PipelineController::new()), batch_size, chunk_size)
    }

    pub fn with_controller(
        controller: Arc<PipelineController>,
        batch_size: usize,
        chunk_size: usize,
    ) -> Self {
        Self {
            controller,
            batch_size: batch_size.max(1),
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn controller(&self) -> &Arc<PipelineController> {
        &self.controller
    }

    pub fn status(&self) -> PipelineStatus {
        self.controller.status()
    }

    pub fn cancel(&self) {
        self.controller.cancel();
    }

    /// Claim the pipeline for one run
    pub fn begin(&self) -> Result<ActiveRun> {
        let guard = self.controller.try_begin()?;
        debug!(run_id = %guard.run_id(), "Claimed pipeline");
        Ok(ActiveRun {
            guard,
            batch_size: self.batch_size,
            chunk_size: self.chunk_size,
        })
    }
}

/// A claimed pipeline; dropping it frees the pipeline for the next run
#[derive(Debug)]
pub struct ActiveRun {
    guard: RunGuard,
    batch_size: usize,
    chunk_size: usize,
}

impl ActiveRun {
    pub fn run_id(&self) -> Uuid {
        self.guard.run_id()
    }

    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.guard.cancellation_flag()
    }

    /// Record a failure that happened between stages
    pub fn record_failure(&self, err: &IngestError) {
        if !err.is_cancelled() {
            error!(run_id = %self.run_id(), error = %err, "Import failed");
        }
        self.guard.record_failure(err);
    }

    /// Decompress `source` into the plain-text intermediate `dest`
    pub fn decompress(&self, source: &Path, dest: &Path) -> Result<DecompressionStats> {
        self.guard.enter(
            PipelineState::Decompressing,
            &format!("Decompressing {}", source.display()),
        );

        let cancel = self.cancellation_flag();
        let result = decompress_file(source, dest, self.chunk_size, &cancel, |progress| {
            self.guard.report(progress.percent(), 0, progress.bytes_written);
        });

        match result {
            Ok(stats) => {
                self.guard.report(100, 0, stats.bytes_written);
                self.guard.enter(
                    PipelineState::DecompressComplete,
                    &format!("Decompressed {} bytes", stats.bytes_written),
                );
                Ok(stats)
            }
            Err(err) => {
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    /// Parse the decompressed feed at `source` and write it into `store`
    ///
    /// `on_progress` receives the running total of committed records after
    /// every batch flush. Cancellation discards the unflushed remainder;
    /// batches committed before it stay.
    pub fn parse_and_import<S, F>(
        &self,
        source: &Path,
        store: &mut S,
        mode: ImportMode,
        on_progress: F,
    ) -> Result<ImportSummary>
    where
        S: MediaStore + ?Sized,
        F: FnMut(u64),
    {
        self.guard.enter(
            PipelineState::Parsing,
            &format!("Parsing {} ({} import)", source.display(), mode),
        );

        match self.import_records(source, store, mode, on_progress) {
            Ok(summary) => {
                self.guard.enter(
                    PipelineState::Complete,
                    &format!("Imported {} entries", summary.records_imported),
                );
                info!(
                    run_id = %self.run_id(),
                    mode = %mode,
                    records = summary.records_imported,
                    rows_affected = summary.rows_affected,
                    batches = summary.batches,
                    dropped = summary.parse.records_dropped,
                    short = summary.parse.short_records,
                    "Import complete"
                );
                Ok(summary)
            }
            Err(err) => {
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    fn import_records<S, F>(
        &self,
        source: &Path,
        store: &mut S,
        mode: ImportMode,
        on_progress: F,
    ) -> Result<ImportSummary>
    where
        S: MediaStore + ?Sized,
        F: FnMut(u64),
    {
        let text = String::from_utf8(std::fs::read(source)?)?;
        let cancel = self.cancellation_flag();

        let mut parser = FilmlisteParser::new(&text);
        let mut writer = BatchWriter::new(store, ConflictPolicy::from(mode), self.batch_size)
            .with_progress(on_progress);
        let mut mapped = 0u64;

        while let Some(scanned) = parser.next_scanned() {
            if cancel.is_cancelled() {
                let committed = writer.abandon();
                info!(
                    run_id = %self.run_id(),
                    committed = committed.records_written,
                    "Import cancelled, committed batches are kept"
                );
                return Err(IngestError::Cancelled);
            }

            if let Some(record) = scanned {
                writer.push(record)?;
                mapped += 1;
            }

            if parser.stats().records_scanned % REPORT_EVERY_RECORDS == 0 {
                let position = parser.position();
                self.guard.report(
                    percent(position, parser.input_len()),
                    mapped,
                    position as u64,
                );
            }
        }

        let parse = parser.stats();
        debug!(
            scanned = parse.records_scanned,
            dropped = parse.records_dropped,
            short = parse.short_records,
            "Feed scanned"
        );

        let written = writer.finish()?;
        self.guard
            .report(100, written.records_written, parser.position() as u64);
        Ok(ImportSummary {
            records_imported: written.records_written,
            rows_affected: written.rows_affected,
            batches: written.batches,
            parse,
        })
    }
}

fn percent(position: usize, len: usize) -> u8 {
    if len == 0 {
        return 100;
    }
    ((position as u64).saturating_mul(100) / len as u64).min(100) as u8
}

//! Batch upsert writer
//!
//! Buffers mapped records and hands them to the store in fixed-size batches.
//! Each batch is one transaction; a run is only as atomic as its batches.

use kuckmal_common::MediaRecord;
use serde::Serialize;
use tracing::debug;

use crate::storage::{ConflictPolicy, MediaStore, StorageError};

/// Counters of committed work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteStats {
    /// Records in committed batches
    pub records_written: u64,
    /// Rows actually inserted or updated; ignored duplicates are not counted
    pub rows_affected: u64,
    pub batches: u64,
}

/// Buffers records and flushes them as atomic batches
pub struct BatchWriter<'s, S: MediaStore + ?Sized> {
    store: &'s mut S,
    policy: ConflictPolicy,
    batch_size: usize,
    buffer: Vec<MediaRecord>,
    stats: WriteStats,
    on_flush: Option<Box<dyn FnMut(u64) + 's>>,
}

impl<'s, S: MediaStore + ?Sized> BatchWriter<'s, S> {
    pub fn new(store: &'s mut S, policy: ConflictPolicy, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            store,
            policy,
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            stats: WriteStats::default(),
            on_flush: None,
        }
    }

    /// Call `callback` with the total of committed records after every flush
    pub fn with_progress(mut self, callback: impl FnMut(u64) + 's) -> Self {
        self.on_flush = Some(Box::new(callback));
        self
    }

    /// Buffer a record, flushing when the batch is full
    pub fn push(&mut self, record: MediaRecord) -> Result<(), StorageError> {
        self.buffer.push(record);
        if self.buffer.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Commit the buffered records as one batch
    ///
    /// On failure the batch is rolled back and stays buffered.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let affected = self.store.upsert_batch(&self.buffer, self.policy)?;

        self.stats.batches += 1;
        self.stats.records_written += self.buffer.len() as u64;
        self.stats.rows_affected += affected as u64;
        debug!(
            batch = self.stats.batches,
            records = self.buffer.len(),
            affected,
            total = self.stats.records_written,
            "Flushed batch"
        );
        self.buffer.clear();

        if let Some(callback) = self.on_flush.as_mut() {
            callback(self.stats.records_written);
        }
        Ok(())
    }

    /// Flush the remainder and return the totals
    pub fn finish(mut self) -> Result<WriteStats, StorageError> {
        self.flush()?;
        Ok(self.stats)
    }

    /// Drop the buffered records without writing them
    pub fn abandon(self) -> WriteStats {
        if !self.buffer.is_empty() {
            debug!(discarded = self.buffer.len(), "Discarding unflushed records");
        }
        self.stats
    }

    /// Records waiting for the next flush
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> WriteStats {
        self.stats
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records every batch it receives
    #[derive(Default)]
    struct RecordingStore {
        batches: Vec<Vec<String>>,
        fail_on_batch: Option<usize>,
    }

    impl MediaStore for RecordingStore {
        fn upsert_batch(
            &mut self,
            records: &[MediaRecord],
            _policy: ConflictPolicy,
        ) -> Result<usize, StorageError> {
            if self.fail_on_batch == Some(self.batches.len()) {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            self.batches.push(records.iter().map(|r| r.title.clone()).collect());
            Ok(records.len())
        }

        fn clear(&mut self) -> Result<usize, StorageError> {
            let n = self.batches.len();
            self.batches.clear();
            Ok(n)
        }

        fn count(&self) -> Result<u64, StorageError> {
            Ok(self.batches.iter().map(Vec::len).sum::<usize>() as u64)
        }
    }

    fn record(title: &str) -> MediaRecord {
        MediaRecord {
            channel: "ARD".to_string(),
            theme: "Doku".to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_flushes_full_batches_and_remainder() {
        let mut store = RecordingStore::default();
        let progress = RefCell::new(Vec::new());

        let stats = {
            let mut writer = BatchWriter::new(&mut store, ConflictPolicy::Ignore, 2)
                .with_progress(|n| progress.borrow_mut().push(n));
            for title in ["a", "b", "c", "d", "e"] {
                writer.push(record(title)).unwrap();
            }
            assert_eq!(writer.pending(), 1);
            writer.finish().unwrap()
        };

        assert_eq!(store.batches, vec![vec!["a", "b"], vec!["c", "d"], vec!["e"]]);
        assert_eq!(progress.into_inner(), vec![2, 4, 5]);
        assert_eq!(
            stats,
            WriteStats {
                records_written: 5,
                rows_affected: 5,
                batches: 3,
            }
        );
    }

    #[test]
    fn test_finish_without_records_writes_nothing() {
        let mut store = RecordingStore::default();
        let stats = BatchWriter::new(&mut store, ConflictPolicy::Update, 10).finish().unwrap();
        assert_eq!(stats, WriteStats::default());
        assert!(store.batches.is_empty());
    }

    #[test]
    fn test_failed_flush_keeps_earlier_batches() {
        let mut store = RecordingStore {
            fail_on_batch: Some(1),
            ..Default::default()
        };

        let mut writer = BatchWriter::new(&mut store, ConflictPolicy::Ignore, 2);
        writer.push(record("a")).unwrap();
        writer.push(record("b")).unwrap();
        writer.push(record("c")).unwrap();
        assert!(writer.push(record("d")).is_err());
        assert_eq!(writer.stats().records_written, 2);
        assert_eq!(writer.pending(), 2);
        drop(writer);

        assert_eq!(store.batches, vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_abandon_discards_pending() {
        let mut store = RecordingStore::default();
        let mut writer = BatchWriter::new(&mut store, ConflictPolicy::Ignore, 3);
        for title in ["a", "b", "c", "d"] {
            writer.push(record(title)).unwrap();
        }
        let stats = writer.abandon();

        assert_eq!(stats.records_written, 3);
        assert_eq!(store.count().unwrap(), 3);
    }
}

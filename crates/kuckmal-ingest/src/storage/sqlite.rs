//! SQLite-backed [`MediaStore`]

use kuckmal_common::{MediaRecord, RecordKey};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info};

use super::schema::{upsert_sql, COLUMNS, CREATE_SCHEMA};
use super::{ConflictPolicy, MediaStore, StorageError};

/// Media store over a single SQLite connection
pub struct SqliteMediaStore {
    conn: Connection,
}

impl SqliteMediaStore {
    /// Open (or create) a database file and ensure the schema exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        // query_row: journal_mode returns the resulting mode
        let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;

        let store = Self::with_connection(conn)?;
        info!(path = %path.display(), journal_mode = %mode, "Opened media store");
        Ok(store)
    }

    /// In-memory database, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(CREATE_SCHEMA)?;
        debug!("Media store schema initialized");
        Ok(Self { conn })
    }

    /// Underlying connection, for read-side collaborators
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Look up one record by its identity
    pub fn find(&self, key: &RecordKey) -> Result<Option<MediaRecord>, StorageError> {
        let sql = format!(
            "SELECT {} FROM media_entries WHERE channel = ?1 AND theme = ?2 AND title = ?3",
            COLUMNS
        );
        let record = self
            .conn
            .query_row(&sql, params![key.channel, key.theme, key.title], record_from_row)
            .optional()?;
        Ok(record)
    }

    /// All records ordered by key
    pub fn records(&self) -> Result<Vec<MediaRecord>, StorageError> {
        let sql = format!(
            "SELECT {} FROM media_entries ORDER BY channel, theme, title",
            COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map([], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

impl MediaStore for SqliteMediaStore {
    fn upsert_batch(
        &mut self,
        records: &[MediaRecord],
        policy: ConflictPolicy,
    ) -> Result<usize, StorageError> {
        if records.is_empty() {
            return Ok(0);
        }

        // Dropping the transaction on an early return rolls it back
        let tx = self.conn.transaction()?;
        let mut affected = 0;
        {
            let mut stmt = tx.prepare_cached(&upsert_sql(policy))?;
            for record in records {
                affected += stmt.execute(params![
                    record.channel,
                    record.theme,
                    record.title,
                    record.date,
                    record.time,
                    record.duration,
                    record.size_mb,
                    record.description,
                    record.url,
                    record.website,
                    record.subtitle_url,
                    record.small_url,
                    record.hd_url,
                    record.timestamp,
                    record.geo,
                    record.is_new,
                ])?;
            }
        }
        tx.commit()?;

        Ok(affected)
    }

    fn clear(&mut self) -> Result<usize, StorageError> {
        let removed = self.conn.execute("DELETE FROM media_entries", [])?;
        info!(removed, "Cleared media store");
        Ok(removed)
    }

    fn count(&self) -> Result<u64, StorageError> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM media_entries", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<MediaRecord> {
    Ok(MediaRecord {
        channel: row.get(0)?,
        theme: row.get(1)?,
        title: row.get(2)?,
        date: row.get(3)?,
        time: row.get(4)?,
        duration: row.get(5)?,
        size_mb: row.get(6)?,
        description: row.get(7)?,
        url: row.get(8)?,
        website: row.get(9)?,
        subtitle_url: row.get(10)?,
        small_url: row.get(11)?,
        hd_url: row.get(12)?,
        timestamp: row.get(13)?,
        geo: row.get(14)?,
        is_new: row.get(15)?,
    })
}

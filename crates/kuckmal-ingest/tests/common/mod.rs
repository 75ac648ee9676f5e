//! Shared fixtures for kuckmal-ingest integration tests
//!
//! - [`FeedBuilder`] writes Filmliste documents record by record
//! - `write_xz` / `write_gzip` compress them the way the feed is published
//! - [`Workspace`] bundles a temp dir, a file-backed store and a config

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use flate2::write::GzEncoder;
use flate2::Compression;
use kuckmal_ingest::{IngestConfig, SqliteMediaStore};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use xz2::write::XzEncoder;

/// Builds a Filmliste document
#[derive(Debug, Default)]
pub struct FeedBuilder {
    records: Vec<String>,
}

impl FeedBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record of string tokens
    pub fn record(mut self, tokens: &[&str]) -> Self {
        let body = tokens
            .iter()
            .map(|t| format!("\"{}\"", escape(t)))
            .collect::<Vec<_>>()
            .join(",");
        self.records.push(format!("\"X\":[{}]", body));
        self
    }

    /// Append a record written verbatim between the brackets
    pub fn raw_record(mut self, body: &str) -> Self {
        self.records.push(format!("\"X\":[{}]", body));
        self
    }

    /// Append a full 20-position record
    pub fn entry(self, channel: &str, theme: &str, title: &str, description: &str) -> Self {
        let tokens = entry_tokens(channel, theme, title, description);
        let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
        self.record(&refs)
    }

    pub fn build(&self) -> String {
        let mut doc = String::from(
            "{\"Filmliste\":[\"18.01.2026, 06:12\",\"18.01.2026, 05:12\",\"3\",\"MSearch\",\"abc\"],\n\
             \"Filmliste\":[\"Sender\",\"Thema\",\"Titel\",\"Datum\",\"Zeit\",\"Dauer\"],\n",
        );
        doc.push_str(&self.records.join(",\n"));
        doc.push('}');
        doc
    }
}

/// Tokens of a complete record with deterministic filler values
pub fn entry_tokens(channel: &str, theme: &str, title: &str, description: &str) -> Vec<String> {
    vec![
        channel.to_string(),
        theme.to_string(),
        title.to_string(),
        "18.01.2026".to_string(),
        "20:15:00".to_string(),
        "00:45:00".to_string(),
        "420".to_string(),
        description.to_string(),
        "https://example.com/video/stream.mp4".to_string(),
        "https://example.com/sendung".to_string(),
        String::new(),
        String::new(),
        "26|small.mp4".to_string(),
        String::new(),
        "26|hd.mp4".to_string(),
        String::new(),
        "1768763700".to_string(),
        String::new(),
        "DE".to_string(),
        "false".to_string(),
    ]
}

/// Escape a value the way the feed does
pub fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

pub fn write_xz(path: &Path, text: &str) {
    let mut encoder = XzEncoder::new(File::create(path).unwrap(), 6);
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap();
}

pub fn write_gzip(path: &Path, text: &str) {
    let mut encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap();
}

/// Scratch directory with a database path and work dir
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn database_path(&self) -> PathBuf {
        self.path("kuckmal.db")
    }

    pub fn work_dir(&self) -> PathBuf {
        self.path("work")
    }

    pub fn config(&self, batch_size: usize) -> IngestConfig {
        IngestConfig::default()
            .with_database_path(self.database_path())
            .with_work_dir(self.work_dir())
            .with_batch_size(batch_size)
    }

    pub fn open_store(&self) -> SqliteMediaStore {
        SqliteMediaStore::open(self.database_path()).unwrap()
    }

    /// Write `feed` xz-compressed under `name`
    pub fn xz_feed(&self, name: &str, feed: &str) -> PathBuf {
        let path = self.path(name);
        write_xz(&path, feed);
        path
    }

    /// Write `feed` uncompressed under `name`
    pub fn plain_feed(&self, name: &str, feed: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, feed).unwrap();
        path
    }

    /// Files left in the work dir
    pub fn work_files(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(self.work_dir()) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

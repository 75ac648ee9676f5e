//! Shared domain types
//!
//! [`MediaRecord`] is the unit of storage and exchange. Its identity is the
//! `(channel, theme, title)` triple, exposed as [`RecordKey`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::KuckmalError;

/// A single broadcast catalog entry
///
/// Text fields default to empty strings, `timestamp` to 0 and `is_new` to
/// false. `small_url` and `hd_url` may hold pipe-encoded relative references
/// (`"<offset>|<suffix>"`) that are resolved against `url` on read, see
/// [`crate::url::resolve_urls`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    pub channel: String,
    pub theme: String,
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default, rename = "sizeMB")]
    pub size_mb: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub subtitle_url: String,
    #[serde(default)]
    pub small_url: String,
    #[serde(default)]
    pub hd_url: String,
    /// Broadcast time in seconds since the Unix epoch
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub geo: String,
    #[serde(default)]
    pub is_new: bool,
}

impl MediaRecord {
    /// Identity of this record
    pub fn key(&self) -> RecordKey {
        RecordKey {
            channel: self.channel.clone(),
            theme: self.theme.clone(),
            title: self.title.clone(),
        }
    }
}

/// Unique identity of a [`MediaRecord`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub channel: String,
    pub theme: String,
    pub title: String,
}

impl RecordKey {
    pub fn new(
        channel: impl Into<String>,
        theme: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            theme: theme.into(),
            title: title.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.channel, self.theme, self.title)
    }
}

/// How an import run treats records that already exist in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Replace-all ingestion into a cleared store; first duplicate wins
    #[default]
    Full,
    /// Incremental ingestion over existing data; last duplicate wins
    Diff,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Full => "full",
            ImportMode::Diff => "diff",
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportMode {
    type Err = KuckmalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" | "akt" => Ok(ImportMode::Full),
            "diff" => Ok(ImportMode::Diff),
            other => Err(KuckmalError::InvalidImportMode(other.to_string())),
        }
    }
}

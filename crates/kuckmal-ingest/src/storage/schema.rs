//! SQL for the `media_entries` table

use super::ConflictPolicy;

/// Idempotent schema creation
pub const CREATE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS media_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    channel TEXT NOT NULL,
    theme TEXT NOT NULL,
    title TEXT NOT NULL,
    date TEXT NOT NULL DEFAULT '',
    time TEXT NOT NULL DEFAULT '',
    duration TEXT NOT NULL DEFAULT '',
    size_mb TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    url TEXT NOT NULL DEFAULT '',
    website TEXT NOT NULL DEFAULT '',
    subtitle_url TEXT NOT NULL DEFAULT '',
    small_url TEXT NOT NULL DEFAULT '',
    hd_url TEXT NOT NULL DEFAULT '',
    timestamp INTEGER NOT NULL DEFAULT 0,
    geo TEXT NOT NULL DEFAULT '',
    is_new INTEGER NOT NULL DEFAULT 0
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_media_entries_key
    ON media_entries(channel, theme, title);
CREATE INDEX IF NOT EXISTS idx_media_entries_channel ON media_entries(channel);
CREATE INDEX IF NOT EXISTS idx_media_entries_theme ON media_entries(theme);
CREATE INDEX IF NOT EXISTS idx_media_entries_channel_theme
    ON media_entries(channel, theme);
CREATE INDEX IF NOT EXISTS idx_media_entries_timestamp ON media_entries(timestamp);
"#;

/// Column list in bind order, shared by inserts and selects
pub const COLUMNS: &str = "channel, theme, title, date, time, duration, size_mb, \
     description, url, website, subtitle_url, small_url, hd_url, timestamp, geo, is_new";

const INSERT_PREFIX: &str = "INSERT INTO media_entries (channel, theme, title, date, time, \
     duration, size_mb, description, url, website, subtitle_url, small_url, hd_url, \
     timestamp, geo, is_new) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16) \
     ON CONFLICT(channel, theme, title) ";

/// Upsert statement for a conflict policy
pub fn upsert_sql(policy: ConflictPolicy) -> String {
    match policy {
        ConflictPolicy::Ignore => format!("{}DO NOTHING", INSERT_PREFIX),
        ConflictPolicy::Update => format!(
            "{}DO UPDATE SET \
             date = excluded.date, \
             time = excluded.time, \
             duration = excluded.duration, \
             size_mb = excluded.size_mb, \
             description = excluded.description, \
             url = excluded.url, \
             website = excluded.website, \
             subtitle_url = excluded.subtitle_url, \
             small_url = excluded.small_url, \
             hd_url = excluded.hd_url, \
             timestamp = excluded.timestamp, \
             geo = excluded.geo, \
             is_new = excluded.is_new",
            INSERT_PREFIX
        ),
    }
}

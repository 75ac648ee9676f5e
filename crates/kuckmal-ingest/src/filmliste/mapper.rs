//! Positional token to [`MediaRecord`] mapping

use kuckmal_common::MediaRecord;
use std::borrow::Cow;

/// Token positions in a Filmliste record
///
/// 11, 13, 15 and 17 carry RTMP and history URLs, which are not stored.
pub mod index {
    pub const CHANNEL: usize = 0;
    pub const THEME: usize = 1;
    pub const TITLE: usize = 2;
    pub const DATE: usize = 3;
    pub const TIME: usize = 4;
    pub const DURATION: usize = 5;
    pub const SIZE_MB: usize = 6;
    pub const DESCRIPTION: usize = 7;
    pub const URL: usize = 8;
    pub const WEBSITE: usize = 9;
    pub const SUBTITLE_URL: usize = 10;
    pub const SMALL_URL: usize = 12;
    pub const HD_URL: usize = 14;
    pub const TIMESTAMP: usize = 16;
    pub const GEO: usize = 18;
    pub const IS_NEW: usize = 19;
}

/// Build a record from its resolved channel/theme and raw tokens
///
/// Missing positions take the field default.
pub fn map_record(channel: &str, theme: &str, tokens: &[Cow<'_, str>]) -> MediaRecord {
    MediaRecord {
        channel: channel.to_string(),
        theme: theme.to_string(),
        title: text(tokens, index::TITLE),
        date: text(tokens, index::DATE),
        time: text(tokens, index::TIME),
        duration: text(tokens, index::DURATION),
        size_mb: text(tokens, index::SIZE_MB),
        description: text(tokens, index::DESCRIPTION),
        url: text(tokens, index::URL),
        website: text(tokens, index::WEBSITE),
        subtitle_url: text(tokens, index::SUBTITLE_URL),
        small_url: text(tokens, index::SMALL_URL),
        hd_url: text(tokens, index::HD_URL),
        timestamp: parse_timestamp(token(tokens, index::TIMESTAMP)),
        geo: text(tokens, index::GEO),
        is_new: parse_flag(token(tokens, index::IS_NEW)),
    }
}

fn token<'t>(tokens: &'t [Cow<'_, str>], idx: usize) -> &'t str {
    tokens.get(idx).map_or("", |t| t.as_ref())
}

fn text(tokens: &[Cow<'_, str>], idx: usize) -> String {
    token(tokens, idx).to_string()
}

/// Base-10 seconds; anything unparseable is 0
pub fn parse_timestamp(token: &str) -> i64 {
    token.trim().parse().unwrap_or(0)
}

/// True only for a case-insensitive "true"
pub fn parse_flag(token: &str) -> bool {
    token.eq_ignore_ascii_case("true")
}

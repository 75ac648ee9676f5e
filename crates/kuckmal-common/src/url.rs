//! Pipe-encoded URL reconstruction
//!
//! The feed stores the small and HD variants of a video as references relative
//! to the record's main `url`: `"<offset>|<suffix>"` means "keep the first
//! `offset` characters of `url`, then append `suffix`".
//!
//! Reconstruction happens on read; records are stored with the encoded form.

use crate::types::MediaRecord;

/// Reconstruct an absolute URL from a pipe-encoded relative reference
///
/// Returns `relative` unchanged when it is empty, has no `|`, carries a
/// non-numeric offset, or the offset is not in `1..=base.chars().count()`.
/// Offsets count characters, not bytes.
///
/// # Example
///
/// ```
/// use kuckmal_common::url::reconstruct_url;
///
/// let base = "https://example.com/video/stream.mp4";
/// assert_eq!(
///     reconstruct_url(base, "26|hd_stream.mp4"),
///     "https://example.com/video/hd_stream.mp4"
/// );
/// assert_eq!(reconstruct_url(base, "plain.mp4"), "plain.mp4");
/// ```
pub fn reconstruct_url(base: &str, relative: &str) -> String {
    let Some((offset, suffix)) = relative.split_once('|') else {
        return relative.to_string();
    };

    let Ok(offset) = offset.trim().parse::<i64>() else {
        return relative.to_string();
    };

    let base_len = base.chars().count() as i64;
    if offset <= 0 || offset > base_len {
        return relative.to_string();
    }

    let cut = base
        .char_indices()
        .nth(offset as usize)
        .map_or(base.len(), |(idx, _)| idx);

    let mut absolute = String::with_capacity(cut + suffix.len());
    absolute.push_str(&base[..cut]);
    absolute.push_str(suffix);
    absolute
}

/// Trim surrounding whitespace from a URL
pub fn clean_url(url: &str) -> String {
    url.trim().to_string()
}

/// Copy of `record` with `small_url` and `hd_url` reconstructed against `url`
pub fn resolve_urls(record: &MediaRecord) -> MediaRecord {
    let mut resolved = record.clone();

    if !resolved.small_url.is_empty() {
        resolved.small_url = reconstruct_url(&record.url, &record.small_url);
    }
    if !resolved.hd_url.is_empty() {
        resolved.hd_url = reconstruct_url(&record.url, &record.hd_url);
    }

    resolved
}

/// Best playable URL of a record: HD, then normal, then small
pub fn best_quality_url(record: &MediaRecord) -> String {
    let resolved = resolve_urls(record);

    [resolved.hd_url, resolved.url, resolved.small_url]
        .into_iter()
        .find(|candidate| !candidate.is_empty())
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BASE: &str = "https://example.com/video/stream.mp4";

    fn record(url: &str, small: &str, hd: &str) -> MediaRecord {
        MediaRecord {
            channel: "ARD".to_string(),
            theme: "Doku".to_string(),
            title: "Film".to_string(),
            url: url.to_string(),
            small_url: small.to_string(),
            hd_url: hd.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_reconstruct_keeps_prefix_and_appends_suffix() {
        assert_eq!(
            reconstruct_url(BASE, "26|hd_stream.mp4"),
            "https://example.com/video/hd_stream.mp4"
        );
        // 23 characters keep "https://example.com/vid"
        assert_eq!(
            reconstruct_url(BASE, "23|hd_stream.mp4"),
            "https://example.com/vidhd_stream.mp4"
        );
    }

    #[test]
    fn test_reconstruct_full_length_offset() {
        let len = BASE.len();
        assert_eq!(reconstruct_url(BASE, &format!("{}|?hd=1", len)), format!("{}?hd=1", BASE));
    }

    #[test]
    fn test_reconstruct_fallbacks() {
        assert_eq!(reconstruct_url(BASE, ""), "");
        assert_eq!(reconstruct_url(BASE, "hd_stream.mp4"), "hd_stream.mp4");
        assert_eq!(reconstruct_url(BASE, "0|x.mp4"), "0|x.mp4");
        assert_eq!(reconstruct_url(BASE, "-3|x.mp4"), "-3|x.mp4");
        assert_eq!(reconstruct_url(BASE, "999|x.mp4"), "999|x.mp4");
        assert_eq!(reconstruct_url(BASE, "abc|x.mp4"), "abc|x.mp4");
        assert_eq!(reconstruct_url("", "5|x.mp4"), "5|x.mp4");
    }

    #[test]
    fn test_reconstruct_splits_on_first_pipe_only() {
        assert_eq!(reconstruct_url(BASE, "8|a|b"), "https://a|b");
    }

    #[test]
    fn test_reconstruct_counts_characters() {
        let base = "https://example.com/München/film.mp4";
        // "https://example.com/München/" is 28 characters but 29 bytes
        assert_eq!(
            reconstruct_url(base, "28|film_hd.mp4"),
            "https://example.com/München/film_hd.mp4"
        );
    }

    #[test]
    fn test_resolve_urls() {
        let resolved = resolve_urls(&record(BASE, "26|small.mp4", "26|hd.mp4"));
        assert_eq!(resolved.small_url, "https://example.com/video/small.mp4");
        assert_eq!(resolved.hd_url, "https://example.com/video/hd.mp4");
        assert_eq!(resolved.url, BASE);

        let untouched = resolve_urls(&record(BASE, "", ""));
        assert_eq!(untouched.small_url, "");
        assert_eq!(untouched.hd_url, "");
    }

    #[test]
    fn test_best_quality_url() {
        assert_eq!(
            best_quality_url(&record(BASE, "26|small.mp4", "26|hd.mp4")),
            "https://example.com/video/hd.mp4"
        );
        assert_eq!(best_quality_url(&record(BASE, "26|small.mp4", "")), BASE);
        assert_eq!(best_quality_url(&record("", "https://x/s.mp4", "")), "https://x/s.mp4");
        assert_eq!(best_quality_url(&record("", "", "")), "");
    }

    #[test]
    fn test_clean_url() {
        assert_eq!(clean_url("  https://example.com/a \n"), "https://example.com/a");
        assert_eq!(clean_url(""), "");
    }

    proptest! {
        #[test]
        fn prop_relative_without_pipe_is_unchanged(relative in "[^|]{0,40}") {
            prop_assert_eq!(reconstruct_url(BASE, &relative), relative);
        }

        #[test]
        fn prop_valid_offset_keeps_prefix(offset in 1usize..=36, suffix in "[a-z_./]{0,20}") {
            let relative = format!("{}|{}", offset, suffix);
            let expected = format!("{}{}", &BASE[..offset], suffix);
            prop_assert_eq!(reconstruct_url(BASE, &relative), expected);
        }
    }
}

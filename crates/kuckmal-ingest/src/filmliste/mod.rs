//! Filmliste feed parsing
//!
//! Scanning, inheritance and mapping are separate steps so each can be tested
//! on its own; [`FilmlisteParser`] chains them for a whole feed.
//!
//! # Example
//!
//! ```
//! use kuckmal_ingest::filmliste::FilmlisteParser;
//!
//! let feed = r#"{"X":["ARD","Tatort","Folge 1"],"X":["","","Folge 2"]}"#;
//! let titles: Vec<_> = FilmlisteParser::new(feed).map(|r| r.title).collect();
//! assert_eq!(titles, ["Folge 1", "Folge 2"]);
//! ```

pub mod inheritance;
pub mod mapper;
pub mod scanner;

use kuckmal_common::MediaRecord;
use serde::Serialize;

pub use inheritance::InheritanceContext;
pub use mapper::map_record;
pub use scanner::RecordScanner;

use mapper::index;

/// Counters for one parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    /// Records with at least three tokens
    pub records_scanned: u64,
    /// Records dropped because channel or theme stayed empty
    pub records_dropped: u64,
    /// Records skipped for having fewer than three tokens
    pub short_records: u64,
}

/// Scanner, inheritance and mapper over one decompressed feed
#[derive(Debug)]
pub struct FilmlisteParser<'a> {
    scanner: RecordScanner<'a>,
    context: InheritanceContext,
    records_scanned: u64,
    records_dropped: u64,
}

impl<'a> FilmlisteParser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            scanner: RecordScanner::new(input),
            context: InheritanceContext::new(),
            records_scanned: 0,
            records_dropped: 0,
        }
    }

    /// Advance by one scanned record
    ///
    /// `None` at end of feed, `Some(None)` for a record dropped as noise.
    pub fn next_scanned(&mut self) -> Option<Option<MediaRecord>> {
        let tokens = self.scanner.next()?;
        self.records_scanned += 1;

        let channel = tokens.get(index::CHANNEL).map_or("", |t| t.as_ref());
        let theme = tokens.get(index::THEME).map_or("", |t| t.as_ref());

        match self.context.resolve(channel, theme) {
            Some((channel, theme)) => Some(Some(map_record(channel, theme, &tokens))),
            None => {
                self.records_dropped += 1;
                Some(None)
            }
        }
    }

    /// Byte offset reached in the input
    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    pub fn input_len(&self) -> usize {
        self.scanner.input_len()
    }

    pub fn stats(&self) -> ParseStats {
        ParseStats {
            records_scanned: self.records_scanned,
            records_dropped: self.records_dropped,
            short_records: self.scanner.short_records(),
        }
    }
}

impl Iterator for FilmlisteParser<'_> {
    type Item = MediaRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.next_scanned()? {
                return Some(record);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_chains_stages() {
        let feed = r#"{"Filmliste":["x","y","z"],
            "X":["","","orphan"],
            "X":["ARD","Doku","one","d","t","dur","10","desc","https://a/b.mp4"],
            "X":["","","two"],
            "X":["ARD"],
            "X":["ZDF","","three"]}"#;

        let mut parser = FilmlisteParser::new(feed);
        let records: Vec<_> = parser.by_ref().collect();

        let keys: Vec<_> = records
            .iter()
            .map(|r| (r.channel.as_str(), r.theme.as_str(), r.title.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![("ARD", "Doku", "one"), ("ARD", "Doku", "two"), ("ZDF", "Doku", "three")]
        );
        assert_eq!(records[0].url, "https://a/b.mp4");

        assert_eq!(
            parser.stats(),
            ParseStats {
                records_scanned: 4,
                records_dropped: 1,
                short_records: 1,
            }
        );
        assert_eq!(parser.position(), parser.input_len());
    }

    #[test]
    fn test_next_scanned_reports_drops() {
        let mut parser = FilmlisteParser::new(r#""X":["","","a"],"X":["C","T","b"]"#);
        assert_eq!(parser.next_scanned(), Some(None));
        assert_eq!(parser.next_scanned().unwrap().unwrap().title, "b");
        assert_eq!(parser.next_scanned(), None);
    }
}

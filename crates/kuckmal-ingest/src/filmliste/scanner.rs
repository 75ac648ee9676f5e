//! Record scanner for the Filmliste grammar
//!
//! The feed looks like JSON but repeats the key `"X"` once per record, so it
//! cannot go through a JSON parser. Instead this scanner walks the buffer once,
//! finds every `"X": [ ... ]` array and splits its body into raw tokens:
//!
//! - runs of whitespace and commas separate tokens
//! - a token starting with `"` is a string; `\` escapes the next character;
//!   `\"` and `\\` are unescaped, other escape pairs are kept as written
//! - any other token (number, `true`, `null`) is reported as an empty string
//! - the body ends at the first `]` outside a string
//!
//! Records with fewer than [`MIN_TOKENS`] tokens are skipped and counted.

use std::borrow::Cow;

/// Channel, theme and title are the minimum for a usable record
pub const MIN_TOKENS: usize = 3;

const MARKER: &[u8] = b"\"X\"";

/// Raw tokens of one record, borrowed from the input where possible
pub type Tokens<'a> = Vec<Cow<'a, str>>;

/// Iterator over the records of a decompressed feed
#[derive(Debug)]
pub struct RecordScanner<'a> {
    input: &'a str,
    pos: usize,
    short_records: u64,
}

impl<'a> RecordScanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            short_records: 0,
        }
    }

    /// Byte offset the scanner has reached
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn input_len(&self) -> usize {
        self.input.len()
    }

    /// Records skipped for having fewer than [`MIN_TOKENS`] tokens
    pub fn short_records(&self) -> u64 {
        self.short_records
    }

    /// Position just past the `[` of the next record marker
    fn find_record_start(&mut self) -> Option<usize> {
        let bytes = self.input.as_bytes();

        while self.pos < bytes.len() {
            let Some(found) = find_subslice(&bytes[self.pos..], MARKER) else {
                self.pos = bytes.len();
                return None;
            };
            let marker = self.pos + found;

            let mut i = skip_whitespace(bytes, marker + MARKER.len());
            if bytes.get(i) == Some(&b':') {
                i = skip_whitespace(bytes, i + 1);
                if bytes.get(i) == Some(&b'[') {
                    return Some(i + 1);
                }
            }

            // `"X"` not followed by `: [`; keep looking past its opening quote
            self.pos = marker + 1;
        }

        None
    }

    /// Tokenise a record body starting at `start`
    ///
    /// Returns the tokens and the position after the closing `]`, or `None`
    /// when the input ends before the body does.
    fn read_body(&self, start: usize) -> Option<(Tokens<'a>, usize)> {
        let bytes = self.input.as_bytes();
        let mut tokens = Vec::new();
        let mut i = start;

        loop {
            while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b',') {
                i += 1;
            }

            match bytes.get(i)? {
                b']' => return Some((tokens, i + 1)),
                b'"' => {
                    let end = closing_quote(bytes, i + 1)?;
                    tokens.push(unescape(&self.input[i + 1..end]));
                    i = end + 1;
                }
                _ => {
                    while i < bytes.len() && bytes[i] != b',' && bytes[i] != b']' {
                        i += 1;
                    }
                    tokens.push(Cow::Borrowed(""));
                }
            }
        }
    }
}

impl<'a> Iterator for RecordScanner<'a> {
    type Item = Tokens<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let start = self.find_record_start()?;

            let Some((tokens, end)) = self.read_body(start) else {
                // unterminated record at end of input
                self.pos = self.input.len();
                return None;
            };
            self.pos = end;

            if tokens.len() < MIN_TOKENS {
                self.short_records += 1;
                continue;
            }
            return Some(tokens);
        }
    }
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Index of the unescaped `"` closing a string whose content starts at `i`
fn closing_quote(bytes: &[u8], mut i: usize) -> Option<usize> {
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Replace `\"` with `"` and `\\` with `\`; other pairs are kept verbatim
pub fn unescape(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\\') {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    Cow::Owned(out)
}

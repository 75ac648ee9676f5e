//! Decompression stage
//!
//! Copies a compressed feed into a plain-text intermediate file, one chunk at
//! a time, polling the cancellation flag after every chunk.
//!
//! # Supported Formats
//!
//! - **XZ** (`Filmliste-akt.xz`, `Filmliste-diff.xz`): using xz2, multi-stream
//! - **Gzip**: using flate2, multi-member
//!
//! The format is detected from the magic bytes, not the file extension.
//!
//! On cancellation or failure the partially written output stays on disk.
//! Whoever owns the intermediate must remove it before retrying.

use flate2::read::MultiGzDecoder;
use std::cell::Cell;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;
use tracing::{debug, info};
use xz2::read::XzDecoder;

use crate::error::{IngestError, Result};
use crate::status::CancellationFlag;

const XZ_MAGIC: [u8; 6] = [0xFD, b'7', b'z', b'X', b'Z', 0x00];
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Compression format of a feed file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    Xz,
    Gzip,
}

impl CompressionFormat {
    /// Detect the format from the leading bytes of a file
    pub fn detect(header: &[u8]) -> Option<Self> {
        if header.starts_with(&XZ_MAGIC) {
            Some(CompressionFormat::Xz)
        } else if header.starts_with(&GZIP_MAGIC) {
            Some(CompressionFormat::Gzip)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CompressionFormat::Xz => "xz",
            CompressionFormat::Gzip => "gzip",
        }
    }
}

/// Progress of a decompression in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecompressProgress {
    /// Compressed bytes consumed so far
    pub bytes_read: u64,
    /// Size of the compressed input
    pub total_bytes: u64,
    /// Decompressed bytes written so far
    pub bytes_written: u64,
}

impl DecompressProgress {
    /// Share of the compressed input consumed, 0-100
    pub fn percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 100;
        }
        (self.bytes_read.saturating_mul(100) / self.total_bytes).min(100) as u8
    }
}

/// Outcome of a completed decompression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecompressionStats {
    pub format: CompressionFormat,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub chunks: u64,
}

/// Counts bytes pulled from the compressed source
struct CountingReader<'a, R> {
    inner: R,
    count: &'a Cell<u64>,
}

impl<R: Read> Read for CountingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count.set(self.count.get() + n as u64);
        Ok(n)
    }
}

/// Decompress `source` into `dest`
///
/// `on_progress` is called after every chunk is written. The cancellation
/// flag is checked right after it; a cancelled run returns
/// [`IngestError::Cancelled`] and leaves the partial output in place.
pub fn decompress_file<F>(
    source: &Path,
    dest: &Path,
    chunk_size: usize,
    cancel: &CancellationFlag,
    mut on_progress: F,
) -> Result<DecompressionStats>
where
    F: FnMut(DecompressProgress),
{
    let input = File::open(source)?;
    let total_bytes = input.metadata()?.len();
    let mut input = BufReader::new(input);

    let format = {
        let header = input.fill_buf()?;
        if header.is_empty() {
            return Err(IngestError::UnsupportedFormat(format!(
                "{} is empty",
                source.display()
            )));
        }
        CompressionFormat::detect(header).ok_or_else(|| {
            IngestError::UnsupportedFormat(format!(
                "{} is neither xz nor gzip",
                source.display()
            ))
        })?
    };

    info!(
        source = %source.display(),
        dest = %dest.display(),
        format = format.as_str(),
        compressed_bytes = total_bytes,
        "Decompressing feed"
    );

    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut output = BufWriter::new(File::create(dest)?);

    let bytes_read = Cell::new(0u64);
    let counting = CountingReader {
        inner: input,
        count: &bytes_read,
    };
    let mut decoder: Box<dyn Read + '_> = match format {
        CompressionFormat::Xz => Box::new(XzDecoder::new_multi_decoder(counting)),
        CompressionFormat::Gzip => Box::new(MultiGzDecoder::new(counting)),
    };

    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut bytes_written = 0u64;
    let mut chunks = 0u64;

    loop {
        let n = match decoder.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(IngestError::Decompression(format!(
                    "{} stream is corrupt: {}",
                    format.as_str(),
                    e
                )))
            }
        };

        output.write_all(&buf[..n])?;
        bytes_written += n as u64;
        chunks += 1;

        on_progress(DecompressProgress {
            bytes_read: bytes_read.get(),
            total_bytes,
            bytes_written,
        });

        if cancel.is_cancelled() {
            output.flush()?;
            info!(bytes_written, "Decompression cancelled, partial output left on disk");
            return Err(IngestError::Cancelled);
        }
    }

    output.flush()?;
    drop(decoder);

    let stats = DecompressionStats {
        format,
        bytes_read: bytes_read.get(),
        bytes_written,
        chunks,
    };
    debug!(
        "Decompressed {} -> {} bytes in {} chunks",
        stats.bytes_read, stats.bytes_written, stats.chunks
    );
    Ok(stats)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;
    use xz2::write::XzEncoder;

    fn sample_text() -> String {
        (0..2000)
            .map(|i| format!("\"X\":[\"ARD\",\"Thema\",\"Titel {}\"],\n", i))
            .collect()
    }

    fn write_xz(path: &Path, data: &[u8]) {
        let mut encoder = XzEncoder::new(File::create(path).unwrap(), 6);
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap();
    }

    fn write_gzip(path: &Path, data: &[u8]) {
        let mut encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap();
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(
            CompressionFormat::detect(&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00, 0x00]),
            Some(CompressionFormat::Xz)
        );
        assert_eq!(CompressionFormat::detect(&[0x1F, 0x8B, 0x08]), Some(CompressionFormat::Gzip));
        assert_eq!(CompressionFormat::detect(b"{\"Filmliste\""), None);
        assert_eq!(CompressionFormat::detect(&[0xFD, 0x37]), None);
    }

    #[test]
    fn test_decompress_xz() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("Filmliste-akt.xz");
        let dest = dir.path().join("out").join("filmliste.json");
        let text = sample_text();
        write_xz(&source, text.as_bytes());

        let mut calls = 0;
        let stats = decompress_file(&source, &dest, 1024, &CancellationFlag::new(), |_| calls += 1)
            .unwrap();

        assert_eq!(stats.format, CompressionFormat::Xz);
        assert_eq!(stats.bytes_written, text.len() as u64);
        assert_eq!(stats.bytes_read, std::fs::metadata(&source).unwrap().len());
        assert_eq!(calls as u64, stats.chunks);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), text);
    }

    #[test]
    fn test_decompress_multi_member_gzip() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a.gz");
        let second = dir.path().join("b.gz");
        write_gzip(&first, b"first half,");
        write_gzip(&second, b"second half");

        let source = dir.path().join("joined.gz");
        let mut joined = std::fs::read(&first).unwrap();
        joined.extend(std::fs::read(&second).unwrap());
        std::fs::write(&source, joined).unwrap();

        let dest = dir.path().join("out.json");
        let stats = decompress_file(&source, &dest, 8192, &CancellationFlag::new(), |_| {}).unwrap();

        assert_eq!(stats.format, CompressionFormat::Gzip);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "first half,second half");
    }

    #[test]
    fn test_progress_is_monotonic() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("feed.xz");
        let text = sample_text();
        write_xz(&source, text.as_bytes());

        let mut last = None;
        decompress_file(&source, &dir.path().join("out"), 512, &CancellationFlag::new(), |p| {
            if let Some(DecompressProgress { bytes_written, .. }) = last {
                assert!(p.bytes_written > bytes_written);
            }
            last = Some(p);
        })
        .unwrap();

        let last = last.unwrap();
        assert_eq!(last.bytes_written, text.len() as u64);
        assert!(last.percent() <= 100);
    }

    #[test]
    fn test_unsupported_and_empty_input() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("plain.json");
        std::fs::write(&plain, "{\"X\":[]}").unwrap();
        let empty = dir.path().join("empty.xz");
        std::fs::write(&empty, b"").unwrap();

        let flag = CancellationFlag::new();
        let out = dir.path().join("out");
        assert!(matches!(
            decompress_file(&plain, &out, 8192, &flag, |_| {}),
            Err(IngestError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            decompress_file(&empty, &out, 8192, &flag, |_| {}),
            Err(IngestError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_corrupt_stream_is_decompression_error() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("corrupt.xz");
        let mut bytes = XZ_MAGIC.to_vec();
        bytes.extend(std::iter::repeat(0xAB).take(256));
        std::fs::write(&source, bytes).unwrap();

        let result = decompress_file(
            &source,
            &dir.path().join("out"),
            8192,
            &CancellationFlag::new(),
            |_| {},
        );
        assert!(matches!(result, Err(IngestError::Decompression(_))));
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = decompress_file(
            &dir.path().join("missing.xz"),
            &dir.path().join("out"),
            8192,
            &CancellationFlag::new(),
            |_| {},
        );
        assert!(matches!(result, Err(IngestError::Io(_))));
    }

    #[test]
    fn test_cancellation_leaves_partial_output() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("feed.xz");
        let dest = dir.path().join("partial.json");
        let text = sample_text();
        write_xz(&source, text.as_bytes());

        let flag = CancellationFlag::new();
        let trigger = flag.clone();
        let result = decompress_file(&source, &dest, 256, &flag, |_| trigger.cancel());

        assert!(matches!(result, Err(IngestError::Cancelled)));
        let written = std::fs::metadata(&dest).unwrap().len();
        assert!(written > 0);
        assert!(written < text.len() as u64);
    }
}

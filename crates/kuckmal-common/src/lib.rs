//! Kuckmal Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, URL handling, logging, and error handling for the Kuckmal workspace.
//!
//! # Overview
//!
//! - **Types**: [`MediaRecord`], its identity [`RecordKey`], and the [`ImportMode`] flag
//! - **URL**: reconstruction of the pipe-encoded relative URLs stored in records
//! - **Logging**: process-wide `tracing` subscriber setup
//! - **Error Handling**: [`KuckmalError`] and the crate [`Result`] alias
//!
//! # Example
//!
//! ```
//! use kuckmal_common::{url::resolve_urls, MediaRecord};
//!
//! let record = MediaRecord {
//!     channel: "ARD".to_string(),
//!     theme: "Tagesschau".to_string(),
//!     title: "Tagesschau 20:00".to_string(),
//!     url: "https://cdn.example.com/video/stream.mp4".to_string(),
//!     hd_url: "30|hd.mp4".to_string(),
//!     ..Default::default()
//! };
//!
//! let resolved = resolve_urls(&record);
//! assert_eq!(resolved.hd_url, "https://cdn.example.com/video/hd.mp4");
//! ```

pub mod error;
pub mod logging;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use error::{KuckmalError, Result};
pub use types::{ImportMode, MediaRecord, RecordKey};

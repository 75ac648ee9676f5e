//! Terminal progress for the CLI

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::status::PipelineStatus;

/// Spinner for an import whose record count is unknown up front
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg} ({pos} committed)")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// One-line summary of a status for the spinner message
pub fn describe_status(status: &PipelineStatus) -> String {
    format!(
        "{} {:>3}% | {} entries | {}",
        status.state,
        status.progress,
        status.entries_parsed,
        format_bytes(status.bytes_processed)
    )
}

/// Format bytes into a human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

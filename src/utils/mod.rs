//! Utility functions shared across the toolkit.

use anyhow::Result;
use std::path::Path;

/// Format file size in human-readable format
pub fn format_file_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{:.0} {}", size, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Ensure a directory exists
pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Total size in bytes of all files below `path`, ignoring unreadable entries.
pub fn folder_size<P: AsRef<Path>>(path: P) -> u64 {
    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}

/// Count regular files below `path`, ignoring unreadable entries.
pub fn count_files<P: AsRef<Path>>(path: P) -> usize {
    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .count()
}

/// Check if a file has a specific extension
pub fn has_extension<P: AsRef<Path>>(path: P, extension: &str) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// File size in bytes, or 0 if the file cannot be stat'd.
pub fn file_size<P: AsRef<Path>>(path: P) -> u64 {
    std::fs::metadata(path).map(|meta| meta.len()).unwrap_or(0)
}

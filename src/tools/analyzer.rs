//! Drive analyzer: disk usage breakdown under a folder.
//!
//! Each immediate child of the target folder is one work item; directories
//! are measured recursively. Largest-files and per-extension breakdowns are
//! single walks and run outside the job pipeline.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{require_selection, InputSpec, ToolAdapter, ToolKind};
use crate::job::{CancelToken, ErrorKind, InvalidInput, WorkItem, WorkPayload, WorkResult};

/// Measured size of one entry under the analyzed folder.
#[derive(Debug, Clone, Serialize)]
pub struct UsageEntry {
    pub name: String,
    pub path: PathBuf,
    pub bytes: u64,
    pub is_dir: bool,
}

/// Per-extension usage totals.
#[derive(Debug, Clone, Serialize)]
pub struct TypeUsage {
    pub extension: String,
    pub bytes: u64,
    pub count: usize,
}

/// Measure the immediate children of a folder, in parallel.
pub struct DriveAnalyzerAdapter {
    entries: Mutex<Vec<UsageEntry>>,
}

impl DriveAnalyzerAdapter {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Measured entries, largest first. Consumes the collected results.
    pub fn summary(&self) -> Vec<UsageEntry> {
        let mut entries = std::mem::take(&mut *self.entries.lock().expect("analyzer poisoned"));
        entries.sort_by_key(|e| std::cmp::Reverse(e.bytes));
        entries
    }
}

impl Default for DriveAnalyzerAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolAdapter for DriveAnalyzerAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::DriveAnalyzer
    }

    fn io_bound(&self) -> bool {
        true
    }

    fn validate(&self, input: &InputSpec) -> Result<Vec<WorkItem>> {
        require_selection(input)?;
        if input.paths.len() != 1 {
            return Err(InvalidInput("analyze exactly one folder".into()).into());
        }
        let root = &input.paths[0];
        if !root.is_dir() {
            return Err(InvalidInput(format!("{} is not a folder", root.display())).into());
        }

        let mut items = Vec::new();
        for (index, entry) in std::fs::read_dir(root)?.flatten().enumerate() {
            items.push(WorkItem::new(
                index as u64,
                WorkPayload::Path(entry.path()),
                0,
            ));
        }
        Ok(items)
    }

    fn execute(&self, item: &WorkItem, cancel: &CancelToken) -> WorkResult {
        if cancel.is_cancelled() {
            return WorkResult::cancelled(item.id);
        }
        let WorkPayload::Path(path) = &item.payload else {
            return WorkResult::failed(item.id, ErrorKind::Internal, "unexpected payload");
        };

        let is_dir = path.is_dir();
        let bytes = if is_dir {
            match measured_folder_size(path, cancel) {
                Some(bytes) => bytes,
                None => return WorkResult::cancelled(item.id),
            }
        } else {
            crate::utils::file_size(path)
        };

        self.entries
            .lock()
            .expect("analyzer poisoned")
            .push(UsageEntry {
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
                path: path.clone(),
                bytes,
                is_dir,
            });
        WorkResult::success(item.id, None, bytes)
    }
}

/// Recursive folder size with periodic cancellation checks; `None` when
/// cancelled mid-walk.
fn measured_folder_size(root: &Path, cancel: &CancelToken) -> Option<u64> {
    let mut total = 0u64;
    for (count, entry) in walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .enumerate()
    {
        if count % 256 == 0 && cancel.is_cancelled() {
            return None;
        }
        if entry.file_type().is_file() {
            total += entry.metadata().map(|m| m.len()).unwrap_or(0);
        }
    }
    Some(total)
}

/// The `count` largest files below `root`.
pub fn largest_files(root: &Path, count: usize) -> Vec<UsageEntry> {
    let mut files: Vec<UsageEntry> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|entry| {
            let bytes = entry.metadata().ok()?.len();
            Some(UsageEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path().to_path_buf(),
                bytes,
                is_dir: false,
            })
        })
        .collect();
    files.sort_by_key(|e| std::cmp::Reverse(e.bytes));
    files.truncate(count);
    files
}

/// Usage grouped by file extension, largest first.
pub fn file_type_breakdown(root: &Path) -> Vec<TypeUsage> {
    let mut by_extension: HashMap<String, (u64, usize)> = HashMap::new();
    for entry in walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let extension = entry
            .path()
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_else(|| "(no extension)".to_string());
        let bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
        let slot = by_extension.entry(extension).or_default();
        slot.0 += bytes;
        slot.1 += 1;
    }

    let mut breakdown: Vec<TypeUsage> = by_extension
        .into_iter()
        .map(|(extension, (bytes, count))| TypeUsage {
            extension,
            bytes,
            count,
        })
        .collect();
    breakdown.sort_by_key(|t| std::cmp::Reverse(t.bytes));
    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobScheduler;
    use std::sync::Arc;

    fn build_tree(dir: &Path) {
        std::fs::create_dir_all(dir.join("big")).unwrap();
        std::fs::write(dir.join("big/data.bin"), vec![0u8; 4096]).unwrap();
        std::fs::write(dir.join("small.txt"), vec![0u8; 128]).unwrap();
        std::fs::write(dir.join("other.txt"), vec![0u8; 64]).unwrap();
    }

    #[test]
    fn test_analyzer_measures_children() {
        let dir = tempfile::tempdir().unwrap();
        build_tree(dir.path());

        let adapter = Arc::new(DriveAnalyzerAdapter::new());
        let report = JobScheduler::default()
            .submit(
                Arc::clone(&adapter) as Arc<dyn ToolAdapter>,
                &InputSpec::new(vec![dir.path().to_path_buf()]),
            )
            .unwrap()
            .run(|_| {})
            .unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.bytes_processed(), 4096 + 128 + 64);

        let summary = adapter.summary();
        assert_eq!(summary[0].name, "big");
        assert!(summary[0].is_dir);
        assert_eq!(summary[0].bytes, 4096);
    }

    #[test]
    fn test_largest_files() {
        let dir = tempfile::tempdir().unwrap();
        build_tree(dir.path());

        let top = largest_files(dir.path(), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].bytes, 4096);
        assert!(top[0].bytes >= top[1].bytes);
    }

    #[test]
    fn test_type_breakdown() {
        let dir = tempfile::tempdir().unwrap();
        build_tree(dir.path());

        let breakdown = file_type_breakdown(dir.path());
        assert_eq!(breakdown[0].extension, ".bin");
        assert_eq!(breakdown[0].bytes, 4096);
        let txt = breakdown.iter().find(|t| t.extension == ".txt").unwrap();
        assert_eq!(txt.count, 2);
        assert_eq!(txt.bytes, 192);
    }

    #[test]
    fn test_rejects_multiple_roots() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = DriveAnalyzerAdapter::new();
        let error = adapter
            .validate(&InputSpec::new(vec![
                dir.path().to_path_buf(),
                dir.path().to_path_buf(),
            ]))
            .unwrap_err();
        assert!(error.downcast_ref::<InvalidInput>().is_some());
    }
}

//! Secure shredder: overwrite file content, then unlink.
//!
//! Every file is overwritten in place before deletion (zeros, then ones,
//! then random data for any further passes), which defeats simple undelete
//! tools. On flash media with wear-leveling (SSDs, SD cards) the firmware
//! may keep stale copies of old blocks, so recovery by advanced forensic
//! means cannot be ruled out there.

use anyhow::{Context, Result};
use rand::RngCore;
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use super::{require_selection, InputSpec, ToolAdapter, ToolKind};
use crate::config::ShredderConfig;
use crate::job::{
    classify_error, CancelToken, ErrorKind, InvalidInput, WorkItem, WorkPayload, WorkResult,
};

const CHUNK_SIZE: usize = 64 * 1024;

/// Overwrite-then-delete for files and folders.
pub struct SecureShredderAdapter {
    options: ShredderConfig,
    /// Folders selected by the user, emptied of files by the batch and
    /// removed afterwards via [`SecureShredderAdapter::remove_empty_dirs`].
    dirs: Mutex<Vec<PathBuf>>,
}

impl SecureShredderAdapter {
    pub fn new(options: ShredderConfig) -> Self {
        Self {
            options: ShredderConfig {
                passes: options.passes.max(1),
            },
            dirs: Mutex::new(Vec::new()),
        }
    }

    /// Remove the directory skeletons left behind once all files inside were
    /// shredded. Call after the job completes; non-empty directories (items
    /// that failed or were skipped) are left alone.
    pub fn remove_empty_dirs(&self) -> usize {
        let dirs = std::mem::take(&mut *self.dirs.lock().expect("shredder dirs poisoned"));
        let mut removed = 0;
        for root in dirs {
            let mut subdirs: Vec<PathBuf> = walkdir::WalkDir::new(&root)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_dir())
                .map(|e| e.into_path())
                .collect();
            // Deepest first so parents empty out as children disappear.
            subdirs.sort_by_key(|p| std::cmp::Reverse(p.components().count()));
            for dir in subdirs {
                if std::fs::remove_dir(&dir).is_ok() {
                    removed += 1;
                }
            }
        }
        removed
    }
}

impl ToolAdapter for SecureShredderAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::SecureShredder
    }

    fn io_bound(&self) -> bool {
        true
    }

    fn validate(&self, input: &InputSpec) -> Result<Vec<WorkItem>> {
        require_selection(input)?;
        let mut items = Vec::new();
        let mut dirs = Vec::new();
        let mut next_id = 0u64;
        for path in &input.paths {
            if path.is_file() {
                let size = crate::utils::file_size(path);
                items.push(WorkItem::new(next_id, WorkPayload::Path(path.clone()), size));
                next_id += 1;
            } else if path.is_dir() {
                dirs.push(path.clone());
                for entry in walkdir::WalkDir::new(path)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                {
                    let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                    items.push(WorkItem::new(
                        next_id,
                        WorkPayload::Path(entry.into_path()),
                        size,
                    ));
                    next_id += 1;
                }
            } else {
                return Err(
                    InvalidInput(format!("{} does not exist", path.display())).into(),
                );
            }
        }
        *self.dirs.lock().expect("shredder dirs poisoned") = dirs;
        Ok(items)
    }

    fn execute(&self, item: &WorkItem, cancel: &CancelToken) -> WorkResult {
        if cancel.is_cancelled() {
            return WorkResult::cancelled(item.id);
        }
        let WorkPayload::Path(path) = &item.payload else {
            return WorkResult::failed(item.id, ErrorKind::Internal, "unexpected payload");
        };
        match shred_file(path, self.options.passes, cancel) {
            Ok(Some(bytes)) => WorkResult::success(item.id, None, bytes),
            Ok(None) => WorkResult::cancelled(item.id),
            Err(e) => WorkResult::failed(item.id, classify_error(&e), format!("{e:#}")),
        }
    }
}

/// Overwrite `path` with `passes` full passes and unlink it. Returns the
/// total bytes written, or `None` if cancelled before the overwrite
/// finished (the file is left in place, partially overwritten).
fn shred_file(path: &Path, passes: u32, cancel: &CancelToken) -> Result<Option<u64>> {
    let size = std::fs::metadata(path)
        .with_context(|| format!("stat {}", path.display()))?
        .len();

    let mut file = OpenOptions::new()
        .write(true)
        .open(path)
        .with_context(|| format!("opening {} for overwrite", path.display()))?;

    let mut rng = rand::thread_rng();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;

    for pass in 0..passes {
        file.seek(SeekFrom::Start(0))?;
        let mut remaining = size;
        while remaining > 0 {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            let chunk = remaining.min(CHUNK_SIZE as u64) as usize;
            match pass {
                0 => buffer[..chunk].fill(0x00),
                1 => buffer[..chunk].fill(0xFF),
                _ => rng.fill_bytes(&mut buffer[..chunk]),
            }
            file.write_all(&buffer[..chunk])?;
            remaining -= chunk as u64;
            written += chunk as u64;
        }
        file.flush()?;
        // Force the pass onto the platter before starting the next pattern.
        file.sync_all()?;
    }
    drop(file);

    std::fs::remove_file(path).with_context(|| format!("removing {}", path.display()))?;
    debug!(path = %path.display(), passes, "shredded");
    Ok(Some(written))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shred_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("secret.txt");
        std::fs::write(&target, "do not recover me").unwrap();

        let adapter = SecureShredderAdapter::new(ShredderConfig { passes: 2 });
        let items = adapter
            .validate(&InputSpec::new(vec![target.clone()]))
            .unwrap();
        assert_eq!(items.len(), 1);

        let result = adapter.execute(&items[0], &CancelToken::new());
        assert!(result.is_success(), "{:?}", result.outcome);
        assert_eq!(result.bytes_processed, 17 * 2);
        assert!(!target.exists());
    }

    #[test]
    fn test_shred_folder_and_remove_skeleton() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("vault");
        std::fs::create_dir_all(root.join("inner")).unwrap();
        std::fs::write(root.join("a.txt"), "aaa").unwrap();
        std::fs::write(root.join("inner/b.txt"), "bbb").unwrap();

        let adapter = SecureShredderAdapter::new(ShredderConfig::default());
        let items = adapter
            .validate(&InputSpec::new(vec![root.clone()]))
            .unwrap();
        assert_eq!(items.len(), 2);

        for item in &items {
            let result = adapter.execute(item, &CancelToken::new());
            assert!(result.is_success(), "{:?}", result.outcome);
        }
        adapter.remove_empty_dirs();
        assert!(!root.exists());
    }

    #[test]
    fn test_cancel_leaves_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("keep.txt");
        std::fs::write(&target, "still here").unwrap();

        let adapter = SecureShredderAdapter::new(ShredderConfig::default());
        let items = adapter
            .validate(&InputSpec::new(vec![target.clone()]))
            .unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = adapter.execute(&items[0], &cancel);
        assert!(result.is_skipped());
        assert!(target.exists());
    }

    #[test]
    fn test_missing_path_rejected() {
        let adapter = SecureShredderAdapter::new(ShredderConfig::default());
        let error = adapter
            .validate(&InputSpec::new(vec![PathBuf::from("/no/such/thing")]))
            .unwrap_err();
        assert!(error.downcast_ref::<InvalidInput>().is_some());
    }
}

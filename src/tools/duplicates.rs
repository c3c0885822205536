//! Duplicate finder: size grouping, content hashing, and byte-for-byte
//! confirmation.
//!
//! Hash equality alone is never trusted as the duplicate criterion: after
//! hashing, files sharing a `(size, digest)` bucket are compared byte for
//! byte and only truly identical files end up in the same group.

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use super::{require_selection, InputSpec, ToolAdapter, ToolKind};
use crate::config::DuplicatesConfig;
use crate::job::{
    classify_error, CancelToken, ErrorKind, InvalidInput, WorkItem, WorkPayload, WorkResult,
};

const CHUNK_SIZE: usize = 64 * 1024;

type Bucket = (u64, [u8; 32]);

/// A set of files confirmed to have identical content.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    pub file_size: u64,
    pub paths: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Bytes that could be reclaimed by keeping one copy.
    pub fn wasted_bytes(&self) -> u64 {
        self.file_size * (self.paths.len() as u64 - 1)
    }
}

/// Aggregate statistics over all duplicate groups.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateStats {
    pub groups: usize,
    pub duplicate_files: usize,
    pub wasted_bytes: u64,
}

pub fn duplicate_stats(groups: &[DuplicateGroup]) -> DuplicateStats {
    DuplicateStats {
        groups: groups.len(),
        duplicate_files: groups.iter().map(|g| g.paths.len() - 1).sum(),
        wasted_bytes: groups.iter().map(DuplicateGroup::wasted_bytes).sum(),
    }
}

/// Scan folders for duplicate files.
///
/// `validate` walks the selection and keeps only files whose size occurs more
/// than once (a file with a unique size cannot have a duplicate). Each work
/// item hashes one candidate; [`DuplicateFinderAdapter::groups`] then
/// confirms every hash bucket byte for byte.
pub struct DuplicateFinderAdapter {
    options: DuplicatesConfig,
    index: Mutex<HashMap<Bucket, Vec<PathBuf>>>,
}

impl DuplicateFinderAdapter {
    pub fn new(options: DuplicatesConfig) -> Self {
        Self {
            options,
            index: Mutex::new(HashMap::new()),
        }
    }

    fn wanted(&self, path: &Path) -> bool {
        if self.options.extensions.is_empty() {
            return true;
        }
        self.options
            .extensions
            .iter()
            .any(|ext| crate::utils::has_extension(path, ext.trim_start_matches('.')))
    }

    /// Confirmed duplicate groups, largest waste first. Call after the job
    /// has completed; consumes the collected hash index.
    pub fn groups(&self) -> Result<Vec<DuplicateGroup>> {
        let index = std::mem::take(&mut *self.index.lock().expect("duplicate index poisoned"));
        let mut groups = Vec::new();
        for ((size, _digest), paths) in index {
            if paths.len() < 2 {
                continue;
            }
            for subgroup in partition_by_content(&paths)? {
                if subgroup.len() >= 2 {
                    groups.push(DuplicateGroup {
                        file_size: size,
                        paths: subgroup,
                    });
                }
            }
        }
        groups.sort_by_key(|g| std::cmp::Reverse(g.wasted_bytes()));
        Ok(groups)
    }
}

impl ToolAdapter for DuplicateFinderAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::DuplicateFinder
    }

    fn io_bound(&self) -> bool {
        true
    }

    fn validate(&self, input: &InputSpec) -> Result<Vec<WorkItem>> {
        require_selection(input)?;
        let mut candidates: Vec<(PathBuf, u64)> = Vec::new();
        for root in &input.paths {
            if !root.is_dir() {
                return Err(
                    InvalidInput(format!("{} is not a folder", root.display())).into(),
                );
            }
            let mut walker = walkdir::WalkDir::new(root);
            if !self.options.recursive {
                walker = walker.max_depth(1);
            }
            for entry in walker.into_iter().filter_map(|e| e.ok()) {
                if !entry.file_type().is_file() || !self.wanted(entry.path()) {
                    continue;
                }
                let Ok(meta) = entry.metadata() else { continue };
                if meta.len() >= self.options.min_size_bytes.max(1) {
                    candidates.push((entry.into_path(), meta.len()));
                }
            }
        }

        // Only files sharing a size can be duplicates of each other.
        let mut by_size: HashMap<u64, usize> = HashMap::new();
        for (_, size) in &candidates {
            *by_size.entry(*size).or_default() += 1;
        }
        let items: Vec<WorkItem> = candidates
            .into_iter()
            .filter(|(_, size)| by_size[size] > 1)
            .enumerate()
            .map(|(index, (path, size))| {
                WorkItem::new(index as u64, WorkPayload::Path(path), size)
            })
            .collect();
        debug!(candidates = items.len(), "duplicate scan candidates");
        Ok(items)
    }

    fn execute(&self, item: &WorkItem, cancel: &CancelToken) -> WorkResult {
        let WorkPayload::Path(path) = &item.payload else {
            return WorkResult::failed(item.id, ErrorKind::Internal, "unexpected payload");
        };
        match hash_file(path, cancel) {
            Ok(Some(digest)) => {
                self.index
                    .lock()
                    .expect("duplicate index poisoned")
                    .entry((item.size_hint, digest))
                    .or_default()
                    .push(path.clone());
                WorkResult::success(item.id, None, item.size_hint)
            }
            Ok(None) => WorkResult::cancelled(item.id),
            Err(e) => WorkResult::failed(item.id, classify_error(&e), format!("{e:#}")),
        }
    }
}

/// SHA-256 of a file's content; `None` if cancelled mid-read.
fn hash_file(path: &Path, cancel: &CancelToken) -> Result<Option<[u8; 32]>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = BufReader::with_capacity(CHUNK_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(Some(hasher.finalize().into()))
}

/// Split a bucket of same-sized, same-hash files into groups of files that
/// are byte-for-byte identical. The comparison is authoritative; a hash
/// collision lands the colliding file in its own group.
pub fn partition_by_content(paths: &[PathBuf]) -> Result<Vec<Vec<PathBuf>>> {
    let mut groups: Vec<Vec<PathBuf>> = Vec::new();
    'outer: for path in paths {
        for group in &mut groups {
            if files_identical(&group[0], path)? {
                group.push(path.clone());
                continue 'outer;
            }
        }
        groups.push(vec![path.clone()]);
    }
    Ok(groups)
}

fn files_identical(a: &Path, b: &Path) -> Result<bool> {
    let meta_a = std::fs::metadata(a)?;
    let meta_b = std::fs::metadata(b)?;
    if meta_a.len() != meta_b.len() {
        return Ok(false);
    }

    let mut reader_a = BufReader::with_capacity(CHUNK_SIZE, File::open(a)?);
    let mut reader_b = BufReader::with_capacity(CHUNK_SIZE, File::open(b)?);
    let mut buf_a = vec![0u8; CHUNK_SIZE];
    let mut buf_b = vec![0u8; CHUNK_SIZE];
    loop {
        let read_a = reader_a.read(&mut buf_a)?;
        let read_b = reader_b.read(&mut buf_b)?;
        if read_a != read_b {
            return Ok(false);
        }
        if read_a == 0 {
            return Ok(true);
        }
        if buf_a[..read_a] != buf_b[..read_b] {
            return Ok(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobScheduler;
    use std::sync::Arc;

    fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_find_duplicates_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", b"same content here");
        write(dir.path(), "b.txt", b"same content here");
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        write(&dir.path().join("sub"), "c.txt", b"same content here");
        write(dir.path(), "unique.txt", b"nothing like the others");

        let adapter = Arc::new(DuplicateFinderAdapter::new(DuplicatesConfig::default()));
        let report = JobScheduler::default()
            .submit(
                Arc::clone(&adapter) as Arc<dyn ToolAdapter>,
                &InputSpec::new(vec![dir.path().to_path_buf()]),
            )
            .unwrap()
            .run(|_| {})
            .unwrap();

        // Only the three same-sized files are candidates.
        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 3);

        let groups = adapter.groups().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].paths.len(), 3);
        assert_eq!(groups[0].wasted_bytes(), 2 * 17);

        let stats = duplicate_stats(&groups);
        assert_eq!(stats.duplicate_files, 2);
    }

    #[test]
    fn test_same_bucket_different_bytes_are_not_duplicates() {
        // Two same-sized files forced into one bucket; byte comparison must
        // keep them apart.
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.bin", b"0123456789");
        let b = write(dir.path(), "b.bin", b"0123456788");

        let groups = partition_by_content(&[a, b]).unwrap();
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.len() == 1));
    }

    #[test]
    fn test_min_size_filter() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "tiny1", b"xy");
        write(dir.path(), "tiny2", b"xy");

        let adapter = DuplicateFinderAdapter::new(DuplicatesConfig {
            min_size_bytes: 1024,
            ..DuplicatesConfig::default()
        });
        let items = adapter
            .validate(&InputSpec::new(vec![dir.path().to_path_buf()]))
            .unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_rejects_file_input() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "f.txt", b"x");
        let adapter = DuplicateFinderAdapter::new(DuplicatesConfig::default());
        let error = adapter.validate(&InputSpec::new(vec![file])).unwrap_err();
        assert!(error.downcast_ref::<InvalidInput>().is_some());
    }
}

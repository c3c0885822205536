//! Disk cleanup: enumerate well-known temp locations and delete their
//! contents.
//!
//! Deletion is permanent (no recycle-bin round trip), so the CLI asks for
//! confirmation before a job is submitted.

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use super::{require_selection, InputSpec, ToolAdapter, ToolKind};
use crate::job::{CancelToken, ErrorKind, InvalidInput, WorkItem, WorkPayload, WorkResult};
use crate::utils::{count_files, file_size, folder_size};

/// A well-known location holding disposable files.
#[derive(Debug, Clone, Serialize)]
pub struct TempLocation {
    pub name: &'static str,
    pub path: PathBuf,
    pub description: &'static str,
}

/// Temp locations for the current platform. Only locations that are safe to
/// empty wholesale are listed.
pub fn temp_locations() -> Vec<TempLocation> {
    let mut locations = vec![TempLocation {
        name: "user-temp",
        path: std::env::temp_dir(),
        description: "User temporary files",
    }];

    #[cfg(windows)]
    {
        if let Ok(system_root) = std::env::var("SYSTEMROOT") {
            let system_root = PathBuf::from(system_root);
            locations.push(TempLocation {
                name: "windows-temp",
                path: system_root.join("Temp"),
                description: "Windows temporary files",
            });
            locations.push(TempLocation {
                name: "prefetch",
                path: system_root.join("Prefetch"),
                description: "Windows prefetch cache",
            });
        }
        if let Some(local) = dirs::data_local_dir() {
            locations.push(TempLocation {
                name: "thumbnail-cache",
                path: local.join("Microsoft/Windows/Explorer"),
                description: "Explorer thumbnail cache",
            });
        }
    }

    #[cfg(not(windows))]
    {
        if let Some(cache) = dirs::cache_dir() {
            locations.push(TempLocation {
                name: "user-cache",
                path: cache,
                description: "User cache directory",
            });
        }
    }

    locations
}

/// Find a location by its short name.
pub fn find_location(name: &str) -> Option<TempLocation> {
    temp_locations().into_iter().find(|l| l.name == name)
}

/// Current usage of one temp location.
#[derive(Debug, Clone, Serialize)]
pub struct LocationUsage {
    pub location: TempLocation,
    pub exists: bool,
    pub bytes: u64,
    pub files: usize,
}

/// Measure every known location (for the `--list` view).
pub fn scan_locations() -> Vec<LocationUsage> {
    temp_locations()
        .into_iter()
        .map(|location| {
            let exists = location.path.is_dir();
            let (bytes, files) = if exists {
                (folder_size(&location.path), count_files(&location.path))
            } else {
                (0, 0)
            };
            LocationUsage {
                location,
                exists,
                bytes,
                files,
            }
        })
        .collect()
}

/// Delete the contents of selected temp locations, one work item per
/// top-level entry so a single locked file cannot abort the sweep.
pub struct DiskCleanupAdapter;

impl DiskCleanupAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DiskCleanupAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolAdapter for DiskCleanupAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::DiskCleanup
    }

    fn io_bound(&self) -> bool {
        true
    }

    fn validate(&self, input: &InputSpec) -> Result<Vec<WorkItem>> {
        require_selection(input)?;
        let mut items = Vec::new();
        let mut next_id = 0u64;
        for root in &input.paths {
            if !root.is_dir() {
                return Err(
                    InvalidInput(format!("{} is not a folder", root.display())).into(),
                );
            }
            for entry in std::fs::read_dir(root)? {
                let entry = entry?;
                let path = entry.path();
                let size_hint = if path.is_dir() {
                    folder_size(&path)
                } else {
                    file_size(&path)
                };
                items.push(WorkItem::new(next_id, WorkPayload::Path(path), size_hint));
                next_id += 1;
            }
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

        let freed = item.size_hint;
        let outcome = if path.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        match outcome {
            Ok(()) => WorkResult::success(item.id, None, freed),
            Err(e) => WorkResult::failed(
                item.id,
                ErrorKind::Io,
                format!("deleting {}: {e}", path.display()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_locations_include_user_temp() {
        let locations = temp_locations();
        assert!(locations.iter().any(|l| l.name == "user-temp"));
        assert!(find_location("user-temp").is_some());
        assert!(find_location("made-up").is_none());
    }

    #[test]
    fn test_cleanup_deletes_top_level_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("junk.tmp"), "junk").unwrap();
        std::fs::create_dir(dir.path().join("cache")).unwrap();
        std::fs::write(dir.path().join("cache/blob"), "blob").unwrap();

        let adapter = DiskCleanupAdapter::new();
        let items = adapter
            .validate(&InputSpec::new(vec![dir.path().to_path_buf()]))
            .unwrap();
        assert_eq!(items.len(), 2);

        let mut freed = 0;
        for item in &items {
            let result = adapter.execute(item, &CancelToken::new());
            assert!(result.is_success(), "{:?}", result.outcome);
            freed += result.bytes_processed;
        }
        assert_eq!(freed, 8);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_location_rejected() {
        let adapter = DiskCleanupAdapter::new();
        let error = adapter
            .validate(&InputSpec::new(vec![PathBuf::from("/no/such/location")]))
            .unwrap_err();
        assert!(error.downcast_ref::<InvalidInput>().is_some());
    }
}

//! Zip compression adapter: one archive per selected file or folder.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{require_selection, InputSpec, ToolAdapter, ToolKind};
use crate::config::CompressConfig;
use crate::job::{
    classify_error, CancelToken, ErrorKind, InvalidInput, WorkItem, WorkPayload, WorkResult,
};
use crate::utils::{file_size, folder_size};

const CHUNK_SIZE: usize = 64 * 1024;

/// Compress each selected file (or folder) into its own `.zip` next to the
/// source or under the chosen output directory.
pub struct CompressAdapter {
    options: CompressConfig,
}

impl CompressAdapter {
    pub fn new(options: CompressConfig) -> Self {
        Self { options }
    }

    fn run_item(&self, source: &Path, dest: &Path, cancel: &CancelToken) -> Result<Option<u64>> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(dest).with_context(|| format!("creating {}", dest.display()))?;
        let mut writer = ZipWriter::new(file);

        let written = if source.is_dir() {
            self.add_dir(&mut writer, source, cancel)?
        } else {
            let name = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "file".to_string());
            self.add_file(&mut writer, source, &name, cancel)?
        };

        match written {
            Some(bytes) => {
                writer.finish()?;
                Ok(Some(bytes))
            }
            None => {
                // Cancelled mid-archive: drop the writer and remove the
                // partial artifact before returning.
                drop(writer);
                let _ = std::fs::remove_file(dest);
                Ok(None)
            }
        }
    }

    fn add_dir(
        &self,
        writer: &mut ZipWriter<File>,
        root: &Path,
        cancel: &CancelToken,
    ) -> Result<Option<u64>> {
        let mut total = 0u64;
        for entry in walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            match self.add_file(writer, entry.path(), &relative, cancel)? {
                Some(bytes) => total += bytes,
                None => return Ok(None),
            }
        }
        Ok(Some(total))
    }

    fn add_file(
        &self,
        writer: &mut ZipWriter<File>,
        source: &Path,
        name: &str,
        cancel: &CancelToken,
    ) -> Result<Option<u64>> {
        let size = file_size(source);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.options.level))
            .large_file(size > u32::MAX as u64);
        writer.start_file(name, options)?;

        let mut reader =
            File::open(source).with_context(|| format!("opening {}", source.display()))?;
        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut written = 0u64;
        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            let read = reader.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            writer.write_all(&buffer[..read])?;
            written += read as u64;
        }
        Ok(Some(written))
    }
}

impl ToolAdapter for CompressAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::Compress
    }

    fn validate(&self, input: &InputSpec) -> Result<Vec<WorkItem>> {
        require_selection(input)?;
        let mut items = Vec::with_capacity(input.paths.len());
        for (index, source) in input.paths.iter().enumerate() {
            if !source.exists() {
                return Err(
                    InvalidInput(format!("{} does not exist", source.display())).into(),
                );
            }
            let stem = source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "archive".to_string());
            let out_dir = input.output.clone().unwrap_or_else(|| {
                source.parent().unwrap_or(Path::new(".")).to_path_buf()
            });
            let size_hint = if source.is_dir() {
                folder_size(source)
            } else {
                file_size(source)
            };
            items.push(WorkItem::new(
                index as u64,
                WorkPayload::Transfer {
                    source: source.clone(),
                    dest: out_dir.join(format!("{stem}.zip")),
                },
                size_hint,
            ));
        }
        Ok(items)
    }

    fn execute(&self, item: &WorkItem, cancel: &CancelToken) -> WorkResult {
        if cancel.is_cancelled() {
            return WorkResult::cancelled(item.id);
        }
        let WorkPayload::Transfer { source, dest } = &item.payload else {
            return WorkResult::failed(item.id, ErrorKind::Internal, "unexpected payload");
        };
        match self.run_item(source, dest, cancel) {
            Ok(Some(bytes)) => WorkResult::success(item.id, Some(dest.clone()), bytes),
            Ok(None) => WorkResult::cancelled(item.id),
            Err(e) => {
                let _ = std::fs::remove_file(dest);
                WorkResult::failed(item.id, classify_error(&e), format!("{e:#}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> CompressAdapter {
        CompressAdapter::new(CompressConfig::default())
    }

    #[test]
    fn test_compress_file_produces_archive() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("report.txt");
        std::fs::write(&source, "compressible ".repeat(2000)).unwrap();

        let items = adapter()
            .validate(&InputSpec::new(vec![source.clone()]))
            .unwrap();
        assert_eq!(items.len(), 1);

        let result = adapter().execute(&items[0], &CancelToken::new());
        assert!(result.is_success(), "{:?}", result.outcome);

        let archive = dir.path().join("report.zip");
        assert!(archive.is_file());
        // Deflate should beat the repetitive plain text comfortably.
        assert!(file_size(&archive) < file_size(&source));
    }

    #[test]
    fn test_compress_folder_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("bundle");
        std::fs::create_dir_all(src.join("nested")).unwrap();
        std::fs::write(src.join("a.txt"), "aaaa").unwrap();
        std::fs::write(src.join("nested/b.txt"), "bbbb").unwrap();

        let out = dir.path().join("out");
        let items = adapter()
            .validate(&InputSpec::new(vec![src]).with_output(Some(out.clone())))
            .unwrap();
        let result = adapter().execute(&items[0], &CancelToken::new());
        assert!(result.is_success(), "{:?}", result.outcome);
        assert_eq!(result.bytes_processed, 8);
        assert!(out.join("bundle.zip").is_file());
    }

    #[test]
    fn test_cancelled_archive_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("big.bin");
        std::fs::write(&source, vec![7u8; 1024]).unwrap();

        let items = adapter()
            .validate(&InputSpec::new(vec![source]))
            .unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = adapter().execute(&items[0], &cancel);
        assert!(result.is_skipped());
        assert!(!dir.path().join("big.zip").exists());
    }

    #[test]
    fn test_missing_input_rejected() {
        let error = adapter()
            .validate(&InputSpec::new(vec![PathBuf::from("/no/such/file")]))
            .unwrap_err();
        assert!(error.downcast_ref::<InvalidInput>().is_some());
    }
}

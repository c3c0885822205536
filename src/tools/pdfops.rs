//! PDF merge and split adapters.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{require_file, require_selection, InputSpec, ToolAdapter, ToolKind};
use crate::external::DocumentEngine;
use crate::job::{classify_error, CancelToken, InvalidInput, WorkItem, WorkPayload, WorkResult};
use crate::utils::file_size;

/// Parse a page-range expression such as `1-3,7,9-12` into 1-indexed
/// inclusive ranges.
pub fn parse_page_ranges(expr: &str) -> Result<Vec<(u32, u32)>> {
    let mut ranges = Vec::new();
    for part in expr.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => (a.trim().parse::<u32>()?, b.trim().parse::<u32>()?),
            None => {
                let page = part.parse::<u32>()?;
                (page, page)
            }
        };
        if start == 0 || end < start {
            return Err(InvalidInput(format!("bad page range '{part}'")).into());
        }
        ranges.push((start, end));
    }
    if ranges.is_empty() {
        return Err(InvalidInput(format!("no page ranges in '{expr}'")).into());
    }
    Ok(ranges)
}

/// Merge two or more PDFs into a single output file (one work item).
pub struct MergePdfAdapter {
    engine: Arc<dyn DocumentEngine>,
}

impl MergePdfAdapter {
    pub fn new(engine: Arc<dyn DocumentEngine>) -> Self {
        Self { engine }
    }
}

impl ToolAdapter for MergePdfAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::MergePdf
    }

    fn validate(&self, input: &InputSpec) -> Result<Vec<WorkItem>> {
        require_selection(input)?;
        if input.paths.len() < 2 {
            return Err(InvalidInput("merging needs at least two PDFs".into()).into());
        }
        for source in &input.paths {
            require_file(source, &["pdf"])?;
        }
        let dest = match &input.output {
            Some(output) if output.extension().is_some() => output.clone(),
            Some(output) => output.join("merged.pdf"),
            None => input.paths[0]
                .parent()
                .unwrap_or(Path::new("."))
                .join("merged.pdf"),
        };
        let size: u64 = input.paths.iter().map(file_size).sum();
        Ok(vec![WorkItem::new(
            0,
            WorkPayload::Gather {
                sources: input.paths.clone(),
                dest,
            },
            size,
        )])
    }

    fn execute(&self, item: &WorkItem, cancel: &CancelToken) -> WorkResult {
        if cancel.is_cancelled() {
            return WorkResult::cancelled(item.id);
        }
        let WorkPayload::Gather { sources, dest } = &item.payload else {
            return WorkResult::failed(
                item.id,
                crate::job::ErrorKind::Internal,
                "unexpected payload",
            );
        };
        if let Some(parent) = dest.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return WorkResult::failed(
                    item.id,
                    crate::job::ErrorKind::Io,
                    format!("creating {}: {e}", parent.display()),
                );
            }
        }
        match self.engine.merge(sources, dest) {
            Ok(()) => WorkResult::success(item.id, Some(dest.clone()), item.size_hint),
            Err(e) => {
                let _ = std::fs::remove_file(dest);
                WorkResult::failed(item.id, classify_error(&e), format!("{e:#}"))
            }
        }
    }
}

/// Split one PDF into page-range files, one work item per range.
pub struct SplitPdfAdapter {
    engine: Arc<dyn DocumentEngine>,
}

impl SplitPdfAdapter {
    pub fn new(engine: Arc<dyn DocumentEngine>) -> Self {
        Self { engine }
    }
}

impl ToolAdapter for SplitPdfAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::SplitPdf
    }

    fn validate(&self, input: &InputSpec) -> Result<Vec<WorkItem>> {
        require_selection(input)?;
        if input.paths.len() != 1 {
            return Err(InvalidInput("splitting works on exactly one PDF".into()).into());
        }
        let source = &input.paths[0];
        require_file(source, &["pdf"])?;

        let pages = self.engine.page_count(source)?;
        let ranges = match &input.pages {
            Some(ranges) => {
                for &(start, end) in ranges {
                    if start == 0 || end > pages {
                        return Err(InvalidInput(format!(
                            "page range {start}-{end} outside document (1-{pages})"
                        ))
                        .into());
                    }
                }
                ranges.clone()
            }
            // No explicit ranges: one file per page.
            None => (1..=pages).map(|p| (p, p)).collect(),
        };

        let out_dir = input
            .output
            .clone()
            .unwrap_or_else(|| source.parent().unwrap_or(Path::new(".")).to_path_buf());
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "split".to_string());
        let per_item = file_size(source) / ranges.len().max(1) as u64;

        Ok(ranges
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| {
                let name = if start == end {
                    format!("{stem}_page_{start}.pdf")
                } else {
                    format!("{stem}_pages_{start}-{end}.pdf")
                };
                WorkItem::new(
                    index as u64,
                    WorkPayload::PageRange {
                        source: source.clone(),
                        start,
                        end,
                        dest: out_dir.join(name),
                    },
                    per_item,
                )
            })
            .collect())
    }

    fn execute(&self, item: &WorkItem, cancel: &CancelToken) -> WorkResult {
        if cancel.is_cancelled() {
            return WorkResult::cancelled(item.id);
        }
        let WorkPayload::PageRange {
            source,
            start,
            end,
            dest,
        } = &item.payload
        else {
            return WorkResult::failed(
                item.id,
                crate::job::ErrorKind::Internal,
                "unexpected payload",
            );
        };
        if let Some(parent) = dest.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return WorkResult::failed(
                    item.id,
                    crate::job::ErrorKind::Io,
                    format!("creating {}: {e}", parent.display()),
                );
            }
        }
        match self.engine.extract_pages(source, *start, *end, dest) {
            Ok(()) => WorkResult::success(item.id, Some(dest.clone()), item.size_hint),
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

    #[test]
    fn test_parse_single_pages_and_ranges() {
        assert_eq!(
            parse_page_ranges("1-3,7,9-12").unwrap(),
            vec![(1, 3), (7, 7), (9, 12)]
        );
        assert_eq!(parse_page_ranges("4").unwrap(), vec![(4, 4)]);
    }

    #[test]
    fn test_parse_rejects_bad_ranges() {
        assert!(parse_page_ranges("0-3").is_err());
        assert!(parse_page_ranges("5-2").is_err());
        assert!(parse_page_ranges("abc").is_err());
        assert!(parse_page_ranges("").is_err());
    }
}

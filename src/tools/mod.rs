//! Tool catalogue: the adapter contract and one implementation per utility.
//!
//! Every tool plugs into the job pipeline through [`ToolAdapter`]: `validate`
//! expands the user's selection into work items, `execute` performs exactly
//! one item. Adapters own no concurrency logic; the scheduler decides how
//! wide to fan out and when to stop.

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ForgeConfig;
use crate::external::{CommandDocumentEngine, DocumentEngine};
use crate::job::{CancelToken, WorkItem, WorkResult};

pub mod analyzer;
pub mod cleanup;
pub mod compress;
pub mod convert;
pub mod duplicates;
pub mod pdfops;
pub mod shredder;

/// What the user selected, plus structured options that are per-invocation
/// rather than configuration.
#[derive(Debug, Clone, Default)]
pub struct InputSpec {
    /// Files and/or directories the tool operates on.
    pub paths: Vec<PathBuf>,
    /// Destination file or directory, depending on the tool.
    pub output: Option<PathBuf>,
    /// 1-indexed inclusive page ranges (split tool only).
    pub pages: Option<Vec<(u32, u32)>>,
}

impl InputSpec {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            ..Self::default()
        }
    }

    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    pub fn with_pages(mut self, pages: Option<Vec<(u32, u32)>>) -> Self {
        self.pages = pages;
        self
    }
}

/// Pluggable implementation of one utility's validate/execute behavior.
pub trait ToolAdapter: Send + Sync {
    fn kind(&self) -> ToolKind;

    /// Expand the user selection into concrete work items. Empty or
    /// non-existent input is rejected here, before any job starts.
    fn validate(&self, input: &InputSpec) -> Result<Vec<WorkItem>>;

    /// Perform one unit of work. Implementations check the cancel token at
    /// natural suspension points and return a skipped result promptly; all
    /// failures are mapped into the result, never raised.
    fn execute(&self, item: &WorkItem, cancel: &CancelToken) -> WorkResult;

    /// I/O-heavy tools get a lower worker cap to avoid disk thrashing.
    fn io_bound(&self) -> bool {
        false
    }
}

/// Identifier for each tool in the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    PdfToImage,
    DocxToPdf,
    ImagesToPdf,
    TextToPdf,
    Compress,
    MergePdf,
    SplitPdf,
    DiskCleanup,
    DuplicateFinder,
    SecureShredder,
    DriveAnalyzer,
}

impl ToolKind {
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::PdfToImage => "pdf-to-image",
            ToolKind::DocxToPdf => "docx-to-pdf",
            ToolKind::ImagesToPdf => "images-to-pdf",
            ToolKind::TextToPdf => "text-to-pdf",
            ToolKind::Compress => "compress",
            ToolKind::MergePdf => "merge-pdf",
            ToolKind::SplitPdf => "split-pdf",
            ToolKind::DiskCleanup => "disk-cleanup",
            ToolKind::DuplicateFinder => "duplicate-finder",
            ToolKind::SecureShredder => "secure-shredder",
            ToolKind::DriveAnalyzer => "drive-analyzer",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolKind::PdfToImage => "Render PDF pages to PNG or JPEG images",
            ToolKind::DocxToPdf => "Convert word-processor documents to PDF",
            ToolKind::ImagesToPdf => "Combine images into a single PDF",
            ToolKind::TextToPdf => "Convert plain-text files to PDF",
            ToolKind::Compress => "Compress files into individual zip archives",
            ToolKind::MergePdf => "Merge several PDFs into one",
            ToolKind::SplitPdf => "Split a PDF into page ranges",
            ToolKind::DiskCleanup => "Delete temporary files and caches",
            ToolKind::DuplicateFinder => "Find duplicate files by content",
            ToolKind::SecureShredder => "Overwrite and delete files beyond undelete",
            ToolKind::DriveAnalyzer => "Break down disk usage under a folder",
        }
    }

    pub fn all() -> &'static [ToolKind] {
        &[
            ToolKind::PdfToImage,
            ToolKind::DocxToPdf,
            ToolKind::ImagesToPdf,
            ToolKind::TextToPdf,
            ToolKind::Compress,
            ToolKind::MergePdf,
            ToolKind::SplitPdf,
            ToolKind::DiskCleanup,
            ToolKind::DuplicateFinder,
            ToolKind::SecureShredder,
            ToolKind::DriveAnalyzer,
        ]
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Registry mapping tool identifiers to adapter instances, decoupling the
/// scheduler and CLI from any specific tool.
pub struct ToolRegistry {
    config: ForgeConfig,
    engine: Arc<dyn DocumentEngine>,
}

impl ToolRegistry {
    pub fn new(config: ForgeConfig) -> Self {
        Self::with_engine(config, Arc::new(CommandDocumentEngine::new()))
    }

    /// Swap in a different document engine (used by tests).
    pub fn with_engine(config: ForgeConfig, engine: Arc<dyn DocumentEngine>) -> Self {
        Self { config, engine }
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    pub fn build(&self, kind: ToolKind) -> Arc<dyn ToolAdapter> {
        let engine = Arc::clone(&self.engine);
        match kind {
            ToolKind::PdfToImage => Arc::new(convert::PdfToImageAdapter::new(
                engine,
                self.config.convert.clone(),
            )),
            ToolKind::DocxToPdf => Arc::new(convert::DocToPdfAdapter::docx(engine)),
            ToolKind::TextToPdf => Arc::new(convert::DocToPdfAdapter::text(engine)),
            ToolKind::ImagesToPdf => Arc::new(convert::ImagesToPdfAdapter::new(engine)),
            ToolKind::Compress => Arc::new(compress::CompressAdapter::new(
                self.config.compress.clone(),
            )),
            ToolKind::MergePdf => Arc::new(pdfops::MergePdfAdapter::new(engine)),
            ToolKind::SplitPdf => Arc::new(pdfops::SplitPdfAdapter::new(engine)),
            ToolKind::DiskCleanup => Arc::new(cleanup::DiskCleanupAdapter::new()),
            ToolKind::DuplicateFinder => Arc::new(duplicates::DuplicateFinderAdapter::new(
                self.config.duplicates.clone(),
            )),
            ToolKind::SecureShredder => Arc::new(shredder::SecureShredderAdapter::new(
                self.config.shredder.clone(),
            )),
            ToolKind::DriveAnalyzer => Arc::new(analyzer::DriveAnalyzerAdapter::new()),
        }
    }
}

/// Reject an empty selection before any job is created.
pub(crate) fn require_selection(input: &InputSpec) -> Result<()> {
    if input.paths.is_empty() {
        return Err(crate::job::InvalidInput("no input files selected".into()).into());
    }
    Ok(())
}

/// Reject a missing file, or one with an unexpected extension, up front.
pub(crate) fn require_file(path: &std::path::Path, allowed: &[&str]) -> Result<()> {
    if !path.is_file() {
        return Err(crate::job::InvalidInput(format!("{} is not a file", path.display())).into());
    }
    if !allowed.is_empty()
        && !allowed
            .iter()
            .any(|ext| crate::utils::has_extension(path, ext))
    {
        return Err(crate::job::InvalidInput(format!(
            "{} is not a {} file",
            path.display(),
            allowed.join("/")
        ))
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_names_are_unique() {
        let mut names: Vec<_> = ToolKind::all().iter().map(|k| k.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ToolKind::all().len());
    }

    #[test]
    fn test_registry_builds_every_tool() {
        let registry = ToolRegistry::new(ForgeConfig::default());
        for &kind in ToolKind::all() {
            let adapter = registry.build(kind);
            assert_eq!(adapter.kind(), kind);
        }
    }
}

//! Conversion adapters: PDF pages to images, documents to PDF, images to a
//! combined PDF.
//!
//! All heavy lifting happens inside the [`DocumentEngine`]; these adapters
//! expand selections, pick destinations, and map failures into results.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{require_file, require_selection, InputSpec, ToolAdapter, ToolKind};
use crate::config::ConvertConfig;
use crate::external::DocumentEngine;
use crate::job::{classify_error, CancelToken, WorkItem, WorkPayload, WorkResult};
use crate::utils::file_size;

const DOC_EXTENSIONS: &[&str] = &["docx", "doc", "odt", "rtf"];
const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md", "log"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tif", "tiff", "webp"];

/// Destination directory for a converted file: the selected output folder,
/// or alongside the source.
fn dest_dir(source: &Path, output: &Option<PathBuf>) -> PathBuf {
    output
        .clone()
        .unwrap_or_else(|| source.parent().unwrap_or(Path::new(".")).to_path_buf())
}

fn stem(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

/// Render each selected PDF into a folder of page images.
pub struct PdfToImageAdapter {
    engine: Arc<dyn DocumentEngine>,
    options: ConvertConfig,
}

impl PdfToImageAdapter {
    pub fn new(engine: Arc<dyn DocumentEngine>, options: ConvertConfig) -> Self {
        Self { engine, options }
    }
}

impl ToolAdapter for PdfToImageAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::PdfToImage
    }

    fn validate(&self, input: &InputSpec) -> Result<Vec<WorkItem>> {
        require_selection(input)?;
        let mut items = Vec::with_capacity(input.paths.len());
        for (index, source) in input.paths.iter().enumerate() {
            require_file(source, &["pdf"])?;
            // Each PDF renders into its own subfolder so page images from
            // different inputs cannot collide.
            let dest = dest_dir(source, &input.output).join(stem(source));
            items.push(WorkItem::new(
                index as u64,
                WorkPayload::Transfer {
                    source: source.clone(),
                    dest,
                },
                file_size(source),
            ));
        }
        Ok(items)
    }

    fn execute(&self, item: &WorkItem, cancel: &CancelToken) -> WorkResult {
        if cancel.is_cancelled() {
            return WorkResult::cancelled(item.id);
        }
        let WorkPayload::Transfer { source, dest } = &item.payload else {
            return WorkResult::failed(
                item.id,
                crate::job::ErrorKind::Internal,
                "unexpected payload",
            );
        };
        match self
            .engine
            .render_pages(source, dest, self.options.image_format, self.options.dpi)
        {
            Ok(_pages) => WorkResult::success(item.id, Some(dest.clone()), item.size_hint),
            Err(e) => {
                // Partially rendered pages are not a usable artifact.
                let _ = std::fs::remove_dir_all(dest);
                WorkResult::failed(item.id, classify_error(&e), format!("{e:#}"))
            }
        }
    }
}

/// Convert word-processor or plain-text documents to PDF, one per input.
pub struct DocToPdfAdapter {
    engine: Arc<dyn DocumentEngine>,
    kind: ToolKind,
    extensions: &'static [&'static str],
}

impl DocToPdfAdapter {
    pub fn docx(engine: Arc<dyn DocumentEngine>) -> Self {
        Self {
            engine,
            kind: ToolKind::DocxToPdf,
            extensions: DOC_EXTENSIONS,
        }
    }

    pub fn text(engine: Arc<dyn DocumentEngine>) -> Self {
        Self {
            engine,
            kind: ToolKind::TextToPdf,
            extensions: TEXT_EXTENSIONS,
        }
    }
}

impl ToolAdapter for DocToPdfAdapter {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    fn validate(&self, input: &InputSpec) -> Result<Vec<WorkItem>> {
        require_selection(input)?;
        let mut items = Vec::with_capacity(input.paths.len());
        for (index, source) in input.paths.iter().enumerate() {
            require_file(source, self.extensions)?;
            items.push(WorkItem::new(
                index as u64,
                WorkPayload::Transfer {
                    source: source.clone(),
                    dest: dest_dir(source, &input.output),
                },
                file_size(source),
            ));
        }
        Ok(items)
    }

    fn execute(&self, item: &WorkItem, cancel: &CancelToken) -> WorkResult {
        if cancel.is_cancelled() {
            return WorkResult::cancelled(item.id);
        }
        let WorkPayload::Transfer { source, dest } = &item.payload else {
            return WorkResult::failed(
                item.id,
                crate::job::ErrorKind::Internal,
                "unexpected payload",
            );
        };
        match self.engine.convert_to_pdf(source, dest) {
            Ok(produced) => WorkResult::success(item.id, Some(produced), item.size_hint),
            Err(e) => WorkResult::failed(item.id, classify_error(&e), format!("{e:#}")),
        }
    }
}

/// Combine all selected images into one PDF (a single work item).
pub struct ImagesToPdfAdapter {
    engine: Arc<dyn DocumentEngine>,
}

impl ImagesToPdfAdapter {
    pub fn new(engine: Arc<dyn DocumentEngine>) -> Self {
        Self { engine }
    }

    fn dest(input: &InputSpec) -> PathBuf {
        match &input.output {
            Some(output) if output.extension().is_some() => output.clone(),
            Some(output) => output.join("combined.pdf"),
            None => dest_dir(&input.paths[0], &None).join("combined.pdf"),
        }
    }
}

impl ToolAdapter for ImagesToPdfAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::ImagesToPdf
    }

    fn validate(&self, input: &InputSpec) -> Result<Vec<WorkItem>> {
        require_selection(input)?;
        for source in &input.paths {
            require_file(source, IMAGE_EXTENSIONS)?;
        }
        let size: u64 = input.paths.iter().map(file_size).sum();
        Ok(vec![WorkItem::new(
            0,
            WorkPayload::Gather {
                sources: input.paths.clone(),
                dest: Self::dest(input),
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
        match self.engine.images_to_pdf(sources, dest) {
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
    use crate::job::InvalidInput;

    struct NoopEngine;

    impl DocumentEngine for NoopEngine {
        fn page_count(&self, _pdf: &Path) -> Result<u32> {
            Ok(1)
        }
        fn render_pages(
            &self,
            _pdf: &Path,
            out_dir: &Path,
            _format: crate::external::ImageFormat,
            _dpi: u32,
        ) -> Result<Vec<PathBuf>> {
            Ok(vec![out_dir.join("page-1.png")])
        }
        fn merge(&self, _inputs: &[PathBuf], _output: &Path) -> Result<()> {
            Ok(())
        }
        fn extract_pages(&self, _pdf: &Path, _s: u32, _e: u32, _output: &Path) -> Result<()> {
            Ok(())
        }
        fn convert_to_pdf(&self, input: &Path, out_dir: &Path) -> Result<PathBuf> {
            Ok(out_dir.join(input.with_extension("pdf").file_name().unwrap()))
        }
        fn images_to_pdf(&self, _images: &[PathBuf], _output: &Path) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_validate_rejects_missing_pdf() {
        let adapter = PdfToImageAdapter::new(Arc::new(NoopEngine), ConvertConfig::default());
        let input = InputSpec::new(vec![PathBuf::from("/definitely/not/here.pdf")]);
        let error = adapter.validate(&input).unwrap_err();
        assert!(error.downcast_ref::<InvalidInput>().is_some());
    }

    #[test]
    fn test_validate_rejects_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let adapter = PdfToImageAdapter::new(Arc::new(NoopEngine), ConvertConfig::default());
        let error = adapter
            .validate(&InputSpec::new(vec![path]))
            .unwrap_err();
        assert!(error.downcast_ref::<InvalidInput>().is_some());
    }

    #[test]
    fn test_pdf_items_get_per_source_subfolders() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        std::fs::write(&a, "%PDF-1.4").unwrap();
        std::fs::write(&b, "%PDF-1.4").unwrap();

        let adapter = PdfToImageAdapter::new(Arc::new(NoopEngine), ConvertConfig::default());
        let out = dir.path().join("out");
        let items = adapter
            .validate(&InputSpec::new(vec![a, b]).with_output(Some(out.clone())))
            .unwrap();
        assert_eq!(items.len(), 2);
        match &items[0].payload {
            WorkPayload::Transfer { dest, .. } => assert_eq!(dest, &out.join("a")),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_images_collapse_into_single_item() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.jpg");
        std::fs::write(&a, [0u8; 8]).unwrap();
        std::fs::write(&b, [0u8; 8]).unwrap();

        let adapter = ImagesToPdfAdapter::new(Arc::new(NoopEngine));
        let items = adapter
            .validate(&InputSpec::new(vec![a, b]).with_output(Some(dir.path().join("all.pdf"))))
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].size_hint, 16);
    }
}

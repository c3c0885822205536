//! Document engine: page rendering, merge/split, and format conversion via
//! external converter binaries.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::debug;

/// Failure talking to an external converter binary.
#[derive(Debug, Error)]
pub enum ExternalToolError {
    #[error("external tool '{tool}' not found; install {hint}")]
    NotFound { tool: String, hint: String },
    #[error("'{tool}' failed: {detail}")]
    Failed { tool: String, detail: String },
}

/// Raster output format for page rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    fn pdftoppm_flag(self) -> &'static str {
        match self {
            ImageFormat::Png => "-png",
            ImageFormat::Jpeg => "-jpeg",
        }
    }
}

/// Capability contract for document operations.
///
/// One method per operation the conversion tools need. Implementations own
/// no concurrency; the job pipeline calls them from worker threads.
pub trait DocumentEngine: Send + Sync {
    /// Number of pages in a PDF.
    fn page_count(&self, pdf: &Path) -> Result<u32>;

    /// Render every page of `pdf` into `out_dir`, returning the image paths.
    fn render_pages(
        &self,
        pdf: &Path,
        out_dir: &Path,
        format: ImageFormat,
        dpi: u32,
    ) -> Result<Vec<PathBuf>>;

    /// Concatenate `inputs` into a single PDF at `output`.
    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<()>;

    /// Extract an inclusive, 1-indexed page range into `output`.
    fn extract_pages(&self, pdf: &Path, start: u32, end: u32, output: &Path) -> Result<()>;

    /// Convert a word-processor or plain-text document to PDF inside
    /// `out_dir`, returning the produced file.
    fn convert_to_pdf(&self, input: &Path, out_dir: &Path) -> Result<PathBuf>;

    /// Combine a set of images into a single PDF at `output`.
    fn images_to_pdf(&self, images: &[PathBuf], output: &Path) -> Result<()>;
}

/// [`DocumentEngine`] backed by external converter commands.
///
/// Binaries are resolved from `PATH` on every call; a missing binary maps to
/// [`ExternalToolError::NotFound`] with an installation hint, which the job
/// pipeline surfaces as a per-item failure rather than a crash.
#[derive(Debug, Default)]
pub struct CommandDocumentEngine;

impl CommandDocumentEngine {
    pub fn new() -> Self {
        Self
    }

    fn require(&self, tool: &str, hint: &str) -> Result<PathBuf, ExternalToolError> {
        which::which(tool).map_err(|_| ExternalToolError::NotFound {
            tool: tool.to_string(),
            hint: hint.to_string(),
        })
    }

    fn run(&self, tool: &str, program: &Path, args: &[&std::ffi::OsStr]) -> Result<Vec<u8>> {
        debug!(tool, ?args, "running external tool");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| ExternalToolError::Failed {
                tool: tool.to_string(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExternalToolError::Failed {
                tool: tool.to_string(),
                detail: stderr.trim().chars().take(300).collect(),
            }
            .into());
        }
        Ok(output.stdout)
    }
}

fn os_args<'a>(args: &'a [&'a str], paths: &'a [&'a Path]) -> Vec<&'a std::ffi::OsStr> {
    let mut out: Vec<&std::ffi::OsStr> = args.iter().map(std::ffi::OsStr::new).collect();
    out.extend(paths.iter().map(|p| p.as_os_str()));
    out
}

impl DocumentEngine for CommandDocumentEngine {
    fn page_count(&self, pdf: &Path) -> Result<u32> {
        let program = self.require("pdfinfo", "poppler-utils")?;
        let stdout = self.run("pdfinfo", &program, &os_args(&[], &[pdf]))?;
        let text = String::from_utf8_lossy(&stdout);
        for line in text.lines() {
            if let Some(rest) = line.strip_prefix("Pages:") {
                return Ok(rest.trim().parse()?);
            }
        }
        Err(ExternalToolError::Failed {
            tool: "pdfinfo".to_string(),
            detail: format!("no page count reported for {}", pdf.display()),
        }
        .into())
    }

    fn render_pages(
        &self,
        pdf: &Path,
        out_dir: &Path,
        format: ImageFormat,
        dpi: u32,
    ) -> Result<Vec<PathBuf>> {
        let program = self.require("pdftoppm", "poppler-utils")?;
        crate::utils::ensure_dir_exists(out_dir)?;

        let stem = pdf
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "page".to_string());
        let prefix = out_dir.join(&stem);
        let dpi_str = dpi.to_string();

        let mut args: Vec<&std::ffi::OsStr> = vec![
            std::ffi::OsStr::new(format.pdftoppm_flag()),
            std::ffi::OsStr::new("-r"),
            std::ffi::OsStr::new(&dpi_str),
        ];
        args.push(pdf.as_os_str());
        args.push(prefix.as_os_str());
        self.run("pdftoppm", &program, &args)?;

        // pdftoppm numbers its outputs itself; collect whatever it produced.
        let mut pages = Vec::new();
        for entry in std::fs::read_dir(out_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(&stem) && name.ends_with(format.extension()) {
                pages.push(entry.path());
            }
        }
        pages.sort();
        Ok(pages)
    }

    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        let program = self.require("pdfunite", "poppler-utils")?;
        let mut paths: Vec<&Path> = inputs.iter().map(PathBuf::as_path).collect();
        paths.push(output);
        self.run("pdfunite", &program, &os_args(&[], &paths))?;
        Ok(())
    }

    fn extract_pages(&self, pdf: &Path, start: u32, end: u32, output: &Path) -> Result<()> {
        let program = self.require("qpdf", "qpdf")?;
        let range = format!("{start}-{end}");
        let args = [
            std::ffi::OsStr::new("--empty"),
            std::ffi::OsStr::new("--pages"),
            pdf.as_os_str(),
            std::ffi::OsStr::new(&range),
            std::ffi::OsStr::new("--"),
            output.as_os_str(),
        ];
        self.run("qpdf", &program, &args)?;
        Ok(())
    }

    fn convert_to_pdf(&self, input: &Path, out_dir: &Path) -> Result<PathBuf> {
        let program = self.require("libreoffice", "libreoffice")?;
        crate::utils::ensure_dir_exists(out_dir)?;
        let args = [
            std::ffi::OsStr::new("--headless"),
            std::ffi::OsStr::new("--convert-to"),
            std::ffi::OsStr::new("pdf"),
            std::ffi::OsStr::new("--outdir"),
            out_dir.as_os_str(),
            input.as_os_str(),
        ];
        self.run("libreoffice", &program, &args)?;

        let produced = out_dir
            .join(input.file_stem().unwrap_or_default())
            .with_extension("pdf");
        if !produced.is_file() {
            return Err(ExternalToolError::Failed {
                tool: "libreoffice".to_string(),
                detail: format!("expected output {} was not produced", produced.display()),
            }
            .into());
        }
        Ok(produced)
    }

    fn images_to_pdf(&self, images: &[PathBuf], output: &Path) -> Result<()> {
        let program = self.require("img2pdf", "img2pdf")?;
        let mut args: Vec<&std::ffi::OsStr> =
            images.iter().map(|p| p.as_os_str()).collect();
        args.push(std::ffi::OsStr::new("-o"));
        args.push(output.as_os_str());
        self.run("img2pdf", &program, &args)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_format_extension() {
        assert_eq!(ImageFormat::Png.extension(), "png");
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
    }

    #[test]
    fn test_missing_tool_reports_hint() {
        let engine = CommandDocumentEngine::new();
        let error = engine
            .require("definitely-not-a-real-binary-xyz", "some-package")
            .unwrap_err();
        let message = error.to_string();
        assert!(message.contains("not found"));
        assert!(message.contains("some-package"));
    }
}

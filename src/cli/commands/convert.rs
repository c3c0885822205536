use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::{exit_for, load_config, run_job};
use crate::cli::{ConvertCommands, Globals, Output};
use crate::external::ImageFormat;
use crate::tools::{InputSpec, ToolKind, ToolRegistry};

#[derive(Args)]
pub struct PdfToImageArgs {
    /// PDF files to render
    #[arg(value_name = "PDF", required = true)]
    pub files: Vec<PathBuf>,

    /// Output folder (default: next to each source)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Render resolution in DPI
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Image format
    #[arg(long, value_enum)]
    pub format: Option<ImageFormat>,
}

#[derive(Args)]
pub struct DocToPdfArgs {
    /// Documents to convert
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Output folder (default: next to each source)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct ImagesToPdfArgs {
    /// Images, in page order
    #[arg(value_name = "IMAGE", required = true)]
    pub images: Vec<PathBuf>,

    /// Output PDF path (default: combined.pdf next to the first image)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub async fn execute(cmd: ConvertCommands, globals: &Globals, output: &Output) -> Result<()> {
    match cmd {
        ConvertCommands::PdfToImage(args) => {
            let mut convert = serde_json::Map::new();
            if let Some(dpi) = args.dpi {
                convert.insert("dpi".into(), dpi.into());
            }
            if let Some(format) = args.format {
                convert.insert("image_format".into(), serde_json::to_value(format)?);
            }
            let config = load_config(globals, serde_json::json!({ "convert": convert }))?;
            let registry = ToolRegistry::new(config);

            let adapter = registry.build(ToolKind::PdfToImage);
            let input = InputSpec::new(args.files).with_output(args.out);
            let report = run_job(registry.config(), adapter, &input, output, "rendering pages").await?;
            exit_for(&report)
        }
        ConvertCommands::DocxToPdf(args) => {
            run_doc_conversion(args, ToolKind::DocxToPdf, "converting documents", globals, output)
                .await
        }
        ConvertCommands::TextToPdf(args) => {
            run_doc_conversion(args, ToolKind::TextToPdf, "converting text files", globals, output)
                .await
        }
        ConvertCommands::ImagesToPdf(args) => {
            let config = load_config(globals, serde_json::json!({}))?;
            let registry = ToolRegistry::new(config);

            let adapter = registry.build(ToolKind::ImagesToPdf);
            let input = InputSpec::new(args.images).with_output(args.out);
            let report = run_job(registry.config(), adapter, &input, output, "combining images").await?;
            exit_for(&report)
        }
    }
}

async fn run_doc_conversion(
    args: DocToPdfArgs,
    kind: ToolKind,
    label: &str,
    globals: &Globals,
    output: &Output,
) -> Result<()> {
    let config = load_config(globals, serde_json::json!({}))?;
    let registry = ToolRegistry::new(config);

    let adapter = registry.build(kind);
    let input = InputSpec::new(args.files).with_output(args.out);
    let report = run_job(registry.config(), adapter, &input, output, label).await?;
    exit_for(&report)
}

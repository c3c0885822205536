use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::{exit_for, load_config, run_job};
use crate::cli::{Globals, Output, PdfCommands};
use crate::tools::pdfops::parse_page_ranges;
use crate::tools::{InputSpec, ToolKind, ToolRegistry};

#[derive(Args)]
pub struct MergeArgs {
    /// PDFs to merge, in order
    #[arg(value_name = "PDF", required = true, num_args = 2..)]
    pub files: Vec<PathBuf>,

    /// Output PDF (default: merged.pdf next to the first input)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct SplitArgs {
    /// PDF to split
    #[arg(value_name = "PDF")]
    pub file: PathBuf,

    /// Output folder (default: next to the source)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Page ranges such as "1-3,7,9-12" (default: one file per page)
    #[arg(long)]
    pub pages: Option<String>,
}

pub async fn execute(cmd: PdfCommands, globals: &Globals, output: &Output) -> Result<()> {
    let config = load_config(globals, serde_json::json!({}))?;
    let registry = ToolRegistry::new(config);

    match cmd {
        PdfCommands::Merge(args) => {
            let adapter = registry.build(ToolKind::MergePdf);
            let input = InputSpec::new(args.files).with_output(args.out);
            let report = run_job(registry.config(), adapter, &input, output, "merging PDFs").await?;
            exit_for(&report)
        }
        PdfCommands::Split(args) => {
            let pages = args.pages.as_deref().map(parse_page_ranges).transpose()?;
            let adapter = registry.build(ToolKind::SplitPdf);
            let input = InputSpec::new(vec![args.file])
                .with_output(args.out)
                .with_pages(pages);
            let report = run_job(registry.config(), adapter, &input, output, "splitting PDF").await?;
            exit_for(&report)
        }
    }
}

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use super::{exit_for, load_config, run_job, OutputFormat};
use crate::cli::{Globals, Output};
use crate::tools::analyzer::{file_type_breakdown, largest_files, DriveAnalyzerAdapter};
use crate::tools::{InputSpec, ToolAdapter};
use crate::utils::format_file_size;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Folder to analyze
    #[arg(value_name = "FOLDER")]
    pub folder: PathBuf,

    /// Also list the largest files
    #[arg(long)]
    pub largest: bool,

    /// Also break usage down by file type
    #[arg(long)]
    pub types: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

pub async fn execute(args: AnalyzeArgs, globals: &Globals, output: &Output) -> Result<()> {
    let config = load_config(globals, serde_json::json!({}))?;

    // Built directly so the measured entries can be read back after the run.
    let adapter = Arc::new(DriveAnalyzerAdapter::new());
    let input = InputSpec::new(vec![args.folder.clone()]);
    let report = run_job(
        &config,
        Arc::clone(&adapter) as Arc<dyn ToolAdapter>,
        &input,
        output,
        "measuring",
    )
    .await?;

    let entries = adapter.summary();
    let total: u64 = entries.iter().map(|e| e.bytes).sum();
    let largest = args
        .largest
        .then(|| largest_files(&args.folder, config.analyzer.largest_count));
    let types = args.types.then(|| file_type_breakdown(&args.folder));

    match args.format {
        OutputFormat::Json => {
            let payload = serde_json::json!({
                "path": args.folder,
                "total_bytes": total,
                "entries": entries,
                "largest": largest,
                "types": types,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        OutputFormat::Text => {
            output.header(&format!(
                "{} - {}",
                args.folder.display(),
                format_file_size(total)
            ));
            for entry in &entries {
                let percent = if total > 0 {
                    100.0 * entry.bytes as f64 / total as f64
                } else {
                    0.0
                };
                let marker = if entry.is_dir { "/" } else { "" };
                output.table_row(
                    &format!("{}{marker}", entry.name),
                    &format!("{:>10}  {percent:5.1}%", format_file_size(entry.bytes)),
                );
            }

            if let Some(largest) = largest {
                output.header("Largest files");
                for entry in largest {
                    output.table_row(
                        &entry.name,
                        &format!(
                            "{:>10}  {}",
                            format_file_size(entry.bytes),
                            entry.path.display()
                        ),
                    );
                }
            }

            if let Some(types) = types {
                output.header("By file type");
                for usage in types {
                    output.table_row(
                        &usage.extension,
                        &format!("{:>10}  {} files", format_file_size(usage.bytes), usage.count),
                    );
                }
            }
        }
    }

    exit_for(&report)
}

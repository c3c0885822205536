use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use super::{exit_for, load_config, run_job};
use crate::cli::{Globals, Output};
use crate::tools::shredder::SecureShredderAdapter;
use crate::tools::{InputSpec, ToolAdapter};

#[derive(Args)]
pub struct ShredArgs {
    /// Files or folders to destroy
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Number of overwrite passes
    #[arg(long)]
    pub passes: Option<u32>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub force: bool,
}

pub async fn execute(args: ShredArgs, globals: &Globals, output: &Output) -> Result<()> {
    let mut shredder = serde_json::Map::new();
    if let Some(passes) = args.passes {
        shredder.insert("passes".into(), passes.into());
    }
    let config = load_config(globals, serde_json::json!({ "shredder": shredder }))?;

    if !args.force {
        let prompt = format!(
            "Permanently destroy {} selected path(s)? This cannot be undone",
            args.paths.len()
        );
        if !output.confirm(&prompt) {
            output.info("aborted");
            return Ok(());
        }
    }

    // Built directly so the directory skeletons can be removed after the run.
    let adapter = Arc::new(SecureShredderAdapter::new(config.shredder.clone()));
    let input = InputSpec::new(args.paths);
    let report = run_job(
        &config,
        Arc::clone(&adapter) as Arc<dyn ToolAdapter>,
        &input,
        output,
        "shredding",
    )
    .await?;

    if report.is_clean() && report.skipped == 0 {
        let removed = adapter.remove_empty_dirs();
        if removed > 0 {
            output.verbose(&format!("removed {removed} empty folders"));
        }
    }

    exit_for(&report)
}

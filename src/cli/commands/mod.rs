//! Command implementations.
//!
//! Each batch command follows the same shape: fold its flags into config
//! overrides, build the adapter through the registry, submit the job, and
//! drive the progress stream into the terminal.

use anyhow::Result;
use indicatif::ProgressBar;
use std::sync::Arc;

use crate::cli::{Globals, Output};
use crate::config::ForgeConfig;
use crate::job::{JobReport, JobScheduler, Outcome, ProgressEvent};
use crate::tools::{InputSpec, ToolAdapter};

pub mod analyze;
pub mod cleanup;
pub mod compress;
pub mod convert;
pub mod duplicates;
pub mod info;
pub mod pdfops;
pub mod shred;
pub mod tools;

/// Load configuration with global and command-specific CLI overrides merged
/// on top (flags always win over files and environment).
pub(crate) fn load_config(
    globals: &Globals,
    tool_overrides: serde_json::Value,
) -> Result<ForgeConfig> {
    let mut overrides = globals.job_overrides();
    if let (Some(base), Some(extra)) = (overrides.as_object_mut(), tool_overrides.as_object()) {
        for (key, value) in extra {
            base.insert(key.clone(), value.clone());
        }
    }
    ForgeConfig::load(globals.config.as_deref(), Some(overrides))
}

/// Submit a batch and render its progress stream: a live bar fed by
/// `ItemDone` events, warnings for failures as they arrive, and the final
/// report summary. Ctrl-C requests cooperative cancellation.
pub(crate) async fn run_job(
    config: &ForgeConfig,
    adapter: Arc<dyn ToolAdapter>,
    input: &InputSpec,
    output: &Output,
    label: &str,
) -> Result<JobReport> {
    let scheduler = JobScheduler::new(config.job_options(adapter.io_bound()));
    let handle = scheduler.submit(adapter, input)?;

    let token = handle.cancel_token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let mut bar: Option<ProgressBar> = None;
    let report = handle.run(|event| match event {
        ProgressEvent::Started { total } => {
            bar = Some(output.progress_bar(*total as u64, label));
        }
        ProgressEvent::ItemDone { result } => {
            if let Some(bar) = &bar {
                bar.inc(1);
            }
            if let Outcome::Failed { message, .. } = &result.outcome {
                if let Some(bar) = &bar {
                    bar.suspend(|| output.warning(message));
                }
            }
        }
        ProgressEvent::BatchCancelled => {
            if let Some(bar) = &bar {
                bar.abandon();
            }
            output.warning("cancelled - keeping completed results");
        }
        ProgressEvent::BatchFailed { reason } => {
            output.error(reason);
        }
        ProgressEvent::BatchCompleted { .. } => {
            if let Some(bar) = &bar {
                bar.finish_and_clear();
            }
        }
    });
    ctrl_c.abort();

    let report = report?;
    output.report_summary(&report);
    Ok(report)
}

/// Standard exit for batch commands: non-zero when any item failed.
pub(crate) fn exit_for(report: &JobReport) -> Result<()> {
    if !report.is_clean() {
        std::process::exit(1);
    }
    Ok(())
}

/// Output format shared by the reporting commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON format
    Json,
}

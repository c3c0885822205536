//! Job execution and progress pipeline.
//!
//! This module is the concurrency core of the toolkit. Every tool is a
//! pluggable unit of work against this pipeline; the pipeline itself knows
//! nothing about PDFs, hashes, or shredding.
//!
//! # Architecture responsibilities
//!
//! ## What this module does:
//! - **Work distribution**: FIFO dispatch of validated work items across a
//!   bounded pool of worker threads sized from the available CPU cores
//! - **Progress streaming**: one ordered, back-pressured event channel per
//!   job ([`ProgressEvent`]), never dropping an item
//! - **Failure isolation**: panics and per-item errors become `Failed`
//!   results; the batch keeps going
//! - **Cancellation and deadlines**: cooperative cancel token plus an
//!   optional per-item timeout that reclaims the worker slot
//! - **Deterministic reporting**: a [`JobReport`] whose per-item sequence
//!   follows the original input order regardless of completion order
//!
//! ## What this module does NOT do:
//! - **Domain logic**: expanding a user selection into work items and
//!   executing one item are the tool adapter's job (see [`crate::tools`])
//! - **Presentation**: rendering progress bars or summaries belongs to the
//!   consumer of the event stream
//!
//! # Example
//!
//! ```rust,no_run
//! use fileforge::job::JobScheduler;
//! use fileforge::tools::{InputSpec, ToolRegistry, ToolKind};
//! use fileforge::config::ForgeConfig;
//!
//! # fn demo() -> anyhow::Result<()> {
//! let config = ForgeConfig::default();
//! let registry = ToolRegistry::new(config.clone());
//! let adapter = registry.build(ToolKind::Compress);
//!
//! let scheduler = JobScheduler::new(config.job_options(adapter.io_bound()));
//! let input = InputSpec::new(vec!["notes.txt".into()]).with_output(Some("out".into()));
//! let handle = scheduler.submit(adapter, &input)?;
//! let report = handle.run(|event| println!("{event:?}"))?;
//! assert_eq!(report.total, report.succeeded + report.failed + report.skipped);
//! # Ok(())
//! # }
//! ```

pub mod item;
pub mod progress;
pub mod report;
pub mod scheduler;
pub mod token;

pub use item::{classify_error, ErrorKind, InvalidInput, Outcome, WorkItem, WorkItemId, WorkPayload, WorkResult};
pub use progress::{ProgressEvent, ProgressReceiver, ProgressSender};
pub use report::JobReport;
pub use scheduler::{JobHandle, JobOptions, JobScheduler};
pub use token::CancelToken;

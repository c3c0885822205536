//! # fileforge - Batch File Utilities
//!
//! A toolkit of long-running, file-system-touching operations (format
//! conversion, compression, duplicate detection, disk analysis, secure
//! deletion) built around one concurrent job pipeline.
//!
//! ## Features
//!
//! - **One pipeline, many tools**: every utility plugs into the same
//!   validate/execute contract and inherits parallelism, progress,
//!   cancellation, and reporting for free
//! - **Failure isolation**: one bad file out of 500 never aborts the batch
//! - **Deterministic reports**: per-item results in input order, identical
//!   across re-runs
//! - **Cooperative cancellation**: Ctrl-C drains cleanly and keeps the work
//!   already done
//!
//! ## Quick Start
//!
//! ```bash
//! # Install fileforge
//! cargo install fileforge
//!
//! # Find duplicate photos
//! fileforge duplicates ~/Pictures
//!
//! # Merge two PDFs
//! fileforge pdf merge a.pdf b.pdf --out combined.pdf
//! ```

pub mod cli;
pub mod config;
pub mod external;
pub mod job;
pub mod system;
pub mod tools;
pub mod utils;

pub use cli::{Cli, Output};
pub use config::ForgeConfig;

/// Result type alias for fileforge operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

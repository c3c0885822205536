//! Work item and work result model.
//!
//! A batch is a list of [`WorkItem`]s produced by a tool's `validate` step.
//! Each item is executed exactly once and yields exactly one [`WorkResult`].

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Identifier for one unit of work, unique within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WorkItemId(u64);

impl std::fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tool-specific description of what a work item operates on.
#[derive(Debug, Clone)]
pub enum WorkPayload {
    /// A single file or directory (hash it, measure it, delete it, ...).
    Path(PathBuf),
    /// One source file producing one destination (convert, compress).
    Transfer { source: PathBuf, dest: PathBuf },
    /// Several sources combined into one destination (merge).
    Gather { sources: Vec<PathBuf>, dest: PathBuf },
    /// A 1-indexed, inclusive page range extracted from a source document.
    PageRange {
        source: PathBuf,
        start: u32,
        end: u32,
        dest: PathBuf,
    },
}

/// One unit of work derived from the user's input selection.
///
/// Immutable once created; workers only read it.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: WorkItemId,
    pub payload: WorkPayload,
    /// Rough size of the work in bytes, for progress display and scheduling.
    pub size_hint: u64,
}

impl WorkItem {
    pub fn new(id: u64, payload: WorkPayload, size_hint: u64) -> Self {
        Self {
            id: WorkItemId(id),
            payload,
            size_hint,
        }
    }

    /// Primary path of the payload, for display and logging.
    pub fn primary_path(&self) -> &Path {
        match &self.payload {
            WorkPayload::Path(path) => path,
            WorkPayload::Transfer { source, .. } => source,
            WorkPayload::Gather { dest, .. } => dest,
            WorkPayload::PageRange { source, .. } => source,
        }
    }
}

/// Classification of a failed work result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The user selection was rejected before the job started.
    InvalidInput,
    /// Filesystem read/write failure.
    Io,
    /// An external converter binary was missing or failed.
    External,
    /// The item exceeded its execution deadline.
    Timeout,
    /// The adapter hit a bug (caught panic or impossible state).
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::Io => "I/O error",
            ErrorKind::External => "external tool",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Internal => "internal error",
        };
        f.write_str(name)
    }
}

/// Rejected user selection. Raised by `validate`; the job is never created and
/// no progress events are emitted.
#[derive(Debug, Error)]
#[error("invalid input: {0}")]
pub struct InvalidInput(pub String);

/// Outcome of executing one work item.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The item completed; `artifact` points at the produced output, if any.
    Success { artifact: Option<PathBuf> },
    /// The item was deliberately not processed (cancelled, filtered out).
    Skipped { reason: String },
    /// The item failed; the batch continues regardless.
    Failed { kind: ErrorKind, message: String },
}

/// Result of one executed work item. Created exactly once per item.
#[derive(Debug, Clone)]
pub struct WorkResult {
    pub item_id: WorkItemId,
    pub outcome: Outcome,
    pub bytes_processed: u64,
}

impl WorkResult {
    pub fn success(item_id: WorkItemId, artifact: Option<PathBuf>, bytes_processed: u64) -> Self {
        Self {
            item_id,
            outcome: Outcome::Success { artifact },
            bytes_processed,
        }
    }

    pub fn skipped(item_id: WorkItemId, reason: impl Into<String>) -> Self {
        Self {
            item_id,
            outcome: Outcome::Skipped {
                reason: reason.into(),
            },
            bytes_processed: 0,
        }
    }

    pub fn failed(item_id: WorkItemId, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            item_id,
            outcome: Outcome::Failed {
                kind,
                message: message.into(),
            },
            bytes_processed: 0,
        }
    }

    /// Standard result for an item skipped because the job was cancelled.
    pub fn cancelled(item_id: WorkItemId) -> Self {
        Self::skipped(item_id, "cancelled")
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, Outcome::Skipped { .. })
    }
}

/// Map an adapter-level error into an [`ErrorKind`] for a `Failed` outcome.
pub fn classify_error(error: &anyhow::Error) -> ErrorKind {
    if error.downcast_ref::<std::io::Error>().is_some() {
        ErrorKind::Io
    } else if error
        .downcast_ref::<crate::external::ExternalToolError>()
        .is_some()
    {
        ErrorKind::External
    } else if error.downcast_ref::<InvalidInput>().is_some() {
        ErrorKind::InvalidInput
    } else {
        ErrorKind::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_is_skipped() {
        let item = WorkItem::new(7, WorkPayload::Path(PathBuf::from("/tmp/x")), 0);
        let result = WorkResult::cancelled(item.id);
        assert!(result.is_skipped());
        assert_eq!(result.bytes_processed, 0);
    }

    #[test]
    fn test_classify_io_error() {
        let err = anyhow::Error::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(classify_error(&err), ErrorKind::Io);
    }

    #[test]
    fn test_classify_unknown_error() {
        let err = anyhow::anyhow!("something odd");
        assert_eq!(classify_error(&err), ErrorKind::Internal);
    }
}

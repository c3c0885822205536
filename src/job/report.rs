use std::time::Duration;

use super::item::{Outcome, WorkResult};

/// Final immutable summary of a completed, cancelled, or failed batch.
///
/// Built once after the terminal condition is reached and safe to hand to
/// the presentation layer without further synchronization. `per_item` is
/// sorted by original work-item order regardless of completion order, so two
/// identical runs produce identical reports.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// One result per work item, in the order `validate` produced the items.
    pub per_item: Vec<WorkResult>,
    /// Wall-clock time from `Started` to the terminal event.
    pub elapsed: Duration,
}

impl JobReport {
    /// Assemble a report from `(input_index, result)` pairs collected from
    /// the workers in arrival order.
    pub(crate) fn from_results(mut results: Vec<(usize, WorkResult)>, elapsed: Duration) -> Self {
        results.sort_by_key(|(index, _)| *index);
        let per_item: Vec<WorkResult> = results.into_iter().map(|(_, result)| result).collect();

        let mut succeeded = 0;
        let mut failed = 0;
        let mut skipped = 0;
        for result in &per_item {
            match result.outcome {
                Outcome::Success { .. } => succeeded += 1,
                Outcome::Failed { .. } => failed += 1,
                Outcome::Skipped { .. } => skipped += 1,
            }
        }

        Self {
            total: per_item.len(),
            succeeded,
            failed,
            skipped,
            per_item,
            elapsed,
        }
    }

    /// Total bytes processed across all successful items.
    pub fn bytes_processed(&self) -> u64 {
        self.per_item.iter().map(|r| r.bytes_processed).sum()
    }

    /// Iterate over failed results only.
    pub fn failures(&self) -> impl Iterator<Item = &WorkResult> {
        self.per_item.iter().filter(|r| r.is_failed())
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::item::{ErrorKind, WorkItem, WorkPayload};
    use std::path::PathBuf;

    fn item(id: u64) -> WorkItem {
        WorkItem::new(id, WorkPayload::Path(PathBuf::from(format!("f{id}"))), 0)
    }

    #[test]
    fn test_counts_add_up_and_order_is_canonical() {
        // Results arrive out of order; the report restores input order.
        let results = vec![
            (2, WorkResult::failed(item(2).id, ErrorKind::Io, "boom")),
            (0, WorkResult::success(item(0).id, None, 10)),
            (1, WorkResult::skipped(item(1).id, "cancelled")),
        ];

        let report = JobReport::from_results(results, Duration::from_millis(5));
        assert_eq!(report.total, 3);
        assert_eq!(
            report.succeeded + report.failed + report.skipped,
            report.total
        );
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.per_item[0].item_id, item(0).id);
        assert_eq!(report.per_item[2].item_id, item(2).id);
        assert_eq!(report.bytes_processed(), 10);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_empty_report() {
        let report = JobReport::from_results(Vec::new(), Duration::ZERO);
        assert_eq!(report.total, 0);
        assert!(report.is_clean());
    }
}

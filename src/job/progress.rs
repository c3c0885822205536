//! Ordered, back-pressured progress stream from a job's workers to the
//! consumer.
//!
//! One channel exists per job; events from different jobs never interleave.
//! The stream follows a strict protocol: exactly one `Started` first, zero or
//! more `ItemDone`, and exactly one terminal event last. The channel is
//! bounded, so producers block instead of dropping events when the consumer
//! is slow.

use crossbeam::channel::{bounded, Receiver, Sender};

use super::item::WorkResult;
use super::report::JobReport;

/// Progress event emitted while a job runs.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// The batch was accepted; `total` items will each produce one `ItemDone`.
    Started { total: usize },
    /// One work item finished (in arrival order, not input order).
    ItemDone { result: WorkResult },
    /// Terminal: the job was cancelled after a cooperative drain. The partial
    /// report is available from `JobHandle::wait`.
    BatchCancelled,
    /// Terminal: a scheduler-level fault stopped the job.
    BatchFailed { reason: String },
    /// Terminal: all items were processed.
    BatchCompleted { report: JobReport },
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::BatchCancelled
                | ProgressEvent::BatchFailed { .. }
                | ProgressEvent::BatchCompleted { .. }
        )
    }
}

/// Create a bounded progress channel for one job.
pub fn progress_channel(capacity: usize) -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    (ProgressSender { tx }, ProgressReceiver { rx })
}

/// Sending half, cloned into each worker.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: Sender<ProgressEvent>,
}

impl ProgressSender {
    /// Send an event, blocking while the channel is full. If the receiver is
    /// gone the consumer has walked away and the event is discarded.
    pub fn send(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// Receiving half, held by the job consumer.
#[derive(Debug)]
pub struct ProgressReceiver {
    rx: Receiver<ProgressEvent>,
}

impl ProgressReceiver {
    /// Block for the next event. `None` once all senders are gone.
    pub fn recv(&self) -> Option<ProgressEvent> {
        self.rx.recv().ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = ProgressEvent> + '_ {
        self.rx.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::item::{WorkItem, WorkPayload, WorkResult};
    use std::path::PathBuf;

    #[test]
    fn test_events_arrive_in_order() {
        let (tx, rx) = progress_channel(8);
        let item = WorkItem::new(0, WorkPayload::Path(PathBuf::from("a")), 0);

        tx.send(ProgressEvent::Started { total: 1 });
        tx.send(ProgressEvent::ItemDone {
            result: WorkResult::skipped(item.id, "test"),
        });
        tx.send(ProgressEvent::BatchCancelled);
        drop(tx);

        let events: Vec<_> = rx.iter().collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], ProgressEvent::Started { total: 1 }));
        assert!(matches!(events[1], ProgressEvent::ItemDone { .. }));
        assert!(events[2].is_terminal());
    }

    #[test]
    fn test_send_after_receiver_dropped_is_discarded() {
        let (tx, rx) = progress_channel(1);
        drop(rx);
        // Must not block or panic.
        tx.send(ProgressEvent::Started { total: 0 });
    }
}

//! Batch execution across a bounded worker pool.
//!
//! The scheduler validates a user selection into work items, fans the items
//! out to worker threads over bounded crossbeam channels, and aggregates the
//! per-item results into a [`JobReport`]. Item failures are isolated: one
//! failed item never stops the batch. `BatchFailed` is reserved for
//! scheduler-level faults such as being unable to spawn any worker.

use anyhow::{anyhow, Result};
use crossbeam::channel::{bounded, Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

use super::item::{ErrorKind, WorkItem, WorkResult};
use super::progress::{progress_channel, ProgressEvent, ProgressReceiver, ProgressSender};
use super::report::JobReport;
use super::token::CancelToken;
use crate::tools::{InputSpec, ToolAdapter};

/// Tuning for one job run.
#[derive(Debug, Clone)]
pub struct JobOptions {
    /// Maximum number of worker threads (0 = derive from CPU cores).
    pub max_workers: usize,
    /// Percentage of CPU cores to use when deriving the worker count (1-100).
    pub thread_percentage: u8,
    /// Per-item execution deadline. `None` disables the deadline.
    pub item_timeout: Option<Duration>,
    /// Channel buffer size multiplier (buffer = workers * multiplier).
    pub channel_buffer_multiplier: usize,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            max_workers: 0,
            thread_percentage: 75,
            item_timeout: None,
            channel_buffer_multiplier: 2,
        }
    }
}

/// Concurrency-bounded executor running work items through a tool adapter.
#[derive(Debug, Default)]
pub struct JobScheduler {
    options: JobOptions,
}

impl JobScheduler {
    pub fn new(options: JobOptions) -> Self {
        Self { options }
    }

    /// Calculate the worker count for a batch of `work_count` items.
    pub fn worker_count(&self, work_count: usize) -> usize {
        let cpu_cores = num_cpus::get();
        let max_by_percentage =
            std::cmp::max(1, (cpu_cores * self.options.thread_percentage as usize) / 100);

        let max_workers = if self.options.max_workers > 0 {
            std::cmp::min(self.options.max_workers, max_by_percentage)
        } else {
            max_by_percentage
        };

        // Don't create more workers than work items.
        std::cmp::min(max_workers, work_count.max(1))
    }

    /// Validate the input synchronously, then run the batch on a coordinator
    /// thread. Validation failures (`InvalidInput`) mean no job is created
    /// and no progress events are ever emitted.
    pub fn submit(&self, adapter: Arc<dyn ToolAdapter>, input: &InputSpec) -> Result<JobHandle> {
        let items = adapter.validate(input)?;
        let total = items.len();
        let workers = self.worker_count(total);
        let job_id = Uuid::new_v4();
        debug!(%job_id, tool = %adapter.kind(), total, workers, "job accepted");

        let (progress_tx, progress_rx) =
            progress_channel(workers * self.options.channel_buffer_multiplier + 2);
        let cancel = CancelToken::new();

        let options = self.options.clone();
        let token = cancel.clone();
        let coordinator = thread::Builder::new()
            .name("fileforge-job".into())
            .spawn(move || run_batch(job_id, adapter, items, options, workers, token, progress_tx))
            .map_err(|e| anyhow!("failed to spawn job coordinator: {e}"))?;

        Ok(JobHandle {
            job_id,
            cancel,
            events: progress_rx,
            coordinator,
        })
    }
}

/// Handle to a running job: progress stream, cancellation, final report.
#[derive(Debug)]
pub struct JobHandle {
    job_id: Uuid,
    cancel: CancelToken,
    events: ProgressReceiver,
    coordinator: JoinHandle<Result<JobReport>>,
}

impl JobHandle {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Request cooperative cancellation. In-flight items observing the token
    /// finish as skipped; completed results are kept.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn events(&self) -> &ProgressReceiver {
        &self.events
    }

    /// Drain events through `on_event` until the terminal event, then return
    /// the final report.
    pub fn run(self, mut on_event: impl FnMut(&ProgressEvent)) -> Result<JobReport> {
        while let Some(event) = self.events.recv() {
            let terminal = event.is_terminal();
            on_event(&event);
            if terminal {
                break;
            }
        }
        self.wait()
    }

    /// Wait for the job to finish. Remaining progress events are discarded,
    /// which also unblocks any producer waiting on a full channel.
    pub fn wait(self) -> Result<JobReport> {
        let Self {
            events, coordinator, ..
        } = self;
        drop(events);
        coordinator
            .join()
            .map_err(|_| anyhow!("job coordinator panicked"))?
    }
}

fn run_batch(
    job_id: Uuid,
    adapter: Arc<dyn ToolAdapter>,
    items: Vec<WorkItem>,
    options: JobOptions,
    workers: usize,
    cancel: CancelToken,
    progress: ProgressSender,
) -> Result<JobReport> {
    let start = Instant::now();
    let total = items.len();
    progress.send(ProgressEvent::Started { total });

    if total == 0 {
        let report = JobReport::from_results(Vec::new(), start.elapsed());
        progress.send(ProgressEvent::BatchCompleted {
            report: report.clone(),
        });
        return Ok(report);
    }

    let buffer = workers * options.channel_buffer_multiplier;
    let (work_tx, work_rx): (Sender<(usize, WorkItem)>, Receiver<(usize, WorkItem)>) =
        bounded(buffer);
    let (result_tx, result_rx): (Sender<(usize, WorkResult)>, Receiver<(usize, WorkResult)>) =
        bounded(buffer * 2);

    let mut pool = Vec::with_capacity(workers);
    for worker_id in 0..workers {
        let work_rx = work_rx.clone();
        let result_tx = result_tx.clone();
        let progress = progress.clone();
        let cancel = cancel.clone();
        let adapter = Arc::clone(&adapter);
        let timeout = options.item_timeout;

        let handle = thread::Builder::new()
            .name(format!("fileforge-worker-{worker_id}"))
            .spawn(move || worker_loop(adapter, work_rx, result_tx, progress, cancel, timeout));
        match handle {
            Ok(handle) => pool.push(handle),
            Err(e) => warn!(%job_id, worker_id, "failed to spawn worker: {e}"),
        }
    }
    drop(work_rx);
    drop(result_tx);

    if pool.is_empty() {
        let reason = format!("could not spawn any worker threads for {total} items");
        progress.send(ProgressEvent::BatchFailed {
            reason: reason.clone(),
        });
        return Err(anyhow!(reason));
    }

    // Feed the queue in input order on its own thread so the bounded work
    // channel cannot deadlock against result collection.
    let feeder = thread::Builder::new().name("fileforge-feeder".into()).spawn({
        move || {
            for pair in items.into_iter().enumerate() {
                if work_tx.send(pair).is_err() {
                    break; // workers dropped
                }
            }
        }
    });
    if let Err(e) = &feeder {
        // The work sender was dropped with the failed closure, so the pool
        // drains and exits on its own.
        let reason = format!("could not spawn feeder thread: {e}");
        for handle in pool {
            let _ = handle.join();
        }
        progress.send(ProgressEvent::BatchFailed {
            reason: reason.clone(),
        });
        return Err(anyhow!(reason));
    }

    // Collect exactly one result per item.
    let mut collected: Vec<(usize, WorkResult)> = Vec::with_capacity(total);
    while collected.len() < total {
        match result_rx.recv() {
            Ok(pair) => collected.push(pair),
            Err(_) => break, // every worker is gone
        }
    }

    if let Ok(feeder) = feeder {
        let _ = feeder.join();
    }
    for handle in pool {
        let _ = handle.join();
    }

    if collected.len() < total {
        let reason = format!(
            "worker pool terminated early ({}/{} results)",
            collected.len(),
            total
        );
        progress.send(ProgressEvent::BatchFailed {
            reason: reason.clone(),
        });
        return Err(anyhow!(reason));
    }

    let report = JobReport::from_results(collected, start.elapsed());
    debug!(
        %job_id,
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "job finished"
    );

    if cancel.is_cancelled() {
        progress.send(ProgressEvent::BatchCancelled);
    } else {
        progress.send(ProgressEvent::BatchCompleted {
            report: report.clone(),
        });
    }
    Ok(report)
}

fn worker_loop(
    adapter: Arc<dyn ToolAdapter>,
    work_rx: Receiver<(usize, WorkItem)>,
    result_tx: Sender<(usize, WorkResult)>,
    progress: ProgressSender,
    cancel: CancelToken,
    timeout: Option<Duration>,
) {
    while let Ok((index, item)) = work_rx.recv() {
        let result = if cancel.is_cancelled() {
            WorkResult::cancelled(item.id)
        } else {
            execute_one(&adapter, &item, &cancel, timeout)
        };

        // ItemDone goes out before the result is handed to the collector, so
        // the terminal event (sent after all results are in) is always last.
        progress.send(ProgressEvent::ItemDone {
            result: result.clone(),
        });
        if result_tx.send((index, result)).is_err() {
            break; // collector dropped
        }
    }
}

/// Run one item, with an optional deadline.
///
/// A timed item runs on a sacrificial thread: when the deadline passes, the
/// worker slot records `Failed(Timeout)` and moves on. The abandoned call may
/// run to completion in the background; its result is discarded. Adapters
/// wrapping non-cancellable external calls cannot be interrupted harder than
/// this.
fn execute_one(
    adapter: &Arc<dyn ToolAdapter>,
    item: &WorkItem,
    cancel: &CancelToken,
    timeout: Option<Duration>,
) -> WorkResult {
    let Some(limit) = timeout else {
        return execute_guarded(adapter.as_ref(), item, cancel);
    };

    let (tx, rx) = mpsc::sync_channel(1);
    let adapter = Arc::clone(adapter);
    let timed_item = item.clone();
    let timed_cancel = cancel.clone();
    let spawned = thread::Builder::new()
        .name("fileforge-timed-item".into())
        .spawn(move || {
            let result = execute_guarded(adapter.as_ref(), &timed_item, &timed_cancel);
            let _ = tx.send(result);
        });

    if spawned.is_err() {
        return WorkResult::failed(
            item.id,
            ErrorKind::Internal,
            "could not spawn timed execution thread",
        );
    }

    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(_) => {
            warn!(item = %item.id, "item exceeded {}ms deadline", limit.as_millis());
            WorkResult::failed(
                item.id,
                ErrorKind::Timeout,
                format!("no result within {}ms", limit.as_millis()),
            )
        }
    }
}

/// Call `execute` with panic isolation: an adapter bug becomes a `Failed`
/// result instead of taking down the worker pool.
fn execute_guarded(adapter: &dyn ToolAdapter, item: &WorkItem, cancel: &CancelToken) -> WorkResult {
    match panic::catch_unwind(AssertUnwindSafe(|| adapter.execute(item, cancel))) {
        Ok(result) => result,
        Err(payload) => {
            let message = if let Some(s) = payload.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            WorkResult::failed(
                item.id,
                ErrorKind::Internal,
                format!("execute panicked: {message}"),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::item::{InvalidInput, Outcome, WorkPayload};
    use crate::tools::ToolKind;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type ExecuteFn = dyn Fn(&WorkItem, &CancelToken) -> WorkResult + Send + Sync;

    /// Test adapter producing one item per input path.
    struct FnAdapter {
        execute: Box<ExecuteFn>,
    }

    impl FnAdapter {
        fn new(execute: impl Fn(&WorkItem, &CancelToken) -> WorkResult + Send + Sync + 'static) -> Arc<Self> {
            Arc::new(Self {
                execute: Box::new(execute),
            })
        }
    }

    impl ToolAdapter for FnAdapter {
        fn kind(&self) -> ToolKind {
            ToolKind::Compress
        }

        fn validate(&self, input: &InputSpec) -> Result<Vec<WorkItem>> {
            if input.paths.is_empty() {
                return Err(InvalidInput("no input files selected".into()).into());
            }
            Ok(input
                .paths
                .iter()
                .enumerate()
                .map(|(i, p)| WorkItem::new(i as u64, WorkPayload::Path(p.clone()), 1))
                .collect())
        }

        fn execute(&self, item: &WorkItem, cancel: &CancelToken) -> WorkResult {
            (self.execute)(item, cancel)
        }
    }

    fn input(n: usize) -> InputSpec {
        InputSpec::new((0..n).map(|i| PathBuf::from(format!("file-{i}"))).collect())
    }

    #[test]
    fn test_event_protocol_and_report_totals() {
        let adapter = FnAdapter::new(|item, _| WorkResult::success(item.id, None, 3));
        let scheduler = JobScheduler::default();
        let handle = scheduler.submit(adapter, &input(5)).unwrap();

        let mut events = Vec::new();
        let report = handle.run(|event| events.push(event.clone())).unwrap();

        assert_eq!(report.total, 5);
        assert_eq!(report.succeeded, 5);
        assert_eq!(report.failed + report.skipped, 0);
        assert_eq!(report.bytes_processed(), 15);

        assert!(matches!(events[0], ProgressEvent::Started { total: 5 }));
        assert!(events.last().unwrap().is_terminal());
        let item_done = events
            .iter()
            .filter(|e| matches!(e, ProgressEvent::ItemDone { .. }))
            .count();
        assert_eq!(item_done, 5);
        let terminal = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminal, 1);
    }

    #[test]
    fn test_panicking_item_is_isolated() {
        let adapter = FnAdapter::new(|item, _| {
            if item.primary_path() == PathBuf::from("file-2") {
                panic!("adapter bug");
            }
            WorkResult::success(item.id, None, 1)
        });
        let scheduler = JobScheduler::default();
        let report = scheduler
            .submit(adapter, &input(5))
            .unwrap()
            .run(|_| {})
            .unwrap();

        assert_eq!(report.total, 5);
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 0);
        let failure = report.failures().next().unwrap();
        match &failure.outcome {
            Outcome::Failed { kind, message } => {
                assert_eq!(*kind, ErrorKind::Internal);
                assert!(message.contains("adapter bug"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_cancel_before_items_start() {
        // Items wait for the token, so nothing completes before cancellation.
        let adapter = FnAdapter::new(|item, cancel| {
            while !cancel.is_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
            WorkResult::cancelled(item.id)
        });
        let scheduler = JobScheduler::default();
        let handle = scheduler.submit(adapter, &input(4)).unwrap();
        handle.cancel();

        let mut saw_cancelled = false;
        let report = handle
            .run(|event| {
                if matches!(event, ProgressEvent::BatchCancelled) {
                    saw_cancelled = true;
                }
            })
            .unwrap();

        assert!(saw_cancelled);
        assert_eq!(report.total, 4);
        assert_eq!(report.skipped, 4);
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn test_item_timeout_reclaims_worker_slot() {
        let adapter = FnAdapter::new(|item, _| {
            thread::sleep(Duration::from_secs(5));
            WorkResult::success(item.id, None, 1)
        });
        let scheduler = JobScheduler::new(JobOptions {
            max_workers: 2,
            item_timeout: Some(Duration::from_millis(100)),
            ..JobOptions::default()
        });

        let start = Instant::now();
        let report = scheduler
            .submit(adapter, &input(2))
            .unwrap()
            .run(|_| {})
            .unwrap();

        assert_eq!(report.total, 2);
        assert_eq!(report.failed, 2);
        for failure in report.failures() {
            match &failure.outcome {
                Outcome::Failed { kind, .. } => assert_eq!(*kind, ErrorKind::Timeout),
                other => panic!("expected timeout, got {other:?}"),
            }
        }
        // Slots were reclaimed at the deadline, not after the full sleep.
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_timed_out_items_do_not_block_remaining_items() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&counter);
        let adapter = FnAdapter::new(move |item, _| {
            seen.fetch_add(1, Ordering::Relaxed);
            if item.primary_path() == PathBuf::from("file-0") {
                thread::sleep(Duration::from_secs(5));
            }
            WorkResult::success(item.id, None, 1)
        });
        let scheduler = JobScheduler::new(JobOptions {
            max_workers: 1,
            item_timeout: Some(Duration::from_millis(100)),
            ..JobOptions::default()
        });

        let report = scheduler
            .submit(adapter, &input(3))
            .unwrap()
            .run(|_| {})
            .unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.succeeded, 2);
        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_invalid_input_fails_fast() {
        let adapter = FnAdapter::new(|item, _| WorkResult::success(item.id, None, 0));
        let scheduler = JobScheduler::default();
        let error = scheduler.submit(adapter, &input(0)).unwrap_err();
        assert!(error.downcast_ref::<InvalidInput>().is_some());
    }

    #[test]
    fn test_identical_batches_yield_identical_counts() {
        let make = || {
            FnAdapter::new(|item, _| {
                if item.primary_path().to_string_lossy().ends_with('3') {
                    WorkResult::failed(item.id, ErrorKind::Io, "always fails")
                } else {
                    WorkResult::success(item.id, None, 2)
                }
            })
        };
        let scheduler = JobScheduler::default();
        let first = scheduler.submit(make(), &input(6)).unwrap().run(|_| {}).unwrap();
        let second = scheduler.submit(make(), &input(6)).unwrap().run(|_| {}).unwrap();

        assert_eq!(first.succeeded, second.succeeded);
        assert_eq!(first.failed, second.failed);
        assert_eq!(first.skipped, second.skipped);
    }

    #[test]
    fn test_worker_count_bounds() {
        let scheduler = JobScheduler::default();
        let workers = scheduler.worker_count(2);
        assert!(workers >= 1);
        assert!(workers <= 2);

        let capped = JobScheduler::new(JobOptions {
            max_workers: 1,
            ..JobOptions::default()
        });
        assert_eq!(capped.worker_count(100), 1);
    }
}

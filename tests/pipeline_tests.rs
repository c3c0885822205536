//! End-to-end tests for the job pipeline running real tool adapters.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use fileforge::config::ForgeConfig;
use fileforge::job::{JobScheduler, ProgressEvent};
use fileforge::tools::shredder::SecureShredderAdapter;
use fileforge::tools::{InputSpec, ToolAdapter, ToolKind, ToolRegistry};

fn registry() -> ToolRegistry {
    ToolRegistry::new(ForgeConfig::default())
}

fn scheduler_for(adapter: &dyn ToolAdapter) -> JobScheduler {
    JobScheduler::new(ForgeConfig::default().job_options(adapter.io_bound()))
}

/// A batch over real files follows the event protocol: one `Started`, one
/// `ItemDone` per item, one terminal event, in that order.
#[test]
fn test_compress_batch_event_protocol() {
    let dir = TempDir::new().unwrap();
    let mut paths = Vec::new();
    for i in 0..4 {
        let path = dir.path().join(format!("doc-{i}.txt"));
        fs::write(&path, "filler ".repeat(500)).unwrap();
        paths.push(path);
    }

    let registry = registry();
    let adapter = registry.build(ToolKind::Compress);
    let scheduler = scheduler_for(adapter.as_ref());
    let handle = scheduler
        .submit(adapter, &InputSpec::new(paths))
        .unwrap();

    let mut events = Vec::new();
    let report = handle.run(|event| events.push(event.clone())).unwrap();

    assert!(matches!(events[0], ProgressEvent::Started { total: 4 }));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, ProgressEvent::ItemDone { .. }))
            .count(),
        4
    );
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(events.last().unwrap().is_terminal());

    assert_eq!(report.total, 4);
    assert_eq!(report.succeeded, 4);
    assert_eq!(report.succeeded + report.failed + report.skipped, report.total);
    for i in 0..4 {
        assert!(dir.path().join(format!("doc-{i}.zip")).is_file());
    }
}

/// One item that cannot produce its archive fails alone; the rest of the
/// batch completes.
#[test]
fn test_failure_is_isolated_to_one_item() {
    let dir = TempDir::new().unwrap();
    let mut paths = Vec::new();
    for i in 0..5 {
        let path = dir.path().join(format!("doc-{i}.txt"));
        fs::write(&path, "content").unwrap();
        paths.push(path);
    }

    // A directory squatting on doc-2's destination makes that one item fail.
    let out = dir.path().join("out");
    fs::create_dir_all(out.join("doc-2.zip")).unwrap();

    let registry = registry();
    let adapter = registry.build(ToolKind::Compress);
    let scheduler = scheduler_for(adapter.as_ref());
    let report = scheduler
        .submit(
            adapter,
            &InputSpec::new(paths).with_output(Some(out.clone())),
        )
        .unwrap()
        .run(|_| {})
        .unwrap();

    assert_eq!(report.total, 5);
    assert_eq!(report.failed, 1);
    assert_eq!(report.succeeded, 4);
    assert_eq!(report.skipped, 0);
    assert!(out.join("doc-0.zip").is_file());
    assert!(out.join("doc-4.zip").is_file());
}

/// Shredding through the scheduler removes every file and reports
/// overwritten byte counts.
#[test]
fn test_shred_batch_end_to_end() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("vault");
    fs::create_dir_all(root.join("deep")).unwrap();
    fs::write(root.join("a.key"), vec![1u8; 256]).unwrap();
    fs::write(root.join("deep/b.key"), vec![2u8; 128]).unwrap();

    let config = ForgeConfig::default();
    let adapter = Arc::new(SecureShredderAdapter::new(config.shredder.clone()));
    let scheduler = JobScheduler::new(config.job_options(adapter.io_bound()));
    let report = scheduler
        .submit(
            Arc::clone(&adapter) as Arc<dyn ToolAdapter>,
            &InputSpec::new(vec![root.clone()]),
        )
        .unwrap()
        .run(|_| {})
        .unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.succeeded, 2);
    // Default is three passes over every byte.
    assert_eq!(report.bytes_processed(), 3 * (256 + 128));

    adapter.remove_empty_dirs();
    assert!(!root.exists());
}

/// Cleaning a folder through the pipeline frees the measured bytes.
#[test]
fn test_cleanup_batch_end_to_end() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("stale.tmp"), vec![0u8; 64]).unwrap();
    fs::create_dir(dir.path().join("cache")).unwrap();
    fs::write(dir.path().join("cache/entry"), vec![0u8; 32]).unwrap();

    let registry = registry();
    let adapter = registry.build(ToolKind::DiskCleanup);
    let scheduler = scheduler_for(adapter.as_ref());
    let report = scheduler
        .submit(adapter, &InputSpec::new(vec![dir.path().to_path_buf()]))
        .unwrap()
        .run(|_| {})
        .unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.bytes_processed(), 96);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

/// Re-running an identical batch produces identical counts.
#[test]
fn test_identical_runs_identical_reports() {
    let dir = TempDir::new().unwrap();
    let mut paths = Vec::new();
    for i in 0..3 {
        let path = dir.path().join(format!("doc-{i}.txt"));
        fs::write(&path, "stable content").unwrap();
        paths.push(path);
    }

    let registry = registry();
    let run = |out: PathBuf| {
        let adapter = registry.build(ToolKind::Compress);
        let scheduler = scheduler_for(adapter.as_ref());
        scheduler
            .submit(
                adapter,
                &InputSpec::new(paths.clone()).with_output(Some(out)),
            )
            .unwrap()
            .run(|_| {})
            .unwrap()
    };

    let first = run(dir.path().join("out1"));
    let second = run(dir.path().join("out2"));

    assert_eq!(first.total, second.total);
    assert_eq!(first.succeeded, second.succeeded);
    assert_eq!(first.failed, second.failed);
    assert_eq!(first.skipped, second.skipped);
    assert_eq!(first.bytes_processed(), second.bytes_processed());
}

// tests/reporter.rs

use std::fs;
use std::time::Duration;

use taskwatch::config::ConfigCache;
use taskwatch::engine::{LifecycleEvent, LifecycleReporter, RunOutcome};
use taskwatch::types::ChangeKind;
use taskwatch::watch::ChangeAggregator;
use taskwatch_test_utils::SharedBuffer;
use tempfile::tempdir;

fn reporter() -> (LifecycleReporter<SharedBuffer>, ChangeAggregator, SharedBuffer) {
    let aggregator = ChangeAggregator::new();
    let out = SharedBuffer::new();
    let reporter = LifecycleReporter::new(aggregator.clone(), ".", out.clone());
    (reporter, aggregator, out)
}

fn end(duration: Duration, outcome: RunOutcome) -> LifecycleEvent {
    LifecycleEvent::End {
        run_id: 1,
        target: "scripts".to_string(),
        duration,
        outcome,
    }
}

#[test]
fn start_lists_changed_files_and_flushes() {
    let (mut reporter, aggregator, out) = reporter();
    let mut cache = ConfigCache::new();
    aggregator.record("src/a.js", ChangeKind::Added);
    aggregator.record("src/b.js", ChangeKind::Changed);

    let start = LifecycleEvent::Start {
        run_id: 1,
        target: "scripts".to_string(),
    };
    reporter.report(&start, &mut cache).unwrap();

    assert_eq!(
        out.lines(),
        vec![
            "OK".to_string(),
            "File \"src/a.js\" added.".to_string(),
            "File \"src/b.js\" changed.".to_string(),
        ]
    );
    assert!(aggregator.is_empty());

    // A second start with nothing recorded lists nothing.
    reporter.report(&start, &mut cache).unwrap();
    assert_eq!(out.lines().len(), 4);
}

#[test]
fn end_prints_completion_line_for_positive_durations() {
    let (mut reporter, _, out) = reporter();
    let mut cache = ConfigCache::new();

    reporter
        .report(&end(Duration::from_millis(1500), RunOutcome::Success), &mut cache)
        .unwrap();

    let lines = out.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("Completed in 1.500s at "), "{}", lines[0]);
    assert!(lines[0].ends_with(" - Waiting..."), "{}", lines[0]);
}

#[test]
fn end_with_zero_duration_prints_nothing() {
    let (mut reporter, _, out) = reporter();
    let mut cache = ConfigCache::new();

    reporter
        .report(&end(Duration::ZERO, RunOutcome::Success), &mut cache)
        .unwrap();

    assert!(out.contents().is_empty());
}

#[test]
fn failed_run_names_the_task() {
    let (mut reporter, _, out) = reporter();
    let mut cache = ConfigCache::new();

    let failed = RunOutcome::Failed {
        task: "lint".to_string(),
        code: 3,
    };
    reporter
        .report(&end(Duration::from_millis(10), failed), &mut cache)
        .unwrap();

    assert_eq!(out.lines()[0], "Task \"lint\" failed with exit code 3.");
}

#[test]
fn interrupt_prints_notice() {
    let (mut reporter, _, out) = reporter();
    let mut cache = ConfigCache::new();

    let interrupt = LifecycleEvent::Interrupt {
        run_id: 4,
        target: "scripts".to_string(),
    };
    reporter.report(&interrupt, &mut cache).unwrap();

    assert_eq!(out.lines(), vec!["Scheduled tasks have been interrupted...".to_string()]);
}

#[test]
fn reload_invalidates_changed_configs_without_flushing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Taskwatch.toml");
    fs::write(&path, "[target.a]\nfiles = \"a/*\"\n").unwrap();

    let aggregator = ChangeAggregator::new();
    let out = SharedBuffer::new();
    let mut reporter = LifecycleReporter::new(aggregator.clone(), dir.path(), out.clone());

    let mut cache = ConfigCache::new();
    cache.load(&path).unwrap();
    aggregator.record("Taskwatch.toml", ChangeKind::Changed);

    reporter.report(&LifecycleEvent::Reload, &mut cache).unwrap();

    assert!(cache.is_empty());
    assert_eq!(aggregator.kind_of("Taskwatch.toml"), Some(ChangeKind::Changed));
    assert_eq!(out.lines(), vec!["Reloading watch config...".to_string()]);
}

#[test]
fn waiting_and_error_lines() {
    let (mut reporter, _, out) = reporter();

    reporter.waiting().unwrap();
    reporter.error("Subscription failed: boom").unwrap();

    assert_eq!(
        out.lines(),
        vec![
            "Waiting...".to_string(),
            "ERROR".to_string(),
            ">> Subscription failed: boom".to_string(),
        ]
    );
}

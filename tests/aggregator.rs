// tests/aggregator.rs

use std::collections::BTreeMap;
use std::thread;

use proptest::prelude::*;
use taskwatch::types::ChangeKind;
use taskwatch::watch::ChangeAggregator;

#[test]
fn later_events_overwrite_earlier_ones() {
    let agg = ChangeAggregator::new();

    assert_eq!(agg.record("src/a.js", ChangeKind::Changed), None);
    assert_eq!(agg.record("src/a.js", ChangeKind::Deleted), Some(ChangeKind::Changed));

    assert_eq!(agg.len(), 1);
    assert_eq!(agg.kind_of("src/a.js"), Some(ChangeKind::Deleted));
}

#[test]
fn flush_returns_everything_and_leaves_it_empty() {
    let agg = ChangeAggregator::new();
    agg.record("b.js", ChangeKind::Added);
    agg.record("a.js", ChangeKind::Changed);

    let flushed = agg.flush_and_reset();

    assert_eq!(
        flushed.into_iter().collect::<Vec<_>>(),
        vec![
            ("a.js".to_string(), ChangeKind::Changed),
            ("b.js".to_string(), ChangeKind::Added),
        ]
    );
    assert!(agg.is_empty());
    assert!(agg.flush_and_reset().is_empty());
}

#[test]
fn paths_does_not_reset() {
    let agg = ChangeAggregator::new();
    agg.record("Taskwatch.toml", ChangeKind::Changed);

    assert_eq!(agg.paths(), vec!["Taskwatch.toml".to_string()]);
    assert_eq!(agg.len(), 1);
}

#[test]
fn clones_share_the_same_record() {
    let agg = ChangeAggregator::new();
    let handle = agg.clone();

    handle.record("x", ChangeKind::Added);
    assert_eq!(agg.kind_of("x"), Some(ChangeKind::Added));
}

#[test]
fn concurrent_records_are_never_lost() {
    let agg = ChangeAggregator::new();

    let workers: Vec<_> = (0..4)
        .map(|w| {
            let agg = agg.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    agg.record(format!("w{w}/f{i}"), ChangeKind::Changed);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(agg.flush_and_reset().len(), 400);
}

fn kind_strategy() -> impl Strategy<Value = ChangeKind> {
    prop_oneof![
        Just(ChangeKind::Added),
        Just(ChangeKind::Changed),
        Just(ChangeKind::Deleted),
    ]
}

proptest! {
    #[test]
    fn last_write_wins(events in proptest::collection::vec(("[a-d]", kind_strategy()), 0..50)) {
        let agg = ChangeAggregator::new();
        let mut expected = BTreeMap::new();

        for (path, kind) in &events {
            agg.record(path.clone(), *kind);
            expected.insert(path.clone(), *kind);
        }

        prop_assert_eq!(agg.flush_and_reset(), expected);
        prop_assert!(agg.is_empty());
    }
}

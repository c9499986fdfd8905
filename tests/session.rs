// tests/session.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::{AccessKind, CreateKind, DataChange, EventKind, ModifyKind, RemoveKind, RenameMode};
use notify::Event;
use taskwatch::engine::RuntimeEvent;
use taskwatch::errors::WatchFailure;
use taskwatch::types::ChangeKind;
use taskwatch::watch::path_utils::{event_path, relative_str};
use taskwatch::watch::{WatchSession, classify_event, open_sessions};
use taskwatch_test_utils::builders::{ConfigFileBuilder, TargetConfigBuilder};
use taskwatch_test_utils::{init_tracing, snapshot, with_timeout};
use tempfile::tempdir;
use tokio::sync::mpsc;

fn event(kind: EventKind, paths: &[&str]) -> Event {
    paths
        .iter()
        .fold(Event::new(kind), |e, p| e.add_path(PathBuf::from(p)))
}

fn kinds(event: &Event) -> Vec<(String, ChangeKind)> {
    classify_event(event)
        .into_iter()
        .map(|(p, k)| (p.to_string_lossy().into_owned(), k))
        .collect()
}

#[test]
fn create_remove_and_modify_map_to_change_kinds() {
    assert_eq!(
        kinds(&event(EventKind::Create(CreateKind::File), &["/nonexistent/a.js"])),
        vec![("/nonexistent/a.js".to_string(), ChangeKind::Added)]
    );
    assert_eq!(
        kinds(&event(EventKind::Remove(RemoveKind::File), &["/nonexistent/a.js"])),
        vec![("/nonexistent/a.js".to_string(), ChangeKind::Deleted)]
    );
    assert_eq!(
        kinds(&event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/nonexistent/a.js"]
        )),
        vec![("/nonexistent/a.js".to_string(), ChangeKind::Changed)]
    );
    assert_eq!(
        kinds(&event(EventKind::Any, &["/nonexistent/a.js"])),
        vec![("/nonexistent/a.js".to_string(), ChangeKind::Changed)]
    );
}

#[test]
fn renames_split_into_delete_and_add() {
    assert_eq!(
        kinds(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/nonexistent/old.js", "/nonexistent/new.js"]
        )),
        vec![
            ("/nonexistent/old.js".to_string(), ChangeKind::Deleted),
            ("/nonexistent/new.js".to_string(), ChangeKind::Added),
        ]
    );
    assert_eq!(
        kinds(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/nonexistent/old.js"]
        )),
        vec![("/nonexistent/old.js".to_string(), ChangeKind::Deleted)]
    );
    assert_eq!(
        kinds(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/nonexistent/new.js"]
        )),
        vec![("/nonexistent/new.js".to_string(), ChangeKind::Added)]
    );
}

#[test]
fn rename_of_unknown_direction_checks_the_disk() {
    let dir = tempdir().unwrap();
    let present = dir.path().join("present.js");
    fs::write(&present, "x").unwrap();
    let gone = dir.path().join("gone.js");

    let ev = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Any)))
        .add_path(present.clone())
        .add_path(gone.clone());

    assert_eq!(
        classify_event(&ev),
        vec![(present, ChangeKind::Added), (gone, ChangeKind::Deleted)]
    );
}

#[test]
fn access_events_and_directories_are_ignored() {
    assert!(kinds(&event(EventKind::Access(AccessKind::Any), &["/nonexistent/a.js"])).is_empty());
    assert!(kinds(&event(EventKind::Other, &["/nonexistent/a.js"])).is_empty());

    let dir = tempdir().unwrap();
    let ev = Event::new(EventKind::Create(CreateKind::Folder)).add_path(dir.path().to_path_buf());
    assert!(classify_event(&ev).is_empty());
}

#[test]
fn paths_are_made_relative_with_forward_slashes() {
    let root = Path::new("/project");

    assert_eq!(
        relative_str(root, Path::new("/project/src/a.js")).as_deref(),
        Some("src/a.js")
    );
    assert_eq!(event_path(root, Path::new("/elsewhere/b.js")), "/elsewhere/b.js");
}

#[test]
fn watch_failures_render_target_message_and_paths() {
    let failure = WatchFailure {
        target: "scripts".to_string(),
        message: "No space left on device".to_string(),
        paths: vec!["src".to_string()],
    };
    assert_eq!(
        failure.to_string(),
        "target 'scripts': No space left on device (src)"
    );

    let plain = WatchFailure::from_message("docs", "watch limit reached");
    assert_eq!(plain.to_string(), "target 'docs': watch limit reached");

    let from_notify = WatchFailure::from_notify(
        "css",
        &notify::Error::generic("boom").add_path(PathBuf::from("css")),
    );
    assert_eq!(from_notify.message, "boom");
    assert_eq!(from_notify.paths, vec!["css".to_string()]);
}

#[tokio::test]
async fn session_forwards_matching_changes() {
    init_tracing();
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    fs::create_dir_all(root.join("src")).unwrap();

    let cfg = ConfigFileBuilder::new()
        .with_task("lint", "true")
        .with_target("scripts", TargetConfigBuilder::new("src/*.js").task("lint").build())
        .build();
    let snap = snapshot(7, &cfg);

    let (tx, mut rx) = mpsc::channel(64);
    let sessions = open_sessions(&snap, &root, &tx).unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].target(), "scripts");
    assert_eq!(sessions[0].generation(), 7);
    assert_eq!(sessions[0].roots(), &[root.join("src")]);

    // Give the backend a moment to install its watches.
    tokio::time::sleep(Duration::from_millis(100)).await;
    fs::write(root.join("src/ignored.txt"), "no").unwrap();
    fs::write(root.join("src/app.js"), "yes").unwrap();

    let received = with_timeout(async {
        loop {
            match rx.recv().await {
                Some(RuntimeEvent::FileChanged {
                    generation,
                    target,
                    path,
                    ..
                }) => break (generation, target, path),
                Some(_) => continue,
                None => panic!("channel closed"),
            }
        }
    })
    .await;

    assert_eq!(
        received,
        (7, "scripts".to_string(), "src/app.js".to_string())
    );
}

#[tokio::test]
async fn subscribing_to_a_missing_root_is_a_subscription_failure() {
    let cfg = ConfigFileBuilder::new()
        .with_target("scripts", TargetConfigBuilder::new("src/*.js").build())
        .build();
    let snap = snapshot(1, &cfg);
    let target = snap.target("scripts").unwrap().clone();

    let (tx, _rx) = mpsc::channel(8);
    let err = WatchSession::subscribe(1, target, Path::new("/definitely/not/here"), tx)
        .unwrap_err();

    assert!(err.to_string().starts_with("Subscription failed: target 'scripts'"), "{err}");
}

#[tokio::test]
async fn target_without_patterns_observes_nothing() {
    let cfg = ConfigFileBuilder::new()
        .with_target("empty", TargetConfigBuilder::new(Vec::<&str>::new()).build())
        .build();
    let snap = snapshot(1, &cfg);

    let (tx, _rx) = mpsc::channel(8);
    let sessions = open_sessions(&snap, Path::new("/definitely/not/here"), &tx).unwrap();

    assert!(sessions[0].roots().is_empty());
}

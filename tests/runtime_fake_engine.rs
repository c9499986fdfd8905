// tests/runtime_fake_engine.rs

use std::error::Error;
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskwatch::config::SnapshotLoader;
use taskwatch::engine::{
    CoreRuntime, LifecycleReporter, RunCoordinator, Runtime, RuntimeEvent,
};
use taskwatch::types::ChangeKind;
use taskwatch::watch::{ChangeAggregator, ChangeBroadcast};
use taskwatch_test_utils::builders::{ConfigFileBuilder, TargetConfigBuilder};
use taskwatch_test_utils::fake_engine::{EngineCall, FakeEngine};
use taskwatch_test_utils::{SharedBuffer, core_for, init_tracing, with_timeout};
use tempfile::tempdir;
use tokio::sync::mpsc;

type TestResult = Result<(), Box<dyn Error>>;

fn file_changed(generation: u64, target: &str, path: &str) -> RuntimeEvent {
    RuntimeEvent::FileChanged {
        generation,
        target: target.to_string(),
        path: path.to_string(),
        kind: ChangeKind::Changed,
    }
}

/// Poll until `pred` holds for the recorded engine calls.
async fn wait_for_calls(calls: &Arc<Mutex<Vec<EngineCall>>>, pred: impl Fn(&[EngineCall]) -> bool) {
    with_timeout(async {
        loop {
            if pred(&calls.lock().unwrap()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
}

#[tokio::test]
async fn debounced_burst_runs_once_and_reports_lifecycle() -> TestResult {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .debounce("20ms")
        .with_task("lint", "echo lint")
        .with_target("scripts", TargetConfigBuilder::new("src/*.js").task("lint").build())
        .build();
    let (core, aggregator) = core_for(&cfg);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let engine = FakeEngine::completing(rt_tx.clone(), Duration::from_millis(250));
    let calls = engine.calls();
    let out = SharedBuffer::new();
    let reporter = LifecycleReporter::new(aggregator, ".", out.clone());
    let loader = SnapshotLoader::new("Taskwatch.toml", ".", None);

    let runtime = Runtime::new(core, rt_rx, rt_tx.clone(), engine, reporter, loader);
    let handle = tokio::spawn(runtime.run());

    rt_tx.send(file_changed(1, "scripts", "src/a.js")).await?;
    rt_tx.send(file_changed(1, "scripts", "src/b.js")).await?;

    wait_for_calls(&calls, |c| !c.is_empty()).await;
    // Let RunFinished be processed before shutting down.
    tokio::time::sleep(Duration::from_millis(50)).await;
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;
    with_timeout(handle).await??;

    assert_eq!(
        *calls.lock().unwrap(),
        vec![EngineCall::Start {
            run_id: 1,
            target: "scripts".to_string()
        }]
    );

    let lines = out.lines();
    assert_eq!(lines[0], "Waiting...");
    assert_eq!(lines[1], "OK");
    assert_eq!(lines[2], "File \"src/a.js\" changed.");
    assert_eq!(lines[3], "File \"src/b.js\" changed.");
    assert!(lines[4].starts_with("Completed in 0.250s at "), "{}", lines[4]);
    assert_eq!(lines.len(), 5);
    Ok(())
}

#[tokio::test]
async fn interrupting_target_cancels_the_in_flight_run() -> TestResult {
    init_tracing();

    let cfg = ConfigFileBuilder::new()
        .debounce("0ms")
        .with_task("lint", "echo lint")
        .with_target(
            "scripts",
            TargetConfigBuilder::new("src/*.js").task("lint").interrupt(true).build(),
        )
        .build();
    let (core, aggregator) = core_for(&cfg);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let engine = FakeEngine::manual(rt_tx.clone());
    let calls = engine.calls();
    let out = SharedBuffer::new();
    let reporter = LifecycleReporter::new(aggregator, ".", out.clone());
    let loader = SnapshotLoader::new("Taskwatch.toml", ".", None);

    let runtime = Runtime::new(core, rt_rx, rt_tx.clone(), engine, reporter, loader);
    let handle = tokio::spawn(runtime.run());

    rt_tx.send(file_changed(1, "scripts", "src/a.js")).await?;
    rt_tx.send(file_changed(1, "scripts", "src/b.js")).await?;
    wait_for_calls(&calls, |c| c.len() >= 3).await;

    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;
    with_timeout(handle).await??;

    assert_eq!(
        calls.lock().unwrap()[..3],
        [
            EngineCall::Start {
                run_id: 1,
                target: "scripts".to_string()
            },
            EngineCall::Interrupt { run_id: 1 },
            EngineCall::Start {
                run_id: 2,
                target: "scripts".to_string()
            },
        ]
    );
    assert!(out
        .lines()
        .contains(&"Scheduled tasks have been interrupted...".to_string()));
    Ok(())
}

const INITIAL_CONFIG: &str = r#"
[config]
debounce = "0ms"

[task.build]
cmd = "echo build"

[target.config]
files = "Taskwatch.toml"
"#;

/// Runtime over a real config file in a temp dir, started like `lib::run`.
fn runtime_for_dir(
    root: &std::path::Path,
) -> (
    Runtime<FakeEngine, SharedBuffer>,
    mpsc::Sender<RuntimeEvent>,
    Arc<Mutex<Vec<EngineCall>>>,
    SharedBuffer,
) {
    let mut loader = SnapshotLoader::new(root.join("Taskwatch.toml"), root, None);
    let snapshot = loader.load().unwrap();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let engine = FakeEngine::completing(rt_tx.clone(), Duration::from_millis(5));
    let calls = engine.calls();

    let aggregator = ChangeAggregator::new();
    let out = SharedBuffer::new();
    let reporter = LifecycleReporter::new(aggregator.clone(), root, out.clone());
    let coordinator =
        RunCoordinator::new(aggregator, ChangeBroadcast::default(), snapshot.detector().clone());
    let core = CoreRuntime::new(snapshot, coordinator);

    let runtime = Runtime::new(core, rt_rx, rt_tx.clone(), engine, reporter, loader);
    (runtime, rt_tx, calls, out)
}

#[tokio::test]
async fn config_change_reloads_targets() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path().canonicalize()?;
    fs::write(root.join("Taskwatch.toml"), INITIAL_CONFIG)?;

    let (runtime, rt_tx, calls, out) = runtime_for_dir(&root);

    // The edit happens before the runtime sees the change event.
    fs::write(
        root.join("Taskwatch.toml"),
        format!("{INITIAL_CONFIG}\n[target.extra]\nfiles = \"*.txt\"\ntasks = [\"build\"]\n"),
    )?;

    let handle = tokio::spawn(runtime.run());
    rt_tx.send(file_changed(1, "config", "Taskwatch.toml")).await?;
    rt_tx.send(file_changed(2, "extra", "notes.txt")).await?;

    wait_for_calls(&calls, |c| !c.is_empty()).await;
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;
    let reporter = with_timeout(handle).await??;
    drop(reporter);

    assert_eq!(
        calls.lock().unwrap()[0],
        EngineCall::Start {
            run_id: 1,
            target: "extra".to_string()
        }
    );
    let lines = out.lines();
    assert!(lines.contains(&"Reloading watch config...".to_string()));
    assert!(lines.contains(&"File \"notes.txt\" changed.".to_string()));
    Ok(())
}

#[tokio::test]
async fn failed_reload_reports_error_and_keeps_watching() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path().canonicalize()?;
    fs::write(root.join("Taskwatch.toml"), INITIAL_CONFIG)?;

    let (runtime, rt_tx, calls, out) = runtime_for_dir(&root);

    fs::write(root.join("Taskwatch.toml"), "[target.config\nfiles = ")?;

    let handle = tokio::spawn(runtime.run());
    rt_tx.send(file_changed(1, "config", "Taskwatch.toml")).await?;
    // Events for the old generation are still accepted after the failure.
    rt_tx.send(file_changed(1, "config", "Taskwatch.toml")).await?;
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;
    with_timeout(handle).await??;

    assert!(calls.lock().unwrap().is_empty());
    let lines = out.lines();
    assert_eq!(
        lines.iter().filter(|l| *l == "Reloading watch config...").count(),
        2
    );
    assert_eq!(lines.iter().filter(|l| *l == "ERROR").count(), 2);
    Ok(())
}

const TWO_TARGET_CONFIG: &str = r#"
[config]
debounce = "0ms"

[task.build]
cmd = "echo build"

[target.config]
files = "Taskwatch.toml"

[target.scripts]
files = "src/*.js"
tasks = ["build"]
debounce = "300ms"
"#;

#[tokio::test]
async fn edit_inside_a_debounce_window_survives_a_config_reload() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let root = dir.path().canonicalize()?;
    fs::write(root.join("Taskwatch.toml"), TWO_TARGET_CONFIG)?;

    let (runtime, rt_tx, calls, out) = runtime_for_dir(&root);
    let handle = tokio::spawn(runtime.run());

    // `scripts` opens its window, then the config reloads before it closes.
    rt_tx.send(file_changed(1, "scripts", "src/a.js")).await?;
    rt_tx.send(file_changed(1, "config", "Taskwatch.toml")).await?;
    // Left in the channel by the replaced session.
    rt_tx.send(file_changed(1, "scripts", "src/b.js")).await?;

    wait_for_calls(&calls, |c| !c.is_empty()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;
    with_timeout(handle).await??;

    assert_eq!(
        *calls.lock().unwrap(),
        vec![EngineCall::Start {
            run_id: 1,
            target: "scripts".to_string()
        }]
    );
    let lines = out.lines();
    let reload = lines
        .iter()
        .position(|l| l == "Reloading watch config...")
        .expect("reload reported");
    let ok = lines.iter().position(|l| l == "OK").expect("run started");
    assert!(reload < ok, "{lines:?}");
    assert!(lines.contains(&"File \"src/a.js\" changed.".to_string()));
    assert!(lines.contains(&"File \"src/b.js\" changed.".to_string()));
    Ok(())
}

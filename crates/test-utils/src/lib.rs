pub mod builders;
pub mod fake_engine;

use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, Once};

use taskwatch::config::{ConfigFile, WatchSnapshot};
use taskwatch::engine::{CoreCommand, CoreRuntime, LifecycleEvent, ReloadDetector, RunCoordinator};
use taskwatch::watch::{ChangeAggregator, ChangeBroadcast};
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Snapshot of `cfg` as if loaded from `Taskwatch.toml`.
pub fn snapshot(version: u64, cfg: &ConfigFile) -> Arc<WatchSnapshot> {
    Arc::new(
        WatchSnapshot::from_config(version, cfg, Path::new("Taskwatch.toml"), None)
            .expect("snapshot from test config"),
    )
}

/// Core runtime over version 1 of `cfg`, plus the aggregator it records into.
pub fn core_for(cfg: &ConfigFile) -> (CoreRuntime, ChangeAggregator) {
    core_with_broadcast(cfg, ChangeBroadcast::default())
}

pub fn core_with_broadcast(
    cfg: &ConfigFile,
    broadcast: ChangeBroadcast,
) -> (CoreRuntime, ChangeAggregator) {
    let aggregator = ChangeAggregator::new();
    let detector = ReloadDetector::for_config_path(Path::new("Taskwatch.toml"))
        .expect("default detector");
    let coordinator = RunCoordinator::new(aggregator.clone(), broadcast, detector);
    (CoreRuntime::new(snapshot(1, cfg), coordinator), aggregator)
}

/// `Write` sink whose contents stay readable after the writer is moved into
/// a reporter.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock().unwrap()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Compact, order-preserving description of core commands, e.g.
/// `["start:1:scripts", "run:1:scripts"]`.
pub fn describe(commands: &[CoreCommand]) -> Vec<String> {
    commands
        .iter()
        .map(|c| match c {
            CoreCommand::Lifecycle(LifecycleEvent::Start { run_id, target }) => {
                format!("start:{run_id}:{target}")
            }
            CoreCommand::Lifecycle(LifecycleEvent::End { run_id, target, .. }) => {
                format!("end:{run_id}:{target}")
            }
            CoreCommand::Lifecycle(LifecycleEvent::Interrupt { run_id, .. }) => {
                format!("interrupt:{run_id}")
            }
            CoreCommand::Lifecycle(LifecycleEvent::Reload) => "reload".to_string(),
            CoreCommand::StartRun(run) => format!("run:{}:{}", run.run_id, run.target.name),
            CoreCommand::InterruptRun { run_id } => format!("cancel:{run_id}"),
            CoreCommand::ArmDebounce { target, .. } => format!("debounce:{target}"),
            CoreCommand::Reload => "do-reload".to_string(),
            CoreCommand::ReportError(_) => "error".to_string(),
        })
        .collect()
}

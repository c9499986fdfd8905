// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{SnapshotLoader, WatchSnapshot};
use crate::engine::{CoreRuntime, LifecycleReporter, RunCoordinator, Runtime, RuntimeEvent};
use crate::exec::ProcessEngine;
use crate::watch::{ChangeAggregator, ChangeBroadcast, open_sessions};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading into the first snapshot
/// - one watch session per target
/// - coordinator / core / runtime
/// - the process engine
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    run_with_broadcast(args, ChangeBroadcast::default()).await
}

/// Like [`run`], but with a caller-provided broadcast channel so listeners
/// can subscribe before watching begins.
pub async fn run_with_broadcast(args: CliArgs, broadcast: ChangeBroadcast) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let root = config_root_dir(&config_path);
    let root = root.canonicalize().unwrap_or(root);

    let mut loader = SnapshotLoader::new(&config_path, &root, args.target.clone());
    let snapshot = loader.load()?;

    if args.dry_run {
        print_dry_run(&snapshot, &root);
        return Ok(());
    }

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(256);

    let aggregator = ChangeAggregator::new();
    let mut reporter = LifecycleReporter::stdout(aggregator.clone(), &root);

    let sessions = match open_sessions(&snapshot, &root, &rt_tx) {
        Ok(sessions) => sessions,
        Err(err) => {
            reporter.error(&err.to_string())?;
            return Err(err.into());
        }
    };
    info!(root = %root.display(), sessions = sessions.len(), "watching");

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let engine = ProcessEngine::new(rt_tx.clone(), &root);
    let coordinator = RunCoordinator::new(aggregator, broadcast, snapshot.detector().clone());

    // Construct the pure core runtime (single source of truth for semantics).
    let core = CoreRuntime::new(snapshot, coordinator);

    // Construct the async IO shell around the core.
    let runtime = Runtime::new(core, rt_rx, rt_tx, engine, reporter, loader).with_sessions(sessions);
    runtime.run().await?;
    Ok(())
}

/// Figure out a sensible project root for watching.
///
/// - If the config path has a non-empty parent (e.g. "web/Taskwatch.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Taskwatch.toml" (parent = ""),
///   we fall back to the current working directory.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Simple dry-run output: print targets, patterns, watch roots and tasks.
fn print_dry_run(snapshot: &WatchSnapshot, root: &Path) {
    println!("taskwatch dry-run");
    println!("  root = {}", root.display());
    println!();

    println!("targets ({}):", snapshot.targets().len());
    for target in snapshot.targets() {
        println!("  - {}", target.name);
        println!("      files: {:?}", target.patterns);
        let roots: Vec<_> = target
            .matcher
            .watch_roots(root)
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        if !roots.is_empty() {
            println!("      watch roots: {roots:?}");
        }
        println!("      debounce: {}", humantime::format_duration(target.options.debounce));
        if target.policy.interrupt {
            println!("      interrupt: true");
        }
        if target.policy.nospawn {
            println!("      nospawn: true");
        }
        for task in &target.tasks {
            println!("      task {}: {}", task.name, task.cmd);
        }
    }

    debug!("dry-run complete (no watching)");
}

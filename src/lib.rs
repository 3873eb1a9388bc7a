// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod server;
pub mod types;
pub mod watch;

use std::fmt::{self, Write as _};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::{ConfigFile, load_or_default};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use crate::exec::RealPipelineBackend;
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::{Orchestrator, RunReport};
use crate::server::{DevServer, Reloader};
use crate::watch::ServedFiles;

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    let root = args.project_root();
    let (cfg, config_path) = load_or_default(args.config.as_deref(), &root)?;
    let command = args.command.unwrap_or(Command::Dev);

    if args.dry_run {
        print!("{}", dry_run_plan(&cfg, config_path.as_deref(), &root, command));
        debug!("dry-run complete (nothing written)");
        return Ok(());
    }

    match command {
        Command::Build => build(&cfg, &root).await.map(|_| ()),
        Command::Dev => dev(&cfg, &root).await,
    }
}

/// Run the whole pipeline once.
pub async fn build(cfg: &ConfigFile, root: &Path) -> Result<RunReport> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let orchestrator = Orchestrator::from_config(cfg, root, fs);
    let graph = cfg.task_graph().clone();

    let report = tokio::task::spawn_blocking(move || orchestrator.run_all(&graph))
        .await
        .context("build task panicked")??;

    for path in report.outputs() {
        println!("  wrote {}", display_relative(root, path));
    }
    println!(
        "Built {} stage(s) in {} ms",
        report.artifacts.len(),
        report.elapsed.as_millis()
    );
    Ok(report)
}

/// Build, serve and rebuild on change until Ctrl-C.
///
/// The server and the watcher come up even if the first build fails, so
/// fixing the offending file is enough to recover.
pub async fn dev(cfg: &ConfigFile, root: &Path) -> Result<()> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let orchestrator = Arc::new(Orchestrator::from_config(cfg, root, fs));

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let reloader = Reloader::new();
    let server = DevServer::start(cfg.server(), root, reloader.clone()).await?;
    println!(
        "Serving {} at {}",
        display_relative(root, &root.join(&cfg.server().base)),
        server.url()
    );

    let served = if cfg.server().livereload {
        Some(ServedFiles::from_config(cfg)?)
    } else {
        None
    };
    let _watcher = crate::watch::spawn_watcher(root, cfg.watch(), served, rt_tx.clone())?;

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

    rt_tx
        .send(RuntimeEvent::ChangeDetected {
            paths: Vec::new(),
            reason: TriggerReason::Startup,
        })
        .await?;

    let core = CoreRuntime::new(
        cfg.task_graph().clone(),
        cfg.watch().triggered_while_running_behaviour,
        RuntimeOptions::default(),
    );
    let backend = RealPipelineBackend::new(orchestrator, rt_tx.clone());
    let livereload = cfg.server().livereload.then(|| reloader.clone());

    let result = Runtime::new(core, rt_rx, backend, livereload).run().await;

    info!("shutting down dev server");
    server.shutdown().await;
    result.map_err(Into::into)
}

fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// The resolved configuration as `--dry-run` prints it. Touches no file.
pub fn dry_run_plan(
    cfg: &ConfigFile,
    config_path: Option<&Path>,
    root: &Path,
    command: Command,
) -> String {
    // Writing into a String cannot fail.
    let mut out = String::new();
    let _ = write_plan(&mut out, cfg, config_path, root, command);
    out
}

fn write_plan(
    out: &mut String,
    cfg: &ConfigFile,
    config_path: Option<&Path>,
    root: &Path,
    command: Command,
) -> fmt::Result {
    writeln!(out, "assetpipe dry-run")?;
    match config_path {
        Some(path) => writeln!(out, "  config: {}", path.display())?,
        None => writeln!(out, "  config: built-in defaults")?,
    }
    writeln!(out, "  root: {}", root.display())?;
    writeln!(out, "  command: {command:?}")?;
    writeln!(out)?;

    writeln!(out, "pipeline: {}", cfg.task_graph())?;
    let concat = cfg.concat();
    writeln!(out, "  concat: {:?} -> {}", concat.src, concat.dest.display())?;
    let minify = cfg.minify();
    writeln!(
        out,
        "  minify: {} -> {} (mangle: {}, compress: {}, source map: {})",
        minify.src.display(),
        minify.dest.display(),
        minify.mangle,
        minify.compress,
        minify.source_map
    )?;
    let styles = cfg.compile_styles();
    writeln!(
        out,
        "  compile-styles: {} -> {} ({:?})",
        styles.src,
        styles.dest.display(),
        styles.output_style
    )?;
    let prefix = cfg.prefix_styles();
    writeln!(
        out,
        "  prefix-styles: {:?} for {:?} (map: {})",
        prefix.src, prefix.browsers, prefix.map
    )?;

    if command == Command::Dev {
        let server = cfg.server();
        writeln!(out)?;
        writeln!(
            out,
            "server: http://{}:{} serving {} (livereload: {}, fallback ports: {})",
            server.hostname,
            server.port,
            server.base.display(),
            server.livereload,
            if server.use_available_port { server.port_search_limit } else { 0 }
        )?;
        let watch = cfg.watch();
        writeln!(out, "watch: {:?}", watch.files)?;
        if !watch.exclude.is_empty() {
            writeln!(out, "  exclude: {:?}", watch.exclude)?;
        }
        writeln!(
            out,
            "  while running: {:?}, debounce: {} ms, use_hash: {}",
            watch.triggered_while_running_behaviour, watch.debounce_ms, watch.use_hash
        )?;
    }
    Ok(())
}

// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::WatchConfig;
use crate::engine::{RuntimeEvent, TriggerReason};
use crate::errors::{PipelineError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::HashStorageMode;
use crate::watch::event_handler::ChangeGate;
use crate::watch::hash::{FileHashStore, HashStore, MemoryHashStore};
use crate::watch::patterns::WatchProfile;
use crate::watch::served::ServedFiles;

/// Keeps the underlying `RecommendedWatcher` alive. Dropping it stops
/// file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    root: PathBuf,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").field("root", &self.root).finish()
    }
}

/// Watch `root` recursively and send one `ChangeDetected` per debounced
/// batch of relevant changes.
///
/// Events are collected until `cfg.debounce_ms` passes without a new one, so
/// the burst of events a single save produces becomes one trigger. With
/// `served`, the same batch may also yield a `ServedFilesChanged` for files
/// that only need a browser reload.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    cfg: &WatchConfig,
    served: Option<ServedFiles>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    if !root.is_dir() {
        return Err(PipelineError::Watch(format!(
            "watch root {} does not exist or is not a directory",
            root.display()
        )));
    }
    let root = root.canonicalize()?;

    let profile = WatchProfile::from_config(cfg)?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let hash_store: Box<dyn HashStore> = match cfg.hash_storage_mode {
        HashStorageMode::File => Box::new(FileHashStore::new(root.clone(), fs.clone())),
        HashStorageMode::Memory => Box::new(MemoryHashStore::new()),
    };
    let mut gate = ChangeGate::new(root.clone(), profile, fs, hash_store);
    gate.prime();

    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                // The receiver only goes away on shutdown.
                let _ = event_tx.send(event);
            }
            Err(err) => {
                eprintln!("assetpipe: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!("file watcher started on {:?}", root);

    let debounce = Duration::from_millis(cfg.debounce_ms);
    tokio::spawn(debounce_loop(
        event_rx,
        debounce,
        root.clone(),
        gate,
        served,
        runtime_tx,
    ));

    Ok(WatcherHandle {
        _inner: watcher,
        root,
    })
}

async fn debounce_loop(
    mut event_rx: mpsc::UnboundedReceiver<Event>,
    debounce: Duration,
    root: PathBuf,
    mut gate: ChangeGate,
    served: Option<ServedFiles>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    while let Some(first) = event_rx.recv().await {
        let mut paths = Vec::new();
        collect_paths(first, &mut paths);

        loop {
            match tokio::time::timeout(debounce, event_rx.recv()).await {
                Ok(Some(event)) => collect_paths(event, &mut paths),
                Ok(None) => break,
                // Quiet period elapsed.
                Err(_) => break,
            }
        }

        if paths.is_empty() {
            continue;
        }

        let served_changes = match &served {
            Some(served) => served.changed(&root, &paths, gate.profile()),
            None => Vec::new(),
        };

        let (returned, changed) = match tokio::task::spawn_blocking(move || {
            let changed = gate.filter(&paths);
            (gate, changed)
        })
        .await
        {
            Ok(result) => result,
            Err(err) => {
                warn!("change filter panicked; stopping watcher: {err}");
                return;
            }
        };
        gate = returned;

        if !changed.is_empty() {
            info!(files = ?changed, "change detected");
            if let Err(err) = runtime_tx
                .send(RuntimeEvent::ChangeDetected {
                    paths: changed,
                    reason: TriggerReason::FileWatch,
                })
                .await
            {
                warn!("failed to send RuntimeEvent::ChangeDetected: {err}");
                return;
            }
        }

        if !served_changes.is_empty() {
            debug!(files = ?served_changes, "served files changed");
            if let Err(err) = runtime_tx
                .send(RuntimeEvent::ServedFilesChanged {
                    paths: served_changes,
                })
                .await
            {
                warn!("failed to send RuntimeEvent::ServedFilesChanged: {err}");
                return;
            }
        }
    }
    debug!("watcher event loop finished");
}

fn collect_paths(event: Event, out: &mut Vec<PathBuf>) {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any => {
            out.extend(event.paths);
        }
        EventKind::Access(_) | EventKind::Other => {}
    }
}

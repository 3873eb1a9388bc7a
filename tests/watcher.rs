// tests/watcher.rs

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::tempdir;
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep, timeout};

use assetpipe::engine::{RuntimeEvent, TriggerReason};
use assetpipe::errors::PipelineError;
use assetpipe::types::HashStorageMode;
use assetpipe::watch::{HASH_FILE_PATH, ServedFiles, spawn_watcher};
use assetpipe_test_utils::builders::ConfigFileBuilder;
use assetpipe_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn project() -> Result<tempfile::TempDir, Box<dyn Error>> {
    let dir = tempdir()?;
    fs::create_dir_all(dir.path().join("components/scripts"))?;
    fs::create_dir_all(dir.path().join("components/scss"))?;
    fs::create_dir_all(dir.path().join("dist/js"))?;
    fs::write(dir.path().join("components/scripts/a.js"), "var a = 1;")?;
    Ok(dir)
}

async fn next_change(
    rx: &mut mpsc::Receiver<RuntimeEvent>,
    wait: Duration,
) -> Option<Vec<PathBuf>> {
    match timeout(wait, rx.recv()).await {
        Ok(Some(RuntimeEvent::ChangeDetected { paths, reason })) => {
            assert_eq!(reason, TriggerReason::FileWatch);
            Some(paths)
        }
        _ => None,
    }
}

fn touch(root: &Path, rel: &str, contents: &str) -> std::io::Result<()> {
    fs::write(root.join(rel), contents)
}

#[tokio::test]
async fn burst_of_writes_is_one_trigger() -> TestResult {
    init_tracing();
    let dir = project()?;
    let cfg = ConfigFileBuilder::new().with_debounce_ms(200).build();
    let (tx, mut rx) = mpsc::channel(16);
    let _handle = spawn_watcher(dir.path(), cfg.watch(), None, tx)?;
    sleep(Duration::from_millis(100)).await;

    touch(dir.path(), "components/scripts/a.js", "var a = 2;")?;
    touch(dir.path(), "components/scripts/b.js", "var b = 2;")?;

    let paths = next_change(&mut rx, Duration::from_secs(5))
        .await
        .expect("change should be reported");
    assert!(paths.contains(&PathBuf::from("components/scripts/a.js")));
    assert!(paths.contains(&PathBuf::from("components/scripts/b.js")));

    assert!(next_change(&mut rx, Duration::from_millis(500)).await.is_none());
    Ok(())
}

#[tokio::test]
async fn unwatched_outputs_do_not_trigger() -> TestResult {
    init_tracing();
    let dir = project()?;
    let cfg = ConfigFileBuilder::new().with_debounce_ms(50).build();
    let (tx, mut rx) = mpsc::channel(16);
    let _handle = spawn_watcher(dir.path(), cfg.watch(), None, tx)?;
    sleep(Duration::from_millis(100)).await;

    touch(dir.path(), "dist/js/scripts.js", "var x;")?;
    assert!(next_change(&mut rx, Duration::from_millis(500)).await.is_none());
    Ok(())
}

#[tokio::test]
async fn identical_rewrite_is_skipped_with_use_hash() -> TestResult {
    init_tracing();
    let dir = project()?;
    let cfg = ConfigFileBuilder::new()
        .with_debounce_ms(50)
        .with_use_hash(true, HashStorageMode::File)
        .build();
    let (tx, mut rx) = mpsc::channel(16);
    let _handle = spawn_watcher(dir.path(), cfg.watch(), None, tx)?;
    sleep(Duration::from_millis(100)).await;

    touch(dir.path(), "components/scripts/a.js", "var a = 1;")?;
    assert!(next_change(&mut rx, Duration::from_millis(500)).await.is_none());

    touch(dir.path(), "components/scripts/a.js", "var a = 3;")?;
    assert!(next_change(&mut rx, Duration::from_secs(5)).await.is_some());
    assert!(dir.path().join(HASH_FILE_PATH).is_file());
    Ok(())
}

async fn next_served(
    rx: &mut mpsc::Receiver<RuntimeEvent>,
    wait: Duration,
) -> Option<Vec<PathBuf>> {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(RuntimeEvent::ServedFilesChanged { paths })) => return Some(paths),
            Ok(Some(_)) => continue,
            _ => return None,
        }
    }
}

#[tokio::test]
async fn served_page_edit_reloads_without_rebuild() -> TestResult {
    init_tracing();
    let dir = project()?;
    touch(dir.path(), "dist/index.html", "<body>one</body>")?;
    let cfg = ConfigFileBuilder::new().with_debounce_ms(50).build();
    let served = ServedFiles::from_config(&cfg)?;
    let (tx, mut rx) = mpsc::channel(16);
    let _handle = spawn_watcher(dir.path(), cfg.watch(), Some(served), tx)?;
    sleep(Duration::from_millis(100)).await;

    touch(dir.path(), "dist/index.html", "<body>two</body>")?;
    match timeout(Duration::from_secs(5), rx.recv()).await {
        Ok(Some(RuntimeEvent::ServedFilesChanged { paths })) => {
            assert_eq!(paths, vec![PathBuf::from("dist/index.html")]);
        }
        other => panic!("expected a served change, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn pipeline_outputs_do_not_reload() -> TestResult {
    init_tracing();
    let dir = project()?;
    let cfg = ConfigFileBuilder::new().with_debounce_ms(50).build();
    let served = ServedFiles::from_config(&cfg)?;
    let (tx, mut rx) = mpsc::channel(16);
    let _handle = spawn_watcher(dir.path(), cfg.watch(), Some(served), tx)?;
    sleep(Duration::from_millis(100)).await;

    touch(dir.path(), "dist/js/scripts.js", "var x;")?;
    touch(dir.path(), "dist/js/scripts.min.js", "var x;")?;
    touch(dir.path(), "dist/js/scripts.min.js.map", "{}")?;
    assert!(next_served(&mut rx, Duration::from_millis(500)).await.is_none());
    Ok(())
}

#[tokio::test]
async fn missing_root_is_a_watch_error() -> TestResult {
    let dir = tempdir()?;
    let cfg = ConfigFileBuilder::new().build();
    let (tx, _rx) = mpsc::channel(16);

    let err = spawn_watcher(dir.path().join("nope"), cfg.watch(), None, tx).unwrap_err();
    assert!(matches!(err, PipelineError::Watch(_)));
    Ok(())
}

// src/watch/hash.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use blake3::Hasher;
use tracing::{debug, info};

use crate::fs::FileSystem;

/// Relative path (from the project root) to the hashes file.
pub const HASH_FILE_PATH: &str = ".assetpipe/hashes";

/// Key under which the aggregate hash of all watched files is stored.
pub const WATCH_HASH_KEY: &str = "watch";

fn hash_file_path(root: &Path) -> PathBuf {
    root.join(HASH_FILE_PATH)
}

/// blake3 of one file's contents, hex encoded.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let bytes = fs.read(path)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Combine per-file hashes into one.
///
/// `entries` must be sorted by path. Each path is mixed in with its hash, so
/// renaming a file changes the result even if its contents don't.
pub fn compute_aggregate_hash(entries: &[(PathBuf, String)]) -> String {
    let mut hasher = Hasher::new();
    for (path, hash) in entries {
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(b"\0");
        hasher.update(hash.as_bytes());
        hasher.update(b"\n");
    }
    let hash = hasher.finalize().to_hex().to_string();
    debug!(hash = %hash, files = entries.len(), "computed aggregate hash");
    hash
}

/// Abstract storage for content hashes.
pub trait HashStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&mut self, key: &str, hash: &str) -> Result<()>;
    /// Remove hashes whose key is not in `active`.
    fn prune(&mut self, active: &[&str]) -> Result<()>;
}

/// Stores hashes in `<root>/.assetpipe/hashes`, one `key hash` per line.
pub struct FileHashStore {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileHashStore {
    pub fn new(root: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self { root, fs }
    }

    fn load_all(&self) -> Result<BTreeMap<String, String>> {
        let path = hash_file_path(&self.root);
        if !self.fs.exists(&path) {
            return Ok(BTreeMap::new());
        }

        let contents = self.fs.read_to_string(&path)?;
        let mut map = BTreeMap::new();
        for line in contents.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some((key, hash)) = trimmed.split_once(char::is_whitespace) {
                map.insert(key.to_string(), hash.trim().to_string());
            }
        }
        Ok(map)
    }

    fn save_all(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let mut out = String::new();
        for (key, hash) in map {
            out.push_str(key);
            out.push(' ');
            out.push_str(hash);
            out.push('\n');
        }
        self.fs.write(&hash_file_path(&self.root), out.as_bytes())
    }
}

impl HashStore for FileHashStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load_all()?.get(key).cloned())
    }

    fn save(&mut self, key: &str, hash: &str) -> Result<()> {
        let mut map = self.load_all()?;
        map.insert(key.to_string(), hash.to_string());
        self.save_all(&map)?;
        debug!(key, hash, "stored hash (file)");
        Ok(())
    }

    fn prune(&mut self, active: &[&str]) -> Result<()> {
        let mut map = self.load_all()?;
        let initial_len = map.len();
        map.retain(|k, _| active.contains(&k.as_str()));

        if map.len() < initial_len {
            self.save_all(&map)?;
            info!(removed = initial_len - map.len(), "pruned stale hashes (file)");
        }
        Ok(())
    }
}

/// Stores hashes in memory only; every `dev` session starts fresh.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: BTreeMap<String, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HashStore for MemoryHashStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.get(key).cloned())
    }

    fn save(&mut self, key: &str, hash: &str) -> Result<()> {
        self.map.insert(key.to_string(), hash.to_string());
        debug!(key, hash, "stored hash (memory)");
        Ok(())
    }

    fn prune(&mut self, active: &[&str]) -> Result<()> {
        self.map.retain(|k, _| active.contains(&k.as_str()));
        Ok(())
    }
}

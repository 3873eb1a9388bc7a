// src/watch/event_handler.rs

//! Turns a debounced batch of filesystem events into at most one trigger.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::fs::FileSystem;
use crate::watch::cache::FileCache;
use crate::watch::hash::{HashStore, WATCH_HASH_KEY, compute_aggregate_hash};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{WatchProfile, collect_matching_files};

/// Decides whether a batch of changed paths should re-run the pipeline.
pub struct ChangeGate {
    root: PathBuf,
    profile: WatchProfile,
    fs: Arc<dyn FileSystem>,
    hash_store: Box<dyn HashStore>,
    cache: FileCache,
}

impl std::fmt::Debug for ChangeGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeGate")
            .field("root", &self.root)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

impl ChangeGate {
    pub fn new(
        root: PathBuf,
        profile: WatchProfile,
        fs: Arc<dyn FileSystem>,
        mut hash_store: Box<dyn HashStore>,
    ) -> Self {
        if let Err(e) = hash_store.prune(&[WATCH_HASH_KEY]) {
            warn!("failed to prune stale hashes: {e:#}");
        }
        Self {
            root,
            profile,
            fs,
            hash_store,
            cache: FileCache::new(),
        }
    }

    /// Seed the stored hash with the current contents, so that the first
    /// event after startup only triggers if something actually changed.
    pub fn prime(&mut self) {
        if !self.profile.use_hash() {
            return;
        }
        match self.current_hash() {
            Ok(hash) => {
                if let Err(e) = self.hash_store.save(WATCH_HASH_KEY, &hash) {
                    warn!("failed to store initial watch hash: {e:#}");
                }
            }
            Err(e) => warn!("failed to hash watched files: {e:#}"),
        }
    }

    pub fn profile(&self) -> &WatchProfile {
        &self.profile
    }

    /// Root-relative paths of `paths` that the profile watches, deduplicated.
    pub fn relevant(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut out = BTreeSet::new();
        for path in paths {
            let Some(rel) = relative_str(&self.root, path) else {
                warn!(?path, root = ?self.root, "could not relativize event path");
                continue;
            };
            if self.profile.matches(&rel) {
                out.insert(PathBuf::from(rel));
            }
        }
        out.into_iter().collect()
    }

    /// Filter a batch down to the paths that should trigger a run.
    ///
    /// Empty result means no run. With `use_hash` enabled, a batch whose
    /// watched contents hash the same as last time is dropped.
    pub fn filter(&mut self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let relevant = self.relevant(paths);
        if relevant.is_empty() || !self.profile.use_hash() {
            return relevant;
        }

        for rel in &relevant {
            self.cache.invalidate(&self.root.join(rel));
        }

        let new_hash = match self.current_hash() {
            Ok(h) => h,
            Err(e) => {
                warn!("failed to hash watched files; triggering anyway: {e:#}");
                return relevant;
            }
        };

        match self.hash_store.load(WATCH_HASH_KEY) {
            Ok(Some(old)) if old == new_hash => {
                info!(paths = ?relevant, "watched content unchanged; skipping rebuild");
                return Vec::new();
            }
            Ok(_) => {
                if let Err(e) = self.hash_store.save(WATCH_HASH_KEY, &new_hash) {
                    warn!("failed to save watch hash: {e:#}");
                }
            }
            Err(e) => warn!("failed to load watch hash: {e:#}"),
        }

        debug!(paths = ?relevant, "content changed");
        relevant
    }

    fn current_hash(&mut self) -> anyhow::Result<String> {
        let files = collect_matching_files(self.fs.as_ref(), &self.root, &self.profile)?;
        let mut entries = Vec::with_capacity(files.len());
        for file in files {
            let hash = self.cache.get_or_compute(self.fs.as_ref(), &file)?;
            let rel = relative_path(&self.root, &file);
            entries.push((rel, hash));
        }
        Ok(compute_aggregate_hash(&entries))
    }
}

fn relative_path(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

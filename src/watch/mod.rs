// src/watch/mod.rs

//! File watching and change detection.
//!
//! Compiles the `[watch]` patterns, runs a recursive `notify` watcher,
//! debounces its events and (optionally) gates triggers on a content hash.
//! It knows nothing about stages; it produces `ChangeDetected` events, plus
//! `ServedFilesChanged` for served files outside the pipeline's outputs.

pub mod cache;
pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod served;
pub mod watcher;

pub use event_handler::ChangeGate;
pub use hash::{FileHashStore, HASH_FILE_PATH, HashStore, MemoryHashStore};
pub use patterns::{WatchProfile, collect_matching_files};
pub use served::ServedFiles;
pub use watcher::{WatcherHandle, spawn_watcher};

// src/pipeline/collect.rs

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, warn};

use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;

/// Resolves glob patterns (relative to the project root) into file paths.
///
/// Results are sorted by their root-relative path so that concatenation order
/// does not depend on directory enumeration order. `*` does not cross `/`;
/// use `**` for recursive matches.
#[derive(Clone)]
pub struct AssetCollector {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl fmt::Debug for AssetCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetCollector")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl AssetCollector {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// Absolute (root-joined) form of a configured path.
    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    /// All files matching `pattern`. Zero matches yields an empty list.
    pub fn resolve(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        if !has_glob_meta(pattern) {
            let path = self.root.join(pattern);
            return Ok(if self.fs.is_file(&path) {
                vec![path]
            } else {
                Vec::new()
            });
        }

        let matcher = compile(pattern)?;
        let base = self.root.join(literal_prefix(pattern));
        if !self.fs.is_dir(&base) {
            debug!(pattern, base = ?base, "pattern base directory does not exist");
            return Ok(Vec::new());
        }

        let mut matched: Vec<(String, PathBuf)> = Vec::new();
        let mut stack = vec![base];

        while let Some(dir) = stack.pop() {
            for path in self.fs.read_dir(&dir)? {
                if self.fs.is_dir(&path) {
                    stack.push(path);
                } else if self.fs.is_file(&path) {
                    if let Some(rel) = self.relative(&path) {
                        if matcher.is_match(&rel) {
                            matched.push((rel, path));
                        }
                    }
                }
            }
        }

        matched.sort_by(|a, b| a.0.cmp(&b.0));
        debug!(pattern, count = matched.len(), "resolved pattern");
        Ok(matched.into_iter().map(|(_, p)| p).collect())
    }

    /// Resolve several patterns, keeping the first occurrence of any file
    /// matched by more than one of them.
    pub fn resolve_all(&self, patterns: &[String]) -> Result<Vec<PathBuf>> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for pattern in patterns {
            for path in self.resolve(pattern)? {
                if seen.insert(path.clone()) {
                    files.push(path);
                }
            }
        }
        Ok(files)
    }

    /// Resolve a pattern that must name exactly one file.
    pub fn resolve_one(&self, pattern: &str) -> Result<PathBuf> {
        let mut files = self.resolve(pattern)?;
        match files.len() {
            0 => Err(PipelineError::NoMatch {
                pattern: pattern.to_string(),
            }),
            1 => Ok(files.remove(0)),
            n => {
                warn!(pattern, matches = n, "single-file pattern matched several files; using the first");
                Ok(files.remove(0))
            }
        }
    }

    /// Root-relative string with forward slashes.
    fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        Some(rel.to_string_lossy().replace('\\', "/"))
    }
}

fn compile(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| PipelineError::Config(format!("invalid glob pattern '{pattern}': {e}")))?;
    Ok(glob.compile_matcher())
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Leading directory components that contain no glob syntax.
fn literal_prefix(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();
    let mut parts = pattern.split('/').peekable();
    while let Some(part) = parts.next() {
        // The last component is the file name pattern.
        if parts.peek().is_none() || has_glob_meta(part) {
            break;
        }
        if !part.is_empty() && part != "." {
            prefix.push(part);
        }
    }
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn collector(fs: &MockFileSystem) -> AssetCollector {
        AssetCollector::new(Arc::new(fs.clone()), ".")
    }

    #[test]
    fn literal_prefix_stops_at_first_glob() {
        assert_eq!(literal_prefix("components/scripts/*.js"), PathBuf::from("components/scripts"));
        assert_eq!(literal_prefix("components/**/*.js"), PathBuf::from("components"));
        assert_eq!(literal_prefix("*.js"), PathBuf::new());
    }

    #[test]
    fn resolve_sorts_by_relative_path() {
        let fs = MockFileSystem::new();
        fs.add_file("./components/scripts/c.js", "c");
        fs.add_file("./components/scripts/a.js", "a");
        fs.add_file("./components/scripts/b.js", "b");

        let files = collector(&fs).resolve("components/scripts/*.js").unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.js", "b.js", "c.js"]);
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let fs = MockFileSystem::new();
        fs.add_file("./components/scripts/a.js", "a");
        fs.add_file("./components/scripts/vendor/x.js", "x");

        let c = collector(&fs);
        assert_eq!(c.resolve("components/scripts/*.js").unwrap().len(), 1);
        assert_eq!(c.resolve("components/scripts/**/*.js").unwrap().len(), 2);
    }

    #[test]
    fn missing_base_directory_yields_no_files() {
        let fs = MockFileSystem::new();
        let files = collector(&fs).resolve("components/scripts/*.js").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn resolve_one_reports_no_match() {
        let fs = MockFileSystem::new();
        let err = collector(&fs)
            .resolve_one("components/scss/styles.scss")
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoMatch { pattern } if pattern == "components/scss/styles.scss"));
    }

    #[test]
    fn resolve_all_deduplicates() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/a.js", "a");
        fs.add_file("./src/b.js", "b");

        let patterns = vec!["src/b.js".to_string(), "src/*.js".to_string()];
        let files = collector(&fs).resolve_all(&patterns).unwrap();
        assert_eq!(files, vec![PathBuf::from("./src/b.js"), PathBuf::from("./src/a.js")]);
    }
}

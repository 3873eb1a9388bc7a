// src/watch/served.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::ConfigFile;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::WatchProfile;

/// Files under the dev server's base directory that no stage writes.
///
/// Editing one of them (say `dist/index.html`) only needs a browser reload.
/// Everything the pipeline produces is left out, so a build never reloads
/// through this path, even a build that fails halfway.
#[derive(Debug, Clone)]
pub struct ServedFiles {
    /// Root-relative, `/`-separated; empty when the root itself is served.
    base: String,
    generated: GlobSet,
}

impl ServedFiles {
    pub fn new(base: &Path, generated: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in generated {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .with_context(|| format!("invalid output pattern: {pattern}"))?;
            builder.add(glob);
        }

        Ok(Self {
            base: normalize(&base.to_string_lossy()),
            generated: builder.build()?,
        })
    }

    /// Served base plus every path a stage may write: the concat, minify and
    /// stylesheet destinations, the files prefixed in place, and their maps.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut generated = Vec::new();
        for dest in [
            &cfg.concat().dest,
            &cfg.minify().dest,
            &cfg.compile_styles().dest,
        ] {
            let literal = globset::escape(&normalize(&dest.to_string_lossy()));
            generated.push(format!("{literal}.map"));
            generated.push(literal);
        }
        for pattern in &cfg.prefix_styles().src {
            let pattern = normalize(pattern);
            generated.push(format!("{pattern}.map"));
            generated.push(pattern);
        }

        Self::new(&cfg.server().base, &generated)
    }

    /// Whether a root-relative path is served and not a pipeline output.
    pub fn is_served(&self, rel: &str) -> bool {
        let under_base = self.base.is_empty()
            || rel
                .strip_prefix(&self.base)
                .is_some_and(|rest| rest.starts_with('/'));
        under_base && !self.generated.is_match(rel)
    }

    /// Root-relative paths of `paths` that only call for a reload.
    ///
    /// Paths the watch profile covers are left to the rebuild trigger, and
    /// directories are skipped since creating one changes nothing a browser
    /// shows.
    pub fn changed(&self, root: &Path, paths: &[PathBuf], profile: &WatchProfile) -> Vec<PathBuf> {
        let mut out = BTreeSet::new();
        for path in paths {
            if path.is_dir() {
                continue;
            }
            let Some(rel) = relative_str(root, path) else {
                continue;
            };
            if self.is_served(&rel) && !profile.matches(&rel) {
                out.insert(PathBuf::from(rel));
            }
        }
        out.into_iter().collect()
    }
}

fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut rest = path.as_str();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    let rest = rest.trim_end_matches('/');
    if rest == "." { String::new() } else { rest.to_string() }
}

// src/watch/patterns.rs

//! Glob pattern handling for rerun-on-change targets.
//!
//! Patterns are evaluated against paths relative to the workspace root
//! (the config file's directory), using forward slashes.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Compiled watch / exclude patterns for one target.
#[derive(Debug, Clone)]
pub struct WatchProfile {
    target: String,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl WatchProfile {
    /// Compile the patterns of `target`.
    pub fn new(target: &str, watch: &[String], exclude: &[String]) -> Result<Self> {
        let watch_set = build_globset(watch)
            .with_context(|| format!("building watch globset for target {target}"))?;

        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(
                build_globset(exclude)
                    .with_context(|| format!("building exclude globset for target {target}"))?,
            )
        };

        Ok(Self {
            target: target.to_string(),
            watch_set,
            exclude_set,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Check whether a relative path (with forward slashes) triggers a rerun.
    ///
    /// Exclusion wins over inclusion.
    pub fn matches(&self, rel_path: &str) -> bool {
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        self.watch_set.is_match(rel_path)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! File system watching for re-rendering on template changes.
//!
//! # Features
//!
//! - Debounced file change events (300ms)
//! - Filters for the template extension
//! - Ignores files the command writes itself
//! - Recursive directory watching

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebouncedEvent, Debouncer, RecommendedCache};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Watches a template directory for changes.
///
/// Watching stops when the value is dropped.
pub struct FileWatcher {
    #[allow(dead_code)]
    debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

impl FileWatcher {
    /// Starts watching `path` recursively.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory to watch
    /// * `ext` - Template extension such as `.ect`; empty matches every file
    /// * `ignored` - Files whose changes are never reported, such as the render output
    /// * `on_change` - Callback receiving the changed paths relative to `path`
    pub fn new<F>(path: &Path, ext: &str, ignored: &[PathBuf], on_change: F) -> anyhow::Result<Self>
    where
        F: Fn(Vec<PathBuf>) + Send + 'static,
    {
        let base_path = absolute(path);
        let ext = ext.trim_start_matches('.').to_string();
        let ignored: Vec<PathBuf> = ignored.iter().map(|p| absolute(p)).collect();
        let watch_path = base_path.clone();

        let mut debouncer = new_debouncer(
            Duration::from_millis(300),
            None,
            move |result: Result<Vec<DebouncedEvent>, Vec<notify::Error>>| match result {
                Ok(events) => {
                    let changed = changed_templates(
                        events.iter().flat_map(|e| e.paths.iter()),
                        &base_path,
                        &ext,
                        &ignored,
                    );
                    if !changed.is_empty() {
                        on_change(changed);
                    }
                }
                Err(errors) => {
                    for error in errors {
                        tracing::warn!("Watch error: {}", error);
                    }
                }
            },
        )?;

        debouncer.watch(&watch_path, RecursiveMode::Recursive)?;
        tracing::debug!("Watching {}", path.display());

        Ok(Self { debouncer })
    }
}

/// Canonical form of `path`, falling back to joining it onto the current
/// directory when it does not exist.
pub fn absolute(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    // The parent may exist even when the file itself does not yet.
    if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
        let parent = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
        if let Ok(parent) = parent.canonicalize() {
            return parent.join(name);
        }
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Filters event paths down to changed templates, relative to `base`.
///
/// Paths without the template extension and paths in `ignored` are
/// dropped. The result is sorted and free of duplicates.
pub fn changed_templates<'p, I>(paths: I, base: &Path, ext: &str, ignored: &[PathBuf]) -> Vec<PathBuf>
where
    I: IntoIterator<Item = &'p PathBuf>,
{
    let mut changed: Vec<PathBuf> = paths
        .into_iter()
        .filter(|p| matches_extension(p, ext))
        .filter(|p| !ignored.iter().any(|i| i == *p))
        .map(|p| p.strip_prefix(base).unwrap_or(p).to_path_buf())
        .collect();
    changed.sort();
    changed.dedup();
    changed
}

/// Whether `path` has the extension `ext` (without its dot).
pub fn matches_extension(path: &Path, ext: &str) -> bool {
    if ext.is_empty() {
        return path.file_name().is_some();
    }
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

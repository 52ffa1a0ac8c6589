// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Template resource resolution.
//!
//! # Resolver Implementations
//!
//! - [`FileSystemResolver`]: loads `<root>/<name><ext>` from disk
//! - [`MemoryResourceResolver`]: loads templates registered in memory
//!
//! A missing template is reported as [`EctError::TemplateNotFound`]; any
//! other failure to load one as [`EctError::ResolutionError`].

use crate::error::{EctError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// A resolved template with its canonical key and source text.
#[derive(Debug, Clone)]
pub struct ResolvedResource {
    /// Canonical path of the template; also used as the cache key.
    pub path: String,
    /// Template source.
    pub source: String,
}

/// Trait for locating and loading templates by name.
pub trait ResourceResolver: Send + Sync + 'static {
    /// Loads the template `name`.
    fn resolve(&self, name: &str) -> Result<ResolvedResource>;

    /// Returns the canonical path of `name` without loading it.
    fn get_resolved_path(&self, name: &str) -> Result<String>;
}

/// Converts a path to a string with forward slashes.
pub fn path_to_string<P: AsRef<Path>>(path: P) -> String {
    path.as_ref().to_string_lossy().replace('\\', "/")
}

/// Filesystem-based resolver.
///
/// Relative template names are looked up under the root directory;
/// names starting with `/` are used as they are. The configured extension
/// is appended unless the name already ends with it.
///
/// # Examples
///
/// ```rust,no_run
/// use ect::{FileSystemResolver, ResourceResolver};
///
/// let resolver = FileSystemResolver::new("./templates").with_extension(".ect");
/// let page = resolver.resolve("pages/index")?;
/// # Ok::<(), ect::EctError>(())
/// ```
#[cfg(feature = "filesystem")]
#[derive(Debug, Clone)]
pub struct FileSystemResolver {
    /// The root directory for template resolution.
    pub root_dir: PathBuf,
    /// Extension appended to template names, including its dot.
    pub ext: String,
}

#[cfg(feature = "filesystem")]
impl FileSystemResolver {
    /// Creates a resolver rooted at `root_dir` without an extension.
    pub fn new<P: AsRef<Path>>(root_dir: P) -> Self {
        Self {
            root_dir: root_dir.as_ref().to_path_buf(),
            ext: String::new(),
        }
    }

    /// Sets the extension appended to template names.
    pub fn with_extension(mut self, ext: &str) -> Self {
        self.ext = ext.to_string();
        self
    }

    fn file_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() {
            return Err(EctError::ResolutionError(
                "template name must not be empty".to_string(),
            ));
        }
        let base = if self.ext.is_empty() {
            name
        } else {
            name.strip_suffix(self.ext.as_str()).unwrap_or(name)
        };
        let file = format!("{}{}", base, self.ext);
        let path = Path::new(&file);
        Ok(if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root_dir.join(path)
        })
    }
}

#[cfg(feature = "filesystem")]
impl ResourceResolver for FileSystemResolver {
    fn resolve(&self, name: &str) -> Result<ResolvedResource> {
        let path = self.file_path(name)?;
        tracing::debug!("Resolved path for '{}': {}", name, path.display());
        if !path.is_file() {
            return Err(EctError::TemplateNotFound(path_to_string(&path)));
        }
        let source = std::fs::read_to_string(&path).map_err(|e| {
            EctError::ResolutionError(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        Ok(ResolvedResource {
            path: path_to_string(&path),
            source,
        })
    }

    fn get_resolved_path(&self, name: &str) -> Result<String> {
        self.file_path(name).map(path_to_string)
    }
}

lazy_static! {
    static ref MEMORY_PATH: Regex =
        Regex::new(r"^/[A-Za-z0-9_-]+(?:[./][A-Za-z0-9_-]+)*$").unwrap();
}

/// Resolver serving templates registered in memory.
///
/// Keys are normalized to start with `/` and may only contain ASCII
/// letters, digits, `_`, `-`, with `.` and `/` as separators.
#[derive(Debug, Clone, Default)]
pub struct MemoryResourceResolver {
    templates: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryResourceResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize(name: &str) -> String {
        if name.starts_with('/') {
            name.to_string()
        } else {
            format!("/{}", name)
        }
    }

    fn with_templates<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut HashMap<String, String>) -> T,
    {
        f(&mut self.templates.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Registers a template, replacing an earlier one with the same key.
    pub fn add_template(&self, name: &str, source: impl Into<String>) -> Result<()> {
        let key = Self::normalize(name);
        if !MEMORY_PATH.is_match(&key) {
            return Err(EctError::ResolutionError(format!(
                "Invalid character is used in template name '{}'",
                name
            )));
        }
        let source = source.into();
        self.with_templates(|templates| templates.insert(key, source));
        Ok(())
    }

    /// Removes a template.
    pub fn remove_template(&self, name: &str) {
        let key = Self::normalize(name);
        self.with_templates(|templates| templates.remove(&key));
    }

    /// Removes every template.
    pub fn clear(&self) {
        self.with_templates(HashMap::clear);
    }
}

impl ResourceResolver for MemoryResourceResolver {
    fn resolve(&self, name: &str) -> Result<ResolvedResource> {
        let key = Self::normalize(name);
        let source = self.with_templates(|templates| templates.get(&key).cloned());
        match source {
            Some(source) => Ok(ResolvedResource { path: key, source }),
            None => Err(EctError::TemplateNotFound(key)),
        }
    }

    fn get_resolved_path(&self, name: &str) -> Result<String> {
        Ok(Self::normalize(name))
    }
}

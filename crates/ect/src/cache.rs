// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Compiled program caching.
//!
//! # Cache Implementations
//!
//! - [`MemoryCache`]: in-memory LRU cache
//! - [`NoOpCache`]: never stores anything; every lookup compiles fresh
//!
//! Implement the [`Cache`] trait for other strategies.

use crate::ast::Program;
use crate::error::{EctError, Result};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// Trait for compiled program caches.
///
/// Implementations must be thread-safe so an engine can be shared.
pub trait Cache: Send + Sync + std::fmt::Debug {
    /// Retrieves a program.
    fn get(&self, key: &str) -> Result<Option<Arc<Program>>>;
    /// Stores a program.
    fn set(&self, key: &str, program: Arc<Program>) -> Result<()>;
    /// Removes a program.
    fn remove(&self, key: &str) -> Result<()>;
    /// Removes every program.
    fn clear(&self) -> Result<()>;
    /// Checks if a key is cached.
    fn contains_key(&self, key: &str) -> bool;
}

/// In-memory LRU (Least Recently Used) cache.
///
/// # Examples
///
/// ```rust
/// use ect::{Cache, MemoryCache};
///
/// let cache = MemoryCache::new(100);
/// assert!(!cache.contains_key("index"));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryCache {
    cache: Arc<Mutex<LruCache<String, Arc<Program>>>>,
}

impl MemoryCache {
    /// Creates a cache holding at most `capacity` programs (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LruCache<String, Arc<Program>>>> {
        self.cache
            .lock()
            .map_err(|_| EctError::CacheError("Failed to acquire cache lock".to_string()))
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Arc<Program>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, program: Arc<Program>) -> Result<()> {
        self.lock()?.put(key.to_string(), program);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.pop(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    fn contains_key(&self, key: &str) -> bool {
        self.lock().map(|cache| cache.contains(key)).unwrap_or(false)
    }
}

/// Cache that never stores anything.
#[derive(Debug, Clone, Default)]
pub struct NoOpCache;

impl NoOpCache {
    /// Creates a new no-op cache.
    pub fn new() -> Self {
        Self
    }
}

impl Cache for NoOpCache {
    fn get(&self, _key: &str) -> Result<Option<Arc<Program>>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _program: Arc<Program>) -> Result<()> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }

    fn contains_key(&self, _key: &str) -> bool {
        false
    }
}

// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Template engine tying resolution, compilation, caching and rendering
//! together.
//!
//! # Quick Start
//!
//! ```rust
//! use ect::{Engine, MemoryResourceResolver, Options, Value};
//! use serde_json::json;
//!
//! let resolver = MemoryResourceResolver::new();
//! resolver.add_template("layout", "<main><% content %></main>")?;
//! resolver.add_template("page", "<% extend 'layout' %><% block %>Hi <%= @name %><% end %>")?;
//!
//! let options = Options { extend: ect::ExtendMode::Deferred, ..Options::default() };
//! let engine = Engine::with_options(resolver, options)?;
//! let html = engine.render("page", Value::from(json!({ "name": "Ada" })))?;
//! assert_eq!(html, "<main>Hi Ada</main>");
//! # Ok::<(), ect::EctError>(())
//! ```
//!
//! # Caching
//!
//! Compiled programs are cached under the resolver's canonical path of the
//! template. Use [`Engine::invalidate`] when a template source changes.

use crate::ast::Program;
use crate::cache::{Cache, MemoryCache, NoOpCache};
use crate::context::{Context, ProgramLoader};
use crate::error::Result;
use crate::options::Options;
use crate::parser::compile_with_delimiters;
use crate::resolver::ResourceResolver;
use crate::value::Value;
use std::borrow::Cow;
use std::sync::Arc;

/// Compiles and renders templates loaded through a [`ResourceResolver`].
#[derive(Debug)]
pub struct Engine<R: ResourceResolver> {
    resolver: R,
    cache: Box<dyn Cache>,
    options: Options,
}

impl<R: ResourceResolver> Engine<R> {
    /// Creates an engine with an explicit cache.
    pub fn new(resolver: R, cache: Box<dyn Cache>, options: Options) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            resolver,
            cache,
            options,
        })
    }

    /// Creates an engine whose cache follows `options.cache` and
    /// `options.cache_size`.
    pub fn with_options(resolver: R, options: Options) -> Result<Self> {
        let cache: Box<dyn Cache> = if options.cache {
            Box::new(MemoryCache::new(options.cache_size))
        } else {
            Box::new(NoOpCache::new())
        };
        Self::new(resolver, cache, options)
    }

    /// Creates an engine with default options and an LRU cache of
    /// `cache_size` programs.
    pub fn with_memory_cache(resolver: R, cache_size: usize) -> Result<Self> {
        let options = Options {
            cache_size,
            ..Options::default()
        };
        Self::with_options(resolver, options)
    }

    /// The resource resolver.
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// The engine options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Compiles `source` with the engine's delimiters, bypassing the cache.
    pub fn compile(&self, name: &str, source: &str) -> Result<Program> {
        compile_with_delimiters(name, source, &self.options.open, &self.options.close)
    }

    /// `name` with [`Options::ext`] appended unless it already ends with it.
    pub fn template_name<'n>(&self, name: &'n str) -> Cow<'n, str> {
        let ext = self.options.ext.as_str();
        if ext.is_empty() || name.ends_with(ext) {
            Cow::Borrowed(name)
        } else {
            Cow::Owned(format!("{}{}", name, ext))
        }
    }

    /// Returns the compiled program for the template `name`.
    pub fn get(&self, name: &str) -> Result<Arc<Program>> {
        let name = self.template_name(name);
        let name = name.as_ref();
        if self.options.cache {
            let key = self.resolver.get_resolved_path(name)?;
            if let Some(program) = self.cache.get(&key)? {
                tracing::debug!("Cache hit for '{}'", key);
                return Ok(program);
            }
        }

        let resource = self.resolver.resolve(name)?;
        tracing::debug!("Compiling '{}' from {}", name, resource.path);
        let program = Arc::new(self.compile(name, &resource.source)?);
        if self.options.cache {
            self.cache.set(&resource.path, Arc::clone(&program))?;
        }
        Ok(program)
    }

    /// Renders the template `name` with `data` as self.
    pub fn render(&self, name: &str, data: Value) -> Result<String> {
        let program = self.get(name)?;
        self.run(&program, data)
    }

    /// Renders any serializable value as self.
    pub fn render_serialize<T: serde::Serialize>(&self, name: &str, data: &T) -> Result<String> {
        self.render(name, Value::from_serialize(data)?)
    }

    /// Compiles and renders `source` without caching it. Templates it
    /// includes are still loaded through the resolver.
    pub fn render_source(&self, name: &str, source: &str, data: Value) -> Result<String> {
        let program = self.compile(name, source)?;
        self.run(&program, data)
    }

    /// Drops the cached program of `name`.
    pub fn invalidate(&self, name: &str) -> Result<()> {
        let key = self.resolver.get_resolved_path(&self.template_name(name))?;
        tracing::debug!("Invalidating '{}'", key);
        self.cache.remove(&key)
    }

    /// Drops every cached program.
    pub fn clear_cache(&self) -> Result<()> {
        self.cache.clear()
    }

    /// Whether the program of `name` is cached.
    pub fn cache_contains(&self, name: &str) -> bool {
        self.resolver
            .get_resolved_path(&self.template_name(name))
            .map(|key| self.cache.contains_key(&key))
            .unwrap_or(false)
    }

    fn run(&self, program: &Program, data: Value) -> Result<String> {
        let mut ctx = Context::with_options(self, Value::Null, &self.options);
        program.execute(&mut ctx, data)?;
        Ok(ctx.into_output())
    }
}

impl<R: ResourceResolver> ProgramLoader for Engine<R> {
    fn load(&self, name: &str) -> Result<Arc<Program>> {
        self.get(name)
    }
}

// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]
#![allow(clippy::result_large_err)]

//! # ECT
//!
//! Template engine for text with embedded `<% %>` scripts.
//!
//! ## Features
//!
//! - `<%= expr %>` (HTML-escaped) and `<%- expr %>` (raw) output
//! - `if`, `for`, `switch` control flow with a small expression language
//! - named blocks, layouts via `extend` and partials via `include`
//! - all syntax errors of a template reported at once, with source context
//! - compiled programs cached per template
//!
//! ## Quick Start
//!
//! ```rust
//! use ect::{Engine, MemoryResourceResolver, Value};
//!
//! let resolver = MemoryResourceResolver::new();
//! resolver.add_template("hello", "Hello <%= @name %>!")?;
//!
//! let engine = Engine::with_memory_cache(resolver, 100)?;
//! let data = Value::map(vec![("name", Value::from("<World>"))]);
//! assert_eq!(engine.render("hello", data)?, "Hello &lt;World&gt;!");
//! # Ok::<(), ect::EctError>(())
//! ```

/// Compiled program representation.
pub mod ast;
/// Compiled program caching.
pub mod cache;
/// Per-render execution state.
pub mod context;
/// Main template engine.
pub mod engine;
/// Error types and reporting.
pub mod error;
mod interpreter;
/// Template tokenizer.
pub mod lexer;
/// Engine configuration.
pub mod options;
/// Template compiler.
pub mod parser;
/// Resource resolution (filesystem, memory).
pub mod resolver;
/// Value operations used during execution.
pub mod runtime;
/// Token types.
pub mod token;
/// Template values.
pub mod value;

pub use ast::{Program, DEFAULT_BLOCK};
pub use cache::*;
pub use context::{escape_html, Block, Context, ProgramLoader};
pub use engine::*;
pub use error::*;
pub use lexer::Lexer;
pub use options::*;
pub use parser::{compile, compile_with_delimiters, Compiler};
pub use resolver::*;
pub use token::{Token, TokenKind};
pub use value::*;

#[cfg(test)]
mod tests;

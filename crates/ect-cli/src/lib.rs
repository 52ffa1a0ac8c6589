// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! ECT CLI library.
//!
//! Command-line interface for the ECT template engine.
//!
//! # Usage
//!
//! ```bash
//! ect render page --data data.json     # Render to stdout
//! ect render page -o dist/page.html -w # Re-render on every change
//! ect check page layout partials/item  # Report syntax errors
//! ```
//!
//! # Configuration
//!
//! Defaults are read from `ect.toml` at the project root.

/// CLI commands (render, check).
pub mod commands;
/// Project configuration from `ect.toml`.
pub mod config;
/// File system watching for re-rendering.
pub mod watcher;

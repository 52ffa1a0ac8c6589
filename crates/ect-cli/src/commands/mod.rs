// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! CLI command implementations.
//!
//! - `render`: Render a template to stdout or a file, optionally on every change
//! - `check`: Compile templates and report every syntax error

/// Template syntax check command.
pub mod check;
/// Template render command.
pub mod render;

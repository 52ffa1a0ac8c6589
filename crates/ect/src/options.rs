// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Engine configuration.

use crate::error::{EctError, Result};
use crate::lexer::{DEFAULT_CLOSE, DEFAULT_OPEN};
use serde::{Deserialize, Serialize};

/// What `extend "layout"` does when it executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtendMode {
    /// Include the layout right away, at the position of the statement.
    /// Blocks defined after the `extend` are not visible to the layout.
    #[default]
    Eager,
    /// Remember the layout and include it once the extending template has
    /// finished. Text the template printed outside blocks becomes the
    /// `content` block unless one was defined explicitly.
    Deferred,
}

/// Options shared by the compiler and every render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Script open delimiter.
    pub open: String,
    /// Script close delimiter.
    pub close: String,
    /// Extension appended to template names that do not already end with it.
    pub ext: String,
    /// Keep compiled programs in memory.
    pub cache: bool,
    /// Maximum number of cached programs.
    pub cache_size: usize,
    /// Maximum nesting of includes, content blocks and lambda calls.
    pub max_depth: usize,
    /// Behavior of `extend`.
    pub extend: ExtendMode,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            open: DEFAULT_OPEN.to_string(),
            close: DEFAULT_CLOSE.to_string(),
            ext: String::new(),
            cache: true,
            cache_size: 256,
            max_depth: 64,
            extend: ExtendMode::Eager,
        }
    }
}

impl Options {
    /// Checks that the options can drive a lexer and a render.
    pub fn validate(&self) -> Result<()> {
        if self.open.is_empty() || self.close.is_empty() {
            return Err(EctError::InvalidOptions(
                "script delimiters must not be empty".to_string(),
            ));
        }
        if self.open == self.close {
            return Err(EctError::InvalidOptions(format!(
                "open and close delimiters are both '{}'",
                self.open
            )));
        }
        if self.max_depth == 0 {
            return Err(EctError::InvalidOptions(
                "max_depth must be at least 1".to_string(),
            ));
        }
        if self.cache && self.cache_size == 0 {
            return Err(EctError::InvalidOptions(
                "cache_size must be at least 1 when caching is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! ECT project configuration.
//!
//! Configuration is loaded from `ect.toml` at the project root. Every key
//! is optional; command-line flags override the file.
//!
//! # Example Configuration
//!
//! ```toml
//! [engine]
//! root = "templates"
//! ext = ".ect"
//! open = "<%"
//! close = "%>"
//! cache = true
//! max_depth = 64
//! extend = "deferred"
//!
//! [render]
//! data = "data.json"
//! output = "dist/index.html"
//! ```

use ect::{ExtendMode, Options};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "ect.toml";

/// Main configuration structure loaded from `ect.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Engine settings.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Defaults for the `render` command.
    #[serde(default)]
    pub render: RenderConfig,
}

/// Engine settings.
#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Template root directory (default: ".").
    #[serde(default = "default_root")]
    pub root: String,
    /// Extension appended to template names (default: none).
    #[serde(default)]
    pub ext: String,
    /// Script open delimiter (default: "<%").
    #[serde(default = "default_open")]
    pub open: String,
    /// Script close delimiter (default: "%>").
    #[serde(default = "default_close")]
    pub close: String,
    /// Cache compiled templates (default: true).
    #[serde(default = "default_cache")]
    pub cache: bool,
    /// Maximum include and call nesting.
    #[serde(default)]
    pub max_depth: Option<usize>,
    /// Behavior of `extend` (default: "eager").
    #[serde(default)]
    pub extend: ExtendMode,
}

/// Defaults for the `render` command.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct RenderConfig {
    /// JSON file providing the template's self value.
    pub data: Option<String>,
    /// File the output is written to instead of stdout.
    pub output: Option<String>,
}

fn default_root() -> String {
    ".".to_string()
}

fn default_open() -> String {
    "<%".to_string()
}

fn default_close() -> String {
    "%>".to_string()
}

fn default_cache() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            ext: String::new(),
            open: default_open(),
            close: default_close(),
            cache: default_cache(),
            max_depth: None,
            extend: ExtendMode::default(),
        }
    }
}

impl EngineConfig {
    /// Engine options described by this section.
    pub fn options(&self) -> Options {
        let defaults = Options::default();
        Options {
            open: self.open.clone(),
            close: self.close.clone(),
            ext: self.ext.clone(),
            cache: self.cache,
            max_depth: self.max_depth.unwrap_or(defaults.max_depth),
            extend: self.extend,
            ..defaults
        }
    }
}

impl Config {
    /// Loads configuration from `ect.toml` in the current directory.
    ///
    /// If no configuration file exists, returns default configuration.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Loads configuration from `path`, or defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("No {} found, using defaults", path.display());
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses configuration text.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.engine.options().validate()?;
        Ok(config)
    }
}

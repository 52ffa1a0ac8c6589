// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Render command.

use crate::config::{Config, EngineConfig};
use crate::watcher::FileWatcher;
use console::style;
use ect::{Engine, FileSystemResolver, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// Arguments of the render command.
#[derive(Debug, Clone, Default)]
pub struct RenderArgs {
    /// Template name, relative to the engine root.
    pub template: String,
    /// JSON file providing the self value; overrides `[render] data`.
    pub data: Option<PathBuf>,
    /// Output file; overrides `[render] output`. Stdout when unset.
    pub output: Option<PathBuf>,
    /// Keep running and re-render whenever a template changes.
    pub watch: bool,
}

/// Creates an engine reading templates from the configured root.
///
/// The configured extension reaches the resolver through [`ect::Options::ext`].
pub fn build_engine(config: &EngineConfig) -> anyhow::Result<Engine<FileSystemResolver>> {
    let resolver = FileSystemResolver::new(&config.root);
    Ok(Engine::with_options(resolver, config.options())?)
}

/// Reads the self value from a JSON file, or null without one.
pub fn load_data(path: Option<&Path>) -> anyhow::Result<Value> {
    let Some(path) = path else {
        return Ok(Value::Null);
    };
    let content = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read data file '{}': {}", path.display(), e))?;
    let json: serde_json::Value = serde_json::from_str(&content)?;
    Ok(Value::from(json))
}

/// Runs the render command.
pub fn run(config: &Config, args: &RenderArgs) -> anyhow::Result<()> {
    let engine = build_engine(&config.engine)?;
    let data_path = args
        .data
        .clone()
        .or_else(|| config.render.data.as_ref().map(PathBuf::from));
    let output = args
        .output
        .clone()
        .or_else(|| config.render.output.as_ref().map(PathBuf::from));

    render_once(&engine, &args.template, data_path.as_deref(), output.as_deref())?;
    if !args.watch {
        return Ok(());
    }

    let (tx, rx) = mpsc::channel();
    let root = Path::new(&config.engine.root);
    let ignored: Vec<PathBuf> = output.iter().cloned().collect();
    let _watcher = FileWatcher::new(root, &config.engine.ext, &ignored, move |paths: Vec<PathBuf>| {
        let _ = tx.send(paths);
    })?;

    eprintln!("Watching for changes in: {}", root.display());
    eprintln!("Press Ctrl+C to stop...");

    for paths in rx {
        let files = paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        eprintln!("  File changed: {} - re-rendering", files);
        engine.clear_cache()?;
        if let Err(e) = render_once(&engine, &args.template, data_path.as_deref(), output.as_deref()) {
            eprintln!("{} {:#}", style("error:").red().bold(), e);
        }
    }
    Ok(())
}

/// Renders `template` once and writes the result.
pub fn render_once(
    engine: &Engine<FileSystemResolver>,
    template: &str,
    data: Option<&Path>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let data = load_data(data)?;
    let text = engine.render(template, data)?;
    match output {
        Some(path) => {
            write_if_changed(path, &text)?;
        }
        None => print!("{}", text),
    }
    Ok(())
}

/// Writes `text` to `path` unless the file already holds it, creating
/// parent directories. Returns whether the file was written.
pub fn write_if_changed(path: &Path, text: &str) -> anyhow::Result<bool> {
    if fs::read_to_string(path).is_ok_and(|existing| existing == text) {
        tracing::debug!("{} is up to date", path.display());
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    tracing::info!("Wrote {} bytes to {}", text.len(), path.display());
    Ok(true)
}

// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use clap::{Args, Parser, Subcommand};
use ect::ExtendMode;
use ect_cli::commands;
use ect_cli::commands::render::RenderArgs;
use ect_cli::config::{Config, CONFIG_FILE};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ect")]
#[command(author = "Maravilla Labs")]
#[command(version)]
#[command(about = "Render and check <% %> script templates", long_about = None)]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(flatten)]
    engine: EngineFlags,

    #[command(subcommand)]
    command: Commands,
}

/// Flags overriding the `[engine]` section of the configuration.
#[derive(Args)]
struct EngineFlags {
    /// Template root directory
    #[arg(long, global = true)]
    root: Option<String>,
    /// Extension appended to template names, e.g. ".ect"
    #[arg(long, global = true)]
    ext: Option<String>,
    /// Script open delimiter
    #[arg(long, global = true)]
    open: Option<String>,
    /// Script close delimiter
    #[arg(long, global = true)]
    close: Option<String>,
    /// Behavior of `extend`: eager or deferred
    #[arg(long, global = true, value_parser = parse_extend_mode)]
    extend: Option<ExtendMode>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template
    Render {
        /// Template name, relative to the root
        template: String,
        /// JSON file used as the template's self value
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Write the result to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Re-render whenever a template changes
        #[arg(short, long)]
        watch: bool,
    },
    /// Compile templates and report syntax errors
    Check {
        /// Template names, relative to the root
        #[arg(required = true)]
        templates: Vec<String>,
    },
}

fn parse_extend_mode(value: &str) -> Result<ExtendMode, String> {
    match value {
        "eager" => Ok(ExtendMode::Eager),
        "deferred" => Ok(ExtendMode::Deferred),
        other => Err(format!("expected 'eager' or 'deferred', got '{}'", other)),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with the specified log level
    let filter = EnvFilter::try_new(&cli.log_level)
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load_from(&cli.config)?;
    let flags = cli.engine;
    if let Some(root) = flags.root {
        config.engine.root = root;
    }
    if let Some(ext) = flags.ext {
        config.engine.ext = ext;
    }
    if let Some(open) = flags.open {
        config.engine.open = open;
    }
    if let Some(close) = flags.close {
        config.engine.close = close;
    }
    if let Some(extend) = flags.extend {
        config.engine.extend = extend;
    }

    match cli.command {
        Commands::Render {
            template,
            data,
            output,
            watch,
        } => commands::render::run(
            &config,
            &RenderArgs {
                template,
                data,
                output,
                watch,
            },
        ),
        Commands::Check { templates } => commands::check::run(&config, &templates),
    }
}

// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Check command: compile templates without rendering them.

use crate::commands::render::build_engine;
use crate::config::Config;
use console::style;
use ect::{EctError, Engine, ResourceResolver};

/// Outcome of checking a set of templates.
#[derive(Debug, Default)]
pub struct CheckReport {
    /// Templates that compiled.
    pub passed: Vec<String>,
    /// Templates that failed, with their error.
    pub failed: Vec<(String, EctError)>,
}

/// Compiles every template in `names`.
pub fn check_templates<R: ResourceResolver>(engine: &Engine<R>, names: &[String]) -> CheckReport {
    let mut report = CheckReport::default();
    for name in names {
        match engine.get(name) {
            Ok(_) => report.passed.push(name.clone()),
            Err(e) => report.failed.push((name.clone(), e)),
        }
    }
    report
}

/// Runs the check command, printing every error found.
pub fn run(config: &Config, templates: &[String]) -> anyhow::Result<()> {
    let engine = build_engine(&config.engine)?;
    let report = check_templates(&engine, templates);

    for name in &report.passed {
        println!("{} {}", style("ok").green(), name);
    }
    for (name, error) in &report.failed {
        println!("{} {}", style("FAILED").red().bold(), name);
        match error.compile_errors() {
            Some(errors) => {
                for e in errors {
                    println!("{}", e);
                }
            }
            None => println!("{}", error),
        }
    }

    if !report.failed.is_empty() {
        anyhow::bail!(
            "{} of {} template(s) failed to compile",
            report.failed.len(),
            templates.len()
        );
    }
    Ok(())
}

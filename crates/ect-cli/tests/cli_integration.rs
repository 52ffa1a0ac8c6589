// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use ect::ExtendMode;
use ect_cli::commands::check::check_templates;
use ect_cli::commands::render::{self, RenderArgs};
use ect_cli::config::Config;
use std::fs;
use tempfile::TempDir;

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let templates = dir.path().join("templates");
    fs::create_dir_all(templates.join("partials")).unwrap();
    fs::write(templates.join("layout.ect"), "<html><% content %></html>").unwrap();
    fs::write(templates.join("partials/item.ect"), "<li><%= @name %></li>").unwrap();
    fs::write(
        templates.join("page.ect"),
        "<% extend 'layout' %><ul><% for item in @items %><% include 'partials/item', item %><% end %></ul>",
    )
    .unwrap();
    fs::write(templates.join("broken.ect"), "<% if %>a<% end %>\n<% for in xs %>b<% end %>").unwrap();
    fs::write(
        dir.path().join("data.json"),
        r#"{ "items": [{ "name": "a" }, { "name": "b & c" }] }"#,
    )
    .unwrap();
    dir
}

fn config_for(dir: &TempDir, extend: &str) -> Config {
    let text = format!(
        "[engine]\nroot = \"{}\"\next = \".ect\"\nextend = \"{}\"\n",
        dir.path().join("templates").display().to_string().replace('\\', "/"),
        extend
    );
    Config::parse(&text).unwrap()
}

#[test]
fn test_config_defaults_and_parsing() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.engine.root, ".");
    assert_eq!(config.engine.extend, ExtendMode::Eager);
    assert!(config.render.data.is_none());

    let config = Config::parse(
        "[engine]\nopen = \"{{\"\nclose = \"}}\"\nmax_depth = 10\n[render]\noutput = \"out.html\"\n",
    )
    .unwrap();
    let options = config.engine.options();
    assert_eq!(options.open, "{{");
    assert_eq!(options.max_depth, 10);
    assert_eq!(config.render.output.as_deref(), Some("out.html"));
}

#[test]
fn test_config_rejects_invalid_options() {
    assert!(Config::parse("[engine]\nopen = \"\"\n").is_err());
    assert!(Config::parse("[engine]\nextend = \"later\"\n").is_err());
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_from(&dir.path().join("ect.toml")).unwrap();
    assert!(config.engine.cache);
}

#[test]
fn test_render_to_file() {
    let dir = project();
    let config = config_for(&dir, "deferred");
    let output = dir.path().join("dist/page.html");
    let args = RenderArgs {
        template: "page".to_string(),
        data: Some(dir.path().join("data.json")),
        output: Some(output.clone()),
        watch: false,
    };
    render::run(&config, &args).unwrap();
    assert_eq!(
        fs::read_to_string(output).unwrap(),
        "<html><ul><li>a</li><li>b &amp; c</li></ul></html>"
    );
}

#[test]
fn test_render_missing_template_fails() {
    let dir = project();
    let config = config_for(&dir, "eager");
    let args = RenderArgs {
        template: "nope".to_string(),
        output: Some(dir.path().join("out.html")),
        ..RenderArgs::default()
    };
    assert!(render::run(&config, &args).is_err());
}

#[test]
fn test_check_reports_every_error() {
    let dir = project();
    let config = config_for(&dir, "eager");
    let engine = render::build_engine(&config.engine).unwrap();
    let names = vec!["page".to_string(), "broken".to_string(), "layout".to_string()];

    let report = check_templates(&engine, &names);
    assert_eq!(report.passed, vec!["page".to_string(), "layout".to_string()]);
    assert_eq!(report.failed.len(), 1);
    let (name, error) = &report.failed[0];
    assert_eq!(name, "broken");
    assert!(error.compile_errors().unwrap().len() >= 2);
}

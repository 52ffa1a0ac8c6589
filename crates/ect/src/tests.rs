// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use crate::*;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

// Helper function to create an engine over in-memory templates
fn memory_engine(templates: &[(&str, &str)], options: Options) -> Engine<MemoryResourceResolver> {
    let resolver = MemoryResourceResolver::new();
    for (name, source) in templates {
        resolver.add_template(name, *source).unwrap();
    }
    Engine::with_options(resolver, options).unwrap()
}

fn deferred() -> Options {
    Options {
        extend: ExtendMode::Deferred,
        ..Options::default()
    }
}

fn try_render(source: &str, data: serde_json::Value) -> Result<String> {
    let engine = memory_engine(&[], Options::default());
    engine.render_source("test", source, Value::from(data))
}

fn render(source: &str) -> String {
    try_render(source, json!({})).unwrap()
}

fn render_with(source: &str, data: serde_json::Value) -> String {
    try_render(source, data).unwrap()
}

#[cfg(test)]
mod output_tests {
    use super::*;

    #[test]
    fn test_escaped_and_raw_output() {
        assert_eq!(render(r#"<%= "a & b" %>"#), "a &amp; b");
        assert_eq!(render(r#"<%- "a & b" %>"#), "a & b");
        assert_eq!(render(r#"<%= "<b title='x'>" %>"#), "&lt;b title=&#39;x&#39;&gt;");
    }

    #[test]
    fn test_recompiling_gives_identical_output() {
        let source = "<% block 'row' %><li><%= label(item) %></li><% end %>\
            <% label = (i) -> i.name + '=' + i.n * 2 end %>\
            <% for item in @items %><% content 'row' %><% end %>\
            <% for k in {z: 1, a: 2, m: 3} %><%= k %><% end %>";
        let data = Value::from(json!({ "items": [{ "name": "a", "n": 1 }, { "name": "<b>", "n": 2 }] }));
        let engine = memory_engine(&[], Options::default());

        let outputs: Vec<String> = (0..2)
            .map(|_| {
                let program = compile("page", source).unwrap();
                let mut ctx = Context::with_options(&engine, Value::Null, engine.options());
                program.execute(&mut ctx, data.clone()).unwrap();
                ctx.into_output()
            })
            .collect();
        assert_eq!(outputs[0], "<li>a=2</li><li>&lt;b&gt;=4</li>zam");
        assert_eq!(outputs[0], outputs[1]);
    }

    #[test]
    fn test_text_is_kept_verbatim() {
        assert_eq!(render("a<%= 1 %>b\n  c"), "a1b\n  c");
        assert_eq!(render("no scripts at all"), "no scripts at all");
        assert_eq!(render(""), "");
    }

    #[test]
    fn test_value_stringification() {
        assert_eq!(render("[<%= null %>]"), "[]");
        assert_eq!(render("<%= 1 < 2 %>"), "true");
        assert_eq!(render("<%= [1, 'a', true] %>"), "1,a,true");
        assert_eq!(render("<%= 7 / 2 %>"), "3");
        assert_eq!(render("<%= 7.0 / 2 %>"), "3.5");
        assert_eq!(render("<%= 1.5 + 1 %>"), "2.5");
        assert_eq!(render("<%= 'n=' + 3 %>"), "n=3");
        assert_eq!(render("<%= -(2 + 3) * 2 %>"), "-10");
    }

    #[test]
    fn test_self_members() {
        let data = json!({ "user": { "name": "Ada", "tags": ["x", "y"] } });
        assert_eq!(
            render_with("<%= @user.name %>:<%= @user.tags.length %>", data),
            "Ada:2"
        );
        assert_eq!(render("<%= 'héllo'.length %>"), "5");
    }

    #[test]
    fn test_custom_delimiters() {
        let options = Options {
            open: "{{".into(),
            close: "}}".into(),
            ..Options::default()
        };
        let engine = memory_engine(&[], options);
        let out = engine
            .render_source("test", "Hi {{= @name }}<% kept %>", Value::from(json!({ "name": "Ada" })))
            .unwrap();
        assert_eq!(out, "Hi Ada<% kept %>");
    }

    #[test]
    fn test_host_object_members() {
        #[derive(Debug)]
        struct Clock;

        impl Object for Clock {
            fn type_name(&self) -> &str {
                "Clock"
            }

            fn get_member(&self, name: &str) -> Option<Value> {
                (name == "hour").then_some(Value::Int(12))
            }
        }

        let engine = memory_engine(&[], Options::default());
        let data = Value::map(vec![("clock", Value::object(Clock))]);
        let out = engine
            .render_source("test", "<%= @clock.hour %> <%= @clock %>", data)
            .unwrap();
        assert_eq!(out, "12 [object Clock]");
    }
}

#[cfg(test)]
mod control_flow_tests {
    use super::*;

    #[test]
    fn test_for_loop() {
        assert_eq!(render("<% for x in [1,2,3] %><%= x %><% end %>"), "123");
        assert_eq!(render("<% for k in {b: 1, a: 2} %><%= k %>,<% end %>"), "b,a,");
        assert_eq!(render("<% for c in 'abc' %>[<%= c %>]<% end %>"), "[a][b][c]");
        assert_eq!(render("<% for x in [] %>never<% end %>"), "");
    }

    #[test]
    fn test_for_over_scalar_fails() {
        let err = try_render("<% for x in 5 %><% end %>", json!({})).unwrap_err();
        assert!(matches!(err, EctError::InvalidOperation(_)));
    }

    #[test]
    fn test_if_else() {
        assert_eq!(render("<% if 1 > 2 %>A<% else %>B<% end %>"), "B");
        assert_eq!(render("<% if 2 > 1 %>A<% else %>B<% end %>"), "A");
        assert_eq!(render("<% if null %>A<% end %>"), "");
    }

    #[test]
    fn test_string_truthiness_is_inverted() {
        assert_eq!(render("<% if 'text' %>yes<% else %>no<% end %>"), "no");
        assert_eq!(render("<% if '' %>yes<% else %>no<% end %>"), "yes");
        assert_eq!(render("<%= !'text' %>"), "true");
    }

    #[test]
    fn test_switch() {
        let source = "<% switch 2 %><% when 1 %>one<% when 2 %>two<% else %>other<% end %>";
        assert_eq!(render(source), "two");
        let source = "<% switch 9 %><% when 1 %>one<% else %>other<% end %>";
        assert_eq!(render(source), "other");
        let source = "<% switch 9 %><% when 1 %>one<% end %>";
        assert_eq!(render(source), "");
    }

    #[test]
    fn test_switch_uses_value_equality() {
        let source = "<% switch @kind %>\n<% when 'a' %>A<% when 'b' %>B<% end %>";
        assert_eq!(render_with(source, json!({ "kind": "b" })), "B");
        assert_eq!(render("<% switch 2.0 %><% when 2 %>two<% end %>"), "two");
    }

    #[test]
    fn test_loop_variables_share_one_slot() {
        let source = "<% for x in [1,2] %><% for x in ['a'] %><% end %><%= x %><% end %>";
        assert_eq!(render(source), "aa");
    }

    #[test]
    fn test_operators() {
        assert_eq!(render("<%= 1 > 0 ? 'y' : 'n' %>"), "y");
        assert_eq!(render("<%= null ?? 'd' %>"), "d");
        assert_eq!(render("<%= 0 ?? 'd' %>"), "0");
        assert_eq!(render("<%= 0 || 2 %>"), "true");
        assert_eq!(render("<%= 1 && 0 %>"), "false");
        assert_eq!(render("<%= 7 % 3 %>"), "1");
        assert_eq!(render("<%= 'a' < 'b' %>"), "true");
        assert_eq!(render("<%= 1 == 1.0 %><%= 1 != '1' %>"), "truetrue");
        assert_eq!(render("<%= (1, 2, 3) %>"), "3");
    }

    #[test]
    fn test_short_circuit_skips_right_operand() {
        // A missing member would fail if evaluated.
        assert_eq!(render("<%= false && @missing %>"), "false");
        assert_eq!(render("<%= true || @missing %>"), "true");
        assert_eq!(render("<%= 1 ?? @missing %>"), "1");
    }

    #[test]
    fn test_assignment_and_update() {
        assert_eq!(render("<% i = 1 %><% i += 4 %><% i *= 2 %><%= i %>"), "10");
        assert_eq!(render("<% i = 1 %><%= i++ %><%= i %><%= ++i %>"), "123");
        assert_eq!(render("<% i = 5 %><%= --i %><%= i-- %><%= i %>"), "443");
        assert_eq!(render("<% s = 'a' %><% s += 'b' %><%= s %>"), "ab");
    }

    #[test]
    fn test_optional_member_access() {
        assert_eq!(render_with("[<%= @user?.name %>]", json!({ "user": null })), "[]");
        let err = try_render("<%= @user.name %>", json!({ "user": null })).unwrap_err();
        assert!(matches!(err, EctError::MemberNotFound { member, .. } if member == "name"));
    }

    #[test]
    fn test_missing_self_member() {
        let err = try_render("<%= @missing %>", json!({})).unwrap_err();
        assert_eq!(err.to_string(), "Member 'missing' doesn't exist in map value");
    }

    #[test]
    fn test_division_by_zero() {
        let err = try_render("<%= 1 / 0 %>", json!({})).unwrap_err();
        assert!(matches!(err, EctError::InvalidOperation(_)));
    }
}

#[cfg(test)]
mod block_tests {
    use super::*;

    const LAYOUT: &str = "<html><% content %></html>";

    #[test]
    fn test_eager_extend_after_blocks() {
        let engine = memory_engine(
            &[
                ("layout", LAYOUT),
                ("page", "<% block %>Body<% end %><% extend 'layout' %>"),
            ],
            Options::default(),
        );
        assert_eq!(engine.render("page", Value::Null).unwrap(), "<html>Body</html>");
    }

    #[test]
    fn test_eager_extend_before_blocks_sees_nothing() {
        let engine = memory_engine(
            &[
                ("layout", LAYOUT),
                ("page", "<% extend 'layout' %><% block %>Body<% end %>"),
            ],
            Options::default(),
        );
        assert_eq!(engine.render("page", Value::Null).unwrap(), "<html></html>");
    }

    #[test]
    fn test_deferred_extend() {
        let engine = memory_engine(
            &[
                ("layout", LAYOUT),
                ("page", "<% extend 'layout' %>\n<% block %>Body<% end %>\n"),
                ("plain", "<% extend 'layout' %>Hello <%= @name %>"),
            ],
            deferred(),
        );
        assert_eq!(engine.render("page", Value::Null).unwrap(), "<html>Body</html>");
        let data = Value::from(json!({ "name": "Ada" }));
        assert_eq!(engine.render("plain", data).unwrap(), "<html>Hello Ada</html>");
    }

    #[test]
    fn test_deferred_nested_layouts() {
        let engine = memory_engine(
            &[
                ("base", "<body><% content %></body>"),
                ("mid", "<% extend 'base' %><main><% content 'inner' %></main>"),
                ("page", "<% extend 'mid' %><% block 'inner' %>X<% end %>"),
            ],
            deferred(),
        );
        assert_eq!(
            engine.render("page", Value::Null).unwrap(),
            "<body><main>X</main></body>"
        );
    }

    #[test]
    fn test_named_blocks() {
        let engine = memory_engine(
            &[
                ("layout", "<title><% content 'title' %></title><% content %>"),
                (
                    "page",
                    "<% block 'title' %>T<% end %><% block %>B<% end %><% extend 'layout' %>",
                ),
            ],
            Options::default(),
        );
        assert_eq!(engine.render("page", Value::Null).unwrap(), "<title>T</title>B");
    }

    #[test]
    fn test_block_resolution() {
        assert_eq!(render("[<% content 'nope' %>]"), "[]");
        assert_eq!(
            render("<% block 'x' %>1<% end %><% block 'x' %>2<% end %><% content 'x' %>"),
            "2"
        );
    }

    #[test]
    fn test_block_reads_variables_when_called() {
        let source = "<% v = 1 %><% block 'b' %><%= v %><% end %><% v = 2 %><% content 'b' %>";
        assert_eq!(render(source), "2");
    }

    #[test]
    fn test_block_keeps_variables_of_its_template() {
        let engine = memory_engine(
            &[
                ("layout", LAYOUT),
                (
                    "page",
                    "<% title = 'Hi' %><% block %><%= title %><% end %><% extend 'layout' %>",
                ),
            ],
            Options::default(),
        );
        assert_eq!(engine.render("page", Value::Null).unwrap(), "<html>Hi</html>");
    }

    #[test]
    fn test_blocks_defined_by_includes_are_shared() {
        let engine = memory_engine(
            &[("defs", "<% block 'x' %>from partial<% end %>")],
            Options::default(),
        );
        let out = engine
            .render_source("page", "<% include 'defs' %><% content 'x' %>", Value::Null)
            .unwrap();
        assert_eq!(out, "from partial");
    }
}

#[cfg(test)]
mod include_tests {
    use super::*;

    #[test]
    fn test_include_with_argument() {
        let engine = memory_engine(&[("item", "<li><%= @name %></li>")], Options::default());
        let source = "<ul><% for u in @users %><% include 'item', u %><% end %></ul><%= @title %>";
        let data = json!({ "title": "T", "users": [{ "name": "a" }, { "name": "b" }] });
        let out = engine.render_source("page", source, Value::from(data)).unwrap();
        assert_eq!(out, "<ul><li>a</li><li>b</li></ul>T");
    }

    #[test]
    fn test_include_without_argument_keeps_self() {
        let engine = memory_engine(&[("hello", "Hi <%= @name %>")], Options::default());
        let data = Value::from(json!({ "name": "Ada" }));
        assert_eq!(
            engine.render_source("page", "<% include 'hello' %>", data.clone()).unwrap(),
            "Hi Ada"
        );
        assert_eq!(
            engine.render_source("page", "<% include 'hello', null %>", data).unwrap(),
            "Hi Ada"
        );
    }

    #[test]
    fn test_missing_include() {
        let err = try_render("<% include 'nope' %>", json!({})).unwrap_err();
        assert!(matches!(err, EctError::TemplateNotFound(_)));
    }

    #[test]
    fn test_recursive_include() {
        let engine = memory_engine(
            &[(
                "tree",
                "<%= @name %><% for c in @children %>(<% include 'tree', c %>)<% end %>",
            )],
            Options::default(),
        );
        let data = json!({ "name": "a", "children": [
            { "name": "b", "children": [] },
            { "name": "c", "children": [{ "name": "d", "children": [] }] }
        ] });
        assert_eq!(engine.render("tree", Value::from(data)).unwrap(), "a(b)(c(d))");
    }

    #[test]
    fn test_runaway_include_hits_limit() {
        let options = Options {
            max_depth: 8,
            ..Options::default()
        };
        let engine = memory_engine(&[("loop", "x<% include 'loop' %>")], options);
        let err = engine.render("loop", Value::Null).unwrap_err();
        assert!(matches!(err, EctError::RecursionLimit { limit: 8, .. }));
    }
}

#[cfg(test)]
mod lambda_tests {
    use super::*;

    #[test]
    fn test_lambda_call() {
        assert_eq!(render("<% add = (a, b) -> a + b end %><%= add(2, 3) %>"), "5");
        assert_eq!(render("<% twice = (x) -> { x * 2 } %><%= twice(21) %>"), "42");
        assert_eq!(render("<% k = () -> 'k' end %><%= k() %>"), "k");
    }

    #[test]
    fn test_lambda_with_template_body() {
        let source = "<% li = (x) -> %><li><%= x %></li><% end %><% for i in [1,2] %><% li(i) %><% end %>";
        assert_eq!(render(source), "<li>1</li><li>2</li>");
    }

    #[test]
    fn test_lambda_parameters_are_restored() {
        let source = "<% x = 'outer' %><% f = (x) -> x end %><%= f('inner') %><%= x %>";
        assert_eq!(render(source), "innerouter");
    }

    #[test]
    fn test_invalid_invocations() {
        let err = try_render("<% f = (a) -> a end %><%= f() %>", json!({})).unwrap_err();
        assert!(matches!(err, EctError::InvalidInvocation(_)));
        let err = try_render("<%= @name() %>", json!({ "name": "x" })).unwrap_err();
        assert!(matches!(err, EctError::InvalidInvocation(_)));
    }

    #[test]
    fn test_native_function() {
        let upper = Value::function("upper", |args| {
            let text = args.first().map(|v| v.to_string()).unwrap_or_default();
            Ok(Value::from(text.to_uppercase()))
        });
        let engine = memory_engine(&[], Options::default());
        let data = Value::map(vec![("upper", upper)]);
        let out = engine
            .render_source("test", "<%= @upper('abc') %>", data)
            .unwrap();
        assert_eq!(out, "ABC");
    }

    #[test]
    fn test_runaway_lambda_hits_limit() {
        let options = Options {
            max_depth: 16,
            ..Options::default()
        };
        let engine = memory_engine(&[], options);
        let err = engine
            .render_source("test", "<% f = () -> f() end %><% f() %>", Value::Null)
            .unwrap_err();
        assert!(matches!(err, EctError::RecursionLimit { limit: 16, .. }));
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn test_all_errors_are_reported() {
        let err = try_render("<% if %>a<% end %>\n<% for in xs %>b<% end %>", json!({})).unwrap_err();
        let errors = err.compile_errors().unwrap();
        assert!(errors.len() >= 2);
        assert!(err.is_compile_error());
    }

    #[test]
    fn test_unclosed_script() {
        let err = try_render("ok\n<% if true", json!({})).unwrap_err();
        let errors = err.compile_errors().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!((errors[0].line, errors[0].column), (2, 1));
        assert!(errors[0].message.contains("not closed"));
    }

    #[test]
    fn test_error_display_names_the_template() {
        let err = try_render("<%= ) %>", json!({})).unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("Failed to compile test (1 error(s)):"));
        assert!(text.contains("test:1:5: expression expected, found ')'"));
    }

    #[test]
    fn test_broken_template_is_not_cached() {
        let engine = memory_engine(&[("bad", "<% if %>")], Options::default());
        assert!(engine.render("bad", Value::Null).unwrap_err().is_compile_error());
        assert!(!engine.cache_contains("bad"));
    }
}

#[cfg(test)]
mod engine_tests {
    use super::*;

    #[test]
    fn test_cache_and_invalidate() {
        let engine = memory_engine(&[("page", "v1")], Options::default());
        assert_eq!(engine.render("page", Value::Null).unwrap(), "v1");
        assert!(engine.cache_contains("page"));

        engine.resolver().add_template("page", "v2").unwrap();
        assert_eq!(engine.render("page", Value::Null).unwrap(), "v1");

        engine.invalidate("page").unwrap();
        assert!(!engine.cache_contains("page"));
        assert_eq!(engine.render("page", Value::Null).unwrap(), "v2");

        engine.clear_cache().unwrap();
        assert!(!engine.cache_contains("page"));
    }

    #[test]
    fn test_cache_disabled() {
        let options = Options {
            cache: false,
            ..Options::default()
        };
        let engine = memory_engine(&[("page", "x")], options);
        engine.render("page", Value::Null).unwrap();
        assert!(!engine.cache_contains("page"));
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let options = Options {
            open: "%".into(),
            close: "%".into(),
            ..Options::default()
        };
        let err = Engine::with_options(MemoryResourceResolver::new(), options).unwrap_err();
        assert!(matches!(err, EctError::InvalidOptions(_)));
    }

    #[test]
    fn test_render_serialize() {
        #[derive(serde::Serialize)]
        struct Page {
            title: String,
            items: Vec<u32>,
        }

        let engine = memory_engine(
            &[("page", "<h1><%= @title %></h1><% for i in @items %><%= i %><% end %>")],
            Options::default(),
        );
        let page = Page {
            title: "Home".into(),
            items: vec![1, 2],
        };
        assert_eq!(engine.render_serialize("page", &page).unwrap(), "<h1>Home</h1>12");
    }

    #[test]
    #[cfg(feature = "filesystem")]
    fn test_filesystem_templates() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("partials")).unwrap();
        fs::write(temp_dir.path().join("layout.ect"), "<html><% content %></html>").unwrap();
        fs::write(temp_dir.path().join("partials/greet.ect"), "Hi <%= @name %>").unwrap();
        fs::write(
            temp_dir.path().join("page.ect"),
            "<% block %><% include 'partials/greet' %><% end %><% extend 'layout' %>",
        )
        .unwrap();

        let resolver = FileSystemResolver::new(temp_dir.path()).with_extension(".ect");
        let engine = Engine::with_memory_cache(resolver, 10).unwrap();
        let data = Value::from(json!({ "name": "Ada" }));
        assert_eq!(engine.render("page", data.clone()).unwrap(), "<html>Hi Ada</html>");

        fs::write(temp_dir.path().join("page.ect"), "changed").unwrap();
        assert_eq!(engine.render("page", data.clone()).unwrap(), "<html>Hi Ada</html>");
        engine.invalidate("page").unwrap();
        assert_eq!(engine.render("page", data).unwrap(), "changed");
    }

    #[test]
    #[cfg(feature = "filesystem")]
    fn test_options_ext_is_applied_to_names() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("layout.ect"), "[<% content %>]").unwrap();
        fs::write(temp_dir.path().join("page.ect"), "<% extend 'layout' %>").unwrap();

        let options = Options {
            ext: ".ect".into(),
            ..Options::default()
        };
        let engine = Engine::with_options(FileSystemResolver::new(temp_dir.path()), options).unwrap();
        assert_eq!(engine.render("page", Value::Null).unwrap(), "[]");
        assert_eq!(engine.render("page.ect", Value::Null).unwrap(), "[]");
        assert!(engine.cache_contains("page"));
        assert!(engine.cache_contains("layout.ect"));

        engine.invalidate("page").unwrap();
        assert!(!engine.cache_contains("page.ect"));
    }

    #[test]
    fn test_options_ext_with_memory_templates() {
        let options = Options {
            ext: ".html".into(),
            ..Options::default()
        };
        let engine = memory_engine(&[("page.html", "<% include 'part' %>!"), ("part.html", "hi")], options);
        assert_eq!(engine.template_name("page"), "page.html");
        assert_eq!(engine.template_name("page.html"), "page.html");
        assert_eq!(engine.render("page", Value::Null).unwrap(), "hi!");
    }

    #[test]
    fn test_engine_is_shareable_across_threads() {
        let engine = std::sync::Arc::new(memory_engine(
            &[("n", "<%= @n * 2 %>")],
            Options::default(),
        ));
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let engine = std::sync::Arc::clone(&engine);
                std::thread::spawn(move || engine.render("n", Value::from(json!({ "n": n }))).unwrap())
            })
            .collect();
        let results: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results, vec!["0", "2", "4", "6"]);
    }
}

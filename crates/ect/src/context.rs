// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Per-render execution state.
//!
//! A [`Context`] owns everything one render mutates: the output buffer,
//! the current self value, the registry of named blocks and the nesting
//! depth. Templates included during the render share the same context, so
//! a layout sees the blocks its child registered and writes into the same
//! buffer.

use crate::ast::{Program, Stmt, DEFAULT_BLOCK};
use crate::error::{EctError, Result};
use crate::interpreter::{self, Frame};
use crate::options::{ExtendMode, Options};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Loads compiled programs by template name for `include` and `extend`.
///
/// [`Engine`](crate::Engine) implements this through its resolver and cache.
pub trait ProgramLoader {
    /// Returns the program for `name`, compiling it if needed.
    fn load(&self, name: &str) -> Result<Arc<Program>>;
}

/// A named piece of template registered with `block`.
#[derive(Clone)]
pub enum Block {
    /// Statements from a `block … end`, bound to the variables of the
    /// program that registered them.
    Compiled {
        /// Block statements.
        body: Arc<[Stmt]>,
        /// Variable frame of the registering program.
        frame: Arc<Frame>,
    },
    /// Pre-rendered text.
    Text(String),
}

impl Block {
    /// A block that produces nothing.
    pub fn empty() -> Self {
        Block::Text(String::new())
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Block::Compiled { body, .. } => write!(f, "Compiled({} statements)", body.len()),
            Block::Text(text) => write!(f, "Text({:?})", text),
        }
    }
}

/// Mutable state of one render.
pub struct Context<'a> {
    loader: &'a dyn ProgramLoader,
    output: String,
    self_value: Value,
    blocks: HashMap<String, Block>,
    depth: usize,
    max_depth: usize,
    extend_mode: ExtendMode,
    pending_layout: Option<String>,
}

impl<'a> Context<'a> {
    /// Creates a context with default limits.
    pub fn new(loader: &'a dyn ProgramLoader, self_value: Value) -> Self {
        Self::with_options(loader, self_value, &Options::default())
    }

    /// Creates a context taking its nesting limit and extend mode from
    /// `options`.
    pub fn with_options(loader: &'a dyn ProgramLoader, self_value: Value, options: &Options) -> Self {
        Self {
            loader,
            output: String::new(),
            self_value,
            blocks: HashMap::new(),
            depth: 0,
            max_depth: options.max_depth,
            extend_mode: options.extend,
            pending_layout: None,
        }
    }

    /// Text produced so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Consumes the context, returning the produced text.
    pub fn into_output(self) -> String {
        self.output
    }

    /// The value `@name` reads from.
    pub fn self_value(&self) -> &Value {
        &self.self_value
    }

    /// Replaces the self value, returning the previous one.
    pub fn replace_self(&mut self, value: Value) -> Value {
        std::mem::replace(&mut self.self_value, value)
    }

    /// Appends template text verbatim.
    pub fn append_text(&mut self, text: &str) {
        self.output.push_str(text);
    }

    /// Appends the string form of `value`, HTML-encoded.
    pub fn append_escaped(&mut self, value: &Value) {
        escape_html_into(&value.to_string(), &mut self.output);
    }

    /// Appends the string form of `value` unchanged.
    pub fn append_raw(&mut self, value: &Value) {
        use std::fmt::Write;
        // Writing into a String cannot fail.
        let _ = write!(self.output, "{}", value);
    }

    /// Registers `block` under `name`, replacing an earlier registration.
    pub fn define_block(&mut self, name: &str, block: Block) {
        tracing::debug!("Defining block '{}'", name);
        self.blocks.insert(name.to_string(), block);
    }

    /// The block registered under `name`, or an empty one.
    pub fn resolve_block(&self, name: &str) -> Block {
        match self.blocks.get(name) {
            Some(block) => block.clone(),
            None => {
                tracing::debug!("Block '{}' is not defined, rendering nothing", name);
                Block::empty()
            }
        }
    }

    /// Whether a block is registered under `name`.
    pub fn has_block(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }

    /// Runs the block registered under `name` with the current self value.
    pub fn call_block(&mut self, name: &str) -> Result<()> {
        let block = self.resolve_block(name);
        self.enter(name)?;
        let result = interpreter::run_block(self, &block);
        self.leave();
        result
    }

    /// Renders the template `name` into this context.
    ///
    /// A non-null `argument` becomes the self value of the included
    /// template; the previous self value is restored afterwards.
    pub fn include(&mut self, name: &str, argument: Value) -> Result<()> {
        tracing::debug!("Including template '{}'", name);
        let program = self.loader.load(name)?;
        self.enter(name)?;
        let saved = (!argument.is_null()).then(|| self.replace_self(argument));
        let result = self.render_program(&program);
        if let Some(saved) = saved {
            self.self_value = saved;
        }
        self.leave();
        result
    }

    /// Handles `extend "layout"` according to the configured mode.
    pub fn extend(&mut self, layout: &str) -> Result<()> {
        match self.extend_mode {
            ExtendMode::Eager => self.include(layout, Value::Null),
            ExtendMode::Deferred => {
                tracing::debug!("Deferring layout '{}'", layout);
                self.pending_layout = Some(layout.to_string());
                Ok(())
            }
        }
    }

    /// Executes `program` as the current template with the current self.
    ///
    /// In deferred extend mode, a layout requested while the program ran
    /// is rendered afterwards, and the output the program produced is
    /// taken out of the buffer. Non-blank output becomes the default block;
    /// blank output only does when no default block is registered yet.
    pub fn render_program(&mut self, program: &Program) -> Result<()> {
        let mark = self.output.len();
        let outer_layout = self.pending_layout.take();
        let result = interpreter::execute(program, self);
        let layout = std::mem::replace(&mut self.pending_layout, outer_layout);
        result?;

        if let Some(layout) = layout {
            let body = self.output.split_off(mark);
            if !body.trim().is_empty() || !self.has_block(DEFAULT_BLOCK) {
                self.define_block(DEFAULT_BLOCK, Block::Text(body));
            }
            self.include(&layout, Value::Null)?;
        }
        Ok(())
    }

    pub(crate) fn enter(&mut self, name: &str) -> Result<()> {
        if self.depth >= self.max_depth {
            return Err(EctError::RecursionLimit {
                template: name.to_string(),
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

/// HTML-encodes `& < > " '`.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_html_into(text, &mut out);
    out
}

fn escape_html_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

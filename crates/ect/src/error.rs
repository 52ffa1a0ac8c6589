// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Error types for the ECT template engine.
//!
//! This module defines [`EctError`], the main error enum, and
//! [`TemplateError`], the structured record produced for every syntax
//! problem found while compiling a template.
//!
//! # Error Categories
//!
//! - **Compile errors**: [`EctError::CompileFailed`] carries the complete,
//!   ordered list of [`TemplateError`]s found in one template
//! - **Runtime errors**: member lookup, invocation and operator failures
//!   abort the render in progress
//! - **Resolution errors**: template name could not be turned into source
//! - **Resource exhaustion**: [`EctError::RecursionLimit`] for runaway
//!   include or call nesting
//!
//! # Source Context
//!
//! Compile errors may include a [`SourceContext`] showing the problematic
//! lines with a caret under the reported column.

use std::fmt;
use thiserror::Error;

/// Source context for enhanced error messages.
///
/// Captures a snippet of source code around an error location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceContext {
    /// Lines of the snippet, paired with their 1-based line number.
    pub lines: Vec<(usize, String)>,
    /// The line number where the error occurred (1-indexed).
    pub error_line: usize,
    /// The column number where the error occurred (1-indexed).
    pub error_column: usize,
}

impl SourceContext {
    /// Creates a source context from source code and error location.
    ///
    /// Captures up to 3 lines before and after the error line.
    pub fn from_source(source: &str, line: usize, column: usize) -> Self {
        let first = line.saturating_sub(3).max(1);
        let last = line + 3;
        let lines = source
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.to_string()))
            .filter(|(n, _)| *n >= first && *n <= last)
            .collect();

        Self {
            lines,
            error_line: line,
            error_column: column,
        }
    }

    /// Formats the source snippet with line numbers and error indicator.
    ///
    /// ```text
    ///    4 | <ul>
    ///    5 | <% for in items %>
    ///      |        ^
    ///    6 | </ul>
    /// ```
    pub fn format_snippet(&self) -> String {
        let mut result = String::new();
        for (line_num, line) in &self.lines {
            result.push_str(&format!("{:4} | {}\n", line_num, line));
            if *line_num == self.error_line {
                result.push_str(&format!(
                    "     | {}^\n",
                    " ".repeat(self.error_column.saturating_sub(1))
                ));
            }
        }
        result
    }
}

impl fmt::Display for SourceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_snippet())
    }
}

/// A structured compile error: where it happened and what went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateError {
    /// Name of the template being compiled.
    pub template_name: String,
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
    /// Human readable description.
    pub message: String,
    /// Snippet of the surrounding source, when available.
    pub source_context: Option<SourceContext>,
}

impl TemplateError {
    /// Creates an error record without source context.
    pub fn new(template_name: &str, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            template_name: template_name.to_string(),
            line,
            column,
            message: message.into(),
            source_context: None,
        }
    }

    /// Attaches a snippet of `source` around the error position.
    pub fn with_source(mut self, source: &str) -> Self {
        self.source_context = Some(SourceContext::from_source(source, self.line, self.column));
        self
    }
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.template_name, self.line, self.column, self.message
        )?;
        if let Some(ctx) = &self.source_context {
            write!(f, "\n{}", ctx)?;
        }
        Ok(())
    }
}

/// Display helper joining a list of compile errors, one per line.
pub struct ErrorListDisplay<'a>(pub &'a [TemplateError]);

impl fmt::Display for ErrorListDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", e)?;
        }
        Ok(())
    }
}

/// The main error type for ECT operations.
#[derive(Error, Debug)]
pub enum EctError {
    /// One or more syntax errors were found; no program was produced.
    #[error("Failed to compile {template} ({} error(s)):\n{}", .errors.len(), ErrorListDisplay(.errors))]
    CompileFailed {
        /// The template that failed to compile.
        template: String,
        /// Every error found, in source order.
        errors: Vec<TemplateError>,
    },

    /// Member lookup failed on a value.
    #[error("Member '{member}' doesn't exist in {target}")]
    MemberNotFound {
        /// The requested member name.
        member: String,
        /// Short description of the value that was searched.
        target: String,
    },

    /// A non-callable value was invoked.
    #[error("Invalid invocation: {0}")]
    InvalidInvocation(String),

    /// An operator was applied to values it does not support.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// An included or extended template does not exist.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// A template name could not be resolved to source text.
    #[error("Resolution error: {0}")]
    ResolutionError(String),

    /// Include, block or lambda nesting went deeper than allowed.
    #[error("Recursion limit of {limit} exceeded while rendering {template}")]
    RecursionLimit {
        /// The template being entered when the limit was hit.
        template: String,
        /// The configured nesting limit.
        limit: usize,
    },

    /// Cache operation failed.
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Engine options are inconsistent.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Data conversion error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EctError {
    /// Returns true when this error is a compile failure rather than a
    /// runtime failure.
    pub fn is_compile_error(&self) -> bool {
        matches!(self, EctError::CompileFailed { .. })
    }

    /// Returns the structured errors of a compile failure.
    pub fn compile_errors(&self) -> Option<&[TemplateError]> {
        match self {
            EctError::CompileFailed { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

/// Convenience type alias for Results with [`EctError`].
pub type Result<T> = std::result::Result<T, EctError>;

// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Recursive-descent compiler from tokens to a [`Program`].
//!
//! # Statements
//!
//! ```text
//! extend "layout"
//! block ["name"] … end
//! content ["name"]
//! include "name" [, expr]
//! for ident in expr … end
//! switch expr when v … [when v …]* [else …] end
//! if expr … [else …] end
//! <%= expr %>   <%- expr %>
//! expr
//! ```
//!
//! # Expressions, lowest to highest precedence
//!
//! ```text
//! assignment   = += -= *= /= %=          (right)
//! conditional  ?:                        (right)
//! logical      && || ??
//! equality     == != (=== !==)
//! relational   < <= > >=
//! additive     + -
//! multiplicative * / %
//! unary        + - ! ++ --
//! postfix      ++ --
//! call/member  f(args) a.b a?.b
//! primary      literals, ident, @ident, [..], {..}, (..), (params) -> body
//! ```
//!
//! # Error recovery
//!
//! Every syntax problem is recorded as a [`TemplateError`]; the compiler
//! then skips tokens up to the next `end`, text token or end of input and
//! carries on. Compilation fails after the whole template was read if at
//! least one error was recorded.
//!
//! Statements and expressions may nest at most [`MAX_NESTING`] levels deep.
//! Going deeper records one error and skips the rest of the template.

use crate::ast::*;
use crate::error::{EctError, Result, TemplateError};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Deepest nesting of statements and expressions the compiler accepts.
pub const MAX_NESTING: usize = 128;

/// Compiles `source` using the default delimiters.
///
/// # Examples
///
/// ```rust
/// let program = ect::compile("hello", "Hello <%= @name %>!").unwrap();
/// assert_eq!(program.name, "hello");
/// ```
pub fn compile(name: &str, source: &str) -> Result<Program> {
    Compiler::new(Lexer::new(name, source)).compile()
}

/// Compiles `source` using custom script delimiters.
pub fn compile_with_delimiters(name: &str, source: &str, open: &str, close: &str) -> Result<Program> {
    Compiler::new(Lexer::with_delimiters(name, source, open, close)).compile()
}

/// Consumes a token stream and builds one [`Program`].
pub struct Compiler<'src> {
    lexer: Lexer<'src>,
    current: Token,
    errors: Vec<TemplateError>,
    slots: Vec<String>,
    slot_index: HashMap<String, SlotId>,
    /// Nesting of `-> { … }` lambda bodies; `}` ends a statement list inside one.
    brace_depth: usize,
    depth: usize,
    nesting_exceeded: bool,
}

impl<'src> Compiler<'src> {
    /// Creates a compiler reading from `lexer`.
    pub fn new(lexer: Lexer<'src>) -> Self {
        Self {
            lexer,
            current: Token::new(TokenKind::Eof, None, 1, 1),
            errors: Vec::new(),
            slots: Vec::new(),
            slot_index: HashMap::new(),
            brace_depth: 0,
            depth: 0,
            nesting_exceeded: false,
        }
    }

    /// Parses the whole template.
    ///
    /// Returns [`EctError::CompileFailed`] with every recorded error when
    /// the template has syntax errors.
    pub fn compile(mut self) -> Result<Program> {
        let name = self.lexer.template_name().to_string();
        self.advance();

        let mut body = Vec::new();
        loop {
            self.parse_statements(&mut body);
            if self.current.kind == TokenKind::Eof {
                break;
            }
            let message = format!("unexpected {}", self.current);
            self.error(message);
        }

        if !self.errors.is_empty() {
            tracing::debug!("Compile of '{}' failed with {} error(s)", name, self.errors.len());
            let source = self.lexer.source();
            let errors = self
                .errors
                .into_iter()
                .map(|e| e.with_source(source))
                .collect();
            return Err(EctError::CompileFailed {
                template: name,
                errors,
            });
        }

        tracing::debug!(
            "Compiled '{}': {} statement(s), {} slot(s)",
            name,
            body.len(),
            self.slots.len()
        );
        Ok(Program {
            name,
            body: body.into(),
            slots: self.slots,
        })
    }

    // ----- token handling -------------------------------------------------

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn take_text(&mut self) -> String {
        self.current.value.take().unwrap_or_default()
    }

    fn skip_indent(&mut self) {
        if self.at(TokenKind::Colon) {
            self.advance();
        }
    }

    fn slot(&mut self, name: &str) -> SlotId {
        if let Some(slot) = self.slot_index.get(name) {
            return *slot;
        }
        let slot = self.slots.len();
        self.slots.push(name.to_string());
        self.slot_index.insert(name.to_string(), slot);
        slot
    }

    // ----- errors ---------------------------------------------------------

    fn record_error(&mut self, message: String) {
        self.record_error_at(self.current.line, self.current.column, message);
    }

    fn record_error_at(&mut self, line: usize, column: usize, message: String) {
        if self.nesting_exceeded {
            return;
        }
        tracing::debug!(
            "{}:{}:{}: {}",
            self.lexer.template_name(),
            line,
            column,
            message
        );
        self.errors.push(TemplateError::new(
            self.lexer.template_name(),
            line,
            column,
            message,
        ));
    }

    /// Records an error at the current token and resynchronizes.
    fn error(&mut self, message: String) {
        self.record_error(message);
        self.recover();
    }

    /// Reports the current token as unexpected; lexer error tokens report
    /// their own problem instead.
    fn unexpected(&mut self, expected: &str) {
        let message = match self.current.kind {
            TokenKind::ScriptNotClosed => self.current.text().to_string(),
            TokenKind::Invalid => format!("invalid token '{}'", self.current.text()),
            _ => format!("{} expected, found {}", expected, self.current),
        };
        self.error(message);
    }

    /// Skips to the next `end`, text token or end of input.
    fn recover(&mut self) {
        if matches!(self.current.kind, TokenKind::End | TokenKind::Html) {
            self.advance();
        }
        while !matches!(
            self.current.kind,
            TokenKind::Eof | TokenKind::End | TokenKind::Html
        ) {
            self.advance();
        }
    }

    /// Runs `parse` one nesting level deeper. Past [`MAX_NESTING`] the
    /// rest of the template is skipped and later errors are suppressed.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        if self.depth >= MAX_NESTING {
            self.record_error(format!("nested too deeply (limit {})", MAX_NESTING));
            self.nesting_exceeded = true;
            while !self.at(TokenKind::Eof) {
                self.advance();
            }
            return None;
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn expect_end(&mut self) -> Option<()> {
        if self.at(TokenKind::End) {
            self.advance();
            Some(())
        } else {
            self.unexpected("'end'");
            None
        }
    }

    // ----- statements -----------------------------------------------------

    fn parse_statements(&mut self, out: &mut Vec<Stmt>) {
        self.nested(|p| {
            p.parse_statement_list(out);
            Some(())
        });
    }

    fn parse_statement_list(&mut self, out: &mut Vec<Stmt>) {
        loop {
            let stmt = match self.current.kind {
                TokenKind::Eof
                | TokenKind::Else
                | TokenKind::End
                | TokenKind::In
                | TokenKind::When => return,
                TokenKind::RBrace if self.brace_depth > 0 => return,
                TokenKind::Html => {
                    let text = self.take_text();
                    self.advance();
                    (!text.is_empty()).then_some(Stmt::Text(text))
                }
                TokenKind::Extend => self.parse_extend(),
                TokenKind::Block => self.parse_block(),
                TokenKind::Content => self.parse_content(),
                TokenKind::Include => self.parse_include(),
                TokenKind::Escape => self.parse_output(true),
                TokenKind::Unescape => self.parse_output(false),
                TokenKind::For => self.parse_for(),
                TokenKind::Switch => self.parse_switch(),
                TokenKind::If => self.parse_if(),
                _ => self.parse_assignment().map(Stmt::Expr),
            };
            if let Some(stmt) = stmt {
                out.push(stmt);
            }
        }
    }

    fn parse_name(&mut self) -> Option<String> {
        if self.at(TokenKind::String) {
            let name = self.take_text();
            self.advance();
            Some(name)
        } else {
            self.unexpected("template name string");
            None
        }
    }

    fn parse_optional_name(&mut self) -> String {
        if self.at(TokenKind::String) {
            let name = self.take_text();
            self.advance();
            name
        } else {
            DEFAULT_BLOCK.to_string()
        }
    }

    fn parse_extend(&mut self) -> Option<Stmt> {
        self.advance();
        self.parse_name().map(Stmt::Extend)
    }

    fn parse_include(&mut self) -> Option<Stmt> {
        self.advance();
        let name = self.parse_name()?;
        let argument = if self.at(TokenKind::Comma) {
            self.advance();
            Some(self.parse_assignment()?)
        } else {
            None
        };
        Some(Stmt::Include { name, argument })
    }

    fn parse_block(&mut self) -> Option<Stmt> {
        self.advance();
        let name = self.parse_optional_name();
        self.skip_indent();
        let mut body = Vec::new();
        self.parse_statements(&mut body);
        self.expect_end()?;
        Some(Stmt::Block {
            name,
            body: body.into(),
        })
    }

    fn parse_content(&mut self) -> Option<Stmt> {
        self.advance();
        Some(Stmt::Content(self.parse_optional_name()))
    }

    fn parse_output(&mut self, escape: bool) -> Option<Stmt> {
        self.advance();
        let expr = self.parse_assignment()?;
        Some(Stmt::Output { expr, escape })
    }

    fn parse_if(&mut self) -> Option<Stmt> {
        self.advance();
        let test = self.parse_assignment();
        self.skip_indent();

        let mut then_branch = Vec::new();
        self.parse_statements(&mut then_branch);

        let mut else_branch = Vec::new();
        if self.at(TokenKind::Else) {
            self.advance();
            self.skip_indent();
            self.parse_statements(&mut else_branch);
        }

        self.expect_end()?;
        Some(Stmt::If {
            test: test?,
            then_branch,
            else_branch,
        })
    }

    fn parse_for(&mut self) -> Option<Stmt> {
        self.advance();
        let header = self.parse_for_header();
        self.skip_indent();

        let mut body = Vec::new();
        self.parse_statements(&mut body);
        self.expect_end()?;

        let (slot, collection) = header?;
        Some(Stmt::For {
            slot,
            collection,
            body,
        })
    }

    fn parse_for_header(&mut self) -> Option<(SlotId, Expr)> {
        if !self.at(TokenKind::Ident) {
            self.unexpected("loop variable");
            return None;
        }
        let name = self.take_text();
        let slot = self.slot(&name);
        self.advance();

        if !self.at(TokenKind::In) {
            self.unexpected("'in'");
            return None;
        }
        self.advance();
        let collection = self.parse_assignment()?;
        Some((slot, collection))
    }

    fn parse_switch(&mut self) -> Option<Stmt> {
        self.advance();
        let subject = self.parse_assignment();
        self.skip_indent();

        let mut complete = subject.is_some();
        let mut cases = Vec::new();
        let mut default: Option<Vec<Stmt>> = None;
        loop {
            match self.current.kind {
                // Layout whitespace between the header and the first arm.
                TokenKind::Html
                    if cases.is_empty()
                        && default.is_none()
                        && self.current.text().trim().is_empty() =>
                {
                    self.advance();
                }
                TokenKind::When => {
                    self.advance();
                    let value = self.parse_assignment();
                    self.skip_indent();
                    let mut body = Vec::new();
                    self.parse_statements(&mut body);
                    match value {
                        Some(value) => cases.push((value, body)),
                        None => complete = false,
                    }
                }
                TokenKind::Else => {
                    if default.is_some() {
                        self.record_error("duplicate 'else' in switch".to_string());
                        complete = false;
                    }
                    self.advance();
                    self.skip_indent();
                    let mut body = Vec::new();
                    self.parse_statements(&mut body);
                    if default.is_none() {
                        default = Some(body);
                    }
                }
                TokenKind::End => {
                    self.advance();
                    break;
                }
                _ => {
                    self.unexpected("'when', 'else' or 'end'");
                    return None;
                }
            }
        }

        if !complete {
            return None;
        }
        Some(Stmt::Switch {
            subject: subject?,
            cases,
            default,
        })
    }

    // ----- expressions ----------------------------------------------------

    fn parse_assignment(&mut self) -> Option<Expr> {
        self.nested(Self::parse_assignment_expr)
    }

    fn parse_assignment_expr(&mut self) -> Option<Expr> {
        let (line, column) = (self.current.line, self.current.column);
        let lhs = self.parse_conditional()?;

        let op = match self.current.kind {
            TokenKind::Assign => None,
            TokenKind::AddAssign => Some(BinaryOp::Add),
            TokenKind::SubAssign => Some(BinaryOp::Sub),
            TokenKind::MulAssign => Some(BinaryOp::Mul),
            TokenKind::DivAssign => Some(BinaryOp::Div),
            TokenKind::ModAssign => Some(BinaryOp::Mod),
            _ => return Some(lhs),
        };
        let Expr::Var(slot) = lhs else {
            self.record_error_at(
                line,
                column,
                "invalid assignment target; only variables can be assigned".to_string(),
            );
            self.recover();
            return None;
        };
        self.advance();
        let value = self.parse_assignment()?;
        Some(Expr::Assign {
            slot,
            op,
            value: Box::new(value),
        })
    }

    fn parse_conditional(&mut self) -> Option<Expr> {
        let test = self.parse_logical()?;
        if !self.at(TokenKind::Question) {
            return Some(test);
        }
        self.advance();
        let then = self.parse_assignment()?;
        if !self.at(TokenKind::Colon) {
            self.unexpected("':'");
            return None;
        }
        self.advance();
        let otherwise = self.parse_assignment()?;
        Some(Expr::Conditional {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn parse_logical(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_equality()?;
        loop {
            let op = match self.current.kind {
                TokenKind::And => LogicalOp::And,
                TokenKind::Or => LogicalOp::Or,
                TokenKind::DoubleQuestion => LogicalOp::Coalesce,
                _ => return Some(lhs),
            };
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = Expr::Logical {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn parse_equality(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::Ne => BinaryOp::Ne,
                _ => return Some(lhs),
            };
            self.advance();
            let rhs = self.parse_relational()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_relational(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => return Some(lhs),
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_additive(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Add => BinaryOp::Add,
                TokenKind::Sub => BinaryOp::Sub,
                _ => return Some(lhs),
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_multiplicative(&mut self) -> Option<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Mul => BinaryOp::Mul,
                TokenKind::Div => BinaryOp::Div,
                TokenKind::Mod => BinaryOp::Mod,
                _ => return Some(lhs),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        let op = match self.current.kind {
            TokenKind::Add => UnaryOp::Plus,
            TokenKind::Sub => UnaryOp::Neg,
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Inc | TokenKind::Dec => {
                let op = if self.at(TokenKind::Inc) {
                    UpdateOp::Inc
                } else {
                    UpdateOp::Dec
                };
                self.advance();
                let operand = self.nested(Self::parse_unary)?;
                return self.update(op, true, operand);
            }
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.nested(Self::parse_unary)?;
        Some(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> Option<Expr> {
        let operand = self.parse_call_member()?;
        let op = match self.current.kind {
            TokenKind::Inc => UpdateOp::Inc,
            TokenKind::Dec => UpdateOp::Dec,
            _ => return Some(operand),
        };
        let expr = self.update(op, false, operand)?;
        self.advance();
        Some(expr)
    }

    fn update(&mut self, op: UpdateOp, prefix: bool, operand: Expr) -> Option<Expr> {
        match operand {
            Expr::Var(slot) => Some(Expr::Update { op, prefix, slot }),
            _ => {
                self.error("'++' and '--' can only be applied to variables".to_string());
                None
            }
        }
    }

    fn parse_call_member(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current.kind {
                TokenKind::LParen => {
                    let args = self.parse_arguments()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                TokenKind::Dot | TokenKind::QuestionDot => {
                    let optional = self.at(TokenKind::QuestionDot);
                    self.advance();
                    let name = self.parse_member_name()?;
                    expr = Expr::Member {
                        target: Box::new(expr),
                        name,
                        optional,
                    };
                }
                _ => return Some(expr),
            }
        }
    }

    fn parse_arguments(&mut self) -> Option<Vec<Expr>> {
        self.advance();
        let mut args = Vec::new();
        if self.at(TokenKind::RParen) {
            self.advance();
            return Some(args);
        }
        loop {
            args.push(self.parse_assignment()?);
            match self.current.kind {
                TokenKind::Comma => self.advance(),
                TokenKind::RParen => {
                    self.advance();
                    return Some(args);
                }
                _ => {
                    self.unexpected("',' or ')'");
                    return None;
                }
            }
        }
    }

    /// Identifiers and keywords are both valid member names.
    fn parse_member_name(&mut self) -> Option<String> {
        if is_word(self.current.kind) {
            let name = self.take_text();
            self.advance();
            Some(name)
        } else {
            self.unexpected("member name");
            None
        }
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        let expr = match self.current.kind {
            TokenKind::Null => Expr::Literal(Value::Null),
            TokenKind::True => Expr::Literal(Value::Bool(true)),
            TokenKind::False => Expr::Literal(Value::Bool(false)),
            TokenKind::String => Expr::Literal(Value::String(self.take_text())),
            TokenKind::Number => Expr::Literal(parse_number(self.current.text())),
            TokenKind::Ident => {
                let name = self.take_text();
                Expr::Var(self.slot(&name))
            }
            TokenKind::At => {
                self.advance();
                return self.parse_member_name().map(Expr::SelfMember);
            }
            TokenKind::LParen => return self.parse_paren_or_lambda(),
            TokenKind::LBracket => return self.parse_array(),
            TokenKind::LBrace => return self.parse_map(),
            _ => {
                self.unexpected("expression");
                return None;
            }
        };
        self.advance();
        Some(expr)
    }

    fn parse_array(&mut self) -> Option<Expr> {
        self.advance();
        let mut items = Vec::new();
        if self.at(TokenKind::RBracket) {
            self.advance();
            return Some(Expr::Array(items));
        }
        loop {
            items.push(self.parse_assignment()?);
            match self.current.kind {
                TokenKind::Comma => self.advance(),
                TokenKind::RBracket => {
                    self.advance();
                    return Some(Expr::Array(items));
                }
                _ => {
                    self.unexpected("',' or ']'");
                    return None;
                }
            }
        }
    }

    fn parse_map(&mut self) -> Option<Expr> {
        self.advance();
        let mut entries = Vec::new();
        if self.at(TokenKind::RBrace) {
            self.advance();
            return Some(Expr::Map(entries));
        }
        loop {
            if !(is_word(self.current.kind) || self.at(TokenKind::String)) {
                self.unexpected("map key");
                return None;
            }
            if self.lexer.peek().kind != TokenKind::Colon {
                let message = format!("':' expected after map key '{}'", self.current.text());
                self.error(message);
                return None;
            }
            let key = self.take_text();
            self.advance();
            self.advance();
            let value = self.parse_assignment()?;
            entries.push((key, value));
            match self.current.kind {
                TokenKind::Comma => self.advance(),
                TokenKind::RBrace => {
                    self.advance();
                    return Some(Expr::Map(entries));
                }
                _ => {
                    self.unexpected("',' or '}'");
                    return None;
                }
            }
        }
    }

    /// `( … )` is a grouping or comma sequence, unless it is followed by an
    /// arrow and holds only bare identifiers, in which case it is a lambda.
    fn parse_paren_or_lambda(&mut self) -> Option<Expr> {
        self.advance();
        let mut items = Vec::new();
        if self.at(TokenKind::RParen) {
            self.advance();
        } else {
            loop {
                items.push(self.parse_assignment()?);
                match self.current.kind {
                    TokenKind::Comma => self.advance(),
                    TokenKind::RParen => {
                        self.advance();
                        break;
                    }
                    _ => {
                        self.unexpected("',' or ')'");
                        return None;
                    }
                }
            }
        }

        if !self.at(TokenKind::Arrow) {
            return match items.len() {
                0 => {
                    self.error("empty parenthesized expression".to_string());
                    None
                }
                1 => items.pop(),
                _ => Some(Expr::Sequence(items)),
            };
        }

        let params: Option<Vec<SlotId>> = items
            .iter()
            .map(|e| match e {
                Expr::Var(slot) => Some(*slot),
                _ => None,
            })
            .collect();
        let Some(params) = params else {
            self.error("lambda parameters must be plain identifiers".to_string());
            return None;
        };
        self.advance();

        let mut body = Vec::new();
        if self.at(TokenKind::LBrace) {
            self.advance();
            self.brace_depth += 1;
            self.parse_statements(&mut body);
            self.brace_depth -= 1;
            if !self.at(TokenKind::RBrace) {
                self.unexpected("'}'");
                return None;
            }
            self.advance();
        } else {
            self.parse_statements(&mut body);
            self.expect_end()?;
        }
        Some(Expr::Lambda(Arc::new(LambdaDef { params, body })))
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn is_word(kind: TokenKind) -> bool {
    use TokenKind::*;
    matches!(
        kind,
        Ident
            | Include
            | Content
            | Extend
            | Block
            | If
            | Else
            | For
            | In
            | Switch
            | When
            | End
            | Null
            | True
            | False
    )
}

fn parse_number(text: &str) -> Value {
    if !text.contains('.') {
        if let Ok(i) = text.parse::<i64>() {
            return Value::Int(i);
        }
    }
    Value::Float(text.parse::<f64>().unwrap_or(f64::NAN))
}

// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Compiled program representation.
//!
//! The [`Compiler`](crate::parser::Compiler) turns a token stream into a
//! [`Program`]: a tree of [`Stmt`]s and [`Expr`]s that the
//! [`interpreter`](crate::interpreter) walks. A program is immutable once
//! built and can be executed any number of times, from any thread, as long
//! as every execution uses its own [`Context`](crate::Context).
//!
//! # Variable slots
//!
//! Every identifier used in a template maps to one numbered slot for the
//! whole program. Loop variables, assignments and reads of the same name
//! in different blocks all share that slot.

use crate::value::Value;
use std::sync::Arc;

/// Index of a program-wide variable slot.
pub type SlotId = usize;

/// Name of the block used when `block` or `content` has no name.
pub const DEFAULT_BLOCK: &str = "content";

/// A compiled template.
#[derive(Debug, Clone)]
pub struct Program {
    /// Template name the program was compiled from.
    pub name: String,
    /// Top-level statements.
    pub body: Arc<[Stmt]>,
    /// Slot names, indexed by [`SlotId`].
    pub slots: Vec<String>,
}

impl Program {
    /// Number of variable slots a fresh execution frame needs.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Looks up the slot of a variable name.
    pub fn slot(&self, name: &str) -> Option<SlotId> {
        self.slots.iter().position(|s| s == name)
    }
}

/// A statement.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Literal template text, appended verbatim.
    Text(String),
    /// `<%= expr %>` (escaped) or `<%- expr %>` (raw).
    Output {
        /// The value to print.
        expr: Expr,
        /// Whether the text is HTML-encoded.
        escape: bool,
    },
    /// `extend "layout"`.
    Extend(String),
    /// `include "name"` with an optional self override.
    Include {
        /// Template to render.
        name: String,
        /// Replacement self value for the included template.
        argument: Option<Expr>,
    },
    /// `block ["name"] … end`: registers `body` under `name` when executed.
    Block {
        /// Block name.
        name: String,
        /// Statements of the block.
        body: Arc<[Stmt]>,
    },
    /// `content ["name"]`: runs whatever block is registered at that moment.
    Content(String),
    /// `if test … [else …] end`.
    If {
        /// Condition, evaluated with the truthiness test.
        test: Expr,
        /// Statements run when the test passes.
        then_branch: Vec<Stmt>,
        /// Statements run otherwise.
        else_branch: Vec<Stmt>,
    },
    /// `for slot in collection … end`.
    For {
        /// Loop variable.
        slot: SlotId,
        /// Collection expression, evaluated once.
        collection: Expr,
        /// Loop body.
        body: Vec<Stmt>,
    },
    /// `switch subject when … [else …] end`.
    Switch {
        /// Value compared against every case.
        subject: Expr,
        /// `when` arms in source order.
        cases: Vec<(Expr, Vec<Stmt>)>,
        /// `else` arm.
        default: Option<Vec<Stmt>>,
    },
    /// Expression evaluated for its side effects.
    Expr(Expr),
}

/// Unary prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `+x`
    Plus,
    /// `-x`
    Neg,
    /// `!x`
    Not,
}

/// Binary operators with eager operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `==` / `===`
    Eq,
    /// `!=` / `!==`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl BinaryOp {
    /// Operator spelling, for runtime error messages.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

/// Short-circuiting operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// `&&`
    And,
    /// `||`
    Or,
    /// `??`
    Coalesce,
}

/// Increment or decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    /// `++`
    Inc,
    /// `--`
    Dec,
}

/// An expression.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A constant.
    Literal(Value),
    /// Read of a variable slot.
    Var(SlotId),
    /// `@name`: member of the current self value.
    SelfMember(String),
    /// `target.name` or `target?.name`.
    Member {
        /// Value whose member is read.
        target: Box<Expr>,
        /// Member name.
        name: String,
        /// `?.`: yields null without evaluating the access when target is null.
        optional: bool,
    },
    /// `callee(args…)`.
    Call {
        /// Value to invoke.
        callee: Box<Expr>,
        /// Arguments in order.
        args: Vec<Expr>,
    },
    /// `[a, b, …]`.
    Array(Vec<Expr>),
    /// `{ key: value, … }`.
    Map(Vec<(String, Expr)>),
    /// Prefix operator.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },
    /// `++x`, `x++`, `--x`, `x--`.
    Update {
        /// Operator.
        op: UpdateOp,
        /// Whether the operator precedes the variable.
        prefix: bool,
        /// Variable updated.
        slot: SlotId,
    },
    /// Binary operator.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// Short-circuit operator.
    Logical {
        /// Operator.
        op: LogicalOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand, evaluated only when needed.
        rhs: Box<Expr>,
    },
    /// `test ? then : otherwise`.
    Conditional {
        /// Condition.
        test: Box<Expr>,
        /// Value when the test passes.
        then: Box<Expr>,
        /// Value otherwise.
        otherwise: Box<Expr>,
    },
    /// `slot = value` and the compound forms; `op` is `None` for plain `=`.
    Assign {
        /// Target variable.
        slot: SlotId,
        /// Arithmetic operator of a compound assignment.
        op: Option<BinaryOp>,
        /// Assigned value.
        value: Box<Expr>,
    },
    /// Parenthesized comma list; yields the last value.
    Sequence(Vec<Expr>),
    /// `(params) -> body end`.
    Lambda(Arc<LambdaDef>),
}

/// Definition of a lambda expression.
#[derive(Debug)]
pub struct LambdaDef {
    /// Parameter slots, bound positionally.
    pub params: Vec<SlotId>,
    /// Statement list of the body.
    pub body: Vec<Stmt>,
}

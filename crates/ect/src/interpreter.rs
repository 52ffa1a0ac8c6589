// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Tree-walking executor for compiled programs.
//!
//! Each execution of a [`Program`] gets a fresh [`Frame`] holding one value
//! per variable slot. Blocks registered during the execution keep the frame
//! alive so a layout can run them after the registering template returned;
//! lambdas only hold it weakly.

use crate::ast::{BinaryOp, Expr, LogicalOp, Program, SlotId, Stmt, UpdateOp};
use crate::context::{Block, Context};
use crate::error::{EctError, Result};
use crate::runtime;
use crate::value::{Closure, Function, Value};
use indexmap::IndexMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Variable storage of one program execution.
pub type Frame = Mutex<Vec<Value>>;

/// Runs `program` against `ctx` with a fresh frame.
pub(crate) fn execute(program: &Program, ctx: &mut Context<'_>) -> Result<()> {
    let frame = Arc::new(Mutex::new(vec![Value::Null; program.slot_count()]));
    Executor { frame }.exec_stmts(ctx, &program.body)?;
    Ok(())
}

/// Runs a registered block.
pub(crate) fn run_block(ctx: &mut Context<'_>, block: &Block) -> Result<()> {
    match block {
        Block::Compiled { body, frame } => {
            let executor = Executor {
                frame: Arc::clone(frame),
            };
            executor.exec_stmts(ctx, body)?;
        }
        Block::Text(text) => ctx.append_text(text),
    }
    Ok(())
}

/// Calls a template lambda.
///
/// Parameters live in the slots of the defining program. Their previous
/// values are restored when the call returns.
pub(crate) fn call_closure(ctx: &mut Context<'_>, closure: &Closure, args: Vec<Value>) -> Result<Value> {
    let frame = closure.frame.upgrade().ok_or_else(|| {
        EctError::InvalidInvocation(
            "lambda called after the template that created it finished rendering".to_string(),
        )
    })?;
    let params = &closure.def.params;
    if args.len() != params.len() {
        return Err(EctError::InvalidInvocation(format!(
            "lambda expects {} argument(s), got {}",
            params.len(),
            args.len()
        )));
    }

    let executor = Executor { frame };
    ctx.enter("lambda")?;
    let saved: Vec<Value> = params
        .iter()
        .zip(args)
        .map(|(slot, arg)| executor.replace(*slot, arg))
        .collect();
    let result = executor.exec_stmts(ctx, &closure.def.body);
    for (slot, value) in params.iter().zip(saved) {
        executor.store(*slot, value);
    }
    ctx.leave();
    result
}

impl Program {
    /// Executes the program with `self_value` as self, appending to the
    /// context's output. The previous self value is restored afterwards.
    pub fn execute(&self, ctx: &mut Context<'_>, self_value: Value) -> Result<()> {
        let saved = ctx.replace_self(self_value);
        let result = ctx.render_program(self);
        ctx.replace_self(saved);
        result
    }
}

struct Executor {
    frame: Arc<Frame>,
}

impl Executor {
    fn load(&self, slot: SlotId) -> Value {
        let vars = self.frame.lock().unwrap_or_else(PoisonError::into_inner);
        vars.get(slot).cloned().unwrap_or_default()
    }

    fn store(&self, slot: SlotId, value: Value) {
        self.replace(slot, value);
    }

    fn replace(&self, slot: SlotId, value: Value) -> Value {
        let mut vars = self.frame.lock().unwrap_or_else(PoisonError::into_inner);
        match vars.get_mut(slot) {
            Some(var) => std::mem::replace(var, value),
            None => Value::Null,
        }
    }

    /// Runs `stmts` in order. Returns the value of the last statement when
    /// it is an expression statement, null otherwise.
    fn exec_stmts(&self, ctx: &mut Context<'_>, stmts: &[Stmt]) -> Result<Value> {
        let mut last = Value::Null;
        for stmt in stmts {
            last = self.exec(ctx, stmt)?;
        }
        Ok(last)
    }

    fn exec(&self, ctx: &mut Context<'_>, stmt: &Stmt) -> Result<Value> {
        match stmt {
            Stmt::Text(text) => ctx.append_text(text),
            Stmt::Output { expr, escape } => {
                let value = self.eval(ctx, expr)?;
                if *escape {
                    ctx.append_escaped(&value);
                } else {
                    ctx.append_raw(&value);
                }
            }
            Stmt::Extend(layout) => ctx.extend(layout)?,
            Stmt::Include { name, argument } => {
                let argument = match argument {
                    Some(expr) => self.eval(ctx, expr)?,
                    None => Value::Null,
                };
                ctx.include(name, argument)?;
            }
            Stmt::Block { name, body } => ctx.define_block(
                name,
                Block::Compiled {
                    body: Arc::clone(body),
                    frame: Arc::clone(&self.frame),
                },
            ),
            Stmt::Content(name) => ctx.call_block(name)?,
            Stmt::If {
                test,
                then_branch,
                else_branch,
            } => {
                let branch = if runtime::test(&self.eval(ctx, test)?) {
                    then_branch
                } else {
                    else_branch
                };
                self.exec_stmts(ctx, branch)?;
            }
            Stmt::For {
                slot,
                collection,
                body,
            } => {
                let collection = self.eval(ctx, collection)?;
                for item in runtime::elements(&collection)? {
                    self.store(*slot, item);
                    self.exec_stmts(ctx, body)?;
                }
            }
            Stmt::Switch {
                subject,
                cases,
                default,
            } => {
                let subject = self.eval(ctx, subject)?;
                let mut matched = None;
                for (value, body) in cases {
                    if self.eval(ctx, value)? == subject {
                        matched = Some(body);
                        break;
                    }
                }
                if let Some(body) = matched.or(default.as_ref()) {
                    self.exec_stmts(ctx, body)?;
                }
            }
            Stmt::Expr(expr) => return self.eval(ctx, expr),
        }
        Ok(Value::Null)
    }

    fn eval(&self, ctx: &mut Context<'_>, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Var(slot) => Ok(self.load(*slot)),
            Expr::SelfMember(name) => runtime::get_member(ctx.self_value(), name),
            Expr::Member {
                target,
                name,
                optional,
            } => {
                let target = self.eval(ctx, target)?;
                if *optional && target.is_null() {
                    return Ok(Value::Null);
                }
                runtime::get_member(&target, name)
            }
            Expr::Call { callee, args } => {
                let callee = self.eval(ctx, callee)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(ctx, arg))
                    .collect::<Result<Vec<_>>>()?;
                runtime::invoke(ctx, &callee, args)
            }
            Expr::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| self.eval(ctx, item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::from(items))
            }
            Expr::Map(entries) => {
                let mut map = IndexMap::new();
                for (key, value) in entries {
                    map.insert(key.clone(), self.eval(ctx, value)?);
                }
                Ok(Value::from(map))
            }
            Expr::Unary { op, operand } => runtime::unary(*op, &self.eval(ctx, operand)?),
            Expr::Update { op, prefix, slot } => {
                let old = self.load(*slot);
                let op = match op {
                    UpdateOp::Inc => BinaryOp::Add,
                    UpdateOp::Dec => BinaryOp::Sub,
                };
                let new = runtime::binary(op, &old, &Value::Int(1))?;
                self.store(*slot, new.clone());
                Ok(if *prefix { new } else { old })
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(ctx, lhs)?;
                let rhs = self.eval(ctx, rhs)?;
                runtime::binary(*op, &lhs, &rhs)
            }
            Expr::Logical { op, lhs, rhs } => {
                let lhs = self.eval(ctx, lhs)?;
                match op {
                    LogicalOp::And if !runtime::test(&lhs) => Ok(Value::Bool(false)),
                    LogicalOp::Or if runtime::test(&lhs) => Ok(Value::Bool(true)),
                    LogicalOp::And | LogicalOp::Or => {
                        Ok(Value::Bool(runtime::test(&self.eval(ctx, rhs)?)))
                    }
                    LogicalOp::Coalesce if !lhs.is_null() => Ok(lhs),
                    LogicalOp::Coalesce => self.eval(ctx, rhs),
                }
            }
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => {
                if runtime::test(&self.eval(ctx, test)?) {
                    self.eval(ctx, then)
                } else {
                    self.eval(ctx, otherwise)
                }
            }
            Expr::Assign { slot, op, value } => {
                let mut value = self.eval(ctx, value)?;
                if let Some(op) = op {
                    value = runtime::binary(*op, &self.load(*slot), &value)?;
                }
                self.store(*slot, value.clone());
                Ok(value)
            }
            Expr::Sequence(items) => {
                let mut last = Value::Null;
                for item in items {
                    last = self.eval(ctx, item)?;
                }
                Ok(last)
            }
            Expr::Lambda(def) => Ok(Value::Function(Function::Lambda(Closure {
                def: Arc::clone(def),
                frame: Arc::downgrade(&self.frame),
            }))),
        }
    }
}

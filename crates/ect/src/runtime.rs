// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Generic value operations used while executing a program.
//!
//! - [`test`]: the truthiness rule used by `if`, `?:`, `!`, `&&` and `||`
//! - [`get_member`]: member lookup on maps, host objects and built-ins
//! - [`invoke`]: calling host functions and template lambdas
//! - arithmetic, comparison and iteration helpers

use crate::ast::{BinaryOp, UnaryOp};
use crate::context::Context;
use crate::error::{EctError, Result};
use crate::interpreter;
use crate::value::{Function, Value};
use std::cmp::Ordering;

/// Truthiness test.
///
/// | value | result |
/// |-------|--------|
/// | null | false |
/// | boolean | itself |
/// | string | **true only when empty** |
/// | array, map | true when non-empty |
/// | number | true when nonzero |
/// | anything else | true |
///
/// Note the string rule: every non-empty string is falsy.
pub fn test(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Map(entries) => !entries.is_empty(),
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Function(_) | Value::Object(_) => true,
    }
}

/// Reads the member `name` of `target`.
///
/// Maps are searched by key, host objects through
/// [`Object::get_member`](crate::Object::get_member); strings and arrays
/// expose `length`.
pub fn get_member(target: &Value, name: &str) -> Result<Value> {
    let found = match target {
        Value::Map(entries) => entries.get(name).cloned(),
        Value::Object(object) => object.get_member(name),
        Value::String(s) if name == "length" => Some(Value::Int(s.chars().count() as i64)),
        Value::Array(items) if name == "length" => Some(Value::Int(items.len() as i64)),
        _ => None,
    };
    found.ok_or_else(|| EctError::MemberNotFound {
        member: name.to_string(),
        target: describe(target),
    })
}

/// Invokes `callee` with `args`.
pub fn invoke(ctx: &mut Context<'_>, callee: &Value, args: Vec<Value>) -> Result<Value> {
    match callee {
        Value::Function(Function::Native { func, .. }) => func(&args),
        Value::Function(Function::Lambda(closure)) => interpreter::call_closure(ctx, closure, args),
        other => Err(EctError::InvalidInvocation(format!(
            "{} is not callable",
            describe(other)
        ))),
    }
}

/// Elements produced by a `for` loop over `collection`.
///
/// Arrays yield their items, maps their keys in insertion order, strings their
/// characters.
pub fn elements(collection: &Value) -> Result<Vec<Value>> {
    match collection {
        Value::Array(items) => Ok(items.as_ref().clone()),
        Value::Map(entries) => Ok(entries.keys().map(|k| Value::String(k.clone())).collect()),
        Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
        other => Err(EctError::InvalidOperation(format!(
            "cannot iterate over {}",
            describe(other)
        ))),
    }
}

/// Applies a prefix operator.
pub fn unary(op: UnaryOp, operand: &Value) -> Result<Value> {
    match (op, operand) {
        (UnaryOp::Not, v) => Ok(Value::Bool(!test(v))),
        (UnaryOp::Plus, Value::Int(_) | Value::Float(_)) => Ok(operand.clone()),
        (UnaryOp::Neg, Value::Int(i)) => i
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| EctError::InvalidOperation(format!("integer overflow in -{}", i))),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (op, v) => Err(EctError::InvalidOperation(format!(
            "unary '{}' is not defined for {}",
            match op {
                UnaryOp::Plus => "+",
                UnaryOp::Neg => "-",
                UnaryOp::Not => "!",
            },
            describe(v)
        ))),
    }
}

/// Applies a binary operator to two evaluated operands.
pub fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(lhs == rhs)),
        BinaryOp::Ne => Ok(Value::Bool(lhs != rhs)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(lhs, rhs).ok_or_else(|| unsupported(op, lhs, rhs))?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::Add if matches!(lhs, Value::String(_)) || matches!(rhs, Value::String(_)) => {
            Ok(Value::String(format!("{}{}", lhs, rhs)))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic(op, lhs, rhs)
        }
    }
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => {
            let (a, b) = (*a, *b);
            if matches!(op, BinaryOp::Div | BinaryOp::Mod) && b == 0 {
                return Err(EctError::InvalidOperation("division by zero".to_string()));
            }
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Div => a.checked_div(b),
                _ => a.checked_rem(b),
            };
            result
                .map(Value::Int)
                .ok_or_else(|| overflow(op.symbol(), lhs, rhs))
        }
        _ => {
            let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) else {
                return Err(unsupported(op, lhs, rhs));
            };
            Ok(Value::Float(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                _ => a % b,
            }))
        }
    }
}

fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => lhs.as_f64()?.partial_cmp(&rhs.as_f64()?),
    }
}

fn unsupported(op: BinaryOp, lhs: &Value, rhs: &Value) -> EctError {
    EctError::InvalidOperation(format!(
        "'{}' is not defined for {} and {}",
        op.symbol(),
        describe(lhs),
        describe(rhs)
    ))
}

fn overflow(symbol: &str, lhs: &Value, rhs: &Value) -> EctError {
    EctError::InvalidOperation(format!(
        "integer overflow in {} {} {}",
        lhs, symbol, rhs
    ))
}

/// Short description of a value for error messages.
pub fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Object(o) => format!("object of type {}", o.type_name()),
        other => format!("{} value", other.type_name()),
    }
}

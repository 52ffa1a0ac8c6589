// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Dynamic values seen by templates.
//!
//! [`Value`] is a closed set of variants. Host types that want to expose
//! members to templates without converting themselves into a map implement
//! the [`Object`] trait and are wrapped with [`Value::object`].
//!
//! Values are cheap to clone: sequences, maps, functions and objects are
//! reference counted.

use crate::ast::LambdaDef;
use crate::error::Result;
use crate::interpreter::Frame;
use indexmap::IndexMap;
use std::fmt;
use std::sync::{Arc, Weak};

/// Capability interface for host values exposed to templates.
///
/// # Examples
///
/// ```rust
/// use ect::{Object, Value};
///
/// #[derive(Debug)]
/// struct User { name: String }
///
/// impl Object for User {
///     fn type_name(&self) -> &str { "User" }
///     fn get_member(&self, name: &str) -> Option<Value> {
///         match name {
///             "name" => Some(Value::from(self.name.as_str())),
///             _ => None,
///         }
///     }
/// }
///
/// let user = Value::object(User { name: "Ada".into() });
/// assert_eq!(user.type_name(), "User");
/// ```
pub trait Object: fmt::Debug + Send + Sync {
    /// Name used in error messages.
    fn type_name(&self) -> &str;

    /// Returns the named member, or `None` when it does not exist.
    fn get_member(&self, name: &str) -> Option<Value>;

    /// Text produced when the object is printed.
    fn display(&self) -> String {
        format!("[object {}]", self.type_name())
    }
}

/// Signature of host functions callable from templates.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// A callable value.
#[derive(Clone)]
pub enum Function {
    /// A function provided by the host.
    Native {
        /// Name shown in error messages.
        name: String,
        /// The implementation.
        func: Arc<NativeFn>,
    },
    /// A lambda created by a template.
    Lambda(Closure),
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Native { name, .. } => write!(f, "Native({})", name),
            Function::Lambda(c) => write!(f, "Lambda({} params)", c.def.params.len()),
        }
    }
}

/// A lambda together with the variable frame of the program that created it.
///
/// The frame is held weakly; a closure that outlives the render it was
/// created in can no longer be called.
#[derive(Clone, Debug)]
pub struct Closure {
    pub(crate) def: Arc<LambdaDef>,
    pub(crate) frame: Weak<Frame>,
}

/// A template value.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Absence of a value.
    #[default]
    Null,
    /// `true` or `false`.
    Bool(bool),
    /// Integer number.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text.
    String(String),
    /// Ordered sequence.
    Array(Arc<Vec<Value>>),
    /// String-keyed mapping, iterated in insertion order.
    Map(Arc<IndexMap<String, Value>>),
    /// Something that can be invoked.
    Function(Function),
    /// Opaque host value.
    Object(Arc<dyn Object>),
}

impl Value {
    /// Builds a sequence.
    pub fn array<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::Array(Arc::new(items.into_iter().collect()))
    }

    /// Builds a mapping.
    pub fn map<K: Into<String>, I: IntoIterator<Item = (K, Value)>>(entries: I) -> Self {
        Value::Map(Arc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Wraps a host function.
    pub fn function<F>(name: &str, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Value::Function(Function::Native {
            name: name.to_string(),
            func: Arc::new(func),
        })
    }

    /// Wraps a host object.
    pub fn object<O: Object + 'static>(object: O) -> Self {
        Value::Object(Arc::new(object))
    }

    /// Converts any serializable value through its JSON representation.
    pub fn from_serialize<T: serde::Serialize>(value: &T) -> Result<Self> {
        Ok(Value::from(serde_json::to_value(value)?))
    }

    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the variant, or the object's type name.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Function(_) => "function",
            Value::Object(o) => o.type_name(),
        }
    }

    /// Numeric value as a float, for numbers only.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Text value, for strings only.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Converts back into JSON. Functions become null and objects their
    /// display text.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null | Value::Function(_) => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Object(o) => Json::String(o.display()),
        }
    }
}

/// Stringification used by output statements: null prints nothing.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Map(_) => f.write_str("[object Map]"),
            Value::Function(_) => f.write_str("[function]"),
            Value::Object(o) => f.write_str(&o.display()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.as_f64() == other.as_f64()
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Function(Function::Native { func: a, .. }), Value::Function(Function::Native { func: b, .. })) => {
                Arc::ptr_eq(a, b)
            }
            (Value::Function(Function::Lambda(a)), Value::Function(Function::Lambda(b))) => {
                Arc::ptr_eq(&a.def, &b.def) && a.frame.ptr_eq(&b.frame)
            }
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::array(items.into_iter().map(Value::from)),
            Json::Object(entries) => Value::map(entries.into_iter().map(|(k, v)| (k, Value::from(v)))),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(items))
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Value::Map(Arc::new(entries))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

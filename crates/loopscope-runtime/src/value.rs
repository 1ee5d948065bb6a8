//! Runtime value representation
//!
//! Values for the instrumented JavaScript subset:
//! - Undefined, Null, Bool, Number: immediate values
//! - Strings: heap-allocated, reference-counted (`Rc<str>`), immutable
//! - Closures: function expression + captured environment
//! - Promises: handles into the instrumented promise machinery
//! - Timer handles: numeric cancellation tokens from `setTimeout`
//! - Capability markers for the restricted namespace (`console`, `Promise`,
//!   `setTimeout`/`clearTimeout`, settlement functions)
//!
//! The whole value graph is single-threaded by design (see the engine's
//! concurrency model), so `Rc`/`RefCell` rather than `Arc`/`Mutex`.

use crate::ast::{FunctionBody, Identifier};
use crate::promise::PromiseHandle;
use crate::span::Span;
use crate::timers::TimerId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// A runtime value
#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    /// User function with captured environment
    Closure(Rc<Closure>),
    /// Instrumented promise
    Promise(PromiseHandle),
    /// Cancellation handle returned by `setTimeout`
    Timer(TimerId),
    /// The `console` namespace object
    Console,
    /// The `Promise` binding (constructible, carries `resolve`/`reject` statics)
    PromiseCtor,
    /// Host scheduling builtins
    Builtin(Builtin),
    /// A resolve/reject capability handed to a promise executor
    Settler(Rc<Settler>),
}

/// Builtin functions exposed in the restricted namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    SetTimeout,
    ClearTimeout,
}

impl Builtin {
    /// Name as written in source
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::SetTimeout => "setTimeout",
            Builtin::ClearTimeout => "clearTimeout",
        }
    }
}

/// A user function value: parameters, body, and the captured environment
pub struct Closure {
    pub params: Vec<Identifier>,
    pub body: FunctionBody,
    pub env: EnvRef,
    /// Span of the function expression (used for frame/task snippets)
    pub span: Span,
    /// Declared name, if any (function declarations)
    pub name: Option<String>,
}

// The environment chain can reach back to this closure, so Debug skips it.
impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.name)
            .field("params", &self.params.len())
            .field("span", &self.span)
            .finish_non_exhaustive()
    }
}

/// A settlement capability bound to one promise: the `resolve` or `reject`
/// argument passed to an executor.
#[derive(Debug)]
pub struct Settler {
    pub promise: PromiseHandle,
    pub reject: bool,
}

impl Value {
    /// Convenience constructor for strings
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    /// JavaScript-style truthiness
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Short type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Closure(_) | Value::Builtin(_) | Value::Settler(_) | Value::PromiseCtor => {
                "function"
            }
            Value::Promise(_) => "promise",
            Value::Timer(_) => "number",
            Value::Console => "object",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Promise(a), Value::Promise(b)) => Rc::ptr_eq(a, b),
            (Value::Timer(a), Value::Timer(b)) => a == b,
            (Value::Console, Value::Console) => true,
            (Value::PromiseCtor, Value::PromiseCtor) => true,
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

/// Format a number the way JavaScript consoles do (no trailing `.0`)
fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        write!(f, "NaN")
    } else if n.is_infinite() {
        write!(f, "{}Infinity", if n < 0.0 { "-" } else { "" })
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => fmt_number(*n, f),
            Value::String(s) => write!(f, "{}", s),
            Value::Closure(c) => match &c.name {
                Some(name) => write!(f, "[Function: {}]", name),
                None => write!(f, "[Function (anonymous)]"),
            },
            Value::Promise(_) => write!(f, "[object Promise]"),
            Value::Timer(id) => write!(f, "{}", id),
            Value::Console => write!(f, "[object console]"),
            Value::PromiseCtor => write!(f, "[Function: Promise]"),
            Value::Builtin(b) => write!(f, "[Function: {}]", b.name()),
            Value::Settler(s) => {
                write!(f, "[Function: {}]", if s.reject { "reject" } else { "resolve" })
            }
        }
    }
}

/// Runtime errors raised during evaluation
///
/// `Thrown` carries a user `throw` (or a rejection reason) as a rendered
/// value; everything else is a host-level type/lookup failure.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error("{name} is not defined")]
    UndefinedVariable { name: String, span: Span },

    #[error("{msg}")]
    TypeError { msg: String, span: Span },

    #[error("{}", fmt_thrown(.value))]
    Thrown { value: Value, span: Span },
}

fn fmt_thrown(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_string(),
        other => other.to_string(),
    }
}

impl RuntimeError {
    /// Span where the error originated
    pub fn span(&self) -> Span {
        match self {
            RuntimeError::UndefinedVariable { span, .. } => *span,
            RuntimeError::TypeError { span, .. } => *span,
            RuntimeError::Thrown { span, .. } => *span,
        }
    }

    /// The thrown value if this is a user throw; otherwise a string
    /// rendering of the host error (what a rejection handler receives).
    pub fn into_value(self) -> Value {
        match self {
            RuntimeError::Thrown { value, .. } => value,
            other => Value::string(other.to_string()),
        }
    }
}

/// Shared reference to an environment
pub type EnvRef = Rc<Environment>;

/// Lexical environment: a scope's bindings plus a parent link
///
/// Closures hold an `EnvRef` to their defining environment, so scopes form
/// a reference-counted chain rather than the usual interpreter scope stack.
#[derive(Debug, Default)]
pub struct Environment {
    vars: RefCell<HashMap<String, Value>>,
    parent: Option<EnvRef>,
}

impl Environment {
    /// Create a root environment
    pub fn root() -> EnvRef {
        Rc::new(Environment {
            vars: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    /// Create a child environment
    pub fn child(parent: EnvRef) -> EnvRef {
        Rc::new(Environment {
            vars: RefCell::new(HashMap::new()),
            parent: Some(parent),
        })
    }

    /// Define a binding in this scope (shadows outer bindings)
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.vars.borrow_mut().insert(name.into(), value);
    }

    /// Look up a binding, walking the parent chain
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.get(name))
    }

    /// Assign to an existing binding, walking the parent chain.
    /// Returns false if the name is not bound anywhere.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        if self.vars.borrow().contains_key(name) {
            self.vars.borrow_mut().insert(name.to_string(), value);
            return true;
        }
        match &self.parent {
            Some(p) => p.assign(name, value),
            None => false,
        }
    }
}

//! Function declarations and call arguments.
//!
//! A [`Function`] is a user-defined function: a name, a [`FormalParameterList`] and a body
//! node.  A call supplies a list of [`Actual`] arguments, each optionally named; the
//! [`binder`](../binder/index.html) pairs them with the formals.
//!
//! A [`NativeFn`] is a builtin implemented in Rust.  It receives its arguments already
//! evaluated.

use crate::reserved;
use crate::runtime::{NodeRef, Runtime};
use crate::types::{ErrorKind, Exception, ReckonHasher, ReckonResult};
use crate::value::Value;
use core::fmt;
use indexmap::IndexMap;

/// One declared parameter.
#[derive(Debug, Clone)]
pub struct FormalParameter {
    name: String,
    default: Option<NodeRef>,
    mutable: bool,
}

impl FormalParameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The default expression, if one was declared.
    pub fn default(&self) -> Option<&NodeRef> {
        self.default.as_ref()
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }
}

/// The trailing parameter that collects any extra actuals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variadic {
    name: Option<String>,
    mutable: bool,
}

impl Variadic {
    /// The name the extras are bound to; an anonymous variadic is reachable only as `_*`.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }
}

/// How many actuals a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Up to this many; missing ones take their defaults.
    Exactly(usize),

    /// This many fixed parameters, and any number beyond.
    AtLeast(usize),
}

/// The ordered, uniquely named parameters of a function.
#[derive(Debug, Clone, Default)]
pub struct FormalParameterList {
    params: IndexMap<String, FormalParameter, ReckonHasher>,
    variadic: Option<Variadic>,
}

impl FormalParameterList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a fixed parameter.
    pub fn add(&mut self, name: &str, default: Option<NodeRef>, mutable: bool) -> Result<(), Exception> {
        if self.variadic.is_some() {
            return Err(ErrorKind::VariadicNotLast.into());
        }
        if reserved::is_reserved(name) {
            return Err(ErrorKind::ReservedName(name.into()).into());
        }
        if self.params.contains_key(name) {
            return Err(ErrorKind::DuplicateParameter(name.into()).into());
        }

        self.params.insert(
            name.into(),
            FormalParameter {
                name: name.into(),
                default,
                mutable,
            },
        );
        Ok(())
    }

    /// Declares the variadic parameter, which must come last.
    pub fn add_variadic(&mut self, name: Option<&str>, mutable: bool) -> Result<(), Exception> {
        if self.variadic.is_some() {
            return Err(ErrorKind::VariadicNotLast.into());
        }
        if let Some(name) = name {
            if reserved::is_reserved(name) {
                return Err(ErrorKind::ReservedName(name.into()).into());
            }
            if self.params.contains_key(name) {
                return Err(ErrorKind::DuplicateParameter(name.into()).into());
            }
        }

        self.variadic = Some(Variadic {
            name: name.map(String::from),
            mutable,
        });
        Ok(())
    }

    /// The fixed parameters, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &FormalParameter> {
        self.params.values()
    }

    pub fn get(&self, name: &str) -> Option<&FormalParameter> {
        self.params.get(name)
    }

    /// The number of fixed parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.variadic.is_none()
    }

    pub fn variadic(&self) -> Option<&Variadic> {
        self.variadic.as_ref()
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic.is_some()
    }

    pub fn arity(&self) -> Arity {
        if self.is_variadic() {
            Arity::AtLeast(self.params.len())
        } else {
            Arity::Exactly(self.params.len())
        }
    }
}

impl fmt::Display for FormalParameterList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut parts: Vec<String> = self
            .params
            .values()
            .map(|p| {
                let var = if p.mutable { "var " } else { "" };
                match &p.default {
                    Some(node) => format!("{}{} = {}", var, p.name, node.text()),
                    None => format!("{}{}", var, p.name),
                }
            })
            .collect();

        if let Some(v) = &self.variadic {
            parts.push(format!("{}...", v.name.as_deref().unwrap_or("")));
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// One actual argument at a call site: optionally named, possibly empty (`f(1, , 3)`).
#[derive(Debug, Clone, Default)]
pub struct Actual {
    name: Option<String>,
    expr: Option<NodeRef>,
}

impl Actual {
    pub fn positional(expr: NodeRef) -> Self {
        Self {
            name: None,
            expr: Some(expr),
        }
    }

    pub fn named(name: &str, expr: NodeRef) -> Self {
        Self {
            name: Some(name.into()),
            expr: Some(expr),
        }
    }

    /// An omitted argument.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn expr(&self) -> Option<&NodeRef> {
        self.expr.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.expr.is_none()
    }
}

/// A user-defined function.
#[derive(Debug)]
pub struct Function {
    name: String,
    params: FormalParameterList,
    body: NodeRef,
}

impl Function {
    pub fn new(name: &str, params: FormalParameterList, body: NodeRef) -> Self {
        Self {
            name: name.into(),
            params,
            body,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &FormalParameterList {
        &self.params
    }

    pub fn body(&self) -> &NodeRef {
        &self.body
    }

    /// The function as it was declared, e.g., `f(a, b = 10, rest...)`.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.params)
    }
}

/// The signature of a builtin: the runtime and the evaluated arguments.
pub type NativeFunc = fn(&mut Runtime, &[Value]) -> ReckonResult;

/// A builtin function.
pub struct NativeFn {
    name: String,
    func: NativeFunc,
}

impl NativeFn {
    pub fn new(name: &str, func: NativeFunc) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, rt: &mut Runtime, args: &[Value]) -> ReckonResult {
        (self.func)(rt, args)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NativeFn").field("name", &self.name).finish()
    }
}

//! A toy front end for the integration tests: a tiny expression tree and its evaluator.

#![allow(dead_code)]

use reckon::*;
use std::any::Any;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

/// Installs a log subscriber once per test binary; `RUST_LOG=reckon=trace` shows the runtime's
/// tracing output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug)]
pub enum Expr {
    Lit(Value),
    Ref(VarRef),
    Assign(VarRef, NodeRef),
    Add(NodeRef, NodeRef),
    Block(Vec<NodeRef>),
    Leave(Option<NodeRef>, Option<String>),
    Next,
}

impl Node for Expr {
    fn text(&self) -> String {
        match self {
            Expr::Lit(value) => value.to_string(),
            Expr::Ref(var) => var.to_string(),
            Expr::Assign(var, expr) => format!("{} = {}", var, expr.text()),
            Expr::Add(a, b) => format!("{} + {}", a.text(), b.text()),
            Expr::Block(items) => {
                let items: Vec<String> = items.iter().map(|i| i.text()).collect();
                format!("{{ {} }}", items.join("; "))
            }
            Expr::Leave(_, Some(label)) => format!("leave {}", label),
            Expr::Leave(..) => "leave".into(),
            Expr::Next => "next".into(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Evaluates `Expr` trees, counting the nodes it evaluates.
#[derive(Debug, Default)]
pub struct Toy {
    pub evaluations: usize,
}

impl Evaluator for Toy {
    fn evaluate(&mut self, rt: &mut Runtime, node: &dyn Node, mode: Mode) -> ReckonResult {
        self.evaluations += 1;
        let Some(expr) = node.as_any().downcast_ref::<Expr>() else {
            return reckon_err!("not a toy expression: {}", node.text());
        };

        match expr {
            Expr::Lit(value) => Ok(value.clone()),
            Expr::Ref(var) => rt.resolve(self, var, mode),
            Expr::Assign(var, expr) => {
                let value = self.evaluate(rt, expr.as_ref(), mode)?;
                rt.assign(self, var, value)
            }
            Expr::Add(a, b) => {
                let a = self.evaluate(rt, a.as_ref(), mode)?;
                let b = self.evaluate(rt, b.as_ref(), mode)?;
                match (a.as_index(), b.as_index()) {
                    (Some(x), Some(y)) => reckon_ok!(x + y),
                    _ => reckon_err!("cannot add {} and {}", a, b),
                }
            }
            Expr::Block(items) => {
                let mut last = Value::Null;
                for item in items {
                    last = self.evaluate(rt, item.as_ref(), mode)?;
                }
                Ok(last)
            }
            Expr::Leave(value, label) => {
                let value = match value {
                    Some(expr) => Some(self.evaluate(rt, expr.as_ref(), mode)?),
                    None => None,
                };
                Err(Exception::Leave {
                    value,
                    label: label.clone(),
                })
            }
            Expr::Next => Err(Exception::Next { label: None }),
        }
    }
}

//------------------------------------------------------------------------------------------------
// Builders

pub fn lit<V: Into<Value>>(value: V) -> NodeRef {
    Rc::new(Expr::Lit(value.into()))
}

pub fn var(var: VarRef) -> NodeRef {
    Rc::new(Expr::Ref(var))
}

pub fn id(name: &str) -> NodeRef {
    var(VarRef::id(name))
}

pub fn assign(var: VarRef, expr: NodeRef) -> NodeRef {
    Rc::new(Expr::Assign(var, expr))
}

pub fn add(a: NodeRef, b: NodeRef) -> NodeRef {
    Rc::new(Expr::Add(a, b))
}

pub fn block(items: Vec<NodeRef>) -> NodeRef {
    Rc::new(Expr::Block(items))
}

pub fn leave(value: Option<NodeRef>, label: Option<&str>) -> NodeRef {
    Rc::new(Expr::Leave(value, label.map(String::from)))
}

pub fn next() -> NodeRef {
    Rc::new(Expr::Next)
}

/// Calls a function by name.
pub fn call(name: &str, actuals: Vec<Actual>) -> NodeRef {
    var(VarRef::id(name).call(actuals))
}

/// Shows that the result is an error of the given kind.  Ignores the error's position.
pub fn ex_match(r: &ReckonResult, expected: ErrorKind) -> bool {
    match r {
        Err(e) => e.kind() == Some(&expected),
        Ok(_) => false,
    }
}

/// The elements of an array value.
pub fn elements(value: &Value) -> Vec<Value> {
    match value {
        Value::Seq(seq) => seq.borrow().values().to_vec(),
        other => panic!("not an array: {}", other),
    }
}

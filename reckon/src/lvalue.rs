//! Variable references and the lvalue chain.
//!
//! A [`VarRef`] is the parsed form of a reference: a name, followed by any number of member
//! selections (`.name`), index operations (`[expr]`) and calls (`(args)`).  Resolving one walks
//! it left to right and records each step as a node of an [`LValueChain`].  Every node pairs a
//! *context*, the scope or container the step addresses, with a *key*, the name, index or call
//! result within that context, and links back to the node for the step before it.
//!
//! The same chain serves reads and writes:
//!
//! * A read fetches the final node's value.  Nothing is created along the way; a member or
//!   element of an unset value reads as `Null`, or is an error in strict mode.
//! * A write stores into the final node's context.  Unset values along the way are promoted to
//!   containers first, an object for a member or string index and an array for a numeric
//!   index, and the new container is stored back through the node before it.  Writing a
//!   character of a string rebuilds the string and stores it back through the parent, since
//!   strings are immutable values.
//!
//! Immutability is checked before anything is changed, so a failed write leaves every
//! container along the path as it was.

use crate::container::sequence::MAX_LENGTH;
use crate::container::{Mapping, Sequence};
use crate::params::Actual;
use crate::reserved;
use crate::runtime::{Evaluator, NodeRef, Runtime};
use crate::scope::ScopeId;
use crate::types::{ErrorKind, Exception, Mode, Position, ReckonInt, ReckonResult};
use crate::value::Value;
use core::fmt;
use tracing::trace;

/// A reference to a variable, member, element, or call result.
#[derive(Debug, Clone)]
pub enum VarRef {
    Id {
        name: String,
        position: Position,
    },
    Member {
        base: Box<VarRef>,
        name: String,
        position: Position,
    },
    Index {
        base: Box<VarRef>,
        index: NodeRef,
        position: Position,
    },
    Call {
        base: Box<VarRef>,
        actuals: Vec<Actual>,
        position: Position,
    },
}

impl VarRef {
    /// A reference to a variable.
    pub fn id(name: &str) -> Self {
        VarRef::Id {
            name: name.into(),
            position: Position::default(),
        }
    }

    /// Selects a member of this reference.
    pub fn member(self, name: &str) -> Self {
        VarRef::Member {
            base: Box::new(self),
            name: name.into(),
            position: Position::default(),
        }
    }

    /// Indexes this reference.
    pub fn index(self, index: NodeRef) -> Self {
        VarRef::Index {
            base: Box::new(self),
            index,
            position: Position::default(),
        }
    }

    /// Calls this reference.
    pub fn call(self, actuals: Vec<Actual>) -> Self {
        VarRef::Call {
            base: Box::new(self),
            actuals,
            position: Position::default(),
        }
    }

    /// Sets the source position of the outermost step.
    pub fn at(mut self, pos: Position) -> Self {
        match &mut self {
            VarRef::Id { position, .. }
            | VarRef::Member { position, .. }
            | VarRef::Index { position, .. }
            | VarRef::Call { position, .. } => *position = pos,
        }
        self
    }

    pub fn position(&self) -> Position {
        match self {
            VarRef::Id { position, .. }
            | VarRef::Member { position, .. }
            | VarRef::Index { position, .. }
            | VarRef::Call { position, .. } => *position,
        }
    }
}

impl fmt::Display for VarRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VarRef::Id { name, .. } => write!(f, "{}", name),
            VarRef::Member { base, name, .. } => write!(f, "{}.{}", base, name),
            VarRef::Index { base, index, .. } => write!(f, "{}[{}]", base, index.text()),
            VarRef::Call { base, .. } => write!(f, "{}(...)", base),
        }
    }
}

/// What a node addresses.
#[derive(Debug, Clone)]
enum Context {
    Scope(ScopeId),
    Value(Value),
}

/// Where in its context a node points.
#[derive(Debug, Clone, PartialEq)]
enum Key {
    Name(String),
    Index(ReckonInt),
    Result,
}

#[derive(Debug, Clone)]
struct LValueNode {
    parent: Option<usize>,
    context: Context,
    key: Key,
    position: Position,
}

/// Whether a chain is being built to read or to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Read(Mode),
    Write,
}

/// The resolved steps of a reference, in order.
#[derive(Debug, Default)]
pub struct LValueChain {
    nodes: Vec<LValueNode>,
}

impl LValueChain {
    fn push(&mut self, parent: Option<usize>, context: Context, key: Key, position: Position) -> usize {
        self.nodes.push(LValueNode {
            parent,
            context,
            key,
            position,
        });
        self.nodes.len() - 1
    }

    /// The reference text up to and including a node, for messages.
    fn path(&self, n: usize) -> String {
        let node = &self.nodes[n];
        let prefix = node.parent.map(|p| self.path(p)).unwrap_or_default();
        match &node.key {
            Key::Name(name) if node.parent.is_none() => name.clone(),
            Key::Name(name) => format!("{}.{}", prefix, name),
            Key::Index(i) => format!("{}[{}]", prefix, i),
            Key::Result => format!("{}()", prefix),
        }
    }

    /// The reference text of a node's own step, e.g., `.b` or `[2]`.
    fn step(&self, n: usize) -> String {
        match &self.nodes[n].key {
            Key::Name(name) if self.nodes[n].parent.is_none() => name.clone(),
            Key::Name(name) => format!(".{}", name),
            Key::Index(i) => format!("[{}]", i),
            Key::Result => "()".into(),
        }
    }

    /// The number of steps.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

//------------------------------------------------------------------------------------------------
// Public entry points

/// Reads the value a reference denotes.
pub fn resolve(rt: &mut Runtime, eval: &mut dyn Evaluator, var: &VarRef, mode: Mode) -> ReckonResult {
    let mut chain = LValueChain::default();
    let n = build(rt, eval, &mut chain, var, Intent::Read(mode))?;
    get(rt, &chain, n, mode)
}

/// Assigns a value to the place a reference denotes, creating intermediate containers as
/// needed.  Returns the value.
pub fn assign(rt: &mut Runtime, eval: &mut dyn Evaluator, var: &VarRef, value: Value) -> ReckonResult {
    let mut chain = LValueChain::default();
    let n = build(rt, eval, &mut chain, var, Intent::Write)?;
    put(rt, &mut chain, n, value.clone())?;
    Ok(value)
}

//------------------------------------------------------------------------------------------------
// Building the chain

fn build(
    rt: &mut Runtime,
    eval: &mut dyn Evaluator,
    chain: &mut LValueChain,
    var: &VarRef,
    intent: Intent,
) -> Result<usize, Exception> {
    match var {
        VarRef::Id { name, position } => {
            let scope = rt.scopes().current();
            Ok(chain.push(None, Context::Scope(scope), Key::Name(name.clone()), *position))
        }
        VarRef::Member {
            base,
            name,
            position,
        } => {
            let b = build(rt, eval, chain, base, intent)?;
            let context = member_context(rt, chain, b, intent).map_err(|e| e.at(*position))?;
            Ok(chain.push(Some(b), context, Key::Name(name.clone()), *position))
        }
        VarRef::Index {
            base,
            index,
            position,
        } => {
            let b = build(rt, eval, chain, base, intent)?;
            let discriminant = eval.evaluate(rt, index.as_ref(), Mode::Lenient)?;
            let (context, key) = index_context(rt, chain, b, discriminant, intent)
                .map_err(|e| e.at(*position))?;
            Ok(chain.push(Some(b), context, key, *position))
        }
        VarRef::Call {
            base,
            actuals,
            position,
        } => {
            let b = build(rt, eval, chain, base, intent)?;
            let callee = get(rt, chain, b, Mode::Lenient)?;
            let result = match callee {
                Value::Function(func) => rt.call_function(eval, &func, actuals),
                Value::Native(func) => rt.call_native(eval, &func, actuals),
                _ => Err(ErrorKind::NotCallable(chain.path(b)).into()),
            }
            .map_err(|e| e.at(*position))?;
            Ok(chain.push(Some(b), Context::Value(result), Key::Result, *position))
        }
    }
}

/// Reads a node's value on the way to a deeper step, calling through a builtin-function
/// reference with no arguments.
fn get_evaluated(rt: &mut Runtime, chain: &LValueChain, n: usize, intent: Intent) -> ReckonResult {
    let mode = match intent {
        Intent::Read(mode) => mode,
        Intent::Write => Mode::Lenient,
    };

    match get(rt, chain, n, mode)? {
        Value::Native(func) => {
            trace!(function = func.name(), "implicit builtin call");
            func.call(rt, &[])
        }
        value => Ok(value),
    }
}

/// The context for selecting a member of node `b`.
fn member_context(
    rt: &mut Runtime,
    chain: &mut LValueChain,
    b: usize,
    intent: Intent,
) -> Result<Context, Exception> {
    match get_evaluated(rt, chain, b, intent)? {
        value @ Value::Map(_) => Ok(Context::Value(value)),
        value if value.is_unset() => match intent {
            Intent::Read(_) => Ok(Context::Value(value)),
            Intent::Write => {
                let object = rt.new_object(Mapping::new());
                trace!(path = %chain.path(b), "promoted to object");
                put(rt, chain, b, object.clone())?;
                Ok(Context::Value(object))
            }
        },
        _ => Err(ErrorKind::NotAnObject(chain.path(b)).into()),
    }
}

/// The context and key for indexing node `b` with the given discriminant.
fn index_context(
    rt: &mut Runtime,
    chain: &mut LValueChain,
    b: usize,
    discriminant: Value,
    intent: Intent,
) -> Result<(Context, Key), Exception> {
    let invalid = |chain: &LValueChain| -> Exception {
        ErrorKind::InvalidIndex {
            index: discriminant.to_string(),
            path: chain.path(b),
        }
        .into()
    };

    let value = get_evaluated(rt, chain, b, intent)?;
    match value {
        Value::Map(_) => {
            let key = match (&discriminant, discriminant.as_index()) {
                (Value::Str(s), _) => Key::Name(s.to_string()),
                (_, Some(i)) => Key::Index(i),
                _ => return Err(invalid(chain)),
            };
            Ok((Context::Value(value), key))
        }
        Value::Seq(_) | Value::Set(_) | Value::Str(_) => match discriminant.as_index() {
            Some(i) => Ok((Context::Value(value), Key::Index(i))),
            None => Err(invalid(chain)),
        },
        value if value.is_unset() => {
            let key = match (&discriminant, discriminant.as_index()) {
                (Value::Str(s), _) => Key::Name(s.to_string()),
                (_, Some(i)) => Key::Index(i),
                _ => return Err(invalid(chain)),
            };

            match intent {
                Intent::Read(_) => Ok((Context::Value(value), key)),
                Intent::Write => {
                    let container = match key {
                        Key::Name(_) => rt.new_object(Mapping::new()),
                        _ => Value::seq(Sequence::new()),
                    };
                    trace!(path = %chain.path(b), kind = container.kind_name(), "promoted");
                    put(rt, chain, b, container.clone())?;
                    Ok((Context::Value(container), key))
                }
            }
        }
        _ => Err(ErrorKind::NotAnArray(chain.path(b)).into()),
    }
}

//------------------------------------------------------------------------------------------------
// Reading and writing nodes

/// Converts an index into a character position of a string of `len` characters.
fn char_position(index: ReckonInt, len: usize) -> Result<usize, Exception> {
    let pos = if index < 0 { index + len as ReckonInt } else { index };
    if pos < 0 {
        return Err(ErrorKind::NegativeIndex(index).into());
    }
    Ok(pos as usize)
}

/// Reads a node's value.
fn get(rt: &Runtime, chain: &LValueChain, n: usize, mode: Mode) -> ReckonResult {
    let node = &chain.nodes[n];
    let ignore_case = rt.settings().ignore_case;

    let undefined = || -> ReckonResult {
        match mode {
            Mode::Lenient => Ok(Value::Null),
            Mode::Strict => Err(ErrorKind::Undefined(chain.path(n)).into()),
        }
    };

    let result = match (&node.context, &node.key) {
        (Context::Scope(id), Key::Name(name)) => {
            if reserved::is_reserved(name) {
                rt.scopes().positional(*id, name)
            } else {
                match rt.scopes().lookup(*id, name, ignore_case) {
                    Some(value) => Ok(value),
                    None => undefined(),
                }
            }
        }
        (Context::Value(Value::Map(map)), Key::Name(name)) => {
            let found = map.borrow().get(name, ignore_case);
            match found {
                Some(value) => Ok(value),
                None => undefined(),
            }
        }
        (Context::Value(Value::Map(map)), Key::Index(i)) => map.borrow().get_index(*i),
        (Context::Value(Value::Seq(seq)), Key::Index(i)) => seq.borrow().get(*i),
        (Context::Value(Value::Set(set)), Key::Index(i)) => set.borrow().get(*i),
        (Context::Value(Value::Str(s)), Key::Index(i)) => {
            let len = s.chars().count();
            let pos = char_position(*i, len)?;
            Ok(s.chars()
                .nth(pos)
                .map(|c| Value::from(c.to_string()))
                .unwrap_or_default())
        }
        (Context::Value(value), Key::Result) => Ok(value.clone()),
        (Context::Value(value), _) if value.is_unset() => undefined(),
        _ => Err(ErrorKind::NotAnObject(chain.path(n)).into()),
    };

    result.map_err(|e| e.at(node.position))
}

/// Writes a value to a node.
fn put(rt: &mut Runtime, chain: &mut LValueChain, n: usize, value: Value) -> Result<(), Exception> {
    let position = chain.nodes[n].position;
    put_node(rt, chain, n, value).map_err(|e| e.at(position))
}

fn put_node(rt: &mut Runtime, chain: &mut LValueChain, n: usize, value: Value) -> Result<(), Exception> {
    let ignore_case = rt.settings().ignore_case;
    let node = chain.nodes[n].clone();

    match (&node.context, &node.key) {
        (Context::Scope(id), Key::Name(name)) => {
            if reserved::is_reserved(name) {
                return Err(ErrorKind::ReservedName(name.clone()).into());
            }
            rt.scopes_mut().assign(*id, name, ignore_case, value)?;
            Ok(())
        }
        (Context::Value(container @ Value::Map(map)), Key::Name(name)) => {
            check_mutable(chain, n, container)?;
            map.borrow_mut().set(name, ignore_case, value)
        }
        (Context::Value(container @ Value::Map(map)), Key::Index(i)) => {
            check_mutable(chain, n, container)?;
            map.borrow_mut().set_index(*i, value)
        }
        (Context::Value(container @ Value::Seq(seq)), Key::Index(i)) => {
            check_mutable(chain, n, container)?;
            seq.borrow_mut().set(*i, value)
        }
        (Context::Value(Value::Set(_)), Key::Index(_)) => {
            Err(ErrorKind::SetElementAssign(chain.path(n)).into())
        }
        (Context::Value(Value::Str(s)), Key::Index(i)) => {
            let Some(parent) = node.parent else {
                return Err(ErrorKind::NotAnArray(chain.path(n)).into());
            };

            let spliced = splice(s, *i, &value.as_text())?;
            let spliced = Value::from(spliced);
            put(rt, chain, parent, spliced.clone())?;
            chain.nodes[n].context = Context::Value(spliced);
            Ok(())
        }
        (Context::Value(_), Key::Result) => Err(ErrorKind::ResultAssign(chain.path(n)).into()),
        _ => Err(ErrorKind::NotAnObject(chain.path(n)).into()),
    }
}

/// Fails, naming the container and the attempted step, if a node's container is frozen.
fn check_mutable(chain: &LValueChain, n: usize, container: &Value) -> Result<(), Exception> {
    if !container.is_immutable() {
        return Ok(());
    }

    let name = match chain.nodes[n].parent {
        Some(p) => chain.path(p),
        None => String::new(),
    };
    Err(ErrorKind::Immutable {
        value: container.to_string(),
        name,
        path: chain.step(n),
    }
    .into())
}

/// Replaces the characters of `text` starting at `index` with `insert`, padding with spaces if
/// the start lies past the end.  The result may not grow past [`MAX_LENGTH`] characters.
fn splice(text: &str, index: ReckonInt, insert: &str) -> Result<String, Exception> {
    let mut chars: Vec<char> = text.chars().collect();
    let pos = char_position(index, chars.len())?;
    let new: Vec<char> = insert.chars().collect();

    if pos.saturating_add(new.len()) > MAX_LENGTH.max(chars.len()) {
        return Err(ErrorKind::IndexOutOfRange {
            index,
            size: chars.len(),
        }
        .into());
    }
    if chars.len() < pos {
        chars.resize(pos, ' ');
    }
    let end = (pos + new.len()).min(chars.len());
    chars.splice(pos..end, new);
    Ok(chars.into_iter().collect())
}

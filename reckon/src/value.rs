//! The Value Type
//!
//! Every datum manipulated by the runtime is a [`Value`]: the scalars (booleans, integers,
//! floats, arbitrary-precision decimals and fractions, strings), the three containers, and
//! callable values.
//!
//! # Sharing
//!
//! Containers have reference semantics.  A `Value::Seq`, `Value::Set` or `Value::Map` holds an
//! `Rc<RefCell<...>>`, so cloning the value shares the container: a nested container is
//! reachable both from its parent and from any variable that was assigned it, and a mutation
//! through either path is visible through both.  Scalars are immutable and cloned freely.
//!
//! # Null and Empty
//!
//! `Value::Null` is "no value"; `Value::Empty` is the shared empty-collection placeholder that
//! an evaluator produces for a `{ }` literal before anything decides whether it is a set or an
//! object.  Both are promoted in place to a concrete container the first time a member or
//! element is assigned through them.
//!
//! # Equality
//!
//! Values compare by content, so they can be set members and map keys: containers compare
//! their elements, floats compare by value with all NaNs equal, and functions compare by
//! identity.

use crate::container::{Container, Mapping, Sequence, UniqueSet};
use crate::number::{Decimal, Fraction};
use crate::params::{Function, NativeFn};
use crate::types::{ReckonFloat, ReckonHasher, ReckonInt};
use core::cell::RefCell;
use core::fmt;
use core::hash::{BuildHasher, Hash, Hasher};
use std::rc::Rc;

/// A shared, mutable sequence.
pub type SeqRef = Rc<RefCell<Sequence>>;

/// A shared, mutable set.
pub type SetRef = Rc<RefCell<UniqueSet>>;

/// A shared, mutable object.
pub type MapRef = Rc<RefCell<Mapping>>;

/// A Reckon value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Empty,
    Bool(bool),
    Int(ReckonInt),
    Float(ReckonFloat),
    Decimal(Rc<Decimal>),
    Fraction(Rc<Fraction>),
    Str(Rc<str>),
    Seq(SeqRef),
    Set(SetRef),
    Map(MapRef),
    Function(Rc<Function>),
    Native(Rc<NativeFn>),
}

impl Value {
    /// Wraps a sequence as a shared value.
    pub fn seq(seq: Sequence) -> Value {
        Value::Seq(Rc::new(RefCell::new(seq)))
    }

    /// Wraps a set as a shared value.
    pub fn set(set: UniqueSet) -> Value {
        Value::Set(Rc::new(RefCell::new(set)))
    }

    /// Wraps an object as a shared value.
    pub fn map(map: Mapping) -> Value {
        Value::Map(Rc::new(RefCell::new(map)))
    }

    /// True for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for values that are promoted to a container when written through: `Null` and
    /// `Empty`.
    pub fn is_unset(&self) -> bool {
        matches!(self, Value::Null | Value::Empty)
    }

    /// True for callable values.
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Native(_))
    }

    /// The value as an index, if it is integral.
    pub fn as_index(&self) -> Option<ReckonInt> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as ReckonInt),
            _ => None,
        }
    }

    /// The value as a string slice, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The text a string splice inserts: a string's content, or any other value's display form.
    pub fn as_text(&self) -> String {
        match self {
            Value::Str(s) => s.to_string(),
            other => other.to_string(),
        }
    }

    /// The name of the value's kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Empty => "empty",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Fraction(_) => "fraction",
            Value::Str(_) => "string",
            Value::Seq(_) => "array",
            Value::Set(_) => "set",
            Value::Map(_) => "object",
            Value::Function(_) => "function",
            Value::Native(_) => "builtin function",
        }
    }

    /// Whether the value is a frozen container.  Scalars report false.
    pub fn is_immutable(&self) -> bool {
        match self {
            Value::Seq(s) => s.borrow().is_immutable(),
            Value::Set(s) => s.borrow().is_immutable(),
            Value::Map(m) => m.borrow().is_immutable(),
            _ => false,
        }
    }
}

//------------------------------------------------------------------------------------------------
// Conversions

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Bool(flag)
    }
}

impl From<ReckonInt> for Value {
    fn from(int: ReckonInt) -> Self {
        Value::Int(int)
    }
}

impl From<i32> for Value {
    fn from(int: i32) -> Self {
        Value::Int(int as ReckonInt)
    }
}

impl From<usize> for Value {
    fn from(int: usize) -> Self {
        Value::Int(int as ReckonInt)
    }
}

impl From<ReckonFloat> for Value {
    fn from(flt: ReckonFloat) -> Self {
        Value::Float(flt)
    }
}

impl From<Decimal> for Value {
    fn from(dec: Decimal) -> Self {
        Value::Decimal(Rc::new(dec))
    }
}

impl From<Fraction> for Value {
    fn from(frac: Fraction) -> Self {
        Value::Fraction(Rc::new(frac))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(list: Vec<Value>) -> Self {
        Value::seq(Sequence::from_values(list))
    }
}

impl From<Sequence> for Value {
    fn from(seq: Sequence) -> Self {
        Value::seq(seq)
    }
}

impl From<UniqueSet> for Value {
    fn from(set: UniqueSet) -> Self {
        Value::set(set)
    }
}

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Value::map(map)
    }
}

impl From<Function> for Value {
    fn from(func: Function) -> Self {
        Value::Function(Rc::new(func))
    }
}

//------------------------------------------------------------------------------------------------
// Equality and hashing
//
// A container can hold itself, directly or through other containers, so every traversal here
// keeps track of the containers it is inside of.

/// The address of a container's shared cell; `None` for scalars.
fn address(value: &Value) -> Option<*const ()> {
    match value {
        Value::Seq(s) => Some(Rc::as_ptr(s) as *const ()),
        Value::Set(s) => Some(Rc::as_ptr(s) as *const ()),
        Value::Map(m) => Some(Rc::as_ptr(m) as *const ()),
        _ => None,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        equal(self, other, &mut Vec::new())
    }
}

impl Eq for Value {}

/// Compares two values.  A pair of containers met again while it is already being compared
/// further up counts as equal.
fn equal(a: &Value, b: &Value, pairs: &mut Vec<(*const (), *const ())>) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Empty, Value::Empty) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
        (Value::Decimal(a), Value::Decimal(b)) => a == b,
        (Value::Fraction(a), Value::Fraction(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
        (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
        (Value::Seq(_), Value::Seq(_))
        | (Value::Set(_), Value::Set(_))
        | (Value::Map(_), Value::Map(_)) => {
            let (Some(x), Some(y)) = (address(a), address(b)) else {
                return false;
            };
            if x == y || pairs.contains(&(x, y)) {
                return true;
            }

            pairs.push((x, y));
            let same = equal_containers(a, b, pairs);
            pairs.pop();
            same
        }
        _ => false,
    }
}

fn equal_containers(a: &Value, b: &Value, pairs: &mut Vec<(*const (), *const ())>) -> bool {
    match (a, b) {
        (Value::Seq(x), Value::Seq(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x
                    .values()
                    .iter()
                    .zip(y.values())
                    .all(|(a, b)| equal(a, b, pairs))
        }
        (Value::Set(x), Value::Set(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x
                    .iter()
                    .all(|item| y.iter().any(|other| equal(item, other, pairs)))
        }
        (Value::Map(x), Value::Map(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x.entries().all(|(key, value)| match y.get(key, false) {
                    Some(theirs) => equal(&value, &theirs, pairs),
                    None => false,
                })
        }
        _ => false,
    }
}

/// Hashes a single value on its own, for the order-independent container hashes.
pub(crate) fn hash_one<T: Hash>(item: &T) -> u64 {
    ReckonHasher::default().hash_one(item)
}

impl Hash for Value {
    /// Containers hash their size and their elements, but a nested container contributes only
    /// its kind and size.  Equal values still hash alike, and hashing never recurses.
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Seq(s) => {
                let seq = s.borrow();
                hash_shallow(self, state);
                for item in seq.values() {
                    hash_shallow(item, state);
                }
            }
            Value::Set(s) => {
                let set = s.borrow();
                hash_shallow(self, state);
                let sum = set
                    .iter()
                    .fold(0u64, |acc, item| acc.wrapping_add(hash_one(&Shallow(item))));
                sum.hash(state);
            }
            Value::Map(m) => {
                let map = m.borrow();
                hash_shallow(self, state);
                let sum = map.entries().fold(0u64, |acc, (key, value)| {
                    acc.wrapping_add(hash_one(&(key, Shallow(&value))))
                });
                sum.hash(state);
            }
            scalar => hash_shallow(scalar, state),
        }
    }
}

/// A value hashed without looking inside containers.
struct Shallow<'a>(&'a Value);

impl Hash for Shallow<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_shallow(self.0, state);
    }
}

fn hash_shallow<H: Hasher>(value: &Value, state: &mut H) {
    core::mem::discriminant(value).hash(state);
    match value {
        Value::Null | Value::Empty => {}
        Value::Bool(b) => b.hash(state),
        Value::Int(i) => i.hash(state),
        Value::Float(f) => {
            // Equal floats must hash alike: fold -0.0 into 0.0 and every NaN into one.
            let bits = if f.is_nan() {
                f64::NAN.to_bits()
            } else if *f == 0.0 {
                0.0f64.to_bits()
            } else {
                f.to_bits()
            };
            bits.hash(state);
        }
        Value::Decimal(d) => d.hash(state),
        Value::Fraction(f) => f.hash(state),
        Value::Str(s) => s.hash(state),
        Value::Seq(s) => s.borrow().len().hash(state),
        Value::Set(s) => s.borrow().len().hash(state),
        Value::Map(m) => m.borrow().len().hash(state),
        Value::Function(f) => core::ptr::hash(Rc::as_ptr(f), state),
        Value::Native(f) => core::ptr::hash(Rc::as_ptr(f), state),
    }
}

//------------------------------------------------------------------------------------------------
// Display

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write_value(self, f, &mut Vec::new())
    }
}

/// Writes a value; a container met again inside itself is written as `[...]` or `{...}`.
fn write_value(
    value: &Value,
    f: &mut fmt::Formatter,
    open: &mut Vec<*const ()>,
) -> fmt::Result {
    if let Some(addr) = address(value) {
        if open.contains(&addr) {
            return match value {
                Value::Seq(_) => write!(f, "[...]"),
                _ => write!(f, "{{...}}"),
            };
        }
        open.push(addr);
        let result = write_container(value, f, open);
        open.pop();
        return result;
    }

    match value {
        Value::Null => write!(f, "null"),
        Value::Empty => write!(f, "{{ }}"),
        Value::Bool(b) => write!(f, "{}", b),
        Value::Int(i) => write!(f, "{}", i),
        Value::Float(x) => write!(f, "{}", x),
        Value::Decimal(d) => write!(f, "{}", d),
        Value::Fraction(x) => write!(f, "{}", x),
        Value::Str(s) => write!(f, "\"{}\"", s),
        Value::Function(func) => write!(f, "{}", func.signature()),
        Value::Native(func) => write!(f, "{}()", func.name()),
        Value::Seq(_) | Value::Set(_) | Value::Map(_) => Ok(()),
    }
}

fn write_container(
    value: &Value,
    f: &mut fmt::Formatter,
    open: &mut Vec<*const ()>,
) -> fmt::Result {
    match value {
        Value::Seq(s) => {
            let seq = s.borrow();
            if seq.is_empty() {
                return write!(f, "[ ]");
            }
            write!(f, "[ ")?;
            for (i, item) in seq.values().iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_value(item, f, open)?;
            }
            write!(f, " ]")
        }
        Value::Set(s) => {
            let set = s.borrow();
            if set.is_empty() {
                return write!(f, "{{ }}");
            }
            write!(f, "{{ ")?;
            for (i, item) in set.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_value(item, f, open)?;
            }
            write!(f, " }}")
        }
        Value::Map(m) => {
            let map = m.borrow();
            if map.is_empty() {
                return write!(f, "{{ }}");
            }
            write!(f, "{{ ")?;
            for (i, (key, item)) in map.entries().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: ", key)?;
                write_value(&item, f, open)?;
            }
            write!(f, " }}")
        }
        _ => Ok(()),
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Empty => write!(f, "Empty"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::Decimal(d) => f.debug_tuple("Decimal").field(d).finish(),
            Value::Fraction(x) => f.debug_tuple("Fraction").field(x).finish(),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Seq(_) => write!(f, "Seq({})", self),
            Value::Set(_) => write!(f, "Set({})", self),
            Value::Map(_) => write!(f, "Map({})", self),
            Value::Function(func) => f.debug_tuple("Function").field(func).finish(),
            Value::Native(func) => write!(f, "Native({}())", func.name()),
        }
    }
}

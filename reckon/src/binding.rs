//! Bindings and slots.
//!
//! A [`Binding`] describes where a value lives: the kind of construct that created it, its
//! optional name and description, and whether it is immutable.  Every container and every scope
//! carries one.
//!
//! A [`Slot`] is one entry of a name table.  Most slots are plain values; the rest are
//! [`Slot::Bound`] and pair a binding with a [`Source`] for the value, which may be stored, or
//! computed on every read (predefined constants like `pi`), or forwarded to a host setting.

use crate::container;
use crate::types::{ErrorKind, Exception};
use crate::value::Value;
use core::fmt;
use std::rc::Rc;

/// What kind of construct created a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Global,
    Object,
    Array,
    Set,
    Loop,
    If,
    While,
    Case,
    Function,
    With,
    Predefined,
    Constant,
    Enum,
    Parameter,
    System,
}

impl BindingKind {
    /// Block kinds get a scope but no parameter frame.
    pub fn is_block(self) -> bool {
        matches!(
            self,
            BindingKind::Loop
                | BindingKind::If
                | BindingKind::While
                | BindingKind::Case
                | BindingKind::With
        )
    }

    /// Frame kinds own a positional parameter list.
    pub fn is_frame(self) -> bool {
        matches!(self, BindingKind::Global | BindingKind::Function)
    }
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            BindingKind::Global => "global",
            BindingKind::Object => "object",
            BindingKind::Array => "array",
            BindingKind::Set => "set",
            BindingKind::Loop => "loop",
            BindingKind::If => "if",
            BindingKind::While => "while",
            BindingKind::Case => "case",
            BindingKind::Function => "function",
            BindingKind::With => "with",
            BindingKind::Predefined => "predefined",
            BindingKind::Constant => "constant",
            BindingKind::Enum => "enum",
            BindingKind::Parameter => "parameter",
            BindingKind::System => "system",
        };
        f.write_str(name)
    }
}

/// The metadata every bound value carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    kind: BindingKind,
    name: Option<String>,
    description: Option<String>,
    immutable: bool,
}

impl Binding {
    pub fn new(kind: BindingKind) -> Self {
        Self {
            kind,
            name: None,
            description: None,
            immutable: false,
        }
    }

    pub fn named(kind: BindingKind, name: &str) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(kind)
        }
    }

    /// Adds a description.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Starts the binding out immutable.
    pub fn frozen(mut self) -> Self {
        self.immutable = true;
        self
    }

    pub fn kind(&self) -> BindingKind {
        self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = Some(name.into());
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Marks the binding immutable.  There is no way back.
    pub fn set_immutable(&mut self) {
        self.immutable = true;
    }

    /// Fails if the binding is immutable.
    pub fn check_mutable(&self) -> Result<(), Exception> {
        if self.immutable {
            return Err(ErrorKind::ImmutableContainer(self.to_string()).into());
        }
        Ok(())
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} \"{}\"", self.kind, name),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Produces a value on demand.
pub type Supplier = Rc<dyn Fn() -> Value>;

/// Accepts a new value for a host setting.
pub type Setter = Rc<dyn Fn(Value) -> Result<(), Exception>>;

/// Where a bound slot's value comes from.
#[derive(Clone)]
pub enum Source {
    /// A value held in the slot.
    Stored(Value),

    /// A value computed on every read.
    Supplied(Supplier),

    /// A host setting, read through the getter and written through the setter.
    System { get: Supplier, set: Setter },
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Source::Stored(value) => f.debug_tuple("Stored").field(value).finish(),
            Source::Supplied(_) => f.write_str("Supplied(..)"),
            Source::System { .. } => f.write_str("System { .. }"),
        }
    }
}

/// One entry in a name table.
#[derive(Debug, Clone)]
pub enum Slot {
    Value(Value),
    Bound { binding: Binding, source: Source },
}

impl Slot {
    /// A named constant.  Containers in the value are frozen, deeply.
    pub fn constant(name: &str, value: Value) -> Slot {
        container::freeze(&value);
        Slot::Bound {
            binding: Binding::named(BindingKind::Constant, name).frozen(),
            source: Source::Stored(value),
        }
    }

    /// A predefined, read-only value.
    pub fn predefined(name: &str, value: Value) -> Slot {
        Slot::Bound {
            binding: Binding::named(BindingKind::Predefined, name).frozen(),
            source: Source::Stored(value),
        }
    }

    /// A predefined value recomputed on every read.
    pub fn supplier(name: &str, description: &str, supplier: Supplier) -> Slot {
        Slot::Bound {
            binding: Binding::named(BindingKind::Predefined, name)
                .with_description(description)
                .frozen(),
            source: Source::Supplied(supplier),
        }
    }

    /// A function parameter; immutable unless declared otherwise.
    pub fn parameter(name: &str, value: Value, mutable: bool) -> Slot {
        let binding = Binding::named(BindingKind::Parameter, name);
        Slot::Bound {
            binding: if mutable { binding } else { binding.frozen() },
            source: Source::Stored(value),
        }
    }

    /// One member of an enumeration.
    pub fn enum_value(name: &str, value: Value) -> Slot {
        Slot::Bound {
            binding: Binding::named(BindingKind::Enum, name).frozen(),
            source: Source::Stored(value),
        }
    }

    /// A host setting.
    pub fn system(name: &str, get: Supplier, set: Setter) -> Slot {
        Slot::Bound {
            binding: Binding::named(BindingKind::System, name),
            source: Source::System { get, set },
        }
    }

    /// The slot's current value.
    pub fn value(&self) -> Value {
        match self {
            Slot::Value(value) => value.clone(),
            Slot::Bound { source, .. } => match source {
                Source::Stored(value) => value.clone(),
                Source::Supplied(supplier) => supplier(),
                Source::System { get, .. } => get(),
            },
        }
    }

    pub fn binding(&self) -> Option<&Binding> {
        match self {
            Slot::Value(_) => None,
            Slot::Bound { binding, .. } => Some(binding),
        }
    }

    pub fn is_immutable(&self) -> bool {
        self.binding().map(|b| b.is_immutable()).unwrap_or(false)
    }

    /// Writes a new value into the slot, named `name` for error messages.
    pub fn store(&mut self, name: &str, value: Value) -> Result<(), Exception> {
        match self {
            Slot::Value(old) => {
                *old = value;
                Ok(())
            }
            Slot::Bound { binding, .. } if binding.is_immutable() => {
                Err(ErrorKind::ConstantAssign(name.into()).into())
            }
            Slot::Bound { source, .. } => match source {
                Source::Stored(old) => {
                    *old = value;
                    Ok(())
                }
                Source::System { set, .. } => set(value),
                Source::Supplied(_) => Err(ErrorKind::ConstantAssign(name.into()).into()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    #[test]
    fn test_plain_slot() {
        let mut slot = Slot::Value(Value::from(1));
        slot.store("x", Value::from(2)).unwrap();
        assert_eq!(slot.value(), Value::from(2));
        assert!(!slot.is_immutable());
    }

    #[test]
    fn test_constant_rejects_store() {
        let mut slot = Slot::constant("k", Value::from(1));
        let err = slot.store("k", Value::from(2)).unwrap_err();
        assert_eq!(err.kind(), Some(&ErrorKind::ConstantAssign("k".into())));
        assert_eq!(slot.value(), Value::from(1));
    }

    #[test]
    fn test_constant_freezes_containers() {
        let list = Value::from(vec![Value::from(vec![Value::from(1)])]);
        let _slot = Slot::constant("k", list.clone());
        assert!(list.is_immutable());
        if let Value::Seq(seq) = &list {
            assert!(seq.borrow().values()[0].is_immutable());
        }
    }

    #[test]
    fn test_mutable_parameter() {
        let mut slot = Slot::parameter("p", Value::from(1), true);
        slot.store("p", Value::from(5)).unwrap();
        assert_eq!(slot.value(), Value::from(5));

        let mut slot = Slot::parameter("p", Value::from(1), false);
        assert!(slot.store("p", Value::from(5)).is_err());
    }

    #[test]
    fn test_supplier_reads_fresh() {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let slot = Slot::supplier(
            "tick",
            "counts reads",
            Rc::new(move || {
                c.set(c.get() + 1);
                Value::from(c.get() as i64)
            }),
        );
        assert_eq!(slot.value(), Value::from(1));
        assert_eq!(slot.value(), Value::from(2));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_system_slot_forwards() {
        let setting = Rc::new(Cell::new(10i64));
        let (g, s) = (setting.clone(), setting.clone());
        let mut slot = Slot::system(
            "precision",
            Rc::new(move || Value::from(g.get())),
            Rc::new(move |v| match v.as_index() {
                Some(n) => {
                    s.set(n);
                    Ok(())
                }
                None => Err(Exception::message("precision must be an integer")),
            }),
        );

        slot.store("precision", Value::from(20)).unwrap();
        assert_eq!(setting.get(), 20);
        assert!(slot.store("precision", Value::from("x")).is_err());
        assert_eq!(slot.value(), Value::from(20));
    }

    #[test]
    fn test_binding_display() {
        let b = Binding::named(BindingKind::Array, "xs");
        assert_eq!(b.to_string(), "array \"xs\"");
        assert_eq!(Binding::new(BindingKind::With).to_string(), "with");
        assert!(BindingKind::With.is_block());
        assert!(BindingKind::Function.is_frame());
    }
}

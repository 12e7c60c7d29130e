//! The UniqueSet container: an unordered collection of distinct values.
//!
//! Members keep their insertion order, which doubles as the positional view used when a set is
//! indexed.  Removing a member shifts the later members down, so the view always reflects the
//! current contents.
//!
//! The set algebra takes any container as its right-hand operand: a set or sequence contributes
//! its elements and an object contributes its values.  The shared empty placeholder is a
//! special case; union and difference with it return the receiver itself, unchanged.

use crate::binding::{Binding, BindingKind};
use crate::container::Container;
use crate::types::{ErrorKind, Exception, ReckonHasher, ReckonInt, ReckonResult};
use crate::value::{SetRef, Value};
use core::cell::RefCell;
use indexmap::IndexSet;
use std::rc::Rc;

/// A set of distinct values.
#[derive(Debug, Clone)]
pub struct UniqueSet {
    binding: Binding,
    values: IndexSet<Value, ReckonHasher>,
}

impl Default for UniqueSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for UniqueSet {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl UniqueSet {
    pub fn new() -> Self {
        Self {
            binding: Binding::new(BindingKind::Set),
            values: IndexSet::default(),
        }
    }

    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let mut set = Self::new();
        set.values.extend(values);
        set
    }

    /// Builds a set from another container: an object gives its key set, a sequence its
    /// elements, a set itself, and the empty placeholder a fresh empty set.
    pub fn from_container(value: &Value) -> Result<SetRef, Exception> {
        let set = match value {
            Value::Set(set) => return Ok(Rc::clone(set)),
            Value::Empty => UniqueSet::new(),
            Value::Map(map) => UniqueSet::from_values(map.borrow().keys().map(Value::from)),
            Value::Seq(seq) => UniqueSet::from_values(seq.borrow().values().iter().cloned()),
            other => {
                return Err(ErrorKind::BadOperand {
                    op: "set conversion",
                    kind: other.kind_name(),
                }
                .into())
            }
        };
        Ok(Rc::new(RefCell::new(set)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.values.contains(value)
    }

    /// Adds a value; returns false if it was already a member.
    pub fn add(&mut self, value: Value) -> Result<bool, Exception> {
        self.check_mutable()?;
        Ok(self.values.insert(value))
    }

    /// Removes a value; returns false if it wasn't a member.
    pub fn remove(&mut self, value: &Value) -> Result<bool, Exception> {
        self.check_mutable()?;
        Ok(self.values.shift_remove(value))
    }

    /// Gets the member at a position in the set's current order.  Indexing follows sequence
    /// rules: negative counts back from the end, past the end is `Null`.
    pub fn get(&self, index: ReckonInt) -> ReckonResult {
        let pos = if index < 0 {
            index + self.values.len() as ReckonInt
        } else {
            index
        };
        if pos < 0 {
            return Err(ErrorKind::NegativeIndex(index).into());
        }
        Ok(self.values.get_index(pos as usize).cloned().unwrap_or_default())
    }

    /// Adds every member of `other` to this set in place.
    pub fn add_all(&mut self, other: &UniqueSet) -> Result<(), Exception> {
        self.check_mutable()?;
        self.values.extend(other.values.iter().cloned());
        Ok(())
    }

    /// Removes every operand value from this set in place.
    pub fn remove_all(&mut self, other: &Value) -> Result<(), Exception> {
        self.check_mutable()?;
        if let Some(values) = operand_values("difference", other)? {
            for value in &values {
                self.values.shift_remove(value);
            }
        }
        Ok(())
    }

    /// The union of the set and the operand, as a new set.
    pub fn union(this: &SetRef, other: &Value) -> Result<SetRef, Exception> {
        match operand_values("union", other)? {
            None => Ok(Rc::clone(this)),
            Some(values) => {
                let mut result = UniqueSet::from_values(this.borrow().iter().cloned());
                result.values.extend(values);
                Ok(Rc::new(RefCell::new(result)))
            }
        }
    }

    /// The members of the set that are also operand values, as a new set.
    pub fn intersect(this: &SetRef, other: &Value) -> Result<SetRef, Exception> {
        let values = operand_values("intersection", other)?.unwrap_or_default();
        let other = UniqueSet::from_values(values);
        let result = UniqueSet::from_values(
            this.borrow()
                .iter()
                .filter(|v| other.contains(v))
                .cloned(),
        );
        Ok(Rc::new(RefCell::new(result)))
    }

    /// The members of the set that are not operand values, as a new set.
    pub fn difference(this: &SetRef, other: &Value) -> Result<SetRef, Exception> {
        match operand_values("difference", other)? {
            None => Ok(Rc::clone(this)),
            Some(values) => {
                let mut result = UniqueSet::from_values(this.borrow().iter().cloned());
                for value in &values {
                    result.values.shift_remove(value);
                }
                Ok(Rc::new(RefCell::new(result)))
            }
        }
    }
}

/// The values a set operation draws from its right-hand operand, or `None` for the empty
/// placeholder.
fn operand_values(op: &'static str, other: &Value) -> Result<Option<Vec<Value>>, Exception> {
    match other {
        Value::Empty => Ok(None),
        Value::Set(set) => Ok(Some(set.borrow().iter().cloned().collect())),
        Value::Seq(seq) => Ok(Some(seq.borrow().values().to_vec())),
        Value::Map(map) => Ok(Some(map.borrow().values())),
        other => Err(ErrorKind::BadOperand {
            op,
            kind: other.kind_name(),
        }
        .into()),
    }
}

impl Container for UniqueSet {
    fn binding(&self) -> &Binding {
        &self.binding
    }

    fn binding_mut(&mut self) -> &mut Binding {
        &mut self.binding
    }

    fn size(&self) -> usize {
        self.values.len()
    }

    fn flatten(&self) -> Vec<Value> {
        self.values.iter().cloned().collect()
    }
}

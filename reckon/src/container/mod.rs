//! Containers: sequences, sets and objects.
//!
//! The three container types share the [`Container`] trait, which exposes the binding every
//! container carries along with the immutability flag that guards it.  Once a container is
//! frozen every mutating operation fails before it changes anything.

use crate::binding::Binding;
use crate::types::Exception;
use crate::value::Value;

pub mod mapping;
pub mod sequence;
pub mod set;

pub use mapping::Mapping;
pub use sequence::Sequence;
pub use set::UniqueSet;

/// Behavior common to all containers.
pub trait Container {
    /// The container's binding metadata.
    fn binding(&self) -> &Binding;

    fn binding_mut(&mut self) -> &mut Binding;

    /// The number of elements or entries.
    fn size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// The first-level values, in order.
    fn flatten(&self) -> Vec<Value> {
        Vec::new()
    }

    fn is_immutable(&self) -> bool {
        self.binding().is_immutable()
    }

    /// Freezes the container.  Nested containers are untouched; see [`freeze`].
    fn set_immutable(&mut self) {
        self.binding_mut().set_immutable();
    }

    /// Fails if the container is frozen.
    fn check_mutable(&self) -> Result<(), Exception> {
        self.binding().check_mutable()
    }
}

/// Freezes a value and every container reachable from it.
pub fn freeze(value: &Value) {
    let children = match value {
        Value::Seq(seq) => {
            if seq.borrow().is_immutable() {
                return;
            }
            seq.borrow_mut().set_immutable();
            let items = seq.borrow().flatten();
            items
        }
        Value::Set(set) => {
            if set.borrow().is_immutable() {
                return;
            }
            set.borrow_mut().set_immutable();
            let items = set.borrow().flatten();
            items
        }
        Value::Map(map) => {
            if map.borrow().is_immutable() {
                return;
            }
            map.borrow_mut().set_immutable();
            let items = map.borrow().flatten();
            items
        }
        _ => return,
    };

    for child in &children {
        freeze(child);
    }
}

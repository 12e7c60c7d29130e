//! The Mapping container: an object, mapping string keys to slots.
//!
//! Mappings are also the name tables of scopes, so every entry is a [`Slot`] and may carry its
//! own binding (a constant, a parameter, a host setting).  Keys keep insertion order unless the
//! object is sorted, and the order is the object's positional view: `obj[0]` is its first
//! entry's value.
//!
//! Lookups take an `ignore_case` flag.  An exact match always wins; failing that, and only when
//! the flag is set, the first key equal to the name ignoring case is used.

use crate::binding::{Binding, BindingKind, Slot};
use crate::container::{Container, UniqueSet};
use crate::types::{ErrorKind, Exception, ReckonHasher, ReckonInt, ReckonResult};
use crate::value::Value;
use indexmap::IndexMap;

/// Compares two names ignoring case.
pub(crate) fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

/// An object: string keys to slots.
#[derive(Debug, Clone)]
pub struct Mapping {
    binding: Binding,
    entries: IndexMap<String, Slot, ReckonHasher>,
}

impl Default for Mapping {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(key, slot)| match other.entries.get(key) {
                    Some(theirs) => slot.value() == theirs.value(),
                    None => false,
                })
    }
}

impl Mapping {
    /// Creates an empty object.
    pub fn new() -> Self {
        Self::with_binding(Binding::new(BindingKind::Object))
    }

    /// Creates an empty table with the given binding, e.g., for a scope.
    pub fn with_binding(binding: Binding) -> Self {
        Self {
            binding,
            entries: IndexMap::default(),
        }
    }

    /// Creates an object from key/value pairs.  Later duplicates replace earlier ones.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut map = Self::new();
        for (key, value) in entries {
            map.entries.insert(key, Slot::Value(value));
        }
        map
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Finds the position of a key.
    fn find(&self, name: &str, ignore_case: bool) -> Option<usize> {
        if let Some(index) = self.entries.get_index_of(name) {
            return Some(index);
        }
        if ignore_case {
            return self.entries.keys().position(|k| eq_ignore_case(k, name));
        }
        None
    }

    /// The actual stored spelling of a key.
    pub fn key_of(&self, name: &str, ignore_case: bool) -> Option<&str> {
        self.find(name, ignore_case)
            .and_then(|i| self.entries.get_index(i))
            .map(|(k, _)| k.as_str())
    }

    pub fn contains(&self, name: &str, ignore_case: bool) -> bool {
        self.find(name, ignore_case).is_some()
    }

    pub fn slot(&self, name: &str, ignore_case: bool) -> Option<&Slot> {
        self.find(name, ignore_case)
            .and_then(|i| self.entries.get_index(i))
            .map(|(_, slot)| slot)
    }

    /// Gets the value bound to the name.
    pub fn get(&self, name: &str, ignore_case: bool) -> Option<Value> {
        self.slot(name, ignore_case).map(Slot::value)
    }

    /// Sets the value bound to the name, creating the entry if there is none.  Fails if the
    /// object is frozen or the entry's own binding is immutable.
    pub fn set(&mut self, name: &str, ignore_case: bool, value: Value) -> Result<(), Exception> {
        self.check_mutable()?;
        match self.find(name, ignore_case) {
            Some(index) => match self.entries.get_index_mut(index) {
                Some((key, slot)) => slot.store(key, value),
                None => Ok(()),
            },
            None => {
                self.entries.insert(name.into(), Slot::Value(value));
                Ok(())
            }
        }
    }

    /// Installs a slot under the exact name, replacing whatever was there.
    pub fn define(&mut self, name: &str, slot: Slot) -> Result<(), Exception> {
        self.check_mutable()?;
        self.entries.insert(name.into(), slot);
        Ok(())
    }

    /// Removes an entry, returning its value.
    pub fn remove(&mut self, name: &str, ignore_case: bool) -> Result<Option<Value>, Exception> {
        self.check_mutable()?;
        Ok(self
            .find(name, ignore_case)
            .and_then(|i| self.entries.shift_remove_index(i))
            .map(|(_, slot)| slot.value()))
    }

    fn position(&self, index: ReckonInt) -> Result<usize, Exception> {
        let pos = if index < 0 {
            index + self.entries.len() as ReckonInt
        } else {
            index
        };
        if pos < 0 {
            return Err(ErrorKind::NegativeIndex(index).into());
        }
        Ok(pos as usize)
    }

    /// Gets the value of the entry at a position; past the end is `Null`.
    pub fn get_index(&self, index: ReckonInt) -> ReckonResult {
        let pos = self.position(index)?;
        Ok(self
            .entries
            .get_index(pos)
            .map(|(_, slot)| slot.value())
            .unwrap_or_default())
    }

    /// Sets the value of the entry at a position.  There is no key to create, so a position
    /// past the end is an error.
    pub fn set_index(&mut self, index: ReckonInt, value: Value) -> Result<(), Exception> {
        self.check_mutable()?;
        let pos = self.position(index)?;
        let size = self.entries.len();
        match self.entries.get_index_mut(pos) {
            Some((key, slot)) => slot.store(key, value),
            None => Err(ErrorKind::IndexOutOfRange { index, size }.into()),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// The current values, in key order.
    pub fn values(&self) -> Vec<Value> {
        self.entries.values().map(Slot::value).collect()
    }

    /// The keys and current values, in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Value)> {
        self.entries.iter().map(|(k, slot)| (k.as_str(), slot.value()))
    }

    /// The key set, as a new set.
    pub fn key_set(&self) -> UniqueSet {
        UniqueSet::from_values(self.keys().map(Value::from))
    }

    /// Sorts the entries by key.
    pub fn sort_keys(&mut self) {
        self.entries.sort_keys();
    }

    /// The entries whose keys match a glob pattern, in key order.
    #[cfg(feature = "wildcard")]
    pub fn wildcard(&self, pattern: &glob::Pattern, ignore_case: bool) -> Vec<(String, Value)> {
        let options = glob::MatchOptions {
            case_sensitive: !ignore_case,
            ..glob::MatchOptions::new()
        };
        self.entries
            .iter()
            .filter(|(k, _)| pattern.matches_with(k, options))
            .map(|(k, slot)| (k.clone(), slot.value()))
            .collect()
    }
}

impl Container for Mapping {
    fn binding(&self) -> &Binding {
        &self.binding
    }

    fn binding_mut(&mut self) -> &mut Binding {
        &mut self.binding
    }

    fn size(&self) -> usize {
        self.entries.len()
    }

    fn flatten(&self) -> Vec<Value> {
        self.values()
    }
}

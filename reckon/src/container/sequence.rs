//! The Sequence container: an ordered, growable array of values.
//!
//! Reads are forgiving: a negative index counts back from the end, and an index past the end
//! reads as `Null`.  Writes past the end pad the gap with `Null`.  An index that is still
//! negative after counting back from the end is an error either way, and so is a write that
//! would grow the sequence past [`MAX_LENGTH`].

use crate::binding::{Binding, BindingKind};
use crate::container::Container;
use crate::types::{ErrorKind, Exception, ReckonInt, ReckonResult};
use crate::value::Value;

/// The most elements a write past the end may grow a sequence to.
pub const MAX_LENGTH: usize = 1 << 24;

/// An ordered array of values.
#[derive(Debug, Clone)]
pub struct Sequence {
    binding: Binding,
    values: Vec<Value>,
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Sequence {
    /// Creates an empty sequence.
    pub fn new() -> Self {
        Self {
            binding: Binding::new(BindingKind::Array),
            values: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            binding: Binding::new(BindingKind::Array),
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            binding: Binding::new(BindingKind::Array),
            values,
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Converts a possibly negative index into a position.
    fn position(&self, index: ReckonInt) -> Result<usize, Exception> {
        let pos = if index < 0 {
            index + self.values.len() as ReckonInt
        } else {
            index
        };

        if pos < 0 {
            return Err(ErrorKind::NegativeIndex(index).into());
        }
        Ok(pos as usize)
    }

    /// Gets the value at the index; past the end is `Null`.
    pub fn get(&self, index: ReckonInt) -> ReckonResult {
        let pos = self.position(index)?;
        Ok(self.values.get(pos).cloned().unwrap_or_default())
    }

    /// Sets the value at the index, padding with `Null` when it lies past the end.
    pub fn set(&mut self, index: ReckonInt, value: Value) -> Result<(), Exception> {
        self.check_mutable()?;
        let pos = self.position(index)?;

        if pos < self.values.len() {
            self.values[pos] = value;
        } else {
            let size = self.values.len();
            let out_of_range = || Exception::from(ErrorKind::IndexOutOfRange { index, size });
            if pos >= MAX_LENGTH {
                return Err(out_of_range());
            }
            self.values
                .try_reserve(pos + 1 - size)
                .map_err(|_| out_of_range())?;
            self.values.resize(pos, Value::Null);
            self.values.push(value);
        }
        Ok(())
    }

    /// Inserts a value before the given position.
    pub fn insert(&mut self, index: usize, value: Value) -> Result<(), Exception> {
        self.check_mutable()?;
        if index > self.values.len() {
            return Err(ErrorKind::IndexOutOfRange {
                index: index as ReckonInt,
                size: self.values.len(),
            }
            .into());
        }
        self.values.insert(index, value);
        Ok(())
    }

    /// Appends a value.
    pub fn add(&mut self, value: Value) -> Result<(), Exception> {
        self.check_mutable()?;
        self.values.push(value);
        Ok(())
    }

    /// Appends every value, or none if the sequence is frozen.
    pub fn add_all<I>(&mut self, values: I) -> Result<(), Exception>
    where
        I: IntoIterator<Item = Value>,
    {
        self.check_mutable()?;
        self.values.extend(values);
        Ok(())
    }

    /// Removes and returns the value at the given position.
    pub fn remove(&mut self, index: usize) -> ReckonResult {
        self.check_mutable()?;
        if index >= self.values.len() {
            return Err(ErrorKind::IndexOutOfRange {
                index: index as ReckonInt,
                size: self.values.len(),
            }
            .into());
        }
        Ok(self.values.remove(index))
    }

    /// Makes room for at least `capacity` elements in total.
    pub fn reserve(&mut self, capacity: usize) {
        let additional = capacity.saturating_sub(self.values.len());
        self.values.reserve(additional);
    }

    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    /// The number of dimensions: one, plus the deepest nesting of any element sequence.  A
    /// sequence nested inside itself adds no further dimensions.
    pub fn dimension_count(&self) -> usize {
        self.count_dimensions(&mut Vec::new())
    }

    fn count_dimensions(&self, open: &mut Vec<*const Sequence>) -> usize {
        open.push(self);
        let deepest = self
            .values
            .iter()
            .map(|v| match v {
                Value::Seq(inner) => {
                    let inner = inner.borrow();
                    if open.contains(&(&*inner as *const Sequence)) {
                        0
                    } else {
                        inner.count_dimensions(open)
                    }
                }
                _ => 0,
            })
            .max()
            .unwrap_or(0);
        open.pop();
        1 + deepest
    }

    /// The size of the given dimension: the length of this sequence for dimension 0, and the
    /// largest size among the nested sequences for deeper ones.
    pub fn dimension_size(&self, dimension: usize) -> usize {
        self.measure_dimension(dimension, &mut Vec::new())
    }

    fn measure_dimension(&self, dimension: usize, open: &mut Vec<*const Sequence>) -> usize {
        if dimension == 0 {
            return self.values.len();
        }

        open.push(self);
        let largest = self
            .values
            .iter()
            .map(|v| match v {
                Value::Seq(inner) => {
                    let inner = inner.borrow();
                    if open.contains(&(&*inner as *const Sequence)) {
                        0
                    } else {
                        inner.measure_dimension(dimension - 1, open)
                    }
                }
                _ => 0,
            })
            .max()
            .unwrap_or(0);
        open.pop();
        largest
    }
}

impl Container for Sequence {
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
        self.values.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ints(items: &[i64]) -> Sequence {
        Sequence::from_values(items.iter().map(|i| Value::from(*i)).collect())
    }

    #[test]
    fn test_get() {
        let seq = ints(&[10, 20, 30]);
        assert_eq!(seq.get(0), Ok(Value::from(10)));
        assert_eq!(seq.get(-1), Ok(Value::from(30)));
        assert_eq!(seq.get(7), Ok(Value::Null));
        assert_eq!(
            seq.get(-4).unwrap_err().kind(),
            Some(&ErrorKind::NegativeIndex(-4))
        );
    }

    #[test]
    fn test_set_pads_with_null() {
        let mut seq = ints(&[1]);
        seq.set(3, Value::from(4)).unwrap();
        assert_eq!(
            seq.values(),
            &[Value::from(1), Value::Null, Value::Null, Value::from(4)]
        );

        seq.set(-1, Value::from(9)).unwrap();
        assert_eq!(seq.get(3), Ok(Value::from(9)));
    }

    #[test]
    fn test_insert_and_remove() {
        let mut seq = ints(&[1, 3]);
        seq.insert(1, Value::from(2)).unwrap();
        seq.insert(3, Value::from(4)).unwrap();
        assert_eq!(seq, ints(&[1, 2, 3, 4]));
        assert!(seq.insert(9, Value::Null).is_err());

        assert_eq!(seq.remove(0), Ok(Value::from(1)));
        assert!(seq.remove(3).is_err());
        assert_eq!(seq, ints(&[2, 3, 4]));
    }

    #[test]
    fn test_frozen_sequence_is_unchanged() {
        let mut seq = ints(&[1, 2]);
        seq.set_immutable();

        assert!(seq.set(0, Value::from(5)).is_err());
        assert!(seq.add(Value::from(5)).is_err());
        assert!(seq.add_all(vec![Value::from(5)]).is_err());
        assert!(seq.insert(0, Value::from(5)).is_err());
        assert!(seq.remove(0).is_err());
        assert_eq!(seq, ints(&[1, 2]));
    }

    #[test]
    fn test_dimensions() {
        let row = |items: &[i64]| Value::from(ints(items));
        let grid = Sequence::from_values(vec![row(&[1, 2]), row(&[1, 2, 3]), Value::from(7)]);

        assert_eq!(grid.dimension_count(), 2);
        assert_eq!(grid.dimension_size(0), 3);
        assert_eq!(grid.dimension_size(1), 3);
        assert_eq!(grid.dimension_size(2), 0);
        assert_eq!(ints(&[]).dimension_count(), 1);
    }

    #[test]
    fn test_set_far_past_end() {
        let mut seq = ints(&[1, 2]);
        for index in [MAX_LENGTH as ReckonInt, ReckonInt::MAX] {
            assert_eq!(
                seq.set(index, Value::from(3)),
                Err(ErrorKind::IndexOutOfRange { index, size: 2 }.into())
            );
        }
        assert_eq!(seq, ints(&[1, 2]));
    }

    #[test]
    fn test_dimensions_of_nested_self() {
        let grid = Value::from(vec![Value::from(ints(&[1, 2, 3]))]);
        if let Value::Seq(seq) = &grid {
            seq.borrow_mut().add(grid.clone()).unwrap();
            let seq = seq.borrow();
            assert_eq!(seq.dimension_count(), 2);
            assert_eq!(seq.dimension_size(1), 3);
            assert_eq!(seq.dimension_size(2), 0);
        }
    }

    #[test]
    fn test_reserve() {
        let mut seq = ints(&[1, 2]);
        seq.reserve(100);
        assert!(seq.capacity() >= 100);
        assert_eq!(seq.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_set_then_get(len in 0usize..20, index in 0i64..40, x in any::<i64>()) {
            let mut seq = Sequence::from_values(vec![Value::Null; len]);
            seq.set(index, Value::from(x)).unwrap();

            prop_assert_eq!(seq.get(index).unwrap(), Value::from(x));
            prop_assert_eq!(seq.len(), len.max(index as usize + 1));
        }

        #[test]
        fn prop_negative_index_counts_back(items in prop::collection::vec(any::<i64>(), 1..20)) {
            let seq = ints(&items);
            let n = items.len() as i64;
            for i in 1..=n {
                prop_assert_eq!(seq.get(-i).unwrap(), Value::from(items[(n - i) as usize]));
            }
        }
    }
}

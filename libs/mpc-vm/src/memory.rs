//! Flat, fixed-capacity memory of runtime [`Value`]s.

use crate::value::Value;
use std::fmt;

/// A memory address: an index into a [`Memory`].
///
/// A dedicated newtype rather than a bare `usize` keeps addresses from being accidentally mixed
/// with batch counts, participant indices, or other integer-shaped quantities the instruction set
/// passes around.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u32);

impl Address {
    /// Constructs an address from a raw offset.
    pub const fn new(offset: u32) -> Self {
        Self(offset)
    }

    /// The raw offset this address refers to.
    pub fn offset(self) -> u32 {
        self.0
    }

    /// The address `self + i`.
    pub fn plus(self, i: u32) -> Self {
        Self(self.0 + i)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

impl From<u32> for Address {
    fn from(offset: u32) -> Self {
        Self(offset)
    }
}

/// An error from reading or writing [`Memory`].
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// A load was attempted from a slot that has never been written.
    #[error("address {0:?} is unset")]
    Unset(Address),

    /// An address (or the end of an address range) lies past the end of memory.
    #[error("address {0:?} is out of bounds (capacity {1})")]
    OutOfBounds(Address, usize),
}

/// A fixed-capacity, flat sequence of [`Value`] slots addressed by small integers.
///
/// Slots default to unset; reading an unset slot is [`MemoryError::Unset`]. A contiguous range of
/// slots can be borrowed as a logical vector via [`Memory::vector`]/[`Memory::vector_mut`],
/// replacing the source's raw pointer arithmetic over contiguous slots with ordinary slice views.
#[derive(Debug, Clone)]
pub struct Memory {
    slots: Vec<Option<Value>>,
}

impl Memory {
    /// Constructs a memory with `capacity` unset slots.
    pub fn new(capacity: usize) -> Self {
        Self { slots: vec![None; capacity] }
    }

    /// The number of addressable slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn check_bounds(&self, address: Address) -> Result<usize, MemoryError> {
        let index = address.offset() as usize;
        if index >= self.slots.len() {
            return Err(MemoryError::OutOfBounds(address, self.slots.len()));
        }
        Ok(index)
    }

    /// Writes `value` into `address`, regardless of whether it was previously set.
    pub fn store(&mut self, address: Address, value: Value) -> Result<(), MemoryError> {
        let index = self.check_bounds(address)?;
        self.slots[index] = Some(value);
        Ok(())
    }

    /// Reads the value at `address`.
    pub fn load(&self, address: Address) -> Result<&Value, MemoryError> {
        let index = self.check_bounds(address)?;
        self.slots[index].as_ref().ok_or(MemoryError::Unset(address))
    }

    /// Borrows `len` contiguous slots starting at `start` as a logical vector, failing if any of
    /// them is unset or the range runs past the end of memory.
    pub fn vector(&self, start: Address, len: usize) -> Result<Vec<&Value>, MemoryError> {
        (0..len as u32).map(|i| self.load(start.plus(i))).collect()
    }

    /// Writes a logical vector of values into `len` contiguous slots starting at `start`.
    pub fn store_vector(&mut self, start: Address, values: impl IntoIterator<Item = Value>) -> Result<(), MemoryError> {
        for (i, value) in values.into_iter().enumerate() {
            self.store(start.plus(i as u32), value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use field::Fp;
    use num_bigint::BigUint;

    fn public(field: &Fp, v: u32) -> Value {
        Value::Public(field.new_in_field(BigUint::from(v)))
    }

    #[test]
    fn store_then_load_round_trips() {
        let field = Fp::small();
        let mut memory = Memory::new(4);
        memory.store(Address::new(1), public(&field, 5)).unwrap();
        assert_eq!(memory.load(Address::new(1)).unwrap(), &public(&field, 5));
    }

    #[test]
    fn loading_unset_slot_fails() {
        let memory = Memory::new(4);
        assert!(matches!(memory.load(Address::new(0)), Err(MemoryError::Unset(_))));
    }

    #[test]
    fn out_of_bounds_address_fails() {
        let mut memory = Memory::new(2);
        assert!(matches!(memory.load(Address::new(5)), Err(MemoryError::OutOfBounds(..))));
        let field = Fp::small();
        assert!(matches!(memory.store(Address::new(5), public(&field, 1)), Err(MemoryError::OutOfBounds(..))));
    }

    #[test]
    fn vector_reads_contiguous_range() {
        let field = Fp::small();
        let mut memory = Memory::new(4);
        memory.store_vector(Address::new(0), vec![public(&field, 1), public(&field, 2), public(&field, 3)]).unwrap();
        let view = memory.vector(Address::new(0), 3).unwrap();
        assert_eq!(view, vec![&public(&field, 1), &public(&field, 2), &public(&field, 3)]);
    }

    #[test]
    fn vector_fails_if_any_slot_unset() {
        let field = Fp::small();
        let mut memory = Memory::new(4);
        memory.store(Address::new(0), public(&field, 1)).unwrap();
        assert!(matches!(memory.vector(Address::new(0), 3), Err(MemoryError::Unset(_))));
    }
}

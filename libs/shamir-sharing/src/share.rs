//! A single Shamir share.

use crate::errors::ShamirError;
use field::FpElement;
use std::ops::{Add, Mul, Sub};

/// A Shamir share: a participant's evaluation of a secret-hiding polynomial.
///
/// `index` identifies the participant (`1..=n`); index `0` denotes the secret itself and is
/// rejected by [`Share::new`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Share {
    index: u64,
    value: FpElement,
}

impl Share {
    /// Constructs a share for the given participant index and value.
    pub fn new(index: u64, value: FpElement) -> Result<Self, ShamirError> {
        if index == 0 {
            return Err(ShamirError::ZeroIndex);
        }
        Ok(Self { index, value })
    }

    /// The participant index this share belongs to.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// The share's value.
    pub fn value(&self) -> &FpElement {
        &self.value
    }

    fn check_compatible(&self, other: &Self) -> Result<(), ShamirError> {
        self.value.check_same_field(&other.value).map_err(|_| ShamirError::FieldMismatch)?;
        if self.index != other.index {
            return Err(ShamirError::IndexMismatch);
        }
        Ok(())
    }

    /// Checked addition; both shares must be at the same index and field.
    pub fn checked_add(&self, other: &Self) -> Result<Self, ShamirError> {
        self.check_compatible(other)?;
        Ok(Self { index: self.index, value: &self.value + &other.value })
    }

    /// Checked subtraction; both shares must be at the same index and field.
    pub fn checked_sub(&self, other: &Self) -> Result<Self, ShamirError> {
        self.check_compatible(other)?;
        Ok(Self { index: self.index, value: &self.value - &other.value })
    }

    /// Checked (local) multiplication; both shares must be at the same index and field.
    ///
    /// Note this is *not* the MPC multiplication protocol: it is the plain pointwise product of
    /// two shares' values, useful when one side is a locally-known constant wrapped as a share
    /// (e.g. in Pedersen commitment arithmetic), not for multiplying two independently-held
    /// secrets.
    pub fn checked_mul(&self, other: &Self) -> Result<Self, ShamirError> {
        self.check_compatible(other)?;
        Ok(Self { index: self.index, value: &self.value * &other.value })
    }
}

macro_rules! impl_op {
    ($trait:ident, $method:ident, $checked:ident) => {
        impl $trait for Share {
            type Output = Share;

            fn $method(self, rhs: Share) -> Share {
                self.$checked(&rhs).expect("share index or field mismatch; use checked_* for fallible arithmetic")
            }
        }

        impl $trait<&Share> for &Share {
            type Output = Share;

            fn $method(self, rhs: &Share) -> Share {
                self.$checked(rhs).expect("share index or field mismatch; use checked_* for fallible arithmetic")
            }
        }
    };
}

impl_op!(Add, add, checked_add);
impl_op!(Sub, sub, checked_sub);
impl_op!(Mul, mul, checked_mul);

#[cfg(feature = "serde")]
impl serde::Serialize for Share {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Share", 2)?;
        s.serialize_field("index", &self.index)?;
        s.serialize_field("value", &self.value)?;
        s.end()
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Share {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        struct Repr {
            index: u64,
            value: FpElement,
        }
        let repr = Repr::deserialize(deserializer)?;
        Share::new(repr.index, repr.value).map_err(serde::de::Error::custom)
    }
}

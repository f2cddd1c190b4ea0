//! Elements of a prime field.

use crate::errors::FieldError;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use std::{
    fmt::{self, Debug, Display},
    ops::{Add, Div, Mul, Neg, Sub},
    sync::Arc,
};

/// An element of a prime field `Fp`.
///
/// Holds the modulus alongside the value so that two elements can be checked for
/// field-compatibility before any arithmetic is performed. The modulus is reference-counted
/// since it is shared by every element and share produced from the same [`crate::Fp`].
#[derive(Clone)]
pub struct FpElement {
    pub(crate) modulus: Arc<BigUint>,
    pub(crate) value: BigUint,
}

impl FpElement {
    /// Constructs an element from a value already known to lie in `[0, p)`.
    ///
    /// # Panics
    ///
    /// Panics if `value >= modulus`. This is a programmer error per the VM's error taxonomy:
    /// callers that cannot guarantee the invariant up front should use [`FpElement::try_new`]
    /// instead.
    pub fn new(value: BigUint, modulus: Arc<BigUint>) -> Self {
        Self::try_new(value, modulus).expect("value out of range for field")
    }

    /// Constructs an element from a value, rejecting it instead of panicking if it is out of
    /// range.
    pub fn try_new(value: BigUint, modulus: Arc<BigUint>) -> Result<Self, FieldError> {
        if value >= *modulus {
            return Err(FieldError::OutOfRange);
        }
        Ok(Self { modulus, value })
    }

    /// Constructs an element by reducing an arbitrary non-negative integer into `[0, p)`.
    pub fn from_reduced(value: BigUint, modulus: Arc<BigUint>) -> Self {
        let value = value % &*modulus;
        Self { modulus, value }
    }

    /// The zero element of the given field.
    pub fn zero(modulus: Arc<BigUint>) -> Self {
        Self { value: BigUint::zero(), modulus }
    }

    /// The one element of the given field.
    pub fn one(modulus: Arc<BigUint>) -> Self {
        Self { value: BigUint::one(), modulus }
    }

    /// The element's value, a non-negative integer strictly smaller than the modulus.
    pub fn value(&self) -> &BigUint {
        &self.value
    }

    /// The modulus of the field this element belongs to.
    pub fn modulus(&self) -> &Arc<BigUint> {
        &self.modulus
    }

    /// Whether this element is the additive identity.
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Checks that `self` and `other` belong to the same field.
    pub fn check_same_field(&self, other: &Self) -> Result<(), FieldError> {
        if self.modulus == other.modulus { Ok(()) } else { Err(FieldError::FieldMismatch) }
    }

    /// Additive inverse: `-self mod p`.
    pub fn neg(&self) -> Self {
        let value = if self.value.is_zero() { BigUint::zero() } else { &*self.modulus - &self.value };
        Self { modulus: self.modulus.clone(), value }
    }

    /// Checked addition.
    pub fn checked_add(&self, other: &Self) -> Result<Self, FieldError> {
        self.check_same_field(other)?;
        let value = (&self.value + &other.value) % &*self.modulus;
        Ok(Self { modulus: self.modulus.clone(), value })
    }

    /// Checked subtraction.
    pub fn checked_sub(&self, other: &Self) -> Result<Self, FieldError> {
        self.check_same_field(other)?;
        Ok(self.checked_add(&other.neg())?)
    }

    /// Checked multiplication.
    pub fn checked_mul(&self, other: &Self) -> Result<Self, FieldError> {
        self.check_same_field(other)?;
        let value = (&self.value * &other.value) % &*self.modulus;
        Ok(Self { modulus: self.modulus.clone(), value })
    }

    /// Multiplicative inverse, computed via Fermat's little theorem since the modulus is prime:
    /// `self^(p - 2) mod p`.
    pub fn inv(&self) -> Result<Self, FieldError> {
        if self.is_zero() {
            return Err(FieldError::InvalidDivisor);
        }
        let exponent = &*self.modulus - BigUint::from(2u8);
        let value = self.value.modpow(&exponent, &self.modulus);
        Ok(Self { modulus: self.modulus.clone(), value })
    }

    /// Checked division: `self * other.inv()`.
    pub fn checked_div(&self, other: &Self) -> Result<Self, FieldError> {
        self.check_same_field(other)?;
        self.checked_mul(&other.inv()?)
    }

    /// Exponentiation. The exponent is itself a field element, interpreted as a non-negative
    /// integer (its value is used directly as the exponent, it is not itself reduced into the
    /// exponent group).
    pub fn checked_exp(&self, exponent: &Self) -> Result<Self, FieldError> {
        self.check_same_field(exponent)?;
        Ok(self.pow_bigint(&exponent.value))
    }

    /// Raises this element to an arbitrary non-negative integer exponent.
    ///
    /// Unlike [`FpElement::checked_exp`], the exponent is a plain [`BigUint`] rather than an
    /// [`FpElement`] of this same field: this is the primitive Pedersen commitments use, where
    /// the base lives in `Zp*` but the exponent is a share value living in `Zq`.
    pub fn pow_bigint(&self, exponent: &BigUint) -> Self {
        let value = self.value.modpow(exponent, &self.modulus);
        Self { modulus: self.modulus.clone(), value }
    }
}

impl PartialEq for FpElement {
    fn eq(&self, other: &Self) -> bool {
        self.modulus == other.modulus && self.value == other.value
    }
}

impl Eq for FpElement {}

impl Debug for FpElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FpElement({} mod {})", self.value, self.modulus)
    }
}

impl Display for FpElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.value, f)
    }
}

macro_rules! impl_op {
    ($trait:ident, $method:ident, $checked:ident) => {
        impl $trait for FpElement {
            type Output = FpElement;

            fn $method(self, rhs: FpElement) -> FpElement {
                self.$checked(&rhs).expect("field mismatch in operator use; use checked_* for fallible arithmetic")
            }
        }

        impl $trait<&FpElement> for &FpElement {
            type Output = FpElement;

            fn $method(self, rhs: &FpElement) -> FpElement {
                self.$checked(rhs).expect("field mismatch in operator use; use checked_* for fallible arithmetic")
            }
        }
    };
}

impl_op!(Add, add, checked_add);
impl_op!(Sub, sub, checked_sub);
impl_op!(Mul, mul, checked_mul);
impl_op!(Div, div, checked_div);

impl Neg for FpElement {
    type Output = FpElement;

    fn neg(self) -> FpElement {
        FpElement::neg(&self)
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::FpElement;
    use num_bigint::BigUint;
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};
    use std::sync::Arc;

    #[derive(Serialize, Deserialize)]
    struct Repr {
        value: BigUint,
        modulus: BigUint,
    }

    impl Serialize for FpElement {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            Repr { value: self.value.clone(), modulus: (*self.modulus).clone() }.serialize(serializer)
        }
    }

    impl<'de> Deserialize<'de> for FpElement {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let repr = Repr::deserialize(deserializer)?;
            FpElement::try_new(repr.value, Arc::new(repr.modulus)).map_err(D::Error::custom)
        }
    }
}

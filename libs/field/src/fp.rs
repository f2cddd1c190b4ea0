//! The field descriptor `Fp`: a modulus, asserted prime, under which [`FpElement`]s live.

use crate::{element::FpElement, errors::FieldError, primality::is_probably_prime};
use num_bigint::{BigUint, RandBigInt};
use rand::{CryptoRng, RngCore};
use std::sync::Arc;

/// A prime field descriptor.
///
/// Unlike a compile-time fixed prime, `Fp` carries its modulus as a runtime value: this VM's
/// programs can run over whatever field the caller provisions it with, so the modulus is checked
/// for primality once, at construction, rather than being baked into a type.
#[derive(Clone, Debug)]
pub struct Fp {
    modulus: Arc<BigUint>,
}

impl Fp {
    /// Constructs a field over the given modulus, rejecting it if it fails a probabilistic
    /// primality test.
    pub fn new(modulus: BigUint) -> Result<Self, FieldError> {
        if !is_probably_prime(&modulus) {
            return Err(FieldError::NonPrimeModulus);
        }
        Ok(Self { modulus: Arc::new(modulus) })
    }

    /// Constructs a field over a modulus already known to be prime.
    ///
    /// # Panics
    ///
    /// Panics if the modulus is not prime. Intended for call sites (tests, hardcoded constants)
    /// that already know the value is prime; a failure here is a programmer error, not a
    /// recoverable runtime condition.
    pub fn new_unchecked(modulus: BigUint) -> Self {
        Self::new(modulus).expect("modulus must be prime")
    }

    /// A small field over the prime 17, convenient for examples and tests.
    pub fn small() -> Self {
        Self::new_unchecked(BigUint::from(17u32))
    }

    /// The field over the 61-bit Mersenne prime `2^61 - 1`.
    pub fn mersenne61() -> Self {
        Self::new_unchecked((BigUint::from(1u64) << 61) - BigUint::from(1u8))
    }

    /// The modulus of this field.
    pub fn modulus(&self) -> &Arc<BigUint> {
        &self.modulus
    }

    /// Whether the given integer lies in `[0, p)`.
    pub fn contains(&self, value: &BigUint) -> bool {
        value < &self.modulus
    }

    /// Constructs an element from an arbitrary non-negative integer, reducing it into `[0, p)`.
    pub fn new_in_field(&self, value: BigUint) -> FpElement {
        FpElement::from_reduced(value, self.modulus.clone())
    }

    /// The zero element of this field.
    pub fn zero(&self) -> FpElement {
        FpElement::zero(self.modulus.clone())
    }

    /// The one element of this field.
    pub fn one(&self) -> FpElement {
        FpElement::one(self.modulus.clone())
    }

    /// Samples a uniformly random element using the thread's cryptographically secure RNG.
    pub fn random(&self) -> FpElement {
        self.random_with_rng(&mut rand::thread_rng())
    }

    /// Samples a uniformly random element using the given RNG.
    pub fn random_with_rng<R: RngCore + CryptoRng>(&self, rng: &mut R) -> FpElement {
        let value = rng.gen_biguint_below(&self.modulus);
        FpElement::from_reduced(value, self.modulus.clone())
    }
}

impl PartialEq for Fp {
    fn eq(&self, other: &Self) -> bool {
        self.modulus == other.modulus
    }
}

impl Eq for Fp {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(17u32)]
    #[case(2147483647u32)]
    fn accepts_prime_modulus(#[case] modulus: u32) {
        assert!(Fp::new(BigUint::from(modulus)).is_ok());
    }

    #[rstest]
    #[case(15u32)]
    #[case(1u32)]
    fn rejects_composite_modulus(#[case] modulus: u32) {
        assert!(matches!(Fp::new(BigUint::from(modulus)), Err(FieldError::NonPrimeModulus)));
    }

    #[test]
    fn random_element_is_in_range() {
        let field = Fp::small();
        for _ in 0..50 {
            let element = field.random();
            assert!(field.contains(element.value()));
        }
    }

    #[test]
    fn contains_rejects_out_of_range() {
        let field = Fp::small();
        assert!(!field.contains(&BigUint::from(17u32)));
        assert!(field.contains(&BigUint::from(16u32)));
    }
}

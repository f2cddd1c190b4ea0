//! Pedersen commitment parameters: a safe-prime group and two generators of unknown relative
//! discrete log.

use field::{Fp, FpElement};
use log::debug;
use num_bigint::{BigUint, RandBigInt};
use num_traits::One;
use rand::{CryptoRng, RngCore};
use std::sync::Arc;

/// The parameters of a Pedersen commitment scheme: a safe prime `p = 2q + 1`, and two generators
/// `g`, `h` of the order-`q` subgroup of `Zp*` with an unknown discrete-log relation to each
/// other.
#[derive(Clone, Debug)]
pub struct PedersenParams {
    group: Fp,
    order: Arc<BigUint>,
    g: FpElement,
    h: FpElement,
}

impl PedersenParams {
    /// Generates fresh parameters with a safe prime of approximately `bits` bits.
    ///
    /// This samples random candidates and is not intended for use on every commitment: callers
    /// should generate parameters once and share them across all commitments in a session.
    pub fn generate(bits: u64) -> Self {
        Self::generate_with_rng(&mut rand::thread_rng(), bits)
    }

    /// Same as [`PedersenParams::generate`] but with an explicit RNG, for deterministic tests.
    pub fn generate_with_rng<R: RngCore + CryptoRng>(rng: &mut R, bits: u64) -> Self {
        let (group, order) = Self::find_safe_prime_group(rng, bits);
        let g = Self::random_generator(&group, &order, rng);
        let h = Self::random_generator(&group, &order, rng);
        debug!("generated pedersen parameters with a {}-bit safe prime", group.modulus().bits());
        Self { group, order: Arc::new(order), g, h }
    }

    /// Finds a safe prime `p = 2q + 1` (`q` also prime) of roughly `bits` bits, returning the
    /// field `Fp` and the subgroup order `q`.
    fn find_safe_prime_group<R: RngCore + CryptoRng>(rng: &mut R, bits: u64) -> (Fp, BigUint) {
        loop {
            let mut candidate = rng.gen_biguint(bits.saturating_sub(1));
            candidate.set_bit(bits.saturating_sub(2), true);
            candidate.set_bit(0, true);
            if !field::is_probably_prime(&candidate) {
                continue;
            }
            let p = &candidate * BigUint::from(2u8) + BigUint::one();
            if field::is_probably_prime(&p) {
                return (Fp::new_unchecked(p), candidate);
            }
        }
    }

    /// Picks a random generator of the order-`q` subgroup of `Zp*` by squaring a random element
    /// of `Zp*`: since `|Zp*| = 2q` and `q` is prime, any non-identity square has order exactly
    /// `q`.
    fn random_generator<R: RngCore + CryptoRng>(group: &Fp, order: &BigUint, rng: &mut R) -> FpElement {
        loop {
            let candidate = group.random_with_rng(rng);
            if candidate.is_zero() {
                continue;
            }
            let generator = candidate.pow_bigint(&BigUint::from(2u8));
            if generator.value() != &BigUint::one() {
                debug_assert_eq!(generator.pow_bigint(order).value(), &BigUint::one());
                return generator;
            }
        }
    }

    /// Builds parameters directly from already-known values, e.g. standardized parameters
    /// recovered from a trusted setup. No primality or generator checks are performed; callers
    /// must ensure `p = 2q + 1` is a safe prime and `g`, `h` generate the order-`q` subgroup.
    pub fn from_parts(group: Fp, order: Arc<BigUint>, g: FpElement, h: FpElement) -> Self {
        Self { group, order, g, h }
    }

    /// The group `Zp*` commitments live in.
    pub fn group(&self) -> &Fp {
        &self.group
    }

    /// The order `q` of the subgroup generated by `g` and `h`; exponents (share values) live in
    /// `Zq`.
    pub fn exponent_field(&self) -> Fp {
        Fp::new_unchecked((*self.order).clone())
    }

    /// The first generator.
    pub fn g(&self) -> &FpElement {
        &self.g
    }

    /// The second generator.
    pub fn h(&self) -> &FpElement {
        &self.h
    }

    /// Computes `commit(s, t) = g^s * h^t mod p`.
    pub fn commit(&self, s: &FpElement, t: &FpElement) -> FpElement {
        let gs = self.g.pow_bigint(s.value());
        let ht = self.h.pow_bigint(t.value());
        &gs * &ht
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn test_params() -> PedersenParams {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        PedersenParams::generate_with_rng(&mut rng, 64)
    }

    #[test]
    fn commit_is_deterministic_given_same_inputs() {
        let params = test_params();
        let exponents = params.exponent_field();
        let s = exponents.new_in_field(BigUint::from(3u32));
        let t = exponents.new_in_field(BigUint::from(4u32));
        assert_eq!(params.commit(&s, &t), params.commit(&s, &t));
    }

    #[test]
    fn commit_changes_with_either_input() {
        let params = test_params();
        let exponents = params.exponent_field();
        let s = exponents.new_in_field(BigUint::from(3u32));
        let t = exponents.new_in_field(BigUint::from(4u32));
        let s2 = exponents.new_in_field(BigUint::from(5u32));
        assert_ne!(params.commit(&s, &t), params.commit(&s2, &t));
    }

    #[test]
    fn generators_have_order_q() {
        let params = test_params();
        assert_eq!(params.g().pow_bigint(params.exponent_field().modulus()).value(), &BigUint::from(1u32));
        assert_eq!(params.h().pow_bigint(params.exponent_field().modulus()).value(), &BigUint::from(1u32));
    }
}

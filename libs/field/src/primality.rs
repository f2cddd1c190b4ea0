//! A probabilistic (Miller-Rabin) primality test over [`BigUint`]s.

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::One;
use rand::{CryptoRng, RngCore};

/// Number of Miller-Rabin rounds used by [`is_probably_prime`]. Each round halves the
/// probability of a composite number being misclassified as prime; 40 rounds gives a false
/// positive probability below 2^-80, comfortably adequate for the field moduli this VM operates
/// over.
const MILLER_RABIN_ROUNDS: u32 = 40;

/// Tests whether `candidate` is probably prime using the Miller-Rabin test.
pub fn is_probably_prime(candidate: &BigUint) -> bool {
    is_probably_prime_with_rng(candidate, &mut rand::thread_rng())
}

/// Same as [`is_probably_prime`] but with an explicit RNG, for determinism in tests.
pub fn is_probably_prime_with_rng<R: RngCore + CryptoRng>(candidate: &BigUint, rng: &mut R) -> bool {
    let one = BigUint::one();
    let two = &one + &one;

    if candidate < &two {
        return false;
    }
    if candidate == &two || candidate == &BigUint::from(3u8) {
        return true;
    }
    if candidate.is_even() {
        return false;
    }

    // Write candidate - 1 = d * 2^r with d odd.
    let candidate_minus_one = candidate - &one;
    let mut d = candidate_minus_one.clone();
    let mut r = 0u32;
    while d.is_even() {
        d >>= 1u32;
        r += 1;
    }

    'witness: for _ in 0..MILLER_RABIN_ROUNDS {
        // a in [2, candidate - 2]
        let a = rng.gen_biguint_range(&two, &candidate_minus_one);
        let mut x = a.modpow(&d, candidate);
        if x == one || x == candidate_minus_one {
            continue;
        }
        for _ in 0..r.saturating_sub(1) {
            x = x.modpow(&two, candidate);
            if x == candidate_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2u32)]
    #[case(3u32)]
    #[case(17u32)]
    #[case(2147483647u32)]
    fn detects_primes(#[case] value: u32) {
        assert!(is_probably_prime(&BigUint::from(value)));
    }

    #[rstest]
    #[case(0u32)]
    #[case(1u32)]
    #[case(4u32)]
    #[case(15u32)]
    #[case(9973u32 * 2u32)]
    fn detects_composites(#[case] value: u32) {
        assert!(!is_probably_prime(&BigUint::from(value)));
    }
}

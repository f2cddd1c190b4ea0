//! Splitting secrets into Shamir shares and reconstructing them via Lagrange interpolation.

use crate::{errors::ShamirError, share::Share};
use field::{FpElement, Polynomial};
use log::trace;
use num_bigint::BigUint;

/// Evaluates `poly` at indices `1..=n`, returning one share per participant.
///
/// Fails with [`ShamirError::InsufficientParticipants`] if `n <= poly.degree()`, since fewer
/// than `degree + 1` shares can never reconstruct the secret.
pub fn split(poly: &Polynomial, n: u64) -> Result<Vec<Share>, ShamirError> {
    let degree = poly.degree();
    if n <= degree {
        return Err(ShamirError::InsufficientParticipants { n, degree });
    }
    trace!("splitting polynomial of degree {degree} into {n} shares");
    let modulus = poly.coefficients()[0].modulus().clone();
    (1..=n)
        .map(|index| {
            let x = FpElement::from_reduced(BigUint::from(index), modulus.clone());
            let value = poly.evaluate(&x).expect("x shares poly's field by construction");
            Share::new(index, value)
        })
        .collect()
}

/// Reconstructs the secret `poly(0)` behind a set of shares via Lagrange interpolation at `x =
/// 0`.
///
/// The caller is responsible for providing at least `degree + 1` *consistent* shares (shares
/// that lie on a single polynomial of the expected degree); given fewer, this returns
/// [`ShamirError::InsufficientShares`], but given shares that are merely inconsistent with each
/// other (e.g. some were tampered with) this has no way to detect it and silently returns a
/// value that is not the intended secret — consistency is the MPC protocol layer's
/// responsibility, not this function's.
pub fn join(shares: &[Share]) -> Result<FpElement, ShamirError> {
    let first = shares.first().ok_or(ShamirError::NoShares)?;
    for share in &shares[1..] {
        if share.value().check_same_field(first.value()).is_err() {
            return Err(ShamirError::FieldMismatch);
        }
    }
    trace!("reconstructing secret from {} shares", shares.len());

    let modulus = first.value().modulus().clone();
    let mut secret = FpElement::zero(modulus.clone());
    for (i, share_i) in shares.iter().enumerate() {
        let xi = FpElement::from_reduced(BigUint::from(share_i.index()), modulus.clone());
        let mut numerator = FpElement::one(modulus.clone());
        let mut denominator = FpElement::one(modulus.clone());
        for (j, share_j) in shares.iter().enumerate() {
            if i == j {
                continue;
            }
            let xj = FpElement::from_reduced(BigUint::from(share_j.index()), modulus.clone());
            // numerator *= (0 - xj) = -xj
            numerator = &numerator * &xj.neg();
            // denominator *= (xi - xj)
            denominator = &denominator * &(&xi - &xj);
        }
        let coefficient = numerator.checked_div(&denominator).map_err(|_| ShamirError::FieldMismatch)?;
        secret = &secret + &(&coefficient * share_i.value());
    }
    Ok(secret)
}

/// Minimum number of shares required to reconstruct a secret hidden behind a degree-`degree`
/// polynomial.
pub fn min_shares_for_degree(degree: u64) -> usize {
    degree as usize + 1
}

/// Like [`join`] but checks up front that at least `degree + 1` shares were provided.
pub fn join_with_degree(shares: &[Share], degree: u64) -> Result<FpElement, ShamirError> {
    let required = min_shares_for_degree(degree);
    if shares.len() < required {
        return Err(ShamirError::InsufficientShares { required, got: shares.len() });
    }
    join(shares)
}

#[cfg(test)]
mod tests {
    use super::*;
    use field::Fp;
    use num_bigint::BigUint;
    use rstest::rstest;

    #[rstest]
    #[case(3, 5)]
    #[case(1, 2)]
    #[case(5, 9)]
    fn split_and_join_recovers_secret(#[case] degree: u64, #[case] n: u64) {
        let field = Fp::mersenne61();
        let secret = field.new_in_field(BigUint::from(12345u32));
        let poly = Polynomial::random(&field, degree, Some(secret.clone()));
        let shares = split(&poly, n).unwrap();
        assert_eq!(shares.len(), n as usize);

        let recovered = join_with_degree(&shares[..(degree as usize + 1)], degree).unwrap();
        assert_eq!(recovered, secret);
    }

    #[test]
    fn split_rejects_too_few_participants() {
        let field = Fp::small();
        let poly = Polynomial::random(&field, 3, None);
        assert!(matches!(split(&poly, 3), Err(ShamirError::InsufficientParticipants { .. })));
    }

    #[test]
    fn join_rejects_too_few_shares() {
        let field = Fp::small();
        let poly = Polynomial::random(&field, 4, None);
        let shares = split(&poly, 10).unwrap();
        assert!(matches!(join_with_degree(&shares[..3], 4), Err(ShamirError::InsufficientShares { .. })));
    }

    #[test]
    fn homomorphic_addition_of_shares() {
        let field = Fp::mersenne61();
        let a = field.new_in_field(BigUint::from(5u32));
        let b = field.new_in_field(BigUint::from(9u32));
        let poly_a = Polynomial::random(&field, 2, Some(a.clone()));
        let poly_b = Polynomial::random(&field, 2, Some(b.clone()));
        let shares_a = split(&poly_a, 5).unwrap();
        let shares_b = split(&poly_b, 5).unwrap();

        let summed: Vec<Share> =
            shares_a.iter().zip(shares_b.iter()).map(|(sa, sb)| sa.checked_add(sb).unwrap()).collect();
        let recovered = join_with_degree(&summed, 2).unwrap();
        assert_eq!(recovered, a.checked_add(&b).unwrap());
    }
}

//! Verifiable secret shares: a Shamir share paired with Pedersen commitments that let any
//! holder check its correctness without learning any other share.

use crate::{errors::PedersenError, params::PedersenParams};
use field::{FpElement, Polynomial};
use num_bigint::BigUint;
use num_traits::One;
use shamir_sharing::{self as shamir, Share};

/// A Shamir share of a secret, together with the public commitments that let its holder — or
/// anyone else with the commitments — verify it is a genuine share of *some* secret without
/// learning the secret or any other participant's share.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VShare {
    commitments: Vec<FpElement>,
    s_share: Share,
    t_share: Share,
}

impl VShare {
    /// Deals a secret into `n` verifiable shares with reconstruction threshold `k`.
    ///
    /// Samples two independent random degree-`(k - 1)` polynomials `f`, `g` with `f(0) =
    /// secret`, commits to their coefficients pairwise, and evaluates both at `1..=n` to produce
    /// each participant's `(sShare, tShare)` pair.
    pub fn deal(params: &PedersenParams, secret: &FpElement, n: u64, k: u64) -> Result<Vec<VShare>, PedersenError> {
        let exponents = params.exponent_field();
        let degree = k.saturating_sub(1);
        let f = Polynomial::random(&exponents, degree, Some(secret.clone()));
        let g = Polynomial::random(&exponents, degree, None);

        let commitments: Vec<FpElement> =
            f.coefficients().iter().zip(g.coefficients()).map(|(fi, gi)| params.commit(fi, gi)).collect();

        let s_shares = shamir::split(&f, n)?;
        let t_shares = shamir::split(&g, n)?;

        Ok(s_shares
            .into_iter()
            .zip(t_shares)
            .map(|(s_share, t_share)| VShare { commitments: commitments.clone(), s_share, t_share })
            .collect())
    }

    /// The public commitments to the dealer's polynomial coefficients.
    pub fn commitments(&self) -> &[FpElement] {
        &self.commitments
    }

    /// This share's secret-polynomial evaluation.
    pub fn s_share(&self) -> &Share {
        &self.s_share
    }

    /// This share's blinding-polynomial evaluation.
    pub fn t_share(&self) -> &Share {
        &self.t_share
    }

    /// Checks that `commit(sShare.value, tShare.value) == prod_j commitments[j]^(index^j)`.
    pub fn verify(&self, params: &PedersenParams) -> bool {
        let index = BigUint::from(self.s_share.index());
        let mut expected = FpElement::one(params.group().modulus().clone());
        let mut power = BigUint::one();
        for commitment in &self.commitments {
            expected = &expected * &commitment.pow_bigint(&power);
            power *= &index;
        }
        let actual = params.commit(self.s_share.value(), self.t_share.value());
        actual == expected
    }

    /// Same as [`VShare::verify`] but returns a [`PedersenError`] instead of a bare `bool`, for
    /// call sites that want to propagate the failure with `?`.
    pub fn verify_checked(&self, params: &PedersenParams) -> Result<(), PedersenError> {
        if self.verify(params) { Ok(()) } else { Err(PedersenError::Verification) }
    }

    /// Combines two verifiable shares of (generally different) secrets into a verifiable share
    /// of their sum: commitments are combined pointwise by multiplication (since the exponents
    /// they hide add), and the underlying Shamir shares are added directly. The result still
    /// verifies against the combined commitments.
    pub fn checked_add(&self, other: &Self) -> Result<Self, PedersenError> {
        if self.commitments.len() != other.commitments.len() {
            return Err(PedersenError::CommitmentLengthMismatch(self.commitments.len(), other.commitments.len()));
        }
        let commitments =
            self.commitments.iter().zip(&other.commitments).map(|(a, b)| a * b).collect();
        let s_share = self.s_share.checked_add(&other.s_share)?;
        let t_share = self.t_share.checked_add(&other.t_share)?;
        Ok(Self { commitments, s_share, t_share })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn test_params() -> PedersenParams {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        PedersenParams::generate_with_rng(&mut rng, 64)
    }

    #[test]
    fn honestly_dealt_shares_verify() {
        let params = test_params();
        let secret = params.exponent_field().new_in_field(BigUint::from(77u32));
        let shares = VShare::deal(&params, &secret, 5, 3).unwrap();
        assert_eq!(shares.len(), 5);
        for share in &shares {
            assert!(share.verify(&params));
        }
    }

    #[test]
    fn tampering_with_s_share_breaks_verification() {
        let params = test_params();
        let secret = params.exponent_field().new_in_field(BigUint::from(77u32));
        let mut shares = VShare::deal(&params, &secret, 5, 3).unwrap();
        let bumped = shares[0].s_share.value().checked_add(&params.exponent_field().one()).unwrap();
        shares[0].s_share = Share::new(shares[0].s_share.index(), bumped).unwrap();
        assert!(!shares[0].verify(&params));
    }

    #[test]
    fn tampering_with_a_commitment_breaks_verification() {
        let params = test_params();
        let secret = params.exponent_field().new_in_field(BigUint::from(77u32));
        let mut shares = VShare::deal(&params, &secret, 5, 3).unwrap();
        shares[0].commitments[0] = shares[0].commitments[0].checked_add(&params.g().clone()).unwrap();
        assert!(!shares[0].verify(&params));
    }

    #[test]
    fn sum_of_verifiable_shares_still_verifies() {
        let params = test_params();
        let exponents = params.exponent_field();
        let secret_a = exponents.new_in_field(BigUint::from(3u32));
        let secret_b = exponents.new_in_field(BigUint::from(4u32));
        let shares_a = VShare::deal(&params, &secret_a, 5, 3).unwrap();
        let shares_b = VShare::deal(&params, &secret_b, 5, 3).unwrap();

        for (a, b) in shares_a.iter().zip(&shares_b) {
            let summed = a.checked_add(b).unwrap();
            assert!(summed.verify(&params));
        }
    }
}

//! Polynomials over a prime field.

use crate::{element::FpElement, errors::FieldError, fp::Fp};
use rand::{CryptoRng, RngCore};

/// A polynomial over `Fp`, stored as an ordered, nonempty list of coefficients where index `i`
/// is the coefficient of `x^i`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Polynomial {
    coefficients: Vec<FpElement>,
}

impl Polynomial {
    /// Constructs a polynomial from its coefficients, lowest degree first.
    ///
    /// # Panics
    ///
    /// Panics if `coefficients` is empty or its elements do not all share the same field.
    pub fn new(coefficients: Vec<FpElement>) -> Self {
        assert!(!coefficients.is_empty(), "a polynomial must have at least one coefficient");
        for pair in coefficients.windows(2) {
            pair[0].check_same_field(&pair[1]).expect("polynomial coefficients must share a field");
        }
        Self { coefficients }
    }

    /// Samples a uniformly random polynomial of exactly the given degree. If `secret` is
    /// provided, coefficient 0 is fixed to it instead of being sampled.
    pub fn random(field: &Fp, degree: u64, secret: Option<FpElement>) -> Self {
        Self::random_with_rng(field, degree, secret, &mut rand::thread_rng())
    }

    /// Same as [`Polynomial::random`] but with an explicit RNG.
    ///
    /// Resamples the leading coefficient until it is nonzero so the result's true degree (per
    /// [`Polynomial::degree`]) is exactly `degree`, not merely bounded by it — a random draw of
    /// zero for the top coefficient would otherwise silently produce a lower-degree polynomial.
    pub fn random_with_rng<R: RngCore + CryptoRng>(
        field: &Fp,
        degree: u64,
        secret: Option<FpElement>,
        rng: &mut R,
    ) -> Self {
        let degree = degree as usize;
        let mut coefficients = Vec::with_capacity(degree + 1);
        coefficients.push(secret.unwrap_or_else(|| field.random_with_rng(rng)));
        for _ in 0..degree {
            coefficients.push(field.random_with_rng(rng));
        }
        if degree > 0 {
            while coefficients[degree].is_zero() {
                coefficients[degree] = field.random_with_rng(rng);
            }
        }
        Self { coefficients }
    }

    /// The degree of the polynomial, ignoring trailing zero coefficients. The zero polynomial
    /// (every coefficient zero) has degree 0.
    pub fn degree(&self) -> u64 {
        let trailing_zeros =
            self.coefficients.iter().rev().take_while(|c| c.is_zero()).count().min(self.coefficients.len() - 1);
        (self.coefficients.len() - 1 - trailing_zeros) as u64
    }

    /// The polynomial's coefficients, lowest degree first.
    pub fn coefficients(&self) -> &[FpElement] {
        &self.coefficients
    }

    /// Evaluates the polynomial at `x` using Horner's rule.
    pub fn evaluate(&self, x: &FpElement) -> Result<FpElement, FieldError> {
        let mut iter = self.coefficients.iter().rev();
        let mut acc = iter.next().expect("non-empty by construction").clone();
        for coefficient in iter {
            acc = acc.checked_mul(x)?.checked_add(coefficient)?;
        }
        Ok(acc)
    }
}

//! Errors for field arithmetic.

/// An error during field element construction or arithmetic.
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    /// Arithmetic was attempted between elements (or shares, or polynomials) defined over
    /// different fields.
    #[error("field mismatch")]
    FieldMismatch,

    /// Division or inversion was attempted on the zero element.
    #[error("invalid divisor: division by zero")]
    InvalidDivisor,

    /// A candidate modulus failed the probabilistic primality test.
    #[error("modulus is not prime")]
    NonPrimeModulus,

    /// A value passed to a strict constructor was outside of `[0, p)`.
    #[error("value is out of range for this field")]
    OutOfRange,
}

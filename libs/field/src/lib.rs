//! Prime field arithmetic: field elements, the field descriptor, and polynomials over a field.
//!
//! This is the algebra layer the rest of the workspace is built on: shares, commitments, and the
//! VM's runtime values are all defined in terms of [`FpElement`] and [`Fp`].

mod element;
mod errors;
mod fp;
mod polynomial;
mod primality;

pub use element::FpElement;
pub use errors::FieldError;
pub use fp::Fp;
pub use polynomial::Polynomial;
pub use primality::is_probably_prime;

//! Pedersen commitments and verifiable Shamir shares built on top of [`field`] and
//! [`shamir_sharing`].

mod errors;
mod params;
mod vshare;

pub use errors::PedersenError;
pub use params::PedersenParams;
pub use vshare::VShare;

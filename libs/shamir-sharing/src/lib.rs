//! Shamir secret sharing over [`field::Fp`].

mod errors;
mod shamir;
mod share;

pub use errors::ShamirError;
pub use shamir::{join, join_with_degree, min_shares_for_degree, split};
pub use share::Share;

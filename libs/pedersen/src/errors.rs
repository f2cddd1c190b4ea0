//! Errors for Pedersen commitments and verifiable shares.

/// An error during Pedersen parameter generation or verifiable-share handling.
#[derive(Debug, thiserror::Error)]
pub enum PedersenError {
    /// A verifiable share failed its commitment check.
    #[error("verifiable share failed verification")]
    Verification,

    /// Arithmetic was attempted between verifiable shares with a mismatched number of
    /// commitments (i.e. different thresholds).
    #[error("commitment vector length mismatch: {0} vs {1}")]
    CommitmentLengthMismatch(usize, usize),

    /// The underlying Shamir share arithmetic failed.
    #[error(transparent)]
    Shamir(#[from] shamir_sharing::ShamirError),
}

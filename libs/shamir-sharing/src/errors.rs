//! Errors for Shamir secret sharing.

/// An error during share construction, arithmetic, splitting or joining.
#[derive(Debug, thiserror::Error)]
pub enum ShamirError {
    /// Arithmetic was attempted between shares defined over different fields.
    #[error("field mismatch")]
    FieldMismatch,

    /// Arithmetic was attempted between shares held by different participants.
    #[error("share index mismatch")]
    IndexMismatch,

    /// Index 0 identifies the secret itself, not a participant, and is rejected wherever a
    /// participant index is expected.
    #[error("index 0 is reserved for the secret and is not a valid share index")]
    ZeroIndex,

    /// `Split` was asked to produce `n` shares for a polynomial of degree `>= n` (reconstruction
    /// would be impossible).
    #[error("cannot split into {n} shares a polynomial of degree {degree} (n must exceed degree)")]
    InsufficientParticipants {
        /// The requested number of shares.
        n: u64,
        /// The polynomial's degree.
        degree: u64,
    },

    /// `Join` was given fewer shares than the degree of the underlying polynomial requires.
    #[error("need at least {required} shares to reconstruct, got {got}")]
    InsufficientShares {
        /// The minimum number of shares required.
        required: usize,
        /// The number of shares actually provided.
        got: usize,
    },

    /// `Join` was given no shares at all.
    #[error("cannot reconstruct a secret from zero shares")]
    NoShares,
}

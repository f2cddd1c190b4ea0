//! Intents: descriptions of external work the engine asks the protocol layer to perform.

use crate::{errors::ExecError, value::Value};
use field::FpElement;
use shamir_sharing::Share;
use tokio::sync::oneshot;

/// A stable identifier correlating an [`Intent`] with the instruction that raised it.
///
/// Derived from the owning process's id concatenated with the little-endian program counter, so
/// it is deterministic across replays of the same program against the same sequence of channel
/// deliveries.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntentId([u8; 40]);

impl IntentId {
    pub(crate) fn new(process_id: [u8; 32], pc: u64) -> Self {
        let mut bytes = [0u8; 40];
        bytes[..32].copy_from_slice(&process_id);
        bytes[32..].copy_from_slice(&pc.to_le_bytes());
        Self(bytes)
    }

    /// The raw correlator bytes: the owning process id followed by the little-endian PC.
    pub fn as_bytes(&self) -> &[u8; 40] {
        &self.0
    }
}

impl std::fmt::Debug for IntentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IntentId({})", hex_encode(&self.0))
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// A description of external work the protocol layer must perform in order for a suspended
/// instruction to resume.
///
/// Each variant (other than [`Intent::Await`], [`Intent::Exit`] and [`Intent::Error`]) carries the
/// write-end of the one-shot channel the engine will poll on the instruction's next visit.
pub enum Intent {
    /// Requests `batch` independent private random shares.
    GenRn {
        /// This intent's correlator.
        iid: IntentId,
        /// Number of random shares requested.
        batch: usize,
        /// Write-end the protocol layer delivers the shares on.
        reply: oneshot::Sender<Vec<Share>>,
    },

    /// Requests `batch` independent private random shares of zero.
    GenRnZero {
        /// This intent's correlator.
        iid: IntentId,
        /// Number of random shares requested.
        batch: usize,
        /// Write-end the protocol layer delivers the shares on.
        reply: oneshot::Sender<Vec<Share>>,
    },

    /// Requests `batch` independent `(rho, sigma)` random tuples suitable for one multiplication
    /// each.
    GenRnTuple {
        /// This intent's correlator.
        iid: IntentId,
        /// Number of tuples requested.
        batch: usize,
        /// Write-end for the `rho` shares, at degree `t`.
        rhos: oneshot::Sender<Vec<Share>>,
        /// Write-end for the `sigma` shares, at degree `2t`.
        sigmas: oneshot::Sender<Vec<Share>>,
    },

    /// Requests shares of the pointwise product `xs[i] * ys[i]`, using the given random tuples to
    /// locally multiply-then-degree-reduce.
    Multiply {
        /// This intent's correlator.
        iid: IntentId,
        /// Left operands.
        xs: Vec<Share>,
        /// Right operands.
        ys: Vec<Share>,
        /// `rho` shares from a prior [`Intent::GenRnTuple`].
        rhos: Vec<Share>,
        /// `sigma` shares from a prior [`Intent::GenRnTuple`].
        sigmas: Vec<Share>,
        /// Write-end the protocol layer delivers the product shares on.
        reply: oneshot::Sender<Vec<Share>>,
    },

    /// Requests reconstruction of the cleartext value behind a private share.
    Open {
        /// This intent's correlator.
        iid: IntentId,
        /// The share to reconstruct.
        share: Share,
        /// Write-end the protocol layer delivers the opened value on.
        reply: oneshot::Sender<FpElement>,
    },

    /// An aggregate of the above, fireable by the protocol layer in parallel; emitted once for the
    /// entire interior of an `Async`/`Await` block that could not complete in one pass.
    Await {
        /// This intent's correlator, derived from the PC of the enclosing `Async` marker.
        iid: IntentId,
        /// The still-outstanding intents inside the block.
        intents: Vec<Intent>,
    },

    /// Terminal: the program has finished and these are its reported output values.
    Exit {
        /// This intent's correlator.
        iid: IntentId,
        /// The values named by the terminating `Exit` instruction.
        values: Vec<Value>,
    },

    /// Fatal: the engine cannot proceed past `pc`.
    Error {
        /// This intent's correlator.
        iid: IntentId,
        /// The underlying failure.
        error: ExecError,
    },
}

impl std::fmt::Debug for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intent::GenRn { iid, batch, .. } => f.debug_struct("GenRn").field("iid", iid).field("batch", batch).finish(),
            Intent::GenRnZero { iid, batch, .. } => {
                f.debug_struct("GenRnZero").field("iid", iid).field("batch", batch).finish()
            }
            Intent::GenRnTuple { iid, batch, .. } => {
                f.debug_struct("GenRnTuple").field("iid", iid).field("batch", batch).finish()
            }
            Intent::Multiply { iid, xs, .. } => f.debug_struct("Multiply").field("iid", iid).field("batch", &xs.len()).finish(),
            Intent::Open { iid, .. } => f.debug_struct("Open").field("iid", iid).finish(),
            Intent::Await { iid, intents } => {
                f.debug_struct("Await").field("iid", iid).field("outstanding", &intents.len()).finish()
            }
            Intent::Exit { iid, values } => f.debug_struct("Exit").field("iid", iid).field("values", &values.len()).finish(),
            Intent::Error { iid, error } => f.debug_struct("Error").field("iid", iid).field("error", error).finish(),
        }
    }
}

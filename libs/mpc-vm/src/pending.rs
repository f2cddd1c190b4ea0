//! Per-instruction pending state for asynchronous instructions.
//!
//! Kept in a side table on [`crate::process::Process`] indexed by PC rather than inside `Code`
//! itself: this keeps `Code` immutable once constructed and avoids threading interior mutability
//! through every instruction variant.

use field::FpElement;
use shamir_sharing::Share;
use tokio::sync::oneshot;

/// The state of a single outstanding one-shot delivery: either still waiting on the channel, or
/// holding the consumed result.
///
/// The channel is allocated exactly once, on an instruction's first visit; once a result has been
/// consumed it is immutable and the instruction always finds it here on replay instead of polling
/// the channel again.
pub(crate) enum AsyncSlot<T> {
    Waiting(oneshot::Receiver<T>),
    Consumed(T),
}

impl<T> AsyncSlot<T> {
    fn new(receiver: oneshot::Receiver<T>) -> Self {
        Self::Waiting(receiver)
    }

    /// Non-blocking poll. Returns `Some(result)` once the value has been delivered (consuming it
    /// on the first call that finds it and caching it for every subsequent call); `None` if
    /// nothing has arrived yet. A closed channel with no prior send is treated the same as empty:
    /// cancellation is the protocol layer's responsibility, not an in-core error.
    fn poll(&mut self) -> Option<&T> {
        if let Self::Waiting(receiver) = self {
            match receiver.try_recv() {
                Ok(value) => *self = Self::Consumed(value),
                Err(_) => return None,
            }
        }
        match self {
            Self::Consumed(value) => Some(value),
            Self::Waiting(_) => None,
        }
    }
}

/// The two legs of a `MulOpen` instruction: it first awaits the product share from a `Multiply`
/// intent, then awaits the opened cleartext from a following `Open` intent — the only
/// asynchronous instruction that spans two distinct channel deliveries.
pub(crate) enum MulOpenSlot {
    AwaitingProduct(oneshot::Receiver<Share>),
    /// The product arrived but the caller has not yet raised the `Open` leg for it (momentary:
    /// cleared within the same call that observes it via [`PendingState::poll_mul_open`]).
    ProductReceived(Share),
    AwaitingOpen(oneshot::Receiver<FpElement>),
    Done(FpElement),
}

/// What [`PendingState::poll_mul_open`] found, and what the caller must do about it.
pub(crate) enum MulOpenPoll<'a> {
    /// Neither leg has anything new to report.
    Stall,
    /// The product leg just delivered; the caller must now raise an `Open` intent for `share` and
    /// hand the resulting receiver to [`PendingState::set_mul_open_awaiting_open`] before this
    /// instruction is visited again.
    ProductReady(Share),
    /// Both legs have delivered.
    Done(&'a FpElement),
}

/// `GenerateRnTuple` delivers its `rho` and `sigma` batches on two independent channels; this
/// resolves only once both have arrived.
pub(crate) struct TupleSlot {
    rhos: AsyncSlot<Vec<Share>>,
    sigmas: AsyncSlot<Vec<Share>>,
}

impl TupleSlot {
    fn new(rhos: oneshot::Receiver<Vec<Share>>, sigmas: oneshot::Receiver<Vec<Share>>) -> Self {
        Self { rhos: AsyncSlot::new(rhos), sigmas: AsyncSlot::new(sigmas) }
    }

    fn poll(&mut self) -> Option<(&Vec<Share>, &Vec<Share>)> {
        // Poll both every time so each side caches its result as soon as it arrives, even if the
        // other side isn't ready yet.
        let rhos_ready = self.rhos.poll().is_some();
        let sigmas_ready = self.sigmas.poll().is_some();
        if rhos_ready && sigmas_ready {
            let Self { rhos, sigmas } = self;
            Some((rhos.poll().expect("just observed ready"), sigmas.poll().expect("just observed ready")))
        } else {
            None
        }
    }
}

/// Pending state for one asynchronous instruction, keyed by PC in [`crate::process::Process`].
pub(crate) enum PendingState {
    /// `GenerateRn` / `GenerateRnZero`: a batch of random shares.
    Shares(AsyncSlot<Vec<Share>>),
    /// `GenerateRnTuple`: a batch of `(rho, sigma)` pairs, see [`TupleSlot`].
    Tuple(TupleSlot),
    /// `Mul`: a batch of product shares.
    Product(AsyncSlot<Vec<Share>>),
    /// `Open`: a single opened cleartext value.
    Opened(AsyncSlot<FpElement>),
    /// `MulOpen`: see [`MulOpenSlot`].
    MulOpen(MulOpenSlot),
}

impl PendingState {
    pub(crate) fn shares(receiver: oneshot::Receiver<Vec<Share>>) -> Self {
        Self::Shares(AsyncSlot::new(receiver))
    }

    pub(crate) fn tuple(rhos: oneshot::Receiver<Vec<Share>>, sigmas: oneshot::Receiver<Vec<Share>>) -> Self {
        Self::Tuple(TupleSlot::new(rhos, sigmas))
    }

    pub(crate) fn product(receiver: oneshot::Receiver<Vec<Share>>) -> Self {
        Self::Product(AsyncSlot::new(receiver))
    }

    pub(crate) fn opened(receiver: oneshot::Receiver<FpElement>) -> Self {
        Self::Opened(AsyncSlot::new(receiver))
    }

    pub(crate) fn mul_open_awaiting_product(receiver: oneshot::Receiver<Share>) -> Self {
        Self::MulOpen(MulOpenSlot::AwaitingProduct(receiver))
    }

    pub(crate) fn poll_shares(&mut self) -> Option<&Vec<Share>> {
        match self {
            Self::Shares(slot) => slot.poll(),
            _ => None,
        }
    }

    pub(crate) fn poll_tuple(&mut self) -> Option<(&Vec<Share>, &Vec<Share>)> {
        match self {
            Self::Tuple(slot) => slot.poll(),
            _ => None,
        }
    }

    pub(crate) fn poll_product(&mut self) -> Option<&Vec<Share>> {
        match self {
            Self::Product(slot) => slot.poll(),
            _ => None,
        }
    }

    pub(crate) fn poll_opened(&mut self) -> Option<&FpElement> {
        match self {
            Self::Opened(slot) => slot.poll(),
            _ => None,
        }
    }

    /// Drives the two-leg `MulOpen` slot one step. See [`MulOpenPoll`] for what each outcome asks
    /// of the caller.
    pub(crate) fn poll_mul_open(&mut self) -> MulOpenPoll<'_> {
        let Self::MulOpen(slot) = self else { return MulOpenPoll::Stall };
        match slot {
            MulOpenSlot::AwaitingProduct(receiver) => match receiver.try_recv() {
                Ok(share) => {
                    *slot = MulOpenSlot::ProductReceived(share.clone());
                    MulOpenPoll::ProductReady(share)
                }
                Err(_) => MulOpenPoll::Stall,
            },
            MulOpenSlot::ProductReceived(share) => MulOpenPoll::ProductReady(share.clone()),
            MulOpenSlot::AwaitingOpen(receiver) => match receiver.try_recv() {
                Ok(value) => {
                    *slot = MulOpenSlot::Done(value);
                    match slot {
                        MulOpenSlot::Done(value) => MulOpenPoll::Done(value),
                        _ => unreachable!(),
                    }
                }
                Err(_) => MulOpenPoll::Stall,
            },
            MulOpenSlot::Done(value) => MulOpenPoll::Done(value),
        }
    }

    /// Advances a `MulOpen` slot from its product leg to its open leg once the caller has raised
    /// the `Open` intent for the delivered product.
    pub(crate) fn set_mul_open_awaiting_open(&mut self, receiver: oneshot::Receiver<FpElement>) {
        if let Self::MulOpen(slot) = self {
            *slot = MulOpenSlot::AwaitingOpen(receiver);
        }
    }
}

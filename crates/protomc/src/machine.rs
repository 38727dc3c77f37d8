//! The machine contract: the actors a protocol is made of.

use crate::message::{Envelope, MachineId, Payload};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;

/// Messages emitted by a single handler invocation. Most handlers emit zero
/// to two messages, so the list lives inline.
pub type Emit<P> = SmallVec<[Envelope<P>; 4]>;

/// Failure tag a handler records on itself instead of aborting the search.
/// Faults are ordinary machine state; the built-in "Valid messages"
/// invariant turns them into a reported violation at the next check point.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Fault {
    /// The machine was delivered a message kind it has no handler for.
    UnhandledMessage,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::UnhandledMessage => write!(f, "bad-message-type"),
        }
    }
}

/// A protocol state machine.
///
/// Implementors hold an `id` (equal to their index in the machine sequence)
/// plus protocol state. Systems with several machine kinds wrap them in an
/// enum implementing this trait and dispatch on the variant.
///
/// Handlers must be pure with respect to everything outside `self` and the
/// returned list: no globals, no I/O, no clocks. The engine relies on the
/// emitted messages being a deterministic function of the delivered message
/// and the machine's prior state.
///
/// The derived `Eq`/`Hash` are the full, id-included identity used by the
/// visited set; `logical_cmp` is the id-blind order used by symmetry
/// reduction. Keep the two consistent: logical comparison is the structural
/// one with every machine identifier blinded, including identifiers of
/// *other* machines stored in the state (peer ids, logs of sender ids).
pub trait Machine: Clone + Eq + Hash + fmt::Debug {
    type Payload: Payload;

    /// This machine's id; must equal its index in the machine sequence.
    fn id(&self) -> MachineId;

    /// Invoked once when the model is constructed. The machine is already
    /// installed in the state sequence, so `self.id()` is valid as a
    /// message source.
    fn on_startup(&mut self) -> Emit<Self::Payload> {
        Emit::new()
    }

    /// React to a delivered message: mutate `self`, return the messages to
    /// emit. Unknown message kinds must record a [`Fault`] rather than
    /// panic.
    fn handle(&mut self, msg: &Envelope<Self::Payload>) -> Emit<Self::Payload>;

    /// Identity-blind three-way order over the machine's kind and state.
    fn logical_cmp(&self, other: &Self) -> Ordering;

    /// Failure tag, if a handler recorded one.
    fn fault(&self) -> Option<Fault> {
        None
    }

    /// Full three-way order: id first, then the logical order.
    fn cmp_full(&self, other: &Self) -> Ordering {
        self.id()
            .cmp(&other.id())
            .then_with(|| self.logical_cmp(other))
    }
}

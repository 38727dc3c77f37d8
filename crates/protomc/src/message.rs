//! Messages: immutable envelopes routed between machines.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;

/// Identifies a machine by its position in the system's machine sequence.
pub type MachineId = usize;

/// The protocol-specific content of a message.
///
/// Implementors are enums with one variant per message kind; the variant is
/// the message's type tag and the variant fields are its payload. The
/// derived `Ord` (variant first, fields second) is the logical order used
/// for canonicalization, so payloads must not embed machine identifiers.
pub trait Payload: Clone + Ord + Eq + Hash + fmt::Debug {
    /// Whether the network may silently discard a message carrying this
    /// payload. Local timer messages typically report false.
    fn may_drop(&self) -> bool {
        true
    }
}

/// An immutable message in flight: endpoints plus a payload.
///
/// Envelopes are allocated by handlers (or startup hooks) and become
/// read-only once the engine takes ownership of them.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Envelope<P> {
    pub src: MachineId,
    pub dst: MachineId,
    pub payload: P,
}

impl<P: Payload> Envelope<P> {
    pub fn new(src: MachineId, dst: MachineId, payload: P) -> Self {
        Self { src, dst, payload }
    }

    /// Three-way order over the whole envelope: payload (tag, then fields),
    /// then source, then destination.
    pub fn cmp_full(&self, other: &Self) -> Ordering {
        self.payload
            .cmp(&other.payload)
            .then_with(|| self.src.cmp(&other.src))
            .then_with(|| self.dst.cmp(&other.dst))
    }

    /// Identity-blind order: the payload alone, endpoints ignored.
    pub fn cmp_logical(&self, other: &Self) -> Ordering {
        self.payload.cmp(&other.payload)
    }

    pub fn may_drop(&self) -> bool {
        self.payload.may_drop()
    }
}

impl<P: Payload> PartialOrd for Envelope<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P: Payload> Ord for Envelope<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_full(other)
    }
}

impl<P: Payload> fmt::Display for Envelope<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}->{}", self.payload, self.src, self.dst)
    }
}

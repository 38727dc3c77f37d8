//! Global system states: machines plus in-flight messages plus history.

use crate::diff::Diff;
use crate::machine::Machine;
use crate::message::Envelope;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A snapshot of the whole system: every machine and every in-flight
/// message, plus the causal chain that produced it.
///
/// Cloning a state is a structural-sharing copy: the three vectors are
/// cloned but the machines, messages, and diffs they point at are shared.
/// Shared artifacts are never mutated once a state has been published; the
/// successor generator clones a machine before handling a message on it.
///
/// Equality, hashing, and ordering all ignore `history` and `depth`, so
/// states coalesce in the visited set regardless of how they were reached
/// and the first-discovered (shortest, under BFS) history is the one kept.
#[derive(Clone, Debug)]
pub struct SystemState<M: Machine> {
    pub messages: Vec<Rc<Envelope<M::Payload>>>,
    pub machines: Vec<Rc<M>>,
    pub history: Vec<Rc<Diff<M::Payload>>>,
    pub depth: usize,
}

impl<M: Machine> SystemState<M> {
    /// Build the initial state over an ordered machine sequence. The
    /// machine at index `i` must carry id `i`.
    pub fn new(machines: Vec<M>) -> Self {
        for (i, m) in machines.iter().enumerate() {
            assert_eq!(m.id(), i, "machine at index {i} carries id {}", m.id());
        }
        Self {
            messages: Vec::new(),
            machines: machines.into_iter().map(Rc::new).collect(),
            history: Vec::new(),
            depth: 0,
        }
    }

    /// Full three-way comparison: message count, per-message full compare,
    /// machine count, per-machine full compare. History and depth are
    /// deliberately excluded.
    pub fn cmp_full(&self, other: &Self) -> Ordering {
        let ord = self.messages.len().cmp(&other.messages.len());
        if ord != Ordering::Equal {
            return ord;
        }
        for (a, b) in self.messages.iter().zip(&other.messages) {
            let ord = a.cmp_full(b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        let ord = self.machines.len().cmp(&other.machines.len());
        if ord != Ordering::Equal {
            return ord;
        }
        for (a, b) in self.machines.iter().zip(&other.machines) {
            let ord = a.cmp_full(b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Print the causal chain from the initial state, one step per line.
    pub fn print_history(&self) {
        for diff in &self.history {
            println!("{}", diff);
        }
    }

    /// Debug-build structural checks: id/index bijection, endpoint
    /// validity, history length. Violations are programming bugs.
    pub(crate) fn debug_validate(&self) {
        if cfg!(debug_assertions) {
            for (i, m) in self.machines.iter().enumerate() {
                debug_assert_eq!(m.id(), i, "machine id drifted from its index");
            }
            for msg in &self.messages {
                debug_assert!(msg.src < self.machines.len(), "message {msg} has a bad source");
                debug_assert!(msg.dst < self.machines.len(), "message {msg} has a bad destination");
            }
            debug_assert_eq!(self.history.len(), self.depth, "history length must equal depth");
        }
    }
}

impl<M: Machine> PartialEq for SystemState<M> {
    fn eq(&self, other: &Self) -> bool {
        self.messages == other.messages && self.machines == other.machines
    }
}

impl<M: Machine> Eq for SystemState<M> {}

impl<M: Machine> Hash for SystemState<M> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.messages.hash(state);
        self.machines.hash(state);
    }
}

impl<M: Machine> PartialOrd for SystemState<M> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<M: Machine> Ord for SystemState<M> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_full(other)
    }
}

impl<M: Machine> fmt::Display for SystemState<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "depth {}, {} in flight: [", self.depth, self.messages.len())?;
        for (i, m) in self.machines.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", m)?;
        }
        write!(f, "]")
    }
}

//! Identity-blind canonical projection used for symmetry reduction.
//!
//! Two states that differ only by renaming machines of the same kind (and
//! relabeling the messages in flight accordingly) describe the same logical
//! situation. The projection sorts machines into an id-free normal form so
//! such states collapse to one representative per BFS level.

use crate::machine::Machine;
use crate::message::Envelope;
use crate::state::SystemState;
use std::cmp::Ordering;
use std::rc::Rc;

/// One machine's id-blind view: its logical state plus the in-flight
/// messages attributed to it by each endpoint. Messages are attributed by
/// both source and destination; attribution by source alone would lose
/// delivery-side symmetry.
#[derive(Debug)]
struct LogicalMachine<M: Machine> {
    machine: Rc<M>,
    outgoing: Vec<Rc<Envelope<M::Payload>>>,
    incoming: Vec<Rc<Envelope<M::Payload>>>,
}

impl<M: Machine> LogicalMachine<M> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.machine
            .logical_cmp(&other.machine)
            .then_with(|| cmp_msgs(&self.outgoing, &other.outgoing))
            .then_with(|| cmp_msgs(&self.incoming, &other.incoming))
    }
}

/// Lexicographic id-blind order over message lists.
fn cmp_msgs<P: crate::message::Payload>(a: &[Rc<Envelope<P>>], b: &[Rc<Envelope<P>>]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let ord = x.cmp_logical(y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

/// The canonical form of a state. It is a fingerprint only: the machine
/// permutation that produced it is not remembered.
#[derive(Debug)]
pub struct CanonicalState<M: Machine> {
    entries: Vec<LogicalMachine<M>>,
}

impl<M: Machine> CanonicalState<M> {
    /// Project a state into its canonical form.
    pub fn project(state: &SystemState<M>) -> Self {
        let mut entries: Vec<LogicalMachine<M>> = state
            .machines
            .iter()
            .map(|m| {
                let mut outgoing: Vec<_> = state
                    .messages
                    .iter()
                    .filter(|e| e.src == m.id())
                    .cloned()
                    .collect();
                let mut incoming: Vec<_> = state
                    .messages
                    .iter()
                    .filter(|e| e.dst == m.id())
                    .cloned()
                    .collect();
                outgoing.sort_by(|a, b| a.cmp_logical(b));
                incoming.sort_by(|a, b| a.cmp_logical(b));
                LogicalMachine {
                    machine: Rc::clone(m),
                    outgoing,
                    incoming,
                }
            })
            .collect();
        entries.sort_by(LogicalMachine::cmp);
        Self { entries }
    }
}

impl<M: Machine> PartialEq for CanonicalState<M> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<M: Machine> Eq for CanonicalState<M> {}

impl<M: Machine> PartialOrd for CanonicalState<M> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<M: Machine> Ord for CanonicalState<M> {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.entries.iter().zip(&other.entries) {
            let ord = a.cmp(b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.entries.len().cmp(&other.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Echo, Probe};

    /// Two openers aimed at a shared peer, with their startup messages in
    /// flight; `flip` swaps which opener occupies which slot.
    fn fanned(flip: bool) -> SystemState<Echo> {
        let (a, b) = if flip { (2, 1) } else { (1, 2) };
        let mut s = SystemState::new(vec![
            Echo::new(0, 0, None),
            Echo::new(1, 0, Some(Probe::Ping)),
            Echo::new(2, 0, Some(Probe::Ping)),
        ]);
        s.messages.push(Rc::new(Envelope::new(a, 0, Probe::Ping)));
        s.messages.push(Rc::new(Envelope::new(b, 0, Probe::Ping)));
        s
    }

    #[test]
    fn renaming_identical_machines_is_invisible() {
        let a = CanonicalState::project(&fanned(false));
        let b = CanonicalState::project(&fanned(true));
        assert_eq!(a.cmp(&b), Ordering::Equal);
        assert_eq!(a, b);
    }

    #[test]
    fn projection_is_stable_under_copy() {
        let s = fanned(false);
        let c = s.clone();
        assert_eq!(
            CanonicalState::project(&s).cmp(&CanonicalState::project(&c)),
            Ordering::Equal
        );
    }

    #[test]
    fn logical_state_differences_survive_projection() {
        let s = fanned(false);
        let mut t = s.clone();
        let mut m = (*t.machines[0]).clone();
        m.pings = 1;
        t.machines[0] = Rc::new(m);
        assert_ne!(
            CanonicalState::project(&s).cmp(&CanonicalState::project(&t)),
            Ordering::Equal
        );
    }

    #[test]
    fn message_attribution_uses_both_endpoints() {
        let mut s = SystemState::new(vec![Echo::new(0, 1, None), Echo::new(1, 0, None)]);
        let mut t = s.clone();
        // Same multiset of payloads, but aimed at different receivers.
        s.messages.push(Rc::new(Envelope::new(0, 0, Probe::Ping)));
        t.messages.push(Rc::new(Envelope::new(0, 1, Probe::Ping)));
        assert_ne!(
            CanonicalState::project(&s).cmp(&CanonicalState::project(&t)),
            Ordering::Equal
        );
    }
}

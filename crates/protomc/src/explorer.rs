//! Level-synchronous BFS over the reachable configuration graph.

use crate::canonical::CanonicalState;
use crate::diff::Diff;
use crate::machine::Machine;
use crate::message::Envelope;
use crate::predicate::Predicate;
use crate::state::SystemState;
use crate::store::StateStore;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info, trace};

/// Search error. Invariant violations are the only recoverable failure;
/// structural problems (bad endpoints, id/index drift) are programming
/// bugs and assert instead.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invariant '{name}' violated at depth {depth}")]
    InvariantViolation { name: String, depth: usize },
}

pub type ModelResult<T> = Result<T, ModelError>;

/// Knobs for a single search run.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Deepest BFS level to expand; `None` explores without bound.
    pub max_depth: Option<usize>,
    /// Collapse states that differ only by a renaming of identical
    /// machines. On by default.
    pub symmetry_reduction: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            symmetry_reduction: true,
        }
    }
}

/// The model: an initial configuration, the invariants to verify, and the
/// bookkeeping of a breadth-first exploration.
pub struct Model<M: Machine> {
    pending: Vec<SystemState<M>>,
    visited: StateStore<M>,
    invariants: Vec<Predicate<M>>,
    interesting: Vec<Predicate<M>>,
    explored: usize,
}

impl<M: Machine> Model<M> {
    /// Build a model over an ordered machine sequence (the machine at
    /// index `i` must carry id `i`). Runs every machine's startup hook,
    /// collects the initial messages, and seeds the frontier. The built-in
    /// "Valid messages" invariant is always appended.
    pub fn new(machines: Vec<M>, mut invariants: Vec<Predicate<M>>) -> Self {
        let mut machines = machines;
        for (i, m) in machines.iter().enumerate() {
            assert_eq!(m.id(), i, "machine at index {i} carries id {}", m.id());
        }
        let count = machines.len();
        let mut initial_messages = Vec::new();
        for m in machines.iter_mut() {
            for msg in m.on_startup() {
                assert!(
                    msg.src < count && msg.dst < count,
                    "startup emitted {msg} with an endpoint outside the machine sequence"
                );
                initial_messages.push(Rc::new(msg));
            }
        }
        let mut initial = SystemState::new(machines);
        initial.messages = initial_messages;
        invariants.push(Predicate::valid_messages());

        info!(
            machines = count,
            invariants = invariants.len(),
            startup_messages = initial.messages.len(),
            "initialized model"
        );

        Self {
            pending: vec![initial],
            visited: StateStore::new(),
            invariants,
            interesting: Vec::new(),
            explored: 0,
        }
    }

    /// Attach interesting-state probes: when one matches, the frontier is
    /// replaced by the matching state and exploration continues from
    /// there. The visited set is kept, so this only ever prunes.
    pub fn with_interesting(mut self, interesting: Vec<Predicate<M>>) -> Self {
        self.interesting = interesting;
        self
    }

    /// The current frontier. Right after construction this is the single
    /// initial state.
    pub fn frontier(&self) -> &[SystemState<M>] {
        &self.pending
    }

    /// Cumulative number of states scanned (invariant-checked).
    pub fn explored_count(&self) -> usize {
        self.explored
    }

    /// Number of unique states discovered.
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Run the search to completion and return the terminating set: every
    /// reachable state with no messages left in flight, plus the frontier
    /// survivors at the bound when a depth bound cuts the search. The
    /// result is sorted by full comparison.
    ///
    /// On an invariant violation, the violation and its causal history are
    /// printed and the search stops.
    pub fn run(&mut self, config: &RunConfig) -> ModelResult<Vec<SystemState<M>>> {
        let mut terminating: Vec<SystemState<M>> = Vec::new();
        let mut depth = 0usize;

        while !self.pending.is_empty() {
            info!(
                depth,
                explored = self.explored,
                visited = self.visited.len(),
                frontier = self.pending.len(),
                terminating = terminating.len(),
                "entering level"
            );

            let mut idx = 0;
            while idx < self.pending.len() {
                let s = &self.pending[idx];
                s.debug_validate();
                self.explored += 1;
                self.visited.insert(s);
                for inv in &self.invariants {
                    if !inv.holds(s) {
                        println!("INVARIANT VIOLATED: {}", inv.name);
                        s.print_history();
                        return Err(ModelError::InvariantViolation {
                            name: inv.name.clone(),
                            depth,
                        });
                    }
                }
                if let Some(p) = self.interesting.iter().find(|p| p.holds(s)) {
                    // Guided search: collapse the frontier to the matching
                    // state, discarding its siblings. Visited is kept.
                    debug!(predicate = p.name.as_str(), depth, "redirecting search");
                    let seed = self.pending.swap_remove(idx);
                    self.pending.clear();
                    self.pending.push(seed);
                    break;
                }
                idx += 1;
            }

            if let Some(limit) = config.max_depth {
                if depth >= limit {
                    // Cut by the bound: every survivor terminates here.
                    terminating.append(&mut self.pending);
                    break;
                }
            }

            let frontier = std::mem::take(&mut self.pending);
            self.pending = generate_successors(
                frontier,
                &mut self.visited,
                config.symmetry_reduction,
                &mut terminating,
            );
            depth += 1;
        }

        terminating.sort();
        info!(
            explored = self.explored,
            visited = self.visited.len(),
            terminating = terminating.len(),
            "search complete"
        );
        Ok(terminating)
    }
}

/// Expand one BFS level: for every state and every in-flight message,
/// produce the delivery successor and, when the payload permits, the drop
/// successor. States with nothing in flight go to `terminating` instead.
/// Survivors are deduplicated against `visited` (full compare) and, when
/// symmetry reduction is on, against this level's canonical set.
pub fn generate_successors<M: Machine>(
    frontier: Vec<SystemState<M>>,
    visited: &mut StateStore<M>,
    symmetry_reduction: bool,
    terminating: &mut Vec<SystemState<M>>,
) -> Vec<SystemState<M>> {
    let mut next: Vec<SystemState<M>> = Vec::new();
    let mut canonical_seen: BTreeSet<CanonicalState<M>> = BTreeSet::new();

    for s in frontier {
        if s.messages.is_empty() {
            terminating.push(s);
            continue;
        }
        for i in 0..s.messages.len() {
            // Delivery: clone the state, pull the message, handle it on a
            // clone of the destination machine.
            let mut succ = s.clone();
            let delivered = succ.messages.remove(i);
            let dst = delivered.dst;
            assert!(
                dst < succ.machines.len(),
                "message {delivered} addressed outside the machine sequence"
            );
            let original = &s.machines[dst];
            let mut target = (**original).clone();
            debug_assert!(
                target.cmp_full(original) == Ordering::Equal,
                "machine clone must compare equal to its source"
            );
            let emitted = target.handle(&delivered);
            if target.cmp_full(original) != Ordering::Equal {
                succ.machines[dst] = Rc::new(target);
            }
            // else: the handler was a no-op; keeping the original shared
            // machine lets equal states coalesce in the visited set.

            let sent: Vec<Rc<Envelope<M::Payload>>> =
                emitted.into_iter().map(Rc::new).collect();
            for m in &sent {
                assert!(
                    m.src < succ.machines.len() && m.dst < succ.machines.len(),
                    "handler emitted {m} with an endpoint outside the machine sequence"
                );
            }
            succ.messages.extend(sent.iter().cloned());
            succ.history.push(Rc::new(Diff::delivery(delivered, sent)));
            succ.depth += 1;
            offer(succ, visited, symmetry_reduction, &mut canonical_seen, &mut next);

            // Drop: the network discards the message; machines untouched.
            if s.messages[i].may_drop() {
                let mut succ = s.clone();
                let dropped = succ.messages.remove(i);
                succ.history.push(Rc::new(Diff::drop(dropped)));
                succ.depth += 1;
                offer(succ, visited, symmetry_reduction, &mut canonical_seen, &mut next);
            }
        }
    }
    next
}

/// Admit a candidate successor to the next frontier unless it is already
/// known, either by full identity (visited) or, within this level, by
/// canonical form.
fn offer<M: Machine>(
    succ: SystemState<M>,
    visited: &mut StateStore<M>,
    symmetry_reduction: bool,
    canonical_seen: &mut BTreeSet<CanonicalState<M>>,
    next: &mut Vec<SystemState<M>>,
) {
    succ.debug_validate();
    if visited.contains(&succ) {
        trace!(depth = succ.depth, "successor already visited");
        return;
    }
    if symmetry_reduction && !canonical_seen.insert(CanonicalState::project(&succ)) {
        trace!(depth = succ.depth, "successor collapsed by symmetry");
        return;
    }
    visited.insert(&succ);
    next.push(succ);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::Fault;
    use crate::testutil::{Echo, Probe};

    fn ping_pong() -> Vec<Echo> {
        vec![Echo::new(0, 1, Some(Probe::Ping)), Echo::new(1, 0, None)]
    }

    #[test]
    fn ping_pong_reaches_quiescence() {
        let mut model = Model::new(ping_pong(), vec![]);
        let terminating = model.run(&RunConfig::default()).unwrap();
        assert!(!terminating.is_empty());
        assert!(terminating.iter().all(|s| s.messages.is_empty()));
        // The full exchange is reachable: ping delivered, pong returned.
        assert!(terminating
            .iter()
            .any(|s| s.machines[0].pongs == 1 && s.machines[1].pings == 1));
        // Every history is exactly as long as its depth.
        for s in &terminating {
            assert_eq!(s.history.len(), s.depth);
        }
    }

    #[test]
    fn depth_zero_returns_the_initial_state() {
        let mut model = Model::new(ping_pong(), vec![]);
        let config = RunConfig {
            max_depth: Some(0),
            ..Default::default()
        };
        let terminating = model.run(&config).unwrap();
        assert_eq!(terminating.len(), 1);
        assert_eq!(terminating[0].depth, 0);
        assert_eq!(terminating[0].messages.len(), 1);
    }

    #[test]
    fn dropped_ping_leaves_the_receiver_cold() {
        let mut model = Model::new(ping_pong(), vec![]);
        let terminating = model.run(&RunConfig::default()).unwrap();
        assert!(terminating
            .iter()
            .any(|s| s.machines[1].pings == 0 && s.machines[0].pongs == 0));
    }

    #[test]
    fn undroppable_messages_generate_no_drop_successor() {
        let mut s = SystemState::new(ping_pong());
        s.messages
            .push(Rc::new(Envelope::new(1, 0, Probe::Pong)));
        let mut visited = StateStore::new();
        let mut terminating = Vec::new();
        let next = generate_successors(vec![s], &mut visited, false, &mut terminating);
        assert_eq!(next.len(), 1);
        assert!(matches!(
            next[0].history[0].step,
            crate::diff::Step::Delivered(_)
        ));
    }

    #[test]
    fn noop_handler_keeps_the_original_machine() {
        let mut s = SystemState::new(ping_pong());
        s.messages
            .push(Rc::new(Envelope::new(0, 1, Probe::Nudge)));
        let shared = Rc::clone(&s.machines[1]);
        let mut visited = StateStore::new();
        let mut terminating = Vec::new();
        let next = generate_successors(vec![s], &mut visited, false, &mut terminating);
        // Delivering a nudge changes nothing, so its successor equals the
        // drop successor and only one survives.
        assert_eq!(next.len(), 1);
        assert!(Rc::ptr_eq(&next[0].machines[1], &shared));
    }

    #[test]
    fn symmetric_siblings_collapse_within_a_level() {
        let machines = vec![
            Echo::new(0, 0, None),
            Echo::new(1, 0, Some(Probe::Ping)),
            Echo::new(2, 0, Some(Probe::Ping)),
        ];
        let model = Model::new(machines, vec![]);
        let frontier = model.pending.clone();
        let mut visited = StateStore::new();
        let mut terminating = Vec::new();
        let plain = generate_successors(frontier.clone(), &mut visited, false, &mut terminating);
        // Two deliveries and two drops, pairwise symmetric.
        assert_eq!(plain.len(), 4);

        let mut visited = StateStore::new();
        let mut terminating = Vec::new();
        let reduced = generate_successors(frontier, &mut visited, true, &mut terminating);
        assert_eq!(reduced.len(), 2);
    }

    #[test]
    fn empty_frontier_state_is_terminating() {
        let s = SystemState::new(ping_pong());
        let mut visited = StateStore::new();
        let mut terminating = Vec::new();
        let next = generate_successors(vec![s], &mut visited, true, &mut terminating);
        assert!(next.is_empty());
        assert_eq!(terminating.len(), 1);
    }

    #[test]
    fn builtin_invariant_reports_unhandled_messages() {
        let machines = vec![Echo::new(0, 1, Some(Probe::Halt)), Echo::new(1, 0, None)];
        let mut model = Model::new(machines, vec![]);
        let err = model.run(&RunConfig::default()).unwrap_err();
        match err {
            ModelError::InvariantViolation { name, .. } => {
                assert_eq!(name, "Valid messages");
            }
        }
    }

    #[test]
    fn user_invariant_violation_names_the_predicate() {
        let mut model = Model::new(
            ping_pong(),
            vec![Predicate::new("receiver never hears", |s: &SystemState<Echo>| {
                s.machines[1].pings == 0
            })],
        );
        let err = model.run(&RunConfig::default()).unwrap_err();
        match err {
            ModelError::InvariantViolation { name, .. } => {
                assert_eq!(name, "receiver never hears");
            }
        }
    }

    #[test]
    fn redirection_prunes_the_unmatched_siblings() {
        // Without guidance the dropped-ping path terminates cold.
        let mut model = Model::new(ping_pong(), vec![]);
        let free = model.run(&RunConfig::default()).unwrap();
        assert!(free.iter().any(|s| s.machines[1].pings == 0));

        // Guided toward the delivery, the cold path is discarded.
        let probe = Predicate::new("ping arrived", |s: &SystemState<Echo>| {
            s.machines[1].pings == 1
        });
        let mut model = Model::new(ping_pong(), vec![]).with_interesting(vec![probe]);
        let guided = model.run(&RunConfig::default()).unwrap();
        assert!(!guided.is_empty());
        assert!(guided.iter().all(|s| s.machines[1].pings == 1));
    }

    #[test]
    fn faults_are_state_not_exceptions() {
        let mut m = Echo::new(1, 0, None);
        m.handle(&Envelope::new(0, 1, Probe::Halt));
        assert_eq!(m.fault(), Some(Fault::UnhandledMessage));
    }
}

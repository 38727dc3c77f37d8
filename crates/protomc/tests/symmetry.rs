//! Property tests for the canonical projection and the sharing discipline.

use proptest::prelude::*;
use protomc::{CanonicalState, Emit, Envelope, Machine, MachineId, Payload, SystemState};
use std::cmp::Ordering;
use std::rc::Rc;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
enum Chip {
    Unit(u8),
}

impl Payload for Chip {}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
struct Worker {
    id: MachineId,
    tokens: u8,
}

impl Machine for Worker {
    type Payload = Chip;

    fn id(&self) -> MachineId {
        self.id
    }

    fn handle(&mut self, msg: &Envelope<Chip>) -> Emit<Chip> {
        let Chip::Unit(n) = msg.payload;
        self.tokens = self.tokens.wrapping_add(n);
        Emit::new()
    }

    fn logical_cmp(&self, other: &Self) -> Ordering {
        self.tokens.cmp(&other.tokens)
    }
}

/// Build a state from token counts and (src, dst, value) wire triples.
fn build(tokens: &[u8], wires: &[(usize, usize, u8)]) -> SystemState<Worker> {
    let machines = tokens
        .iter()
        .enumerate()
        .map(|(id, t)| Worker { id, tokens: *t })
        .collect();
    let mut state = SystemState::new(machines);
    state.messages = wires
        .iter()
        .map(|(s, d, v)| Rc::new(Envelope::new(*s, *d, Chip::Unit(*v))))
        .collect();
    state
}

/// Relabel machines by `perm` (machine i moves to slot perm[i]) and remap
/// every wire endpoint accordingly.
fn relabel(
    tokens: &[u8],
    wires: &[(usize, usize, u8)],
    perm: &[usize],
) -> SystemState<Worker> {
    let mut new_tokens = vec![0u8; tokens.len()];
    for (i, t) in tokens.iter().enumerate() {
        new_tokens[perm[i]] = *t;
    }
    let new_wires: Vec<_> = wires
        .iter()
        .map(|(s, d, v)| (perm[*s], perm[*d], *v))
        .collect();
    build(&new_tokens, &new_wires)
}

fn system_strategy() -> impl Strategy<
    Value = (Vec<u8>, Vec<(usize, usize, u8)>, Vec<usize>),
> {
    (2usize..=5).prop_flat_map(|n| {
        let tokens = proptest::collection::vec(0u8..4, n);
        let wires = proptest::collection::vec((0..n, 0..n, 0u8..4), 0..6);
        let perm = Just((0..n).collect::<Vec<_>>()).prop_shuffle();
        (tokens, wires, perm)
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    /// Renaming machines (and relabeling wires to match) never changes the
    /// canonical form.
    #[test]
    fn canonical_form_is_permutation_invariant(
        (tokens, wires, perm) in system_strategy()
    ) {
        let base = build(&tokens, &wires);
        let renamed = relabel(&tokens, &wires, &perm);
        let a = CanonicalState::project(&base);
        let b = CanonicalState::project(&renamed);
        prop_assert_eq!(a.cmp(&b), Ordering::Equal);
    }

    /// A copy projects to the same canonical form and compares equal.
    #[test]
    fn copies_are_indistinguishable(
        (tokens, wires, _) in system_strategy()
    ) {
        let s = build(&tokens, &wires);
        let c = s.clone();
        prop_assert_eq!(s.cmp_full(&c), Ordering::Equal);
        prop_assert_eq!(
            CanonicalState::project(&s).cmp(&CanonicalState::project(&c)),
            Ordering::Equal
        );
    }

    /// Copying then dropping the copy leaves every refcount where it was.
    #[test]
    fn copy_then_drop_is_refcount_neutral(
        (tokens, wires, _) in system_strategy()
    ) {
        let s = build(&tokens, &wires);
        let before: Vec<usize> = s.machines.iter().map(Rc::strong_count).collect();
        {
            let _c = s.clone();
            for m in &s.machines {
                prop_assert_eq!(Rc::strong_count(m), 2);
            }
        }
        let after: Vec<usize> = s.machines.iter().map(Rc::strong_count).collect();
        prop_assert_eq!(before, after);
    }
}

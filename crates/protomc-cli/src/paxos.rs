//! Single-decree Paxos: every machine plays proposer, acceptor, and
//! learner. Variable names follow the classic lab handout (np/na/va). A
//! proposer kicks itself off with a proposal message; ballots are chosen
//! so that distinct proposers never collide.

use protomc::{Emit, Envelope, Machine, MachineId, Payload, Predicate, SystemState};
use smallvec::smallvec;
use std::cmp::Ordering;
use std::collections::BTreeSet;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum PaxosMsg {
    /// Self-addressed kick-off carrying the value to propose.
    Propose { v: i64 },
    Prepare { n: i64 },
    PrepareOk { n: i64, na: i64, va: i64 },
    Accept { n: i64, v: i64 },
    AcceptOk { n: i64 },
}

impl Payload for PaxosMsg {
    fn may_drop(&self) -> bool {
        false
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct PaxosNode {
    pub id: MachineId,
    pub cluster: usize,

    /// Highest ballot seen in a prepare.
    pub np: i64,
    /// Ballot and value of the last accept.
    pub na: i64,
    pub va: i64,

    pub proposes: bool,
    pub selected_n: i64,
    pub selected_v: i64,
    pub final_value: i64,

    /// Prepare acknowledgments, keyed by responder so equal ballots from
    /// different peers stay distinct: (from, n, na, va).
    pub prepare_oks: BTreeSet<(MachineId, i64, i64, i64)>,
    /// Accept acknowledgments: (from, n).
    pub accept_oks: BTreeSet<(MachineId, i64)>,
}

impl PaxosNode {
    pub fn new(id: MachineId, cluster: usize, proposes: bool) -> Self {
        Self {
            id,
            cluster,
            np: -1,
            na: -1,
            va: -1,
            proposes,
            selected_n: -1,
            selected_v: -1,
            final_value: -1,
            prepare_oks: BTreeSet::new(),
            accept_oks: BTreeSet::new(),
        }
    }

    fn majority(&self) -> usize {
        self.cluster / 2
    }

    fn count_prepare_oks(&self, n: i64) -> usize {
        self.prepare_oks.iter().filter(|(_, pn, _, _)| *pn == n).count()
    }

    fn count_accept_oks(&self, n: i64) -> usize {
        self.accept_oks.iter().filter(|(_, an)| *an == n).count()
    }

    /// The value carried by the highest-ballot accept among the prepare
    /// acknowledgments for ballot `n`. The node's own accepted pair seeds
    /// the scan, so with no prior accepts anywhere this is the proposal.
    fn value_from_highest_na(&self, n: i64) -> i64 {
        let mut highest_na = self.na;
        let mut value = self.va;
        for (_, pn, pna, pva) in &self.prepare_oks {
            if *pn == n && *pna > highest_na {
                highest_na = *pna;
                value = *pva;
            }
        }
        value
    }

    fn broadcast(&self, make: impl Fn(MachineId) -> PaxosMsg) -> Emit<PaxosMsg> {
        (0..self.cluster)
            .map(|peer| Envelope::new(self.id, peer, make(peer)))
            .collect()
    }
}

impl Machine for PaxosNode {
    type Payload = PaxosMsg;

    fn id(&self) -> MachineId {
        self.id
    }

    fn on_startup(&mut self) -> Emit<PaxosMsg> {
        if self.proposes {
            let v = self.id as i64 + 200;
            smallvec![Envelope::new(self.id, self.id, PaxosMsg::Propose { v })]
        } else {
            Emit::new()
        }
    }

    fn handle(&mut self, msg: &Envelope<PaxosMsg>) -> Emit<PaxosMsg> {
        match msg.payload {
            PaxosMsg::Propose { v } => {
                let n = self.id as i64 * self.np + 10;
                self.va = v;
                self.selected_n = n;
                self.broadcast(|_| PaxosMsg::Prepare { n })
            }
            PaxosMsg::Prepare { n } => {
                if n > self.np {
                    self.np = n;
                    smallvec![Envelope::new(
                        self.id,
                        msg.src,
                        PaxosMsg::PrepareOk {
                            n,
                            na: self.na,
                            va: self.va,
                        },
                    )]
                } else {
                    Emit::new()
                }
            }
            PaxosMsg::PrepareOk { n, na, va } => {
                self.prepare_oks.insert((msg.src, n, na, va));
                if self.count_prepare_oks(self.selected_n) > self.majority() {
                    let v = self.value_from_highest_na(self.selected_n);
                    self.selected_v = v;
                    let n = self.selected_n;
                    self.broadcast(|_| PaxosMsg::Accept { n, v })
                } else {
                    Emit::new()
                }
            }
            PaxosMsg::Accept { n, v } => {
                if n >= self.np {
                    self.np = n;
                    self.na = n;
                    self.va = v;
                    smallvec![Envelope::new(self.id, msg.src, PaxosMsg::AcceptOk { n })]
                } else {
                    Emit::new()
                }
            }
            PaxosMsg::AcceptOk { n } => {
                self.accept_oks.insert((msg.src, n));
                if self.count_accept_oks(self.selected_n) > self.majority() {
                    self.final_value = self.selected_v;
                }
                Emit::new()
            }
        }
    }

    fn logical_cmp(&self, other: &Self) -> Ordering {
        // The acknowledgment sets key on responder ids; strip them for the
        // identity-blind view.
        let strip = |s: &Self| {
            let mut p: Vec<_> = s.prepare_oks.iter().map(|(_, n, na, va)| (*n, *na, *va)).collect();
            let mut a: Vec<_> = s.accept_oks.iter().map(|(_, n)| *n).collect();
            p.sort_unstable();
            a.sort_unstable();
            (p, a)
        };
        self.np
            .cmp(&other.np)
            .then_with(|| self.na.cmp(&other.na))
            .then_with(|| self.va.cmp(&other.va))
            .then_with(|| self.proposes.cmp(&other.proposes))
            .then_with(|| self.selected_n.cmp(&other.selected_n))
            .then_with(|| self.selected_v.cmp(&other.selected_v))
            .then_with(|| self.final_value.cmp(&other.final_value))
            .then_with(|| strip(self).cmp(&strip(other)))
    }
}

/// A cluster of `n` nodes; the listed indices propose on startup.
pub fn machines(n: usize, proposers: &[MachineId]) -> Vec<PaxosNode> {
    (0..n)
        .map(|id| PaxosNode::new(id, n, proposers.contains(&id)))
        .collect()
}

/// Agreement over one state: every learned value is the same.
pub fn learned_values(state: &SystemState<PaxosNode>) -> Vec<i64> {
    let mut vals: Vec<i64> = state
        .machines
        .iter()
        .map(|m| m.final_value)
        .filter(|v| *v != -1)
        .collect();
    vals.sort_unstable();
    vals.dedup();
    vals
}

/// Safety as a checked invariant: no two machines learn different values.
pub fn invariants() -> Vec<Predicate<PaxosNode>> {
    vec![Predicate::new("agreement", |s: &SystemState<PaxosNode>| {
        learned_values(s).len() <= 1
    })]
}

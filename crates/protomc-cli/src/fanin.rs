//! Many-sender fan-in: every sender fires one greeting at a shared
//! receiver, and the adversarial network picks the arrival order. The
//! receiver keeps the arrival log, so without symmetry reduction every
//! permutation survives as its own terminating state; with it, one
//! representative per level remains.

use protomc::{Emit, Envelope, Fault, Machine, MachineId, Payload, Predicate, SystemState};
use smallvec::smallvec;
use std::cmp::Ordering;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum FaninMsg {
    Hello,
}

impl Payload for FaninMsg {
    fn may_drop(&self) -> bool {
        // The accounting invariant requires every greeting to survive.
        false
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum FaninMachine {
    Receiver {
        id: MachineId,
        /// Sender ids in arrival order.
        log: Vec<MachineId>,
        fault: Option<Fault>,
    },
    Sender {
        id: MachineId,
        dst: MachineId,
        fault: Option<Fault>,
    },
}

impl FaninMachine {
    pub fn log(&self) -> Option<&[MachineId]> {
        match self {
            FaninMachine::Receiver { log, .. } => Some(log),
            _ => None,
        }
    }
}

impl Machine for FaninMachine {
    type Payload = FaninMsg;

    fn id(&self) -> MachineId {
        match self {
            FaninMachine::Receiver { id, .. } | FaninMachine::Sender { id, .. } => *id,
        }
    }

    fn on_startup(&mut self) -> Emit<FaninMsg> {
        match self {
            FaninMachine::Sender { id, dst, .. } => {
                smallvec![Envelope::new(*id, *dst, FaninMsg::Hello)]
            }
            FaninMachine::Receiver { .. } => Emit::new(),
        }
    }

    fn handle(&mut self, msg: &Envelope<FaninMsg>) -> Emit<FaninMsg> {
        match self {
            FaninMachine::Receiver { log, .. } => {
                log.push(msg.src);
                Emit::new()
            }
            FaninMachine::Sender { fault, .. } => {
                // Senders expect nothing back.
                *fault = Some(Fault::UnhandledMessage);
                Emit::new()
            }
        }
    }

    fn logical_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            // The log holds machine ids, so only its length survives the
            // identity-blind view.
            (
                FaninMachine::Receiver { log: a, fault: fa, .. },
                FaninMachine::Receiver { log: b, fault: fb, .. },
            ) => a.len().cmp(&b.len()).then_with(|| fa.cmp(fb)),
            (
                FaninMachine::Sender { fault: fa, .. },
                FaninMachine::Sender { fault: fb, .. },
            ) => fa.cmp(fb),
            (FaninMachine::Receiver { .. }, FaninMachine::Sender { .. }) => Ordering::Less,
            (FaninMachine::Sender { .. }, FaninMachine::Receiver { .. }) => Ordering::Greater,
        }
    }

    fn fault(&self) -> Option<Fault> {
        match self {
            FaninMachine::Receiver { fault, .. } | FaninMachine::Sender { fault, .. } => *fault,
        }
    }
}

/// Receiver at index 0, senders at 1..=n.
pub fn machines(n: usize) -> Vec<FaninMachine> {
    let mut out = vec![FaninMachine::Receiver {
        id: 0,
        log: Vec::new(),
        fault: None,
    }];
    for id in 1..=n {
        out.push(FaninMachine::Sender {
            id,
            dst: 0,
            fault: None,
        });
    }
    out
}

/// Conservation: the logged senders plus the senders still in flight are
/// exactly the senders that exist.
pub fn invariants(n: usize) -> Vec<Predicate<FaninMachine>> {
    vec![Predicate::new(
        "every greeting is logged or in flight",
        move |s: &SystemState<FaninMachine>| {
            let log = s.machines[0].log().expect("receiver at index 0");
            let mut seen: Vec<MachineId> = log.to_vec();
            seen.extend(s.messages.iter().map(|m| m.src));
            seen.sort_unstable();
            seen == (1..=n).collect::<Vec<_>>()
        },
    )]
}

//! Ack/retransmit: a sender pushes one value at a receiver until the
//! receiver confirms it, re-sending on a self-addressed timer. With a
//! lossy network the value message may vanish, so terminating states exist
//! where the sender never hears back.

use protomc::{Emit, Envelope, Fault, Machine, MachineId, Payload, Predicate, SystemState};
use smallvec::smallvec;
use std::cmp::Ordering;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum AckMsg {
    /// Retransmission timer the sender runs against itself.
    Timer,
    Ack,
    Val { v: i64, lossy: bool },
}

impl Payload for AckMsg {
    fn may_drop(&self) -> bool {
        matches!(self, AckMsg::Val { lossy: true, .. })
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Sender {
    pub id: MachineId,
    pub dst: MachineId,
    pub val: i64,
    pub ack: bool,
    /// Retransmissions still allowed; bounded so the reachable graph is
    /// finite.
    pub retries: u32,
    pub lossy: bool,
    pub fault: Option<Fault>,
}

impl Sender {
    fn val_msg(&self) -> Envelope<AckMsg> {
        Envelope::new(
            self.id,
            self.dst,
            AckMsg::Val {
                v: self.val,
                lossy: self.lossy,
            },
        )
    }

    fn handle(&mut self, msg: &Envelope<AckMsg>) -> Emit<AckMsg> {
        match msg.payload {
            AckMsg::Timer => {
                let mut out = Emit::new();
                if !self.ack && self.retries > 0 {
                    self.retries -= 1;
                    out.push(self.val_msg());
                    if self.retries > 0 {
                        out.push(Envelope::new(self.id, self.id, AckMsg::Timer));
                    }
                }
                out
            }
            AckMsg::Ack => {
                self.ack = true;
                Emit::new()
            }
            AckMsg::Val { .. } => {
                self.fault = Some(Fault::UnhandledMessage);
                Emit::new()
            }
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Receiver {
    pub id: MachineId,
    /// The last value received, if any.
    pub val: Option<i64>,
    pub fault: Option<Fault>,
}

impl Receiver {
    fn handle(&mut self, msg: &Envelope<AckMsg>) -> Emit<AckMsg> {
        match msg.payload {
            AckMsg::Val { v, .. } => {
                self.val = Some(v);
                smallvec![Envelope::new(self.id, msg.src, AckMsg::Ack)]
            }
            AckMsg::Timer | AckMsg::Ack => {
                self.fault = Some(Fault::UnhandledMessage);
                Emit::new()
            }
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum AckMachine {
    Sender(Sender),
    Receiver(Receiver),
}

impl AckMachine {
    pub fn sender(&self) -> Option<&Sender> {
        match self {
            AckMachine::Sender(s) => Some(s),
            _ => None,
        }
    }

    pub fn receiver(&self) -> Option<&Receiver> {
        match self {
            AckMachine::Receiver(r) => Some(r),
            _ => None,
        }
    }
}

impl Machine for AckMachine {
    type Payload = AckMsg;

    fn id(&self) -> MachineId {
        match self {
            AckMachine::Sender(s) => s.id,
            AckMachine::Receiver(r) => r.id,
        }
    }

    fn on_startup(&mut self) -> Emit<AckMsg> {
        match self {
            AckMachine::Sender(s) => {
                let mut out = smallvec![s.val_msg()];
                if s.retries > 0 {
                    out.push(Envelope::new(s.id, s.id, AckMsg::Timer));
                }
                out
            }
            AckMachine::Receiver(_) => Emit::new(),
        }
    }

    fn handle(&mut self, msg: &Envelope<AckMsg>) -> Emit<AckMsg> {
        match self {
            AckMachine::Sender(s) => s.handle(msg),
            AckMachine::Receiver(r) => r.handle(msg),
        }
    }

    fn logical_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (AckMachine::Sender(a), AckMachine::Sender(b)) => a
                .val
                .cmp(&b.val)
                .then_with(|| a.ack.cmp(&b.ack))
                .then_with(|| a.retries.cmp(&b.retries))
                .then_with(|| a.lossy.cmp(&b.lossy))
                .then_with(|| a.fault.cmp(&b.fault)),
            (AckMachine::Receiver(a), AckMachine::Receiver(b)) => {
                a.val.cmp(&b.val).then_with(|| a.fault.cmp(&b.fault))
            }
            (AckMachine::Sender(_), AckMachine::Receiver(_)) => Ordering::Less,
            (AckMachine::Receiver(_), AckMachine::Sender(_)) => Ordering::Greater,
        }
    }

    fn fault(&self) -> Option<Fault> {
        match self {
            AckMachine::Sender(s) => s.fault,
            AckMachine::Receiver(r) => r.fault,
        }
    }
}

/// Sender at index 0, receiver at index 1.
pub fn machines(val: i64, retries: u32, lossy: bool) -> Vec<AckMachine> {
    vec![
        AckMachine::Sender(Sender {
            id: 0,
            dst: 1,
            val,
            ack: false,
            retries,
            lossy,
            fault: None,
        }),
        AckMachine::Receiver(Receiver {
            id: 1,
            val: None,
            fault: None,
        }),
    ]
}

/// Anything received matches the transmitted value, and an acknowledged
/// sender implies the receiver actually holds it.
pub fn invariants(val: i64) -> Vec<Predicate<AckMachine>> {
    vec![Predicate::new(
        "acknowledged value matches",
        move |s: &SystemState<AckMachine>| {
            let sender = s.machines[0].sender().expect("sender at index 0");
            let receiver = s.machines[1].receiver().expect("receiver at index 1");
            let received_ok = receiver.val.is_none() || receiver.val == Some(val);
            let acked_ok = !sender.ack || receiver.val == Some(val);
            received_ok && acked_ok
        },
    )]
}

//! Tiny fixture protocol shared by the unit tests: echo machines that
//! answer pings with pongs and fault on anything they do not understand.

use crate::machine::{Emit, Fault, Machine};
use crate::message::{Envelope, MachineId, Payload};
use smallvec::smallvec;
use std::cmp::Ordering;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Probe {
    Ping,
    Pong,
    /// Deliberately ignored; handling it changes nothing.
    Nudge,
    /// Deliberately unhandled; delivery records a fault.
    Halt,
}

impl Payload for Probe {
    fn may_drop(&self) -> bool {
        matches!(self, Probe::Ping | Probe::Nudge)
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Echo {
    pub id: MachineId,
    pub peer: MachineId,
    pub opening: Option<Probe>,
    pub pings: u32,
    pub pongs: u32,
    pub fault: Option<Fault>,
}

impl Echo {
    pub fn new(id: MachineId, peer: MachineId, opening: Option<Probe>) -> Self {
        Self {
            id,
            peer,
            opening,
            pings: 0,
            pongs: 0,
            fault: None,
        }
    }
}

impl Machine for Echo {
    type Payload = Probe;

    fn id(&self) -> MachineId {
        self.id
    }

    fn on_startup(&mut self) -> Emit<Probe> {
        match self.opening {
            Some(p) => smallvec![Envelope::new(self.id, self.peer, p)],
            None => Emit::new(),
        }
    }

    fn handle(&mut self, msg: &Envelope<Probe>) -> Emit<Probe> {
        match msg.payload {
            Probe::Ping => {
                self.pings += 1;
                smallvec![Envelope::new(self.id, msg.src, Probe::Pong)]
            }
            Probe::Pong => {
                self.pongs += 1;
                Emit::new()
            }
            Probe::Nudge => Emit::new(),
            Probe::Halt => {
                self.fault = Some(Fault::UnhandledMessage);
                Emit::new()
            }
        }
    }

    fn logical_cmp(&self, other: &Self) -> Ordering {
        self.opening
            .cmp(&other.opening)
            .then_with(|| self.pings.cmp(&other.pings))
            .then_with(|| self.pongs.cmp(&other.pongs))
            .then_with(|| self.fault.cmp(&other.fault))
    }

    fn fault(&self) -> Option<Fault> {
        self.fault
    }
}

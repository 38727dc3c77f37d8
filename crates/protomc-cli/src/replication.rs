//! N-way replication: a client streams data items at a server, the server
//! fans each item out to its replica nodes, and the nodes confirm over a
//! self-timed sync channel. The client only advances once every node holds
//! the current item.

use protomc::{Emit, Envelope, Fault, Machine, MachineId, Payload, Predicate, SystemState};
use smallvec::smallvec;
use std::cmp::Ordering;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ReplMsg {
    /// Node-local timer driving the sync channel.
    Timer,
    /// Client hands the server the next item.
    Store { data: u64 },
    /// Server fans an item out to a node.
    Replicate { data: u64 },
    /// Node reports its log length to the server.
    Sync { len: usize },
    /// Server confirms full replication to the client.
    Ack,
}

impl Payload for ReplMsg {
    fn may_drop(&self) -> bool {
        false
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Client {
    pub id: MachineId,
    pub server: MachineId,
    pub data: Vec<u64>,
    /// Next item to send; everything before it is fully replicated.
    pub index: usize,
    pub fault: Option<Fault>,
}

impl Client {
    fn handle(&mut self, msg: &Envelope<ReplMsg>) -> Emit<ReplMsg> {
        match msg.payload {
            ReplMsg::Ack => {
                self.index += 1;
                if self.index < self.data.len() {
                    smallvec![Envelope::new(
                        self.id,
                        self.server,
                        ReplMsg::Store {
                            data: self.data[self.index],
                        },
                    )]
                } else {
                    Emit::new()
                }
            }
            _ => {
                self.fault = Some(Fault::UnhandledMessage);
                Emit::new()
            }
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Server {
    pub id: MachineId,
    pub client: MachineId,
    pub first_node: MachineId,
    pub nodes: usize,
    /// Index of the item currently being replicated; -1 before the first.
    pub index: i64,
    pub data: u64,
    /// Which nodes confirmed the current item.
    pub reps: Vec<bool>,
    pub fault: Option<Fault>,
}

impl Server {
    fn handle(&mut self, msg: &Envelope<ReplMsg>) -> Emit<ReplMsg> {
        match msg.payload {
            ReplMsg::Store { data } => {
                self.reps.iter_mut().for_each(|r| *r = false);
                self.index += 1;
                self.data = data;
                (0..self.nodes)
                    .map(|i| {
                        Envelope::new(self.id, self.first_node + i, ReplMsg::Replicate { data })
                    })
                    .collect()
            }
            ReplMsg::Sync { len } => {
                if (len as i64) < self.index {
                    // The node is behind; replicate the current item again.
                    smallvec![Envelope::new(
                        self.id,
                        msg.src,
                        ReplMsg::Replicate { data: self.data },
                    )]
                } else {
                    self.reps[msg.src - self.first_node] = true;
                    if self.reps.iter().all(|r| *r) {
                        smallvec![Envelope::new(self.id, self.client, ReplMsg::Ack)]
                    } else {
                        Emit::new()
                    }
                }
            }
            _ => {
                self.fault = Some(Fault::UnhandledMessage);
                Emit::new()
            }
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Node {
    pub id: MachineId,
    pub server: MachineId,
    pub timer: bool,
    pub log: Vec<u64>,
    pub fault: Option<Fault>,
}

impl Node {
    fn handle(&mut self, msg: &Envelope<ReplMsg>) -> Emit<ReplMsg> {
        match msg.payload {
            ReplMsg::Replicate { data } => {
                self.log.push(data);
                if !self.timer {
                    self.timer = true;
                    smallvec![Envelope::new(self.id, self.id, ReplMsg::Timer)]
                } else {
                    Emit::new()
                }
            }
            ReplMsg::Timer => {
                self.timer = false;
                smallvec![Envelope::new(
                    self.id,
                    self.server,
                    ReplMsg::Sync { len: self.log.len() },
                )]
            }
            _ => {
                self.fault = Some(Fault::UnhandledMessage);
                Emit::new()
            }
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum ReplMachine {
    Client(Client),
    Server(Server),
    Node(Node),
}

impl ReplMachine {
    pub fn client(&self) -> Option<&Client> {
        match self {
            ReplMachine::Client(c) => Some(c),
            _ => None,
        }
    }

    pub fn node(&self) -> Option<&Node> {
        match self {
            ReplMachine::Node(n) => Some(n),
            _ => None,
        }
    }
}

impl Machine for ReplMachine {
    type Payload = ReplMsg;

    fn id(&self) -> MachineId {
        match self {
            ReplMachine::Client(c) => c.id,
            ReplMachine::Server(s) => s.id,
            ReplMachine::Node(n) => n.id,
        }
    }

    fn on_startup(&mut self) -> Emit<ReplMsg> {
        match self {
            ReplMachine::Client(c) => {
                smallvec![Envelope::new(
                    c.id,
                    c.server,
                    ReplMsg::Store { data: c.data[0] },
                )]
            }
            _ => Emit::new(),
        }
    }

    fn handle(&mut self, msg: &Envelope<ReplMsg>) -> Emit<ReplMsg> {
        match self {
            ReplMachine::Client(c) => c.handle(msg),
            ReplMachine::Server(s) => s.handle(msg),
            ReplMachine::Node(n) => n.handle(msg),
        }
    }

    fn logical_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ReplMachine::Client(a), ReplMachine::Client(b)) => a
                .data
                .cmp(&b.data)
                .then_with(|| a.index.cmp(&b.index))
                .then_with(|| a.fault.cmp(&b.fault)),
            (ReplMachine::Server(a), ReplMachine::Server(b)) => a
                .index
                .cmp(&b.index)
                .then_with(|| a.data.cmp(&b.data))
                .then_with(|| a.reps.iter().filter(|r| **r).count().cmp(
                    &b.reps.iter().filter(|r| **r).count(),
                ))
                .then_with(|| a.fault.cmp(&b.fault)),
            (ReplMachine::Node(a), ReplMachine::Node(b)) => a
                .log
                .cmp(&b.log)
                .then_with(|| a.timer.cmp(&b.timer))
                .then_with(|| a.fault.cmp(&b.fault)),
            (ReplMachine::Client(_), _) => Ordering::Less,
            (_, ReplMachine::Client(_)) => Ordering::Greater,
            (ReplMachine::Server(_), _) => Ordering::Less,
            (_, ReplMachine::Server(_)) => Ordering::Greater,
        }
    }

    fn fault(&self) -> Option<Fault> {
        match self {
            ReplMachine::Client(c) => c.fault,
            ReplMachine::Server(s) => s.fault,
            ReplMachine::Node(n) => n.fault,
        }
    }
}

/// Client at 0, server at 1, nodes at 2..2+n.
pub fn machines(nodes: usize, data: Vec<u64>) -> Vec<ReplMachine> {
    assert!(!data.is_empty(), "the client needs at least one item to send");
    let mut out = vec![
        ReplMachine::Client(Client {
            id: 0,
            server: 1,
            data,
            index: 0,
            fault: None,
        }),
        ReplMachine::Server(Server {
            id: 1,
            client: 0,
            first_node: 2,
            nodes,
            index: -1,
            data: 0,
            reps: vec![false; nodes],
            fault: None,
        }),
    ];
    for i in 0..nodes {
        out.push(ReplMachine::Node(Node {
            id: 2 + i,
            server: 1,
            timer: false,
            log: Vec::new(),
            fault: None,
        }));
    }
    out
}

/// Deterministic demo payload for `rounds` items.
pub fn demo_data(rounds: usize) -> Vec<u64> {
    (0..rounds as u64).map(|i| 0xD0 + i).collect()
}

/// Everything the client considers delivered is present in every node's
/// log, item for item.
pub fn invariants() -> Vec<Predicate<ReplMachine>> {
    vec![Predicate::new(
        "acknowledged prefixes are replicated",
        |s: &SystemState<ReplMachine>| {
            let client = s.machines[0].client().expect("client at index 0");
            s.machines.iter().filter_map(|m| m.node()).all(|node| {
                (0..client.index).all(|i| node.log.get(i) == Some(&client.data[i]))
            })
        },
    )]
}

//! Explicit-state model checking for asynchronous message-passing
//! protocols.
//!
//! A protocol is a finite set of [`Machine`]s that communicate only
//! through messages. The checker enumerates every configuration reachable
//! under an adversarial network (messages reordered at will and, where a
//! payload permits, silently dropped) and verifies a set of named
//! [`Predicate`]s in every one of them. When an invariant fails, the
//! causal chain of deliveries and drops that led there is reported.
//!
//! ```
//! use protomc::{Emit, Envelope, Machine, MachineId, Model, Payload, Predicate, RunConfig};
//! use smallvec::smallvec;
//! use std::cmp::Ordering;
//!
//! #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
//! enum Wire { Token }
//! impl Payload for Wire {
//!     fn may_drop(&self) -> bool { false }
//! }
//!
//! #[derive(Clone, PartialEq, Eq, Hash, Debug)]
//! struct Relay { id: MachineId, next: MachineId, holding: bool }
//!
//! impl Machine for Relay {
//!     type Payload = Wire;
//!     fn id(&self) -> MachineId { self.id }
//!     fn on_startup(&mut self) -> Emit<Wire> {
//!         if self.id == 0 { smallvec![Envelope::new(self.id, self.next, Wire::Token)] }
//!         else { Emit::new() }
//!     }
//!     fn handle(&mut self, _msg: &Envelope<Wire>) -> Emit<Wire> {
//!         self.holding = true;
//!         Emit::new()
//!     }
//!     fn logical_cmp(&self, other: &Self) -> Ordering {
//!         self.holding.cmp(&other.holding)
//!     }
//! }
//!
//! let machines = vec![
//!     Relay { id: 0, next: 1, holding: false },
//!     Relay { id: 1, next: 0, holding: false },
//! ];
//! let mut model = Model::new(machines, vec![Predicate::new("token conserved", |s| {
//!     s.messages.len() + s.machines.iter().filter(|m| m.holding).count() >= 1
//! })]);
//! let terminating = model.run(&RunConfig::default()).unwrap();
//! assert!(terminating.iter().all(|s| s.messages.is_empty()));
//! ```

pub mod canonical;
pub mod diff;
pub mod explorer;
pub mod machine;
pub mod message;
pub mod predicate;
pub mod state;
pub mod store;

#[cfg(test)]
mod testutil;

pub use canonical::CanonicalState;
pub use diff::{Diff, Step};
pub use explorer::{generate_successors, Model, ModelError, ModelResult, RunConfig};
pub use machine::{Emit, Fault, Machine};
pub use message::{Envelope, MachineId, Payload};
pub use predicate::Predicate;
pub use state::SystemState;
pub use store::StateStore;

//! Named predicates over system states.

use crate::machine::Machine;
use crate::state::SystemState;

/// A named boolean function over a state. Used in two roles: as an
/// invariant (must hold in every visited state) or as an interesting-state
/// probe (a match redirects the search to that state).
pub struct Predicate<M: Machine> {
    pub name: String,
    check: Box<dyn Fn(&SystemState<M>) -> bool>,
}

impl<M: Machine> Predicate<M> {
    pub fn new(
        name: impl Into<String>,
        check: impl Fn(&SystemState<M>) -> bool + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            check: Box::new(check),
        }
    }

    pub fn holds(&self, state: &SystemState<M>) -> bool {
        (self.check)(state)
    }

    /// The built-in invariant every model carries: no machine has recorded
    /// a fault.
    pub fn valid_messages() -> Self {
        Predicate::new("Valid messages", |s: &SystemState<M>| {
            s.machines.iter().all(|m| m.fault().is_none())
        })
    }
}

impl<M: Machine> std::fmt::Debug for Predicate<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predicate").field("name", &self.name).finish()
    }
}

//! Diffs: the causal record of a single search step.

use crate::message::{Envelope, Payload};
use std::fmt;
use std::rc::Rc;

/// What the network did to the message chosen at this step.
#[derive(Clone, Debug)]
pub enum Step<P> {
    /// The message was delivered to its destination.
    Delivered(Rc<Envelope<P>>),
    /// The message was silently discarded.
    Dropped(Rc<Envelope<P>>),
}

/// One step of causal history: the message delivered or dropped, and the
/// messages the receiving handler emitted in response. Diffs are shared by
/// every state whose history extends through them.
#[derive(Clone, Debug)]
pub struct Diff<P> {
    pub step: Step<P>,
    pub sent: Vec<Rc<Envelope<P>>>,
}

impl<P: Payload> Diff<P> {
    pub fn delivery(msg: Rc<Envelope<P>>, sent: Vec<Rc<Envelope<P>>>) -> Self {
        Self {
            step: Step::Delivered(msg),
            sent,
        }
    }

    pub fn drop(msg: Rc<Envelope<P>>) -> Self {
        Self {
            step: Step::Dropped(msg),
            sent: Vec::new(),
        }
    }
}

impl<P: Payload> fmt::Display for Diff<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.step {
            Step::Delivered(m) => write!(f, "deliver {}", m)?,
            Step::Dropped(m) => write!(f, "drop {}", m)?,
        }
        if !self.sent.is_empty() {
            write!(f, ", sent ")?;
            for (i, m) in self.sent.iter().enumerate() {
                if i > 0 {
                    write!(f, "; ")?;
                }
                write!(f, "{}", m)?;
            }
        }
        Ok(())
    }
}

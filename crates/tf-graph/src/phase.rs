//! Signal-timing phase.

use std::rc::Rc;

use tf_core::NodeId;

use crate::movement::Move;

/// One phase of a node's signal cycle: a set of concurrently permitted
/// movements plus red/yellow/green durations (seconds).
///
/// Immutable after load.  A node's phases partition its cycle; the node is a
/// signal node iff at least one phase has nonzero yellow AND nonzero red
/// (real signal control rather than free-flow or stop control).
#[derive(Debug)]
pub struct Phase {
    pub node:   NodeId,
    pub kind:   u32,
    pub seq:    u32,
    pub red:    u32,
    pub yellow: u32,
    pub green:  u32,
    /// Movements permitted during this phase.  Interned instances shared with
    /// the graph; deduplicated, input order.
    pub moves: Vec<Rc<Move>>,
}

impl Phase {
    /// Total duration of the phase.
    #[inline]
    pub fn total_time(&self) -> u32 {
        self.red + self.yellow + self.green
    }

    /// True if this phase represents real signal control.
    #[inline]
    pub fn is_signalized(&self) -> bool {
        self.yellow != 0 && self.red != 0
    }
}

//! Turning movement: a directed in-link → out-link pair through a node.

use std::cell::Cell;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::error::{GraphError, GraphResult};
use crate::link::Link;
use crate::node::Node;

/// A directed turning movement through an intersection.
///
/// Valid only if the inbound link's head is the outbound link's tail —
/// movements must be physically contiguous, and construction fails otherwise.
///
/// The graph interns exactly one `Move` per logical (in, out) pair, so the
/// `Cell` accumulators below always describe the single shared instance no
/// matter how many phases reference the movement.  The numerator/denominator
/// pair is zeroed and rebuilt on every turn-proportion pass.
#[derive(Debug)]
pub struct Move {
    pub in_link:  Rc<Link>,
    pub out_link: Rc<Link>,
    /// Fraction of the signal cycle this movement has green, assigned by the
    /// default green-split pass.
    active_green: Cell<f64>,
    /// Flow-weighted count of path flow continuing onto `out_link`.
    numerator: Cell<f64>,
    /// Flow-weighted count of all path flow arriving on `in_link`.
    denominator: Cell<f64>,
}

impl Move {
    pub fn new(in_link: Rc<Link>, out_link: Rc<Link>) -> GraphResult<Self> {
        if in_link.head != out_link.tail {
            return Err(GraphError::DisconnectedMove {
                in_link:  in_link.id,
                out_link: out_link.id,
            });
        }
        Ok(Self {
            in_link,
            out_link,
            active_green: Cell::new(0.0),
            numerator:    Cell::new(0.0),
            denominator:  Cell::new(0.0),
        })
    }

    /// The node this movement turns through (= `in_link.head`).
    #[inline]
    pub fn node(&self) -> &Rc<Node> {
        &self.in_link.head
    }

    pub fn active_green(&self) -> f64 {
        self.active_green.get()
    }

    pub(crate) fn set_active_green(&self, green: f64) {
        self.active_green.set(green);
    }

    pub fn numerator(&self) -> f64 {
        self.numerator.get()
    }

    pub fn denominator(&self) -> f64 {
        self.denominator.get()
    }

    pub(crate) fn reset_accumulators(&self) {
        self.numerator.set(0.0);
        self.denominator.set(0.0);
    }

    pub(crate) fn add_numerator(&self, flow: f64) {
        self.numerator.set(self.numerator.get() + flow);
    }

    pub(crate) fn add_denominator(&self, flow: f64) {
        self.denominator.set(self.denominator.get() + flow);
    }
}

impl PartialEq for Move {
    /// Delegates to the links' geometric equality.
    fn eq(&self, other: &Self) -> bool {
        self.in_link == other.in_link && self.out_link == other.out_link
    }
}

impl Eq for Move {}

impl Hash for Move {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.in_link.hash(state);
        self.out_link.hash(state);
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Move<N{}><N{}><N{}>",
            self.in_link.tail.id.0,
            self.in_link.head.id.0,
            self.out_link.head.id.0
        )
    }
}

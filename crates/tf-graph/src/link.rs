//! Directed link between two nodes.

use std::hash::{Hash, Hasher};
use std::rc::Rc;

use tf_core::LinkId;

use crate::node::Node;

/// Input type code for an ordinary road link.
pub const LINK_TYPE_ROAD: u32 = 100;
/// Input type code for a centroid connector.
pub const LINK_TYPE_CONNECTOR: u32 = 1000;

/// What a link represents in the network.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LinkKind {
    /// A physical road segment.
    Road,
    /// A synthetic connector joining a zone centroid to the road network.
    /// Never traversed except as the first or last hop of a path.
    CentroidConnector,
}

impl LinkKind {
    /// Map an input-file type code to a kind.  Code 1000 is a centroid
    /// connector; every other code is an ordinary road link.
    pub fn from_code(code: u32) -> Self {
        if code == LINK_TYPE_CONNECTOR { LinkKind::CentroidConnector } else { LinkKind::Road }
    }
}

/// A directed arc from `tail` to `head`.
///
/// Link identity is geometric, not nominal: equality and hashing key off the
/// (tail, head) endpoint pair, never the stored numeric id.  Two link records
/// connecting the same two physical points are the same link for set and
/// mapping purposes.  Path matching and turn-proportion keys rely on this
/// holding across re-loaded link sets.
#[derive(Debug)]
pub struct Link {
    pub id:   LinkId,
    pub kind: LinkKind,
    pub tail: Rc<Node>,
    pub head: Rc<Node>,
    /// Physical length, feet.
    pub length_ft: f64,
    /// Free-flow speed, miles per hour.
    pub ffspd_mph: f64,
    /// Backward congestion-wave speed, miles per hour.
    pub wave_mph: f64,
    /// Capacity, vehicles per hour.
    pub capacity: f64,
    pub lanes: u32,
}

impl Link {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: LinkId,
        kind: LinkKind,
        tail: Rc<Node>,
        head: Rc<Node>,
        length_ft: f64,
        ffspd_mph: f64,
        wave_mph: f64,
        capacity: f64,
        lanes: u32,
    ) -> Self {
        Self { id, kind, tail, head, length_ft, ffspd_mph, wave_mph, capacity, lanes }
    }

    /// True if this link is a centroid connector.
    #[inline]
    pub fn is_connector(&self) -> bool {
        self.kind == LinkKind::CentroidConnector
    }

    /// True if `other` connects the same two endpoints in the opposite
    /// direction (an immediate U-turn candidate).
    pub fn is_reverse_of(&self, other: &Link) -> bool {
        self.head == other.tail && self.tail == other.head
    }
}

impl PartialEq for Link {
    fn eq(&self, other: &Self) -> bool {
        self.tail == other.tail && self.head == other.head
    }
}

impl Eq for Link {}

impl Hash for Link {
    /// Endpoint coordinates only, consistent with geometric equality.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tail.pos.hash(state);
        self.head.pos.hash(state);
    }
}

impl std::fmt::Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Link=({}, {})>", self.tail.id.0, self.head.id.0)
    }
}

//! Network node: a physical intersection or a zone centroid.

use std::cell::Cell;
use std::hash::{Hash, Hasher};

use tf_core::{NodeId, Point3};

/// Input type code for an ordinary intersection node.
pub const NODE_TYPE_INTERSECTION: u32 = 100;
/// Input type code for a traffic-analysis-zone centroid.
pub const NODE_TYPE_ZONE: u32 = 1000;

/// What a node represents in the network.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum NodeKind {
    /// A physical intersection (or mid-block node).
    Intersection,
    /// A traffic-analysis zone centroid: an aggregate origin/destination,
    /// not a physical place vehicles pass through.
    Zone,
}

impl NodeKind {
    /// Map an input-file type code to a kind.  Code 1000 is a zone centroid;
    /// every other code is an ordinary intersection.
    pub fn from_code(code: u32) -> Self {
        if code == NODE_TYPE_ZONE { NodeKind::Zone } else { NodeKind::Intersection }
    }
}

/// A point in the network with a stable identity.
///
/// Identity is geometric: equality requires the same coordinates (tie-broken
/// by id), and hashing uses the coordinates alone.  Nodes are shared across
/// the graph via `Rc` and are immutable after load except for the
/// external-control flag.
#[derive(Debug)]
pub struct Node {
    pub id:   NodeId,
    pub kind: NodeKind,
    pub pos:  Point3,
    /// Whether external control logic has been attached to this node by a
    /// downstream collaborator.  Per-run bookkeeping, not part of identity.
    control_attached: Cell<bool>,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind, pos: Point3) -> Self {
        Self { id, kind, pos, control_attached: Cell::new(false) }
    }

    /// True if this node is a zone centroid.
    #[inline]
    pub fn is_zone(&self) -> bool {
        self.kind == NodeKind::Zone
    }

    pub fn control_attached(&self) -> bool {
        self.control_attached.get()
    }

    pub fn set_control_attached(&self, attached: bool) {
        self.control_attached.set(attached);
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos && self.id == other.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    /// Coordinate-based, so nodes at the same location collide into the same
    /// bucket and the id tie-break in `eq` decides.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pos.hash(state);
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Node={}>", self.id.0)
    }
}

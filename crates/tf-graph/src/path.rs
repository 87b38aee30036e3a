//! Assigned O-D path: an ordered sequence of links with a flow proportion.

use std::rc::Rc;

use tf_core::PathId;

use crate::error::{GraphError, GraphResult};
use crate::link::Link;
use crate::node::Node;

/// One assigned route between an origin and a destination zone.
///
/// Immutable after load.  `proportion` is the fraction of the O-D pair's
/// total demand following this path; `flow` is the absolute value
/// (proportion × demand), set exactly once right after construction.
#[derive(Debug)]
pub struct Path {
    pub id: PathId,
    links: Vec<Rc<Link>>,
    pub proportion: f64,
    flow: f64,
}

impl Path {
    /// Build a path, verifying that the declared link count matches the
    /// number of links supplied.
    pub fn new(
        id: PathId,
        links: Vec<Rc<Link>>,
        proportion: f64,
        declared_links: usize,
    ) -> GraphResult<Self> {
        if links.len() != declared_links || links.is_empty() {
            return Err(GraphError::PathLengthMismatch {
                path:     id,
                declared: declared_links,
                actual:   links.len(),
            });
        }
        Ok(Self { id, links, proportion, flow: 0.0 })
    }

    /// Absolute flow on this path (proportion × O-D demand).
    #[inline]
    pub fn flow(&self) -> f64 {
        self.flow
    }

    pub(crate) fn set_flow(&mut self, flow: f64) {
        self.flow = flow;
    }

    /// Origin zone: the first link's tail.
    #[inline]
    pub fn origin(&self) -> &Rc<Node> {
        &self.links[0].tail
    }

    /// Destination zone: the last link's head.
    #[inline]
    pub fn destination(&self) -> &Rc<Node> {
        &self.links[self.links.len() - 1].head
    }

    #[inline]
    pub fn links(&self) -> &[Rc<Link>] {
        &self.links
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Index of `link` in this path (geometric link equality), or `None` if
    /// the path does not traverse it.
    pub fn position_of(&self, link: &Link) -> Option<usize> {
        self.links.iter().position(|l| l.as_ref() == link)
    }

    /// Link at position `i`, if any.
    #[inline]
    pub fn get(&self, i: usize) -> Option<&Rc<Link>> {
        self.links.get(i)
    }

    /// Iterator over consecutive (upstream, downstream) link pairs.
    pub fn hops(&self) -> impl Iterator<Item = (&Rc<Link>, &Rc<Link>)> {
        self.links.windows(2).map(|w| (&w[0], &w[1]))
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Path<{}>", self.id.0)
    }
}

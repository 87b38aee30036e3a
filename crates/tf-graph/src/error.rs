//! Graph-subsystem error type.
//!
//! Everything here is fatal for the run: the model is a deterministic batch
//! computation, and continuing with a partially built or inconsistent network
//! would produce silently wrong engineering results.  There is deliberately
//! no retry or degradation path.

use thiserror::Error;

use tf_core::{LinkId, NodeId, PathId};

/// Errors produced by `tf-graph`.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node {0} not found in network")]
    NodeNotFound(NodeId),

    #[error("link {0} not found in network")]
    LinkNotFound(LinkId),

    #[error("node {0} is not a zone centroid")]
    ZoneNotFound(NodeId),

    #[error("no link from {tail} to {head}")]
    NoLinkBetween { tail: NodeId, head: NodeId },

    /// A movement's links do not meet at a common node.
    #[error("links {in_link} and {out_link} are not connected head-to-tail")]
    DisconnectedMove { in_link: LinkId, out_link: LinkId },

    /// A path record declared a different link count than it supplied.
    #[error("path {path} declares {declared} links but supplies {actual}")]
    PathLengthMismatch {
        path:     PathId,
        declared: usize,
        actual:   usize,
    },

    /// A builder stage was invoked before the stage it depends on.
    #[error("{stage} requires {requires} to be loaded first")]
    NotYetLoaded {
        stage:    &'static str,
        requires: &'static str,
    },

    /// A phased node whose phase durations sum to zero has no defined
    /// green-time split.
    #[error("node {0} has phases but a zero cycle length")]
    ZeroCycleLength(NodeId),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for all graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

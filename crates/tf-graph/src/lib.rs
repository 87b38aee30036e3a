//! `tf-graph` — signalized road-network model and turn-proportion derivation.
//!
//! Builds a directed graph from tabular network inputs (nodes, links, signal
//! phases, O-D demand, assigned paths) and derives the per-movement flow
//! splits at every signalized intersection: exogenous entry-link demand and
//! turn proportions.  Downstream exporters consume the finished [`Graph`]
//! read-only.
//!
//! The model is static, batch, and single-threaded: entities are shared via
//! `Rc`, loaded once, and immutable afterwards apart from the explicit
//! turn-proportion recomputation (which takes `&mut Graph`).
//!
//! # Crate layout
//!
//! | Module       | Contents                                                |
//! |--------------|---------------------------------------------------------|
//! | [`graph`]    | `Graph`, `GraphBuilder`, `SearchBudget`                 |
//! | [`node`]     | `Node`, `NodeKind`                                      |
//! | [`link`]     | `Link`, `LinkKind`                                      |
//! | [`movement`] | `Move` (turning movement with flow accumulators)        |
//! | [`phase`]    | `Phase` (signal-timing phase)                           |
//! | [`path`]     | `Path` (assigned O-D route)                             |
//! | [`loader`]   | record structs and flat-file readers                    |
//! | [`error`]    | `GraphError`, `GraphResult<T>`                          |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                               |
//! |---------|------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on tf-core types.  |

pub mod error;
pub mod graph;
pub mod link;
pub mod loader;
pub mod movement;
pub mod node;
pub mod path;
pub mod phase;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{GraphError, GraphResult};
pub use graph::{Graph, GraphBuilder, MoveKey, OdPair, SearchBudget};
pub use link::{Link, LinkKind};
pub use loader::{
    load_graph, read_records_from_dir, LinkRecord, NetworkRecords, NodeRecord, OdRecord,
    PathRecord, PhaseRecord,
};
pub use movement::Move;
pub use node::{Node, NodeKind};
pub use path::Path;
pub use phase::Phase;

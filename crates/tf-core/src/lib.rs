//! `tf-core` — foundational types for the `turnflow` network model.
//!
//! This crate is a dependency of every other `tf-*` crate.  It has no
//! `tf-*` dependencies and no required external ones (only optional `serde`).
//!
//! # What lives here
//!
//! | Module    | Contents                          |
//! |-----------|-----------------------------------|
//! | [`ids`]   | `NodeId`, `LinkId`, `PathId`      |
//! | [`point`] | `Point3` (bitwise-hashable coord) |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                              |
//! |---------|-----------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types. |

pub mod ids;
pub mod point;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use ids::{LinkId, NodeId, PathId};
pub use point::Point3;

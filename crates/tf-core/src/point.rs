//! 3-D coordinate primitive.
//!
//! Network identity in this model is geometric: two nodes are the same entity
//! only if they occupy the same location, and link identity keys off the
//! coordinates of both endpoints.  `Point3` therefore implements `Eq` and
//! `Hash` bitwise (`f64::to_bits`), giving a total equivalence suitable for
//! map and set keys.  Coordinates come straight from the input files, so the
//! bitwise quirks (`-0.0 != 0.0`, `NaN == NaN`) never arise in practice.

use std::hash::{Hash, Hasher};

/// A point in 3-D space, double precision.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Bit pattern of the three components — the identity key used by
    /// `Eq`/`Hash`.
    #[inline]
    pub fn bits(self) -> (u64, u64, u64) {
        (self.x.to_bits(), self.y.to_bits(), self.z.to_bits())
    }
}

impl PartialEq for Point3 {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for Point3 {}

impl Hash for Point3 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

impl std::fmt::Display for Point3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

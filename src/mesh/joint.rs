//! Latch joints and the per-vertex sets that group them.
//!
//! When a vertex is shared by several cells, the topology builder gives each
//! cell its own copy ("version") of the point and ties every pair of versions
//! together with a latch joint. A latched joint makes its two endpoints act as
//! one point; an unlatched joint only pulls them together.

use rand::Rng;

use crate::config::LatchConfig;
use crate::vector::{self, Vector};

/// Breakable bond between two versions of the same logical vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct LatchJoint {
    pub index0: usize,
    pub index1: usize,
    /// Attraction at the inner distance and per-endpoint breaking force.
    pub max_force: f64,
    /// Bonding distance.
    pub inner_distance: f64,
    /// Distance beyond which the joint exerts no force.
    pub outer_distance: f64,
    /// Recomputed from scratch every tick.
    pub is_latched: bool,
    /// Tie-break signal for island resolution; has no physical meaning.
    pub random_bond_position: Vector,
}

impl LatchJoint {
    /// Create a latched joint using the shared latch parameters.
    pub fn new(
        index0: usize,
        index1: usize,
        config: &LatchConfig,
        random_bond_position: Vector,
    ) -> Self {
        Self {
            index0,
            index1,
            max_force: config.max_force,
            inner_distance: config.inner_distance,
            outer_distance: config.outer_distance,
            is_latched: true,
            random_bond_position,
        }
    }

    /// Both endpoint indices.
    #[inline]
    pub fn endpoints(&self) -> [usize; 2] {
        [self.index0, self.index1]
    }

    /// True when `index` is one of the endpoints.
    #[inline]
    pub fn touches(&self, index: usize) -> bool {
        self.index0 == index || self.index1 == index
    }

    /// Squared distance between the endpoints.
    #[inline]
    pub fn distance_squared(&self, positions: &[Vector]) -> f64 {
        (&positions[self.index1] - &positions[self.index0]).norm_squared()
    }

    /// Random-walk the tie-break position by at most `step`, staying within `radius`.
    pub fn walk_bond_position<R: Rng>(&mut self, step: f64, radius: f64, rng: &mut R) {
        let dimension = self.random_bond_position.len();
        if step > 0.0 {
            self.random_bond_position += vector::random_in_shell(dimension, 0.0, step, rng);
        }
        let len = self.random_bond_position.norm();
        if len > radius {
            self.random_bond_position *= radius / len;
        }
    }
}

/// All versions of one logical vertex and the joints connecting them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JointSet {
    /// Index the vertex had before duplication.
    pub original: usize,
    /// Every index standing for this vertex, `original` first.
    pub versions: Vec<usize>,
    /// Indices into the engine's joint list.
    pub joints: Vec<usize>,
}

impl JointSet {
    /// Number of versions of the vertex.
    #[inline]
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }
}

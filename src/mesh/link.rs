//! Edge links: spring constraints between two points of the arena.

use crate::vector::Vector;

/// Spring constraint with a fixed rest length.
///
/// Links reference the shared position arena by index and never own
/// position data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeLink {
    pub index0: usize,
    pub index1: usize,
    pub desired_length: f64,
}

impl EdgeLink {
    /// Create a link with an explicit rest length.
    #[inline]
    pub fn new(index0: usize, index1: usize, desired_length: f64) -> Self {
        Self {
            index0,
            index1,
            desired_length,
        }
    }

    /// Create a link whose rest length is the current distance between its endpoints.
    pub fn at_rest(positions: &[Vector], index0: usize, index1: usize) -> Self {
        let desired_length = (&positions[index1] - &positions[index0]).norm();
        Self::new(index0, index1, desired_length)
    }
}

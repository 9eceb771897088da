//! Error type shared by configuration, topology construction and the
//! external write channel.
//!
//! The per-tick simulation path never fails: degenerate geometry is zeroed
//! out where it occurs instead of being reported.

use std::ops::RangeInclusive;

use thiserror::Error;

/// Errors raised while configuring or building a latch mesh.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeshError {
    /// A configuration value is out of its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The cell decomposition cannot handle points of this dimension.
    #[error(
        "unsupported dimension {dimension} (supported: {}..={})",
        supported.start(),
        supported.end()
    )]
    UnsupportedDimension {
        dimension: usize,
        supported: RangeInclusive<usize>,
    },

    /// A vector does not match the dimension of the mesh.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// A point index does not address the position arena.
    #[error("point index {index} out of range (point count {count})")]
    PointOutOfRange { index: usize, count: usize },

    /// Topology construction needs at least one point.
    #[error("point set is empty")]
    EmptyPointSet,

    /// The write channel only accepts points designated as clickable.
    #[error("point {0} is not clickable")]
    NotClickable(usize),

    /// A dragged position has a NaN or infinite component.
    #[error("position for point {0} is not finite")]
    NonFinitePosition(usize),

    /// A cell edge joins a point to itself.
    #[error("cell {cell} has a degenerate edge on point {point}")]
    DegenerateCell { cell: usize, point: usize },
}

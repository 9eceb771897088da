//! Mesh data structures.
//!
//! Points live in one growable arena addressed by index. Edge links and latch
//! joints reference that arena; a vertex split across cells is tied together
//! only through its joint set, never through shared ownership.

mod engine;
mod joint;
mod link;
mod point;
pub mod topology;

pub use engine::{MeshEngine, TickReport};
pub use joint::{JointSet, LatchJoint};
pub use link::EdgeLink;
pub use point::PointState;
pub use topology::{Cell, CellSource, PrecomputedCells, StarCells, Topology};

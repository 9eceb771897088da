//! Per-tick force pipeline.
//!
//! Stages run in this order each tick:
//! 1. `spring`: edge link forces into a zeroed buffer
//! 2. `latch`: classify every joint against that buffer, then apply the
//!    deferred attractions of unlatched joints
//! 3. `island`: merge bonded groups through the `merge` primitive
//! 4. `integrator`: move every point no merge group claimed

pub mod integrator;
pub mod island;
pub mod latch;
pub mod merge;
pub mod spring;

pub use integrator::ForceStep;
pub use island::{ConsolidationOutcome, IslandResolution, SetKind};
pub use merge::Claims;

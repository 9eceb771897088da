//! MeshEngine - core latch mesh state and tick loop.
//!
//! The MeshEngine owns the position arena, the edge links and latch joints
//! built from a cell decomposition, per-point state flags, and the seeded
//! random source driving the joints' tie-break walk. External callers read
//! positions and joint states after each tick and may drag clickable points
//! between ticks.

use log::{trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::joint::{JointSet, LatchJoint};
use super::link::EdgeLink;
use super::point::PointState;
use super::topology::{self, CellSource, Topology};
use crate::config::SimulationConfig;
use crate::error::MeshError;
use crate::forces::{integrator, island, latch, spring, Claims, ForceStep, SetKind};
use crate::vector::{self, Vector};

/// Summary of one tick, returned to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// Measured length of every edge link, in link order.
    pub link_lengths: Vec<f64>,
    pub latched_joints: usize,
    pub unlatched_joints: usize,
    /// Merge groups applied across all split vertices.
    pub merge_groups: usize,
    /// Islands resolved in partially latched vertices.
    pub islands_resolved: usize,
    /// Islands that hit the binding pass limit.
    pub unconverged_islands: usize,
    /// Points moved individually by the integrator.
    pub integrated_points: usize,
}

/// The latch mesh simulation.
///
/// This struct manages:
/// - The position arena (original points followed by duplicates)
/// - Edge links and latch joints referencing the arena
/// - Joint sets grouping the versions of each split vertex
/// - Point state (clickable, pinned)
/// - The forces applied during the last tick
pub struct MeshEngine {
    /// Point positions, addressed by index.
    positions: Vec<Vector>,

    /// Displacement applied to each point in the last tick.
    forces: Vec<Vector>,

    /// Spring constraints.
    links: Vec<EdgeLink>,

    /// Link lengths measured in the last tick.
    link_lengths: Vec<f64>,

    /// Bonds between versions of split vertices.
    joints: Vec<LatchJoint>,

    /// One entry per split vertex.
    joint_sets: Vec<JointSet>,

    /// Point states (clickable, pinned).
    states: Vec<PointState>,

    /// Number of points before duplication.
    original_count: usize,

    /// Dimension of every vector in the arena.
    dimension: usize,

    config: SimulationConfig,

    /// Source of the tie-break random walk.
    rng: StdRng,
}

impl MeshEngine {
    /// Build a mesh from points and the cells a decomposition produces for them.
    pub fn from_cells<S>(
        points: Vec<Vector>,
        source: &S,
        config: SimulationConfig,
    ) -> Result<Self, MeshError>
    where
        S: CellSource + ?Sized,
    {
        config.validate()?;
        let original_count = points.len();
        let mut rng = StdRng::seed_from_u64(config.seed);
        let topology = topology::build_topology(points, source, &config.latch, &mut rng)?;
        Ok(Self::assemble(topology, original_count, config, rng))
    }

    fn assemble(
        topology: Topology,
        original_count: usize,
        config: SimulationConfig,
        rng: StdRng,
    ) -> Self {
        let Topology {
            positions,
            links,
            joints,
            joint_sets,
        } = topology;
        let dimension = positions.first().map_or(0, |p| p.len());
        let count = positions.len();
        let link_lengths = links.iter().map(|l| l.desired_length).collect();

        Self {
            forces: vec![vector::zeros(dimension); count],
            states: vec![PointState::new(); count],
            positions,
            links,
            link_lengths,
            joints,
            joint_sets,
            original_count,
            dimension,
            config,
            rng,
        }
    }

    // =========================================================================
    // Read Access
    // =========================================================================

    /// Number of points including duplicates.
    pub fn point_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of points before duplication.
    pub fn original_point_count(&self) -> usize {
        self.original_count
    }

    /// Dimension of the mesh.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn positions(&self) -> &[Vector] {
        &self.positions
    }

    /// Displacement applied to each point in the last tick.
    pub fn forces(&self) -> &[Vector] {
        &self.forces
    }

    pub fn links(&self) -> &[EdgeLink] {
        &self.links
    }

    /// Link lengths measured in the last tick (rest lengths before the first tick).
    pub fn link_lengths(&self) -> &[f64] {
        &self.link_lengths
    }

    pub fn joints(&self) -> &[LatchJoint] {
        &self.joints
    }

    pub fn joint_sets(&self) -> &[JointSet] {
        &self.joint_sets
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Latched flag of every joint, in joint order.
    pub fn latched_flags(&self) -> Vec<bool> {
        self.joints.iter().map(|j| j.is_latched).collect()
    }

    /// Positions flattened as [p0_0, p0_1, ..., p1_0, ...].
    pub fn positions_flat(&self) -> Vec<f64> {
        vector::flatten(&self.positions)
    }

    /// Per-axis (min, max) over all points.
    pub fn get_bounds(&self) -> Option<(Vector, Vector)> {
        let first = self.positions.first()?;
        let mut min = first.clone();
        let mut max = first.clone();
        for p in &self.positions[1..] {
            min = min.inf(p);
            max = max.sup(p);
        }
        Some((min, max))
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Replace the configuration, pushing latch parameters to every joint.
    ///
    /// The random walk keeps its current state; the seed only applies at build time.
    pub fn set_config(&mut self, config: SimulationConfig) -> Result<(), MeshError> {
        config.validate()?;
        for joint in &mut self.joints {
            joint.max_force = config.latch.max_force;
            joint.inner_distance = config.latch.inner_distance;
            joint.outer_distance = config.latch.outer_distance;
        }
        self.config = config;
        Ok(())
    }

    // =========================================================================
    // Write Channel
    // =========================================================================

    /// Allow or forbid drag input on a point.
    pub fn set_clickable(&mut self, index: usize, clickable: bool) -> Result<(), MeshError> {
        let count = self.states.len();
        let state = self
            .states
            .get_mut(index)
            .ok_or(MeshError::PointOutOfRange { index, count })?;
        state.set_clickable(clickable);
        if !clickable {
            state.set_pinned(false);
        }
        Ok(())
    }

    /// Check if a point accepts drag input.
    pub fn is_clickable(&self, index: usize) -> bool {
        self.states.get(index).is_some_and(|s| s.is_clickable())
    }

    /// Check if a point is pinned for the next tick.
    pub fn is_pinned(&self, index: usize) -> bool {
        self.states.get(index).is_some_and(|s| s.is_pinned())
    }

    /// Move a clickable point and hold it there during the next tick.
    pub fn drag_point(&mut self, index: usize, position: Vector) -> Result<(), MeshError> {
        let count = self.states.len();
        let state = self
            .states
            .get_mut(index)
            .ok_or(MeshError::PointOutOfRange { index, count })?;
        if !state.is_clickable() {
            return Err(MeshError::NotClickable(index));
        }
        if position.len() != self.dimension {
            return Err(MeshError::DimensionMismatch {
                expected: self.dimension,
                found: position.len(),
            });
        }
        if !vector::is_finite(&position) {
            return Err(MeshError::NonFinitePosition(index));
        }
        state.set_pinned(true);
        self.positions[index] = position;
        Ok(())
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    /// Advance the simulation by `elapsed_seconds` using the engine's own random source.
    pub fn tick(&mut self, elapsed_seconds: f64) -> TickReport {
        let mut rng = self.rng.clone();
        let report = self.tick_with_rng(elapsed_seconds, &mut rng);
        self.rng = rng;
        report
    }

    /// Advance the simulation by `elapsed_seconds` using `rng` for the tie-break walk.
    pub fn tick_with_rng<R: Rng>(&mut self, elapsed_seconds: f64, rng: &mut R) -> TickReport {
        let elapsed = if elapsed_seconds.is_finite() {
            elapsed_seconds.max(0.0)
        } else {
            0.0
        };
        let config = self.config;

        for joint in &mut self.joints {
            joint.walk_bond_position(
                config.latch.bond_walk_step,
                config.latch.bond_walk_radius,
                rng,
            );
        }

        let mut forces = vec![vector::zeros(self.dimension); self.positions.len()];
        let link_lengths = spring::accumulate_spring_forces(
            &self.links,
            &self.positions,
            &config.spring,
            &mut forces,
        );

        let deferred = latch::classify_joints(&mut self.joints, &self.positions, &forces);
        latch::apply_deferred(&deferred, &mut forces);

        let pinned: Vec<bool> = self.states.iter().map(|s| s.is_pinned()).collect();
        let mut claims = Claims::new(self.positions.len());
        let bonded = ForceStep::bonded(&config.integrator, elapsed);

        let mut report = TickReport::default();
        for set in &self.joint_sets {
            let outcome = island::consolidate_joint_set(
                set,
                &self.joints,
                &mut self.positions,
                &mut forces,
                &pinned,
                &bonded,
                &config.island,
                &mut claims,
            );
            report.merge_groups += outcome.merge_groups;
            report.islands_resolved += outcome.islands;
            report.unconverged_islands += outcome.unconverged_islands;
            if outcome.kind == SetKind::Mixed {
                trace!("vertex {}: {} islands", set.original, outcome.islands);
            }
        }

        let free = ForceStep::free(&config.integrator, elapsed);
        report.integrated_points = integrator::integrate_unclaimed(
            &mut self.positions,
            &mut forces,
            &pinned,
            &claims,
            &free,
        );

        if report.unconverged_islands > 0 {
            warn!(
                "{} island(s) hit the {}-pass binding limit; applied partial groups",
                report.unconverged_islands, config.island.max_passes
            );
        }

        for state in &mut self.states {
            state.set_pinned(false);
        }

        report.latched_joints = self.joints.iter().filter(|j| j.is_latched).count();
        report.unlatched_joints = self.joints.len() - report.latched_joints;
        report.link_lengths = link_lengths.clone();
        trace!(
            "tick {:.4}s: {} latched, {} unlatched, {} merge groups",
            elapsed, report.latched_joints, report.unlatched_joints, report.merge_groups
        );

        self.forces = forces;
        self.link_lengths = link_lengths;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::PrecomputedCells;

    fn p2(x: f64, y: f64) -> Vector {
        Vector::from_vec(vec![x, y])
    }

    /// Two segments sharing point 1: one latch joint between 1 and its copy 3.
    fn hinge() -> MeshEngine {
        let points = vec![p2(-1.0, 0.0), p2(0.0, 0.0), p2(1.0, 0.0)];
        let cells = PrecomputedCells::from_simplices(&[vec![0, 1], vec![1, 2]]);
        MeshEngine::from_cells(points, &cells, SimulationConfig::default()).unwrap()
    }

    #[test]
    fn test_build_counts() {
        let engine = hinge();
        assert_eq!(engine.original_point_count(), 3);
        assert_eq!(engine.point_count(), 4);
        assert_eq!(engine.dimension(), 2);
        assert_eq!(engine.links().len(), 2);
        assert_eq!(engine.joints().len(), 1);
        assert_eq!(engine.joints()[0].endpoints(), [1, 3]);
        assert_eq!(engine.latched_flags(), vec![true]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = SimulationConfig::default();
        config.latch.inner_distance = 10.0;
        let points = vec![p2(0.0, 0.0), p2(1.0, 0.0)];
        let cells = PrecomputedCells::from_simplices(&[vec![0, 1]]);
        assert!(matches!(
            MeshEngine::from_cells(points, &cells, config),
            Err(MeshError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rest_state_is_stable() {
        let mut engine = hinge();
        let before = engine.positions().to_vec();
        let report = engine.tick(0.016);

        assert_eq!(report.latched_joints, 1);
        assert_eq!(report.merge_groups, 1);
        assert_eq!(report.integrated_points, 2);
        for (a, b) in before.iter().zip(engine.positions()) {
            assert!((a - b).norm() < 1e-12);
        }
    }

    #[test]
    fn test_latched_versions_move_together() {
        let mut engine = hinge();
        engine.set_clickable(0, true).unwrap();
        engine.drag_point(0, p2(-1.5, 0.3)).unwrap();
        engine.tick(0.05);

        assert_eq!(engine.positions()[1], engine.positions()[3]);
        assert_eq!(engine.forces()[1], engine.forces()[3]);
    }

    #[test]
    fn test_drag_requires_clickable() {
        let mut engine = hinge();
        assert_eq!(engine.drag_point(0, p2(5.0, 5.0)), Err(MeshError::NotClickable(0)));
        assert!(matches!(
            engine.drag_point(99, p2(5.0, 5.0)),
            Err(MeshError::PointOutOfRange { index: 99, .. })
        ));

        engine.set_clickable(0, true).unwrap();
        assert!(matches!(
            engine.drag_point(0, Vector::zeros(3)),
            Err(MeshError::DimensionMismatch { expected: 2, found: 3 })
        ));
    }

    #[test]
    fn test_drag_rejects_non_finite_position() {
        let mut engine = hinge();
        engine.set_clickable(0, true).unwrap();
        assert_eq!(engine.drag_point(0, p2(f64::NAN, 0.0)), Err(MeshError::NonFinitePosition(0)));
        assert_eq!(
            engine.drag_point(0, p2(0.0, f64::INFINITY)),
            Err(MeshError::NonFinitePosition(0))
        );
        assert!(!engine.is_pinned(0));
        assert_eq!(engine.positions()[0], p2(-1.0, 0.0));

        engine.tick(0.05);
        assert!(engine.positions().iter().all(vector::is_finite));
    }

    #[test]
    fn test_pin_holds_for_one_tick() {
        let mut engine = hinge();
        engine.set_clickable(2, true).unwrap();
        engine.drag_point(2, p2(3.0, 0.0)).unwrap();
        assert!(engine.is_pinned(2));

        engine.tick(0.05);
        assert_eq!(engine.positions()[2], p2(3.0, 0.0));
        assert!(!engine.is_pinned(2));

        // Unpinned, the stretched link pulls it back.
        engine.tick(0.05);
        assert!(engine.positions()[2][0] < 3.0);
    }

    #[test]
    fn test_same_seed_same_trajectory() {
        let mut a = hinge();
        let mut b = hinge();
        for engine in [&mut a, &mut b] {
            engine.set_clickable(0, true).unwrap();
            engine.drag_point(0, p2(-2.0, 1.0)).unwrap();
        }
        for _ in 0..20 {
            a.tick(0.016);
            b.tick(0.016);
        }
        assert_eq!(a.positions(), b.positions());
        assert_eq!(a.joints(), b.joints());
    }

    #[test]
    fn test_set_config_updates_joints() {
        let mut engine = hinge();
        let mut config = SimulationConfig::default();
        config.latch.max_force = 7.0;
        config.latch.inner_distance = 0.2;
        config.latch.outer_distance = 0.9;
        engine.set_config(config).unwrap();

        let joint = &engine.joints()[0];
        assert_eq!(joint.max_force, 7.0);
        assert_eq!(joint.inner_distance, 0.2);
        assert_eq!(joint.outer_distance, 0.9);

        config.latch.outer_distance = 0.1;
        assert!(engine.set_config(config).is_err());
        assert_eq!(engine.config().latch.outer_distance, 0.9);
    }

    #[test]
    fn test_positions_flat_and_bounds() {
        let engine = hinge();
        assert_eq!(engine.positions_flat(), vec![-1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
        let (min, max) = engine.get_bounds().unwrap();
        assert_eq!(min, p2(-1.0, 0.0));
        assert_eq!(max, p2(1.0, 0.0));
    }

    #[test]
    fn test_non_finite_elapsed_moves_nothing() {
        let mut engine = hinge();
        engine.set_clickable(0, true).unwrap();
        engine.drag_point(0, p2(-3.0, 0.0)).unwrap();
        let before = engine.positions().to_vec();
        engine.tick(f64::NAN);
        for (a, b) in before.iter().zip(engine.positions()) {
            assert_eq!(a, b);
        }
    }
}

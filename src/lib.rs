//! Latch Mesh - WASM Module
//!
//! N-dimensional spring meshes whose shared vertices are split per cell and
//! tied back together by breakable latch joints. Compiled to WebAssembly with a
//! JavaScript-friendly API via wasm-bindgen; the same engine runs natively.
//!
//! # Architecture
//!
//! - `mesh`: position arena, edge links, latch joints, topology builder, engine
//! - `forces`: spring, latch, merge, island and integrator stages of a tick
//! - `vector`: runtime-dimension vector helpers
//! - `config`: simulation parameters
//! - `scenes`: ready-made meshes for demos and tests

use js_sys::Float64Array;
use rand::SeedableRng;
use rand::rngs::StdRng;
use wasm_bindgen::prelude::*;

pub mod config;
pub mod error;
pub mod forces;
pub mod logging;
pub mod mesh;
pub mod scenes;
pub mod vector;

use config::SimulationConfig;
use error::MeshError;
use mesh::{MeshEngine, PrecomputedCells};

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    logging::install(log::LevelFilter::Info);
}

fn to_js(err: MeshError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Deserialize a config object; `undefined` or `null` selects the defaults.
fn parse_config(config: JsValue) -> Result<SimulationConfig, JsValue> {
    if config.is_undefined() || config.is_null() {
        return Ok(SimulationConfig::default());
    }
    let config: SimulationConfig = serde_wasm_bindgen::from_value(config)
        .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?;
    Ok(config)
}

/// Main entry point for the latch mesh.
///
/// This struct wraps the internal MeshEngine and provides the public API
/// exposed to JavaScript.
#[wasm_bindgen]
pub struct LatchMeshWasm {
    engine: MeshEngine,
}

#[wasm_bindgen]
impl LatchMeshWasm {
    /// Build a mesh from flat positions and a cell decomposition.
    ///
    /// # Arguments
    ///
    /// * `positions` - Flat `[p0_0, .., p0_{d-1}, p1_0, ..]` coordinates
    /// * `dimension` - Components per point
    /// * `simplices` - Array of cells, each an array of point indices
    /// * `config` - Partial `SimulationConfig` object (or undefined)
    #[wasm_bindgen(constructor)]
    pub fn new(
        positions: &[f64],
        dimension: usize,
        simplices: JsValue,
        config: JsValue,
    ) -> Result<LatchMeshWasm, JsValue> {
        let points = vector::from_flat(positions, dimension).map_err(to_js)?;
        let simplices: Vec<Vec<usize>> = serde_wasm_bindgen::from_value(simplices)
            .map_err(|e| JsValue::from_str(&format!("Invalid cells: {}", e)))?;
        let cells = PrecomputedCells::from_simplices(&simplices);
        let engine = MeshEngine::from_cells(points, &cells, parse_config(config)?).map_err(to_js)?;
        Ok(Self { engine })
    }

    /// Two segments sharing a latched middle point.
    #[wasm_bindgen(js_name = twoPointLatch)]
    pub fn two_point_latch(config: JsValue) -> Result<LatchMeshWasm, JsValue> {
        let engine = scenes::two_point_latch(parse_config(config)?).map_err(to_js)?;
        Ok(Self { engine })
    }

    /// `count` triangles fanned around a hub.
    #[wasm_bindgen(js_name = triangleFan)]
    pub fn triangle_fan(
        count: usize,
        radius: f64,
        config: JsValue,
    ) -> Result<LatchMeshWasm, JsValue> {
        let engine = scenes::triangle_fan(count, radius, parse_config(config)?).map_err(to_js)?;
        Ok(Self { engine })
    }

    /// A hub with `count` spokes on an N-sphere. Spoke ends are sampled from the config seed.
    #[wasm_bindgen(js_name = sphereCollapse)]
    pub fn sphere_collapse(
        dimension: usize,
        count: usize,
        radius: f64,
        config: JsValue,
    ) -> Result<LatchMeshWasm, JsValue> {
        let config = parse_config(config)?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let engine = scenes::sphere_collapse(dimension, count, radius, config, &mut rng)
            .map_err(to_js)?;
        Ok(Self { engine })
    }

    // =========================================================================
    // Simulation
    // =========================================================================

    /// Advance the simulation and return the tick report.
    pub fn tick(&mut self, elapsed_seconds: f64) -> Result<JsValue, JsValue> {
        let report = self.engine.tick(elapsed_seconds);
        serde_wasm_bindgen::to_value(&report)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Replace the simulation parameters.
    #[wasm_bindgen(js_name = setConfig)]
    pub fn set_config(&mut self, config: JsValue) -> Result<(), JsValue> {
        let config = parse_config(config)?;
        self.engine.set_config(config).map_err(to_js)
    }

    /// Current simulation parameters.
    #[wasm_bindgen(js_name = getConfig)]
    pub fn get_config(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.engine.config())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    // =========================================================================
    // Read Channel
    // =========================================================================

    /// Number of points including duplicated vertex versions.
    #[wasm_bindgen(js_name = pointCount)]
    pub fn point_count(&self) -> usize {
        self.engine.point_count()
    }

    /// Number of points before duplication.
    #[wasm_bindgen(js_name = originalPointCount)]
    pub fn original_point_count(&self) -> usize {
        self.engine.original_point_count()
    }

    pub fn dimension(&self) -> usize {
        self.engine.dimension()
    }

    #[wasm_bindgen(js_name = linkCount)]
    pub fn link_count(&self) -> usize {
        self.engine.links().len()
    }

    #[wasm_bindgen(js_name = jointCount)]
    pub fn joint_count(&self) -> usize {
        self.engine.joints().len()
    }

    /// Positions as a Float64Array `[p0_0, .., p0_{d-1}, p1_0, ..]`.
    #[wasm_bindgen(js_name = getPositions)]
    pub fn get_positions(&self) -> Float64Array {
        Float64Array::from(&self.engine.positions_flat()[..])
    }

    /// Displacements applied in the last tick, laid out like `getPositions`.
    #[wasm_bindgen(js_name = getForces)]
    pub fn get_forces(&self) -> Float64Array {
        Float64Array::from(&vector::flatten(self.engine.forces())[..])
    }

    /// Link endpoints as `[a0, b0, a1, b1, ..]`.
    #[wasm_bindgen(js_name = getLinkEndpoints)]
    pub fn get_link_endpoints(&self) -> Vec<u32> {
        self.engine
            .links()
            .iter()
            .flat_map(|l| [l.index0 as u32, l.index1 as u32])
            .collect()
    }

    /// Link lengths measured in the last tick.
    #[wasm_bindgen(js_name = getLinkLengths)]
    pub fn get_link_lengths(&self) -> Float64Array {
        Float64Array::from(self.engine.link_lengths())
    }

    /// Rest length of every link.
    #[wasm_bindgen(js_name = getDesiredLengths)]
    pub fn get_desired_lengths(&self) -> Float64Array {
        let lengths: Vec<f64> = self.engine.links().iter().map(|l| l.desired_length).collect();
        Float64Array::from(&lengths[..])
    }

    /// Joint endpoints as `[a0, b0, a1, b1, ..]`.
    #[wasm_bindgen(js_name = getJointEndpoints)]
    pub fn get_joint_endpoints(&self) -> Vec<u32> {
        self.engine
            .joints()
            .iter()
            .flat_map(|j| [j.index0 as u32, j.index1 as u32])
            .collect()
    }

    /// One byte per joint: 1 when latched.
    #[wasm_bindgen(js_name = getLatchedFlags)]
    pub fn get_latched_flags(&self) -> Vec<u8> {
        self.engine.latched_flags().into_iter().map(u8::from).collect()
    }

    /// Get the bounding box of all points.
    ///
    /// Returns `[min_0, .., min_{d-1}, max_0, .., max_{d-1}]`.
    #[wasm_bindgen(js_name = getBounds)]
    pub fn get_bounds(&self) -> Option<Vec<f64>> {
        self.engine.get_bounds().map(|(min, max)| min.iter().chain(max.iter()).copied().collect())
    }

    // =========================================================================
    // Write Channel
    // =========================================================================

    /// Allow or forbid dragging a point.
    #[wasm_bindgen(js_name = setClickable)]
    pub fn set_clickable(&mut self, index: usize, clickable: bool) -> Result<(), JsValue> {
        self.engine.set_clickable(index, clickable).map_err(to_js)
    }

    #[wasm_bindgen(js_name = isClickable)]
    pub fn is_clickable(&self, index: usize) -> bool {
        self.engine.is_clickable(index)
    }

    /// Move a clickable point; it is held there during the next tick.
    #[wasm_bindgen(js_name = dragPoint)]
    pub fn drag_point(&mut self, index: usize, position: &[f64]) -> Result<(), JsValue> {
        let position = vector::Vector::from_column_slice(position);
        self.engine.drag_point(index, position).map_err(to_js)
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::mesh::{JointSet, StarCells, TickReport};
    use crate::vector::Vector;

    fn v(components: &[f64]) -> Vector {
        Vector::from_column_slice(components)
    }

    fn versions_coincide(engine: &MeshEngine, set: &JointSet) -> bool {
        let first = &engine.positions()[set.versions[0]];
        set.versions.iter().all(|&i| engine.positions()[i] == *first)
    }

    /// Pulling both ends of the two-point latch breaks the joint; the two
    /// versions of the middle point then separate.
    #[test]
    fn test_two_point_latch_breaks_when_pulled() {
        let mut engine = scenes::two_point_latch(SimulationConfig::default()).unwrap();
        engine.drag_point(0, v(&[-6.0, 0.0])).unwrap();
        engine.drag_point(2, v(&[6.0, 0.0])).unwrap();

        let report = engine.tick(0.05);

        assert_eq!(report.unlatched_joints, 1);
        assert_eq!(report.merge_groups, 0);
        assert_eq!(engine.latched_flags(), vec![false]);
        let gap = (&engine.positions()[3] - &engine.positions()[1]).norm();
        assert!(gap > engine.config().latch.inner_distance, "gap {gap}");
    }

    /// A gentle pull leaves the latch intact and the versions identical.
    #[test]
    fn test_two_point_latch_holds_under_gentle_pull() {
        let mut engine = scenes::two_point_latch(SimulationConfig::default()).unwrap();
        for _ in 0..10 {
            engine.drag_point(0, v(&[-1.5, 0.0])).unwrap();
            let report = engine.tick(0.016);
            assert_eq!(report.latched_joints, 1);
            assert_eq!(engine.positions()[1], engine.positions()[3]);
        }
    }

    /// Every hub version of the fan stays at one shared point while a ring
    /// point is dragged outward.
    #[test]
    fn test_fan_hub_moves_as_one_point() {
        let mut engine = scenes::triangle_fan(6, 1.0, SimulationConfig::default()).unwrap();
        let hub = engine
            .joint_sets()
            .iter()
            .find(|s| s.original == 0)
            .cloned()
            .unwrap();

        for _ in 0..10 {
            engine.drag_point(1, v(&[2.0, 0.0])).unwrap();
            engine.tick(0.05);
            assert!(hub.joints.iter().all(|&j| engine.joints()[j].is_latched));
            assert!(versions_coincide(&engine, &hub));
        }
        assert!(engine.positions()[0][0] > 0.0, "hub follows the pull");
    }

    /// Drags opposite ring points of the fan apart so the hub version under
    /// one triangle breaks from the version under the opposite triangle.
    fn split_fan_hub(max_passes: u32) -> (MeshEngine, JointSet, TickReport) {
        let mut config = SimulationConfig::default();
        config.latch.max_force = 1.0;
        config.island.max_passes = max_passes;
        let mut engine = scenes::triangle_fan(6, 1.0, config).unwrap();
        let hub = engine
            .joint_sets()
            .iter()
            .find(|s| s.original == 0)
            .cloned()
            .unwrap();

        engine.drag_point(1, v(&[3.0, 0.0])).unwrap();
        engine.drag_point(4, v(&[-3.0, 0.0])).unwrap();
        let report = engine.tick(0.05);
        (engine, hub, report)
    }

    /// A broken hub joint leaves a mixed set; every hub version follows one
    /// of the two sides, and the sides move apart.
    #[test]
    fn test_fan_hub_splits_into_islands() {
        let (engine, hub, report) = split_fan_hub(100);
        let left = hub.versions[2];

        assert!(report.islands_resolved >= 1);
        assert_eq!(report.unconverged_islands, 0);
        let broken = hub
            .joints
            .iter()
            .map(|&j| &engine.joints()[j])
            .find(|joint| joint.touches(0) && joint.touches(left))
            .unwrap();
        assert!(!broken.is_latched);
        assert!(hub.joints.iter().any(|&j| engine.joints()[j].is_latched));

        let positions = engine.positions();
        let forces = engine.forces();
        for &i in &hub.versions {
            let with_right = positions[i] == positions[0] && forces[i] == forces[0];
            let with_left = positions[i] == positions[left] && forces[i] == forces[left];
            assert!(with_right || with_left, "version {i} follows neither side");
        }
        assert!(positions[0][0] > positions[left][0]);
    }

    /// With a single attach pass the latched joints between copied hub
    /// versions are still waiting, so the island is reported unconverged.
    #[test]
    fn test_fan_hub_split_reports_pass_limit() {
        let (_, _, report) = split_fan_hub(1);
        assert!(report.islands_resolved >= 1);
        assert_eq!(report.unconverged_islands, 1);
    }

    /// No point is displaced by more than the integrator cap in any tick.
    #[test]
    fn test_applied_force_never_exceeds_cap() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = SimulationConfig::default();
        let cap = config.integrator.max_force;
        let mut engine = scenes::sphere_collapse(3, 8, 2.0, config, &mut rng).unwrap();

        for step in 0..40 {
            if step % 5 == 0 {
                engine.drag_point(1, v(&[10.0, 0.0, 0.0])).unwrap();
            }
            engine.tick(0.5);
            for f in engine.forces() {
                assert!(f.norm() <= cap * (1.0 + 1e-9), "step {step}: {}", f.norm());
            }
        }
    }

    /// The sphere hub is one vertex with a version per spoke; while every
    /// hub joint is latched all versions share one position and force.
    #[test]
    fn test_sphere_hub_broadcast() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut engine =
            scenes::sphere_collapse(5, 6, 1.5, SimulationConfig::default(), &mut rng).unwrap();
        let hub = engine.joint_sets()[0].clone();
        assert_eq!(hub.original, 0);
        assert_eq!(hub.version_count(), 6);

        for _ in 0..20 {
            engine.drag_point(2, v(&[0.0, 3.0, 0.0, 0.0, 0.0])).unwrap();
            engine.tick(0.05);
            if hub.joints.iter().all(|&j| engine.joints()[j].is_latched) {
                assert!(versions_coincide(&engine, &hub));
                let force = &engine.forces()[hub.versions[0]];
                assert!(hub.versions.iter().all(|&i| engine.forces()[i] == *force));
            }
        }
    }

    /// Same seed and inputs give the same trajectory.
    #[test]
    fn test_seeded_runs_are_reproducible() {
        let run = || {
            let mut rng = StdRng::seed_from_u64(77);
            let config = SimulationConfig {
                seed: 5,
                ..SimulationConfig::default()
            };
            let mut engine = scenes::sphere_collapse(4, 5, 1.0, config, &mut rng).unwrap();
            for _ in 0..25 {
                engine.drag_point(1, v(&[2.0, 2.0, 0.0, 0.0])).unwrap();
                engine.tick(0.03);
            }
            (engine.positions().to_vec(), engine.latched_flags())
        };
        assert_eq!(run(), run());
    }

    /// A dragged point is held for exactly one tick.
    #[test]
    fn test_drag_pins_for_one_tick() {
        let mut engine = scenes::triangle_fan(4, 1.0, SimulationConfig::default()).unwrap();
        let target = v(&[0.0, 4.0]);
        engine.drag_point(2, target.clone()).unwrap();
        engine.tick(0.1);
        assert_eq!(engine.positions()[2], target);
        assert_eq!(engine.forces()[2], Vector::zeros(2));

        engine.tick(0.1);
        assert_ne!(engine.positions()[2], target);
    }

    /// Building in an unsupported dimension fails before any cells are read.
    #[test]
    fn test_unsupported_dimension_is_rejected() {
        let points = vector::from_flat(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0], 3).unwrap();
        let cells = PrecomputedCells::from_simplices(&[vec![0, 1]]).with_dimensions(2..=2);
        let result = MeshEngine::from_cells(points, &cells, SimulationConfig::default());
        assert_eq!(
            result.err(),
            Some(MeshError::UnsupportedDimension {
                dimension: 3,
                supported: 2..=2,
            })
        );
    }

    /// A star with hub 0 built directly, checking desired lengths survive ticks at rest.
    #[test]
    fn test_star_at_rest_keeps_lengths() {
        let points = vec![v(&[0.0, 0.0]), v(&[1.0, 0.0]), v(&[0.0, 2.0]), v(&[-3.0, 0.0])];
        let mut engine =
            MeshEngine::from_cells(points, &StarCells { hub: 0 }, SimulationConfig::default())
                .unwrap();
        for _ in 0..10 {
            let report = engine.tick(0.1);
            assert_eq!(report.latched_joints, 3);
            for (length, link) in report.link_lengths.iter().zip(engine.links()) {
                assert!((length - link.desired_length).abs() < 1e-9);
            }
        }
    }
}

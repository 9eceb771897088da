//! Ready-made meshes for demos and tests.
//!
//! Each scene builds a [`MeshEngine`] and marks the points a user is expected
//! to drag as clickable.

use std::f64::consts::TAU;

use rand::Rng;

use crate::config::SimulationConfig;
use crate::error::MeshError;
use crate::mesh::{MeshEngine, PrecomputedCells, StarCells};
use crate::vector::{self, Vector};

/// Two unit segments sharing their middle point.
///
/// The middle point is split into two versions tied by one latch joint; the
/// outer ends (0 and 2) are clickable.
pub fn two_point_latch(config: SimulationConfig) -> Result<MeshEngine, MeshError> {
    let points = vec![
        Vector::from_vec(vec![-1.0, 0.0]),
        Vector::from_vec(vec![0.0, 0.0]),
        Vector::from_vec(vec![1.0, 0.0]),
    ];
    let cells = PrecomputedCells::from_simplices(&[vec![0, 1], vec![1, 2]]);
    let mut engine = MeshEngine::from_cells(points, &cells, config)?;
    engine.set_clickable(0, true)?;
    engine.set_clickable(2, true)?;
    Ok(engine)
}

/// `count` triangles around a hub at the origin.
///
/// Point 0 is the hub; points `1..=count` lie on a circle of `radius`, and
/// triangle `k` spans the hub and ring points `k` and `k + 1` (wrapping).
/// The hub ends up with `count` versions and every ring point with two.
/// Ring points are clickable.
pub fn triangle_fan(
    count: usize,
    radius: f64,
    config: SimulationConfig,
) -> Result<MeshEngine, MeshError> {
    if count < 3 {
        return Err(MeshError::InvalidConfig(format!(
            "triangle fan needs at least 3 triangles, got {count}"
        )));
    }
    if !(radius.is_finite() && radius > 0.0) {
        return Err(MeshError::InvalidConfig(format!(
            "triangle fan radius must be positive and finite, got {radius}"
        )));
    }

    let mut points = Vec::with_capacity(count + 1);
    points.push(vector::zeros(2));
    for k in 0..count {
        let angle = TAU * k as f64 / count as f64;
        points.push(Vector::from_vec(vec![radius * angle.cos(), radius * angle.sin()]));
    }

    let simplices: Vec<Vec<usize>> = (0..count)
        .map(|k| vec![0, k + 1, (k + 1) % count + 1])
        .collect();
    let cells = PrecomputedCells::from_simplices(&simplices).with_dimensions(2..=2);

    let mut engine = MeshEngine::from_cells(points, &cells, config)?;
    for index in 1..=count {
        engine.set_clickable(index, true)?;
    }
    Ok(engine)
}

/// A hub at the origin with `count` spokes ending on an N-sphere of `radius`.
///
/// Every spoke has its own copy of the hub, so the hub is one vertex with
/// `count` versions that start latched together. Spoke ends are clickable.
pub fn sphere_collapse<R: Rng>(
    dimension: usize,
    count: usize,
    radius: f64,
    config: SimulationConfig,
    rng: &mut R,
) -> Result<MeshEngine, MeshError> {
    if count == 0 {
        return Err(MeshError::EmptyPointSet);
    }
    if !(radius.is_finite() && radius > 0.0) {
        return Err(MeshError::InvalidConfig(format!(
            "sphere radius must be positive and finite, got {radius}"
        )));
    }

    let mut points = Vec::with_capacity(count + 1);
    points.push(vector::zeros(dimension));
    for _ in 0..count {
        points.push(vector::random_on_sphere(dimension, radius, rng));
    }

    let mut engine = MeshEngine::from_cells(points, &StarCells { hub: 0 }, config)?;
    for index in 1..=count {
        engine.set_clickable(index, true)?;
    }
    Ok(engine)
}

//! Topology builder: cell decomposition → duplicated-vertex mesh.
//!
//! # Algorithm Overview
//!
//! 1. For each original point, scan the cells in order. The first cell that
//!    touches the point keeps the original index; every later cell gets its own
//!    copy of the point appended to the arena, and that cell's references are
//!    rewritten to the copy.
//! 2. A point touched by k cells ends up with k versions. Every unordered pair
//!    of versions is tied by a latch joint (C(k, 2) joints), all latched.
//! 3. Edge links are built from the rewritten cell edges, each resting at the
//!    distance its endpoints have at construction time.
//!
//! The decomposition itself (Delaunay, convex hull, ...) comes from a
//! [`CellSource`] and is treated as a black box.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use log::debug;
use rand::Rng;

use super::joint::{JointSet, LatchJoint};
use super::link::EdgeLink;
use crate::config::LatchConfig;
use crate::error::MeshError;
use crate::vector::{self, Vector};

/// One cell of a decomposition, expressed as its edges.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cell {
    pub edges: Vec<(usize, usize)>,
}

impl Cell {
    /// Create a cell from an explicit edge list.
    pub fn from_edges(edges: Vec<(usize, usize)>) -> Self {
        Self { edges }
    }

    /// Create a cell containing every edge of a simplex (segment, triangle, tetrahedron, ...).
    pub fn from_simplex(vertices: &[usize]) -> Self {
        let mut edges = Vec::with_capacity(vertices.len() * vertices.len().saturating_sub(1) / 2);
        for (i, &a) in vertices.iter().enumerate() {
            for &b in &vertices[i + 1..] {
                edges.push((a, b));
            }
        }
        Self { edges }
    }

    /// True when any edge references `index`.
    pub fn touches(&self, index: usize) -> bool {
        self.edges.iter().any(|&(a, b)| a == index || b == index)
    }

    fn rewrite(&mut self, from: usize, to: usize) {
        for (a, b) in &mut self.edges {
            if *a == from {
                *a = to;
            }
            if *b == from {
                *b = to;
            }
        }
    }
}

/// Provider of a cell decomposition for a point set.
pub trait CellSource {
    /// Point dimensions this source can decompose.
    fn supported_dimensions(&self) -> RangeInclusive<usize> {
        1..=usize::MAX
    }

    /// Decompose `points` into cells.
    fn cells(&self, points: &[Vector]) -> Result<Vec<Cell>, MeshError>;
}

/// Cells computed elsewhere (e.g. by an external Delaunay or hull step).
#[derive(Debug, Clone, Default)]
pub struct PrecomputedCells {
    cells: Vec<Cell>,
    dimensions: Option<RangeInclusive<usize>>,
}

impl PrecomputedCells {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            dimensions: None,
        }
    }

    /// Build from simplices given as vertex lists.
    pub fn from_simplices(simplices: &[Vec<usize>]) -> Self {
        Self::new(simplices.iter().map(|s| Cell::from_simplex(s)).collect())
    }

    /// Restrict the point dimensions these cells are valid for.
    pub fn with_dimensions(mut self, dimensions: RangeInclusive<usize>) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

impl CellSource for PrecomputedCells {
    fn supported_dimensions(&self) -> RangeInclusive<usize> {
        self.dimensions.clone().unwrap_or(1..=usize::MAX)
    }

    fn cells(&self, _points: &[Vector]) -> Result<Vec<Cell>, MeshError> {
        Ok(self.cells.clone())
    }
}

/// One single-edge cell from a hub to every other point.
///
/// Every spoke gets its own copy of the hub, so the hub becomes a vertex with
/// one version per spoke.
#[derive(Debug, Clone, Copy)]
pub struct StarCells {
    pub hub: usize,
}

impl CellSource for StarCells {
    fn cells(&self, points: &[Vector]) -> Result<Vec<Cell>, MeshError> {
        if self.hub >= points.len() {
            return Err(MeshError::PointOutOfRange {
                index: self.hub,
                count: points.len(),
            });
        }
        Ok((0..points.len())
            .filter(|&i| i != self.hub)
            .map(|i| Cell::from_edges(vec![(self.hub, i)]))
            .collect())
    }
}

/// Result of topology construction.
#[derive(Debug, Clone)]
pub struct Topology {
    /// Original points followed by every duplicate.
    pub positions: Vec<Vector>,
    pub links: Vec<EdgeLink>,
    pub joints: Vec<LatchJoint>,
    /// One entry per vertex that was split (two or more versions).
    pub joint_sets: Vec<JointSet>,
}

/// Build the duplicated-vertex mesh for `points` using the cells from `source`.
pub fn build_topology<S, R>(
    points: Vec<Vector>,
    source: &S,
    latch: &LatchConfig,
    rng: &mut R,
) -> Result<Topology, MeshError>
where
    S: CellSource + ?Sized,
    R: Rng,
{
    let dimension = check_dimensions(&points)?;
    let supported = source.supported_dimensions();
    if !supported.contains(&dimension) {
        return Err(MeshError::UnsupportedDimension {
            dimension,
            supported,
        });
    }

    let mut cells = source.cells(&points)?;
    check_cells(&cells, points.len())?;

    let original_count = points.len();
    let mut positions = points;
    let mut versions: Vec<Vec<usize>> = Vec::with_capacity(original_count);

    for index in 0..original_count {
        let mut point_versions = Vec::new();
        for cell in cells.iter_mut() {
            if !cell.touches(index) {
                continue;
            }
            if point_versions.is_empty() {
                point_versions.push(index);
            } else {
                let copy = positions.len();
                positions.push(positions[index].clone());
                cell.rewrite(index, copy);
                point_versions.push(copy);
            }
        }
        versions.push(point_versions);
    }

    let mut joints = Vec::new();
    let mut joint_sets = Vec::new();
    for (original, point_versions) in versions.into_iter().enumerate() {
        if point_versions.len() < 2 {
            continue;
        }
        let pairs = point_versions.len() * (point_versions.len() - 1) / 2;
        let mut set_joints = Vec::with_capacity(pairs);
        for (i, &a) in point_versions.iter().enumerate() {
            for &b in &point_versions[i + 1..] {
                let bond = vector::random_in_shell(dimension, 0.0, latch.bond_walk_radius, rng);
                set_joints.push(joints.len());
                joints.push(LatchJoint::new(a, b, latch, bond));
            }
        }
        joint_sets.push(JointSet {
            original,
            versions: point_versions,
            joints: set_joints,
        });
    }

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for cell in &cells {
        for &(a, b) in &cell.edges {
            let key = (a.min(b), a.max(b));
            if seen.insert(key) {
                links.push(EdgeLink::at_rest(&positions, a, b));
            }
        }
    }

    debug!(
        "built latch mesh: {} points ({} original), {} links, {} joints in {} sets",
        positions.len(),
        original_count,
        links.len(),
        joints.len(),
        joint_sets.len()
    );

    Ok(Topology {
        positions,
        links,
        joints,
        joint_sets,
    })
}

fn check_dimensions(points: &[Vector]) -> Result<usize, MeshError> {
    let dimension = points.first().ok_or(MeshError::EmptyPointSet)?.len();
    for p in points {
        if p.len() != dimension {
            return Err(MeshError::DimensionMismatch {
                expected: dimension,
                found: p.len(),
            });
        }
    }
    Ok(dimension)
}

fn check_cells(cells: &[Cell], count: usize) -> Result<(), MeshError> {
    for (cell_index, cell) in cells.iter().enumerate() {
        for &(a, b) in &cell.edges {
            for index in [a, b] {
                if index >= count {
                    return Err(MeshError::PointOutOfRange { index, count });
                }
            }
            if a == b {
                return Err(MeshError::DegenerateCell {
                    cell: cell_index,
                    point: a,
                });
            }
        }
    }
    Ok(())
}

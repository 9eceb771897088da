//! N-dimensional vector helpers.
//!
//! Positions, forces and bond tie-break positions are all `DVector<f64>` so the
//! mesh can run in any dimension chosen at runtime.

use nalgebra::DVector;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::MeshError;

/// Runtime-sized vector used for every position and force in the mesh.
pub type Vector = DVector<f64>;

/// Zero vector of the given dimension.
#[inline]
pub fn zeros(dimension: usize) -> Vector {
    Vector::zeros(dimension)
}

/// True when every component is finite.
#[inline]
pub fn is_finite(v: &Vector) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// Unit vector in the direction of `v`, or zero when `v` has no direction.
pub fn unit_or_zero(v: &Vector) -> Vector {
    let len = v.norm();
    if len > 0.0 && len.is_finite() {
        v / len
    } else {
        zeros(v.len())
    }
}

/// Component of `v` along `onto`.
///
/// Projecting onto a zero-length vector yields zero.
pub fn project_onto(v: &Vector, onto: &Vector) -> Vector {
    let denom = onto.norm_squared();
    if denom <= 0.0 || !denom.is_finite() {
        return zeros(v.len());
    }
    onto * (v.dot(onto) / denom)
}

/// Arithmetic mean of the positions addressed by `indices`.
pub fn centroid(positions: &[Vector], indices: &[usize]) -> Option<Vector> {
    let first = indices.first()?;
    let mut sum = zeros(positions[*first].len());
    for &i in indices {
        sum += &positions[i];
    }
    Some(sum / indices.len() as f64)
}

/// Uniformly distributed direction of length `radius`.
///
/// Normalizes a vector of independent standard normal components.
pub fn random_on_sphere<R: Rng>(dimension: usize, radius: f64, rng: &mut R) -> Vector {
    loop {
        let v = Vector::from_fn(dimension, |_, _| rng.sample::<f64, _>(StandardNormal));
        let len = v.norm();
        if len > 1e-12 {
            return v * (radius / len);
        }
        if dimension == 0 {
            return v;
        }
    }
}

/// Point distributed uniformly by volume between two radii.
pub fn random_in_shell<R: Rng>(
    dimension: usize,
    min_radius: f64,
    max_radius: f64,
    rng: &mut R,
) -> Vector {
    if dimension == 0 {
        return zeros(0);
    }
    let d = dimension as i32;
    let lo = min_radius.max(0.0).powi(d);
    let hi = max_radius.max(min_radius).powi(d);
    let radius = (lo + rng.random::<f64>() * (hi - lo)).powf(1.0 / dimension as f64);
    random_on_sphere(dimension, radius, rng)
}

/// Split a flat `[p0_0, .., p0_{d-1}, p1_0, ..]` buffer into vectors of `dimension`.
///
/// A trailing partial point is reported as a dimension mismatch.
pub fn from_flat(flat: &[f64], dimension: usize) -> Result<Vec<Vector>, MeshError> {
    if dimension == 0 {
        return Err(MeshError::UnsupportedDimension {
            dimension,
            supported: 1..=usize::MAX,
        });
    }
    let remainder = flat.len() % dimension;
    if remainder != 0 {
        return Err(MeshError::DimensionMismatch {
            expected: dimension,
            found: remainder,
        });
    }
    Ok(flat.chunks_exact(dimension).map(Vector::from_column_slice).collect())
}

/// Inverse of [`from_flat`].
pub fn flatten(vectors: &[Vector]) -> Vec<f64> {
    let mut flat = Vec::with_capacity(vectors.iter().map(|v| v.len()).sum());
    for v in vectors {
        flat.extend(v.iter());
    }
    flat
}

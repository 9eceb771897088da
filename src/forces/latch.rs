//! Latch joint classification and unbonded attraction.
//!
//! Each tick every joint is classified from scratch:
//!
//! | distance           | inside | attraction                       |
//! |--------------------|--------|----------------------------------|
//! | d <= inner         | yes    | `max_force`                      |
//! | inner < d < outer  | no     | falls from `max_force` to 0      |
//! | d >= outer         | no     | 0                                |
//!
//! Between the thresholds the magnitude is linear in `1/d`, so it equals
//! `max_force` at `inner` and 0 at `outer`.
//!
//! An inside joint latches unless the forces already acting on its two
//! endpoints pull them apart by more than `2 * max_force` (each endpoint can be
//! held by up to `max_force`). Latched joints exert no force here; their
//! endpoints are merged later. Unlatched joints produce an attraction that is
//! deferred until every joint has been classified against the same snapshot.

use crate::mesh::LatchJoint;
use crate::vector::{self, Vector};

/// Attraction magnitude at distance `d`.
pub fn latch_force_magnitude(d: f64, inner: f64, outer: f64, max_force: f64) -> f64 {
    if d <= inner {
        max_force
    } else if d >= outer {
        0.0
    } else {
        max_force * (outer / d - 1.0) / (outer / inner - 1.0)
    }
}

/// Geometric evaluation of one joint, independent of any forces.
#[derive(Debug, Clone, PartialEq)]
pub struct LatchEvaluation {
    /// Endpoints are within the inner distance.
    pub is_inside: bool,
    /// Attraction magnitude for the current distance.
    pub magnitude: f64,
    /// Unit direction from `index0` toward `index1` (zero when coincident).
    pub direction: Vector,
}

impl LatchEvaluation {
    /// Force acting on `index0`; `index1` receives the negation.
    pub fn force(&self) -> Vector {
        &self.direction * self.magnitude
    }
}

/// Measure a joint against the current positions.
pub fn evaluate_joint(joint: &LatchJoint, positions: &[Vector]) -> LatchEvaluation {
    let offset = &positions[joint.index1] - &positions[joint.index0];
    let distance_sq = offset.norm_squared();
    let outer_sq = joint.outer_distance * joint.outer_distance;
    let inner_sq = joint.inner_distance * joint.inner_distance;

    let (is_inside, magnitude) = if distance_sq > outer_sq {
        (false, 0.0)
    } else if distance_sq <= inner_sq {
        (true, joint.max_force)
    } else {
        let magnitude = latch_force_magnitude(
            distance_sq.sqrt(),
            joint.inner_distance,
            joint.outer_distance,
            joint.max_force,
        );
        (false, magnitude)
    };

    LatchEvaluation {
        is_inside,
        magnitude,
        direction: vector::unit_or_zero(&offset),
    }
}

/// Decide whether an inside joint stays bonded under the given force snapshot.
///
/// Each endpoint force is projected onto the other's; the bond holds while
/// the difference of those projections stays within `2 * max_force`.
pub fn should_latch(joint: &LatchJoint, forces: &[Vector]) -> bool {
    let f0 = &forces[joint.index0];
    let f1 = &forces[joint.index1];

    let along0 = vector::project_onto(f0, f1);
    let along1 = vector::project_onto(f1, f0);
    let len_alongs_sq = (along1 - along0).norm_squared();

    let limit = 2.0 * joint.max_force;
    len_alongs_sq <= limit * limit
}

/// Attraction owed by an unlatched joint, applied after classification.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredForce {
    pub index0: usize,
    pub index1: usize,
    /// Force on `index0`; `index1` receives the negation.
    pub force: Vector,
}

/// Classify every joint against `snapshot`, updating `is_latched`.
///
/// `snapshot` is only read, so no joint's decision can observe another
/// joint's attraction. The returned forces belong to the unlatched joints.
pub fn classify_joints(
    joints: &mut [LatchJoint],
    positions: &[Vector],
    snapshot: &[Vector],
) -> Vec<DeferredForce> {
    let mut deferred = Vec::new();
    for joint in joints.iter_mut() {
        let evaluation = evaluate_joint(joint, positions);
        joint.is_latched = evaluation.is_inside && should_latch(joint, snapshot);

        if !joint.is_latched && evaluation.magnitude > 0.0 {
            let force = evaluation.force();
            if vector::is_finite(&force) {
                deferred.push(DeferredForce {
                    index0: joint.index0,
                    index1: joint.index1,
                    force,
                });
            }
        }
    }
    deferred
}

/// Apply deferred attractions to the accumulation buffer.
pub fn apply_deferred(deferred: &[DeferredForce], forces: &mut [Vector]) {
    for d in deferred {
        forces[d.index0] += &d.force;
        forces[d.index1] -= &d.force;
    }
}

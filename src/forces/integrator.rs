//! Force-to-displacement integration.
//!
//! `displacement = force * mult * elapsed`, rescaled to `max_force` when it is
//! longer. Points claimed by a merge group this tick are skipped here; the
//! merge applies its own single update to the whole group.

use crate::config::IntegratorConfig;
use crate::forces::merge::Claims;
use crate::vector::{self, Vector};

/// Parameters of one capped force update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceStep {
    pub mult: f64,
    pub elapsed: f64,
    pub max_force: f64,
}

impl ForceStep {
    /// Step for free points.
    pub fn free(config: &IntegratorConfig, elapsed: f64) -> Self {
        Self {
            mult: config.force_mult,
            elapsed,
            max_force: config.max_force,
        }
    }

    /// Step for merged groups, with elapsed time capped at `max_bonded_elapsed`.
    pub fn bonded(config: &IntegratorConfig, elapsed: f64) -> Self {
        Self {
            mult: config.force_mult,
            elapsed: elapsed.min(config.max_bonded_elapsed),
            max_force: config.max_force,
        }
    }

    /// Scaled and capped displacement for `force`. Non-finite input yields zero.
    pub fn displacement(&self, force: &Vector) -> Vector {
        let mut step = force * (self.mult * self.elapsed);
        if !vector::is_finite(&step) {
            return vector::zeros(force.len());
        }
        let len_sq = step.norm_squared();
        if len_sq > self.max_force * self.max_force {
            step *= self.max_force / len_sq.sqrt();
        }
        step
    }
}

/// Move every point that is neither claimed by a merge group nor pinned.
///
/// `forces` is overwritten with the displacement actually applied; pinned
/// points get zero.
pub fn integrate_unclaimed(
    positions: &mut [Vector],
    forces: &mut [Vector],
    pinned: &[bool],
    claims: &Claims,
    step: &ForceStep,
) -> usize {
    let mut moved = 0;
    for (i, (position, force)) in positions.iter_mut().zip(forces.iter_mut()).enumerate() {
        if claims.is_claimed(i) {
            continue;
        }
        if pinned.get(i).copied().unwrap_or(false) {
            force.fill(0.0);
            continue;
        }
        let displacement = step.displacement(force);
        *position += &displacement;
        *force = displacement;
        moved += 1;
    }
    moved
}

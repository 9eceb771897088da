//! Simulation parameters.
//!
//! Every group deserializes with per-field defaults so JavaScript callers can
//! pass a partial object.

use serde::{Deserialize, Serialize};

use crate::error::MeshError;

/// Spring force multipliers for edge links.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringConfig {
    /// Multiplier when a link is shorter than its desired length (default: 1.0).
    pub mult_compress: f64,
    /// Multiplier when a link is longer than its desired length (default: 1.0).
    pub mult_expand: f64,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            mult_compress: 1.0,
            mult_expand: 1.0,
        }
    }
}

/// Latch joint thresholds, shared by every joint the topology builder creates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatchConfig {
    /// Attraction at the inner distance; also the per-endpoint breaking force (default: 2.0).
    pub max_force: f64,
    /// Bonding distance (default: 0.05).
    pub inner_distance: f64,
    /// Distance beyond which an unlatched joint exerts no force (default: 0.5).
    pub outer_distance: f64,
    /// Largest random-walk step of a joint's tie-break position per tick (default: 0.05).
    pub bond_walk_step: f64,
    /// Radius the tie-break positions are kept inside (default: 1.0).
    pub bond_walk_radius: f64,
}

impl Default for LatchConfig {
    fn default() -> Self {
        Self {
            max_force: 2.0,
            inner_distance: 0.05,
            outer_distance: 0.5,
            bond_walk_step: 0.05,
            bond_walk_radius: 1.0,
        }
    }
}

/// Force-to-displacement conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorConfig {
    /// Scale applied to force before multiplying by elapsed time (default: 1.0).
    pub force_mult: f64,
    /// Largest displacement applied to a point in one tick (default: 0.25).
    pub max_force: f64,
    /// Elapsed-time ceiling used for merged groups (default: 0.1).
    pub max_bonded_elapsed: f64,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            force_mult: 1.0,
            max_force: 0.25,
            max_bonded_elapsed: 0.1,
        }
    }
}

/// Island resolution limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IslandConfig {
    /// Greedy attach passes before giving up on an island (default: 100).
    pub max_passes: u32,
    /// Let a binding joint pull in the whole attach group owning its other
    /// endpoint, unless an unlatched joint separates the two (default: false).
    pub absorb_contested: bool,
}

impl Default for IslandConfig {
    fn default() -> Self {
        Self {
            max_passes: 100,
            absorb_contested: false,
        }
    }
}

/// Complete configuration of a latch mesh simulation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub spring: SpringConfig,
    pub latch: LatchConfig,
    pub integrator: IntegratorConfig,
    pub island: IslandConfig,
    /// Seed of the tie-break random walk (default: 0).
    pub seed: u64,
}

impl SimulationConfig {
    /// Check every parameter, returning the first violation.
    pub fn validate(&self) -> Result<(), MeshError> {
        positive("spring.mult_compress", self.spring.mult_compress)?;
        positive("spring.mult_expand", self.spring.mult_expand)?;

        positive("latch.max_force", self.latch.max_force)?;
        positive("latch.inner_distance", self.latch.inner_distance)?;
        positive("latch.outer_distance", self.latch.outer_distance)?;
        non_negative("latch.bond_walk_step", self.latch.bond_walk_step)?;
        positive("latch.bond_walk_radius", self.latch.bond_walk_radius)?;
        if self.latch.inner_distance >= self.latch.outer_distance {
            return Err(MeshError::InvalidConfig(format!(
                "latch.inner_distance ({}) must be less than latch.outer_distance ({})",
                self.latch.inner_distance, self.latch.outer_distance
            )));
        }

        positive("integrator.force_mult", self.integrator.force_mult)?;
        positive("integrator.max_force", self.integrator.max_force)?;
        positive("integrator.max_bonded_elapsed", self.integrator.max_bonded_elapsed)?;

        if self.island.max_passes == 0 {
            return Err(MeshError::InvalidConfig(
                "island.max_passes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> Result<(), MeshError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(MeshError::InvalidConfig(format!("{name} must be positive and finite, got {value}")))
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), MeshError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(MeshError::InvalidConfig(format!(
            "{name} must be non-negative and finite, got {value}"
        )))
    }
}

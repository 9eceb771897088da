//! Spring forces along edge links.
//!
//! Each link pushes or pulls its endpoints toward its desired length with a
//! magnitude proportional to the relative deviation:
//!
//! ```text
//! deviation = (desired - length) / desired
//! force     = unit(p1 - p0) * deviation * mult
//! f[index0] -= force;  f[index1] += force
//! ```
//!
//! `mult` is `mult_compress` while the link is shorter than desired and
//! `mult_expand` otherwise.

use crate::config::SpringConfig;
use crate::mesh::EdgeLink;
use crate::vector::{self, Vector};

/// Force a single link exerts on its `index1` endpoint (`index0` receives the negation).
///
/// Returns the force and the measured length. Non-finite results (zero desired
/// length, coincident endpoints) yield a zero force.
pub fn link_force(link: &EdgeLink, positions: &[Vector], config: &SpringConfig) -> (Vector, f64) {
    let direction = &positions[link.index1] - &positions[link.index0];
    let length = direction.norm();

    let deviation = (link.desired_length - length) / link.desired_length;
    let mult = if length < link.desired_length {
        config.mult_compress
    } else {
        config.mult_expand
    };

    let force = (direction / length) * (deviation * mult);
    if vector::is_finite(&force) {
        (force, length)
    } else {
        (vector::zeros(positions[link.index0].len()), length)
    }
}

/// Accumulate every link's force into `forces`.
///
/// Returns the measured length of each link, in link order.
pub fn accumulate_spring_forces(
    links: &[EdgeLink],
    positions: &[Vector],
    config: &SpringConfig,
    forces: &mut [Vector],
) -> Vec<f64> {
    let mut lengths = Vec::with_capacity(links.len());
    for link in links {
        let (force, length) = link_force(link, positions, config);
        forces[link.index0] -= &force;
        forces[link.index1] += &force;
        lengths.push(length);
    }
    lengths
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(distance: f64) -> Vec<Vector> {
        vec![
            Vector::from_vec(vec![0.0, 0.0, 0.0]),
            Vector::from_vec(vec![distance, 0.0, 0.0]),
        ]
    }

    #[test]
    fn test_equilibrium_is_exactly_zero() {
        let positions = pair(3.0);
        let link = EdgeLink::new(0, 1, 3.0);
        let (force, length) = link_force(&link, &positions, &SpringConfig::default());
        assert_eq!(length, 3.0);
        assert!(force.iter().all(|&c| c == 0.0));
    }

    #[test]
    fn test_stretched_link_pulls_together() {
        // Distance 8, desired 4: deviation -1, expand multiplier applies.
        let positions = pair(8.0);
        let link = EdgeLink::new(0, 1, 4.0);
        let config = SpringConfig {
            mult_compress: 10.0,
            mult_expand: 3.0,
        };
        let mut forces = vec![Vector::zeros(3); 2];
        let lengths = accumulate_spring_forces(&[link], &positions, &config, &mut forces);

        assert_eq!(lengths, vec![8.0]);
        assert!((forces[0].norm() - 3.0).abs() < 1e-12);
        assert!((forces[0][0] - 3.0).abs() < 1e-12, "point0 is pulled toward point1");
        assert!((forces[1][0] + 3.0).abs() < 1e-12, "point1 gets the opposite force");
    }

    #[test]
    fn test_compressed_link_pushes_apart() {
        let positions = pair(1.0);
        let link = EdgeLink::new(0, 1, 2.0);
        let config = SpringConfig {
            mult_compress: 4.0,
            mult_expand: 100.0,
        };
        let mut forces = vec![Vector::zeros(3); 2];
        accumulate_spring_forces(&[link], &positions, &config, &mut forces);
        // deviation 0.5 * 4
        assert!((forces[1][0] - 2.0).abs() < 1e-12);
        assert!((forces[0][0] + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_links_contribute_nothing() {
        let positions = pair(0.0);
        let mut forces = vec![Vector::zeros(3); 2];
        let links = [EdgeLink::new(0, 1, 1.0), EdgeLink::new(0, 1, 0.0)];
        let lengths =
            accumulate_spring_forces(&links, &positions, &SpringConfig::default(), &mut forces);
        assert_eq!(lengths, vec![0.0, 0.0]);
        assert_eq!(forces[0], Vector::zeros(3));
        assert_eq!(forces[1], Vector::zeros(3));
    }
}

//! Group-by-proximity → merge-apply → broadcast.
//!
//! Bonded points move as one: the group's position is the centroid of its
//! members, its force is the sum of their forces, one capped update is applied
//! and the resulting position and force are written back to every member.
//!
//! Every point may join at most one merge group per tick; [`Claims`] tracks
//! that across all groups of a tick and also tells the integrator which points
//! to skip.

use petgraph::unionfind::UnionFind;

use super::integrator::ForceStep;
use crate::vector::{self, Vector};

/// Points already processed by a merge group this tick.
#[derive(Debug, Clone)]
pub struct Claims {
    claimed: Vec<bool>,
    count: usize,
}

impl Claims {
    pub fn new(point_count: usize) -> Self {
        Self {
            claimed: vec![false; point_count],
            count: 0,
        }
    }

    #[inline]
    pub fn is_claimed(&self, index: usize) -> bool {
        self.claimed.get(index).copied().unwrap_or(false)
    }

    /// Claim `index`; returns false when it was already claimed.
    pub fn claim(&mut self, index: usize) -> bool {
        if self.claimed[index] {
            return false;
        }
        self.claimed[index] = true;
        self.count += 1;
        true
    }

    /// Number of claimed points.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Partition `items` into transitively linked groups.
///
/// Two items share a group when `linked` holds for them or for any chain of
/// items between them. Groups are ordered by their first member, and members
/// keep their input order.
pub fn group_by_proximity<T, F>(items: &[T], mut linked: F) -> Vec<Vec<usize>>
where
    F: FnMut(&T, &T) -> bool,
{
    let mut sets = UnionFind::<usize>::new(items.len());
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            if sets.find(i) != sets.find(j) && linked(&items[i], &items[j]) {
                sets.union(i, j);
            }
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut slot_of_root: Vec<Option<usize>> = vec![None; items.len()];
    for i in 0..items.len() {
        let root = sets.find(i);
        match slot_of_root[root] {
            Some(slot) => groups[slot].push(i),
            None => {
                slot_of_root[root] = Some(groups.len());
                groups.push(vec![i]);
            }
        }
    }
    groups
}

/// Outcome of one merged update.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Members actually processed.
    pub members: Vec<usize>,
    pub position: Vector,
    pub force: Vector,
}

/// Merge `members` into one point, apply one capped update, broadcast the result.
///
/// Members already claimed this tick are left out. A group containing a pinned
/// member adopts that member's position and receives no force. Returns `None`
/// without claiming anything when fewer than two unclaimed members remain.
pub fn merge_apply_broadcast(
    members: &[usize],
    positions: &mut [Vector],
    forces: &mut [Vector],
    pinned: &[bool],
    step: &ForceStep,
    claims: &mut Claims,
) -> Option<MergeOutcome> {
    let mut free: Vec<usize> = Vec::with_capacity(members.len());
    for &m in members {
        if !claims.is_claimed(m) && !free.contains(&m) {
            free.push(m);
        }
    }
    if free.len() < 2 {
        return None;
    }
    for &m in &free {
        claims.claim(m);
    }

    let dimension = positions[free[0]].len();
    let pin = free.iter().copied().find(|&m| pinned.get(m).copied().unwrap_or(false));

    let (position, force) = match pin {
        Some(p) => (positions[p].clone(), vector::zeros(dimension)),
        None => {
            let center = vector::centroid(positions, &free)?;
            let mut total = vector::zeros(dimension);
            for &m in &free {
                total += &forces[m];
            }
            let displacement = step.displacement(&total);
            (center + &displacement, displacement)
        }
    };

    for &m in &free {
        positions[m].copy_from(&position);
        forces[m].copy_from(&force);
    }

    Some(MergeOutcome {
        members: free,
        position,
        force,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64, y: f64) -> Vector {
        Vector::from_vec(vec![x, y])
    }

    fn step() -> ForceStep {
        ForceStep {
            mult: 1.0,
            elapsed: 0.1,
            max_force: 10.0,
        }
    }

    #[test]
    fn test_group_by_proximity_is_transitive() {
        let xs = [0.0_f64, 0.9, 1.8, 10.0, 10.5, 30.0];
        let groups = group_by_proximity(&xs, |a, b| (a - b).abs() <= 1.0);
        assert_eq!(groups, vec![vec![0, 1, 2], vec![3, 4], vec![5]]);
    }

    #[test]
    fn test_group_by_proximity_covers_every_item_once() {
        let xs: Vec<f64> = (0..40).map(|i| ((i * 37) % 11) as f64 * 0.7).collect();
        let groups = group_by_proximity(&xs, |a, b| (a - b).abs() < 0.5);
        let mut seen: Vec<usize> = groups.into_iter().flatten().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..40).collect::<Vec<_>>());
    }

    #[test]
    fn test_merge_broadcasts_identical_state() {
        let mut positions = vec![v(0.0, 0.0), v(2.0, 0.0), v(1.0, 3.0), v(50.0, 50.0)];
        let mut forces = vec![v(1.0, 0.0), v(0.0, 1.0), v(1.0, 1.0), v(9.0, 9.0)];
        let mut claims = Claims::new(4);

        let members = [0, 1, 2];
        let outcome =
            merge_apply_broadcast(&members, &mut positions, &mut forces, &[], &step(), &mut claims)
                .expect("three free members");

        // centroid (1, 1), summed force (2, 2) * 0.1
        assert!((outcome.position[0] - 1.2).abs() < 1e-12);
        assert!((outcome.position[1] - 1.2).abs() < 1e-12);
        for m in [0, 1, 2] {
            assert_eq!(positions[m], outcome.position);
            assert_eq!(forces[m], outcome.force);
        }
        assert_eq!(positions[3], v(50.0, 50.0));
        assert_eq!(claims.len(), 3);
        assert!(!claims.is_claimed(3));
    }

    #[test]
    fn test_merge_never_processes_a_point_twice() {
        let mut positions = vec![v(0.0, 0.0), v(1.0, 0.0), v(2.0, 0.0)];
        let mut forces = vec![Vector::zeros(2); 3];
        let mut claims = Claims::new(3);

        let first =
            merge_apply_broadcast(&[0, 1], &mut positions, &mut forces, &[], &step(), &mut claims);
        assert!(first.is_some());
        let second =
            merge_apply_broadcast(&[1, 2], &mut positions, &mut forces, &[], &step(), &mut claims);
        assert!(second.is_none(), "only one unclaimed member is left");
        assert!(!claims.is_claimed(2));
    }

    #[test]
    fn test_merge_with_pinned_member_follows_pin() {
        let mut positions = vec![v(0.0, 0.0), v(4.0, 4.0)];
        let mut forces = vec![v(100.0, 0.0), v(0.0, 100.0)];
        let mut claims = Claims::new(2);
        let pinned = [false, true];

        let outcome = merge_apply_broadcast(
            &[0, 1],
            &mut positions,
            &mut forces,
            &pinned,
            &step(),
            &mut claims,
        )
        .unwrap();
        assert_eq!(outcome.position, v(4.0, 4.0));
        assert_eq!(positions[0], v(4.0, 4.0));
        assert_eq!(forces[0], Vector::zeros(2));
    }

    #[test]
    fn test_merge_ignores_duplicate_members() {
        let mut positions = vec![v(0.0, 0.0), v(2.0, 0.0)];
        let mut forces = vec![Vector::zeros(2); 2];
        let mut claims = Claims::new(2);
        let members = [0, 1, 0, 1];
        let outcome =
            merge_apply_broadcast(&members, &mut positions, &mut forces, &[], &step(), &mut claims)
                .unwrap();
        assert_eq!(outcome.members, vec![0, 1]);
        assert_eq!(outcome.position, v(1.0, 0.0));
    }
}

//! Island consolidation for partially latched vertices.
//!
//! A split vertex whose joints are all latched moves as one point; one whose
//! joints are all unlatched needs nothing special. The mixed case is resolved
//! in four steps:
//!
//! 1. **Partition.** Joints whose own endpoints are further apart than the
//!    inner distance are set aside as *removed*. The rest are grouped into
//!    islands: two joints share an island when any pair of their endpoints is
//!    within the inner distance, transitively.
//! 2. **Attach points.** Inside an island every endpoint of an unlatched joint
//!    seeds an attach group, as does every endpoint of a removed joint lying
//!    within the inner distance of the island centroid.
//! 3. **Greedy binding.** In passes, each remaining latched joint that touches
//!    a group joins the one whose seed's random bond position is closest to its
//!    own, bringing along any endpoint no group owns yet. An endpoint already
//!    owned by another group stays where it is. With
//!    [`IslandConfig::absorb_contested`] set, that other group is absorbed
//!    instead, unless an unlatched joint runs between the two. Decisions in a
//!    pass see the membership frozen at the start of the pass and are bound
//!    closest first.
//! 4. **Merge.** Every group with two or more points is merged, updated once
//!    and broadcast.
//!
//! Binding stops when no pending joint touches a group. Latched joints still
//! unassigned at that point merge as their own bonded components. If the pass
//! limit is reached while joints could still bind, the island is reported as
//! not converged: groups bound so far are merged and the unassigned joints'
//! points fall through to the integrator.

use std::collections::HashMap;

use super::integrator::ForceStep;
use super::merge::{self, Claims};
use crate::config::IslandConfig;
use crate::mesh::{JointSet, LatchJoint};
use crate::vector::{self, Vector};

/// Joints of one vertex split into islands and removed joints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IslandPartition {
    /// Joint indices per island.
    pub islands: Vec<Vec<usize>>,
    /// Joints whose endpoints are beyond the inner distance.
    pub removed: Vec<usize>,
}

/// Split `joint_ids` into islands by transitive endpoint proximity.
pub fn partition_islands(
    joint_ids: &[usize],
    joints: &[LatchJoint],
    positions: &[Vector],
    inner_distance: f64,
) -> IslandPartition {
    let inner_sq = inner_distance * inner_distance;

    let mut removed = Vec::new();
    let mut kept = Vec::new();
    for &id in joint_ids {
        if joints[id].distance_squared(positions) > inner_sq {
            removed.push(id);
        } else {
            kept.push(id);
        }
    }

    let close = |a: usize, b: usize| (&positions[a] - &positions[b]).norm_squared() <= inner_sq;
    let groups = merge::group_by_proximity(&kept, |&a, &b| {
        let ja = &joints[a];
        let jb = &joints[b];
        ja.endpoints()
            .iter()
            .any(|&pa| jb.endpoints().iter().any(|&pb| close(pa, pb)))
    });

    IslandPartition {
        islands: groups
            .into_iter()
            .map(|g| g.into_iter().map(|slot| kept[slot]).collect())
            .collect(),
        removed,
    }
}

/// Candidate merge target seeded by an unlatched or removed joint's endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachPoint {
    pub index: usize,
    /// Tie-break position of the joint that contributed this attach point.
    pub bond_position: Vector,
}

/// Distinct endpoint indices of `joint_ids`, in order of appearance.
fn distinct_endpoints(joint_ids: &[usize], joints: &[LatchJoint]) -> Vec<usize> {
    let mut indices = Vec::new();
    for &id in joint_ids {
        for e in joints[id].endpoints() {
            if !indices.contains(&e) {
                indices.push(e);
            }
        }
    }
    indices
}

/// Collect the attach points of one island.
pub fn gather_attach_points(
    island: &[usize],
    removed: &[usize],
    joints: &[LatchJoint],
    positions: &[Vector],
    inner_distance: f64,
) -> Vec<AttachPoint> {
    let mut attach: Vec<AttachPoint> = Vec::new();
    let push = |index: usize, joint: &LatchJoint, attach: &mut Vec<AttachPoint>| {
        if !attach.iter().any(|a| a.index == index) {
            attach.push(AttachPoint {
                index,
                bond_position: joint.random_bond_position.clone(),
            });
        }
    };

    for &id in island {
        let joint = &joints[id];
        if !joint.is_latched {
            for e in joint.endpoints() {
                push(e, joint, &mut attach);
            }
        }
    }

    let members = distinct_endpoints(island, joints);
    if let Some(center) = vector::centroid(positions, &members) {
        let inner_sq = inner_distance * inner_distance;
        for &id in removed {
            let joint = &joints[id];
            for e in joint.endpoints() {
                if (&positions[e] - &center).norm_squared() <= inner_sq {
                    push(e, joint, &mut attach);
                }
            }
        }
    }
    attach
}

/// Result of binding one island's latched joints to its attach points.
#[derive(Debug, Clone, PartialEq)]
pub struct IslandResolution {
    /// Point indices to merge, one entry per group with two or more points.
    pub groups: Vec<Vec<usize>>,
    /// False when the pass limit stopped binding early.
    pub converged: bool,
    /// Binding passes run.
    pub passes: u32,
    /// Latched joints left unbound because binding stopped early.
    pub unresolved: Vec<usize>,
}

/// Attach groups of one island and the point ownership between them.
struct AttachGroups {
    /// Seed tie-break position per group.
    bond_positions: Vec<Vector>,
    members: Vec<Vec<usize>>,
    owner: HashMap<usize, usize>,
    /// Group a group was absorbed into, if any.
    absorbed_into: Vec<Option<usize>>,
    /// Unlatched joints of the island; their endpoints must stay apart.
    separations: Vec<[usize; 2]>,
    absorb_contested: bool,
}

impl AttachGroups {
    fn new(attach: Vec<AttachPoint>, separations: Vec<[usize; 2]>, absorb_contested: bool) -> Self {
        let owner = attach.iter().enumerate().map(|(g, a)| (a.index, g)).collect();
        let members = attach.iter().map(|a| vec![a.index]).collect();
        let absorbed_into = vec![None; attach.len()];
        Self {
            bond_positions: attach.into_iter().map(|a| a.bond_position).collect(),
            members,
            owner,
            absorbed_into,
            separations,
            absorb_contested,
        }
    }

    fn live(&self, mut g: usize) -> usize {
        while let Some(next) = self.absorbed_into[g] {
            g = next;
        }
        g
    }

    fn owner_of(&self, index: usize) -> Option<usize> {
        self.owner.get(&index).map(|&g| self.live(g))
    }

    /// Closest group touching `joint` by tie-break distance, ties to the lower group.
    fn closest(&self, joint: &LatchJoint) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for e in joint.endpoints() {
            let Some(g) = self.owner_of(e) else { continue };
            let d = (&joint.random_bond_position - &self.bond_positions[g]).norm_squared();
            let better = match best {
                None => true,
                Some((bg, bd)) => d < bd || (d == bd && g < bg),
            };
            if better {
                best = Some((g, d));
            }
        }
        best
    }

    /// True when no unlatched joint runs between groups `a` and `b`.
    fn compatible(&self, a: usize, b: usize) -> bool {
        !self.separations.iter().any(|&[p, q]| {
            let gp = self.owner_of(p);
            let gq = self.owner_of(q);
            (gp == Some(a) && gq == Some(b)) || (gp == Some(b) && gq == Some(a))
        })
    }

    /// Bind `joint` to group `g`: claim unowned endpoints, and absorb a
    /// compatible group owning the other endpoint when absorption is enabled.
    fn bind(&mut self, joint: &LatchJoint, g: usize) {
        let g = self.live(g);
        for e in joint.endpoints() {
            match self.owner_of(e) {
                None => {
                    self.owner.insert(e, g);
                    self.members[g].push(e);
                }
                Some(h) if h != g && self.absorb_contested && self.compatible(g, h) => {
                    let moved = std::mem::take(&mut self.members[h]);
                    for &m in &moved {
                        self.owner.insert(m, g);
                    }
                    self.members[g].extend(moved);
                    self.absorbed_into[h] = Some(g);
                }
                Some(_) => {}
            }
        }
    }
}

/// Bind the latched joints of `island` to attach groups.
pub fn resolve_island(
    island: &[usize],
    removed: &[usize],
    joints: &[LatchJoint],
    positions: &[Vector],
    inner_distance: f64,
    config: &IslandConfig,
) -> IslandResolution {
    let attach = gather_attach_points(island, removed, joints, positions, inner_distance);
    let separations = island
        .iter()
        .filter(|&&id| !joints[id].is_latched)
        .map(|&id| joints[id].endpoints())
        .collect();
    let mut groups = AttachGroups::new(attach, separations, config.absorb_contested);
    let mut pending: Vec<usize> = island
        .iter()
        .copied()
        .filter(|&id| joints[id].is_latched)
        .collect();

    let mut passes = 0;
    let mut converged = true;
    while !pending.is_empty() {
        // Decide against this pass's starting membership, then bind closest first.
        let mut decisions: Vec<(usize, usize, f64)> = pending
            .iter()
            .filter_map(|&id| groups.closest(&joints[id]).map(|(g, d)| (id, g, d)))
            .collect();
        if decisions.is_empty() {
            break;
        }
        if passes == config.max_passes {
            converged = false;
            break;
        }
        passes += 1;
        decisions.sort_by(|a, b| a.2.total_cmp(&b.2).then(a.0.cmp(&b.0)));

        for &(id, g, _) in &decisions {
            groups.bind(&joints[id], g);
        }
        pending.retain(|id| !decisions.iter().any(|&(d, _, _)| d == *id));
    }

    let mut merged: Vec<Vec<usize>> = groups.members;
    let mut unresolved = Vec::new();
    if converged {
        // Latched joints no attach group could reach stay bonded among themselves.
        let components = merge::group_by_proximity(&pending, |&a, &b| {
            joints[a].endpoints().iter().any(|&e| joints[b].touches(e))
        });
        for component in components {
            let mut group = Vec::new();
            for slot in component {
                for e in joints[pending[slot]].endpoints() {
                    if !groups.owner.contains_key(&e) && !group.contains(&e) {
                        group.push(e);
                    }
                }
            }
            merged.push(group);
        }
    } else {
        unresolved = pending;
    }

    merged.retain(|g| g.len() >= 2);
    IslandResolution {
        groups: merged,
        converged,
        passes,
        unresolved,
    }
}

/// How a split vertex was handled this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetKind {
    AllLatched,
    AllUnlatched,
    Mixed,
}

/// Summary of consolidating one joint set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidationOutcome {
    pub kind: SetKind,
    /// Merge groups applied.
    pub merge_groups: usize,
    /// Islands resolved (mixed sets only).
    pub islands: usize,
    /// Islands that hit the pass limit.
    pub unconverged_islands: usize,
}

/// Apply merge groups for one split vertex.
///
/// All positions are read before any group is applied, so the order of islands
/// does not influence their resolution.
#[allow(clippy::too_many_arguments)]
pub fn consolidate_joint_set(
    set: &JointSet,
    joints: &[LatchJoint],
    positions: &mut [Vector],
    forces: &mut [Vector],
    pinned: &[bool],
    step: &ForceStep,
    config: &IslandConfig,
    claims: &mut Claims,
) -> ConsolidationOutcome {
    let latched = set.joints.iter().filter(|&&id| joints[id].is_latched).count();

    if latched == 0 {
        return ConsolidationOutcome {
            kind: SetKind::AllUnlatched,
            merge_groups: 0,
            islands: 0,
            unconverged_islands: 0,
        };
    }

    if latched == set.joints.len() {
        let merged =
            merge::merge_apply_broadcast(&set.versions, positions, forces, pinned, step, claims);
        return ConsolidationOutcome {
            kind: SetKind::AllLatched,
            merge_groups: usize::from(merged.is_some()),
            islands: 0,
            unconverged_islands: 0,
        };
    }

    let inner = set
        .joints
        .iter()
        .map(|&id| joints[id].inner_distance)
        .fold(f64::INFINITY, f64::min);

    let partition = partition_islands(&set.joints, joints, positions, inner);
    let resolutions: Vec<IslandResolution> = partition
        .islands
        .iter()
        .map(|island| resolve_island(island, &partition.removed, joints, positions, inner, config))
        .collect();

    let mut merge_groups = 0;
    let mut unconverged_islands = 0;
    for resolution in &resolutions {
        if !resolution.converged {
            unconverged_islands += 1;
        }
        for group in &resolution.groups {
            let merged =
                merge::merge_apply_broadcast(group, positions, forces, pinned, step, claims);
            if merged.is_some() {
                merge_groups += 1;
            }
        }
    }

    ConsolidationOutcome {
        kind: SetKind::Mixed,
        merge_groups,
        islands: resolutions.len(),
        unconverged_islands,
    }
}

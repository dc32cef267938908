//! Broad Phase — Candidate Pair Generation
//!
//! Computes a world-space AABB for every body, emits a candidate pair for
//! every intersecting AABB combination (full O(n²) sweep), and merge-diffs
//! the key-sorted candidates against the previous tick's pair list so
//! persistent pairs keep their contact manifold while vanished pairs
//! return theirs to the arena.
//!
//! AABBs are expanded by a small margin so sub-margin jitter does not
//! thrash pairs (and with them, warm-start state) on and off.
//!
//! Author: Moroya Sakamoto

use glam::Vec3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::body::{RigidBodyAttributes, RigidState};
use crate::contact::ManifoldArena;
use crate::math::abs_rotate;
use crate::pair::{Pair, PairKey, PairPhase};
use crate::shape::Collidable;
use crate::world::MAX_PAIRS;

/// Fixed AABB expansion margin
pub const AABB_MARGIN: f32 = 0.01;

/// Axis-aligned bounding box in center/half-extent form
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Box center
    pub center: Vec3,
    /// Box half-extent (non-negative per axis)
    pub half: Vec3,
}

impl Aabb {
    /// Separating-axis test on the three box axes: boxes intersect iff the
    /// per-axis center distance is within the summed half-extents on all
    /// three. Symmetric in its arguments.
    #[inline]
    #[must_use]
    pub fn intersects(&self, other: &Aabb) -> bool {
        let delta = (other.center - self.center).abs();
        let reach = self.half + other.half;
        delta.x <= reach.x && delta.y <= reach.y && delta.z <= reach.z
    }
}

/// World-space AABB of a body: local center swept through the body pose,
/// local half-extent through the absolute rotation, plus the margin.
#[must_use]
pub fn world_aabb(state: &RigidState, collidable: &Collidable, margin: f32) -> Aabb {
    Aabb {
        center: state.position + state.orientation * collidable.local_center(),
        half: abs_rotate(state.orientation, collidable.local_half()) + Vec3::splat(margin),
    }
}

/// Broad-phase stage with reusable scratch buffers
#[derive(Debug, Default)]
pub struct BroadPhase {
    aabbs: Vec<Aabb>,
    candidates: Vec<PairKey>,
    fresh: Vec<PairKey>,
}

impl BroadPhase {
    /// Create a broad phase with empty scratch buffers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce this tick's pair list into `out` from the previous tick's
    /// list `prev` (which must be key-sorted, as every output of this
    /// function is).
    ///
    /// Kept pairs carry their manifold forward and get refreshed against
    /// the current poses; vanished pairs return their manifold to the
    /// arena; new pairs get a fresh zeroed manifold. The output is
    /// key-sorted Keep-then-New concatenation, re-sorted by key.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        states: &[RigidState],
        bodies: &[RigidBodyAttributes],
        collidables: &[Collidable],
        prev: &[Pair],
        out: &mut Vec<Pair>,
        arena: &mut ManifoldArena,
        margin: f32,
    ) {
        debug_assert_eq!(states.len(), collidables.len());
        debug_assert!(prev.windows(2).all(|w| w[0].key < w[1].key));

        self.compute_aabbs(states, collidables, margin);

        // Full pairwise sweep over active + static bodies
        self.candidates.clear();
        for i in 0..self.aabbs.len() {
            for j in (i + 1)..self.aabbs.len() {
                if self.aabbs[i].intersects(&self.aabbs[j]) {
                    self.candidates.push(PairKey::new(i, j));
                }
            }
        }
        assert!(
            self.candidates.len() <= MAX_PAIRS,
            "pair capacity exceeded: {} > {}",
            self.candidates.len(),
            MAX_PAIRS
        );

        // Stable merge sort by key; the downstream diff is a linear merge
        self.candidates.sort();

        // Lockstep merge-diff against the previous tick
        out.clear();
        self.fresh.clear();
        let mut ip = 0;
        let mut ic = 0;
        while ip < prev.len() && ic < self.candidates.len() {
            match prev[ip].key.cmp(&self.candidates[ic]) {
                core::cmp::Ordering::Less => {
                    // Vanished: free its manifold
                    arena.free(prev[ip].manifold);
                    ip += 1;
                }
                core::cmp::Ordering::Equal => {
                    out.push(Pair {
                        key: prev[ip].key,
                        phase: PairPhase::Keep,
                        manifold: prev[ip].manifold,
                    });
                    ip += 1;
                    ic += 1;
                }
                core::cmp::Ordering::Greater => {
                    self.fresh.push(self.candidates[ic]);
                    ic += 1;
                }
            }
        }
        for pair in &prev[ip..] {
            arena.free(pair.manifold);
        }
        self.fresh.extend_from_slice(&self.candidates[ic..]);

        // Refresh kept manifolds against current poses
        for pair in out.iter() {
            let pose_a = states[pair.key.body_a as usize].pose();
            let pose_b = states[pair.key.body_b as usize].pose();
            arena.get_mut(pair.manifold).refresh(&pose_a, &pose_b);
        }

        // Allocate zeroed manifolds for new pairs and append them
        for &key in &self.fresh {
            let friction = combined_friction(
                &bodies[key.body_a as usize],
                &bodies[key.body_b as usize],
            );
            out.push(Pair {
                key,
                phase: PairPhase::New,
                manifold: arena.allocate(friction),
            });
        }

        // The Keep/New concatenation interleaves keys; restore key order
        // for the next tick's diff
        out.sort_by_key(|pair| pair.key);
    }

    fn compute_aabbs(&mut self, states: &[RigidState], collidables: &[Collidable], margin: f32) {
        #[cfg(feature = "parallel")]
        {
            states
                .par_iter()
                .zip(collidables.par_iter())
                .map(|(state, collidable)| world_aabb(state, collidable, margin))
                .collect_into_vec(&mut self.aabbs);
        }

        #[cfg(not(feature = "parallel"))]
        {
            self.aabbs.clear();
            self.aabbs.extend(
                states
                    .iter()
                    .zip(collidables)
                    .map(|(state, collidable)| world_aabb(state, collidable, margin)),
            );
        }
    }
}

/// Aggregate friction for a pair: geometric mean of the two coefficients
#[inline]
#[must_use]
pub fn combined_friction(a: &RigidBodyAttributes, b: &RigidBodyAttributes) -> f32 {
    (a.friction * b.friction).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::ManifoldId;
    use crate::mesh::ConvexMesh;

    fn unit_cube_world(positions: &[Vec3]) -> (Vec<RigidState>, Vec<RigidBodyAttributes>, Vec<Collidable>) {
        let states: Vec<RigidState> = positions.iter().map(|&p| RigidState::new_active(p)).collect();
        let bodies = vec![RigidBodyAttributes::from_box(1.0, Vec3::splat(0.5), 0.0, 0.5); positions.len()];
        let collidables = positions
            .iter()
            .map(|_| Collidable::from_mesh(ConvexMesh::cuboid(Vec3::splat(0.5))).unwrap())
            .collect();
        (states, bodies, collidables)
    }

    #[test]
    fn test_aabb_intersection_symmetric() {
        let cases = [
            (Vec3::ZERO, Vec3::ONE, Vec3::new(1.5, 0.0, 0.0), Vec3::ONE),
            (Vec3::ZERO, Vec3::ONE, Vec3::new(3.0, 0.0, 0.0), Vec3::ONE),
            (Vec3::new(0.0, 2.0, 0.0), Vec3::splat(0.5), Vec3::ZERO, Vec3::splat(2.0)),
            (Vec3::ZERO, Vec3::splat(0.1), Vec3::new(0.0, 0.0, 0.2), Vec3::splat(0.1)),
        ];
        for (c1, h1, c2, h2) in cases {
            let a = Aabb { center: c1, half: h1 };
            let b = Aabb { center: c2, half: h2 };
            assert_eq!(a.intersects(&b), b.intersects(&a));
        }
    }

    #[test]
    fn test_world_aabb_margin() {
        let (states, _, collidables) = unit_cube_world(&[Vec3::new(1.0, 2.0, 3.0)]);
        let aabb = world_aabb(&states[0], &collidables[0], AABB_MARGIN);
        assert!((aabb.center - Vec3::new(1.0, 2.0, 3.0)).length() < 1.0e-6);
        assert!((aabb.half - Vec3::splat(0.51)).length() < 1.0e-6);
    }

    #[test]
    fn test_pairs_canonical_and_sorted() {
        let (states, bodies, collidables) = unit_cube_world(&[
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
        ]);
        let mut broad = BroadPhase::new();
        let mut arena = ManifoldArena::new();
        let mut out = Vec::new();
        broad.update(&states, &bodies, &collidables, &[], &mut out, &mut arena, AABB_MARGIN);

        assert_eq!(out.len(), 3); // 0-1, 0-2, 1-2 all within reach
        for pair in &out {
            assert!(pair.key.body_a < pair.key.body_b);
            assert_eq!(pair.phase, PairPhase::New);
            assert_ne!(pair.manifold, ManifoldId::INVALID);
        }
        assert!(out.windows(2).all(|w| w[0].key < w[1].key));
    }

    #[test]
    fn test_distant_bodies_no_pair() {
        // Half-extents 0.5 + 0.5 + margins < 3.0 separation
        let (states, bodies, collidables) =
            unit_cube_world(&[Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0)]);
        let mut broad = BroadPhase::new();
        let mut arena = ManifoldArena::new();
        let mut out = Vec::new();
        broad.update(&states, &bodies, &collidables, &[], &mut out, &mut arena, AABB_MARGIN);
        assert!(out.is_empty());
        assert_eq!(arena.live_count(), 0);
    }

    #[test]
    fn test_diff_keep_new_vanish() {
        // Tick 1: three overlapping bodies in a row
        let (mut states, bodies, collidables) = unit_cube_world(&[
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.6, 0.0, 0.0),
            Vec3::new(1.2, 0.0, 0.0),
        ]);
        let mut broad = BroadPhase::new();
        let mut arena = ManifoldArena::new();
        let mut tick1 = Vec::new();
        broad.update(&states, &bodies, &collidables, &[], &mut tick1, &mut arena, AABB_MARGIN);
        // 0-1 and 1-2 overlap; 0-2 does not (1.2 > 0.5+0.5+2*margin)
        assert_eq!(tick1.len(), 2);
        let kept_manifold = tick1[0].manifold;
        let live_after_tick1 = arena.live_count();
        assert_eq!(live_after_tick1, 2);

        // Tick 2: body 2 moves far away; 0-1 persists, 1-2 vanishes
        states[2].position = Vec3::new(10.0, 0.0, 0.0);
        let mut tick2 = Vec::new();
        broad.update(&states, &bodies, &collidables, &tick1, &mut tick2, &mut arena, AABB_MARGIN);

        assert_eq!(tick2.len(), 1);
        assert_eq!(tick2[0].key, PairKey::new(0, 1));
        assert_eq!(tick2[0].phase, PairPhase::Keep);
        assert_eq!(tick2[0].manifold, kept_manifold);
        // Exactly one manifold freed
        assert_eq!(arena.live_count(), 1);
    }

    #[test]
    fn test_new_pair_manifold_zeroed() {
        let (states, bodies, collidables) =
            unit_cube_world(&[Vec3::ZERO, Vec3::new(0.5, 0.0, 0.0)]);
        let mut broad = BroadPhase::new();
        let mut arena = ManifoldArena::new();
        let mut out = Vec::new();
        broad.update(&states, &bodies, &collidables, &[], &mut out, &mut arena, AABB_MARGIN);
        assert_eq!(out.len(), 1);
        let manifold = arena.get(out[0].manifold);
        assert!(manifold.is_empty());
        assert!((manifold.friction - 0.5).abs() < 1.0e-6);
    }
}

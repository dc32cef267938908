//! Persistent Contact Manifolds
//!
//! Each broad-phase pair owns one `Contact` manifold: up to 4 contact
//! points that survive across ticks. Points are refreshed against current
//! body poses every tick and retired once they drift beyond tolerance;
//! new points from the narrow phase merge with nearby existing points so
//! their accumulated impulses carry over (warm starting).
//!
//! Manifolds live in a [`ManifoldArena`]: a slot map with a free list,
//! allocated when a pair appears and recycled when it vanishes, so the
//! steady state causes no heap churn.
//!
//! Author: Moroya Sakamoto

use glam::Vec3;

use crate::math::Pose;

/// Maximum contact points per manifold
pub const MAX_CONTACT_POINTS: usize = 4;

/// A point is retired when its recomputed separation along the stored
/// normal exceeds this.
pub const NORMAL_DRIFT_THRESHOLD: f32 = 0.01;

/// A point is retired when its recomputed in-plane squared drift exceeds
/// this.
pub const TANGENT_DRIFT_THRESHOLD_SQ: f32 = 0.002;

// Squared distance within which an incoming point merges with an existing
// one instead of occupying a new slot (1 cm).
const MERGE_THRESHOLD_SQ: f32 = 1.0e-4;

/// One scalar constraint row: direction, impulse bounds and the impulse
/// accumulated across solver iterations (preserved across ticks for
/// warm starting).
#[derive(Clone, Copy, Debug, Default)]
pub struct Constraint {
    /// World-space constraint direction (normal or tangent)
    pub axis: Vec3,
    /// Accumulated impulse
    pub impulse: f32,
    /// Lower impulse bound
    pub lower: f32,
    /// Upper impulse bound
    pub upper: f32,
    /// Effective mass along `axis` (recomputed each tick by the solver)
    pub mass: f32,
    /// Velocity bias (recomputed each tick by the solver)
    pub bias: f32,
}

/// Index of the normal constraint within a contact point
pub const NORMAL: usize = 0;
/// Index of the first tangent constraint within a contact point
pub const TANGENT1: usize = 1;
/// Index of the second tangent constraint within a contact point
pub const TANGENT2: usize = 2;

/// One persistent contact point between two bodies
#[derive(Clone, Copy, Debug)]
pub struct ContactPoint {
    /// Penetration along the normal; negative while interpenetrating
    pub depth: f32,
    /// Contact point in body A's local frame
    pub local_a: Vec3,
    /// Contact point in body B's local frame
    pub local_b: Vec3,
    /// World-space contact normal, pointing from A to B
    pub normal: Vec3,
    /// Normal + two tangent constraint rows
    pub constraints: [Constraint; 3],
}

impl ContactPoint {
    fn new(depth: f32, normal: Vec3, local_a: Vec3, local_b: Vec3) -> Self {
        Self {
            depth,
            local_a,
            local_b,
            normal,
            constraints: [Constraint::default(); 3],
        }
    }
}

/// Persistent manifold: up to [`MAX_CONTACT_POINTS`] points plus the
/// aggregate friction coefficient of the pair.
#[derive(Clone, Debug)]
pub struct Contact {
    points: [ContactPoint; MAX_CONTACT_POINTS],
    count: usize,
    /// Combined friction coefficient for the pair
    pub friction: f32,
}

const EMPTY_POINT: ContactPoint = ContactPoint {
    depth: 0.0,
    local_a: Vec3::ZERO,
    local_b: Vec3::ZERO,
    normal: Vec3::ZERO,
    constraints: [Constraint {
        axis: Vec3::ZERO,
        impulse: 0.0,
        lower: 0.0,
        upper: 0.0,
        mass: 0.0,
        bias: 0.0,
    }; 3],
};

impl Contact {
    /// Empty manifold with the given pair friction
    #[must_use]
    pub fn new(friction: f32) -> Self {
        Self {
            points: [EMPTY_POINT; MAX_CONTACT_POINTS],
            count: 0,
            friction,
        }
    }

    /// Number of active contact points
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the manifold holds no points
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Active contact points
    #[inline]
    #[must_use]
    pub fn points(&self) -> &[ContactPoint] {
        &self.points[..self.count]
    }

    /// Active contact points, mutable (solver access)
    #[inline]
    pub fn points_mut(&mut self) -> &mut [ContactPoint] {
        &mut self.points[..self.count]
    }

    /// Drop all points and reset the friction coefficient
    pub fn reset(&mut self, friction: f32) {
        self.count = 0;
        self.friction = friction;
    }

    /// Re-validate every point against the bodies' current poses.
    ///
    /// A point is retired when the separation along its stored normal
    /// exceeds [`NORMAL_DRIFT_THRESHOLD`] or its in-plane squared drift
    /// exceeds [`TANGENT_DRIFT_THRESHOLD_SQ`]. Removal swap-fills from the
    /// last slot (order is not preserved). Surviving points keep their
    /// local coordinates and accumulated impulses; only the depth is
    /// recomputed.
    pub fn refresh(&mut self, pose_a: &Pose, pose_b: &Pose) {
        let mut i = 0;
        while i < self.count {
            let point = &self.points[i];
            let world_a = pose_a.transform_point(point.local_a);
            let world_b = pose_b.transform_point(point.local_b);
            let delta = world_b - world_a;
            let separation = delta.dot(point.normal);

            if separation > NORMAL_DRIFT_THRESHOLD {
                self.remove(i);
                continue;
            }

            let tangential = delta - point.normal * separation;
            if tangential.length_squared() > TANGENT_DRIFT_THRESHOLD_SQ {
                self.remove(i);
                continue;
            }

            self.points[i].depth = separation;
            i += 1;
        }
    }

    /// Insert a freshly detected contact point.
    ///
    /// A point within 1 cm of an existing one (in body A's frame) merges
    /// into that slot, preserving its accumulated impulses. Otherwise the
    /// point takes a free slot with zeroed impulses; at capacity the
    /// shallowest point is replaced, and only when the incoming point is
    /// deeper (deepest-retained policy).
    pub fn add_contact(&mut self, depth: f32, normal: Vec3, local_a: Vec3, local_b: Vec3) {
        // Nearest existing point within the merge threshold
        let mut best: Option<usize> = None;
        let mut best_dist_sq = MERGE_THRESHOLD_SQ;
        for (i, point) in self.points().iter().enumerate() {
            let dist_sq = (point.local_a - local_a).length_squared();
            if dist_sq < best_dist_sq {
                best_dist_sq = dist_sq;
                best = Some(i);
            }
        }

        if let Some(i) = best {
            // Replace geometry, keep the warm-start impulses
            let constraints = self.points[i].constraints;
            self.points[i] = ContactPoint::new(depth, normal, local_a, local_b);
            for (slot, old) in self.points[i].constraints.iter_mut().zip(constraints) {
                slot.impulse = old.impulse;
            }
            return;
        }

        if self.count < MAX_CONTACT_POINTS {
            self.points[self.count] = ContactPoint::new(depth, normal, local_a, local_b);
            self.count += 1;
            return;
        }

        // Full: replace the shallowest point, only if the new one is deeper
        let mut shallowest = 0;
        for i in 1..self.count {
            if self.points[i].depth > self.points[shallowest].depth {
                shallowest = i;
            }
        }
        if depth < self.points[shallowest].depth {
            self.points[shallowest] = ContactPoint::new(depth, normal, local_a, local_b);
        }
    }

    fn remove(&mut self, index: usize) {
        debug_assert!(index < self.count);
        self.points.swap(index, self.count - 1);
        self.count -= 1;
    }
}

// ============================================================================
// Manifold Arena
// ============================================================================

/// Handle of a manifold slot in the arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ManifoldId(u32);

impl ManifoldId {
    /// Sentinel for "no manifold assigned yet"
    pub const INVALID: Self = Self(u32::MAX);
}

/// Slot-map of contact manifolds keyed by pair lifecycle.
///
/// A slot is allocated when a pair first appears and returned to the free
/// list when the pair vanishes at broad phase; the slot storage itself is
/// never shrunk, so the steady state allocates nothing.
#[derive(Debug, Default)]
pub struct ManifoldArena {
    slots: Vec<Contact>,
    free: Vec<u32>,
}

impl ManifoldArena {
    /// Empty arena
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arena with pre-allocated slot capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    /// Allocate a zeroed manifold for a newly appeared pair
    pub fn allocate(&mut self, friction: f32) -> ManifoldId {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize].reset(friction);
                ManifoldId(slot)
            }
            None => {
                let slot = self.slots.len() as u32;
                self.slots.push(Contact::new(friction));
                ManifoldId(slot)
            }
        }
    }

    /// Return a vanished pair's manifold to the free list
    pub fn free(&mut self, id: ManifoldId) {
        debug_assert_ne!(id, ManifoldId::INVALID);
        debug_assert!(
            !self.free.contains(&id.0),
            "manifold {} freed twice",
            id.0
        );
        self.free.push(id.0);
    }

    /// Borrow a manifold
    #[inline]
    #[must_use]
    pub fn get(&self, id: ManifoldId) -> &Contact {
        &self.slots[id.0 as usize]
    }

    /// Borrow a manifold mutably
    #[inline]
    pub fn get_mut(&mut self, id: ManifoldId) -> &mut Contact {
        &mut self.slots[id.0 as usize]
    }

    /// Number of live (allocated, not freed) manifolds
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn poses_at(a: Vec3, b: Vec3) -> (Pose, Pose) {
        (Pose::from_position(a), Pose::from_position(b))
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let mut contact = Contact::new(0.5);
        for i in 0..10 {
            contact.add_contact(
                -0.1 * (i as f32 + 1.0),
                Vec3::Y,
                Vec3::new(i as f32, 0.0, 0.0),
                Vec3::new(i as f32, 0.0, 0.0),
            );
            assert!(contact.len() <= MAX_CONTACT_POINTS);
        }
        assert_eq!(contact.len(), MAX_CONTACT_POINTS);
    }

    #[test]
    fn test_full_manifold_keeps_deepest() {
        let mut contact = Contact::new(0.5);
        for i in 0..4 {
            contact.add_contact(-0.2, Vec3::Y, Vec3::new(i as f32, 0.0, 0.0), Vec3::ZERO);
        }
        // Shallower than everything present: rejected
        contact.add_contact(-0.1, Vec3::Y, Vec3::new(9.0, 0.0, 0.0), Vec3::ZERO);
        assert!(contact
            .points()
            .iter()
            .all(|p| (p.depth + 0.2).abs() < 1.0e-6));

        // Deeper: replaces one slot
        contact.add_contact(-0.5, Vec3::Y, Vec3::new(10.0, 0.0, 0.0), Vec3::ZERO);
        assert!(contact.points().iter().any(|p| (p.depth + 0.5).abs() < 1.0e-6));
        assert_eq!(contact.len(), MAX_CONTACT_POINTS);
    }

    #[test]
    fn test_merge_preserves_impulses() {
        let mut contact = Contact::new(0.5);
        contact.add_contact(-0.1, Vec3::Y, Vec3::ZERO, Vec3::ZERO);
        contact.points_mut()[0].constraints[NORMAL].impulse = 3.0;
        contact.points_mut()[0].constraints[TANGENT1].impulse = 1.0;

        // Within 1 cm of the existing point: merges, impulses survive
        contact.add_contact(-0.2, Vec3::Y, Vec3::new(0.005, 0.0, 0.0), Vec3::ZERO);
        assert_eq!(contact.len(), 1);
        assert_eq!(contact.points()[0].constraints[NORMAL].impulse, 3.0);
        assert_eq!(contact.points()[0].constraints[TANGENT1].impulse, 1.0);
        assert!((contact.points()[0].depth + 0.2).abs() < 1.0e-6);
    }

    #[test]
    fn test_new_point_zeroed_impulses() {
        let mut contact = Contact::new(0.5);
        contact.add_contact(-0.1, Vec3::Y, Vec3::ZERO, Vec3::ZERO);
        contact.add_contact(-0.1, Vec3::Y, Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO);
        for c in &contact.points()[1].constraints {
            assert_eq!(c.impulse, 0.0);
        }
    }

    #[test]
    fn test_refresh_retires_normal_drift() {
        let mut contact = Contact::new(0.5);
        // Coincident local points, normal +Y
        contact.add_contact(-0.005, Vec3::Y, Vec3::ZERO, Vec3::ZERO);

        // Bodies pulled apart along the normal beyond 0.01: retired
        let (pa, pb) = poses_at(Vec3::ZERO, Vec3::new(0.0, 0.02, 0.0));
        contact.refresh(&pa, &pb);
        assert_eq!(contact.len(), 0);
    }

    #[test]
    fn test_refresh_retires_tangential_drift() {
        let mut contact = Contact::new(0.5);
        contact.add_contact(-0.005, Vec3::Y, Vec3::ZERO, Vec3::ZERO);

        // Slid sideways: sqrt(0.002) ≈ 0.0447, so 0.1 is well past it
        let (pa, pb) = poses_at(Vec3::ZERO, Vec3::new(0.1, 0.0, 0.0));
        contact.refresh(&pa, &pb);
        assert_eq!(contact.len(), 0);
    }

    #[test]
    fn test_refresh_retains_within_thresholds() {
        let mut contact = Contact::new(0.5);
        let local_a = Vec3::new(0.5, 0.0, 0.0);
        contact.add_contact(-0.005, Vec3::Y, local_a, local_a);
        contact.points_mut()[0].constraints[NORMAL].impulse = 2.0;

        let (pa, pb) = poses_at(Vec3::ZERO, Vec3::new(0.0, 0.005, 0.0));
        contact.refresh(&pa, &pb);
        assert_eq!(contact.len(), 1);
        // Local coordinates unchanged, impulse preserved, depth recomputed
        assert_eq!(contact.points()[0].local_a, local_a);
        assert_eq!(contact.points()[0].constraints[NORMAL].impulse, 2.0);
        assert!((contact.points()[0].depth - 0.005).abs() < 1.0e-6);
    }

    #[test]
    fn test_refresh_swap_removal() {
        let mut contact = Contact::new(0.5);
        contact.add_contact(-0.005, Vec3::Y, Vec3::ZERO, Vec3::new(0.0, 0.0, 0.0));
        contact.add_contact(-0.005, Vec3::Y, Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 5.0, 0.0));
        contact.add_contact(-0.005, Vec3::Y, Vec3::new(2.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0));

        // Middle point's world positions disagree wildly: only it retires
        let (pa, pb) = poses_at(Vec3::ZERO, Vec3::ZERO);
        contact.refresh(&pa, &pb);
        assert_eq!(contact.len(), 2);
        let xs: Vec<f32> = contact.points().iter().map(|p| p.local_a.x).collect();
        assert!(xs.contains(&0.0) && xs.contains(&2.0));
    }

    #[test]
    fn test_arena_reuses_slots() {
        let mut arena = ManifoldArena::new();
        let a = arena.allocate(0.5);
        let b = arena.allocate(0.6);
        assert_eq!(arena.live_count(), 2);

        arena.get_mut(a).add_contact(-0.1, Vec3::Y, Vec3::ZERO, Vec3::ZERO);
        arena.free(a);
        assert_eq!(arena.live_count(), 1);

        // Recycled slot comes back zeroed with the new friction
        let c = arena.allocate(0.9);
        assert_eq!(c, a);
        assert_eq!(arena.get(c).len(), 0);
        assert!((arena.get(c).friction - 0.9).abs() < 1.0e-6);
        assert_eq!(arena.live_count(), 2);
        let _ = b;
    }
}

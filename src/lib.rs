//! # rigidsim
//!
//! **Fixed-Step Rigid-Body Simulation with Persistent Contact Manifolds**
//!
//! A Rust library implementing the full rigid-body pipeline: AABB broad
//! phase with pair diffing, SAT convex-convex narrow phase, persistent
//! warm-started contact manifolds, a sequential-impulse solver with ball
//! joints, and semi-implicit integration.
//!
//! ## Pipeline
//!
//! | Stage | Module | Approach |
//! |-------|--------|----------|
//! | **Broad phase** | [`broad_phase`] | O(n²) AABB sweep + sorted merge-diff |
//! | **Narrow phase** | [`sat`] | Separating Axis Theorem, convex edges only |
//! | **Manifolds** | [`contact`] | ≤4 persistent points, impulse warm starting |
//! | **Solver** | [`solver`] | Sequential impulses, Baumgarte stabilization |
//! | **Joints** | [`joint`] | Ball-and-socket, 3×3 block solve |
//! | **Integration** | [`body`] | Semi-implicit Euler, quaternion derivative |
//!
//! ## Design Principles
//!
//! - **Fixed capacities**: bodies, joints and pairs have compile-time upper
//!   bounds; the steady-state tick allocates nothing
//! - **Persistence**: pairs and contact points survive across ticks so
//!   accumulated impulses warm-start the solver
//! - **Deterministic**: the same inputs produce bit-identical trajectories
//!
//! ## Quick Start
//!
//! ```rust
//! use rigidsim::prelude::*;
//! use glam::Vec3;
//!
//! let mut world = PhysicsWorld::new();
//!
//! // A static floor and a cube dropped onto it
//! let floor = Collidable::from_mesh(ConvexMesh::cuboid(Vec3::new(5.0, 0.5, 5.0)))?;
//! world.add_body(
//!     RigidState::new_static(Vec3::ZERO),
//!     RigidBodyAttributes::new_static(0.0, 0.6),
//!     floor,
//! )?;
//!
//! let cube = Collidable::from_mesh(ConvexMesh::cuboid(Vec3::splat(0.5)))?;
//! world.add_body(
//!     RigidState::new_active(Vec3::new(0.0, 3.0, 0.0)),
//!     RigidBodyAttributes::from_box(1.0, Vec3::splat(0.5), 0.0, 0.5),
//!     cube,
//! )?;
//!
//! for _ in 0..120 {
//!     world.step();
//! }
//! assert!(world.state(1)?.position.y < 3.0);
//! # Ok::<(), rigidsim::PhysicsError>(())
//! ```
//!
//! Author: Moroya Sakamoto

pub mod body;
pub mod broad_phase;
pub mod contact;
pub mod error;
pub mod joint;
pub mod math;
pub mod mesh;
pub mod pair;
pub mod sat;
pub mod shape;
pub mod solver;
pub mod world;

pub use glam;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::body::{MotionKind, RigidBodyAttributes, RigidState};
    pub use crate::broad_phase::{combined_friction, world_aabb, Aabb, BroadPhase, AABB_MARGIN};
    pub use crate::contact::{
        Contact, ContactPoint, ManifoldArena, ManifoldId, MAX_CONTACT_POINTS,
    };
    pub use crate::error::PhysicsError;
    pub use crate::joint::BallJoint;
    pub use crate::math::Pose;
    pub use crate::mesh::{ConvexMesh, Edge, EdgeKind, Facet, MAX_EDGES, MAX_FACETS, MAX_VERTICES};
    pub use crate::pair::{Pair, PairKey, PairPhase};
    pub use crate::sat::{ContactSample, SatResult};
    pub use crate::shape::{Collidable, Shape, MAX_SHAPES};
    pub use crate::world::{
        PhysicsConfig, PhysicsWorld, WorldStats, MAX_BODIES, MAX_JOINTS, MAX_PAIRS,
    };
}

// Re-export main types at crate root
pub use prelude::*;

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use glam::Vec3;

    fn unit_cube() -> Collidable {
        Collidable::from_mesh(ConvexMesh::cuboid(Vec3::splat(0.5))).unwrap()
    }

    fn static_attrs() -> RigidBodyAttributes {
        RigidBodyAttributes::new_static(0.0, 0.5)
    }

    fn dynamic_attrs() -> RigidBodyAttributes {
        RigidBodyAttributes::from_box(1.0, Vec3::splat(0.5), 0.0, 0.5)
    }

    #[test]
    fn test_overlapping_cubes_contact() {
        // Unit cubes at x = 0 and x = 0.5: half a cube of overlap, and X is
        // the axis of least penetration
        let mut world = PhysicsWorld::new();
        world
            .add_body(RigidState::new_static(Vec3::ZERO), static_attrs(), unit_cube())
            .unwrap();
        world
            .add_body(
                RigidState::new_static(Vec3::new(0.5, 0.0, 0.0)),
                static_attrs(),
                unit_cube(),
            )
            .unwrap();
        world.step();

        assert_eq!(world.pairs().len(), 1);
        let manifold = world.manifold(&world.pairs()[0]);
        assert!(!manifold.is_empty());
        for point in manifold.points() {
            assert!((point.depth + 0.5).abs() < 1.0e-4, "depth = {}", point.depth);
            // Normal points from body 0 toward body 1
            assert!(point.normal.x > 0.99, "normal = {}", point.normal);
        }
    }

    #[test]
    fn test_separated_cubes_no_pair() {
        let mut world = PhysicsWorld::new();
        world
            .add_body(RigidState::new_static(Vec3::ZERO), static_attrs(), unit_cube())
            .unwrap();
        world
            .add_body(
                RigidState::new_static(Vec3::new(3.0, 0.0, 0.0)),
                static_attrs(),
                unit_cube(),
            )
            .unwrap();
        world.step();

        assert!(world.pairs().is_empty());
        assert_eq!(world.stats().contacts, 0);
        assert_eq!(world.stats().manifolds, 0);
    }

    #[test]
    fn test_manifold_persists_across_ticks() {
        let mut world = PhysicsWorld::new();
        world
            .add_body(RigidState::new_static(Vec3::ZERO), static_attrs(), unit_cube())
            .unwrap();
        world
            .add_body(
                RigidState::new_static(Vec3::new(0.5, 0.0, 0.0)),
                static_attrs(),
                unit_cube(),
            )
            .unwrap();

        world.step();
        assert_eq!(world.pairs()[0].phase, PairPhase::New);
        let first_manifold = world.pairs()[0].manifold;

        world.step();
        assert_eq!(world.pairs()[0].phase, PairPhase::Keep);
        assert_eq!(world.pairs()[0].manifold, first_manifold);
        assert!(!world.manifold(&world.pairs()[0]).is_empty());
    }

    #[test]
    fn test_static_body_bit_identical_through_step() {
        let mut world = PhysicsWorld::new();
        world
            .add_body(
                RigidState::new_static(Vec3::new(0.25, -0.75, 0.125)),
                static_attrs(),
                unit_cube(),
            )
            .unwrap();
        // A dynamic body overlapping it, so every stage touches the pair
        world
            .add_body(
                RigidState::new_active(Vec3::new(0.5, 0.0, 0.0)),
                dynamic_attrs(),
                unit_cube(),
            )
            .unwrap();

        let before = *world.state(0).unwrap();
        for _ in 0..10 {
            world.step();
        }
        assert_eq!(before, *world.state(0).unwrap());
    }

    #[test]
    fn test_cube_settles_on_floor() {
        let mut world = PhysicsWorld::new();
        let floor =
            Collidable::from_mesh(ConvexMesh::cuboid(Vec3::new(5.0, 0.5, 5.0))).unwrap();
        world
            .add_body(RigidState::new_static(Vec3::ZERO), static_attrs(), floor)
            .unwrap();
        world
            .add_body(
                RigidState::new_active(Vec3::new(0.0, 2.0, 0.0)),
                dynamic_attrs(),
                unit_cube(),
            )
            .unwrap();

        for _ in 0..300 {
            world.step();
        }

        let state = world.state(1).unwrap();
        // Resting on the floor: floor top 0.5 + cube half-extent 0.5
        assert!(
            state.position.y > 0.85 && state.position.y < 1.15,
            "settled at y = {}",
            state.position.y
        );
        assert!(
            state.linear_velocity.length() < 0.1,
            "still moving: {}",
            state.linear_velocity
        );
    }

    #[test]
    fn test_ball_joint_pendulum_holds_anchor() {
        let mut world = PhysicsWorld::new();
        // Small static anchor block, bob hanging 1.5 away (no overlap)
        let anchor_block =
            Collidable::from_mesh(ConvexMesh::cuboid(Vec3::splat(0.1))).unwrap();
        world
            .add_body(RigidState::new_static(Vec3::ZERO), static_attrs(), anchor_block)
            .unwrap();
        world
            .add_body(
                RigidState::new_active(Vec3::new(1.5, 0.0, 0.0)),
                dynamic_attrs(),
                unit_cube(),
            )
            .unwrap();
        world
            .add_joint(BallJoint::new(
                0,
                1,
                Vec3::ZERO,
                Vec3::new(-1.5, 0.0, 0.0),
            ))
            .unwrap();

        for _ in 0..100 {
            world.step();
        }

        // The bob swings under gravity but its anchor stays pinned
        let bob = world.state(1).unwrap();
        let anchor_world = bob.pose().transform_point(Vec3::new(-1.5, 0.0, 0.0));
        assert!(
            anchor_world.length() < 0.2,
            "anchor drifted to {anchor_world}"
        );
        // It actually swung away from the start
        assert!((bob.position - Vec3::new(1.5, 0.0, 0.0)).length() > 0.1);
    }

    #[test]
    fn test_deterministic_replay() {
        fn simulate() -> Vec3 {
            let mut world = PhysicsWorld::new();
            let floor =
                Collidable::from_mesh(ConvexMesh::cuboid(Vec3::new(5.0, 0.5, 5.0))).unwrap();
            world
                .add_body(RigidState::new_static(Vec3::ZERO), static_attrs(), floor)
                .unwrap();
            for i in 0..5 {
                world
                    .add_body(
                        RigidState::new_active(Vec3::new(
                            0.3 * i as f32,
                            2.0 + 1.1 * i as f32,
                            0.0,
                        )),
                        dynamic_attrs(),
                        unit_cube(),
                    )
                    .unwrap();
            }
            for _ in 0..120 {
                world.step();
            }
            world.state(3).unwrap().position
        }

        // Bit-exact equality, not just "close"
        assert_eq!(simulate(), simulate());
    }
}

//! Physics World — Fixed-Step Simulation Driver
//!
//! `PhysicsWorld` owns every per-body array (state, attributes, collision
//! geometry), the joint table, the pair lists of the current and previous
//! tick, and the manifold arena. [`PhysicsWorld::step`] advances the whole
//! simulation by one fixed timestep:
//!
//! 1. Broad phase: AABB sweep + merge-diff against the previous tick
//! 2. Narrow phase: SAT per overlapping shape combination, feeding the
//!    persistent manifolds
//! 3. Gravity accumulation
//! 4. Sequential-impulse constraint solve (contacts + ball joints)
//! 5. Integration
//!
//! Registration is `Result`-based and bounded by fixed capacities; the tick
//! itself never fails and never allocates in the steady state.
//!
//! Author: Moroya Sakamoto

use core::mem;

use glam::Vec3;
use log::trace;

use crate::body::{self, RigidBodyAttributes, RigidState};
use crate::broad_phase::{BroadPhase, AABB_MARGIN};
use crate::contact::{Contact, ManifoldArena};
use crate::error::PhysicsError;
use crate::joint::BallJoint;
use crate::pair::Pair;
use crate::sat;
use crate::shape::Collidable;
use crate::solver;

/// Maximum number of bodies in a world
pub const MAX_BODIES: usize = 500;
/// Maximum number of ball joints in a world
pub const MAX_JOINTS: usize = 100;
/// Maximum number of overlapping pairs per tick
pub const MAX_PAIRS: usize = 5000;

/// Tunable simulation parameters, fixed per world
#[derive(Clone, Copy, Debug)]
pub struct PhysicsConfig {
    /// Fixed timestep in seconds
    pub time_step: f32,
    /// Uniform gravity acceleration
    pub gravity: Vec3,
    /// Gauss-Seidel iterations per tick
    pub solver_iterations: u32,
    /// Baumgarte factor for contact penetration correction
    pub bias: f32,
    /// Penetration depth tolerated without correction
    pub slop: f32,
    /// Broad-phase AABB expansion margin
    pub aabb_margin: f32,
    /// Scale on re-applied accumulated impulses (1 = full warm starting)
    pub warm_start: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            time_step: 0.016,
            gravity: Vec3::new(0.0, -9.8, 0.0),
            solver_iterations: 10,
            bias: 0.2,
            slop: 0.005,
            aabb_margin: AABB_MARGIN,
            warm_start: 1.0,
        }
    }
}

/// Per-tick simulation counters
#[derive(Clone, Copy, Debug, Default)]
pub struct WorldStats {
    /// Ticks simulated since creation
    pub ticks: u64,
    /// Overlapping pairs in the last tick
    pub pairs: usize,
    /// Contact points fed to the solver in the last tick
    pub contacts: usize,
    /// Live manifolds in the arena after the last tick
    pub manifolds: usize,
}

/// The complete simulation: bodies, joints, pair/manifold persistence and
/// the fixed-step pipeline over them.
#[derive(Debug, Default)]
pub struct PhysicsWorld {
    config: PhysicsConfig,
    states: Vec<RigidState>,
    bodies: Vec<RigidBodyAttributes>,
    collidables: Vec<Collidable>,
    joints: Vec<BallJoint>,
    /// Key-sorted pair list of the last completed tick
    pairs: Vec<Pair>,
    /// Double buffer for the next tick's pair list
    pairs_scratch: Vec<Pair>,
    arena: ManifoldArena,
    broad: BroadPhase,
    stats: WorldStats,
}

impl PhysicsWorld {
    /// World with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PhysicsConfig::default())
    }

    /// World with an explicit configuration
    #[must_use]
    pub fn with_config(config: PhysicsConfig) -> Self {
        Self {
            config,
            states: Vec::new(),
            bodies: Vec::new(),
            collidables: Vec::new(),
            joints: Vec::new(),
            pairs: Vec::new(),
            pairs_scratch: Vec::new(),
            arena: ManifoldArena::with_capacity(64),
            broad: BroadPhase::new(),
            stats: WorldStats::default(),
        }
    }

    /// Register a body and return its index.
    ///
    /// The collidable is finalized here if the caller has not already done
    /// so; a collidable with no shapes is rejected.
    pub fn add_body(
        &mut self,
        state: RigidState,
        attrs: RigidBodyAttributes,
        mut collidable: Collidable,
    ) -> Result<usize, PhysicsError> {
        if self.states.len() >= MAX_BODIES {
            return Err(PhysicsError::BodyCapacity { max: MAX_BODIES });
        }
        if !collidable.is_finished() {
            collidable.finish()?;
        }
        let index = self.states.len();
        self.states.push(state);
        self.bodies.push(attrs);
        self.collidables.push(collidable);
        Ok(index)
    }

    /// Register a ball joint and return its index.
    pub fn add_joint(&mut self, joint: BallJoint) -> Result<usize, PhysicsError> {
        if self.joints.len() >= MAX_JOINTS {
            return Err(PhysicsError::JointCapacity { max: MAX_JOINTS });
        }
        for body in [joint.body_a, joint.body_b] {
            if body >= self.states.len() {
                return Err(PhysicsError::InvalidBodyIndex {
                    index: body,
                    count: self.states.len(),
                });
            }
        }
        let index = self.joints.len();
        self.joints.push(joint);
        Ok(index)
    }

    /// Overwrite a body's dynamic state (teleport / respawn)
    pub fn reset_body(&mut self, index: usize, state: RigidState) -> Result<(), PhysicsError> {
        match self.states.get_mut(index) {
            Some(slot) => {
                *slot = state;
                Ok(())
            }
            None => Err(PhysicsError::InvalidBodyIndex {
                index,
                count: self.states.len(),
            }),
        }
    }

    /// Advance the simulation by one fixed timestep.
    pub fn step(&mut self) {
        let dt = self.config.time_step;

        // Broad phase into the scratch buffer, then swap it in as the
        // current pair list
        let mut next = mem::take(&mut self.pairs_scratch);
        self.broad.update(
            &self.states,
            &self.bodies,
            &self.collidables,
            &self.pairs,
            &mut next,
            &mut self.arena,
            self.config.aabb_margin,
        );
        self.pairs_scratch = mem::replace(&mut self.pairs, next);

        // Narrow phase: SAT per shape combination of every pair
        let mut contacts = 0;
        for pair in &self.pairs {
            let a = pair.key.body_a as usize;
            let b = pair.key.body_b as usize;
            let pose_a = self.states[a].pose();
            let pose_b = self.states[b].pose();

            for shape_a in self.collidables[a].shapes() {
                let world_a = pose_a.transform_pose(&shape_a.offset);
                for shape_b in self.collidables[b].shapes() {
                    let world_b = pose_b.transform_pose(&shape_b.offset);
                    if let Some(hit) =
                        sat::collide(&shape_a.mesh, &world_a, &shape_b.mesh, &world_b)
                    {
                        // Manifolds store body-local points so they track
                        // the bodies between ticks
                        let manifold = self.arena.get_mut(pair.manifold);
                        for sample in hit.samples() {
                            manifold.add_contact(
                                sample.depth,
                                hit.normal,
                                pose_a.inverse_transform_point(sample.point_a),
                                pose_b.inverse_transform_point(sample.point_b),
                            );
                        }
                    }
                }
            }
            contacts += self.arena.get(pair.manifold).len();
        }

        body::apply_acceleration(&mut self.states, self.config.gravity, dt);

        solver::solve_constraints(
            &mut self.states,
            &self.bodies,
            &self.pairs,
            &mut self.arena,
            &mut self.joints,
            self.config.solver_iterations,
            self.config.bias,
            self.config.slop,
            self.config.warm_start,
            dt,
        );

        body::integrate(&mut self.states, dt);

        self.stats = WorldStats {
            ticks: self.stats.ticks + 1,
            pairs: self.pairs.len(),
            contacts,
            manifolds: self.arena.live_count(),
        };
        trace!(
            "tick {}: {} pairs, {} contacts, {} manifolds",
            self.stats.ticks,
            self.stats.pairs,
            self.stats.contacts,
            self.stats.manifolds
        );
    }

    /// Configuration this world was created with
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Number of registered bodies
    #[inline]
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.states.len()
    }

    /// Dynamic states of all bodies, indexed by body id
    #[inline]
    #[must_use]
    pub fn states(&self) -> &[RigidState] {
        &self.states
    }

    /// Dynamic state of one body
    pub fn state(&self, index: usize) -> Result<&RigidState, PhysicsError> {
        self.states.get(index).ok_or(PhysicsError::InvalidBodyIndex {
            index,
            count: self.states.len(),
        })
    }

    /// Mass properties of all bodies, indexed by body id
    #[inline]
    #[must_use]
    pub fn bodies(&self) -> &[RigidBodyAttributes] {
        &self.bodies
    }

    /// Registered joints
    #[inline]
    #[must_use]
    pub fn joints(&self) -> &[BallJoint] {
        &self.joints
    }

    /// Pair list of the last completed tick, key-sorted
    #[inline]
    #[must_use]
    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    /// Contact manifold of a pair from [`pairs`](Self::pairs)
    #[inline]
    #[must_use]
    pub fn manifold(&self, pair: &Pair) -> &Contact {
        self.arena.get(pair.manifold)
    }

    /// Counters from the last completed tick
    #[inline]
    #[must_use]
    pub fn stats(&self) -> &WorldStats {
        &self.stats
    }
}

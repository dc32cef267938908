//! Rigid Body State and Attributes
//!
//! `RigidState` is the per-tick mutable state (pose + velocities) and
//! `RigidBodyAttributes` the mass properties, paired 1:1 by body index.
//! Attributes are immutable after setup except through [`RigidBodyAttributes::reset`].
//! The integrator and the external-force accumulator live here as free
//! functions over the state/attribute slices, matching the pipeline's
//! data-oriented layout.
//!
//! Author: Moroya Sakamoto

use glam::{Mat3, Quat, Vec3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::math::Pose;

/// How a body participates in the simulation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MotionKind {
    /// Integrated and solved every tick
    Active,
    /// Collides but is never moved by the solver or integrator
    Static,
}

/// Per-body dynamic state: pose and velocities
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidState {
    /// World-space position of the center of mass
    pub position: Vec3,
    /// World-space orientation (unit quaternion)
    pub orientation: Quat,
    /// Linear velocity
    pub linear_velocity: Vec3,
    /// Angular velocity (world space, radians/s)
    pub angular_velocity: Vec3,
    /// Active or static
    pub motion: MotionKind,
}

impl RigidState {
    /// Active body at rest at `position`
    #[must_use]
    pub fn new_active(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            motion: MotionKind::Active,
        }
    }

    /// Static body at `position`
    #[must_use]
    pub fn new_static(position: Vec3) -> Self {
        Self {
            motion: MotionKind::Static,
            ..Self::new_active(position)
        }
    }

    /// Set the orientation (builder style)
    #[must_use]
    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation.normalize();
        self
    }

    /// Set the linear velocity (builder style)
    #[must_use]
    pub fn with_linear_velocity(mut self, velocity: Vec3) -> Self {
        self.linear_velocity = velocity;
        self
    }

    /// World pose of the body
    #[inline]
    #[must_use]
    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.orientation)
    }
}

/// Mass properties and surface coefficients, paired 1:1 with a `RigidState`
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidBodyAttributes {
    /// Mass (kg); 0 means infinite (static)
    pub mass: f32,
    /// Local-space inertia tensor
    pub inertia: Mat3,
    /// Restitution coefficient, 0 (inelastic) to 1 (elastic)
    pub restitution: f32,
    /// Friction coefficient
    pub friction: f32,
    /// Precomputed inverse mass (0 for infinite mass)
    pub inv_mass: f32,
    /// Precomputed local-space inverse inertia (zero for infinite mass)
    pub inv_inertia: Mat3,
}

impl RigidBodyAttributes {
    /// Create attributes; inverse mass/inertia are derived once here.
    ///
    /// `mass <= 0` is treated as infinite mass (static participation).
    #[must_use]
    pub fn new(mass: f32, inertia: Mat3, restitution: f32, friction: f32) -> Self {
        let mut attrs = Self {
            mass: 0.0,
            inertia: Mat3::IDENTITY,
            restitution,
            friction,
            inv_mass: 0.0,
            inv_inertia: Mat3::ZERO,
        };
        attrs.reset(mass, inertia);
        attrs
    }

    /// Attributes for a solid box of the given half-extents
    #[must_use]
    pub fn from_box(mass: f32, half: Vec3, restitution: f32, friction: f32) -> Self {
        let (x2, y2, z2) = (
            4.0 * half.x * half.x,
            4.0 * half.y * half.y,
            4.0 * half.z * half.z,
        );
        let m = mass.max(0.0) / 12.0;
        let inertia = Mat3::from_diagonal(Vec3::new(
            m * (y2 + z2),
            m * (x2 + z2),
            m * (x2 + y2),
        ));
        Self::new(mass, inertia, restitution, friction)
    }

    /// Infinite-mass attributes for static geometry
    #[must_use]
    pub fn new_static(restitution: f32, friction: f32) -> Self {
        Self::new(0.0, Mat3::IDENTITY, restitution, friction)
    }

    /// Explicitly reset mass properties, recomputing the inverses.
    pub fn reset(&mut self, mass: f32, inertia: Mat3) {
        self.mass = mass;
        self.inertia = inertia;
        if mass > 0.0 {
            self.inv_mass = 1.0 / mass;
            self.inv_inertia = inertia.inverse();
        } else {
            self.inv_mass = 0.0;
            self.inv_inertia = Mat3::ZERO;
        }
    }

    /// Inverse inertia tensor in world space for the given orientation
    #[inline]
    #[must_use]
    pub fn inv_inertia_world(&self, orientation: Quat) -> Mat3 {
        let r = Mat3::from_quat(orientation);
        r * self.inv_inertia * r.transpose()
    }
}

/// Advance every active body's pose by one timestep.
///
/// Position integrates linearly; orientation integrates the quaternion
/// derivative `q' = ½ (ω, 0) q` and renormalizes. Static bodies are left
/// bit-identical, as is an active body with zero velocities.
pub fn integrate(states: &mut [RigidState], time_step: f32) {
    for state in states {
        if state.motion == MotionKind::Static {
            continue;
        }

        if state.linear_velocity != Vec3::ZERO {
            state.position += state.linear_velocity * time_step;
        }

        let omega = state.angular_velocity;
        if omega != Vec3::ZERO {
            let q = state.orientation;
            let dq = Quat::from_xyzw(omega.x, omega.y, omega.z, 0.0) * q;
            state.orientation = Quat::from_xyzw(
                q.x + dq.x * 0.5 * time_step,
                q.y + dq.y * 0.5 * time_step,
                q.z + dq.z * 0.5 * time_step,
                q.w + dq.w * 0.5 * time_step,
            )
            .normalize();
        }
    }
}

/// Accumulate an external force and torque into every active body's
/// velocities over one timestep, scaled by inverse mass/inertia.
pub fn apply_external_force(
    states: &mut [RigidState],
    bodies: &[RigidBodyAttributes],
    force: Vec3,
    torque: Vec3,
    time_step: f32,
) {
    debug_assert_eq!(states.len(), bodies.len());
    for (state, attrs) in states.iter_mut().zip(bodies) {
        if state.motion == MotionKind::Static {
            continue;
        }
        state.linear_velocity += force * (attrs.inv_mass * time_step);
        if torque != Vec3::ZERO {
            let inv_inertia = attrs.inv_inertia_world(state.orientation);
            state.angular_velocity += inv_inertia * torque * time_step;
        }
    }
}

/// Accumulate a uniform acceleration (gravity) into every active body.
///
/// Unlike [`apply_external_force`] this is mass-independent; it is what the
/// driver uses for the configured gravity each tick.
pub fn apply_acceleration(states: &mut [RigidState], acceleration: Vec3, time_step: f32) {
    for state in states {
        if state.motion == MotionKind::Static {
            continue;
        }
        state.linear_velocity += acceleration * time_step;
    }
}

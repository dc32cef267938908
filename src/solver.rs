//! Constraint Solver — Sequential Impulses
//!
//! Projected Gauss-Seidel over all contact points and ball joints. Each
//! tick the solver rebuilds effective masses and bias velocities for the
//! current poses, re-applies the impulses accumulated on the previous tick
//! (warm starting), then runs a fixed number of iterations clamping the
//! normal impulse to `[0, ∞)` and each friction impulse to `±μ·λₙ`.
//!
//! Positional drift beyond the slop tolerance is corrected through a
//! Baumgarte velocity bias; restitution adds a bounce bias from the
//! pre-solve approach speed when it exceeds a small threshold.
//!
//! Author: Moroya Sakamoto

use glam::{Mat3, Vec3};

use crate::body::{MotionKind, RigidBodyAttributes, RigidState};
use crate::contact::{ManifoldArena, ManifoldId, NORMAL, TANGENT1, TANGENT2};
use crate::joint::BallJoint;
use crate::math::{skew, tangent_frame};
use crate::pair::Pair;

// Approach speeds below this produce no restitution bounce.
const RESTITUTION_THRESHOLD: f32 = 1.0;

// Penetration beyond slop corrected per tick is capped so a deep overlap
// is pushed out over several ticks instead of launching the body.
const MAX_PENETRATION_CORRECTION: f32 = 0.05;

// Per-body solve view: inverse mass/inertia, zeroed for static bodies so
// impulses never move them.
#[derive(Clone, Copy)]
struct BodyView {
    inv_mass: f32,
    inv_inertia: Mat3,
}

// One contact point scheduled for solving: which manifold slot it lives
// in plus the per-tick lever arms.
struct ContactRow {
    manifold: ManifoldId,
    point: usize,
    body_a: usize,
    body_b: usize,
    ra: Vec3,
    rb: Vec3,
}

// Per-tick joint scratch: lever arms, inverse effective mass, bias.
struct JointRow {
    joint: usize,
    ra: Vec3,
    rb: Vec3,
    inv_k: Mat3,
    bias_velocity: Vec3,
}

/// Resolve all contact and joint constraints into body velocities.
///
/// `iterations` Gauss-Seidel passes; `bias` is the Baumgarte factor
/// applied to penetration beyond `slop`; `warm_start` scales the re-applied
/// accumulated impulses (1 = full warm starting). Static bodies are never
/// written.
#[allow(clippy::too_many_arguments)]
pub fn solve_constraints(
    states: &mut [RigidState],
    bodies: &[RigidBodyAttributes],
    pairs: &[Pair],
    arena: &mut ManifoldArena,
    joints: &mut [BallJoint],
    iterations: u32,
    bias: f32,
    slop: f32,
    warm_start: f32,
    time_step: f32,
) {
    debug_assert_eq!(states.len(), bodies.len());
    debug_assert!(time_step > 0.0);

    let views: Vec<BodyView> = states
        .iter()
        .zip(bodies)
        .map(|(state, attrs)| {
            if state.motion == MotionKind::Static {
                BodyView {
                    inv_mass: 0.0,
                    inv_inertia: Mat3::ZERO,
                }
            } else {
                BodyView {
                    inv_mass: attrs.inv_mass,
                    inv_inertia: attrs.inv_inertia_world(state.orientation),
                }
            }
        })
        .collect();

    let contact_rows = prepare_contacts(
        states, bodies, &views, pairs, arena, bias, slop, warm_start, time_step,
    );
    let joint_rows = prepare_joints(states, &views, joints, warm_start, time_step);

    for _ in 0..iterations {
        for row in &joint_rows {
            solve_joint(states, &views, joints, row);
        }
        for row in &contact_rows {
            solve_contact(states, &views, arena, row);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn prepare_contacts(
    states: &mut [RigidState],
    bodies: &[RigidBodyAttributes],
    views: &[BodyView],
    pairs: &[Pair],
    arena: &mut ManifoldArena,
    bias: f32,
    slop: f32,
    warm_start: f32,
    time_step: f32,
) -> Vec<ContactRow> {
    let mut rows = Vec::new();

    for pair in pairs {
        let a = pair.key.body_a as usize;
        let b = pair.key.body_b as usize;
        if views[a].inv_mass + views[b].inv_mass == 0.0 {
            // Two static bodies: nothing to solve
            continue;
        }
        let restitution = bodies[a].restitution.max(bodies[b].restitution);

        let manifold = arena.get_mut(pair.manifold);
        for (pi, point) in manifold.points_mut().iter_mut().enumerate() {
            let ra = states[a].orientation * point.local_a;
            let rb = states[b].orientation * point.local_b;
            let normal = point.normal;
            let (t1, t2) = tangent_frame(normal);

            let dv = relative_velocity(&states[b], rb) - relative_velocity(&states[a], ra);
            let vn = dv.dot(normal);

            // Baumgarte push-out for penetration beyond slop, plus a
            // restitution bounce from the approach speed
            let correction = (-point.depth - slop)
                .max(0.0)
                .min(MAX_PENETRATION_CORRECTION);
            let baumgarte = (bias / time_step) * correction;
            let bounce = if vn < -RESTITUTION_THRESHOLD {
                -restitution * vn
            } else {
                0.0
            };

            let axes = [normal, t1, t2];
            for (ci, axis) in axes.iter().enumerate() {
                let c = &mut point.constraints[ci];
                c.axis = *axis;
                c.mass = effective_mass(&views[a], &views[b], ra, rb, *axis);
                c.bias = 0.0;
            }
            point.constraints[NORMAL].bias = baumgarte.max(bounce);
            point.constraints[NORMAL].lower = 0.0;
            point.constraints[NORMAL].upper = f32::INFINITY;

            // Warm start: re-apply last tick's impulses along the new axes
            let mut impulse = Vec3::ZERO;
            for c in &mut point.constraints {
                c.impulse *= warm_start;
                impulse += c.axis * c.impulse;
            }
            apply_impulse(states, views, a, b, ra, rb, impulse);

            rows.push(ContactRow {
                manifold: pair.manifold,
                point: pi,
                body_a: a,
                body_b: b,
                ra,
                rb,
            });
        }
    }

    rows
}

fn solve_contact(
    states: &mut [RigidState],
    views: &[BodyView],
    arena: &mut ManifoldArena,
    row: &ContactRow,
) {
    let (a, b) = (row.body_a, row.body_b);
    let friction = arena.get(row.manifold).friction;
    let point = &mut arena.get_mut(row.manifold).points_mut()[row.point];

    // Normal impulse: push apart, never pull together
    {
        let c = &mut point.constraints[NORMAL];
        let dv = relative_velocity(&states[b], row.rb) - relative_velocity(&states[a], row.ra);
        let vn = dv.dot(c.axis);
        let delta = c.mass * (c.bias - vn);
        let accumulated = (c.impulse + delta).clamp(c.lower, c.upper);
        let applied = accumulated - c.impulse;
        c.impulse = accumulated;
        let impulse = c.axis * applied;
        apply_impulse(states, views, a, b, row.ra, row.rb, impulse);
    }

    // Friction impulses, clamped inside the cone of the current normal
    // impulse
    let limit = friction * point.constraints[NORMAL].impulse;
    for ci in [TANGENT1, TANGENT2] {
        let c = &mut point.constraints[ci];
        c.lower = -limit;
        c.upper = limit;

        let dv = relative_velocity(&states[b], row.rb) - relative_velocity(&states[a], row.ra);
        let vt = dv.dot(c.axis);
        let delta = c.mass * -vt;
        let accumulated = (c.impulse + delta).clamp(c.lower, c.upper);
        let applied = accumulated - c.impulse;
        c.impulse = accumulated;
        let impulse = c.axis * applied;
        apply_impulse(states, views, a, b, row.ra, row.rb, impulse);
    }
}

fn prepare_joints(
    states: &mut [RigidState],
    views: &[BodyView],
    joints: &mut [BallJoint],
    warm_start: f32,
    time_step: f32,
) -> Vec<JointRow> {
    let mut rows = Vec::new();

    for (ji, joint) in joints.iter_mut().enumerate() {
        let (a, b) = (joint.body_a, joint.body_b);
        if views[a].inv_mass + views[b].inv_mass == 0.0 {
            continue;
        }

        let ra = states[a].orientation * joint.local_anchor_a;
        let rb = states[b].orientation * joint.local_anchor_b;

        // Positional drift of the two anchors, corrected via bias velocity
        let drift = (states[b].position + rb) - (states[a].position + ra);
        let bias_velocity = drift * (joint.bias / time_step);

        let k = Mat3::IDENTITY * (views[a].inv_mass + views[b].inv_mass)
            - skew(ra) * views[a].inv_inertia * skew(ra)
            - skew(rb) * views[b].inv_inertia * skew(rb);

        // Warm start
        joint.impulse *= warm_start;
        apply_impulse(states, views, a, b, ra, rb, joint.impulse);

        rows.push(JointRow {
            joint: ji,
            ra,
            rb,
            inv_k: k.inverse(),
            bias_velocity,
        });
    }

    rows
}

fn solve_joint(
    states: &mut [RigidState],
    views: &[BodyView],
    joints: &mut [BallJoint],
    row: &JointRow,
) {
    let joint = &mut joints[row.joint];
    let (a, b) = (joint.body_a, joint.body_b);

    let dv = relative_velocity(&states[b], row.rb) - relative_velocity(&states[a], row.ra);
    let delta = row.inv_k * -(dv + row.bias_velocity);
    joint.impulse += delta;
    apply_impulse(states, views, a, b, row.ra, row.rb, delta);
}

// Velocity of the body point at lever arm `r` from the center of mass
#[inline]
fn relative_velocity(state: &RigidState, r: Vec3) -> Vec3 {
    state.linear_velocity + state.angular_velocity.cross(r)
}

// Effective mass of the pair along `axis` at the given lever arms
#[inline]
fn effective_mass(a: &BodyView, b: &BodyView, ra: Vec3, rb: Vec3, axis: Vec3) -> f32 {
    let ta = a.inv_inertia * ra.cross(axis);
    let tb = b.inv_inertia * rb.cross(axis);
    let k = a.inv_mass + b.inv_mass + (ta.cross(ra) + tb.cross(rb)).dot(axis);
    if k > 0.0 {
        1.0 / k
    } else {
        0.0
    }
}

// Apply `impulse` positively to body b and negatively to body a. Static
// bodies (zero inverse mass) are never written.
#[inline]
fn apply_impulse(
    states: &mut [RigidState],
    views: &[BodyView],
    a: usize,
    b: usize,
    ra: Vec3,
    rb: Vec3,
    impulse: Vec3,
) {
    if views[a].inv_mass > 0.0 || views[a].inv_inertia != Mat3::ZERO {
        states[a].linear_velocity -= impulse * views[a].inv_mass;
        states[a].angular_velocity -= views[a].inv_inertia * ra.cross(impulse);
    }
    if views[b].inv_mass > 0.0 || views[b].inv_inertia != Mat3::ZERO {
        states[b].linear_velocity += impulse * views[b].inv_mass;
        states[b].angular_velocity += views[b].inv_inertia * rb.cross(impulse);
    }
}

//! Ball Joints
//!
//! Ball-and-socket joint: constrains an anchor point on each body to
//! coincide while leaving rotation free. The accumulated impulse is kept
//! across ticks for warm starting, like a contact constraint's.

use glam::Vec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Ball-and-socket joint (3 constrained translational DOF)
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BallJoint {
    /// First connected body index
    pub body_a: usize,
    /// Second connected body index
    pub body_b: usize,
    /// Anchor point in body A's local frame
    pub local_anchor_a: Vec3,
    /// Anchor point in body B's local frame
    pub local_anchor_b: Vec3,
    /// Positional bias factor (fraction of drift corrected per tick)
    pub bias: f32,
    /// Accumulated impulse, preserved across ticks for warm starting
    pub impulse: Vec3,
}

impl BallJoint {
    /// Create a ball joint between two bodies with the default bias
    #[must_use]
    pub fn new(body_a: usize, body_b: usize, anchor_a: Vec3, anchor_b: Vec3) -> Self {
        Self {
            body_a,
            body_b,
            local_anchor_a: anchor_a,
            local_anchor_b: anchor_b,
            bias: 0.2,
            impulse: Vec3::ZERO,
        }
    }

    /// Set the positional bias factor (builder style)
    #[must_use]
    pub fn with_bias(mut self, bias: f32) -> Self {
        self.bias = bias;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_joint_cold() {
        let joint = BallJoint::new(0, 1, Vec3::X, -Vec3::X);
        assert_eq!(joint.impulse, Vec3::ZERO);
        assert!(joint.bias > 0.0);
    }
}

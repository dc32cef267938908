//! Math Helpers on Top of `glam`
//!
//! The simulation core uses `glam` (`Vec3`, `Quat`, `Mat3`) for all vector
//! and matrix arithmetic. This module adds the small pieces a rigid-body
//! pipeline needs on top of it: a rigid `Pose` (position + orientation),
//! the absolute-rotation sweep used for world-space AABBs, an orthonormal
//! tangent frame for friction, and segment-segment closest points for the
//! SAT contact extraction.

use glam::{Mat3, Quat, Vec3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rigid transform: rotation followed by translation.
///
/// The rotation quaternion is assumed unit length; all constructors in this
/// crate only ever produce normalized orientations.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose {
    /// Translation part
    pub position: Vec3,
    /// Rotation part (unit quaternion)
    pub rotation: Quat,
}

impl Pose {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Create a pose from position and rotation
    #[inline]
    #[must_use]
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Pure translation
    #[inline]
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Transform a point from local space to this pose's parent space
    #[inline]
    #[must_use]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation * p + self.position
    }

    /// Rotate a direction (no translation)
    #[inline]
    #[must_use]
    pub fn rotate(&self, v: Vec3) -> Vec3 {
        self.rotation * v
    }

    /// Transform a point from parent space into this pose's local space
    #[inline]
    #[must_use]
    pub fn inverse_transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation.conjugate() * (p - self.position)
    }

    /// Compose two poses: `self * other` applies `other` first
    #[inline]
    #[must_use]
    pub fn transform_pose(&self, other: &Pose) -> Pose {
        Pose {
            position: self.transform_point(other.position),
            rotation: (self.rotation * other.rotation).normalize(),
        }
    }

    /// Relative pose mapping `other`'s local space into `self`'s local space
    #[must_use]
    pub fn relative_to(&self, other: &Pose) -> Pose {
        let inv = self.rotation.conjugate();
        Pose {
            position: inv * (other.position - self.position),
            rotation: (inv * other.rotation).normalize(),
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Sweep a half-extent vector through the absolute value of a rotation.
///
/// For a box with half-extents `half` rotated by `rotation`, the axis-aligned
/// half-extents of the rotated box are `|R| * half`, computed column-wise so
/// no intermediate absolute matrix is materialized.
#[inline]
#[must_use]
pub fn abs_rotate(rotation: Quat, half: Vec3) -> Vec3 {
    let m = Mat3::from_quat(rotation);
    m.x_axis.abs() * half.x + m.y_axis.abs() * half.y + m.z_axis.abs() * half.z
}

/// Cross-product (skew-symmetric) matrix of `v`, so `skew(v) * w == v × w`
#[inline]
#[must_use]
pub fn skew(v: Vec3) -> Mat3 {
    Mat3::from_cols(
        Vec3::new(0.0, v.z, -v.y),
        Vec3::new(-v.z, 0.0, v.x),
        Vec3::new(v.y, -v.x, 0.0),
    )
}

/// Build an orthonormal tangent frame from a unit normal.
///
/// Picks the world axis least parallel to the normal as a reference, then
/// derives two perpendicular tangents. Used for the two friction directions
/// of every contact point.
#[must_use]
pub fn tangent_frame(normal: Vec3) -> (Vec3, Vec3) {
    let abs = normal.abs();
    let reference = if abs.x <= abs.y && abs.x <= abs.z {
        Vec3::X
    } else if abs.y <= abs.z {
        Vec3::Y
    } else {
        Vec3::Z
    };

    let t1 = normal.cross(reference).normalize();
    let t2 = normal.cross(t1);
    (t1, t2)
}

/// Closest points between two line segments `[p1, q1]` and `[p2, q2]`.
///
/// Returns `(on_first, on_second)`. Degenerate (zero-length) segments
/// collapse to their start point.
#[must_use]
pub fn closest_point_segment_segment(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;

    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    const EPS: f32 = 1.0e-12;

    if a <= EPS && e <= EPS {
        return (p1, p2);
    }

    let (s, t);
    if a <= EPS {
        s = 0.0;
        t = (f / e).clamp(0.0, 1.0);
    } else {
        let c = d1.dot(r);
        if e <= EPS {
            t = 0.0;
            s = (-c / a).clamp(0.0, 1.0);
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;

            let mut s_val = if denom > EPS {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                // Parallel segments: any point on the overlap works
                0.0
            };

            let mut t_val = (b * s_val + f) / e;
            if t_val < 0.0 {
                t_val = 0.0;
                s_val = (-c / a).clamp(0.0, 1.0);
            } else if t_val > 1.0 {
                t_val = 1.0;
                s_val = ((b - c) / a).clamp(0.0, 1.0);
            }

            s = s_val;
            t = t_val;
        }
    }

    (p1 + d1 * s, p2 + d2 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::FRAC_PI_2;

    const EPS: f32 = 1.0e-5;

    #[test]
    fn test_pose_roundtrip() {
        let pose = Pose::new(
            Vec3::new(1.0, -2.0, 3.0),
            Quat::from_axis_angle(Vec3::Y, 0.7),
        );
        let p = Vec3::new(0.3, 0.4, -0.5);
        let back = pose.inverse_transform_point(pose.transform_point(p));
        assert!((back - p).length() < EPS);
    }

    #[test]
    fn test_pose_compose() {
        let a = Pose::new(
            Vec3::new(1.0, 0.0, 0.0),
            Quat::from_axis_angle(Vec3::Z, FRAC_PI_2),
        );
        let b = Pose::from_position(Vec3::new(1.0, 0.0, 0.0));
        let ab = a.transform_pose(&b);
        // b's origin rotated 90° around Z then translated: (1, 1, 0)
        assert!((ab.position - Vec3::new(1.0, 1.0, 0.0)).length() < EPS);
    }

    #[test]
    fn test_relative_pose() {
        let a = Pose::new(Vec3::new(2.0, 0.0, 0.0), Quat::from_axis_angle(Vec3::Y, 0.3));
        let b = Pose::new(Vec3::new(-1.0, 4.0, 0.5), Quat::from_axis_angle(Vec3::X, -0.9));
        let rel = a.relative_to(&b);
        let p = Vec3::new(0.1, 0.2, 0.3);
        let direct = a.inverse_transform_point(b.transform_point(p));
        let via_rel = rel.transform_point(p);
        assert!((direct - via_rel).length() < EPS);
    }

    #[test]
    fn test_abs_rotate_identity() {
        let half = Vec3::new(0.5, 1.0, 2.0);
        let swept = abs_rotate(Quat::IDENTITY, half);
        assert!((swept - half).length() < EPS);
    }

    #[test]
    fn test_abs_rotate_quarter_turn() {
        // 90° around Z swaps x and y half-extents
        let half = Vec3::new(1.0, 2.0, 3.0);
        let swept = abs_rotate(Quat::from_axis_angle(Vec3::Z, FRAC_PI_2), half);
        assert!((swept - Vec3::new(2.0, 1.0, 3.0)).length() < 1.0e-4);
    }

    #[test]
    fn test_skew_matches_cross() {
        let v = Vec3::new(1.0, -2.0, 3.0);
        let w = Vec3::new(0.5, 0.25, -1.0);
        assert!((skew(v) * w - v.cross(w)).length() < EPS);
    }

    #[test]
    fn test_tangent_frame_orthonormal() {
        for n in [Vec3::X, Vec3::Y, Vec3::Z, Vec3::new(0.6, 0.8, 0.0)] {
            let (t1, t2) = tangent_frame(n);
            assert!(n.dot(t1).abs() < EPS);
            assert!(n.dot(t2).abs() < EPS);
            assert!(t1.dot(t2).abs() < EPS);
            assert!((t1.length() - 1.0).abs() < EPS);
            assert!((t2.length() - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn test_segment_segment_crossing() {
        // Perpendicular segments passing 1 apart
        let (a, b) = closest_point_segment_segment(
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, -1.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        );
        assert!((a - Vec3::ZERO).length() < EPS);
        assert!((b - Vec3::new(0.0, 0.0, 1.0)).length() < EPS);
    }

    #[test]
    fn test_segment_segment_endpoint_clamp() {
        let (a, b) = closest_point_segment_segment(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(3.0, 1.0, 0.0),
            Vec3::new(5.0, 1.0, 0.0),
        );
        assert!((a - Vec3::new(1.0, 0.0, 0.0)).length() < EPS);
        assert!((b - Vec3::new(3.0, 1.0, 0.0)).length() < EPS);
    }
}

//! Shapes and Collidables
//!
//! A `Shape` is a convex mesh mounted on a body at a local offset; a
//! `Collidable` is the body's ordered set of shapes plus the derived
//! local-space AABB used by the broad phase. The AABB is computed once
//! when registration is finalized with [`Collidable::finish`] by sweeping
//! every shape's vertices through its offset transform; shapes cannot be
//! added afterwards.

use glam::Vec3;

use crate::error::PhysicsError;
use crate::math::Pose;
use crate::mesh::ConvexMesh;

/// Maximum shapes per collidable
pub const MAX_SHAPES: usize = 5;

/// A convex mesh mounted on a body at a local offset
#[derive(Clone, Debug)]
pub struct Shape {
    /// Collision geometry in shape-local space
    pub mesh: ConvexMesh,
    /// Offset of the mesh relative to the owning body
    pub offset: Pose,
    /// Opaque user tag, carried through untouched
    pub tag: u32,
}

impl Shape {
    /// Create a shape with an identity offset
    #[must_use]
    pub fn new(mesh: ConvexMesh) -> Self {
        Self {
            mesh,
            offset: Pose::IDENTITY,
            tag: 0,
        }
    }

    /// Set the local offset (builder style)
    #[must_use]
    pub fn with_offset(mut self, offset: Pose) -> Self {
        self.offset = offset;
        self
    }

    /// Set the user tag (builder style)
    #[must_use]
    pub fn with_tag(mut self, tag: u32) -> Self {
        self.tag = tag;
        self
    }
}

/// The collision geometry of one body: up to [`MAX_SHAPES`] shapes and the
/// local AABB derived from them at finish time.
#[derive(Clone, Debug, Default)]
pub struct Collidable {
    shapes: Vec<Shape>,
    local_center: Vec3,
    local_half: Vec3,
    finished: bool,
}

impl Collidable {
    /// Create an empty collidable
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: a single-shape collidable, already finished
    pub fn from_mesh(mesh: ConvexMesh) -> Result<Self, PhysicsError> {
        let mut collidable = Self::new();
        collidable.add_shape(Shape::new(mesh))?;
        collidable.finish()?;
        Ok(collidable)
    }

    /// Add a shape. Fails once [`finish`](Self::finish) has been called or
    /// when the shape capacity is exhausted.
    pub fn add_shape(&mut self, shape: Shape) -> Result<(), PhysicsError> {
        if self.finished {
            return Err(PhysicsError::CollidableFinished);
        }
        if self.shapes.len() >= MAX_SHAPES {
            return Err(PhysicsError::ShapeCapacity { max: MAX_SHAPES });
        }
        self.shapes.push(shape);
        Ok(())
    }

    /// Finalize registration: sweep every shape's vertices through its
    /// offset and derive the local AABB center and half-extent.
    pub fn finish(&mut self) -> Result<(), PhysicsError> {
        if self.finished {
            return Err(PhysicsError::CollidableFinished);
        }
        if self.shapes.is_empty() {
            return Err(PhysicsError::EmptyCollidable);
        }

        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for shape in &self.shapes {
            for &v in &shape.mesh.vertices {
                let p = shape.offset.transform_point(v);
                min = min.min(p);
                max = max.max(p);
            }
        }

        self.local_center = (min + max) * 0.5;
        self.local_half = (max - min) * 0.5;
        self.finished = true;
        Ok(())
    }

    /// Whether [`finish`](Self::finish) has been called
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Registered shapes
    #[inline]
    #[must_use]
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Local-space AABB center (valid after finish)
    #[inline]
    #[must_use]
    pub fn local_center(&self) -> Vec3 {
        self.local_center
    }

    /// Local-space AABB half-extent (valid after finish)
    #[inline]
    #[must_use]
    pub fn local_half(&self) -> Vec3 {
        self.local_half
    }
}

//! Physics Error Types
//!
//! Unified error type for the setup surface of the simulation. Registration
//! and mesh construction return `Result<T, PhysicsError>`; tick-time
//! invariant violations are programming errors and assert instead (a
//! capacity overflow mid-tick is never recoverable by the caller).

use thiserror::Error;

/// Unified error type for setup-time physics operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PhysicsError {
    /// Body index is out of range.
    #[error("body index {index} out of range (world has {count} bodies)")]
    InvalidBodyIndex {
        /// The invalid index that was provided
        index: usize,
        /// Current number of bodies in the world
        count: usize,
    },

    /// The fixed body table is full.
    #[error("body capacity exceeded (max {max})")]
    BodyCapacity {
        /// Compile-time body limit
        max: usize,
    },

    /// The fixed joint table is full.
    #[error("joint capacity exceeded (max {max})")]
    JointCapacity {
        /// Compile-time joint limit
        max: usize,
    },

    /// A convex mesh has more vertices than the bounded representation allows.
    #[error("convex mesh has {count} vertices (max {max})")]
    TooManyVertices {
        /// Vertices supplied
        count: usize,
        /// Compile-time vertex limit
        max: usize,
    },

    /// A convex mesh has more edges than the bounded representation allows.
    #[error("convex mesh has {count} edges (max {max})")]
    TooManyEdges {
        /// Edges derived from the triangle list
        count: usize,
        /// Compile-time edge limit
        max: usize,
    },

    /// A convex mesh has more facets than the bounded representation allows.
    #[error("convex mesh has {count} facets (max {max})")]
    TooManyFacets {
        /// Triangles supplied
        count: usize,
        /// Compile-time facet limit
        max: usize,
    },

    /// A triangle with (near-)zero area cannot produce a facet normal.
    #[error("facet {facet} is degenerate (zero area)")]
    DegenerateFacet {
        /// Index of the offending triangle
        facet: usize,
    },

    /// A facet references a vertex id outside the vertex array.
    #[error("facet {facet} references vertex {vertex} out of range")]
    VertexOutOfRange {
        /// Index of the offending triangle
        facet: usize,
        /// The invalid vertex id
        vertex: usize,
    },

    /// An edge is shared by a number of facets other than two.
    ///
    /// Convex collision meshes must be closed 2-manifolds; every edge has
    /// exactly two incident facets.
    #[error("mesh is not a closed manifold: edge ({a}, {b}) has {facets} incident facets")]
    NonManifoldEdge {
        /// First vertex id of the edge
        a: u16,
        /// Second vertex id of the edge
        b: u16,
        /// Number of incident facets found
        facets: usize,
    },

    /// A collidable already holds its maximum number of shapes.
    #[error("collidable shape capacity exceeded (max {max})")]
    ShapeCapacity {
        /// Compile-time shape-per-collidable limit
        max: usize,
    },

    /// Shapes cannot be added once the collidable AABB has been finalized.
    #[error("collidable is already finished; shapes cannot be added")]
    CollidableFinished,

    /// A collidable with no shapes cannot be finished or simulated.
    #[error("collidable has no shapes")]
    EmptyCollidable,
}

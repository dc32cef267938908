//! Bounded Convex Mesh Representation
//!
//! Collision geometry for the SAT narrow phase: vertices, edges and
//! triangular facets with fixed upper bounds. Facet normals are outward
//! facing and unit length; every edge references exactly two facets and is
//! classified by its dihedral angle. Only `Convex` edges participate in
//! SAT edge-edge axis tests — `Flat` edges are triangulation artifacts on
//! coplanar faces and `Concave` edges never form a separating axis.
//!
//! # Construction
//!
//! `ConvexMesh::from_triangles` turns a raw vertex/index soup into the
//! bounded representation: facet normals are oriented away from the
//! centroid, shared edges are deduplicated, and manifoldness is verified.
//! The input is trusted to be convex; convexity itself is not re-derived.
//!
//! Author: Moroya Sakamoto

use std::collections::HashMap;

use glam::Vec3;

use crate::error::PhysicsError;

/// Maximum vertices per convex mesh
pub const MAX_VERTICES: usize = 34;
/// Maximum edges per convex mesh
pub const MAX_EDGES: usize = 96;
/// Maximum triangular facets per convex mesh
pub const MAX_FACETS: usize = 64;

/// Dihedral classification of a mesh edge
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeKind {
    /// The two incident facets fold outward; valid SAT axis source
    Convex,
    /// The two incident facets fold inward; interior, never a SAT axis
    Concave,
    /// The two incident facets are coplanar (triangulation diagonal)
    Flat,
}

/// Mesh edge: two vertices, two incident facets, dihedral classification
#[derive(Clone, Copy, Debug)]
pub struct Edge {
    /// Dihedral classification
    pub kind: EdgeKind,
    /// Vertex ids, `vert[0] < vert[1]`
    pub vert: [u16; 2],
    /// Incident facet ids
    pub facet: [u16; 2],
}

/// Triangular facet with a precomputed outward unit normal
#[derive(Clone, Copy, Debug)]
pub struct Facet {
    /// Vertex ids (counter-clockwise when viewed from outside)
    pub vert: [u16; 3],
    /// Edge ids, `edge[i]` joining `vert[i]` and `vert[(i + 1) % 3]`
    pub edge: [u16; 3],
    /// Outward-facing unit normal
    pub normal: Vec3,
}

/// Convex polytope in local space, bounded per the fixed mesh limits
#[derive(Clone, Debug)]
pub struct ConvexMesh {
    /// Vertex positions (≤ [`MAX_VERTICES`])
    pub vertices: Vec<Vec3>,
    /// Deduplicated edges (≤ [`MAX_EDGES`])
    pub edges: Vec<Edge>,
    /// Triangular facets (≤ [`MAX_FACETS`])
    pub facets: Vec<Facet>,
}

// Two facet normals within this cosine of each other make a Flat edge.
const FLAT_EDGE_COS: f32 = 1.0 - 1.0e-5;

impl ConvexMesh {
    /// Build a bounded convex mesh from a vertex array and flat triangle
    /// index list (3 indices per facet).
    ///
    /// Facet winding in the input is not trusted: each facet normal is
    /// oriented away from the vertex centroid and the winding fixed up to
    /// match. Fails if any bound is exceeded, a triangle is degenerate, or
    /// the triangles do not form a closed 2-manifold.
    pub fn from_triangles(vertices: &[Vec3], indices: &[u16]) -> Result<Self, PhysicsError> {
        if vertices.len() > MAX_VERTICES {
            return Err(PhysicsError::TooManyVertices {
                count: vertices.len(),
                max: MAX_VERTICES,
            });
        }
        let facet_count = indices.len() / 3;
        if facet_count > MAX_FACETS {
            return Err(PhysicsError::TooManyFacets {
                count: facet_count,
                max: MAX_FACETS,
            });
        }

        let centroid = vertices.iter().sum::<Vec3>() / vertices.len().max(1) as f32;

        let mut facets: Vec<Facet> = Vec::with_capacity(facet_count);
        let mut edges: Vec<Edge> = Vec::with_capacity(MAX_EDGES.min(facet_count * 3));
        let mut edge_lookup: HashMap<(u16, u16), u16> = HashMap::new();

        for (fi, tri) in indices.chunks_exact(3).enumerate() {
            let mut ids = [tri[0], tri[1], tri[2]];
            for &v in &ids {
                if v as usize >= vertices.len() {
                    return Err(PhysicsError::VertexOutOfRange {
                        facet: fi,
                        vertex: v as usize,
                    });
                }
            }

            let a = vertices[ids[0] as usize];
            let b = vertices[ids[1] as usize];
            let c = vertices[ids[2] as usize];
            let mut normal = (b - a).cross(c - a);
            if normal.length_squared() < 1.0e-12 {
                return Err(PhysicsError::DegenerateFacet { facet: fi });
            }

            // Orient outward: away from the centroid
            if normal.dot(a - centroid) < 0.0 {
                normal = -normal;
                ids.swap(1, 2);
            }

            facets.push(Facet {
                vert: ids,
                edge: [0; 3],
                normal: normal.normalize(),
            });

            // Register the three edges, deduplicating shared ones
            for k in 0..3 {
                let v0 = ids[k];
                let v1 = ids[(k + 1) % 3];
                let key = (v0.min(v1), v0.max(v1));

                let edge_id = match edge_lookup.get(&key) {
                    Some(&id) => {
                        let edge = &mut edges[id as usize];
                        if edge.facet[1] != u16::MAX {
                            return Err(PhysicsError::NonManifoldEdge {
                                a: key.0,
                                b: key.1,
                                facets: 3,
                            });
                        }
                        edge.facet[1] = fi as u16;
                        id
                    }
                    None => {
                        let id = edges.len() as u16;
                        edges.push(Edge {
                            kind: EdgeKind::Flat,
                            vert: [key.0, key.1],
                            facet: [fi as u16, u16::MAX],
                        });
                        edge_lookup.insert(key, id);
                        id
                    }
                };
                facets[fi].edge[k] = edge_id;
            }
        }

        if edges.len() > MAX_EDGES {
            return Err(PhysicsError::TooManyEdges {
                count: edges.len(),
                max: MAX_EDGES,
            });
        }

        // Every edge of a closed mesh has exactly two incident facets
        for edge in &edges {
            if edge.facet[1] == u16::MAX {
                return Err(PhysicsError::NonManifoldEdge {
                    a: edge.vert[0],
                    b: edge.vert[1],
                    facets: 1,
                });
            }
        }

        // Classify edges by dihedral angle
        for edge in &mut edges {
            let f0 = &facets[edge.facet[0] as usize];
            let f1 = &facets[edge.facet[1] as usize];

            if f0.normal.dot(f1.normal) >= FLAT_EDGE_COS {
                edge.kind = EdgeKind::Flat;
                continue;
            }

            // Vertex of f1 not on the edge, tested against f0's plane
            let opposite = f1
                .vert
                .iter()
                .copied()
                .find(|v| *v != edge.vert[0] && *v != edge.vert[1])
                .unwrap_or(f1.vert[0]);
            let on_edge = vertices[edge.vert[0] as usize];
            let signed = f0.normal.dot(vertices[opposite as usize] - on_edge);

            edge.kind = if signed < 0.0 {
                EdgeKind::Convex
            } else {
                EdgeKind::Concave
            };
        }

        Ok(Self {
            vertices: vertices.to_vec(),
            edges,
            facets,
        })
    }

    /// Axis-aligned box mesh centered at the origin.
    ///
    /// 8 vertices, 12 facets; the 12 box edges classify as `Convex` and the
    /// 6 face diagonals as `Flat`, so only true box edges feed the SAT
    /// edge-edge axis loop.
    #[must_use]
    pub fn cuboid(half: Vec3) -> Self {
        let (x, y, z) = (half.x, half.y, half.z);
        let vertices = [
            Vec3::new(-x, -y, -z),
            Vec3::new(x, -y, -z),
            Vec3::new(x, y, -z),
            Vec3::new(-x, y, -z),
            Vec3::new(-x, -y, z),
            Vec3::new(x, -y, z),
            Vec3::new(x, y, z),
            Vec3::new(-x, y, z),
        ];
        #[rustfmt::skip]
        let indices: [u16; 36] = [
            0, 2, 1, 0, 3, 2, // -z
            4, 5, 6, 4, 6, 7, // +z
            0, 1, 5, 0, 5, 4, // -y
            3, 6, 2, 3, 7, 6, // +y
            0, 4, 7, 0, 7, 3, // -x
            1, 2, 6, 1, 6, 5, // +x
        ];
        match Self::from_triangles(&vertices, &indices) {
            Ok(mesh) => mesh,
            // 8/18/12 is statically within every bound
            Err(_) => unreachable!("cuboid mesh is well-formed"),
        }
    }

    /// Number of vertices
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of facets
    #[inline]
    #[must_use]
    pub fn facet_count(&self) -> usize {
        self.facets.len()
    }

    /// Iterator over edges tagged [`EdgeKind::Convex`]
    pub fn convex_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| e.kind == EdgeKind::Convex)
    }

    /// Edge direction vector (`vert[1] - vert[0]`), from this mesh's own
    /// vertex array
    #[inline]
    #[must_use]
    pub fn edge_direction(&self, edge: &Edge) -> Vec3 {
        self.vertices[edge.vert[1] as usize] - self.vertices[edge.vert[0] as usize]
    }
}

//! Narrow Phase — SAT Convex-Convex Test
//!
//! Classic Separating Axis Theorem over the three axis families of a pair
//! of convex polytopes: facet normals of A, facet normals of B, and cross
//! products of convex edges of A with convex edges of B. The first
//! separating axis found exits early; otherwise the axis of minimum
//! penetration is kept, together with which family produced it.
//!
//! The whole test runs in the local frame of the mesh with more facets
//! (fewer transforms on the bigger vertex set); when roles are swapped the
//! output normal is negated and the per-body points exchanged.
//!
//! Contact extraction depends on the axis family. Face axes clip the
//! incident facets (the most anti-parallel ones on the other mesh) against
//! the reference facets' side planes and emit every penetrating clip
//! vertex, up to one manifold's worth, so a face-face contact is supported
//! by its whole footprint in a single tick. Edge axes find the closest
//! points between the candidate convex edges, with both facets nudged
//! apart along the axis so coincident edges do not degenerate.
//!
//! Author: Moroya Sakamoto

use glam::Vec3;

use crate::contact::MAX_CONTACT_POINTS;
use crate::math::{closest_point_segment_segment, Pose};
use crate::mesh::{ConvexMesh, EdgeKind, Facet, MAX_FACETS, MAX_VERTICES};

// Edge cross products below this squared length are numerically parallel
// and skipped (tolerance 1e-5 squared).
const CROSS_TOLERANCE_SQ: f32 = 1.0e-10;

// Facets within this of the best alignment join the reference/incident
// face set; coplanar triangles of one logical face land well inside it.
const FACE_ALIGN_TOLERANCE: f32 = 1.0e-4;

// Clip-plane slack so points exactly on a facet border survive clipping.
const CLIP_EPS: f32 = 1.0e-5;

// Clip vertices within 1 mm of an already collected sample merge into it.
const SAMPLE_MERGE_SQ: f32 = 1.0e-6;

// Coplanar facets collected per face set; polygon vertices per clip.
const FACE_CANDIDATES: usize = 8;
const CLIP_VERTICES: usize = 8;

/// Which axis family produced the minimum-penetration axis
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AxisSource {
    FaceA,
    FaceB,
    Edge,
}

/// One extracted contact point, in world space
#[derive(Clone, Copy, Debug)]
pub struct ContactSample {
    /// Penetration along the shared normal at this point; negative
    pub depth: f32,
    /// Contact point on body A
    pub point_a: Vec3,
    /// Contact point on body B
    pub point_b: Vec3,
}

const EMPTY_SAMPLE: ContactSample = ContactSample {
    depth: 0.0,
    point_a: Vec3::ZERO,
    point_b: Vec3::ZERO,
};

/// Result of a positive SAT test, in world space
#[derive(Clone, Copy, Debug)]
pub struct SatResult {
    /// Minimum penetration depth along the normal; strictly negative
    pub depth: f32,
    /// Unit contact normal pointing from A to B
    pub normal: Vec3,
    samples: [ContactSample; MAX_CONTACT_POINTS],
    count: usize,
}

impl SatResult {
    /// Extracted contact points (at least one)
    #[inline]
    #[must_use]
    pub fn samples(&self) -> &[ContactSample] {
        &self.samples[..self.count]
    }
}

struct BestAxis {
    depth: f32,
    axis: Vec3,
    source: AxisSource,
}

/// SAT intersection test between two posed convex meshes.
///
/// Returns `None` when any tested axis separates the meshes, when they are
/// merely touching (depth would be zero), or when either mesh is
/// degenerate (no facets). Otherwise returns the minimum-penetration
/// contact with `normal(A, B) == -normal(B, A)`.
#[must_use]
pub fn collide(
    mesh_a: &ConvexMesh,
    pose_a: &Pose,
    mesh_b: &ConvexMesh,
    pose_b: &Pose,
) -> Option<SatResult> {
    if mesh_a.facets.is_empty() || mesh_b.facets.is_empty() {
        return None;
    }

    // Run with the facet-richer mesh as the local reference frame
    if mesh_b.facet_count() > mesh_a.facet_count() {
        let mut swapped = collide_local(mesh_b, pose_b, mesh_a, pose_a)?;
        swapped.normal = -swapped.normal;
        for sample in &mut swapped.samples[..swapped.count] {
            core::mem::swap(&mut sample.point_a, &mut sample.point_b);
        }
        return Some(swapped);
    }
    collide_local(mesh_a, pose_a, mesh_b, pose_b)
}

// The actual test, in mesh A's local frame.
fn collide_local(
    mesh_a: &ConvexMesh,
    pose_a: &Pose,
    mesh_b: &ConvexMesh,
    pose_b: &Pose,
) -> Option<SatResult> {
    let rel = pose_a.relative_to(pose_b);

    // B's vertices in A's frame, computed once
    let mut verts_b = [Vec3::ZERO; MAX_VERTICES];
    let nb = mesh_b.vertex_count();
    for (dst, &src) in verts_b[..nb].iter_mut().zip(&mesh_b.vertices) {
        *dst = rel.transform_point(src);
    }
    let verts_b = &verts_b[..nb];
    let verts_a = &mesh_a.vertices[..];

    let mut best = BestAxis {
        depth: f32::NEG_INFINITY,
        axis: Vec3::X,
        source: AxisSource::FaceA,
    };

    // Family 1: facet normals of A
    for facet in &mesh_a.facets {
        let (depth, flip) = test_axis(facet.normal, verts_a, verts_b)?;
        if depth > best.depth {
            best = BestAxis {
                depth,
                axis: if flip { -facet.normal } else { facet.normal },
                source: AxisSource::FaceA,
            };
        }
    }

    // Family 2: facet normals of B, brought into A's frame
    for facet in &mesh_b.facets {
        let axis = rel.rotate(facet.normal);
        let (depth, flip) = test_axis(axis, verts_a, verts_b)?;
        if depth > best.depth {
            best = BestAxis {
                depth,
                axis: if flip { -axis } else { axis },
                source: AxisSource::FaceB,
            };
        }
    }

    // Family 3: convex edge of A × convex edge of B. Each direction comes
    // from its owning mesh's own vertex data.
    for edge_a in mesh_a.convex_edges() {
        let dir_a = mesh_a.edge_direction(edge_a);
        for edge_b in mesh_b.convex_edges() {
            let dir_b =
                verts_b[edge_b.vert[1] as usize] - verts_b[edge_b.vert[0] as usize];
            let cross = dir_a.cross(dir_b);
            if cross.length_squared() < CROSS_TOLERANCE_SQ {
                continue;
            }
            let axis = cross.normalize();
            let (depth, flip) = test_axis(axis, verts_a, verts_b)?;
            if depth > best.depth {
                best = BestAxis {
                    depth,
                    axis: if flip { -axis } else { axis },
                    source: AxisSource::Edge,
                };
            }
        }
    }

    // Every axis overlapped. Touching (zero depth) is not reported as a
    // contact; only strict interpenetration is.
    if best.depth >= 0.0 {
        return None;
    }

    let (mut samples, count) = extract_contacts(mesh_a, verts_a, mesh_b, verts_b, &best);
    for sample in &mut samples[..count] {
        sample.point_a = pose_a.transform_point(sample.point_a);
        sample.point_b = pose_a.transform_point(sample.point_b);
    }

    Some(SatResult {
        depth: best.depth,
        normal: pose_a.rotate(best.axis),
        samples,
        count,
    })
}

// Project both vertex sets onto `axis`; `None` means the projections are
// disjoint (separating axis found). Otherwise returns the overlap depth
// (<= 0) and whether the axis must flip to point from A toward B.
#[inline]
fn test_axis(axis: Vec3, verts_a: &[Vec3], verts_b: &[Vec3]) -> Option<(f32, bool)> {
    let (min_a, max_a) = project(verts_a, axis);
    let (min_b, max_b) = project(verts_b, axis);

    if min_b > max_a || min_a > max_b {
        return None;
    }

    let from_a_side = min_b - max_a; // B past A's max: axis already A→B
    let from_b_side = min_a - max_b; // B below A's min: axis must flip
    if from_a_side >= from_b_side {
        Some((from_a_side, false))
    } else {
        Some((from_b_side, true))
    }
}

#[inline]
fn project(verts: &[Vec3], axis: Vec3) -> (f32, f32) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for v in verts {
        let d = v.dot(axis);
        min = min.min(d);
        max = max.max(d);
    }
    (min, max)
}

// ============================================================================
// Contact Extraction
// ============================================================================

// Contact points for the resolved axis, in A's frame. Face axes clip the
// incident face against the reference face; edge axes fall back to the
// single closest edge-edge point; as a last resort, B's deepest vertex.
fn extract_contacts(
    mesh_a: &ConvexMesh,
    verts_a: &[Vec3],
    mesh_b: &ConvexMesh,
    verts_b: &[Vec3],
    best: &BestAxis,
) -> ([ContactSample; MAX_CONTACT_POINTS], usize) {
    let mut samples = [EMPTY_SAMPLE; MAX_CONTACT_POINTS];
    let mut count = 0;

    if best.source != AxisSource::Edge {
        clip_face_contacts(mesh_a, verts_a, mesh_b, verts_b, best, &mut samples, &mut count);
        if count > 0 {
            return (samples, count);
        }
    }

    if let Some((point_a, point_b)) =
        closest_edge_contact(mesh_a, verts_a, mesh_b, verts_b, best)
    {
        samples[0] = ContactSample {
            depth: best.depth,
            point_a,
            point_b,
        };
        return (samples, 1);
    }

    // B's deepest vertex along the axis, projected onto A
    let mut deepest = verts_b[0];
    let mut min_d = deepest.dot(best.axis);
    for &v in &verts_b[1..] {
        let d = v.dot(best.axis);
        if d < min_d {
            min_d = d;
            deepest = v;
        }
    }
    samples[0] = ContactSample {
        depth: best.depth,
        point_a: deepest - best.axis * best.depth,
        point_b: deepest,
    };
    (samples, 1)
}

// A logical face: the coplanar facets best aligned with a direction.
struct FaceSet {
    tris: [[Vec3; 3]; FACE_CANDIDATES],
    normals: [Vec3; FACE_CANDIDATES],
    count: usize,
}

// Facets whose (rebuilt) normal is within tolerance of the best alignment
// with `dir`. Rebuilding from the vertex positions keeps one code path for
// both the local mesh and the one already transformed into this frame.
fn collect_aligned_faces(facets: &[Facet], verts: &[Vec3], dir: Vec3) -> FaceSet {
    let mut normals = [Vec3::ZERO; MAX_FACETS];
    let mut best = f32::NEG_INFINITY;
    for (facet, normal) in facets.iter().zip(normals.iter_mut()) {
        *normal = facet_normal_in_frame(facet.vert, verts);
        best = best.max(normal.dot(dir));
    }

    let mut set = FaceSet {
        tris: [[Vec3::ZERO; 3]; FACE_CANDIDATES],
        normals: [Vec3::ZERO; FACE_CANDIDATES],
        count: 0,
    };
    for (facet, &normal) in facets.iter().zip(normals.iter()) {
        if normal.dot(dir) < best - FACE_ALIGN_TOLERANCE {
            continue;
        }
        if set.count == FACE_CANDIDATES {
            break;
        }
        set.tris[set.count] = [
            verts[facet.vert[0] as usize],
            verts[facet.vert[1] as usize],
            verts[facet.vert[2] as usize],
        ];
        set.normals[set.count] = normal;
        set.count += 1;
    }
    set
}

// Clip every incident facet against every reference facet's side planes
// and collect the penetrating clip vertices as contact samples.
#[allow(clippy::too_many_arguments)]
fn clip_face_contacts(
    mesh_a: &ConvexMesh,
    verts_a: &[Vec3],
    mesh_b: &ConvexMesh,
    verts_b: &[Vec3],
    best: &BestAxis,
    samples: &mut [ContactSample; MAX_CONTACT_POINTS],
    count: &mut usize,
) {
    let axis = best.axis;

    // Reference face on the mesh whose facet produced the axis (normal
    // along +axis for A, -axis for B); incident face is the most
    // anti-parallel one on the other mesh.
    let ref_is_a = best.source == AxisSource::FaceA;
    let (reference, incident) = if ref_is_a {
        (
            collect_aligned_faces(&mesh_a.facets, verts_a, axis),
            collect_aligned_faces(&mesh_b.facets, verts_b, -axis),
        )
    } else {
        (
            collect_aligned_faces(&mesh_b.facets, verts_b, -axis),
            collect_aligned_faces(&mesh_a.facets, verts_a, axis),
        )
    };

    for r in 0..reference.count {
        let ref_tri = reference.tris[r];
        let ref_normal = reference.normals[r];
        for i in 0..incident.count {
            let mut poly = [Vec3::ZERO; CLIP_VERTICES];
            poly[..3].copy_from_slice(&incident.tris[i]);
            let mut poly_len = 3;

            // Sutherland-Hodgman against the three side planes of the
            // reference facet (vertices wound CCW around the outward
            // normal, so e × n faces outward)
            for e in 0..3 {
                let origin = ref_tri[e];
                let edge = ref_tri[(e + 1) % 3] - origin;
                let side = edge.cross(ref_normal);
                let mut clipped = [Vec3::ZERO; CLIP_VERTICES];
                poly_len = clip_polygon(&poly[..poly_len], &mut clipped, origin, side);
                poly = clipped;
                if poly_len == 0 {
                    break;
                }
            }

            for &p in &poly[..poly_len] {
                let separation = (p - ref_tri[0]).dot(ref_normal);
                if separation >= 0.0 {
                    continue;
                }
                let on_reference = p - ref_normal * separation;
                let sample = if ref_is_a {
                    ContactSample {
                        depth: separation,
                        point_a: on_reference,
                        point_b: p,
                    }
                } else {
                    ContactSample {
                        depth: separation,
                        point_a: p,
                        point_b: on_reference,
                    }
                };
                push_sample(samples, count, sample);
            }
        }
    }
}

// Merge near-duplicates, then fill free slots; at capacity the shallowest
// sample is replaced, and only by a deeper one.
fn push_sample(
    samples: &mut [ContactSample; MAX_CONTACT_POINTS],
    count: &mut usize,
    sample: ContactSample,
) {
    for existing in samples[..*count].iter_mut() {
        if (existing.point_b - sample.point_b).length_squared() < SAMPLE_MERGE_SQ {
            if sample.depth < existing.depth {
                *existing = sample;
            }
            return;
        }
    }
    if *count < MAX_CONTACT_POINTS {
        samples[*count] = sample;
        *count += 1;
        return;
    }
    let mut shallowest = 0;
    for i in 1..*count {
        if samples[i].depth > samples[shallowest].depth {
            shallowest = i;
        }
    }
    if sample.depth < samples[shallowest].depth {
        samples[shallowest] = sample;
    }
}

// Clip a convex polygon against one plane, keeping the side where
// `dot(p - origin, normal) <= eps`. Returns the new vertex count.
fn clip_polygon(
    poly: &[Vec3],
    out: &mut [Vec3; CLIP_VERTICES],
    origin: Vec3,
    normal: Vec3,
) -> usize {
    let mut n = 0;
    let mut push = |p: Vec3, n: &mut usize| {
        if *n < CLIP_VERTICES {
            out[*n] = p;
            *n += 1;
        }
    };

    for i in 0..poly.len() {
        let p = poly[i];
        let q = poly[(i + 1) % poly.len()];
        let dp = (p - origin).dot(normal);
        let dq = (q - origin).dot(normal);

        if dp <= CLIP_EPS {
            push(p, &mut n);
            if dq > CLIP_EPS {
                push(p + (q - p) * (dp / (dp - dq)), &mut n);
            }
        } else if dq <= CLIP_EPS {
            push(p + (q - p) * (dp / (dp - dq)), &mut n);
        }
    }
    n
}

// Closest points between the convex edges of facets facing the axis, with
// both facets nudged apart along it so coincident edges do not produce
// degenerate closest-point pairs. Returns (point on A, point on B).
fn closest_edge_contact(
    mesh_a: &ConvexMesh,
    verts_a: &[Vec3],
    mesh_b: &ConvexMesh,
    verts_b: &[Vec3],
    best: &BestAxis,
) -> Option<(Vec3, Vec3)> {
    let axis = best.axis;
    let push = axis * (0.5 * best.depth.abs() + 1.0e-4);

    let mut best_dist_sq = f32::INFINITY;
    let mut contact: Option<(Vec3, Vec3)> = None;

    for facet_a in mesh_a.facets.iter().filter(|f| f.normal.dot(axis) >= 0.0) {
        for facet_b in &mesh_b.facets {
            // verts_b is already in A's frame, so B's facet normal is
            // rebuilt from the transformed plane rather than re-rotated.
            let nb = facet_normal_in_frame(facet_b.vert, verts_b);
            if nb.dot(-axis) < 0.0 {
                continue;
            }

            for &ea in &facet_a.edge {
                let edge_a = &mesh_a.edges[ea as usize];
                if edge_a.kind != EdgeKind::Convex {
                    continue;
                }
                let a0 = verts_a[edge_a.vert[0] as usize] - push;
                let a1 = verts_a[edge_a.vert[1] as usize] - push;

                for &eb in &facet_b.edge {
                    let edge_b = &mesh_b.edges[eb as usize];
                    if edge_b.kind != EdgeKind::Convex {
                        continue;
                    }
                    let b0 = verts_b[edge_b.vert[0] as usize] + push;
                    let b1 = verts_b[edge_b.vert[1] as usize] + push;

                    let (ca, cb) = closest_point_segment_segment(a0, a1, b0, b1);
                    let dist_sq = (cb - ca).length_squared();
                    if dist_sq < best_dist_sq {
                        best_dist_sq = dist_sq;
                        contact = Some((ca + push, cb - push));
                    }
                }
            }
        }
    }

    contact
}

// Outward normal of a facet whose vertices live in a foreign frame,
// rebuilt from the transformed vertex positions.
#[inline]
fn facet_normal_in_frame(vert: [u16; 3], verts: &[Vec3]) -> Vec3 {
    let a = verts[vert[0] as usize];
    let b = verts[vert[1] as usize];
    let c = verts[vert[2] as usize];
    (b - a).cross(c - a).normalize_or_zero()
}

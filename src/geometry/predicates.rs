//! Point membership predicates.

use crate::rays::FaceMesh;
use crate::util::math::det_rows;
use glam::Vec3;

/// Returns true if `p` lies on the inner side of the plane through `a, b, c`.
///
/// The side is given by the winding of the triangle: the determinant of
/// `(b - a, c - a, p - a)` must be non-negative.
#[inline]
pub fn inside_halfspace(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> bool {
    det_rows(a, b, c, p) >= 0.0
}

/// Returns true if `p` lies in the closed tetrahedron spanned by `apex` and
/// the triangle `a, b, c`.
#[inline]
pub fn inside_tetrahedron(p: Vec3, apex: Vec3, a: Vec3, b: Vec3, c: Vec3) -> bool {
    inside_halfspace(p, a, b, c)
        && inside_halfspace(p, apex, b, a)
        && inside_halfspace(p, apex, c, b)
        && inside_halfspace(p, apex, a, c)
}

/// Exact star membership: `p` lies in some face tetrahedron around `center`.
///
/// Only valid for polyhedra that are star-shaped from `center`, which holds
/// by construction for ray-distance polyhedra.
pub fn inside_polyhedron(p: Vec3, center: Vec3, verts: &[Vec3], faces: &FaceMesh) -> bool {
    faces
        .faces()
        .iter()
        .any(|&[a, b, c]| inside_tetrahedron(p, center, verts[a], verts[b], verts[c]))
}

/// Returns true if `p` is on the inner side of every face plane.
///
/// The set of such points is the kernel of the polyhedron: its largest
/// convex subset, independent of any assumed center.
pub fn inside_kernel(p: Vec3, verts: &[Vec3], faces: &FaceMesh) -> bool {
    faces
        .faces()
        .iter()
        .all(|&[a, b, c]| inside_halfspace(p, verts[a], verts[b], verts[c]))
}

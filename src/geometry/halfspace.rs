//! Halfspace representation shared by the rasterizer and the convex oracle.

use crate::rays::FaceMesh;
use glam::{DVec3, Vec3};

/// Closed halfspace `normal . x + offset <= 0` in `(z, y, x)` coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Halfspace {
    /// Outward normal.
    pub normal: DVec3,
    /// Plane offset.
    pub offset: f64,
}

impl Halfspace {
    /// Halfspace bounded by the plane of an outward-wound triangle.
    pub fn from_triangle(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let (a, b, c) = (a.as_dvec3(), b.as_dvec3(), c.as_dvec3());
        let normal = -(b - a).cross(c - a);
        Self {
            normal,
            offset: -a.dot(normal),
        }
    }

    /// Signed plane value; positive means outside.
    #[inline]
    pub fn eval(&self, p: DVec3) -> f64 {
        self.normal.dot(p) + self.offset
    }

    /// Returns true if `p` satisfies the halfspace.
    #[inline]
    pub fn contains(&self, p: DVec3) -> bool {
        self.eval(p) <= 0.0
    }
}

/// Halfspaces of every face plane; their intersection is the kernel.
pub fn kernel_halfspaces(verts: &[Vec3], faces: &FaceMesh) -> Vec<Halfspace> {
    faces
        .faces()
        .iter()
        .map(|&[a, b, c]| Halfspace::from_triangle(verts[a], verts[b], verts[c]))
        .collect()
}

/// Returns true if `p` satisfies all halfspaces (vacuously true when empty).
#[inline]
pub fn point_in_halfspaces(p: DVec3, halfspaces: &[Halfspace]) -> bool {
    halfspaces.iter().all(|hs| hs.contains(p))
}

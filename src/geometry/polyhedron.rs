//! Per-polyhedron scalars computed from ray distances.

use super::BoundingBox;
use crate::rays::{FaceMesh, RayTemplate};
use crate::util::math::{det_rows, round_to_int};
use glam::Vec3;

/// Volumes below this are treated as degenerate when normalizing centroids.
const CENTROID_MIN_VOLUME: f32 = 1e-10;

/// Returns the vertices `center + dist[r] * ray[r]` in ray order.
pub fn vertices(dist: &[f32], center: Vec3, rays: &RayTemplate) -> Vec<Vec3> {
    dist.iter()
        .zip(rays.directions())
        .map(|(&d, &dir)| center + d * dir)
        .collect()
}

#[inline]
fn face_corners(dist: &[f32], rays: &RayTemplate, [a, b, c]: [usize; 3]) -> (Vec3, Vec3, Vec3) {
    (
        dist[a] * rays.direction(a),
        dist[b] * rays.direction(b),
        dist[c] * rays.direction(c),
    )
}

/// Signed volume: sum of the face tetrahedra around the center.
///
/// The sign is positive only for consistently outward oriented meshes.
pub fn volume(dist: &[f32], rays: &RayTemplate, faces: &FaceMesh) -> f32 {
    faces
        .faces()
        .iter()
        .map(|&tri| {
            let (a, b, c) = face_corners(dist, rays, tri);
            det_rows(a, b, c, Vec3::ZERO) / 6.0
        })
        .sum()
}

/// Volume-weighted centroid relative to the polyhedron center.
///
/// Returns zero for degenerate polyhedra.
pub fn centroid(dist: &[f32], rays: &RayTemplate, faces: &FaceMesh) -> Vec3 {
    let mut vol = 0.0f32;
    let mut acc = Vec3::ZERO;
    for &tri in faces.faces() {
        let (a, b, c) = face_corners(dist, rays, tri);
        let tetra = det_rows(a, b, c, Vec3::ZERO) / 6.0;
        acc += 0.25 * (a + b + c) * tetra;
        vol += tetra;
    }
    if vol > CENTROID_MIN_VOLUME {
        acc / vol
    } else {
        Vec3::ZERO
    }
}

/// Distance from the center to the farthest vertex.
pub fn outer_radius(dist: &[f32]) -> f32 {
    dist.iter().copied().fold(0.0, f32::max)
}

/// Distance from the center to the closest face plane.
///
/// This is the radius of the largest sphere around the center that stays
/// inside the polyhedron; it is negative if the center lies outside a face
/// plane.
pub fn inner_radius(dist: &[f32], rays: &RayTemplate, faces: &FaceMesh) -> f32 {
    inner_radius_scaled(dist, rays, faces, Vec3::ONE)
}

/// Outer radius measured after scaling each axis by `anisotropy`.
pub fn outer_radius_isotropic(dist: &[f32], rays: &RayTemplate, anisotropy: Vec3) -> f32 {
    dist.iter()
        .zip(rays.directions())
        .map(|(&d, &dir)| (anisotropy * d * dir).length_squared())
        .fold(0.0, f32::max)
        .sqrt()
}

/// Inner radius measured after scaling each axis by `anisotropy`.
pub fn inner_radius_isotropic(
    dist: &[f32],
    rays: &RayTemplate,
    faces: &FaceMesh,
    anisotropy: Vec3,
) -> f32 {
    inner_radius_scaled(dist, rays, faces, anisotropy)
}

fn inner_radius_scaled(dist: &[f32], rays: &RayTemplate, faces: &FaceMesh, scale: Vec3) -> f32 {
    let mut r_min = f32::INFINITY;
    for &tri in faces.faces() {
        let (a, b, c) = face_corners(dist, rays, tri);
        let (a, b, c) = (scale * a, scale * b, scale * c);
        let normal = -(b - a).cross(c - a);
        let normal = normal / (normal.length() + 1e-10);
        r_min = r_min.min(a.dot(normal));
    }
    r_min
}

/// Integer bounding box of all vertices, both ends inclusive.
pub fn bounding_box(dist: &[f32], center: Vec3, rays: &RayTemplate) -> BoundingBox {
    let mut bbox = BoundingBox::empty();
    for (&d, &dir) in dist.iter().zip(rays.directions()) {
        let v = center + d * dir;
        let p = [round_to_int(v[0]), round_to_int(v[1]), round_to_int(v[2])];
        bbox.include(p);
    }
    bbox
}

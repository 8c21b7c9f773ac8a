//! Closed-form sphere-sphere intersection volumes.

use glam::Vec3;
use std::f32::consts::PI;

#[inline]
fn ball_volume(r: f32) -> f32 {
    4.0 / 3.0 * PI * r * r * r
}

/// Lens volume of two spheres whose centers are `d` apart.
fn lens_volume(r1: f32, r2: f32, d: f32, contain_eps: f32) -> f32 {
    if r1 <= 0.0 || r2 <= 0.0 || d > r1 + r2 {
        return 0.0;
    }
    let (rmin, rmax) = (r1.min(r2), r1.max(r2));
    if rmax >= d + rmin - contain_eps {
        return ball_volume(rmin);
    }
    let t = (r1 + r2 - d) / 2.0 / d;
    let h1 = (r2 - r1 + d) * t;
    let h2 = (r1 - r2 + d) * t;
    let v1 = PI / 3.0 * h1 * h1 * (3.0 * r1 - h1);
    let v2 = PI / 3.0 * h2 * h2 * (3.0 * r2 - h2);
    v1 + v2
}

/// Intersection volume of the spheres `(p1, r1)` and `(p2, r2)`.
///
/// Zero for disjoint spheres, the smaller ball if one contains the other,
/// and the sum of the two spherical caps otherwise. Non-positive radii
/// yield zero.
pub fn intersect_sphere(r1: f32, p1: Vec3, r2: f32, p2: Vec3) -> f32 {
    lens_volume(r1, r2, p1.distance(p2), 0.0)
}

/// Intersection volume with radii given in anisotropy-scaled coordinates.
///
/// The center displacement is scaled by `anisotropy` before applying the
/// closed form, and the resulting scaled-space volume is divided by the
/// product of the factors to map it back to voxel units.
pub fn intersect_sphere_isotropic(r1: f32, p1: Vec3, r2: f32, p2: Vec3, anisotropy: Vec3) -> f32 {
    let d = (anisotropy * (p1 - p2)).length();
    lens_volume(r1, r2, d, 1e-10) / anisotropy.element_product()
}

//! Dense per-voxel measurements of a predicted distance field.
//!
//! The distance field has shape `(nz, ny, nx, n_rays)`: one star-convex
//! polyhedron per grid position, centered at that position.

use crate::geometry::{centroid, volume};
use crate::rays::{FaceMesh, RayTemplate};
use crate::util::{StarDistError, StarDistResult};
use glam::Vec3;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

fn check_field(
    dist: &[f32],
    shape: [usize; 3],
    rays: &RayTemplate,
    faces: &FaceMesh,
) -> StarDistResult<()> {
    faces.check_rays(rays)?;
    if rays.is_empty() {
        return Err(StarDistError::InvalidInput("ray template is empty"));
    }
    let expected = shape
        .iter()
        .chain(std::iter::once(&rays.len()))
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or(StarDistError::InvalidInput("distance field too large"))?;
    if dist.len() != expected {
        return Err(StarDistError::ShapeMismatch {
            what: "dist",
            expected,
            got: dist.len(),
        });
    }
    Ok(())
}

#[cfg(feature = "rayon")]
fn map_rows<T, F>(dist: &[f32], n_rays: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize, &[f32]) -> T + Sync + Send,
{
    dist.par_chunks(n_rays)
        .enumerate()
        .map(|(k, row)| f(k, row))
        .collect()
}

#[cfg(not(feature = "rayon"))]
fn map_rows<T, F>(dist: &[f32], n_rays: usize, f: F) -> Vec<T>
where
    F: Fn(usize, &[f32]) -> T,
{
    dist.chunks(n_rays)
        .enumerate()
        .map(|(k, row)| f(k, row))
        .collect()
}

/// Volume of the polyhedron at every grid position, row-major `(nz, ny, nx)`.
pub fn dist_to_volume(
    dist: &[f32],
    shape: [usize; 3],
    rays: &RayTemplate,
    faces: &FaceMesh,
) -> StarDistResult<Vec<f32>> {
    check_field(dist, shape, rays, faces)?;
    Ok(map_rows(dist, rays.len(), |_, row| volume(row, rays, faces)))
}

/// Centroid of the polyhedron at every grid position.
///
/// Centroids are relative to the grid position unless `absolute` is set, in
/// which case the `(z, y, x)` position is added.
pub fn dist_to_centroid(
    dist: &[f32],
    shape: [usize; 3],
    rays: &RayTemplate,
    faces: &FaceMesh,
    absolute: bool,
) -> StarDistResult<Vec<Vec3>> {
    check_field(dist, shape, rays, faces)?;
    let [_, ny, nx] = shape;
    Ok(map_rows(dist, rays.len(), |k, row| {
        let c = centroid(row, rays, faces);
        if absolute {
            let (z, y, x) = (k / (ny * nx), (k / nx) % ny, k % nx);
            c + Vec3::new(z as f32, y as f32, x as f32)
        } else {
            c
        }
    }))
}

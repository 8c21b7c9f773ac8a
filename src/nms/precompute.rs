//! Per-polyhedron scalars computed once before the suppression loop.

use crate::geometry::{
    anisotropy, bounding_box, inner_radius, inner_radius_isotropic, outer_radius,
    outer_radius_isotropic, volume, BoundingBox,
};
use crate::polyhedra::Polyhedra;
use crate::rays::{FaceMesh, RayTemplate};
use crate::trace::{trace_event, trace_span};
use glam::Vec3;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Cached geometry of one candidate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolyhedronSummary {
    /// Signed volume.
    pub volume: f32,
    /// Integer bounding box, both ends inclusive.
    pub bbox: BoundingBox,
    /// Largest ray distance.
    pub outer_radius: f32,
    /// Distance from the center to the closest face plane.
    pub inner_radius: f32,
    /// Outer radius after anisotropy scaling.
    pub outer_radius_isotropic: f32,
    /// Inner radius after anisotropy scaling.
    pub inner_radius_isotropic: f32,
}

#[derive(Clone, Debug)]
pub(crate) struct Precomputed {
    pub(crate) summaries: Vec<PolyhedronSummary>,
    pub(crate) anisotropy: Vec3,
}

impl Precomputed {
    pub(crate) fn compute(
        polys: Polyhedra<'_>,
        rays: &RayTemplate,
        faces: &FaceMesh,
        parallel: bool,
    ) -> Self {
        let _span = trace_span!("nms_precompute", n_polys = polys.len()).entered();

        let base = |p: usize| {
            let dist = polys.dist(p);
            (
                volume(dist, rays, faces),
                bounding_box(dist, polys.center(p), rays),
            )
        };
        let base: Vec<(f32, BoundingBox)> = map_indices(polys.len(), parallel, base);

        let boxes: Vec<BoundingBox> = base.iter().map(|&(_, bbox)| bbox).collect();
        let aniso = anisotropy(&boxes);
        trace_event!(
            "nms_anisotropy",
            z = aniso.x as f64,
            y = aniso.y as f64,
            x = aniso.z as f64
        );

        let summaries = map_indices(polys.len(), parallel, |p| {
            let dist = polys.dist(p);
            let (volume, bbox) = base[p];
            PolyhedronSummary {
                volume,
                bbox,
                outer_radius: outer_radius(dist),
                inner_radius: inner_radius(dist, rays, faces),
                outer_radius_isotropic: outer_radius_isotropic(dist, rays, aniso),
                inner_radius_isotropic: inner_radius_isotropic(dist, rays, faces, aniso),
            }
        });

        Self {
            summaries,
            anisotropy: aniso,
        }
    }
}

#[cfg(feature = "rayon")]
fn map_indices<T, F>(n: usize, parallel: bool, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    if parallel {
        (0..n).into_par_iter().map(f).collect()
    } else {
        (0..n).map(f).collect()
    }
}

#[cfg(not(feature = "rayon"))]
fn map_indices<T, F>(n: usize, _parallel: bool, f: F) -> Vec<T>
where
    F: Fn(usize) -> T,
{
    (0..n).map(f).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summaries_follow_input_order() {
        let (rays, faces) = RayTemplate::icosphere(1);
        let mut dist = vec![2.0f32; rays.len()];
        dist.extend(vec![4.0f32; rays.len()]);
        let centers = [10.0, 10.0, 10.0, 30.0, 30.0, 30.0];
        let polys = Polyhedra::new(&dist, &centers, rays.len()).unwrap();
        let pre = Precomputed::compute(polys, &rays, &faces, false);

        assert_eq!(pre.summaries.len(), 2);
        let (a, b) = (&pre.summaries[0], &pre.summaries[1]);
        assert!((b.volume / a.volume - 8.0).abs() < 1e-3);
        assert_eq!(a.outer_radius, 2.0);
        assert_eq!(b.outer_radius, 4.0);
        assert!(a.inner_radius > 0.0 && a.inner_radius < 2.0);
        assert_eq!(pre.anisotropy, Vec3::ONE);
        assert!((a.outer_radius_isotropic - 2.0).abs() < 1e-5);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn parallel_precompute_matches_sequential() {
        let (rays, faces) = RayTemplate::icosphere(1);
        let dist: Vec<f32> = (0..5 * rays.len()).map(|k| 1.0 + (k % 7) as f32).collect();
        let centers: Vec<f32> = (0..15).map(|k| (k * 3) as f32).collect();
        let polys = Polyhedra::new(&dist, &centers, rays.len()).unwrap();
        let seq = Precomputed::compute(polys, &rays, &faces, false);
        let par = Precomputed::compute(polys, &rays, &faces, true);
        assert_eq!(seq.summaries, par.summaries);
        assert_eq!(seq.anisotropy, par.anisotropy);
    }
}

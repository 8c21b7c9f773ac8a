//! Pairwise overlap certification.
//!
//! For a pair `(i, j)` the cascade decides whether the intersection volume,
//! normalized by the smaller of the two volumes, exceeds the threshold. It
//! tries the cheapest conclusive bound first:
//!
//! 1. upper bound from isotropic outer spheres and bounding boxes,
//! 2. lower bound from isotropic inner spheres,
//! 3. lower bound from the intersection of both kernels (oracle),
//! 4. upper bound from the intersection of both convex hulls (oracle),
//! 5. exact count of voxels inside both polyhedra.
//!
//! Oracle failures are replaced by sentinels at the call site: a failed
//! kernel intersection counts as no overlap, a failed hull intersection as
//! complete overlap, so neither can certify a pair on its own.

use super::precompute::{Precomputed, PolyhedronSummary};
use super::stats::SuppressionStats;
use crate::geometry::{
    inside_polyhedron, intersect_sphere_isotropic, kernel_halfspaces, vertices, BoundingBox,
};
use crate::oracle::{ConvexOracle, OracleError};
use crate::polyhedra::Polyhedra;
use crate::rays::{FaceMesh, RayTemplate};
use crate::util::math::{overlap_ratio, RATIO_EPS};
use crate::util::StarDistResult;
use glam::{DVec3, Vec3};
use std::sync::OnceLock;
use std::time::Instant;

/// Kernel intersection volume assumed when the oracle fails.
pub const KERNEL_FAILURE_VOLUME: f32 = 0.0;
/// Convex hull intersection volume assumed when the oracle fails.
pub const CONVEX_FAILURE_VOLUME: f32 = 1e10;

/// Every intersection estimate of one pair, without short-circuiting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlapEstimates {
    /// Smaller of the two volumes, the IoU denominator.
    pub min_volume: f32,
    /// Outer-sphere / bounding-box upper bound.
    pub upper: f32,
    /// Inner-sphere lower bound.
    pub lower: f32,
    /// Kernel intersection volume (lower bound).
    pub kernel: f32,
    /// Convex hull intersection volume (upper bound).
    pub convex: f32,
    /// Number of voxels inside both polyhedra, counted over the box of `i`.
    pub rendered: f32,
}

impl OverlapEstimates {
    /// Normalizes an intersection volume by `min_volume`.
    pub fn ratio(&self, intersection: f32) -> f32 {
        overlap_ratio(intersection, self.min_volume)
    }
}

/// Overlap cascade over a fixed set of polyhedra.
pub struct OverlapCascade<'a, O> {
    polys: Polyhedra<'a>,
    rays: &'a RayTemplate,
    faces: &'a FaceMesh,
    oracle: &'a O,
    pre: Precomputed,
    threshold: f32,
}

impl<'a, O: ConvexOracle> OverlapCascade<'a, O> {
    /// Validates the inputs and precomputes per-polyhedron scalars.
    pub fn new(
        polys: Polyhedra<'a>,
        rays: &'a RayTemplate,
        faces: &'a FaceMesh,
        oracle: &'a O,
        threshold: f32,
    ) -> StarDistResult<Self> {
        polys.check_template(rays, faces)?;
        Ok(Self::build(polys, rays, faces, oracle, threshold, false))
    }

    pub(crate) fn build(
        polys: Polyhedra<'a>,
        rays: &'a RayTemplate,
        faces: &'a FaceMesh,
        oracle: &'a O,
        threshold: f32,
        parallel: bool,
    ) -> Self {
        let pre = Precomputed::compute(polys, rays, faces, parallel);
        Self {
            polys,
            rays,
            faces,
            oracle,
            pre,
            threshold,
        }
    }

    /// Number of polyhedra.
    pub fn len(&self) -> usize {
        self.polys.len()
    }

    /// Returns true if there are no polyhedra.
    pub fn is_empty(&self) -> bool {
        self.polys.is_empty()
    }

    /// Overlap threshold used by `decide`.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Global anisotropy vector used by the sphere bounds.
    pub fn anisotropy(&self) -> Vec3 {
        self.pre.anisotropy
    }

    /// Precomputed scalars of polyhedron `p`.
    pub fn summary(&self, p: usize) -> &PolyhedronSummary {
        &self.pre.summaries[p]
    }

    fn min_volume(&self, i: usize, j: usize) -> f32 {
        self.pre.summaries[i]
            .volume
            .min(self.pre.summaries[j].volume)
    }

    fn vertices(&self, p: usize) -> Vec<Vec3> {
        vertices(self.polys.dist(p), self.polys.center(p), self.rays)
    }

    fn midpoint(&self, i: usize, j: usize) -> DVec3 {
        (self.polys.center(i).as_dvec3() + self.polys.center(j).as_dvec3()) * 0.5
    }

    fn upper_bound(&self, i: usize, j: usize) -> f32 {
        let (a, b) = (&self.pre.summaries[i], &self.pre.summaries[j]);
        let spheres = intersect_sphere_isotropic(
            a.outer_radius_isotropic,
            self.polys.center(i),
            b.outer_radius_isotropic,
            self.polys.center(j),
            self.pre.anisotropy,
        );
        spheres.min(a.bbox.intersection_volume(&b.bbox))
    }

    fn lower_bound(&self, i: usize, j: usize) -> f32 {
        let (a, b) = (&self.pre.summaries[i], &self.pre.summaries[j]);
        intersect_sphere_isotropic(
            a.inner_radius_isotropic,
            self.polys.center(i),
            b.inner_radius_isotropic,
            self.polys.center(j),
            self.pre.anisotropy,
        )
    }

    fn kernel_intersection(&self, i: usize, verts_i: &[Vec3], j: usize, verts_j: &[Vec3]) -> f32 {
        let mut halfspaces = kernel_halfspaces(verts_i, self.faces);
        halfspaces.extend(kernel_halfspaces(verts_j, self.faces));
        self.oracle
            .intersection_volume(&halfspaces, self.midpoint(i, j))
            .map_or(KERNEL_FAILURE_VOLUME, |v| v as f32)
    }

    fn convex_intersection(&self, i: usize, verts_i: &[Vec3], j: usize, verts_j: &[Vec3]) -> f32 {
        self.try_convex_intersection(i, verts_i, j, verts_j)
            .map_or(CONVEX_FAILURE_VOLUME, |v| v as f32)
    }

    fn try_convex_intersection(
        &self,
        i: usize,
        verts_i: &[Vec3],
        j: usize,
        verts_j: &[Vec3],
    ) -> Result<f64, OracleError> {
        let points = |verts: &[Vec3]| verts.iter().map(|v| v.as_dvec3()).collect::<Vec<_>>();
        let mut halfspaces = self.oracle.hull(&points(verts_i))?;
        halfspaces.extend(self.oracle.hull(&points(verts_j))?);
        self.oracle
            .intersection_volume(&halfspaces, self.midpoint(i, j))
    }

    /// Evaluates every stage for the pair `(i, j)`.
    ///
    /// The voxel count runs over the full bounding box of `i` without the
    /// early exit used during suppression.
    pub fn estimates(&self, i: usize, j: usize) -> OverlapEstimates {
        let verts_i = self.vertices(i);
        let verts_j = self.vertices(j);
        let mask = VoxelMask::render(
            self.pre.summaries[i].bbox,
            self.polys.center(i),
            &verts_i,
            self.faces,
        );
        let rendered = mask.map_or(0, |m| {
            m.count_shared(self.polys.center(j), &verts_j, self.faces, f32::INFINITY)
        });
        OverlapEstimates {
            min_volume: self.min_volume(i, j),
            upper: self.upper_bound(i, j),
            lower: self.lower_bound(i, j),
            kernel: self.kernel_intersection(i, &verts_i, j, &verts_j),
            convex: self.convex_intersection(i, &verts_i, j, &verts_j),
            rendered: rendered as f32,
        }
    }

    /// Returns true if `j` overlaps the anchor by more than the threshold.
    pub(crate) fn decide(&self, anchor: &Anchor, j: usize, stats: &mut SuppressionStats) -> bool {
        let i = anchor.index;
        let thr = self.threshold;
        let a_min = self.min_volume(i, j);

        let upper = self.upper_bound(i, j);
        stats.calls_upper += 1;
        if upper < RATIO_EPS || overlap_ratio(upper, a_min).min(1.0) <= thr {
            stats.kept_pretest += 1;
            return false;
        }

        let lower = self.lower_bound(i, j);
        stats.calls_lower += 1;
        if overlap_ratio(lower, a_min).max(0.0) > thr {
            stats.suppressed_pretest += 1;
            return true;
        }

        let verts_j = self.vertices(j);

        let start = Instant::now();
        let kernel = self.kernel_intersection(i, &anchor.vertices, j, &verts_j);
        stats.calls_kernel += 1;
        stats.time_kernel += start.elapsed();
        if overlap_ratio(kernel, a_min) > thr {
            stats.suppressed_kernel += 1;
            return true;
        }

        let start = Instant::now();
        let convex = self.convex_intersection(i, &anchor.vertices, j, &verts_j);
        stats.calls_convex += 1;
        stats.time_convex += start.elapsed();
        if overlap_ratio(convex, a_min) <= thr {
            stats.kept_convex += 1;
            return false;
        }

        let start = Instant::now();
        let mask = anchor.mask.get_or_init(|| {
            VoxelMask::render(
                self.pre.summaries[i].bbox,
                self.polys.center(i),
                &anchor.vertices,
                self.faces,
            )
        });
        let limit = (a_min + RATIO_EPS) * thr;
        // A box too large to enumerate counts as no overlap.
        let count = mask.as_ref().map_or(0, |m| {
            m.count_shared(self.polys.center(j), &verts_j, self.faces, limit)
        });
        stats.calls_render += 1;
        stats.time_render += start.elapsed();
        if overlap_ratio(count as f32, a_min) > thr {
            stats.suppressed_render += 1;
            return true;
        }
        false
    }
}

/// State shared by all pairs of one outer iteration.
pub(crate) struct Anchor {
    index: usize,
    vertices: Vec<Vec3>,
    mask: OnceLock<Option<VoxelMask>>,
}

impl Anchor {
    pub(crate) fn new<O: ConvexOracle>(cascade: &OverlapCascade<'_, O>, index: usize) -> Self {
        Self {
            index,
            vertices: cascade.vertices(index),
            mask: OnceLock::new(),
        }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    #[cfg(test)]
    fn is_rendered(&self) -> bool {
        self.mask.get().is_some()
    }
}

/// Exact membership of every voxel in a bounding box.
struct VoxelMask {
    origin: [i64; 3],
    shape: [usize; 3],
    inside: Vec<bool>,
}

impl VoxelMask {
    /// Returns `None` if the voxel count of `bbox` overflows `usize`.
    fn render(bbox: BoundingBox, center: Vec3, verts: &[Vec3], faces: &FaceMesh) -> Option<Self> {
        let origin = bbox.min.map(i64::from);
        let shape = bbox.shape();
        let n_voxels = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))?;
        let mut inside = Vec::with_capacity(n_voxels);
        for z in 0..shape[0] {
            for y in 0..shape[1] {
                for x in 0..shape[2] {
                    let p = voxel_point(origin, [z, y, x]);
                    inside.push(inside_polyhedron(p, center, verts, faces));
                }
            }
        }
        Some(Self {
            origin,
            shape,
            inside,
        })
    }

    /// Counts voxels of the mask that also lie in the given polyhedron.
    ///
    /// Stops as soon as the count exceeds `limit`.
    fn count_shared(&self, center: Vec3, verts: &[Vec3], faces: &FaceMesh, limit: f32) -> usize {
        let plane = self.shape[1] * self.shape[2];
        let row = self.shape[2];
        let mut count = 0usize;
        for (k, &hit) in self.inside.iter().enumerate() {
            if !hit {
                continue;
            }
            let idx = [k / plane, (k % plane) / row, k % row];
            if inside_polyhedron(voxel_point(self.origin, idx), center, verts, faces) {
                count += 1;
                if count as f32 > limit {
                    break;
                }
            }
        }
        count
    }
}

#[inline]
fn voxel_point(origin: [i64; 3], idx: [usize; 3]) -> Vec3 {
    Vec3::new(
        (origin[0] + idx[0] as i64) as f32,
        (origin[1] + idx[1] as i64) as f32,
        (origin[2] + idx[2] as i64) as f32,
    )
}

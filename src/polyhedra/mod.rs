//! Borrowed views over flattened candidate arrays.
//!
//! Callers hand over distances as an `n_polys x n_rays` row-major buffer and
//! centers as `n_polys x 3` in `(z, y, x)` order. `Polyhedra` validates the
//! shapes once so that internal code can address "ray r of polyhedron p"
//! without index arithmetic.

use crate::rays::{FaceMesh, RayTemplate};
use crate::util::{StarDistError, StarDistResult};
use glam::Vec3;

/// Borrowed set of star-convex polyhedra sharing one ray template.
#[derive(Clone, Copy, Debug)]
pub struct Polyhedra<'a> {
    dist: &'a [f32],
    centers: &'a [f32],
    n_polys: usize,
    n_rays: usize,
}

impl<'a> Polyhedra<'a> {
    /// Creates a view, validating buffer lengths and distance values.
    ///
    /// The number of polyhedra is taken from `centers`; `dist` must hold
    /// exactly `n_rays` non-negative finite values per polyhedron.
    pub fn new(dist: &'a [f32], centers: &'a [f32], n_rays: usize) -> StarDistResult<Self> {
        if centers.len() % 3 != 0 {
            return Err(StarDistError::InvalidInput(
                "centers length must be a multiple of 3",
            ));
        }
        let n_polys = centers.len() / 3;
        if n_polys > 0 && n_rays == 0 {
            return Err(StarDistError::InvalidInput(
                "polyhedra need at least one ray",
            ));
        }
        let expected = n_polys
            .checked_mul(n_rays)
            .ok_or(StarDistError::InvalidInput("distance buffer too large"))?;
        if dist.len() != expected {
            return Err(StarDistError::ShapeMismatch {
                what: "dist",
                expected,
                got: dist.len(),
            });
        }
        if let Some(pos) = dist.iter().position(|d| !d.is_finite() || *d < 0.0) {
            return Err(StarDistError::InvalidDistance {
                poly: pos / n_rays,
                ray: pos % n_rays,
            });
        }
        if centers.iter().any(|c| !c.is_finite()) {
            return Err(StarDistError::InvalidInput("centers must be finite"));
        }
        Ok(Self {
            dist,
            centers,
            n_polys,
            n_rays,
        })
    }

    /// Wraps buffers that were validated by an owning container.
    pub(crate) fn from_validated(dist: &'a [f32], centers: &'a [f32], n_rays: usize) -> Self {
        Self {
            dist,
            centers,
            n_polys: centers.len() / 3,
            n_rays,
        }
    }

    /// Returns the number of polyhedra.
    pub fn len(&self) -> usize {
        self.n_polys
    }

    /// Returns true if the view holds no polyhedra.
    pub fn is_empty(&self) -> bool {
        self.n_polys == 0
    }

    /// Returns the number of rays per polyhedron.
    pub fn n_rays(&self) -> usize {
        self.n_rays
    }

    /// Returns the ray distances of polyhedron `p`.
    #[inline]
    pub fn dist(&self, p: usize) -> &'a [f32] {
        let start = p * self.n_rays;
        &self.dist[start..start + self.n_rays]
    }

    /// Checks that `rays` and `faces` describe the template these polyhedra use.
    pub fn check_template(&self, rays: &RayTemplate, faces: &FaceMesh) -> StarDistResult<()> {
        if !self.is_empty() && rays.len() != self.n_rays {
            return Err(StarDistError::ShapeMismatch {
                what: "rays",
                expected: self.n_rays,
                got: rays.len(),
            });
        }
        faces.check_rays(rays)
    }

    /// Returns the center of polyhedron `p`.
    #[inline]
    pub fn center(&self, p: usize) -> Vec3 {
        let c = &self.centers[3 * p..3 * p + 3];
        Vec3::new(c[0], c[1], c[2])
    }
}

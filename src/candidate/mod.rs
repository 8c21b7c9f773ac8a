//! Owned candidate sets: extraction from dense predictions, priority
//! ordering and survivor compaction.

#[cfg(feature = "io")]
mod io;

use crate::polyhedra::Polyhedra;
use crate::util::{StarDistError, StarDistResult};
use std::cmp::Ordering;

/// Scored star-convex candidates sharing one ray template.
///
/// Distances are stored `n x n_rays` and centers `n x 3` in `(z, y, x)`
/// order, ready to be viewed as [`Polyhedra`].
#[derive(Clone, Debug, PartialEq)]
pub struct Candidates {
    scores: Vec<f32>,
    dist: Vec<f32>,
    centers: Vec<f32>,
    n_rays: usize,
}

impl Candidates {
    /// Creates a set from flat buffers, validating them like [`Polyhedra::new`].
    pub fn new(
        scores: Vec<f32>,
        dist: Vec<f32>,
        centers: Vec<f32>,
        n_rays: usize,
    ) -> StarDistResult<Self> {
        let polys = Polyhedra::new(&dist, &centers, n_rays)?;
        if scores.len() != polys.len() {
            return Err(StarDistError::ShapeMismatch {
                what: "scores",
                expected: polys.len(),
                got: scores.len(),
            });
        }
        Ok(Self {
            scores,
            dist,
            centers,
            n_rays,
        })
    }

    /// Extracts every grid position whose probability is strictly above
    /// `prob_thresh`.
    ///
    /// `prob` has shape `(nz, ny, nx)` and `dist` `(nz, ny, nx, n_rays)`,
    /// both row-major. Centers are the integer grid coordinates. The result
    /// is in raster order; call [`Candidates::sort_by_score_desc`] before
    /// suppression.
    pub fn from_dense(
        prob: &[f32],
        dist: &[f32],
        shape: [usize; 3],
        n_rays: usize,
        prob_thresh: f32,
    ) -> StarDistResult<Self> {
        let n_voxels = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or(StarDistError::InvalidInput("grid too large"))?;
        if prob.len() != n_voxels {
            return Err(StarDistError::ShapeMismatch {
                what: "prob",
                expected: n_voxels,
                got: prob.len(),
            });
        }
        let expected = n_voxels
            .checked_mul(n_rays)
            .ok_or(StarDistError::InvalidInput("grid too large"))?;
        if dist.len() != expected {
            return Err(StarDistError::ShapeMismatch {
                what: "dist",
                expected,
                got: dist.len(),
            });
        }

        let [_, ny, nx] = shape;
        let mut scores = Vec::new();
        let mut out_dist = Vec::new();
        let mut centers = Vec::new();
        for (k, &p) in prob.iter().enumerate() {
            if !(p > prob_thresh) {
                continue;
            }
            let (z, y, x) = (k / (ny * nx), (k / nx) % ny, k % nx);
            scores.push(p);
            centers.extend_from_slice(&[z as f32, y as f32, x as f32]);
            out_dist.extend_from_slice(&dist[k * n_rays..(k + 1) * n_rays]);
        }
        Self::new(scores, out_dist, centers, n_rays)
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Returns true if there are no candidates.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Number of rays per candidate.
    pub fn n_rays(&self) -> usize {
        self.n_rays
    }

    /// Scores in current order.
    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    /// Flat `(z, y, x)` centers in current order.
    pub fn centers(&self) -> &[f32] {
        &self.centers
    }

    /// Flat distances in current order.
    pub fn dist(&self) -> &[f32] {
        &self.dist
    }

    /// Borrowed view for suppression and rendering.
    pub fn view(&self) -> Polyhedra<'_> {
        Polyhedra::from_validated(&self.dist, &self.centers, self.n_rays)
    }

    /// Reorders by descending score; ties keep their current relative order.
    ///
    /// Returns, for each new position, the index the candidate had before.
    pub fn sort_by_score_desc(&mut self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| score_cmp_desc(self.scores[a], self.scores[b]).then(a.cmp(&b)));
        *self = self.gather(&order);
        order
    }

    /// Keeps the candidates whose flag is set, preserving order.
    pub fn select(&self, keep: &[bool]) -> StarDistResult<Self> {
        if keep.len() != self.len() {
            return Err(StarDistError::ShapeMismatch {
                what: "keep",
                expected: self.len(),
                got: keep.len(),
            });
        }
        let indices: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter_map(|(i, &k)| k.then_some(i))
            .collect();
        Ok(self.gather(&indices))
    }

    /// Labels `1..=n` in current order.
    pub fn default_labels(&self) -> Vec<i32> {
        (1..=self.len() as i32).collect()
    }

    fn gather(&self, indices: &[usize]) -> Self {
        let n_rays = self.n_rays;
        let mut scores = Vec::with_capacity(indices.len());
        let mut dist = Vec::with_capacity(indices.len() * n_rays);
        let mut centers = Vec::with_capacity(indices.len() * 3);
        for &i in indices {
            scores.push(self.scores[i]);
            dist.extend_from_slice(&self.dist[i * n_rays..(i + 1) * n_rays]);
            centers.extend_from_slice(&self.centers[3 * i..3 * i + 3]);
        }
        Self {
            scores,
            dist,
            centers,
            n_rays,
        }
    }
}

fn score_cmp_desc(a: f32, b: f32) -> Ordering {
    b.total_cmp(&a)
}

//! Integer bounding boxes and the anisotropy estimate derived from them.

use glam::Vec3;
use std::ops::RangeInclusive;

/// Axis-aligned integer box in `(z, y, x)` order, both ends inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    /// Inclusive lower corner.
    pub min: [i32; 3],
    /// Inclusive upper corner.
    pub max: [i32; 3],
}

impl BoundingBox {
    /// Returns a box that contains nothing; `include` grows it.
    pub fn empty() -> Self {
        Self {
            min: [i32::MAX; 3],
            max: [i32::MIN; 3],
        }
    }

    /// Grows the box to contain the voxel `p`.
    pub fn include(&mut self, p: [i32; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(p[axis]);
            self.max[axis] = self.max[axis].max(p[axis]);
        }
    }

    /// Returns true if the box contains no voxel.
    pub fn is_empty(&self) -> bool {
        (0..3).any(|axis| self.max[axis] < self.min[axis])
    }

    /// Returns the number of voxels along each axis.
    pub fn shape(&self) -> [usize; 3] {
        let mut shape = [0usize; 3];
        for (axis, len) in shape.iter_mut().enumerate() {
            let span = self.max[axis] as i64 - self.min[axis] as i64 + 1;
            *len = span.max(0) as usize;
        }
        shape
    }

    /// Returns `max - min` per axis, the quantity averaged for anisotropy.
    pub fn extent(&self) -> Vec3 {
        let span = |axis: usize| (self.max[axis] as i64 - self.min[axis] as i64) as f32;
        Vec3::new(span(0), span(1), span(2))
    }

    /// Volume of the intersection with `other`, counting whole voxels.
    ///
    /// A polyhedron whose vertices round into `[min, max]` lies within
    /// `[min - 0.5, max + 0.5]`, so the inclusive voxel count is an upper
    /// bound on the intersection of two such polyhedra.
    pub fn intersection_volume(&self, other: &BoundingBox) -> f32 {
        let mut vol = 1.0f32;
        for axis in 0..3 {
            let lo = self.min[axis].max(other.min[axis]) as i64;
            let hi = self.max[axis].min(other.max[axis]) as i64;
            vol *= (hi - lo + 1).max(0) as f32;
        }
        vol
    }

    /// Clips the box to a grid of shape `dims`, returning per-axis ranges.
    ///
    /// Returns `None` if nothing of the box lies inside the grid.
    pub fn clip(&self, dims: [usize; 3]) -> Option<[RangeInclusive<usize>; 3]> {
        let mut ranges: [RangeInclusive<usize>; 3] = [0..=0, 0..=0, 0..=0];
        for axis in 0..3 {
            if dims[axis] == 0 {
                return None;
            }
            let lo = (self.min[axis] as i64).max(0);
            let hi = (self.max[axis] as i64).min(dims[axis] as i64 - 1);
            if hi < lo {
                return None;
            }
            ranges[axis] = lo as usize..=hi as usize;
        }
        Some(ranges)
    }
}

/// Per-axis correction factors from the mean bounding-box extent.
///
/// The result resembles voxel sizes: the axis with the largest mean extent
/// gets factor 1 and the others get `max / mean >= 1`, so a stack with
/// flattened objects along z yields something like `(7, 1, 1)`. Axes with a
/// non-positive mean extent get factor 1.
pub fn anisotropy(boxes: &[BoundingBox]) -> Vec3 {
    if boxes.is_empty() {
        return Vec3::ONE;
    }
    let n = boxes.len() as f32;
    let mean = boxes
        .iter()
        .fold(Vec3::ZERO, |acc, bbox| acc + bbox.extent() / n);
    let max = mean.max_element();
    if max <= 0.0 {
        return Vec3::ONE;
    }
    Vec3::from_array(mean.to_array().map(|m| if m > 0.0 { max / m } else { 1.0 }))
}

//! Diagnostic counters collected by the suppression loop.

use std::ops::AddAssign;
use std::time::Duration;

/// Per-stage call counts, outcomes and timings of one suppression run.
///
/// Counters are accumulated per worker and merged after each parallel
/// sweep. They are purely observational.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SuppressionStats {
    /// Upper-bound pretests evaluated.
    pub calls_upper: usize,
    /// Lower-bound pretests evaluated.
    pub calls_lower: usize,
    /// Kernel intersections requested from the oracle.
    pub calls_kernel: usize,
    /// Convex hull intersections requested from the oracle.
    pub calls_convex: usize,
    /// Voxel overlap counts.
    pub calls_render: usize,
    /// Pairs kept by the upper-bound pretest.
    pub kept_pretest: usize,
    /// Pairs kept by the convex hull bound.
    pub kept_convex: usize,
    /// Candidates suppressed by the lower-bound pretest.
    pub suppressed_pretest: usize,
    /// Candidates suppressed by the kernel bound.
    pub suppressed_kernel: usize,
    /// Candidates suppressed after voxel rendering.
    pub suppressed_render: usize,
    /// Time spent in kernel intersections.
    pub time_kernel: Duration,
    /// Time spent in convex hull intersections.
    pub time_convex: Duration,
    /// Time spent rendering and counting voxels.
    pub time_render: Duration,
}

impl SuppressionStats {
    /// Total number of suppressed candidates.
    pub fn suppressed_total(&self) -> usize {
        self.suppressed_pretest + self.suppressed_kernel + self.suppressed_render
    }

    /// Adds `other` into `self`.
    pub fn merge(&mut self, other: &SuppressionStats) {
        self.calls_upper += other.calls_upper;
        self.calls_lower += other.calls_lower;
        self.calls_kernel += other.calls_kernel;
        self.calls_convex += other.calls_convex;
        self.calls_render += other.calls_render;
        self.kept_pretest += other.kept_pretest;
        self.kept_convex += other.kept_convex;
        self.suppressed_pretest += other.suppressed_pretest;
        self.suppressed_kernel += other.suppressed_kernel;
        self.suppressed_render += other.suppressed_render;
        self.time_kernel += other.time_kernel;
        self.time_convex += other.time_convex;
        self.time_render += other.time_render;
    }

    /// Returns a copy with all timers zeroed, for comparing runs.
    pub fn without_timings(mut self) -> Self {
        self.time_kernel = Duration::ZERO;
        self.time_convex = Duration::ZERO;
        self.time_render = Duration::ZERO;
        self
    }
}

impl AddAssign<&SuppressionStats> for SuppressionStats {
    fn add_assign(&mut self, rhs: &SuppressionStats) {
        self.merge(rhs);
    }
}

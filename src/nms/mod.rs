//! Non-maximum suppression of overlapping star-convex polyhedra.
//!
//! Candidates are visited in the caller's order, which must be descending
//! score. Each surviving candidate `i` suppresses every later candidate `j`
//! whose overlap with `i`, normalized by the smaller volume, exceeds the
//! threshold. The pairwise decision is made by [`OverlapCascade`].
//!
//! The outer loop is sequential; with the `rayon` feature the inner loop
//! over `j` runs in parallel. Suppression flags found by the workers are
//! applied after each sweep, so the result does not depend on scheduling.

mod cascade;
mod precompute;
mod stats;

pub use cascade::{
    OverlapCascade, OverlapEstimates, CONVEX_FAILURE_VOLUME, KERNEL_FAILURE_VOLUME,
};
pub use precompute::PolyhedronSummary;
pub use stats::SuppressionStats;

use crate::oracle::{ConvexOracle, QuickhullOracle};
use crate::polyhedra::Polyhedra;
use crate::rays::{FaceMesh, RayTemplate};
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::{StarDistError, StarDistResult};
use cascade::Anchor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Configuration for suppression.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NmsConfig {
    /// Overlap threshold in `[0, 1]`; pairs above it are suppressed.
    pub threshold: f32,
    /// Reserved; bounding boxes always take part in the upper bound.
    pub use_bbox: bool,
    /// Emit per-stage counters and timings through tracing.
    pub verbose: bool,
    /// Run the inner loop in parallel (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for NmsConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            use_bbox: true,
            verbose: false,
            parallel: cfg!(feature = "rayon"),
        }
    }
}

impl NmsConfig {
    /// Checks that the threshold is a finite value in `[0, 1]`.
    pub fn validate(&self) -> StarDistResult<()> {
        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(StarDistError::InvalidInput(
                "threshold must be within [0, 1]",
            ));
        }
        Ok(())
    }
}

/// Cooperative cancellation flag, polled once per outer iteration.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; every clone observes it.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns true once `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Result of a suppression run.
#[derive(Clone, Debug, PartialEq)]
pub struct Suppression {
    /// One flag per candidate, true if retained.
    pub keep: Vec<bool>,
    /// Diagnostic counters.
    pub stats: SuppressionStats,
}

impl Suppression {
    /// Indices of retained candidates in input order.
    pub fn kept_indices(&self) -> Vec<usize> {
        self.keep
            .iter()
            .enumerate()
            .filter_map(|(i, &k)| k.then_some(i))
            .collect()
    }

    /// Number of retained candidates.
    pub fn kept_count(&self) -> usize {
        self.keep.iter().filter(|&&k| k).count()
    }
}

/// Suppression runner bound to a ray template and face mesh.
///
/// ```no_run
/// use stardist3d::{NmsConfig, Polyhedra, RayTemplate, Suppressor};
///
/// let (rays, faces) = RayTemplate::icosphere(2);
/// let dist = vec![4.0f32; 2 * rays.len()];
/// let centers = [10.0, 10.0, 10.0, 10.0, 10.0, 11.0];
/// let polys = Polyhedra::new(&dist, &centers, rays.len())?;
/// let result = Suppressor::new(&rays, &faces)
///     .with_config(NmsConfig { threshold: 0.4, ..NmsConfig::default() })
///     .run(polys, &[0.9, 0.8])?;
/// assert_eq!(result.keep, vec![true, false]);
/// # Ok::<(), stardist3d::StarDistError>(())
/// ```
pub struct Suppressor<'a, O = QuickhullOracle> {
    rays: &'a RayTemplate,
    faces: &'a FaceMesh,
    config: NmsConfig,
    oracle: O,
}

impl<'a> Suppressor<'a, QuickhullOracle> {
    /// Creates a runner with the default configuration and oracle.
    pub fn new(rays: &'a RayTemplate, faces: &'a FaceMesh) -> Self {
        Self {
            rays,
            faces,
            config: NmsConfig::default(),
            oracle: QuickhullOracle::new(),
        }
    }
}

impl<'a, O: ConvexOracle> Suppressor<'a, O> {
    /// Replaces the configuration.
    pub fn with_config(mut self, config: NmsConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the convex oracle.
    pub fn with_oracle<P: ConvexOracle>(self, oracle: P) -> Suppressor<'a, P> {
        Suppressor {
            rays: self.rays,
            faces: self.faces,
            config: self.config,
            oracle,
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &NmsConfig {
        &self.config
    }

    /// Builds the overlap cascade for `polys` with this runner's threshold.
    pub fn cascade<'p>(&'p self, polys: Polyhedra<'p>) -> StarDistResult<OverlapCascade<'p, O>> {
        self.config.validate()?;
        OverlapCascade::new(polys, self.rays, self.faces, &self.oracle, self.config.threshold)
    }

    /// Runs suppression to completion.
    ///
    /// `scores` must hold one value per candidate; candidates are expected
    /// to be sorted by descending score already.
    pub fn run(&self, polys: Polyhedra<'_>, scores: &[f32]) -> StarDistResult<Suppression> {
        self.run_cancellable(polys, scores, &CancelToken::new())
    }

    /// Runs suppression, returning `StarDistError::Cancelled` if `cancel`
    /// fires before the loop completes.
    pub fn run_cancellable(
        &self,
        polys: Polyhedra<'_>,
        scores: &[f32],
        cancel: &CancelToken,
    ) -> StarDistResult<Suppression> {
        self.config.validate()?;
        if scores.len() != polys.len() {
            return Err(StarDistError::ShapeMismatch {
                what: "scores",
                expected: polys.len(),
                got: scores.len(),
            });
        }
        polys.check_template(self.rays, self.faces)?;

        let n = polys.len();
        if n == 0 || self.faces.is_empty() {
            return Ok(Suppression {
                keep: vec![true; n],
                stats: SuppressionStats::default(),
            });
        }
        if scores.windows(2).any(|w| w[0] < w[1]) {
            trace_debug!("nms_unsorted_scores", n_polys = n);
        }

        let cfg = &self.config;
        let cascade = OverlapCascade::build(
            polys,
            self.rays,
            self.faces,
            &self.oracle,
            cfg.threshold,
            cfg.parallel,
        );

        let _span = trace_span!(
            "nms_suppress",
            n_polys = n,
            threshold = cfg.threshold as f64,
            parallel = cfg.parallel
        )
        .entered();

        let mut suppressed = vec![false; n];
        let mut stats = SuppressionStats::default();
        for i in 0..n - 1 {
            if cancel.is_cancelled() {
                trace_event!("nms_cancelled", iteration = i);
                return Err(StarDistError::Cancelled);
            }
            if suppressed[i] {
                continue;
            }
            let anchor = Anchor::new(&cascade, i);
            let sweep = sweep(&cascade, &anchor, &suppressed, cfg.parallel);
            for &j in &sweep.suppressed {
                suppressed[j] = true;
            }
            stats.merge(&sweep.stats);
            if cfg.verbose {
                trace_debug!(
                    "nms_progress",
                    iteration = i,
                    suppressed = stats.suppressed_total()
                );
            }
        }

        if cfg.verbose {
            report(&stats, n);
        }

        Ok(Suppression {
            keep: suppressed.iter().map(|&s| !s).collect(),
            stats,
        })
    }
}

fn report(stats: &SuppressionStats, n: usize) {
    trace_event!(
        "nms_calls",
        upper = stats.calls_upper,
        lower = stats.calls_lower,
        kernel = stats.calls_kernel,
        convex = stats.calls_convex,
        render = stats.calls_render
    );
    trace_event!(
        "nms_excluded",
        pretest = stats.kept_pretest,
        convex = stats.kept_convex
    );
    trace_event!(
        "nms_timing_ms",
        kernel = stats.time_kernel.as_secs_f64() * 1e3,
        convex = stats.time_convex.as_secs_f64() * 1e3,
        render = stats.time_render.as_secs_f64() * 1e3
    );
    trace_event!(
        "nms_suppressed",
        pretest = stats.suppressed_pretest,
        kernel = stats.suppressed_kernel,
        render = stats.suppressed_render,
        total = stats.suppressed_total(),
        n_polys = n
    );
}

/// Outcome of one inner loop: counters and the candidates to suppress.
#[derive(Default)]
struct Sweep {
    stats: SuppressionStats,
    suppressed: Vec<usize>,
}

impl Sweep {
    fn visit<O: ConvexOracle>(
        mut self,
        cascade: &OverlapCascade<'_, O>,
        anchor: &Anchor,
        j: usize,
    ) -> Self {
        if cascade.decide(anchor, j, &mut self.stats) {
            self.suppressed.push(j);
        }
        self
    }

    #[cfg_attr(not(feature = "rayon"), allow(dead_code))]
    fn merge(mut self, other: Sweep) -> Self {
        self.stats.merge(&other.stats);
        self.suppressed.extend(other.suppressed);
        self
    }
}

#[cfg(feature = "rayon")]
fn sweep<O: ConvexOracle>(
    cascade: &OverlapCascade<'_, O>,
    anchor: &Anchor,
    suppressed: &[bool],
    parallel: bool,
) -> Sweep {
    if !parallel {
        return sweep_sequential(cascade, anchor, suppressed);
    }
    (anchor.index() + 1..suppressed.len())
        .into_par_iter()
        .filter(|&j| !suppressed[j])
        .fold(Sweep::default, |acc, j| acc.visit(cascade, anchor, j))
        .reduce(Sweep::default, Sweep::merge)
}

#[cfg(not(feature = "rayon"))]
fn sweep<O: ConvexOracle>(
    cascade: &OverlapCascade<'_, O>,
    anchor: &Anchor,
    suppressed: &[bool],
    _parallel: bool,
) -> Sweep {
    sweep_sequential(cascade, anchor, suppressed)
}

fn sweep_sequential<O: ConvexOracle>(
    cascade: &OverlapCascade<'_, O>,
    anchor: &Anchor,
    suppressed: &[bool],
) -> Sweep {
    (anchor.index() + 1..suppressed.len())
        .filter(|&j| !suppressed[j])
        .fold(Sweep::default(), |acc, j| acc.visit(cascade, anchor, j))
}

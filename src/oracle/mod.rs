//! Convex geometry oracle: hulls and halfspace intersection volumes.
//!
//! The overlap cascade only needs two questions answered: which halfspaces
//! bound the convex hull of a point set, and how large is the bounded
//! intersection of a set of halfspaces around a known interior point. Both
//! are delegated to a `ConvexOracle` so the solver can be swapped; the
//! default `QuickhullOracle` is backed by the `chull` crate.
//!
//! Failures are ordinary values. Callers decide which sentinel volume a
//! failure stands for; see the overlap cascade.

mod quickhull;

pub use quickhull::{convex_volume, QuickhullOracle};

use crate::geometry::Halfspace;
use glam::DVec3;
use thiserror::Error;

/// Reasons an oracle query can fail.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum OracleError {
    /// A hull needs at least four points.
    #[error("convex hull needs at least 4 points, got {got}")]
    TooFewPoints {
        /// Number of points supplied.
        got: usize,
    },
    /// The points are coplanar or otherwise degenerate.
    #[error("degenerate point set")]
    Degenerate,
    /// The interior point violates at least one halfspace.
    #[error("interior point is not strictly feasible")]
    Infeasible,
    /// The halfspace intersection is unbounded.
    #[error("halfspace intersection is unbounded")]
    Unbounded,
}

/// Convex hull and halfspace-intersection solver.
pub trait ConvexOracle: Sync {
    /// Returns the supporting halfspaces (unit outward normals) of the hull of `points`.
    fn hull(&self, points: &[DVec3]) -> Result<Vec<Halfspace>, OracleError>;

    /// Returns the volume of the bounded intersection of `halfspaces`.
    ///
    /// `interior` must satisfy every halfspace strictly.
    fn intersection_volume(
        &self,
        halfspaces: &[Halfspace],
        interior: DVec3,
    ) -> Result<f64, OracleError>;
}

impl<T: ConvexOracle + ?Sized> ConvexOracle for &T {
    fn hull(&self, points: &[DVec3]) -> Result<Vec<Halfspace>, OracleError> {
        (**self).hull(points)
    }

    fn intersection_volume(
        &self,
        halfspaces: &[Halfspace],
        interior: DVec3,
    ) -> Result<f64, OracleError> {
        (**self).intersection_volume(halfspaces, interior)
    }
}

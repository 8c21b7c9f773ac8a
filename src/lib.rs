//! stardist3d post-processes star-convex polyhedra predicted on 3D grids.
//!
//! A polyhedron is a center plus one distance per ray of a shared
//! [`RayTemplate`], closed by the triangles of a shared [`FaceMesh`]. The
//! crate provides:
//!
//! - non-maximum suppression ([`Suppressor`]) that certifies pairwise
//!   overlap with a cascade of cheap bounds before falling back to convex
//!   geometry and finally exact voxel counting,
//! - rasterization of polyhedra into a label volume ([`LabelRenderer`]),
//! - candidate extraction from dense predictions ([`Candidates`]) and dense
//!   volume / centroid measurements.
//!
//! Convex hulls and halfspace intersections are delegated to a
//! [`ConvexOracle`]; the default [`QuickhullOracle`] uses `chull`. Inner
//! loops run in parallel with the `rayon` feature (on by default), and the
//! `tracing` feature reports spans and counters.
//!
//! ```no_run
//! use stardist3d::{Candidates, LabelRenderer, RayTemplate, Suppressor};
//!
//! let (rays, faces) = RayTemplate::icosphere(2);
//! # let (prob, dist) = (vec![0.0f32; 8], vec![0.0f32; 8 * rays.len()]);
//! let mut cands = Candidates::from_dense(&prob, &dist, [2, 2, 2], rays.len(), 0.5)?;
//! cands.sort_by_score_desc();
//! let nms = Suppressor::new(&rays, &faces).run(cands.view(), cands.scores())?;
//! let kept = cands.select(&nms.keep)?;
//! let labels = LabelRenderer::new(&rays, &faces).render(kept.view(), &kept.default_labels(), [2, 2, 2])?;
//! # let _ = labels;
//! # Ok::<(), stardist3d::StarDistError>(())
//! ```

mod candidate;
pub mod geometry;
pub mod measure;
pub mod nms;
pub mod oracle;
mod polyhedra;
pub mod rays;
pub mod render;
pub(crate) mod trace;
pub mod util;

pub use candidate::Candidates;
pub use measure::{dist_to_centroid, dist_to_volume};
pub use nms::{
    CancelToken, NmsConfig, OverlapCascade, OverlapEstimates, PolyhedronSummary, Suppression,
    SuppressionStats, Suppressor,
};
pub use oracle::{ConvexOracle, OracleError, QuickhullOracle};
pub use polyhedra::Polyhedra;
pub use rays::{FaceMesh, RayTemplate};
pub use render::{LabelRenderer, LabelVolume, RenderConfig, RenderMode, DEBUG_ERROR_LABEL};
pub use util::{StarDistError, StarDistResult};

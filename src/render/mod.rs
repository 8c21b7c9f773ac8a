//! Rasterization of star-convex polyhedra into a voxel label volume.
//!
//! Polyhedra are written one after another in the caller's order, so the
//! first polyhedron to claim a voxel keeps it unless overlap marking is
//! enabled. Within one polyhedron the z-slices of its bounding box are
//! independent and are filled in parallel with the `rayon` feature.

use crate::geometry::{
    bounding_box, inside_kernel, inside_polyhedron, kernel_halfspaces, point_in_halfspaces,
    vertices, Halfspace,
};
use crate::oracle::{ConvexOracle, QuickhullOracle};
use crate::polyhedra::Polyhedra;
use crate::rays::{FaceMesh, RayTemplate};
use crate::trace::{trace_event, trace_span};
use crate::util::{StarDistError, StarDistResult};
use glam::{DVec3, Vec3};
use std::ops::RangeInclusive;
use std::str::FromStr;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Value written by [`RenderMode::Debug`] where kernel membership holds but
/// star membership does not.
pub const DEBUG_ERROR_LABEL: i32 = -1;

/// Voxel membership test used when rasterizing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Kernel, or convex hull and exact star membership.
    #[default]
    Full,
    /// Kernel halfspaces only.
    Kernel,
    /// Convex hull halfspaces only.
    Convex,
    /// Every voxel of the bounding box.
    Bbox,
    /// Marks voxels that are in the kernel but fail the star test.
    Debug,
}

impl RenderMode {
    /// Maps the numeric codes `0..=4` (full, kernel, convex, bbox, debug).
    pub fn from_code(code: i32) -> StarDistResult<Self> {
        match code {
            0 => Ok(Self::Full),
            1 => Ok(Self::Kernel),
            2 => Ok(Self::Convex),
            3 => Ok(Self::Bbox),
            4 => Ok(Self::Debug),
            _ => Err(StarDistError::InvalidInput("unknown render mode code")),
        }
    }

    /// Numeric code of the mode.
    pub fn code(self) -> i32 {
        match self {
            Self::Full => 0,
            Self::Kernel => 1,
            Self::Convex => 2,
            Self::Bbox => 3,
            Self::Debug => 4,
        }
    }

    /// Lowercase name, as accepted by `FromStr`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Kernel => "kernel",
            Self::Convex => "convex",
            Self::Bbox => "bbox",
            Self::Debug => "debug",
        }
    }

    fn needs_convex_hull(self) -> bool {
        matches!(self, Self::Full | Self::Convex)
    }
}

impl FromStr for RenderMode {
    type Err = StarDistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "kernel" => Ok(Self::Kernel),
            "convex" => Ok(Self::Convex),
            "bbox" => Ok(Self::Bbox),
            "debug" => Ok(Self::Debug),
            _ => Err(StarDistError::InvalidInput("unknown render mode")),
        }
    }
}

/// Configuration for rasterization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    /// Membership test.
    pub mode: RenderMode,
    /// Overwrite already labeled voxels with `overlap_label`.
    pub use_overlap_label: bool,
    /// Label written to contested voxels when `use_overlap_label` is set.
    pub overlap_label: i32,
    /// Fill bounding boxes in parallel (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mode: RenderMode::Full,
            use_overlap_label: false,
            overlap_label: -1,
            parallel: cfg!(feature = "rayon"),
        }
    }
}

impl RenderConfig {
    /// Rejects an overlap label of zero, which would erase contested voxels.
    pub fn validate(&self) -> StarDistResult<()> {
        if self.use_overlap_label && self.overlap_label == 0 {
            return Err(StarDistError::InvalidInput(
                "overlap_label must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Dense `(nz, ny, nx)` label grid in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelVolume {
    dims: [usize; 3],
    data: Vec<i32>,
}

impl LabelVolume {
    /// Creates a zero-filled volume.
    pub fn zeros(dims: [usize; 3]) -> Self {
        Self {
            dims,
            data: vec![0; dims[0] * dims[1] * dims[2]],
        }
    }

    /// Grid shape `(nz, ny, nx)`.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Label at `(z, y, x)`, or `None` outside the grid.
    pub fn get(&self, z: usize, y: usize, x: usize) -> Option<i32> {
        let [nz, ny, nx] = self.dims;
        if z >= nz || y >= ny || x >= nx {
            return None;
        }
        Some(self.data[(z * ny + y) * nx + x])
    }

    /// Row-major labels.
    pub fn as_slice(&self) -> &[i32] {
        &self.data
    }

    /// Consumes the volume, returning the row-major labels.
    pub fn into_vec(self) -> Vec<i32> {
        self.data
    }

    /// Number of voxels carrying `label`.
    pub fn count(&self, label: i32) -> usize {
        self.data.iter().filter(|&&v| v == label).count()
    }
}

/// Rasterizer bound to a ray template and face mesh.
pub struct LabelRenderer<'a, O = QuickhullOracle> {
    rays: &'a RayTemplate,
    faces: &'a FaceMesh,
    config: RenderConfig,
    oracle: O,
}

impl<'a> LabelRenderer<'a, QuickhullOracle> {
    /// Creates a renderer with the default configuration and oracle.
    pub fn new(rays: &'a RayTemplate, faces: &'a FaceMesh) -> Self {
        Self {
            rays,
            faces,
            config: RenderConfig::default(),
            oracle: QuickhullOracle::new(),
        }
    }
}

enum Membership {
    Inside,
    Outside,
    Inconsistent,
}

/// Everything needed to classify voxels of one polyhedron.
struct Shape<'s> {
    center: Vec3,
    verts: Vec<Vec3>,
    faces: &'s FaceMesh,
    kernel: Vec<Halfspace>,
    convex: Option<Vec<Halfspace>>,
    mode: RenderMode,
}

impl Shape<'_> {
    fn in_convex(&self, p: DVec3) -> bool {
        self.convex
            .as_deref()
            .map_or(true, |hs| point_in_halfspaces(p, hs))
    }

    fn classify(&self, z: usize, y: usize, x: usize) -> Membership {
        let pf = Vec3::new(z as f32, y as f32, x as f32);
        let pd = DVec3::new(z as f64, y as f64, x as f64);
        let inside = match self.mode {
            RenderMode::Full => {
                point_in_halfspaces(pd, &self.kernel)
                    || (self.in_convex(pd)
                        && inside_polyhedron(pf, self.center, &self.verts, self.faces))
            }
            RenderMode::Kernel => point_in_halfspaces(pd, &self.kernel),
            RenderMode::Convex => self.in_convex(pd),
            RenderMode::Bbox => true,
            RenderMode::Debug => {
                let broken = inside_kernel(pf, &self.verts, self.faces)
                    && !inside_polyhedron(pf, self.center, &self.verts, self.faces);
                return if broken {
                    Membership::Inconsistent
                } else {
                    Membership::Outside
                };
            }
        };
        if inside {
            Membership::Inside
        } else {
            Membership::Outside
        }
    }
}

impl<'a, O: ConvexOracle> LabelRenderer<'a, O> {
    /// Replaces the configuration.
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the convex oracle.
    pub fn with_oracle<P: ConvexOracle>(self, oracle: P) -> LabelRenderer<'a, P> {
        LabelRenderer {
            rays: self.rays,
            faces: self.faces,
            config: self.config,
            oracle,
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Rasterizes `polys` with one label each into a grid of shape `dims`.
    pub fn render(
        &self,
        polys: Polyhedra<'_>,
        labels: &[i32],
        dims: [usize; 3],
    ) -> StarDistResult<LabelVolume> {
        self.config.validate()?;
        if labels.len() != polys.len() {
            return Err(StarDistError::ShapeMismatch {
                what: "labels",
                expected: polys.len(),
                got: labels.len(),
            });
        }
        polys.check_template(self.rays, self.faces)?;
        dims.iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or(StarDistError::InvalidInput("label volume too large"))?;

        let mut volume = LabelVolume::zeros(dims);
        if self.faces.is_empty() {
            return Ok(volume);
        }

        let _span = trace_span!(
            "render_labels",
            n_polys = polys.len(),
            mode = self.config.mode.as_str()
        )
        .entered();

        let mut hull_failures = 0usize;
        for (p, &label) in labels.iter().enumerate() {
            let dist = polys.dist(p);
            let center = polys.center(p);
            let Some(ranges) = bounding_box(dist, center, self.rays).clip(dims) else {
                continue;
            };
            let verts = vertices(dist, center, self.rays);
            let convex = if self.config.mode.needs_convex_hull() {
                let points: Vec<DVec3> = verts.iter().map(|v| v.as_dvec3()).collect();
                let hull = self.oracle.hull(&points).ok();
                hull_failures += usize::from(hull.is_none());
                hull
            } else {
                None
            };
            let shape = Shape {
                center,
                kernel: kernel_halfspaces(&verts, self.faces),
                verts,
                faces: self.faces,
                convex,
                mode: self.config.mode,
            };
            self.fill(&mut volume, &shape, ranges, label);
        }

        trace_event!(
            "render_summary",
            n_polys = polys.len(),
            hull_failures = hull_failures,
            labeled = volume.as_slice().iter().filter(|&&v| v != 0).count()
        );
        Ok(volume)
    }

    fn fill(
        &self,
        volume: &mut LabelVolume,
        shape: &Shape<'_>,
        ranges: [RangeInclusive<usize>; 3],
        label: i32,
    ) {
        let _span = trace_span!("render_polyhedron", label = label).entered();
        let [_, ny, nx] = volume.dims;
        let plane = ny * nx;
        let [zr, yr, xr] = ranges;
        let z0 = *zr.start();
        let slabs = &mut volume.data[z0 * plane..(*zr.end() + 1) * plane];
        let cfg = &self.config;
        let fill_slab = |dz: usize, slab: &mut [i32]| {
            let z = z0 + dz;
            for y in yr.clone() {
                for x in xr.clone() {
                    let voxel = &mut slab[y * nx + x];
                    match shape.classify(z, y, x) {
                        Membership::Inside => write_label(voxel, label, cfg),
                        Membership::Inconsistent => *voxel = DEBUG_ERROR_LABEL,
                        Membership::Outside => {}
                    }
                }
            }
        };

        for_each_slab(slabs, plane, cfg.parallel, fill_slab);
    }
}

#[cfg(feature = "rayon")]
fn for_each_slab<F>(slabs: &mut [i32], plane: usize, parallel: bool, f: F)
where
    F: Fn(usize, &mut [i32]) + Sync + Send,
{
    if parallel {
        slabs
            .par_chunks_mut(plane)
            .enumerate()
            .for_each(|(dz, slab)| f(dz, slab));
    } else {
        slabs
            .chunks_mut(plane)
            .enumerate()
            .for_each(|(dz, slab)| f(dz, slab));
    }
}

#[cfg(not(feature = "rayon"))]
fn for_each_slab<F>(slabs: &mut [i32], plane: usize, _parallel: bool, f: F)
where
    F: Fn(usize, &mut [i32]),
{
    slabs
        .chunks_mut(plane)
        .enumerate()
        .for_each(|(dz, slab)| f(dz, slab));
}

#[inline]
fn write_label(voxel: &mut i32, label: i32, cfg: &RenderConfig) {
    if *voxel == 0 {
        *voxel = label;
    } else if cfg.use_overlap_label {
        *voxel = cfg.overlap_label;
    }
}

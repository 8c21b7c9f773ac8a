//! `ConvexOracle` backed by the quickhull implementation of `chull`.
//!
//! Halfspace intersections are computed through polar duality: each
//! halfspace `n . y <= b` (relative to the interior point, `b > 0`) maps to
//! the dual point `n / b`; every facet `m . u = c` of the dual hull maps back
//! to a vertex `m / c` of the intersection, whose hull volume is the answer.

use super::{ConvexOracle, OracleError};
use crate::geometry::Halfspace;
use ::chull::ConvexHullWrapper;
use glam::DVec3;

/// Normals shorter than this carry no constraint and are skipped.
const MIN_NORMAL: f64 = 1e-12;
/// Minimum distance of the interior point from every plane.
const FEASIBILITY_EPS: f64 = 1e-9;

/// Default oracle built on `chull::ConvexHullWrapper`.
#[derive(Clone, Copy, Debug, Default)]
pub struct QuickhullOracle {
    /// Optional iteration cap passed to the hull builder.
    pub max_iter: Option<usize>,
}

impl QuickhullOracle {
    /// Creates an oracle without an iteration cap.
    pub fn new() -> Self {
        Self::default()
    }
}

struct Hull {
    vertices: Vec<DVec3>,
    triangles: Vec<[usize; 3]>,
}

impl Hull {
    fn build(points: &[DVec3], max_iter: Option<usize>) -> Result<Self, OracleError> {
        if points.len() < 4 {
            return Err(OracleError::TooFewPoints { got: points.len() });
        }
        let coords: Vec<Vec<f64>> = points.iter().map(|p| p.to_array().to_vec()).collect();
        let wrapper =
            ConvexHullWrapper::try_new(&coords, max_iter).map_err(|_| OracleError::Degenerate)?;
        let (verts, indices) = wrapper.vertices_indices();
        let vertices: Vec<DVec3> = verts
            .iter()
            .filter(|v| v.len() == 3)
            .map(|v| DVec3::new(v[0], v[1], v[2]))
            .collect();
        if vertices.len() != verts.len() {
            return Err(OracleError::Degenerate);
        }
        let triangles: Vec<[usize; 3]> = indices
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .filter(|t| t.iter().all(|&i| i < vertices.len()))
            .collect();
        if triangles.len() < 4 {
            return Err(OracleError::Degenerate);
        }
        Ok(Self {
            vertices,
            triangles,
        })
    }

    fn interior(&self) -> DVec3 {
        self.vertices.iter().copied().sum::<DVec3>() / self.vertices.len() as f64
    }

    /// Facet planes as `(normal, point on plane)` with normals facing away from the interior.
    fn oriented_planes(&self) -> impl Iterator<Item = (DVec3, DVec3)> + '_ {
        let g = self.interior();
        self.triangles.iter().filter_map(move |&[a, b, c]| {
            let (a, b, c) = (self.vertices[a], self.vertices[b], self.vertices[c]);
            let n = (b - a).cross(c - a);
            if n.length() <= MIN_NORMAL {
                return None;
            }
            let n = if n.dot(a - g) < 0.0 { -n } else { n };
            Some((n, a))
        })
    }

    fn halfspaces(&self) -> Vec<Halfspace> {
        self.oriented_planes()
            .map(|(n, a)| {
                let normal = n.normalize();
                Halfspace {
                    normal,
                    offset: -normal.dot(a),
                }
            })
            .collect()
    }

    fn volume(&self) -> f64 {
        let g = self.interior();
        self.triangles
            .iter()
            .map(|&[a, b, c]| {
                let (a, b, c) = (
                    self.vertices[a] - g,
                    self.vertices[b] - g,
                    self.vertices[c] - g,
                );
                a.dot(b.cross(c)).abs() / 6.0
            })
            .sum()
    }
}

/// Volume of the convex hull of `points`.
pub fn convex_volume(points: &[DVec3]) -> Result<f64, OracleError> {
    Ok(Hull::build(points, None)?.volume())
}

impl ConvexOracle for QuickhullOracle {
    fn hull(&self, points: &[DVec3]) -> Result<Vec<Halfspace>, OracleError> {
        Ok(Hull::build(points, self.max_iter)?.halfspaces())
    }

    fn intersection_volume(
        &self,
        halfspaces: &[Halfspace],
        interior: DVec3,
    ) -> Result<f64, OracleError> {
        let mut dual = Vec::with_capacity(halfspaces.len());
        for hs in halfspaces {
            let norm = hs.normal.length();
            if norm <= MIN_NORMAL {
                continue;
            }
            let slack = -hs.eval(interior);
            if slack <= FEASIBILITY_EPS * norm {
                return Err(OracleError::Infeasible);
            }
            dual.push(hs.normal / slack);
        }

        // A dual set that does not enclose the origin in 3D leaves some
        // direction unconstrained.
        let dual_hull = Hull::build(&dual, self.max_iter).map_err(|_| OracleError::Unbounded)?;
        let mut corners = Vec::with_capacity(dual_hull.triangles.len());
        for (n, a) in dual_hull.oriented_planes() {
            let c = n.dot(a);
            if c <= MIN_NORMAL * n.length() {
                return Err(OracleError::Unbounded);
            }
            corners.push(n / c + interior);
        }

        Ok(Hull::build(&corners, self.max_iter)?.volume())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_halfspaces(lo: f64, hi: f64) -> Vec<Halfspace> {
        let mut out = Vec::new();
        for axis in [DVec3::X, DVec3::Y, DVec3::Z] {
            out.push(Halfspace {
                normal: axis,
                offset: -hi,
            });
            out.push(Halfspace {
                normal: -axis,
                offset: lo,
            });
        }
        out
    }

    fn cube_corners(lo: f64, hi: f64) -> Vec<DVec3> {
        let mut out = Vec::new();
        for z in [lo, hi] {
            for y in [lo, hi] {
                for x in [lo, hi] {
                    out.push(DVec3::new(z, y, x));
                }
            }
        }
        out
    }

    #[test]
    fn intersection_of_cube_halfspaces_is_cube_volume() {
        let oracle = QuickhullOracle::new();
        let vol = oracle
            .intersection_volume(&cube_halfspaces(0.0, 2.0), DVec3::splat(1.0))
            .unwrap();
        assert!((vol - 8.0).abs() < 1e-9);
    }

    #[test]
    fn redundant_halfspaces_do_not_change_volume() {
        let oracle = QuickhullOracle::new();
        let mut hs = cube_halfspaces(0.0, 2.0);
        hs.extend(cube_halfspaces(-1.0, 3.0));
        let vol = oracle.intersection_volume(&hs, DVec3::splat(0.5)).unwrap();
        assert!((vol - 8.0).abs() < 1e-9);
    }

    #[test]
    fn infeasible_interior_point_is_reported() {
        let oracle = QuickhullOracle::new();
        let err = oracle
            .intersection_volume(&cube_halfspaces(0.0, 1.0), DVec3::splat(2.0))
            .err()
            .unwrap();
        assert_eq!(err, OracleError::Infeasible);
    }

    #[test]
    fn open_halfspace_set_is_unbounded() {
        let oracle = QuickhullOracle::new();
        let hs: Vec<Halfspace> = cube_halfspaces(0.0, 1.0)
            .into_iter()
            .filter(|h| h.normal != -DVec3::Z)
            .collect();
        let err = oracle
            .intersection_volume(&hs, DVec3::splat(0.5))
            .err()
            .unwrap();
        assert_eq!(err, OracleError::Unbounded);
    }

    #[test]
    fn hull_of_cube_corners_bounds_the_cube() {
        let oracle = QuickhullOracle::new();
        let hs = oracle.hull(&cube_corners(0.0, 1.0)).unwrap();
        assert!(hs.len() >= 6);
        for h in &hs {
            assert!((h.normal.length() - 1.0).abs() < 1e-9);
            assert!(h.contains(DVec3::splat(0.5)));
        }
        assert!(hs.iter().any(|h| !h.contains(DVec3::new(0.5, 0.5, 1.5))));
        let vol = convex_volume(&cube_corners(0.0, 1.0)).unwrap();
        assert!((vol - 1.0).abs() < 1e-9);
    }

    #[test]
    fn coplanar_points_are_degenerate() {
        let oracle = QuickhullOracle::new();
        let flat: Vec<DVec3> = (0..6)
            .map(|i| DVec3::new(0.0, i as f64, (i * i) as f64))
            .collect();
        assert_eq!(oracle.hull(&flat).err(), Some(OracleError::Degenerate));
        assert_eq!(
            oracle.hull(&flat[..3]).err(),
            Some(OracleError::TooFewPoints { got: 3 })
        );
    }
}

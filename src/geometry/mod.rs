//! Geometry kernel for star-convex polyhedra.
//!
//! A polyhedron is a center plus one distance per ray; its vertices are
//! `center + dist[r] * ray[r]` and its surface is the shared face mesh. The
//! functions here compute the per-polyhedron scalars the suppression loop
//! needs (volume, bounding box, bounding radii) and the point membership
//! tests used by rendering.

mod bbox;
mod halfspace;
mod polyhedron;
mod predicates;
mod sphere;

pub use bbox::{anisotropy, BoundingBox};
pub use halfspace::{kernel_halfspaces, point_in_halfspaces, Halfspace};
pub use polyhedron::{
    bounding_box, centroid, inner_radius, inner_radius_isotropic, outer_radius,
    outer_radius_isotropic, vertices, volume,
};
pub use predicates::{inside_halfspace, inside_kernel, inside_polyhedron, inside_tetrahedron};
pub use sphere::{intersect_sphere, intersect_sphere_isotropic};

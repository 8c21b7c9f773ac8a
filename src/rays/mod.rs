//! Shared ray directions and their face triangulation.
//!
//! Every polyhedron handled by the crate is described by one distance per ray
//! of a `RayTemplate`, closed by the triangles of a `FaceMesh`. Both are
//! validated once on construction and shared read-only afterwards.
//!
//! Coordinates are stored in `(z, y, x)` order: lane 0 of a `Vec3` carries z,
//! lane 2 carries x. All determinants and cross products in the crate work on
//! lanes, so the orientation convention is consistent throughout.

#[cfg(feature = "io")]
pub mod io;
mod sphere;

use crate::util::{StarDistError, StarDistResult};
use glam::Vec3;

/// Ordered set of ray directions; the index of a direction is its ray id.
#[derive(Clone, Debug, PartialEq)]
pub struct RayTemplate {
    directions: Vec<Vec3>,
}

impl RayTemplate {
    /// Creates a template from `(z, y, x)` direction vectors.
    ///
    /// Directions are used as given, without normalization: a polyhedron
    /// vertex is `center + dist * direction`, so non-unit rays scale the
    /// distances along them.
    pub fn new(directions: Vec<Vec3>) -> StarDistResult<Self> {
        for dir in &directions {
            if !dir.is_finite() || dir.length_squared() <= f32::EPSILON {
                return Err(StarDistError::InvalidInput(
                    "ray directions must be finite and non-zero",
                ));
            }
        }
        Ok(Self { directions })
    }

    /// Creates a template from a flat `n_rays x 3` buffer.
    pub fn from_flat(data: &[f32]) -> StarDistResult<Self> {
        if data.len() % 3 != 0 {
            return Err(StarDistError::InvalidInput(
                "ray buffer length must be a multiple of 3",
            ));
        }
        let directions = data
            .chunks_exact(3)
            .map(|c| Vec3::new(c[0], c[1], c[2]))
            .collect();
        Self::new(directions)
    }

    /// Returns the number of rays.
    pub fn len(&self) -> usize {
        self.directions.len()
    }

    /// Returns true if the template holds no rays.
    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    /// Returns the direction of ray `r`.
    #[inline]
    pub fn direction(&self, r: usize) -> Vec3 {
        self.directions[r]
    }

    /// Returns all directions in ray order.
    pub fn directions(&self) -> &[Vec3] {
        &self.directions
    }
}

/// Triangulation of the unit sphere over ray indices.
///
/// Triangles must form a closed, consistently oriented surface so that the
/// signed tetrahedron volumes around the centre sum to a positive volume.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceMesh {
    faces: Vec<[usize; 3]>,
}

impl FaceMesh {
    /// Creates a mesh, checking every index against `n_rays`.
    pub fn new(faces: Vec<[usize; 3]>, n_rays: usize) -> StarDistResult<Self> {
        for (face, tri) in faces.iter().enumerate() {
            for &index in tri {
                if index >= n_rays {
                    return Err(StarDistError::FaceIndexOutOfRange {
                        face,
                        index: index as i64,
                        n_rays,
                    });
                }
            }
        }
        Ok(Self { faces })
    }

    /// Creates a mesh from a flat `n_faces x 3` buffer of signed indices.
    pub fn from_flat(data: &[i32], n_rays: usize) -> StarDistResult<Self> {
        if data.len() % 3 != 0 {
            return Err(StarDistError::InvalidInput(
                "face buffer length must be a multiple of 3",
            ));
        }
        let mut faces = Vec::with_capacity(data.len() / 3);
        for (face, chunk) in data.chunks_exact(3).enumerate() {
            let mut tri = [0usize; 3];
            for (slot, &index) in tri.iter_mut().zip(chunk) {
                if index < 0 || index as usize >= n_rays {
                    return Err(StarDistError::FaceIndexOutOfRange {
                        face,
                        index: index as i64,
                        n_rays,
                    });
                }
                *slot = index as usize;
            }
            faces.push(tri);
        }
        Ok(Self { faces })
    }

    /// Returns the number of triangles.
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// Returns true if the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Returns the triangles as ray index triples.
    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    /// Checks that the mesh fits `rays`; used when both come from separate sources.
    pub fn check_rays(&self, rays: &RayTemplate) -> StarDistResult<()> {
        let n_rays = rays.len();
        for (face, tri) in self.faces.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i >= n_rays) {
                return Err(StarDistError::FaceIndexOutOfRange {
                    face,
                    index: index as i64,
                    n_rays,
                });
            }
        }
        Ok(())
    }
}

//! Error types for stardist3d.

use thiserror::Error;

/// Result alias for stardist3d operations.
pub type StarDistResult<T> = std::result::Result<T, StarDistError>;

/// Errors that can occur when suppressing or rasterizing polyhedra.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum StarDistError {
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// A flattened input array does not have the length its shape implies.
    #[error("shape mismatch for {what}: expected {expected} elements, got {got}")]
    ShapeMismatch {
        /// Name of the offending input.
        what: &'static str,
        /// Expected element count.
        expected: usize,
        /// Actual element count.
        got: usize,
    },
    /// A face references a ray that does not exist.
    #[error("face {face} references ray {index}, but only {n_rays} rays exist")]
    FaceIndexOutOfRange {
        /// Face index within the mesh.
        face: usize,
        /// Offending ray index as given by the caller.
        index: i64,
        /// Number of rays in the template.
        n_rays: usize,
    },
    /// A ray distance is negative or not finite.
    #[error("invalid distance for polyhedron {poly}, ray {ray}")]
    InvalidDistance {
        /// Polyhedron index.
        poly: usize,
        /// Ray index.
        ray: usize,
    },
    /// The suppression run was interrupted through its cancellation token.
    #[error("suppression cancelled")]
    Cancelled,
    /// A ray or candidate file could not be read or parsed.
    #[error("failed to load input: {reason}")]
    Io {
        /// Human readable cause.
        reason: String,
    },
}

//! Ray file loading (requires the `io` feature).
//!
//! A ray file is a JSON object with flat `vertices` (`3 * n_rays` floats in
//! `(z, y, x)` order) and `faces` (`3 * n_faces` ray indices) arrays.

use super::{FaceMesh, RayTemplate};
use crate::util::{StarDistError, StarDistResult};
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
struct RaysFile {
    vertices: Vec<f32>,
    faces: Vec<i32>,
}

/// Parses rays and faces from a JSON string.
pub fn parse_rays_json(text: &str) -> StarDistResult<(RayTemplate, FaceMesh)> {
    let file: RaysFile = serde_json::from_str(text).map_err(|err| StarDistError::Io {
        reason: err.to_string(),
    })?;
    if file.vertices.is_empty() || file.faces.is_empty() {
        return Err(StarDistError::Io {
            reason: "no vertices or faces found".to_string(),
        });
    }
    if file.vertices.len() % 3 != 0 || file.faces.len() % 3 != 0 {
        return Err(StarDistError::Io {
            reason: "vertices and faces must be divisible by 3".to_string(),
        });
    }
    let rays = RayTemplate::from_flat(&file.vertices)?;
    let faces = FaceMesh::from_flat(&file.faces, rays.len())?;
    Ok((rays, faces))
}

/// Loads rays and faces from a JSON file on disk.
pub fn load_rays_json<P: AsRef<Path>>(path: P) -> StarDistResult<(RayTemplate, FaceMesh)> {
    let text = std::fs::read_to_string(path.as_ref()).map_err(|err| StarDistError::Io {
        reason: format!("{}: {err}", path.as_ref().display()),
    })?;
    parse_rays_json(&text)
}

//! Candidate file loading (requires the `io` feature).
//!
//! A candidate file is a JSON object with flat `scores`, `dist`
//! (`n x n_rays`) and `points` (`n x 3`, `(z, y, x)`) arrays. `n_rays` may be
//! omitted for non-empty files and is then inferred.

use super::Candidates;
use crate::util::{StarDistError, StarDistResult};
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
struct CandidatesFile {
    #[serde(default)]
    n_rays: Option<usize>,
    scores: Vec<f32>,
    dist: Vec<f32>,
    points: Vec<f32>,
}

impl Candidates {
    /// Parses candidates from a JSON string.
    pub fn from_json(text: &str) -> StarDistResult<Self> {
        let file: CandidatesFile = serde_json::from_str(text).map_err(|err| StarDistError::Io {
            reason: err.to_string(),
        })?;
        let n_rays = match file.n_rays {
            Some(n) => n,
            None if file.scores.is_empty() => 0,
            None => file.dist.len() / file.scores.len(),
        };
        Self::new(file.scores, file.dist, file.points, n_rays)
    }

    /// Loads candidates from a JSON file on disk.
    pub fn load_json<P: AsRef<Path>>(path: P) -> StarDistResult<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|err| StarDistError::Io {
            reason: format!("{}: {err}", path.as_ref().display()),
        })?;
        Self::from_json(&text)
    }
}

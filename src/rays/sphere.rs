//! Icosphere ray templates.

use super::{FaceMesh, RayTemplate};
use crate::util::math::det_rows;
use glam::Vec3;
use std::collections::HashMap;

impl RayTemplate {
    /// Builds the rays and faces of an icosahedron subdivided `subdivisions` times.
    ///
    /// Each subdivision splits every triangle into four, so the ray count is
    /// 12, 42, 162, 642, ... Faces are oriented so that polyhedron volumes
    /// come out positive.
    pub fn icosphere(subdivisions: usize) -> (RayTemplate, FaceMesh) {
        let t = (1.0 + 5.0f32.sqrt()) / 2.0;
        let mut verts: Vec<Vec3> = [
            [-1.0, t, 0.0],
            [1.0, t, 0.0],
            [-1.0, -t, 0.0],
            [1.0, -t, 0.0],
            [0.0, -1.0, t],
            [0.0, 1.0, t],
            [0.0, -1.0, -t],
            [0.0, 1.0, -t],
            [t, 0.0, -1.0],
            [t, 0.0, 1.0],
            [-t, 0.0, -1.0],
            [-t, 0.0, 1.0],
        ]
        .iter()
        .map(|&v| Vec3::from_array(v).normalize())
        .collect();

        let mut faces: Vec<[usize; 3]> = vec![
            [0, 11, 5],
            [0, 5, 1],
            [0, 1, 7],
            [0, 7, 10],
            [0, 10, 11],
            [1, 5, 9],
            [5, 11, 4],
            [11, 10, 2],
            [10, 7, 6],
            [7, 1, 8],
            [3, 9, 4],
            [3, 4, 2],
            [3, 2, 6],
            [3, 6, 8],
            [3, 8, 9],
            [4, 9, 5],
            [2, 4, 11],
            [6, 2, 10],
            [8, 6, 7],
            [9, 8, 1],
        ];

        for _ in 0..subdivisions {
            let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
            let mut next = Vec::with_capacity(faces.len() * 4);
            for &[a, b, c] in &faces {
                let ab = midpoint(&mut verts, &mut midpoints, a, b);
                let bc = midpoint(&mut verts, &mut midpoints, b, c);
                let ca = midpoint(&mut verts, &mut midpoints, c, a);
                next.push([a, ab, ca]);
                next.push([b, bc, ab]);
                next.push([c, ca, bc]);
                next.push([ab, bc, ca]);
            }
            faces = next;
        }

        for tri in &mut faces {
            let [a, b, c] = *tri;
            if det_rows(verts[a], verts[b], verts[c], Vec3::ZERO) < 0.0 {
                *tri = [a, c, b];
            }
        }

        (RayTemplate { directions: verts }, FaceMesh { faces })
    }
}

fn midpoint(
    verts: &mut Vec<Vec3>,
    cache: &mut HashMap<(usize, usize), usize>,
    a: usize,
    b: usize,
) -> usize {
    let key = (a.min(b), a.max(b));
    if let Some(&idx) = cache.get(&key) {
        return idx;
    }
    let idx = verts.len();
    verts.push(((verts[a] + verts[b]) * 0.5).normalize());
    cache.insert(key, idx);
    idx
}

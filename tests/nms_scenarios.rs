//! Behavioral scenarios for suppression.

use glam::DVec3;
use stardist3d::geometry::Halfspace;
use stardist3d::{
    CancelToken, ConvexOracle, FaceMesh, NmsConfig, OracleError, Polyhedra, QuickhullOracle,
    RayTemplate, StarDistError, Suppressor,
};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Forwards to the default oracle and counts every call.
#[derive(Default)]
struct CountingOracle {
    inner: QuickhullOracle,
    calls: AtomicUsize,
}

impl CountingOracle {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ConvexOracle for CountingOracle {
    fn hull(&self, points: &[DVec3]) -> Result<Vec<Halfspace>, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.hull(points)
    }

    fn intersection_volume(
        &self,
        halfspaces: &[Halfspace],
        interior: DVec3,
    ) -> Result<f64, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.intersection_volume(halfspaces, interior)
    }
}

/// Oracle that fails every request.
struct FailingOracle;

impl ConvexOracle for FailingOracle {
    fn hull(&self, _points: &[DVec3]) -> Result<Vec<Halfspace>, OracleError> {
        Err(OracleError::Degenerate)
    }

    fn intersection_volume(
        &self,
        _halfspaces: &[Halfspace],
        _interior: DVec3,
    ) -> Result<f64, OracleError> {
        Err(OracleError::Infeasible)
    }
}

fn spheres(n_rays: usize, radii: &[f32]) -> Vec<f32> {
    radii
        .iter()
        .flat_map(|&r| std::iter::repeat(r).take(n_rays))
        .collect()
}

fn sequential(threshold: f32) -> NmsConfig {
    NmsConfig {
        threshold,
        parallel: false,
        ..NmsConfig::default()
    }
}

#[test]
fn perfect_overlap_suppresses_the_second_candidate() {
    let (rays, faces) = RayTemplate::icosphere(2);
    let dist = spheres(rays.len(), &[5.0, 5.0]);
    let centers = [12.0, 12.0, 12.0, 12.0, 12.0, 12.0];
    let polys = Polyhedra::new(&dist, &centers, rays.len()).unwrap();

    let result = Suppressor::new(&rays, &faces)
        .with_config(sequential(0.5))
        .run(polys, &[0.9, 0.8])
        .unwrap();
    assert_eq!(result.keep, vec![true, false]);
    assert_eq!(result.stats.suppressed_total(), 1);
}

#[test]
fn disjoint_bounding_spheres_never_reach_the_oracle() {
    let (rays, faces) = RayTemplate::icosphere(2);
    let dist = spheres(rays.len(), &[4.0, 4.0, 3.0]);
    let centers = [10.0, 10.0, 10.0, 10.0, 10.0, 25.0, 30.0, 10.0, 10.0];
    let polys = Polyhedra::new(&dist, &centers, rays.len()).unwrap();
    let oracle = CountingOracle::default();

    let result = Suppressor::new(&rays, &faces)
        .with_config(sequential(0.1))
        .with_oracle(&oracle)
        .run(polys, &[0.9, 0.8, 0.7])
        .unwrap();
    assert_eq!(result.keep, vec![true, true, true]);
    assert_eq!(oracle.calls(), 0);
    assert_eq!(result.stats.kept_pretest, 3);
    assert_eq!(result.stats.calls_kernel + result.stats.calls_convex, 0);
}

#[test]
fn first_candidate_is_always_kept() {
    let (rays, faces) = RayTemplate::icosphere(1);
    let dist = spheres(rays.len(), &[3.0, 6.0, 2.0, 5.0]);
    let centers = [
        8.0, 8.0, 8.0, 8.0, 8.0, 9.0, 9.0, 8.0, 8.0, 8.0, 9.0, 9.0,
    ];
    let polys = Polyhedra::new(&dist, &centers, rays.len()).unwrap();

    for threshold in [0.0, 0.1, 0.5, 0.9] {
        let result = Suppressor::new(&rays, &faces)
            .with_config(sequential(threshold))
            .run(polys, &[4.0, 3.0, 2.0, 1.0])
            .unwrap();
        assert!(result.keep[0], "threshold {threshold}");
    }
}

#[test]
fn threshold_one_keeps_everything() {
    let (rays, faces) = RayTemplate::icosphere(1);
    let dist = spheres(rays.len(), &[4.0, 4.0, 4.0]);
    let centers = [8.0; 9];
    let polys = Polyhedra::new(&dist, &centers, rays.len()).unwrap();

    let result = Suppressor::new(&rays, &faces)
        .with_config(sequential(1.0))
        .run(polys, &[3.0, 2.0, 1.0])
        .unwrap();
    assert_eq!(result.kept_count(), 3);
}

#[test]
fn contained_candidate_is_suppressed_by_its_container() {
    // The small sphere lies entirely inside the large one, so its overlap
    // normalized by the smaller volume is 1.
    let (rays, faces) = RayTemplate::icosphere(2);
    let dist = spheres(rays.len(), &[8.0, 3.0]);
    let centers = [16.0, 16.0, 16.0, 16.0, 17.0, 16.0];
    let polys = Polyhedra::new(&dist, &centers, rays.len()).unwrap();

    let result = Suppressor::new(&rays, &faces)
        .with_config(sequential(0.7))
        .run(polys, &[0.9, 0.8])
        .unwrap();
    assert_eq!(result.keep, vec![true, false]);
}

#[test]
fn oracle_failures_fall_back_to_voxel_counting() {
    // Two icosahedra whose sphere bounds bracket the threshold. A failed
    // kernel gives no evidence and a failed hull cannot rule the pair out,
    // so the voxel count decides.
    let (rays, faces) = RayTemplate::icosphere(0);
    let dist = spheres(rays.len(), &[6.0, 6.0]);
    let centers = [20.0, 20.0, 20.0, 26.0, 20.0, 20.0];
    let polys = Polyhedra::new(&dist, &centers, rays.len()).unwrap();

    let result = Suppressor::new(&rays, &faces)
        .with_config(sequential(0.3))
        .with_oracle(FailingOracle)
        .run(polys, &[0.9, 0.8])
        .unwrap();
    let stats = &result.stats;
    assert_eq!(stats.kept_pretest + stats.suppressed_pretest, 0);
    assert_eq!(stats.calls_kernel, 1);
    assert_eq!(stats.suppressed_kernel, 0);
    assert_eq!(stats.calls_convex, 1);
    assert_eq!(stats.kept_convex, 0);
    assert_eq!(stats.calls_render, 1);
    assert!(result.keep[0]);
    assert_eq!(result.keep[1], stats.suppressed_render == 0);
}

#[test]
fn repeated_runs_are_identical() {
    let (rays, faces) = RayTemplate::icosphere(1);
    let radii: Vec<f32> = (0..12).map(|k| 2.5 + (k % 4) as f32).collect();
    let dist = spheres(rays.len(), &radii);
    let centers: Vec<f32> = (0..12)
        .flat_map(|k| [10.0 + (k % 3) as f32 * 3.0, 10.0 + (k / 3) as f32 * 2.5, 10.0])
        .collect();
    let scores: Vec<f32> = (0..12).map(|k| 1.0 - k as f32 * 0.05).collect();
    let polys = Polyhedra::new(&dist, &centers, rays.len()).unwrap();
    let suppressor = Suppressor::new(&rays, &faces).with_config(sequential(0.3));

    let first = suppressor.run(polys, &scores).unwrap();
    let second = suppressor.run(polys, &scores).unwrap();
    assert_eq!(first.keep, second.keep);
    assert_eq!(first.stats.without_timings(), second.stats.without_timings());
    assert!(first.keep[0]);
}

#[test]
fn empty_inputs_yield_empty_masks() {
    let (rays, faces) = RayTemplate::icosphere(1);
    let polys = Polyhedra::new(&[], &[], rays.len()).unwrap();
    let result = Suppressor::new(&rays, &faces).run(polys, &[]).unwrap();
    assert!(result.keep.is_empty());

    let dist = spheres(rays.len(), &[3.0, 3.0]);
    let polys = Polyhedra::new(&dist, &[5.0; 6], rays.len()).unwrap();
    let no_faces = FaceMesh::new(Vec::new(), rays.len()).unwrap();
    let result = Suppressor::new(&rays, &no_faces)
        .run(polys, &[1.0, 0.5])
        .unwrap();
    assert_eq!(result.keep, vec![true, true]);
}

#[test]
fn cancellation_is_reported_not_swallowed() {
    let (rays, faces) = RayTemplate::icosphere(1);
    let dist = spheres(rays.len(), &[3.0, 3.0, 3.0]);
    let centers = [5.0, 5.0, 5.0, 5.0, 5.0, 6.0, 5.0, 5.0, 7.0];
    let polys = Polyhedra::new(&dist, &centers, rays.len()).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = Suppressor::new(&rays, &faces)
        .run_cancellable(polys, &[3.0, 2.0, 1.0], &cancel)
        .err()
        .unwrap();
    assert_eq!(err, StarDistError::Cancelled);
}

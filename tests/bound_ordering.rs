//! The cascade's bounds must bracket the overlap they certify.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stardist3d::nms::CONVEX_FAILURE_VOLUME;
use stardist3d::{OverlapCascade, Polyhedra, QuickhullOracle, RayTemplate};

fn jittered_candidates(rng: &mut StdRng, n: usize, n_rays: usize) -> (Vec<f32>, Vec<f32>) {
    let mut dist = Vec::with_capacity(n * n_rays);
    let mut centers = Vec::with_capacity(n * 3);
    for _ in 0..n {
        let radius = rng.random_range(3.0f32..6.0);
        for _ in 0..n_rays {
            dist.push(radius * rng.random_range(0.85f32..1.15));
        }
        for _ in 0..3 {
            centers.push(rng.random_range(8.0f32..18.0));
        }
    }
    (dist, centers)
}

#[test]
fn bounds_are_ordered_for_random_pairs() {
    let (rays, faces) = RayTemplate::icosphere(1);
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let (dist, centers) = jittered_candidates(&mut rng, 8, rays.len());
    let polys = Polyhedra::new(&dist, &centers, rays.len()).unwrap();
    let oracle = QuickhullOracle::new();
    let cascade = OverlapCascade::new(polys, &rays, &faces, &oracle, 0.5).unwrap();

    let mut overlapping = 0;
    let mut hull_checked = 0;
    for i in 0..cascade.len() {
        for j in i + 1..cascade.len() {
            let est = cascade.estimates(i, j);
            let tol = 1e-3 * est.min_volume + 1e-3;
            assert!(est.min_volume > 0.0, "pair ({i}, {j})");
            assert!(est.upper + tol >= est.kernel, "pair ({i}, {j}): {est:?}");
            assert!(est.kernel <= est.convex + tol, "pair ({i}, {j}): {est:?}");
            assert!(est.lower <= est.convex + tol, "pair ({i}, {j}): {est:?}");

            let slack = 0.25 * est.min_volume + 20.0;
            assert!(est.rendered <= est.upper + slack, "pair ({i}, {j}): {est:?}");
            assert!(est.rendered + slack >= est.kernel, "pair ({i}, {j}): {est:?}");
            if est.convex < CONVEX_FAILURE_VOLUME {
                assert!(est.rendered <= est.convex + slack, "pair ({i}, {j}): {est:?}");
                hull_checked += 1;
            }
            overlapping += usize::from(est.kernel > 0.0);
        }
    }
    assert!(overlapping > 0);
    assert!(hull_checked > 0);
}

#[test]
fn ratios_are_normalized_by_the_smaller_volume() {
    let (rays, faces) = RayTemplate::icosphere(2);
    let mut dist = vec![8.0f32; rays.len()];
    dist.extend(vec![3.0f32; rays.len()]);
    let centers = [16.0, 16.0, 16.0, 16.0, 16.0, 16.0];
    let polys = Polyhedra::new(&dist, &centers, rays.len()).unwrap();
    let oracle = QuickhullOracle::new();
    let cascade = OverlapCascade::new(polys, &rays, &faces, &oracle, 0.5).unwrap();

    let est = cascade.estimates(0, 1);
    assert_eq!(est.min_volume, cascade.summary(1).volume);
    // The small sphere is nested in the large one, so its kernel is the overlap.
    let ratio = est.ratio(est.kernel);
    assert!(ratio > 0.95 && ratio < 1.01, "ratio {ratio}");
}

#![cfg(feature = "rayon")]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stardist3d::{
    LabelRenderer, NmsConfig, Polyhedra, RayTemplate, RenderConfig, RenderMode, Suppressor,
};

fn scene(seed: u64, n: usize, n_rays: usize) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut dist = Vec::with_capacity(n * n_rays);
    let mut centers = Vec::with_capacity(n * 3);
    for _ in 0..n {
        let radius = rng.random_range(2.5f32..5.0);
        dist.extend((0..n_rays).map(|_| radius * rng.random_range(0.9f32..1.1)));
        centers.extend((0..3).map(|_| rng.random_range(6.0f32..26.0)));
    }
    let mut scores: Vec<f32> = (0..n).map(|_| rng.random_range(0.0f32..1.0)).collect();
    scores.sort_by(|a, b| b.total_cmp(a));
    (scores, dist, centers)
}

#[test]
fn parallel_suppression_matches_sequential() {
    let (rays, faces) = RayTemplate::icosphere(1);
    let (scores, dist, centers) = scene(7, 60, rays.len());
    let polys = Polyhedra::new(&dist, &centers, rays.len()).unwrap();

    let run = |parallel| {
        Suppressor::new(&rays, &faces)
            .with_config(NmsConfig {
                threshold: 0.3,
                parallel,
                ..NmsConfig::default()
            })
            .run(polys, &scores)
            .unwrap()
    };
    let seq = run(false);
    let par = run(true);
    assert_eq!(seq.keep, par.keep);
    assert_eq!(seq.stats.without_timings(), par.stats.without_timings());
    assert!(seq.kept_count() < scores.len());
}

#[test]
fn parallel_rendering_matches_sequential() {
    let (rays, faces) = RayTemplate::icosphere(1);
    let (_, dist, centers) = scene(11, 12, rays.len());
    let polys = Polyhedra::new(&dist, &centers, rays.len()).unwrap();
    let labels: Vec<i32> = (1..=12).collect();

    for mode in [RenderMode::Full, RenderMode::Kernel, RenderMode::Convex] {
        let render = |parallel| {
            LabelRenderer::new(&rays, &faces)
                .with_config(RenderConfig {
                    mode,
                    parallel,
                    ..RenderConfig::default()
                })
                .render(polys, &labels, [32, 32, 32])
                .unwrap()
        };
        assert_eq!(render(false), render(true), "mode {}", mode.as_str());
    }
}

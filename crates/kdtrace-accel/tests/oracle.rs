//! Every acceleration structure must agree with the linear scan.

use std::f32::consts::PI;

use kdtrace_accel::{
    AccelBuilder, AccelConfig, AccelKind, Geometry, GeometryBuilder, GridOverlap, PrimitiveMode, Ray, Sample, Scene,
};
use kdtrace_math::{Dir3, Point3, Transform, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const KINDS: [AccelKind; 3] = [AccelKind::BruteForce, AccelKind::UniformGrid, AccelKind::KdTree];

fn random_point(rng: &mut StdRng, lo: f32, hi: f32) -> Point3 {
    Point3::new(rng.gen_range(lo..hi), rng.gen_range(lo..hi), rng.gen_range(lo..hi))
}

fn random_geometry(rng: &mut StdRng, count: usize) -> Geometry {
    let mut builder = GeometryBuilder::new();
    builder.begin(PrimitiveMode::Triangles);
    for _ in 0..count {
        let base = random_point(rng, -5.0, 5.0);
        builder.add_vertex(base);
        for _ in 0..2 {
            let offset = random_point(rng, -0.8, 0.8);
            builder.add_vertex(base + offset.coords);
        }
    }
    builder.end();
    builder.build()
}

fn random_transform(rng: &mut StdRng) -> Transform {
    let axis = Dir3::new_normalize(random_point(rng, -1.0, 1.0).coords + Vec3::new(0.0, 0.0, 0.01));
    let offset = random_point(rng, -20.0, 20.0);
    let scale = rng.gen_range(0.5..2.0);
    Transform::translation(offset.x, offset.y, offset.z)
        .then(&Transform::rotation_about_axis(&axis, rng.gen_range(0.0..2.0 * PI)))
        .then(&Transform::scale(scale, scale, scale))
}

fn random_ray(rng: &mut StdRng, extent: f32) -> Sample {
    let orig = random_point(rng, -2.0 * extent, 2.0 * extent);
    let target = random_point(rng, -extent, extent);
    Sample::new(orig, (target - orig).normalize())
}

fn scene(kind: AccelKind, overlap: GridOverlap, geometries: &[Geometry], transforms: &[(usize, Transform)]) -> Scene {
    let mut config = AccelConfig {
        accel: kind,
        ..AccelConfig::default()
    };
    config.grid.overlap = overlap;
    let mut scene = Scene::new(config).unwrap();
    for g in geometries {
        scene.add_geometry(g.clone());
    }
    for (g, t) in transforms {
        scene.instantiate(*g, t.clone()).unwrap();
    }
    scene
}

fn assert_same_hits(reference: &[Sample], other: &[Sample], label: &str) {
    for (i, (a, b)) in reference.iter().zip(other).enumerate() {
        assert_eq!(a.hit.is_hit(), b.hit.is_hit(), "{label}: ray {i} hit mismatch");
        if a.hit.is_hit() {
            let tolerance = 1e-3 * a.hit.distance.max(1.0);
            assert!(
                (a.hit.distance - b.hit.distance).abs() < tolerance,
                "{label}: ray {i} distance {} vs {}",
                a.hit.distance,
                b.hit.distance
            );
        }
    }
}

#[test]
fn single_geometry_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(1);
    let geometry = random_geometry(&mut rng, 600);
    let rays: Vec<Sample> = (0..1000).map(|_| random_ray(&mut rng, 5.0)).collect();
    let placement = [(0, Transform::identity())];

    let mut reference = rays.clone();
    let mut oracle = scene(AccelKind::BruteForce, GridOverlap::BoundingBox, &[geometry.clone()], &placement);
    let hits = oracle.commit().trace_nearest_batch(&mut reference);
    assert!(hits > 100, "too few hits to be meaningful: {hits}");

    for (kind, overlap) in [
        (AccelKind::UniformGrid, GridOverlap::BoundingBox),
        (AccelKind::UniformGrid, GridOverlap::Exact),
        (AccelKind::KdTree, GridOverlap::BoundingBox),
    ] {
        let mut samples = rays.clone();
        let mut s = scene(kind, overlap, &[geometry.clone()], &placement);
        s.commit().trace_nearest_batch(&mut samples);
        assert_same_hits(&reference, &samples, &format!("{kind:?}/{overlap:?}"));
    }
}

#[test]
fn instanced_scene_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(2);
    let geometries = vec![random_geometry(&mut rng, 200), random_geometry(&mut rng, 50)];
    let placement: Vec<(usize, Transform)> = (0..12).map(|i| (i % 2, random_transform(&mut rng))).collect();
    let rays: Vec<Sample> = (0..1500).map(|_| random_ray(&mut rng, 25.0)).collect();

    let mut reference = rays.clone();
    let mut oracle = scene(AccelKind::BruteForce, GridOverlap::BoundingBox, &geometries, &placement);
    let hits = oracle.commit().trace_nearest_batch(&mut reference);
    assert!(hits > 50, "too few hits to be meaningful: {hits}");

    for kind in [AccelKind::UniformGrid, AccelKind::KdTree] {
        let mut samples = rays.clone();
        let mut s = scene(kind, GridOverlap::BoundingBox, &geometries, &placement);
        s.commit().trace_nearest_batch(&mut samples);
        assert_same_hits(&reference, &samples, &format!("{kind:?}"));
    }
}

#[test]
fn any_hit_agrees_with_nearest() {
    let mut rng = StdRng::seed_from_u64(3);
    let geometries = vec![random_geometry(&mut rng, 150)];
    let placement: Vec<(usize, Transform)> = (0..6).map(|_| (0, random_transform(&mut rng))).collect();
    let rays: Vec<Sample> = (0..400).map(|_| random_ray(&mut rng, 25.0)).collect();

    for kind in KINDS {
        let mut s = scene(kind, GridOverlap::BoundingBox, &geometries, &placement);
        let view = s.commit();
        let mut samples = rays.clone();
        view.trace_nearest_batch(&mut samples);

        let long: Vec<Ray> = samples
            .iter()
            .map(|s| Ray::with_interval(s.ray.orig, s.ray.dir, 2e-4, f32::MAX))
            .collect();
        let blocked = view.trace_any_batch(&long);
        for (sample, blocked) in samples.iter().zip(&blocked) {
            assert_eq!(sample.hit.is_hit(), *blocked, "{kind:?}");
        }

        // Stopping well short of the nearest hit sees nothing.
        for sample in samples.iter().filter(|s| s.hit.is_hit() && s.hit.distance > 0.01) {
            let short = Ray::with_interval(sample.ray.orig, sample.ray.dir, 2e-4, sample.hit.distance * 0.5);
            assert!(!view.trace_any(&short), "{kind:?}");
        }
    }
}

#[test]
fn rebuild_gives_identical_results() {
    let mut rng = StdRng::seed_from_u64(4);
    let geometry = random_geometry(&mut rng, 300);
    let rays: Vec<Sample> = (0..300).map(|_| random_ray(&mut rng, 5.0)).collect();

    for kind in KINDS {
        let builder = AccelBuilder::from_config(&AccelConfig {
            accel: kind,
            ..AccelConfig::default()
        });
        let mut first = geometry.clone();
        let mut second = geometry.clone();
        builder.build_geometry(&mut first);
        builder.build_geometry(&mut second);
        builder.build_geometry(&mut second);

        for sample in &rays {
            let mut a = sample.hit;
            let mut b = sample.hit;
            first.accel.trace_nearest_geometry(&first.tri_accel, 0, &sample.ray, &mut a);
            second.accel.trace_nearest_geometry(&second.tri_accel, 0, &sample.ray, &mut b);
            assert_eq!(a, b, "{kind:?}");
        }
    }
}

#[test]
fn empty_and_degenerate_scenes_miss() {
    let degenerate = Geometry::from_indexed(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(2.0, 2.0, 2.0),
        ],
        &[[0, 1, 2], [0, 0, 0]],
        0,
    )
    .unwrap();
    assert_eq!(degenerate.triangle_count(), 0);

    for kind in KINDS {
        let mut empty = scene(kind, GridOverlap::BoundingBox, &[], &[]);
        let mut sample = Sample::new(Point3::origin(), Vec3::new(1.0, 1.0, 1.0));
        assert!(!empty.commit().trace_nearest(&mut sample));

        let mut s = scene(
            kind,
            GridOverlap::BoundingBox,
            &[degenerate.clone()],
            &[(0, Transform::identity())],
        );
        let view = s.commit();
        let mut sample = Sample::new(Point3::new(1.0, 0.0, 1.0), Vec3::new(-1.0, 1.0, 0.0));
        assert!(!view.trace_nearest(&mut sample), "{kind:?}");
        assert!(!view.trace_any(&sample.ray), "{kind:?}");
    }
}

#[test]
fn flat_geometry_is_found() {
    // A grid of coplanar triangles exercises planar boxes and split events.
    let mut builder = GeometryBuilder::new();
    for i in 0..10 {
        builder.begin(PrimitiveMode::TriangleStrip);
        for j in 0..=10 {
            builder.add_vertex(Point3::new(j as f32, i as f32, 0.0));
            builder.add_vertex(Point3::new(j as f32, i as f32 + 1.0, 0.0));
        }
    }
    let geometry = builder.build();
    assert_eq!(geometry.triangle_count(), 200);

    let mut rng = StdRng::seed_from_u64(5);
    for kind in KINDS {
        let mut s = scene(kind, GridOverlap::Exact, &[geometry.clone()], &[(0, Transform::identity())]);
        let view = s.commit();
        for _ in 0..200 {
            let x = rng.gen_range(0.05..9.6);
            let y = rng.gen_range(0.7..9.95);
            let mut sample = Sample::new(Point3::new(x, y, 3.0), Vec3::new(0.1, -0.2, -1.0));
            assert!(view.trace_nearest(&mut sample), "{kind:?} at ({x}, {y})");
            assert!((sample.hit_point().map_or(1.0, |p| p.z)).abs() < 1e-4);
        }
    }
}

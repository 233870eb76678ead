use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use kdtrace_accel::{AccelBuilder, AccelConfig, AccelKind, Geometry, GeometryBuilder, PrimitiveMode, Sample, Scene};
use kdtrace_math::{Point3, Transform, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const KINDS: [AccelKind; 3] = [AccelKind::BruteForce, AccelKind::UniformGrid, AccelKind::KdTree];

/// Triangulated sphere with `n` rings and `2n` segments.
fn sphere(n: usize) -> Geometry {
    let mut builder = GeometryBuilder::new();
    for ring in 0..n {
        let theta0 = std::f32::consts::PI * ring as f32 / n as f32;
        let theta1 = std::f32::consts::PI * (ring + 1) as f32 / n as f32;
        builder.begin(PrimitiveMode::TriangleStrip);
        for seg in 0..=2 * n {
            let phi = std::f32::consts::PI * seg as f32 / n as f32;
            for theta in [theta0, theta1] {
                builder.add_vertex(Point3::new(
                    theta.sin() * phi.cos(),
                    theta.sin() * phi.sin(),
                    theta.cos(),
                ));
            }
        }
    }
    builder.build()
}

fn random_samples(count: usize, seed: u64) -> Vec<Sample> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let orig = Point3::new(rng.gen_range(-20.0..20.0), rng.gen_range(-20.0..20.0), -30.0);
            let dir = Vec3::new(rng.gen_range(-0.3..0.3), rng.gen_range(-0.3..0.3), 1.0);
            Sample::new(orig, dir)
        })
        .collect()
}

fn config(kind: AccelKind) -> AccelConfig {
    AccelConfig {
        accel: kind,
        ..AccelConfig::default()
    }
}

fn bench_build(c: &mut Criterion) {
    let geometry = sphere(64);
    let mut group = c.benchmark_group("build");
    group.throughput(Throughput::Elements(geometry.triangle_count() as u64));
    for kind in KINDS {
        let builder = AccelBuilder::from_config(&config(kind));
        group.bench_function(format!("{kind:?}"), |b| {
            b.iter_batched(
                || geometry.clone(),
                |mut g| {
                    builder.build_geometry(&mut g);
                    black_box(g)
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn bench_trace(c: &mut Criterion) {
    let geometry = sphere(32);
    let samples = random_samples(4096, 7);
    let mut group = c.benchmark_group("trace_nearest");
    group.throughput(Throughput::Elements(samples.len() as u64));

    for kind in KINDS {
        let mut scene = Scene::new(config(kind)).unwrap();
        let id = scene.add_geometry(geometry.clone());
        for x in -3..=3 {
            for y in -3..=3 {
                scene
                    .instantiate(id, Transform::translation(x as f32 * 5.0, y as f32 * 5.0, 0.0))
                    .unwrap();
            }
        }
        let view = scene.commit();

        group.bench_function(format!("{kind:?}"), |b| {
            b.iter_batched(
                || samples.clone(),
                |mut batch| black_box(view.trace_nearest_batch(&mut batch)),
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_trace);
criterion_main!(benches);

//! kdtrace CLI - build, time and cross-check acceleration structures
//!
//! Scenes are generated procedurally: a grid of instanced spheres plus a
//! cloud of random triangles.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kdtrace_accel::{AccelConfig, AccelKind, Geometry, GeometryBuilder, PrimitiveMode, Sample, Scene};
use kdtrace_math::{Point3, Transform, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "kdtrace")]
#[command(about = "Ray tracing acceleration structure toolkit", long_about = None)]
struct Cli {
    /// TOML configuration file (defaults apply to missing keys)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a procedural scene and time nearest-hit queries
    Bench {
        /// Structure to use (overrides the configuration file)
        #[arg(short, long)]
        accel: Option<AccelArg>,
        #[command(flatten)]
        scene: SceneArgs,
    },
    /// Check every structure against the linear scan
    Compare {
        #[command(flatten)]
        scene: SceneArgs,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(clap::Args, Clone, Copy)]
struct SceneArgs {
    /// Number of rays to trace
    #[arg(short, long, default_value_t = 100_000)]
    rays: usize,
    /// Sphere instances per side of the grid
    #[arg(long, default_value_t = 4)]
    instances: usize,
    /// Sphere tessellation rings
    #[arg(long, default_value_t = 24)]
    detail: usize,
    /// Random triangles in the loose cloud
    #[arg(long, default_value_t = 2000)]
    triangles: usize,
    /// RNG seed for the scene and the rays
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum AccelArg {
    BruteForce,
    UniformGrid,
    KdTree,
}

impl From<AccelArg> for AccelKind {
    fn from(arg: AccelArg) -> Self {
        match arg {
            AccelArg::BruteForce => AccelKind::BruteForce,
            AccelArg::UniformGrid => AccelKind::UniformGrid,
            AccelArg::KdTree => AccelKind::KdTree,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AccelConfig::from_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => AccelConfig::default(),
    };

    match cli.command {
        Commands::Bench { accel, scene } => {
            let mut config = config;
            if let Some(accel) = accel {
                config.accel = accel.into();
            }
            bench(config, &scene)?;
        }
        Commands::Compare { scene } => compare(config, &scene)?,
        Commands::Config => print!("{}", toml::to_string_pretty(&config)?),
    }

    Ok(())
}

#[derive(Serialize)]
struct BenchSummary {
    build_ms: f64,
    commit_ms: f64,
    trace_ms: f64,
    rays: usize,
    hits: usize,
    mrays_per_sec: f64,
    report: kdtrace_accel::BuildReport,
}

fn bench(config: AccelConfig, args: &SceneArgs) -> Result<()> {
    let start = Instant::now();
    let mut scene = build_scene(config, args)?;
    let build_ms = start.elapsed().as_secs_f64() * 1e3;

    let start = Instant::now();
    let view = scene.commit();
    let commit_ms = start.elapsed().as_secs_f64() * 1e3;

    let mut samples = random_samples(args);
    let start = Instant::now();
    let hits = view.trace_nearest_batch(&mut samples);
    let trace_secs = start.elapsed().as_secs_f64();

    let summary = BenchSummary {
        build_ms,
        commit_ms,
        trace_ms: trace_secs * 1e3,
        rays: samples.len(),
        hits,
        mrays_per_sec: samples.len() as f64 / trace_secs.max(f64::EPSILON) / 1e6,
        report: scene.report(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn compare(config: AccelConfig, args: &SceneArgs) -> Result<()> {
    let rays = random_samples(args);

    let mut reference = rays.clone();
    let mut oracle = build_scene(
        AccelConfig {
            accel: AccelKind::BruteForce,
            ..config.clone()
        },
        args,
    )?;
    let hits = oracle.commit().trace_nearest_batch(&mut reference);
    log::info!("linear scan: {hits} hits out of {}", rays.len());

    let mut failed = false;
    for kind in [AccelKind::UniformGrid, AccelKind::KdTree] {
        let mut scene = build_scene(
            AccelConfig {
                accel: kind,
                ..config.clone()
            },
            args,
        )?;
        let mut samples = rays.clone();
        scene.commit().trace_nearest_batch(&mut samples);

        let mismatches = reference
            .iter()
            .zip(&samples)
            .filter(|(a, b)| !same_hit(a, b))
            .count();
        println!("{kind:?}: {mismatches} mismatches out of {} rays", rays.len());
        failed |= mismatches > 0;
    }

    if failed {
        anyhow::bail!("structures disagree with the linear scan");
    }
    Ok(())
}

fn same_hit(a: &Sample, b: &Sample) -> bool {
    match (a.hit.is_hit(), b.hit.is_hit()) {
        (true, true) => (a.hit.distance - b.hit.distance).abs() <= 1e-3 * a.hit.distance.max(1.0),
        (hit_a, hit_b) => hit_a == hit_b,
    }
}

fn build_scene(config: AccelConfig, args: &SceneArgs) -> Result<Scene> {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut scene = Scene::new(config)?;

    let sphere = scene.add_geometry(sphere(args.detail.max(2)));
    let n = args.instances;
    for i in 0..n {
        for j in 0..n {
            let s = rng.gen_range(0.5..1.5);
            let transform = Transform::translation(i as f32 * 4.0, j as f32 * 4.0, 0.0).then(&Transform::scale(s, s, s));
            scene.instantiate(sphere, transform)?;
        }
    }

    if args.triangles > 0 {
        let extent = n.max(1) as f32 * 4.0;
        let cloud = scene.add_geometry(triangle_cloud(&mut rng, args.triangles, extent));
        scene.instantiate(cloud, Transform::translation(-2.0, -2.0, -2.0))?;
    }

    Ok(scene)
}

fn sphere(rings: usize) -> Geometry {
    use std::f32::consts::PI;

    let mut builder = GeometryBuilder::new();
    for ring in 0..rings {
        let theta0 = PI * ring as f32 / rings as f32;
        let theta1 = PI * (ring + 1) as f32 / rings as f32;
        builder.begin(PrimitiveMode::TriangleStrip);
        for seg in 0..=2 * rings {
            let phi = PI * seg as f32 / rings as f32;
            for theta in [theta0, theta1] {
                builder.add_vertex(Point3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos()));
            }
        }
    }
    builder.build()
}

fn triangle_cloud(rng: &mut StdRng, count: usize, extent: f32) -> Geometry {
    let mut builder = GeometryBuilder::new();
    builder.begin(PrimitiveMode::Triangles);
    for _ in 0..count {
        let base = Point3::new(
            rng.gen_range(0.0..extent),
            rng.gen_range(0.0..extent),
            rng.gen_range(0.0..4.0),
        );
        builder.add_vertex(base);
        for _ in 0..2 {
            builder.add_vertex(base + Vec3::new(rng.gen_range(-0.3..0.3), rng.gen_range(-0.3..0.3), rng.gen_range(-0.3..0.3)));
        }
    }
    builder.build()
}

fn random_samples(args: &SceneArgs) -> Vec<Sample> {
    let mut rng = StdRng::seed_from_u64(args.seed.wrapping_add(1));
    let extent = args.instances.max(1) as f32 * 4.0;
    (0..args.rays)
        .map(|_| {
            let orig = Point3::new(rng.gen_range(-2.0..extent), rng.gen_range(-2.0..extent), -10.0);
            let dir = Vec3::new(rng.gen_range(-0.2..0.2), rng.gen_range(-0.2..0.2), 1.0);
            Sample::new(orig, dir)
        })
        .collect()
}

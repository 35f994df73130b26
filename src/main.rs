use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{ Context, Result };
use clap::Parser;
use log::info;
use serde::Serialize;

use curve_tracer::consts::NUM_THREADS;
use curve_tracer::logging;
use curve_tracer::parallel::run_batch;
use curve_tracer::scene::Scene;

/// Intersects rays with width-swept Bezier curves and prints the closest
/// hit of every ray as JSON.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// JSON query file listing curves and rays.
    file: PathBuf,

    /// Number of worker threads.
    #[clap(short, long, default_value_t = NUM_THREADS)]
    threads: usize,

    /// Ignore hits farther than this (overrides the query file).
    #[clap(short = 'd', long)]
    max_distance: Option<f64>,

    /// Log more (-v info, -vv debug, -vvv trace).
    #[clap(short, long, parse(from_occurrences))]
    verbose: u64,

    /// Pretty-print the JSON output.
    #[clap(long)]
    pretty: bool,
}

#[derive(Serialize)]
struct RayReport {
    ray: usize,
    hit: Option<HitReport>,
}

#[derive(Serialize)]
struct HitReport {
    curve: usize,
    t: f64,
    v: f64,
    point: [f64; 3],
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(logging::level_for_verbosity(args.verbose))
        .context("failed to install logger")?;

    let mut scene = Scene::load(&args.file)
        .with_context(|| format!("failed to load {}", args.file.display()))?;

    if let Some(max_distance) = args.max_distance {
        scene.max_distance = max_distance;
    }

    info!("{} curves, {} rays, max distance {}",
        scene.curves.len(), scene.rays.len(), scene.max_distance);

    let scene = Arc::new(scene);
    let hits = run_batch(Arc::clone(&scene), args.threads);

    let reports: Vec<RayReport> = hits.iter().enumerate()
        .map(|(ray, hit)| RayReport {
            ray,
            hit: hit.map(|h| HitReport {
                curve: h.curve,
                t: h.t,
                v: h.v,
                point: scene.rays[ray].position(h.t).to_array(),
            }),
        })
        .collect();

    let out = if args.pretty {
        serde_json::to_string_pretty(&reports)
    } else {
        serde_json::to_string(&reports)
    }.context("failed to serialize results")?;

    println!("{}", out);
    Ok(())
}

//! Simulate a walker following a route and print live announcements.

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time;

use campus_nav_cli::announcer::run_announcer_loop;
use campus_nav_cli::sim::{GpsJitter, PolylineWalk};
use campus_nav_cli::{config, feed, init_tracing};
use campus_nav_core::{GraphStore, LatLon, ProximityAnnouncer};

/// Walk a simulated pedestrian along a campus route
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Footway feed (JSON array or FeatureCollection)
    #[arg(long)]
    footways: PathBuf,

    /// Start as `lat,lon`
    #[arg(long, value_parser = feed::parse_lat_lon)]
    from: LatLon,

    /// Destination as `lat,lon`
    #[arg(long, value_parser = feed::parse_lat_lon)]
    to: LatLon,

    /// Entrance feed for out-of-range destinations
    #[arg(long)]
    entrances: Option<PathBuf>,

    /// Routing configuration (JSON); CAMPUS_NAV_* variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Walking speed in m/s
    #[arg(long, default_value_t = 1.4)]
    speed: f64,

    /// GPS noise radius in meters
    #[arg(long, default_value_t = 0.0)]
    jitter: f64,

    /// Simulation speed-up factor
    #[arg(long, default_value_t = 10.0)]
    time_scale: f64,

    /// Position update rate in Hz (simulated time)
    #[arg(long, default_value_t = 1.0)]
    rate: f64,

    /// Announce each instruction at most once
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("campus_nav_cli=info")?;
    let args = Args::parse();
    anyhow::ensure!(args.speed > 0.0, "--speed must be positive");
    anyhow::ensure!(args.time_scale > 0.0, "--time-scale must be positive");
    anyhow::ensure!(args.rate > 0.0, "--rate must be positive");

    let config = config::from_env(args.config.as_deref())?;
    let entrances = match &args.entrances {
        Some(path) => feed::load_entrances(path)?,
        None => Vec::new(),
    };
    let store = GraphStore::new(feed::load_footways(&args.footways)?, config.graph.clone());
    let graph = store.graph();

    let guidance =
        campus_nav_core::guide_with_entrances(&graph, args.from, args.to, &entrances, &config);
    if let Some(cause) = &guidance.fallback {
        println!("No footway route: {cause}");
    }
    println!("Route: {:.0} m, {} instruction(s)", guidance.length_m, guidance.instructions.len());
    for (i, instruction) in guidance.instructions.iter().enumerate() {
        println!("  [{i}] {}", instruction.text);
    }
    println!();

    let walk = PolylineWalk::new(guidance.polyline.clone(), args.speed);
    let jitter = GpsJitter::new(args.jitter);
    let announcer = ProximityAnnouncer::new(guidance.instructions, &config.guidance);
    let period =
        Duration::from_secs_f64(config.guidance.announce_interval_secs as f64 / args.time_scale);

    let (position_tx, position_rx) = watch::channel(None);
    let (announce_tx, mut announce_rx) = mpsc::channel(32);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let announcer_handle = tokio::spawn(run_announcer_loop(
        announcer,
        period,
        position_rx,
        announce_tx,
        shutdown_rx,
    ));

    let once = args.once;
    let printer = tokio::spawn(async move {
        let mut announced = HashSet::new();
        while let Some(announcement) = announce_rx.recv().await {
            if once && !announced.insert(announcement.index) {
                continue;
            }
            println!(
                "{} [{}] {}",
                announcement.at.format("%H:%M:%S%.3f"),
                announcement.index,
                announcement.text
            );
        }
    });

    let started = Utc::now();
    let mut rng = rand::rng();
    let mut ticker = time::interval(Duration::from_secs_f64(1.0 / (args.rate * args.time_scale)));
    let start = time::Instant::now();
    loop {
        ticker.tick().await;
        let t = start.elapsed().as_secs_f64() * args.time_scale;
        let Some(position) = walk.position_at(t) else {
            break;
        };
        position_tx
            .send(Some(jitter.apply(&mut rng, position)))
            .context("announcer stopped early")?;
        if walk.is_finished(t) {
            // Let the announcer see the final position.
            time::sleep(period).await;
            break;
        }
    }

    let _ = shutdown_tx.send(());
    announcer_handle.await?;
    printer.await?;

    println!(
        "\nWalk complete: {:.0} m in {:.0} s simulated ({} ms wall clock).",
        walk.length_m(),
        walk.duration_s(),
        (Utc::now() - started).num_milliseconds()
    );
    Ok(())
}

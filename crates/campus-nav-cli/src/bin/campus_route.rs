//! Route between two points on campus and print the guidance as JSON.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;

use campus_nav_cli::{config, feed, init_tracing};
use campus_nav_core::{build_graph, guide_with_entrances, LatLon};

/// Compute walking guidance between two coordinates
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
    #[arg(long, value_parser = feed::parse_lat_lon, conflicts_with = "building")]
    to: Option<LatLon>,

    /// Destination building id, resolved through --entrances
    #[arg(long, requires = "entrances")]
    building: Option<String>,

    /// Entrance feed used for building lookup and out-of-range destinations
    #[arg(long)]
    entrances: Option<PathBuf>,

    /// Routing configuration (JSON); CAMPUS_NAV_* variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,
}

fn main() -> anyhow::Result<()> {
    init_tracing("campus_nav_core=info")?;
    let args = Args::parse();

    let config = config::from_env(args.config.as_deref())?;
    let footways = feed::load_footways(&args.footways)?;
    let entrances = match &args.entrances {
        Some(path) => feed::load_entrances(path)?,
        None => Vec::new(),
    };

    let destination = match (&args.to, &args.building) {
        (Some(to), _) => *to,
        (None, Some(building)) => feed::nearest_entrance(&entrances, building, args.from)
            .map(|entrance| entrance.position())
            .with_context(|| format!("no entrance listed for building `{building}`"))?,
        (None, None) => bail!("either --to or --building is required"),
    };

    let graph = build_graph(&footways, &config.graph);
    let guidance = guide_with_entrances(&graph, args.from, destination, &entrances, &config);

    let output = if args.pretty {
        serde_json::to_string_pretty(&guidance)?
    } else {
        serde_json::to_string(&guidance)?
    };
    println!("{output}");
    Ok(())
}

//! Build the footway graph and report what went into it.

use clap::Parser;
use std::path::PathBuf;

use campus_nav_cli::{config, feed, init_tracing};
use campus_nav_core::build_graph;

/// Build the routing graph from a footway feed and print its build report
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Footway feed (JSON array or FeatureCollection)
    #[arg(long)]
    footways: PathBuf,

    /// Routing configuration (JSON); CAMPUS_NAV_* variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    init_tracing("campus_nav_core=debug")?;
    let args = Args::parse();

    let config = config::from_env(args.config.as_deref())?;
    let footways = feed::load_footways(&args.footways)?;
    let graph = build_graph(&footways, &config.graph);
    let report = graph.report();

    if args.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("Footways:   {} of {} used", report.footways_used, report.footways_total);
    println!(
        "  skipped:  {} closed/inactive, {} invalid, {} malformed",
        report.skipped_not_routable, report.skipped_invalid, report.skipped_malformed
    );
    println!(
        "Segments:   {} extracted ({} zero-length dropped)",
        report.segments_extracted, report.degenerate_segments
    );
    println!("Splits:     {}", report.splits);
    println!("Stitches:   {}", report.stitches);
    println!("Merged:     {} clusters", report.merged_clusters);
    println!("Graph:      {} nodes, {} edges", graph.node_count(), graph.edge_count());

    let isolated = graph.nodes().filter(|(id, _)| graph.degree(*id) == 0).count();
    if isolated > 0 {
        println!("Warning:    {isolated} isolated node(s)");
    }
    Ok(())
}

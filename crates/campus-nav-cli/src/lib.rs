//! Campus navigation CLI - command line tools around `campus-nav-core`.
//!
//! Binaries:
//! - campus-route: route between two coordinates and print the guidance
//! - campus-walk: simulate a walker and print live proximity announcements
//! - campus-graph: build the footway graph and print its build report

pub mod announcer;
pub mod config;
pub mod feed;
pub mod sim;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the fmt subscriber with `RUST_LOG` filtering on top of a
/// crate-level default.
pub fn init_tracing(default_directive: &str) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_directive.parse()?),
        )
        .try_init()?;
    Ok(())
}

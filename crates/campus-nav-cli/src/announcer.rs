//! Periodic proximity check against the live position feed.
//!
//! Runs in the background, comparing the latest position with the route's
//! trigger points on every tick and forwarding any match.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::interval;

use campus_nav_core::{LatLon, ProximityAnnouncer};

/// One instruction re-emitted because the walker is near its trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Announcement {
    pub index: usize,
    pub text: String,
    pub position: LatLon,
    pub at: DateTime<Utc>,
}

/// Shortest tick the loop will run at.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Start the announcer loop.
///
/// Ends on shutdown, or once nobody is listening for announcements. A zero
/// `period` runs at [`MIN_PERIOD`].
pub async fn run_announcer_loop(
    announcer: ProximityAnnouncer,
    period: Duration,
    positions: watch::Receiver<Option<LatLon>>,
    announcements: mpsc::Sender<Announcement>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(period.max(MIN_PERIOD));

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Announcer loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                let Some(position) = *positions.borrow() else {
                    continue;
                };
                let Some((index, instruction)) = announcer.check(position) else {
                    continue;
                };

                tracing::debug!(index, %position, "Walker near instruction trigger");
                let announcement = Announcement {
                    index,
                    text: instruction.text.clone(),
                    position,
                    at: Utc::now(),
                };
                if announcements.send(announcement).await.is_err() {
                    tracing::info!("Announcement receiver dropped; stopping announcer");
                    break;
                }
            }
        }
    }
}

//! Routing outcomes surfaced to callers.

use serde::Serialize;
use thiserror::Error;

use crate::geometry::LatLon;
use crate::graph::NodeId;

/// Failure of a routing request. Every variant has a graceful fallback in
/// [`crate::route::guide`].
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteError {
    #[error("no open footways are available for routing")]
    EmptyGraph,

    #[error("{point} is not a valid coordinate")]
    InvalidCoordinate { point: LatLon },

    #[error("{point} is {distance_m:.1} m from the nearest footway (limit {max_m:.1} m)")]
    SnapOutOfRange {
        point: LatLon,
        distance_m: f64,
        max_m: f64,
    },

    #[error("no footway path connects {start} and {goal}")]
    NoPathFound { start: NodeId, goal: NodeId },
}

/// Why a footway record did not contribute to the graph. Never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    #[error("footway is closed or inactive")]
    NotRoutable,
    #[error("footway geometry type is not a line string")]
    UnsupportedGeometry,
    #[error("footway has no part with at least two vertices")]
    TooFewVertices,
    #[error("footway has a non-finite or out-of-range coordinate")]
    NonFiniteCoordinate,
    #[error("footway record could not be read from the feed")]
    MalformedRecord,
}

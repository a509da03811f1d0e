//! Snap resolver: maps free coordinates onto the routing graph.
//!
//! The shared base graph is never mutated. Synthetic nodes are spliced into a
//! per-query copy that is only made once a projection is actually needed.

use serde::Serialize;
use std::borrow::Cow;

use crate::config::SnapConfig;
use crate::error::RouteError;
use crate::geometry::{project_point_to_segment, LatLon, Projection};
use crate::graph::{NodeId, RoutingGraph, Segment};
use crate::models::Entrance;

/// How a coordinate was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapKind {
    /// An existing node was close enough to use directly.
    Node,
    /// The point was projected onto an edge at parameter `t`.
    Projected { t: f64 },
}

/// Result of snapping one coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Snapped {
    pub node: NodeId,
    pub position: LatLon,
    /// Distance from the requested coordinate to `position`.
    pub offset_m: f64,
    pub kind: SnapKind,
}

/// Closest existing node within `max_radius_m`, by linear scan.
pub fn nearest_node_if_close(
    point: LatLon,
    graph: &RoutingGraph,
    max_radius_m: f64,
) -> Option<NodeId> {
    closest_node(point, graph, max_radius_m).map(|snapped| snapped.node)
}

fn closest_node(point: LatLon, graph: &RoutingGraph, max_radius_m: f64) -> Option<Snapped> {
    graph
        .nodes()
        .map(|(node, position)| Snapped {
            node,
            position,
            offset_m: point.distance_m(&position),
            kind: SnapKind::Node,
        })
        .filter(|snapped| snapped.offset_m <= max_radius_m)
        .min_by(|a, b| a.offset_m.total_cmp(&b.offset_m))
}

/// Globally nearest edge to `point` and the projection onto it.
pub fn nearest_segment(point: LatLon, graph: &RoutingGraph) -> Option<(Segment, Projection)> {
    graph
        .segments()
        .map(|segment| (segment, project_point_to_segment(point, segment.a, segment.b)))
        .min_by(|a, b| a.1.distance_m.total_cmp(&b.1.distance_m))
}

/// Graph view for one routing query.
///
/// Borrows the base graph until the first projection, then owns a deep copy
/// that carries the synthetic nodes. Dropping it discards them.
#[derive(Debug, Clone)]
pub struct QueryGraph<'a> {
    graph: Cow<'a, RoutingGraph>,
    injected: Vec<NodeId>,
}

impl<'a> QueryGraph<'a> {
    pub fn new(base: &'a RoutingGraph) -> Self {
        Self {
            graph: Cow::Borrowed(base),
            injected: Vec::new(),
        }
    }

    pub fn graph(&self) -> &RoutingGraph {
        &self.graph
    }

    /// Synthetic nodes spliced in by this query, in snap order.
    pub fn injected(&self) -> &[NodeId] {
        &self.injected
    }

    /// True once the base graph has been copied.
    pub fn is_detached(&self) -> bool {
        matches!(self.graph, Cow::Owned(_))
    }

    /// Resolve `point` to a node of this query graph.
    ///
    /// A nearby existing node wins. Otherwise the point is projected onto the
    /// nearest edge, which is split at the projection in the query copy.
    pub fn snap(&mut self, point: LatLon, config: &SnapConfig) -> Result<Snapped, RouteError> {
        if !point.is_valid() {
            return Err(RouteError::InvalidCoordinate { point });
        }
        if self.graph.is_empty() {
            return Err(RouteError::EmptyGraph);
        }

        if let Some(snapped) = closest_node(point, &self.graph, config.node_snap_radius_m) {
            return Ok(snapped);
        }

        let Some((segment, projection)) = nearest_segment(point, &self.graph) else {
            return Err(RouteError::EmptyGraph);
        };
        if projection.distance_m > config.max_snap_distance_m {
            return Err(RouteError::SnapOutOfRange {
                point,
                distance_m: projection.distance_m,
                max_m: config.max_snap_distance_m,
            });
        }

        let node = NodeId::from_lat_lon(projection.point);
        if let Some(position) = self.graph.position(node) {
            // Projection fell on an endpoint (or rounds onto one).
            return Ok(Snapped {
                node,
                position,
                offset_m: point.distance_m(&position),
                kind: SnapKind::Node,
            });
        }

        let graph = self.graph.to_mut();
        graph.insert_node(node, projection.point);
        graph.remove_edge(segment.a_id, segment.b_id);
        graph.add_edge(segment.a_id, node);
        graph.add_edge(node, segment.b_id);
        self.injected.push(node);

        tracing::debug!(
            %node,
            from = %segment.a_id,
            to = %segment.b_id,
            offset_m = projection.distance_m,
            "Spliced snap node into query graph"
        );

        Ok(Snapped {
            node,
            position: projection.point,
            offset_m: projection.distance_m,
            kind: SnapKind::Projected { t: projection.t },
        })
    }
}

/// Snap a single coordinate, returning the query graph it is valid in.
pub fn snap<'a>(
    point: LatLon,
    graph: &'a RoutingGraph,
    config: &SnapConfig,
) -> Result<(QueryGraph<'a>, Snapped), RouteError> {
    let mut query = QueryGraph::new(graph);
    let snapped = query.snap(point, config)?;
    Ok((query, snapped))
}

/// Replace a destination that is out of snapping range with the nearest
/// entrance that is in range. Returns `destination` unchanged when it is
/// already routable, is not a valid coordinate, or no entrance qualifies.
pub fn substitute_entrance(
    graph: &RoutingGraph,
    destination: LatLon,
    entrances: &[Entrance],
    config: &SnapConfig,
) -> LatLon {
    if !destination.is_valid() {
        return destination;
    }
    let in_range = |point: LatLon| {
        nearest_segment(point, graph)
            .is_some_and(|(_, projection)| projection.distance_m <= config.max_snap_distance_m)
    };
    if in_range(destination) {
        return destination;
    }

    let substitute = entrances
        .iter()
        .map(Entrance::position)
        .filter(|position| position.is_valid() && in_range(*position))
        .min_by(|a, b| {
            destination
                .distance_m(a)
                .total_cmp(&destination.distance_m(b))
        });

    match substitute {
        Some(entrance) => {
            tracing::debug!(%destination, %entrance, "Substituting nearest entrance for destination");
            entrance
        }
        None => destination,
    }
}

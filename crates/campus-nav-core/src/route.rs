//! The composed routing pipeline: snap both ends, search, generate guidance.

use serde::Serialize;

use crate::config::RoutingConfig;
use crate::error::RouteError;
use crate::geometry::LatLon;
use crate::graph::RoutingGraph;
use crate::instructions::{generate_instructions, straight_line_instruction, Instruction};
use crate::models::Entrance;
use crate::search::find_path;
use crate::snap::{substitute_entrance, QueryGraph, Snapped};

/// A successfully routed walk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub polyline: Vec<LatLon>,
    pub instructions: Vec<Instruction>,
    pub start: Snapped,
    pub goal: Snapped,
    pub length_m: f64,
    /// Search cost, including turn penalties.
    pub cost: f64,
    pub nodes_visited: usize,
}

impl Route {
    pub fn instruction_texts(&self) -> Vec<String> {
        self.instructions.iter().map(|i| i.text.clone()).collect()
    }

    /// One trigger per instruction, in the same order.
    pub fn triggers(&self) -> Vec<LatLon> {
        self.instructions.iter().map(|i| i.trigger).collect()
    }
}

/// Route from `from` to `to` over `graph`.
///
/// Synthetic snap nodes live in a query-local copy; `graph` is left untouched.
pub fn route(
    graph: &RoutingGraph,
    from: LatLon,
    to: LatLon,
    config: &RoutingConfig,
) -> Result<Route, RouteError> {
    for point in [from, to] {
        if !point.is_valid() {
            return Err(RouteError::InvalidCoordinate { point });
        }
    }
    if graph.is_empty() {
        return Err(RouteError::EmptyGraph);
    }

    let mut query = QueryGraph::new(graph);
    let start = query.snap(from, &config.snap)?;
    let goal = query.snap(to, &config.snap)?;

    let path = find_path(query.graph(), start.node, goal.node, &config.search).ok_or(
        RouteError::NoPathFound {
            start: start.node,
            goal: goal.node,
        },
    )?;

    let polyline = query.graph().polyline(&path.nodes);
    let instructions = generate_instructions(&polyline, to, &config.guidance);

    tracing::debug!(
        %from,
        %to,
        hops = path.nodes.len().saturating_sub(1),
        length_m = path.length_m,
        nodes_visited = path.nodes_visited,
        "Route found"
    );

    Ok(Route {
        polyline,
        instructions,
        start,
        goal,
        length_m: path.length_m,
        cost: path.cost,
        nodes_visited: path.nodes_visited,
    })
}

/// What the walker is told, whether or not a graph route exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Guidance {
    pub polyline: Vec<LatLon>,
    /// Never empty.
    pub instructions: Vec<Instruction>,
    pub length_m: f64,
    /// Set when the guidance is the straight-line fallback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<RouteError>,
}

impl Guidance {
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn instruction_texts(&self) -> Vec<String> {
        self.instructions.iter().map(|i| i.text.clone()).collect()
    }

    pub fn triggers(&self) -> Vec<LatLon> {
        self.instructions.iter().map(|i| i.trigger).collect()
    }

    fn straight_line(from: LatLon, to: LatLon, cause: RouteError) -> Self {
        let instruction = straight_line_instruction(from, to);
        Self {
            polyline: [from, to].into_iter().filter(LatLon::is_valid).collect(),
            length_m: instruction.distance_m.unwrap_or_default(),
            instructions: vec![instruction],
            fallback: Some(cause),
        }
    }
}

impl From<Route> for Guidance {
    fn from(route: Route) -> Self {
        Self {
            polyline: route.polyline,
            instructions: route.instructions,
            length_m: route.length_m,
            fallback: None,
        }
    }
}

/// Like [`route`], but degrades to a straight-line instruction instead of
/// failing.
pub fn guide(graph: &RoutingGraph, from: LatLon, to: LatLon, config: &RoutingConfig) -> Guidance {
    match route(graph, from, to, config) {
        Ok(route) => route.into(),
        Err(err) => {
            tracing::warn!(%from, %to, error = %err, "Falling back to straight-line guidance");
            Guidance::straight_line(from, to, err)
        }
    }
}

/// [`guide`] to a destination that may sit inside a building: when `to` is
/// out of snapping range, the nearest reachable entrance is used instead.
pub fn guide_with_entrances(
    graph: &RoutingGraph,
    from: LatLon,
    to: LatLon,
    entrances: &[Entrance],
    config: &RoutingConfig,
) -> Guidance {
    let target = substitute_entrance(graph, to, entrances, &config.snap);
    guide(graph, from, target, config)
}

//! Undirected weighted footway graph.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::builder::BuildReport;
use crate::geometry::LatLon;

/// Fixed-point scale used to derive node ids (6 decimal digits, ~0.1 m).
const ID_SCALE: f64 = 1e6;

/// Node identifier derived from the rounded coordinate, so coincident points
/// share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId {
    lat_e6: i64,
    lon_e6: i64,
}

impl NodeId {
    pub fn from_lat_lon(point: LatLon) -> Self {
        Self {
            lat_e6: (point.lat * ID_SCALE).round() as i64,
            lon_e6: (point.lon * ID_SCALE).round() as i64,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.6},{:.6}",
            self.lat_e6 as f64 / ID_SCALE,
            self.lon_e6 as f64 / ID_SCALE
        )
    }
}

/// Directed half of an undirected edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Edge {
    pub to: NodeId,
    pub weight_m: f64,
}

/// Transient straight piece of footway used while building the graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub a: LatLon,
    pub b: LatLon,
    pub a_id: NodeId,
    pub b_id: NodeId,
}

impl Segment {
    pub fn new(a: LatLon, b: LatLon) -> Self {
        Self {
            a,
            b,
            a_id: NodeId::from_lat_lon(a),
            b_id: NodeId::from_lat_lon(b),
        }
    }

    /// Both ends round to the same node.
    pub fn is_degenerate(&self) -> bool {
        self.a_id == self.b_id
    }

    pub fn length_m(&self) -> f64 {
        self.a.distance_m(&self.b)
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.a_id == id || self.b_id == id
    }

    pub fn shares_node(&self, other: &Segment) -> bool {
        self.has_node(other.a_id) || self.has_node(other.b_id)
    }

    pub fn endpoints(&self) -> [(NodeId, LatLon); 2] {
        [(self.a_id, self.a), (self.b_id, self.b)]
    }
}

/// Routing graph: node coordinates plus symmetric adjacency lists.
///
/// Ordered maps keep iteration (and therefore building and searching)
/// deterministic. Cloning produces a fully owned copy.
#[derive(Debug, Clone, Default)]
pub struct RoutingGraph {
    nodes: BTreeMap<NodeId, LatLon>,
    adjacency: BTreeMap<NodeId, Vec<Edge>>,
    report: BuildReport,
}

impl RoutingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum::<usize>() / 2
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn position(&self, id: NodeId) -> Option<LatLon> {
        self.nodes.get(&id).copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, LatLon)> + '_ {
        self.nodes.iter().map(|(id, pos)| (*id, *pos))
    }

    pub fn neighbors(&self, id: NodeId) -> &[Edge] {
        self.adjacency.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn degree(&self, id: NodeId) -> usize {
        self.neighbors(id).len()
    }

    pub fn edge_weight(&self, from: NodeId, to: NodeId) -> Option<f64> {
        self.neighbors(from)
            .iter()
            .find(|edge| edge.to == to)
            .map(|edge| edge.weight_m)
    }

    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.edge_weight(from, to).is_some()
    }

    /// Every directed half-edge as `(from, to, weight)`.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, f64)> + '_ {
        self.adjacency
            .iter()
            .flat_map(|(from, edges)| edges.iter().map(move |edge| (*from, edge.to, edge.weight_m)))
    }

    /// Every undirected edge once, as a segment.
    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.edges()
            .filter(|(from, to, _)| from < to)
            .filter_map(|(from, to, _)| {
                Some(Segment {
                    a: self.position(from)?,
                    b: self.position(to)?,
                    a_id: from,
                    b_id: to,
                })
            })
    }

    /// Coordinates for a node path. Unknown ids are skipped.
    pub fn polyline(&self, path: &[NodeId]) -> Vec<LatLon> {
        path.iter().filter_map(|id| self.position(*id)).collect()
    }

    /// Sum of edge weights along a path, `None` if a hop is not an edge.
    pub fn path_length(&self, path: &[NodeId]) -> Option<f64> {
        path.windows(2)
            .map(|pair| self.edge_weight(pair[0], pair[1]))
            .sum()
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    pub(crate) fn set_report(&mut self, report: BuildReport) {
        self.report = report;
    }

    /// Insert a node unless one with the same id exists.
    pub(crate) fn insert_node(&mut self, id: NodeId, position: LatLon) {
        self.nodes.entry(id).or_insert(position);
        self.adjacency.entry(id).or_default();
    }

    /// Add a symmetric edge weighted by geodesic distance.
    ///
    /// Self-loops, duplicates and edges to unknown nodes are refused.
    pub(crate) fn add_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        if a == b || self.has_edge(a, b) {
            return false;
        }
        let (Some(pa), Some(pb)) = (self.position(a), self.position(b)) else {
            return false;
        };
        let weight_m = pa.distance_m(&pb);
        self.adjacency
            .entry(a)
            .or_default()
            .push(Edge { to: b, weight_m });
        self.adjacency
            .entry(b)
            .or_default()
            .push(Edge { to: a, weight_m });
        true
    }

    pub(crate) fn remove_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        let mut removed = false;
        if let Some(edges) = self.adjacency.get_mut(&a) {
            let before = edges.len();
            edges.retain(|edge| edge.to != b);
            removed |= edges.len() != before;
        }
        if let Some(edges) = self.adjacency.get_mut(&b) {
            edges.retain(|edge| edge.to != a);
        }
        removed
    }
}

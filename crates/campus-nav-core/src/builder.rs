//! Graph builder: turns hand-drawn footway polylines into one connected,
//! deduplicated routing graph.
//!
//! The pipeline runs in a fixed order:
//! 1. segment extraction, one segment per consecutive vertex pair
//! 2. intersection splitting, repeated until a pass makes no change
//! 3. stitching of dangling endpoints that face each other across a gap
//! 4. merging of near-coincident nodes into cluster centroids
//! 5. assembly of the symmetric adjacency lists
//!
//! Every step iterates in a deterministic order, so the same footways always
//! produce the same graph.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::GraphConfig;
use crate::error::SkipReason;
use crate::geometry::{
    meters_to_lat, project_point_to_segment, segment_intersection, unit_vector, LatLon,
};
use crate::graph::{NodeId, RoutingGraph, Segment};
use crate::models::Footway;
use crate::union_find::UnionFind;

/// How many hops back from a dangling end are averaged into its direction.
const DIRECTION_SAMPLE_HOPS: usize = 2;

/// Counters collected while building a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub footways_total: usize,
    pub footways_used: usize,
    pub skipped_not_routable: usize,
    pub skipped_invalid: usize,
    pub skipped_malformed: usize,
    pub segments_extracted: usize,
    pub degenerate_segments: usize,
    pub splits: usize,
    pub stitches: usize,
    pub merged_clusters: usize,
    pub nodes: usize,
    pub edges: usize,
}

/// Build the routing graph from the full footway feed.
///
/// Closed, inactive and malformed footways are skipped. An empty result is a
/// valid graph; routing on it reports [`crate::RouteError::EmptyGraph`].
pub fn build_graph(footways: &[Footway], config: &GraphConfig) -> RoutingGraph {
    let mut report = BuildReport::default();
    let mut segments = extract_segments(footways, &mut report);

    report.splits = split_intersections(&mut segments, config);
    report.stitches = stitch_endpoints(&mut segments, config);
    report.merged_clusters = merge_near_nodes(&mut segments, config);

    let mut graph = assemble(&segments);
    report.nodes = graph.node_count();
    report.edges = graph.edge_count();

    tracing::info!(
        footways = report.footways_used,
        skipped = report.skipped_not_routable + report.skipped_invalid + report.skipped_malformed,
        splits = report.splits,
        stitches = report.stitches,
        merged = report.merged_clusters,
        nodes = report.nodes,
        edges = report.edges,
        "Built footway graph"
    );

    graph.set_report(report);
    graph
}

/// Emit one segment per consecutive vertex pair of every routable footway.
pub fn extract_segments(footways: &[Footway], report: &mut BuildReport) -> Vec<Segment> {
    let mut segments = Vec::new();
    report.footways_total = footways.len();

    for footway in footways {
        if !footway.is_routable() {
            report.skipped_not_routable += 1;
            continue;
        }
        let polylines = match footway.polylines() {
            Ok(polylines) => polylines,
            Err(SkipReason::MalformedRecord) => {
                report.skipped_malformed += 1;
                continue;
            }
            Err(reason) => {
                tracing::warn!(footway = %footway.id, %reason, "Skipping footway");
                report.skipped_invalid += 1;
                continue;
            }
        };

        report.footways_used += 1;
        for polyline in &polylines {
            for pair in polyline.windows(2) {
                let segment = Segment::new(pair[0], pair[1]);
                if segment.is_degenerate() {
                    report.degenerate_segments += 1;
                    continue;
                }
                segments.push(segment);
            }
        }
    }

    report.segments_extracted = segments.len();
    segments
}

#[derive(Debug, Clone, Copy)]
enum Split {
    First(LatLon),
    Second(LatLon),
    Both(LatLon),
}

/// Split segments wherever they cross, or where one ends on the other's
/// interior, until a full pass finds nothing to split.
///
/// Returns the number of segment splits performed.
pub fn split_intersections(segments: &mut Vec<Segment>, config: &GraphConfig) -> usize {
    let tol = config.intersection_tolerance_m;
    let mut total = 0;

    for pass in 1..=config.max_split_passes.max(1) {
        let splits = split_pass(segments, tol);
        tracing::debug!(pass, splits, segments = segments.len(), "Intersection split pass");
        if splits == 0 {
            return total;
        }
        total += splits;
    }

    tracing::warn!(
        passes = config.max_split_passes,
        "Intersection splitting did not reach a fixed point"
    );
    total
}

fn split_pass(segments: &mut Vec<Segment>, tol: f64) -> usize {
    let mut splits = 0;
    let mut i = 0;
    while i < segments.len() {
        let mut j = i + 1;
        while j < segments.len() {
            if let Some(split) = find_split(&segments[i], &segments[j], tol) {
                splits += match split {
                    Split::First(at) => usize::from(split_segment(segments, i, at)),
                    Split::Second(at) => usize::from(split_segment(segments, j, at)),
                    Split::Both(at) => {
                        usize::from(split_segment(segments, i, at))
                            + usize::from(split_segment(segments, j, at))
                    }
                };
            }
            j += 1;
        }
        i += 1;
    }
    splits
}

fn find_split(s: &Segment, o: &Segment, tol: f64) -> Option<Split> {
    if s.shares_node(o) {
        return None;
    }

    if let Some(p) = segment_intersection(s.a, s.b, o.a, o.b) {
        return match (near_endpoint(s, p, tol), near_endpoint(o, p, tol)) {
            (None, None) => Some(Split::Both(p)),
            // One segment ends at the crossing: split the other at that end so
            // both share the existing node.
            (Some(end), None) => interior_point(o, end, tol).map(Split::Second),
            (None, Some(end)) => interior_point(s, end, tol).map(Split::First),
            (Some(_), Some(_)) => None,
        };
    }

    // Near miss: a footway drawn to stop just short of another one.
    for (_, end) in s.endpoints() {
        if let Some(at) = interior_point(o, end, tol) {
            return Some(Split::Second(at));
        }
    }
    for (_, end) in o.endpoints() {
        if let Some(at) = interior_point(s, end, tol) {
            return Some(Split::First(at));
        }
    }
    None
}

fn near_endpoint(segment: &Segment, point: LatLon, tol: f64) -> Option<LatLon> {
    let da = segment.a.distance_m(&point);
    let db = segment.b.distance_m(&point);
    if da.min(db) > tol {
        None
    } else if da <= db {
        Some(segment.a)
    } else {
        Some(segment.b)
    }
}

/// `point` if it lies within `tol` of the segment but not within `tol` of
/// either of its ends.
fn interior_point(segment: &Segment, point: LatLon, tol: f64) -> Option<LatLon> {
    let projection = project_point_to_segment(point, segment.a, segment.b);
    if projection.distance_m > tol {
        return None;
    }
    if point.distance_m(&segment.a) <= tol || point.distance_m(&segment.b) <= tol {
        return None;
    }
    Some(point)
}

fn split_segment(segments: &mut Vec<Segment>, index: usize, at: LatLon) -> bool {
    let segment = segments[index];
    let head = Segment::new(segment.a, at);
    let tail = Segment::new(at, segment.b);
    if head.is_degenerate() || tail.is_degenerate() {
        return false;
    }
    segments[index] = head;
    segments.push(tail);
    true
}

/// Endpoint adjacency derived from a segment list.
struct Topology {
    positions: BTreeMap<NodeId, LatLon>,
    neighbors: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl Topology {
    fn from_segments(segments: &[Segment]) -> Self {
        let mut positions = BTreeMap::new();
        let mut neighbors: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
        for segment in segments {
            positions.entry(segment.a_id).or_insert(segment.a);
            positions.entry(segment.b_id).or_insert(segment.b);
            neighbors.entry(segment.a_id).or_default().insert(segment.b_id);
            neighbors.entry(segment.b_id).or_default().insert(segment.a_id);
        }
        Self {
            positions,
            neighbors,
        }
    }

    fn degree(&self, id: NodeId) -> usize {
        self.neighbors.get(&id).map_or(0, BTreeSet::len)
    }

    fn connected(&self, a: NodeId, b: NodeId) -> bool {
        self.neighbors.get(&a).is_some_and(|set| set.contains(&b))
    }

    /// Outward travel direction at a dangling end: the normalised sum of the
    /// unit directions of the last few segments leading into it.
    fn travel_direction(&self, end: NodeId) -> Option<(f64, f64)> {
        let mut sum = (0.0, 0.0);
        let mut current = end;
        let mut previous: Option<NodeId> = None;

        for _ in 0..DIRECTION_SAMPLE_HOPS {
            let next = self
                .neighbors
                .get(&current)?
                .iter()
                .copied()
                .find(|id| Some(*id) != previous)?;
            if let Some((x, y)) = unit_vector(self.positions[&next], self.positions[&current]) {
                sum.0 += x;
                sum.1 += y;
            }
            // Only keep walking through simple pass-through nodes.
            if self.degree(next) != 2 {
                break;
            }
            previous = Some(current);
            current = next;
        }

        let norm = sum.0.hypot(sum.1);
        (norm > f64::EPSILON).then(|| (sum.0 / norm, sum.1 / norm))
    }
}

struct DanglingEnd {
    id: NodeId,
    position: LatLon,
    direction: (f64, f64),
}

/// Bridge small digitisation gaps between dangling endpoints that point at
/// each other.
///
/// Each dangling end is joined to at most its nearest plausible partner.
/// Returns the number of connecting segments added.
pub fn stitch_endpoints(segments: &mut Vec<Segment>, config: &GraphConfig) -> usize {
    let topology = Topology::from_segments(segments);
    let cos_tol = config.connect_angle_tolerance_deg.to_radians().cos();

    let ends: Vec<DanglingEnd> = topology
        .positions
        .iter()
        .filter(|(id, _)| topology.degree(**id) == 1)
        .filter_map(|(id, position)| {
            Some(DanglingEnd {
                id: *id,
                position: *position,
                direction: topology.travel_direction(*id)?,
            })
        })
        .collect();

    let mut added = BTreeSet::new();
    let mut stitches = Vec::new();
    for (i, end) in ends.iter().enumerate() {
        let mut best: Option<(f64, usize)> = None;
        for (j, other) in ends.iter().enumerate() {
            if i == j || end.id == other.id || topology.connected(end.id, other.id) {
                continue;
            }
            let gap = end.position.distance_m(&other.position);
            if gap > config.connect_tolerance_m || !facing(end, other, cos_tol) {
                continue;
            }
            if best.map_or(true, |(best_gap, _)| gap < best_gap) {
                best = Some((gap, j));
            }
        }

        let Some((gap, j)) = best else {
            continue;
        };
        let other = &ends[j];
        let key = (end.id.min(other.id), end.id.max(other.id));
        if added.insert(key) {
            tracing::debug!(from = %end.id, to = %other.id, gap_m = gap, "Stitching footway gap");
            stitches.push(Segment::new(end.position, other.position));
        }
    }

    let count = stitches.len();
    segments.extend(stitches);
    count
}

fn facing(end: &DanglingEnd, other: &DanglingEnd, cos_tol: f64) -> bool {
    let dot = |a: (f64, f64), b: (f64, f64)| a.0 * b.0 + a.1 * b.1;
    let (Some(towards_other), Some(towards_end)) = (
        unit_vector(end.position, other.position),
        unit_vector(other.position, end.position),
    ) else {
        return false;
    };
    dot(end.direction, towards_other) >= cos_tol && dot(other.direction, towards_end) >= cos_tol
}

/// Collapse endpoints within the merge tolerance of each other into their
/// centroid, then drop the self-loops and duplicates this creates.
///
/// Returns the number of multi-node clusters merged.
pub fn merge_near_nodes(segments: &mut Vec<Segment>, config: &GraphConfig) -> usize {
    let tol = config.merge_tolerance_m;
    let mut points: Vec<(NodeId, LatLon)> = Topology::from_segments(segments)
        .positions
        .into_iter()
        .collect();
    points.sort_by(|a, b| a.1.lat.total_cmp(&b.1.lat).then(a.0.cmp(&b.0)));

    // Degrees of latitude per meter are largest at the equator.
    let lat_window = meters_to_lat(tol, 0.0);
    let mut sets = UnionFind::new(points.len());
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            if points[j].1.lat - points[i].1.lat > lat_window {
                break;
            }
            if points[i].1.distance_m(&points[j].1) <= tol {
                sets.union(i, j);
            }
        }
    }

    let mut clusters: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for index in 0..points.len() {
        clusters.entry(sets.find(index)).or_default().push(index);
    }

    let mut remap: BTreeMap<NodeId, LatLon> = BTreeMap::new();
    let mut merged = 0;
    for members in clusters.values().filter(|members| members.len() > 1) {
        let n = members.len() as f64;
        let centroid = LatLon::new(
            members.iter().map(|&m| points[m].1.lat).sum::<f64>() / n,
            members.iter().map(|&m| points[m].1.lon).sum::<f64>() / n,
        );
        for &member in members {
            remap.insert(points[member].0, centroid);
        }
        merged += 1;
    }

    if merged == 0 {
        return 0;
    }

    let mut seen = BTreeSet::new();
    let rewritten: Vec<Segment> = segments
        .iter()
        .map(|segment| {
            Segment::new(
                remap.get(&segment.a_id).copied().unwrap_or(segment.a),
                remap.get(&segment.b_id).copied().unwrap_or(segment.b),
            )
        })
        .filter(|segment| !segment.is_degenerate())
        .filter(|segment| seen.insert((segment.a_id.min(segment.b_id), segment.a_id.max(segment.b_id))))
        .collect();

    tracing::debug!(
        clusters = merged,
        before = segments.len(),
        after = rewritten.len(),
        "Merged near-coincident nodes"
    );
    *segments = rewritten;
    merged
}

fn assemble(segments: &[Segment]) -> RoutingGraph {
    let mut graph = RoutingGraph::new();
    for segment in segments.iter().filter(|segment| !segment.is_degenerate()) {
        graph.insert_node(segment.a_id, segment.a);
        graph.insert_node(segment.b_id, segment.b);
        graph.add_edge(segment.a_id, segment.b_id);
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::offset_position;
    use crate::models::FootwayState;

    const BASE: LatLon = LatLon::new(33.6405, -117.8443);

    fn at(north_m: f64, east_m: f64) -> LatLon {
        offset_position(BASE, north_m, east_m)
    }

    fn footway(id: &str, points: &[(f64, f64)]) -> Footway {
        let points: Vec<LatLon> = points.iter().map(|(n, e)| at(*n, *e)).collect();
        Footway::open(id, &points)
    }

    fn nearest_node(graph: &RoutingGraph, point: LatLon) -> (NodeId, f64) {
        graph
            .nodes()
            .map(|(id, pos)| (id, pos.distance_m(&point)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap()
    }

    #[test]
    fn crossing_footways_share_a_degree_four_node() {
        let footways = vec![
            footway("ns", &[(0.0, 0.0), (100.0, 0.0)]),
            footway("ew", &[(50.0, -50.0), (50.0, 50.0)]),
        ];
        let graph = build_graph(&footways, &GraphConfig::default());

        let (center, offset) = nearest_node(&graph, at(50.0, 0.0));
        assert!(offset < 0.5, "crossing node is {offset} m away");
        assert_eq!(graph.degree(center), 4);
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.report().splits, 2);
    }

    #[test]
    fn split_pass_reaches_a_fixed_point() {
        let config = GraphConfig::default();
        let footways = vec![
            footway("a", &[(0.0, 0.0), (100.0, 0.0)]),
            footway("b", &[(50.0, -50.0), (50.0, 50.0)]),
            footway("c", &[(0.0, -40.0), (100.0, 40.0)]),
        ];
        let mut report = BuildReport::default();
        let mut segments = extract_segments(&footways, &mut report);
        assert!(split_intersections(&mut segments, &config) > 0);

        let settled = segments.clone();
        assert_eq!(split_intersections(&mut segments, &config), 0);
        assert_eq!(segments, settled);
    }

    #[test]
    fn footway_ending_on_another_splits_it() {
        // "b" stops 1 m short of the middle of "a".
        let footways = vec![
            footway("a", &[(0.0, 0.0), (100.0, 0.0)]),
            footway("b", &[(50.0, 40.0), (50.0, 1.0)]),
        ];
        let graph = build_graph(&footways, &GraphConfig::default());
        let (junction, _) = nearest_node(&graph, at(50.0, 1.0));
        assert_eq!(graph.degree(junction), 3);
    }

    #[test]
    fn aligned_gap_is_stitched() {
        let footways = vec![
            footway("a", &[(0.0, 0.0), (50.0, 0.0)]),
            footway("b", &[(62.0, 0.0), (120.0, 0.0)]),
        ];
        let graph = build_graph(&footways, &GraphConfig::default());
        assert_eq!(graph.report().stitches, 1);
        let (a_end, _) = nearest_node(&graph, at(50.0, 0.0));
        let (b_start, _) = nearest_node(&graph, at(62.0, 0.0));
        assert!(graph.has_edge(a_end, b_start));
    }

    #[test]
    fn side_by_side_ends_are_not_stitched() {
        // Two parallel paths ending next to each other point the same way,
        // not at each other.
        let footways = vec![
            footway("a", &[(0.0, 0.0), (50.0, 0.0)]),
            footway("b", &[(0.0, 10.0), (50.0, 10.0)]),
        ];
        let graph = build_graph(&footways, &GraphConfig::default());
        assert_eq!(graph.report().stitches, 0);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn gap_beyond_tolerance_is_not_stitched() {
        let footways = vec![
            footway("a", &[(0.0, 0.0), (50.0, 0.0)]),
            footway("b", &[(80.0, 0.0), (120.0, 0.0)]),
        ];
        let graph = build_graph(&footways, &GraphConfig::default());
        assert_eq!(graph.report().stitches, 0);
    }

    #[test]
    fn near_coincident_ends_merge_into_one_node() {
        let footways = vec![
            footway("a", &[(0.0, 0.0), (50.0, 0.0)]),
            footway("b", &[(50.0, 1.5), (50.0, 60.0)]),
        ];
        let graph = build_graph(&footways, &GraphConfig::default());
        assert_eq!(graph.report().merged_clusters, 1);
        assert_eq!(graph.node_count(), 3);
        let (corner, _) = nearest_node(&graph, at(50.0, 0.75));
        assert_eq!(graph.degree(corner), 2);
        for (id, _) in graph.nodes() {
            assert!(!graph.has_edge(id, id));
        }
    }

    #[test]
    fn closed_inactive_and_short_footways_are_skipped() {
        let mut closed = footway("closed", &[(0.0, 0.0), (50.0, 0.0)]);
        closed.state = FootwayState::Closed;
        let mut inactive = footway("inactive", &[(0.0, 10.0), (50.0, 10.0)]);
        inactive.active = false;
        let short = footway("short", &[(0.0, 20.0)]);

        let graph = build_graph(&[closed, inactive, short], &GraphConfig::default());
        assert!(graph.is_empty());
        assert_eq!(graph.report().skipped_not_routable, 2);
        assert_eq!(graph.report().skipped_invalid, 1);
    }

    #[test]
    fn malformed_records_are_counted_and_the_rest_builds() {
        let json = r#"[
            {"id": "good", "geometry": {"type": "LineString",
             "coordinates": [[-117.8427, 33.6461, 4.0], [-117.8427, 33.6466, 4.0]]}},
            {"id": "bad", "geometry": {"type": "LineString", "coordinates": "nope"}},
            {"id": "repair", "state": "under_repair", "geometry": {"type": "LineString",
             "coordinates": [[-117.8430, 33.6461], [-117.8430, 33.6466]]}}
        ]"#;
        let footways = crate::models::parse_footways(json).unwrap();
        let graph = build_graph(&footways, &GraphConfig::default());
        let report = graph.report();
        assert_eq!(report.footways_total, 3);
        assert_eq!(report.footways_used, 1);
        assert_eq!(report.skipped_malformed, 1);
        assert_eq!(report.skipped_not_routable, 1);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn repeated_vertices_do_not_create_self_loops() {
        let footways = vec![footway("a", &[(0.0, 0.0), (0.0, 0.0), (30.0, 0.0)])];
        let graph = build_graph(&footways, &GraphConfig::default());
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.report().degenerate_segments, 1);
    }

    #[test]
    fn empty_feed_builds_empty_graph() {
        let graph = build_graph(&[], &GraphConfig::default());
        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
    }
}

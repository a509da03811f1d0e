//! End-to-end routing scenarios and graph-wide properties.
//!
//! Every fixture is laid out in meters north/east of a fixed campus origin.

use campus_nav_core::builder::{extract_segments, split_intersections};
use campus_nav_core::geometry::offset_position;
use campus_nav_core::{
    build_graph, check_proximity, guide, route, snap, BuildReport, Footway, GraphConfig,
    InstructionKind, LatLon, RouteError, RoutingConfig, RoutingGraph, Side, SnapConfig, SnapKind,
};

const ORIGIN: LatLon = LatLon::new(33.6461, -117.8427);

fn at(north_m: f64, east_m: f64) -> LatLon {
    offset_position(ORIGIN, north_m, east_m)
}

fn footway(id: &str, points: &[(f64, f64)]) -> Footway {
    let points: Vec<LatLon> = points.iter().map(|(n, e)| at(*n, *e)).collect();
    Footway::open(id, &points)
}

/// Three by three grid of crossing walks with overhanging ends, a diagonal
/// shortcut, and a short spur that ends on the middle of a walk.
fn campus() -> Vec<Footway> {
    let mut footways = Vec::new();
    for (i, line) in [0.0, 80.0, 160.0].into_iter().enumerate() {
        footways.push(footway(&format!("row-{i}"), &[(line, -20.0), (line, 180.0)]));
        footways.push(footway(&format!("col-{i}"), &[(-20.0, line), (180.0, line)]));
    }
    footways.push(footway("diagonal", &[(0.0, 0.0), (80.0, 80.0)]));
    footways.push(footway("spur", &[(120.0, 160.0), (120.0, 220.0)]));
    footways
}

fn campus_graph() -> RoutingGraph {
    build_graph(&campus(), &GraphConfig::default())
}

fn east_of_origin_m(point: LatLon) -> f64 {
    (point.lon - ORIGIN.lon).abs() * 111_320.0 * ORIGIN.lat.to_radians().cos()
}

#[test]
fn test_edges_are_symmetric() {
    let graph = campus_graph();
    assert!(graph.edge_count() > 0);
    for (a, b, weight) in graph.edges() {
        assert_eq!(graph.edge_weight(b, a), Some(weight), "edge {a} -> {b}");
    }
}

#[test]
fn test_no_self_loops() {
    let graph = campus_graph();
    for (a, b, _) in graph.edges() {
        assert_ne!(a, b);
    }
}

#[test]
fn test_build_is_deterministic() {
    let first = campus_graph();
    let second = campus_graph();
    assert_eq!(
        first.nodes().collect::<Vec<_>>(),
        second.nodes().collect::<Vec<_>>()
    );
    assert_eq!(
        first.edges().collect::<Vec<_>>(),
        second.edges().collect::<Vec<_>>()
    );
    assert_eq!(first.report(), second.report());
}

#[test]
fn test_split_pass_is_idempotent() {
    let config = GraphConfig::default();
    let mut segments = extract_segments(&campus(), &mut BuildReport::default());
    assert!(split_intersections(&mut segments, &config) > 0);

    let settled = segments.clone();
    assert_eq!(split_intersections(&mut segments, &config), 0);
    assert_eq!(segments, settled);
}

#[test]
fn test_snapping_a_node_coordinate_returns_that_node() {
    let graph = campus_graph();
    for (id, position) in graph.nodes() {
        let (query, snapped) = snap(position, &graph, &SnapConfig::default()).unwrap();
        assert_eq!(snapped.node, id);
        assert_eq!(snapped.kind, SnapKind::Node);
        assert!(!query.is_detached());
    }
}

#[test]
fn test_route_length_respects_triangle_inequality() {
    let graph = campus_graph();
    let config = RoutingConfig::default();
    let queries = [
        (at(5.0, 3.0), at(155.0, 158.0)),
        (at(-15.0, 80.0), at(120.0, 210.0)),
        (at(40.0, 42.0), at(160.0, 20.0)),
        (at(90.0, -15.0), at(10.0, 170.0)),
    ];
    for (from, to) in queries {
        let route = route(&graph, from, to, &config).unwrap();
        let first = route.polyline[0];
        let last = route.polyline[route.polyline.len() - 1];
        assert!(route.length_m + 1e-6 >= first.distance_m(&last));
        assert!(route.cost + 1e-6 >= route.length_m);
    }
}

#[test]
fn test_two_crossing_footways_meet_in_a_degree_four_node() {
    // A runs (0,0)->(0,10) and B runs (-5,5)->(5,5), scaled to 10 m units.
    let graph = build_graph(
        &[
            footway("a", &[(0.0, 0.0), (100.0, 0.0)]),
            footway("b", &[(50.0, -50.0), (50.0, 50.0)]),
        ],
        &GraphConfig::default(),
    );

    let crossing = at(50.0, 0.0);
    let (hub, position) = graph
        .nodes()
        .min_by(|a, b| crossing.distance_m(&a.1).total_cmp(&crossing.distance_m(&b.1)))
        .unwrap();
    assert!(crossing.distance_m(&position) < 0.5);
    assert_eq!(graph.degree(hub), 4);
    assert_eq!(graph.node_count(), 5);
    assert_eq!(graph.edge_count(), 4);
}

#[test]
fn test_small_gap_is_stitched_without_detour() {
    // B starts 0.00012 degrees of latitude (about 13 m) past A's end and
    // carries on in the same direction. A third, unrelated walk runs
    // alongside at a distance.
    let a_end = ORIGIN;
    let b_start = LatLon::new(ORIGIN.lat + 0.000_12, ORIGIN.lon);
    let footways = vec![
        Footway::open("a", &[at(-100.0, 0.0), a_end]),
        Footway::open("b", &[b_start, offset_position(b_start, 100.0, 0.0)]),
        footway("unrelated", &[(-100.0, 40.0), (100.0, 40.0)]),
    ];
    let graph = build_graph(&footways, &GraphConfig::default());
    assert_eq!(graph.report().stitches, 1);

    let from = at(-60.0, 2.0);
    let to = offset_position(b_start, 60.0, -2.0);
    let route = route(&graph, from, to, &RoutingConfig::default()).unwrap();

    let gap = a_end.distance_m(&b_start);
    assert!((gap - 13.3).abs() < 0.2, "gap was {gap}");
    assert!((route.length_m - (60.0 + gap + 60.0)).abs() < 1.0);
    for point in &route.polyline {
        assert!(east_of_origin_m(*point) < 0.5, "route left the stitched walk");
    }
}

#[test]
fn test_disconnected_islands_fall_back_to_straight_line() {
    let graph = build_graph(
        &[
            footway("west", &[(0.0, 0.0), (100.0, 0.0)]),
            footway("east", &[(0.0, 150.0), (100.0, 150.0)]),
        ],
        &GraphConfig::default(),
    );
    let config = RoutingConfig::default();
    let from = at(50.0, 4.0);
    let to = at(50.0, 146.0);

    let err = route(&graph, from, to, &config).unwrap_err();
    assert!(matches!(err, RouteError::NoPathFound { .. }));

    let guidance = guide(&graph, from, to, &config);
    assert_eq!(guidance.fallback, Some(err));
    assert_eq!(guidance.instructions.len(), 1);
    let instruction = &guidance.instructions[0];
    assert_eq!(instruction.kind, InstructionKind::StraightLine);
    assert_eq!(instruction.trigger, to);
    let stated = instruction.distance_m.unwrap();
    assert!((stated - from.distance_m(&to)).abs() < 1e-9);
    assert!(instruction.text.contains(&format!("{stated:.0} m")));
}

#[test]
fn test_north_then_east_is_a_right_turn() {
    let graph = build_graph(
        &[footway("l", &[(0.0, 0.0), (80.0, 0.0), (80.0, 60.0)])],
        &GraphConfig::default(),
    );
    let route = route(&graph, at(0.0, 0.0), at(80.0, 60.0), &RoutingConfig::default()).unwrap();
    assert_eq!(route.instructions[0].kind, InstructionKind::Turn(Side::Right));
    assert_eq!(route.instructions[0].text, "In 80 m, turn right.");
    assert_eq!(route.instructions[1].text, "Continue 60 m to the entrance.");
}

#[test]
fn test_north_then_west_is_a_left_turn() {
    let graph = build_graph(
        &[footway("l", &[(0.0, 0.0), (80.0, 0.0), (80.0, -60.0)])],
        &GraphConfig::default(),
    );
    let route = route(&graph, at(0.0, 0.0), at(80.0, -60.0), &RoutingConfig::default()).unwrap();
    assert_eq!(route.instructions[0].kind, InstructionKind::Turn(Side::Left));
    assert_eq!(route.instructions[0].text, "In 80 m, turn left.");
}

#[test]
fn test_route_triggers_drive_proximity_checks() {
    let graph = campus_graph();
    let config = RoutingConfig::default();
    let route = route(&graph, at(-10.0, 160.0), at(160.0, 100.0), &config).unwrap();

    let texts = route.instruction_texts();
    let triggers = route.triggers();
    assert_eq!(texts.len(), triggers.len());

    let first_turn = triggers[0];
    let near = offset_position(first_turn, -10.0, 0.0);
    assert_eq!(
        check_proximity(near, &triggers, &texts, config.guidance.proximity_radius_m),
        Some(texts[0].as_str())
    );
    assert_eq!(
        check_proximity(at(-10.0, 160.0), &triggers, &texts, config.guidance.proximity_radius_m),
        None
    );
}

#[test]
fn test_empty_feed_reports_empty_graph() {
    let graph = build_graph(&[], &GraphConfig::default());
    let err = route(&graph, at(0.0, 0.0), at(10.0, 0.0), &RoutingConfig::default()).unwrap_err();
    assert_eq!(err, RouteError::EmptyGraph);
}

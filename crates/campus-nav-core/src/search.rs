//! Turn-penalised A* over the footway graph.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::f64::consts::PI;

use crate::config::SearchConfig;
use crate::geometry::{angle_between, LatLon};
use crate::graph::{NodeId, RoutingGraph};

/// A found path and what it took to find it.
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    /// Node ids from start to goal, inclusive.
    pub nodes: Vec<NodeId>,
    /// Search cost including turn penalties.
    pub cost: f64,
    /// Walking distance along the path in meters.
    pub length_m: f64,
    pub nodes_visited: usize,
}

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    node: NodeId,
    g_score: FloatOrd,
    f_score: FloatOrd,
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score
            .cmp(&other.f_score)
            .then_with(|| self.g_score.cmp(&other.g_score))
            .then_with(|| self.node.cmp(&other.node))
    }
}

/// Extra cost for turning at `cur` from the `prev` leg onto `cur -> next`.
///
/// Scales linearly from zero (straight on) to `max_turn_penalty_m` (U-turn)
/// and never exceeds `turn_penalty_cap_ratio` of the outgoing edge cost.
pub fn turn_penalty(
    prev: Option<LatLon>,
    cur: LatLon,
    next: LatLon,
    base_cost: f64,
    config: &SearchConfig,
) -> f64 {
    if !config.turn_penalty_enabled {
        return 0.0;
    }
    let Some(prev) = prev else {
        return 0.0;
    };
    let raw = angle_between(prev, cur, next) / PI * config.max_turn_penalty_m;
    raw.min(config.turn_penalty_cap_ratio * base_cost).max(0.0)
}

/// Lowest-cost path from `start` to `goal`, or `None` when the two lie in
/// different components (or either id is unknown).
///
/// The heuristic is the great-circle distance to the goal, which never
/// exceeds the remaining edge weights.
pub fn find_path(
    graph: &RoutingGraph,
    start: NodeId,
    goal: NodeId,
    config: &SearchConfig,
) -> Option<PathResult> {
    let start_pos = graph.position(start)?;
    let goal_pos = graph.position(goal)?;

    if start == goal {
        return Some(PathResult {
            nodes: vec![start],
            cost: 0.0,
            length_m: 0.0,
            nodes_visited: 0,
        });
    }

    let mut open_set: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
    open_set.push(Reverse(OpenNode {
        node: start,
        g_score: FloatOrd(0.0),
        f_score: FloatOrd(start_pos.distance_m(&goal_pos)),
    }));
    let mut closed_set: HashSet<NodeId> = HashSet::new();
    let mut g_score: HashMap<NodeId, f64> = HashMap::new();
    let mut came_from: HashMap<NodeId, NodeId> = HashMap::new();
    g_score.insert(start, 0.0);

    let mut nodes_visited = 0usize;

    while let Some(Reverse(current)) = open_set.pop() {
        if closed_set.contains(&current.node) {
            continue;
        }
        let best_g = g_score.get(&current.node).copied().unwrap_or(f64::INFINITY);
        if current.g_score.0 > best_g + 1e-9 {
            continue;
        }

        nodes_visited += 1;

        if current.node == goal {
            let nodes = reconstruct(&came_from, goal);
            let length_m = graph.path_length(&nodes).unwrap_or(best_g);
            return Some(PathResult {
                nodes,
                cost: best_g,
                length_m,
                nodes_visited,
            });
        }

        closed_set.insert(current.node);
        let Some(current_pos) = graph.position(current.node) else {
            continue;
        };
        let prev_pos = came_from
            .get(&current.node)
            .and_then(|prev| graph.position(*prev));

        for edge in graph.neighbors(current.node) {
            if closed_set.contains(&edge.to) {
                continue;
            }
            let Some(next_pos) = graph.position(edge.to) else {
                continue;
            };

            let step_cost = edge.weight_m
                + turn_penalty(prev_pos, current_pos, next_pos, edge.weight_m, config);
            let tentative_g = best_g + step_cost;
            if tentative_g < g_score.get(&edge.to).copied().unwrap_or(f64::INFINITY) {
                came_from.insert(edge.to, current.node);
                g_score.insert(edge.to, tentative_g);
                open_set.push(Reverse(OpenNode {
                    node: edge.to,
                    g_score: FloatOrd(tentative_g),
                    f_score: FloatOrd(tentative_g + next_pos.distance_m(&goal_pos)),
                }));
            }
        }
    }

    tracing::debug!(%start, %goal, nodes_visited, "A* exhausted open set");
    None
}

fn reconstruct(came_from: &HashMap<NodeId, NodeId>, goal: NodeId) -> Vec<NodeId> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(prev) = came_from.get(&current) {
        path.push(*prev);
        current = *prev;
    }
    path.reverse();
    path
}

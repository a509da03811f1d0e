//! Campus pedestrian routing: build a walkable graph from hand-drawn
//! footways, snap free coordinates onto it, search it with a turn-penalised
//! A*, and turn the result into spoken-style walking instructions.

pub mod builder;
pub mod config;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod instructions;
pub mod models;
pub mod proximity;
pub mod route;
pub mod search;
pub mod session;
pub mod snap;
mod union_find;

pub use builder::{build_graph, BuildReport};
pub use config::{GraphConfig, GuidanceConfig, RoutingConfig, SearchConfig, SnapConfig};
pub use error::{RouteError, SkipReason};
pub use geometry::{haversine_distance, LatLon, Side};
pub use graph::{Edge, NodeId, RoutingGraph, Segment};
pub use instructions::{
    generate_instructions, straight_line_instruction, Instruction, InstructionKind,
};
pub use models::{parse_footways, AccessType, Entrance, Footway, FootwayGeometry, FootwayState};
pub use proximity::{check_proximity, ProximityAnnouncer};
pub use route::{guide, guide_with_entrances, route, Guidance, Route};
pub use search::{find_path, PathResult};
pub use session::GraphStore;
pub use snap::{snap, substitute_entrance, QueryGraph, SnapKind, Snapped};

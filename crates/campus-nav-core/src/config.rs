//! Tunable tolerances and cost constants.
//!
//! The values are empirical. Only their rough relative magnitudes matter:
//! merge < intersection-split << stitching gap < snap range.

use serde::{Deserialize, Serialize};

/// Complete configuration for graph building, snapping, search and guidance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub graph: GraphConfig,
    pub snap: SnapConfig,
    pub search: SearchConfig,
    pub guidance: GuidanceConfig,
}

/// Graph builder tolerances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Crossings closer than this to an existing endpoint do not split.
    pub intersection_tolerance_m: f64,
    /// Maximum gap bridged between two dangling endpoints.
    pub connect_tolerance_m: f64,
    /// Maximum deviation between an endpoint's travel direction and the gap.
    pub connect_angle_tolerance_deg: f64,
    /// Endpoints closer than this collapse into one node.
    pub merge_tolerance_m: f64,
    /// Safety cap on the split fixed-point loop.
    pub max_split_passes: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            intersection_tolerance_m: 2.5,
            connect_tolerance_m: 18.0,
            connect_angle_tolerance_deg: 28.0,
            merge_tolerance_m: 3.0,
            max_split_passes: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    /// An existing node this close is used directly instead of projecting.
    pub node_snap_radius_m: f64,
    /// Points farther than this from every segment are out of range.
    pub max_snap_distance_m: f64,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            node_snap_radius_m: 7.0,
            max_snap_distance_m: 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub turn_penalty_enabled: bool,
    /// Penalty in meters charged for a full U-turn, scaled linearly by angle.
    pub max_turn_penalty_m: f64,
    /// Penalty never exceeds this fraction of the edge's own length.
    pub turn_penalty_cap_ratio: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            turn_penalty_enabled: true,
            max_turn_penalty_m: 20.0,
            turn_penalty_cap_ratio: 0.12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    /// Turns sharper than this are announced.
    pub min_turn_angle_deg: f64,
    /// A trigger fires when the walker is within this radius.
    pub proximity_radius_m: f64,
    /// Cadence of the live proximity check.
    pub announce_interval_secs: u64,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            min_turn_angle_deg: 15.0,
            proximity_radius_m: 18.0,
            announce_interval_secs: 2,
        }
    }
}

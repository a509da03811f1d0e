//! Routing configuration from an optional JSON file and the environment.

use anyhow::Context;
use std::env;
use std::path::Path;
use std::str::FromStr;

use campus_nav_core::RoutingConfig;

/// Load `path` (when given) and apply `CAMPUS_NAV_*` overrides.
pub fn from_env(path: Option<&Path>) -> anyhow::Result<RoutingConfig> {
    let mut config = match path {
        Some(path) => load_file(path)?,
        None => RoutingConfig::default(),
    };
    apply_env_overrides(&mut config, |key| env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

/// Reject settings the routing loops cannot run with.
pub fn validate(config: &RoutingConfig) -> anyhow::Result<()> {
    anyhow::ensure!(
        config.guidance.announce_interval_secs > 0,
        "announce_interval_secs must be at least 1"
    );
    anyhow::ensure!(
        config.snap.max_snap_distance_m.is_finite() && config.snap.max_snap_distance_m > 0.0,
        "max_snap_distance_m must be positive"
    );
    anyhow::ensure!(
        config.guidance.proximity_radius_m.is_finite() && config.guidance.proximity_radius_m >= 0.0,
        "proximity_radius_m must not be negative"
    );
    Ok(())
}

pub fn load_file(path: &Path) -> anyhow::Result<RoutingConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

/// Apply overrides found through `lookup`. Unset or unparsable values keep
/// the current setting.
pub fn apply_env_overrides(config: &mut RoutingConfig, lookup: impl Fn(&str) -> Option<String>) {
    let graph = &mut config.graph;
    override_with(&lookup, "CAMPUS_NAV_INTERSECTION_TOLERANCE_M", &mut graph.intersection_tolerance_m);
    override_with(&lookup, "CAMPUS_NAV_CONNECT_TOLERANCE_M", &mut graph.connect_tolerance_m);
    override_with(&lookup, "CAMPUS_NAV_CONNECT_ANGLE_DEG", &mut graph.connect_angle_tolerance_deg);
    override_with(&lookup, "CAMPUS_NAV_MERGE_TOLERANCE_M", &mut graph.merge_tolerance_m);
    override_with(&lookup, "CAMPUS_NAV_MAX_SPLIT_PASSES", &mut graph.max_split_passes);

    let snap = &mut config.snap;
    override_with(&lookup, "CAMPUS_NAV_NODE_SNAP_RADIUS_M", &mut snap.node_snap_radius_m);
    override_with(&lookup, "CAMPUS_NAV_MAX_SNAP_DISTANCE_M", &mut snap.max_snap_distance_m);

    let search = &mut config.search;
    override_with(&lookup, "CAMPUS_NAV_TURN_PENALTY", &mut search.turn_penalty_enabled);
    override_with(&lookup, "CAMPUS_NAV_MAX_TURN_PENALTY_M", &mut search.max_turn_penalty_m);
    override_with(&lookup, "CAMPUS_NAV_TURN_PENALTY_CAP", &mut search.turn_penalty_cap_ratio);

    let guidance = &mut config.guidance;
    override_with(&lookup, "CAMPUS_NAV_MIN_TURN_ANGLE_DEG", &mut guidance.min_turn_angle_deg);
    override_with(&lookup, "CAMPUS_NAV_PROXIMITY_RADIUS_M", &mut guidance.proximity_radius_m);
    override_with(&lookup, "CAMPUS_NAV_ANNOUNCE_INTERVAL_SECS", &mut guidance.announce_interval_secs);
}

fn override_with<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut T) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *target = value,
        Err(_) => tracing::warn!(key, value = %raw, "Ignoring unparsable override"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn overrides_replace_only_what_is_set() {
        let mut config = RoutingConfig::default();
        apply_env_overrides(
            &mut config,
            lookup_from(&[
                ("CAMPUS_NAV_MAX_SNAP_DISTANCE_M", "120"),
                ("CAMPUS_NAV_TURN_PENALTY", "false"),
                ("CAMPUS_NAV_ANNOUNCE_INTERVAL_SECS", " 5 "),
            ]),
        );
        assert_eq!(config.snap.max_snap_distance_m, 120.0);
        assert!(!config.search.turn_penalty_enabled);
        assert_eq!(config.guidance.announce_interval_secs, 5);
        assert_eq!(config.graph, RoutingConfig::default().graph);
    }

    #[test]
    fn unparsable_values_keep_the_default() {
        let mut config = RoutingConfig::default();
        apply_env_overrides(
            &mut config,
            lookup_from(&[("CAMPUS_NAV_MERGE_TOLERANCE_M", "three")]),
        );
        assert_eq!(config, RoutingConfig::default());
    }

    #[test]
    fn zero_announce_interval_is_rejected() {
        let mut config = RoutingConfig::default();
        apply_env_overrides(
            &mut config,
            lookup_from(&[("CAMPUS_NAV_ANNOUNCE_INTERVAL_SECS", "0")]),
        );
        assert_eq!(config.guidance.announce_interval_secs, 0);
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("announce_interval_secs"));
        assert!(validate(&RoutingConfig::default()).is_ok());
    }

    #[test]
    fn zero_interval_in_file_fails_to_load() {
        let path = env::temp_dir().join(format!("campus-nav-zero-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"guidance": {"announce_interval_secs": 0}}"#).unwrap();
        let result = from_env(Some(&path));
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn file_values_are_loaded() {
        let path = env::temp_dir().join(format!("campus-nav-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"guidance": {"proximity_radius_m": 25.0}}"#).unwrap();
        let config = load_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.guidance.proximity_radius_m, 25.0);
        assert_eq!(config.snap, RoutingConfig::default().snap);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_file(Path::new("/nonexistent/campus-nav.json")).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }
}

//! Footway and entrance feeds read from local JSON files.

use anyhow::{bail, Context};
use std::path::Path;

use campus_nav_core::{parse_footways, Entrance, Footway, LatLon};

pub fn load_footways(path: &Path) -> anyhow::Result<Vec<Footway>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading footways {}", path.display()))?;
    let footways = parse_footways(&raw)
        .with_context(|| format!("parsing footways {}", path.display()))?;
    tracing::info!(count = footways.len(), path = %path.display(), "Loaded footway feed");
    Ok(footways)
}

pub fn load_entrances(path: &Path) -> anyhow::Result<Vec<Entrance>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading entrances {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing entrances {}", path.display()))
}

/// Entrance of `building_id` closest to `from`.
pub fn nearest_entrance<'a>(
    entrances: &'a [Entrance],
    building_id: &str,
    from: LatLon,
) -> Option<&'a Entrance> {
    entrances
        .iter()
        .filter(|entrance| entrance.building_id == building_id)
        .min_by(|a, b| {
            from.distance_m(&a.position())
                .total_cmp(&from.distance_m(&b.position()))
        })
}

/// Parse a `lat,lon` pair as typed on the command line.
pub fn parse_lat_lon(raw: &str) -> anyhow::Result<LatLon> {
    let Some((lat, lon)) = raw.split_once(',') else {
        bail!("expected `lat,lon`, got `{raw}`");
    };
    let lat: f64 = lat.trim().parse().with_context(|| format!("latitude in `{raw}`"))?;
    let lon: f64 = lon.trim().parse().with_context(|| format!("longitude in `{raw}`"))?;
    let point = LatLon::new(lat, lon);
    if !point.is_valid() {
        bail!("`{raw}` is not a valid WGS84 coordinate");
    }
    Ok(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{name}-{}.json", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn parses_coordinate_pairs() {
        assert_eq!(
            parse_lat_lon("33.6405, -117.8443").unwrap(),
            LatLon::new(33.6405, -117.8443)
        );
        assert!(parse_lat_lon("33.6405").is_err());
        assert!(parse_lat_lon("north,-117.8").is_err());
        assert!(parse_lat_lon("95.0,-117.8").is_err());
    }

    #[test]
    fn loads_a_feature_collection() {
        let path = temp_file(
            "campus-nav-footways",
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "properties": {"id": 7, "state": "open", "active": true, "accessType": "pedestrian"},
                        "geometry": {"type": "LineString", "coordinates": [[-117.8443, 33.6405], [-117.8443, 33.6410]]}
                    }
                ]
            }"#,
        );
        let footways = load_footways(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(footways.len(), 1);
        assert_eq!(footways[0].id, "7");
        assert!(footways[0].is_routable());
    }

    #[test]
    fn malformed_feed_names_the_file() {
        let path = temp_file("campus-nav-broken", "[{");
        let err = load_footways(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(format!("{err:#}").contains("parsing footways"));
    }

    #[test]
    fn picks_the_closest_entrance_of_the_building() {
        let entrances = vec![
            Entrance { building_id: "library".into(), lat: 33.6410, lon: -117.8443 },
            Entrance { building_id: "library".into(), lat: 33.6420, lon: -117.8443 },
            Entrance { building_id: "gym".into(), lat: 33.6406, lon: -117.8443 },
        ];
        let from = LatLon::new(33.6405, -117.8443);
        let entrance = nearest_entrance(&entrances, "library", from).unwrap();
        assert_eq!(entrance.lat, 33.6410);
        assert!(nearest_entrance(&entrances, "stadium", from).is_none());
    }
}

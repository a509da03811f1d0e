//! Input records consumed by the routing core.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::SkipReason;
use crate::geometry::LatLon;

/// Open/closed status of a footway as maintained by campus staff.
///
/// Any state the feed invents beyond these reads as `Unknown` and is not
/// routed over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FootwayState {
    #[default]
    Open,
    Closed,
    #[serde(other)]
    Unknown,
}

/// Who a footway is drawn for. Informational only; routing is pedestrian.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Pedestrian,
    Vehicular,
    Both,
    #[default]
    #[serde(other)]
    Unspecified,
}

/// Footway geometry as it arrives from the feed, `[lon, lat]` ordered.
///
/// Positions may carry an altitude, which is dropped. Any other GeoJSON
/// `type` deserialises to `Unsupported` and is skipped at normalisation time.
/// `Malformed` stands in for a record the feed parser could not read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FootwayGeometry {
    LineString {
        #[serde(deserialize_with = "positions")]
        coordinates: Vec<[f64; 2]>,
    },
    MultiLineString {
        #[serde(deserialize_with = "multi_positions")]
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    #[serde(skip_deserializing)]
    Malformed { error: String },
    #[serde(other)]
    Unsupported,
}

impl FootwayGeometry {
    pub fn line_string(points: &[LatLon]) -> Self {
        FootwayGeometry::LineString {
            coordinates: points.iter().map(|p| [p.lon, p.lat]).collect(),
        }
    }

    pub fn multi_line_string(parts: &[Vec<LatLon>]) -> Self {
        FootwayGeometry::MultiLineString {
            coordinates: parts
                .iter()
                .map(|part| part.iter().map(|p| [p.lon, p.lat]).collect())
                .collect(),
        }
    }
}

/// A recorded pedestrian path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Footway {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub state: FootwayState,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub access_type: AccessType,
    pub geometry: FootwayGeometry,
}

fn default_active() -> bool {
    true
}

impl Footway {
    /// Open, active footway with a single line string.
    pub fn open(id: impl Into<String>, points: &[LatLon]) -> Self {
        Self {
            id: id.into(),
            state: FootwayState::Open,
            active: true,
            access_type: AccessType::Pedestrian,
            geometry: FootwayGeometry::line_string(points),
        }
    }

    /// Only open and active footways take part in routing.
    pub fn is_routable(&self) -> bool {
        self.state == FootwayState::Open && self.active
    }

    /// Normalise the geometry into a list of polylines.
    ///
    /// Parts with fewer than two vertices are dropped. A single invalid
    /// coordinate rejects the whole record.
    pub fn polylines(&self) -> Result<Vec<Vec<LatLon>>, SkipReason> {
        let raw: Vec<&[[f64; 2]]> = match &self.geometry {
            FootwayGeometry::LineString { coordinates } => vec![coordinates.as_slice()],
            FootwayGeometry::MultiLineString { coordinates } => {
                coordinates.iter().map(Vec::as_slice).collect()
            }
            FootwayGeometry::Unsupported => return Err(SkipReason::UnsupportedGeometry),
            FootwayGeometry::Malformed { .. } => return Err(SkipReason::MalformedRecord),
        };

        let mut parts = Vec::with_capacity(raw.len());
        for part in raw {
            let points: Vec<LatLon> = part.iter().copied().map(LatLon::from_lon_lat).collect();
            if points.iter().any(|p| !p.is_valid()) {
                return Err(SkipReason::NonFiniteCoordinate);
            }
            if points.len() >= 2 {
                parts.push(points);
            }
        }

        if parts.is_empty() {
            return Err(SkipReason::TooFewVertices);
        }
        Ok(parts)
    }
}

/// A building entrance from the POI feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entrance {
    #[serde(deserialize_with = "string_or_number")]
    pub building_id: String,
    pub lat: f64,
    pub lon: f64,
}

impl Entrance {
    pub fn position(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }
}

#[derive(Deserialize)]
struct FootwayFeature {
    #[serde(default, deserialize_with = "optional_string_or_number")]
    id: Option<String>,
    #[serde(default)]
    properties: Option<FeatureProperties>,
    geometry: FootwayGeometry,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeatureProperties {
    #[serde(default, deserialize_with = "optional_string_or_number")]
    id: Option<String>,
    #[serde(default)]
    state: FootwayState,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default)]
    access_type: AccessType,
}

impl Default for FeatureProperties {
    fn default() -> Self {
        Self {
            id: None,
            state: FootwayState::default(),
            active: default_active(),
            access_type: AccessType::default(),
        }
    }
}

impl FootwayFeature {
    fn into_footway(self, index: usize) -> Footway {
        let properties = self.properties.unwrap_or_default();
        Footway {
            id: properties
                .id
                .or(self.id)
                .unwrap_or_else(|| format!("feature-{index}")),
            state: properties.state,
            active: properties.active,
            access_type: properties.access_type,
            geometry: self.geometry,
        }
    }
}

/// Parse a footway feed: either a JSON array of records or a
/// `FeatureCollection` whose features carry the record fields in
/// `properties`.
///
/// Records are read one at a time. A record that cannot be read is logged
/// and kept as a `Malformed` footway so the graph builder can count it;
/// the rest of the feed still loads. Only a document that is neither shape
/// is an error.
pub fn parse_footways(json: &str) -> serde_json::Result<Vec<Footway>> {
    let document: Value = serde_json::from_str(json)?;
    match document {
        Value::Array(records) => Ok(records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                let id = record_id(&record, index);
                match serde_json::from_value::<Footway>(record) {
                    Ok(footway) => footway,
                    Err(err) => malformed(id, err),
                }
            })
            .collect()),
        Value::Object(mut collection) => match collection.remove("features") {
            Some(Value::Array(features)) => Ok(features
                .into_iter()
                .enumerate()
                .map(|(index, feature)| {
                    let id = feature
                        .get("properties")
                        .and_then(|p| raw_id(p.get("id")))
                        .or_else(|| raw_id(feature.get("id")))
                        .unwrap_or_else(|| format!("feature-{index}"));
                    match serde_json::from_value::<FootwayFeature>(feature) {
                        Ok(feature) => feature.into_footway(index),
                        Err(err) => malformed(id, err),
                    }
                })
                .collect()),
            _ => Err(serde_json::Error::custom(
                "expected a JSON array of footways or a FeatureCollection with a features array",
            )),
        },
        _ => Err(serde_json::Error::custom(
            "expected a JSON array of footways or a FeatureCollection",
        )),
    }
}

fn record_id(record: &Value, index: usize) -> String {
    raw_id(record.get("id")).unwrap_or_else(|| format!("record-{index}"))
}

fn raw_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn malformed(id: String, err: serde_json::Error) -> Footway {
    tracing::warn!(footway = %id, error = %err, "Malformed footway record");
    Footway {
        id,
        state: FootwayState::Open,
        active: true,
        access_type: AccessType::Unspecified,
        geometry: FootwayGeometry::Malformed {
            error: err.to_string(),
        },
    }
}

/// A GeoJSON position: `[lon, lat]` with any extra ordinates ignored.
struct Position([f64; 2]);

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ordinates = Vec::<f64>::deserialize(deserializer)?;
        match ordinates.as_slice() {
            [lon, lat, ..] => Ok(Position([*lon, *lat])),
            _ => Err(D::Error::invalid_length(
                ordinates.len(),
                &"a position with at least two numbers",
            )),
        }
    }
}

fn positions<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<[f64; 2]>, D::Error> {
    Ok(Vec::<Position>::deserialize(deserializer)?
        .into_iter()
        .map(|p| p.0)
        .collect())
}

fn multi_positions<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<Vec<[f64; 2]>>, D::Error> {
    Ok(Vec::<Vec<Position>>::deserialize(deserializer)?
        .into_iter()
        .map(|part| part.into_iter().map(|p| p.0).collect())
        .collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
    Float(f64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Int(n) => n.to_string(),
            RawId::Float(f) => f.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawId::deserialize(deserializer).map(String::from)
}

fn optional_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}

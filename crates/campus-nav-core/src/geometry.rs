//! Geometry kernel: geodesic distance, local planar projection, and the
//! segment primitives the graph builder and snap resolver are made of.
//!
//! Planar work is done in a local equirectangular frame (meters east/north of
//! an origin, scaled by the origin latitude). At campus scale the error of
//! that approximation is far below the tolerances used by the builder.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance applied to intersection parameters so crossings exactly at a
/// segment end are not lost to rounding.
const PARAM_EPS: f64 = 1e-6;

/// Cross products whose magnitude is below this fraction of `|r| * |s|`
/// are treated as parallel.
const PARALLEL_EPS: f64 = 1e-9;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build from a GeoJSON-ordered `[longitude, latitude]` pair.
    pub fn from_lon_lat(pair: [f64; 2]) -> Self {
        Self {
            lat: pair[1],
            lon: pair[0],
        }
    }

    /// True when both components are finite and inside the WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_m(&self, other: &LatLon) -> f64 {
        haversine_distance(self.lat, self.lon, other.lat, other.lon)
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lon)
    }
}

/// Which hand a turn or a target lies on, relative to the direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Positive z-cross (counter-clockwise, east/north axes) is a left turn.
    pub fn from_cross(cross: f64) -> Option<Side> {
        if cross > 0.0 {
            Some(Side::Left)
        } else if cross < 0.0 {
            Some(Side::Right)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closest point on a segment to a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub point: LatLon,
    /// Parametric position along the segment, clamped to `[0, 1]`.
    pub t: f64,
    /// Geodesic distance from the query point to `point`.
    pub distance_m: f64,
}

/// Calculate distance between two points in meters using Haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
///
/// # Returns
/// Distance in meters
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

// ==== Local planar conversion ====
// These functions convert between meters and degrees using latitude-aware scaling.

/// Meters per degree of latitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

/// Convert a north/south offset in meters to degrees latitude.
pub fn meters_to_lat(meters: f64, ref_lat_deg: f64) -> f64 {
    let meters_per_deg = meters_per_deg_lat(ref_lat_deg).max(1e-9);
    meters / meters_per_deg
}

/// Convert an east/west offset in meters to degrees longitude.
/// Requires the reference latitude for proper scaling.
pub fn meters_to_lon(meters: f64, ref_lat_deg: f64) -> f64 {
    let meters_per_deg = meters_per_deg_lon(ref_lat_deg).max(1e-9);
    meters / meters_per_deg
}

/// Convert degrees latitude to meters using local scaling.
pub fn lat_to_meters(deg: f64, ref_lat_deg: f64) -> f64 {
    deg * meters_per_deg_lat(ref_lat_deg)
}

/// Convert degrees longitude to meters at a given latitude.
pub fn lon_to_meters(deg: f64, ref_lat_deg: f64) -> f64 {
    deg * meters_per_deg_lon(ref_lat_deg)
}

/// Offset a position by meters in the north and east directions.
///
/// # Arguments
/// * `origin` - Reference position
/// * `north_m` - Offset in meters (positive = north)
/// * `east_m` - Offset in meters (positive = east)
pub fn offset_position(origin: LatLon, north_m: f64, east_m: f64) -> LatLon {
    let distance_m = (north_m * north_m + east_m * east_m).sqrt();
    if distance_m <= f64::EPSILON {
        return origin;
    }
    let bearing_rad = east_m.atan2(north_m);
    offset_by_bearing(origin, distance_m, bearing_rad)
}

/// Offset a position by distance and bearing (radians, 0 = north, π/2 = east).
pub fn offset_by_bearing(origin: LatLon, distance_m: f64, bearing_rad: f64) -> LatLon {
    if distance_m.abs() <= f64::EPSILON {
        return origin;
    }

    let lat1 = origin.lat.to_radians();
    let lon1 = origin.lon.to_radians();
    let angular_distance = distance_m / EARTH_RADIUS_M;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lon2 = lon1 + y.atan2(x);
    lon2 =
        (lon2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    LatLon::new(lat2.to_degrees(), lon2.to_degrees())
}

/// Local east/north plane anchored at an origin coordinate.
#[derive(Debug, Clone, Copy)]
pub struct LocalFrame {
    origin: LatLon,
}

impl LocalFrame {
    pub fn new(origin: LatLon) -> Self {
        Self { origin }
    }

    /// Frame anchored at the mean of `points`. Falls back to `(0, 0)` for an
    /// empty slice.
    pub fn around(points: &[LatLon]) -> Self {
        if points.is_empty() {
            return Self::new(LatLon::new(0.0, 0.0));
        }
        let n = points.len() as f64;
        let lat = points.iter().map(|p| p.lat).sum::<f64>() / n;
        let lon = points.iter().map(|p| p.lon).sum::<f64>() / n;
        Self::new(LatLon::new(lat, lon))
    }

    /// Project to meters `(east, north)` relative to the origin.
    pub fn to_xy(&self, point: LatLon) -> (f64, f64) {
        (
            lon_to_meters(point.lon - self.origin.lon, self.origin.lat),
            lat_to_meters(point.lat - self.origin.lat, self.origin.lat),
        )
    }

    pub fn to_lat_lon(&self, xy: (f64, f64)) -> LatLon {
        LatLon::new(
            self.origin.lat + meters_to_lat(xy.1, self.origin.lat),
            self.origin.lon + meters_to_lon(xy.0, self.origin.lat),
        )
    }
}

fn cross(a: (f64, f64), b: (f64, f64)) -> f64 {
    a.0 * b.1 - a.1 * b.0
}

fn dot(a: (f64, f64), b: (f64, f64)) -> f64 {
    a.0 * b.0 + a.1 * b.1
}

fn norm(a: (f64, f64)) -> f64 {
    a.0.hypot(a.1)
}

/// Project `point` onto segment `a`-`b`.
///
/// A degenerate segment (`a == b`) yields `t = 0` and the distance to `a`.
pub fn project_point_to_segment(point: LatLon, a: LatLon, b: LatLon) -> Projection {
    let frame = LocalFrame::new(a);
    let (px, py) = frame.to_xy(point);
    let (sx, sy) = frame.to_xy(b);

    let seg_len_sq = sx * sx + sy * sy;
    let t = if seg_len_sq <= f64::EPSILON {
        0.0
    } else {
        ((px * sx + py * sy) / seg_len_sq).clamp(0.0, 1.0)
    };

    // Exact endpoints keep node ids stable for callers that round coordinates.
    let closest = if t <= 0.0 {
        a
    } else if t >= 1.0 {
        b
    } else {
        frame.to_lat_lon((t * sx, t * sy))
    };

    Projection {
        point: closest,
        t,
        distance_m: point.distance_m(&closest),
    }
}

/// Intersection point of segments `a1`-`a2` and `b1`-`b2`, if they cross.
///
/// Both parameters must fall in `[0, 1]` (with a small tolerance). Parallel
/// and collinear segments return `None`.
pub fn segment_intersection(a1: LatLon, a2: LatLon, b1: LatLon, b2: LatLon) -> Option<LatLon> {
    let frame = LocalFrame::around(&[a1, a2, b1, b2]);
    let p = frame.to_xy(a1);
    let r = {
        let end = frame.to_xy(a2);
        (end.0 - p.0, end.1 - p.1)
    };
    let q = frame.to_xy(b1);
    let s = {
        let end = frame.to_xy(b2);
        (end.0 - q.0, end.1 - q.1)
    };

    let denom = cross(r, s);
    let scale = norm(r) * norm(s);
    if scale <= f64::EPSILON || denom.abs() <= PARALLEL_EPS * scale {
        return None;
    }

    let qp = (q.0 - p.0, q.1 - p.1);
    let t = cross(qp, s) / denom;
    let u = cross(qp, r) / denom;
    let in_range = |v: f64| (-PARAM_EPS..=1.0 + PARAM_EPS).contains(&v);
    if !in_range(t) || !in_range(u) {
        return None;
    }

    let t = t.clamp(0.0, 1.0);
    Some(frame.to_lat_lon((p.0 + t * r.0, p.1 + t * r.1)))
}

/// Turn angle at `cur` in radians, `0` for straight on and `π` for a U-turn.
///
/// Zero-length incoming or outgoing legs count as straight.
pub fn angle_between(prev: LatLon, cur: LatLon, next: LatLon) -> f64 {
    let frame = LocalFrame::new(cur);
    let (px, py) = frame.to_xy(prev);
    let v1 = (-px, -py);
    let v2 = frame.to_xy(next);

    let n1 = norm(v1);
    let n2 = norm(v2);
    if n1 <= f64::EPSILON || n2 <= f64::EPSILON {
        return 0.0;
    }
    (dot(v1, v2) / (n1 * n2)).clamp(-1.0, 1.0).acos()
}

/// Side of the turn at `cur`, from the sign of the cross product of the
/// incoming and outgoing legs. `None` when the legs are collinear.
pub fn turn_side(prev: LatLon, cur: LatLon, next: LatLon) -> Option<Side> {
    let frame = LocalFrame::new(cur);
    let (px, py) = frame.to_xy(prev);
    let v1 = (-px, -py);
    let v2 = frame.to_xy(next);
    let c = cross(v1, v2);
    if c.abs() <= PARALLEL_EPS * norm(v1) * norm(v2) {
        return None;
    }
    Side::from_cross(c)
}

/// Side on which `target` lies for a walker heading from `from` to `to`
/// and standing at `to`.
pub fn side_of(from: LatLon, to: LatLon, target: LatLon) -> Option<Side> {
    turn_side(from, to, target)
}

/// Unit direction from `from` towards `to` in local east/north axes.
pub fn unit_vector(from: LatLon, to: LatLon) -> Option<(f64, f64)> {
    let (x, y) = LocalFrame::new(from).to_xy(to);
    let n = x.hypot(y);
    if n <= f64::EPSILON {
        return None;
    }
    Some((x / n, y / n))
}

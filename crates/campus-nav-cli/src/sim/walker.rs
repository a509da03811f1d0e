//! A walker moving along a route polyline at constant speed.

use rand::Rng;
use std::f64::consts::PI;

use campus_nav_core::geometry::offset_by_bearing;
use campus_nav_core::LatLon;

/// Constant-speed walk along a polyline.
#[derive(Debug, Clone)]
pub struct PolylineWalk {
    points: Vec<LatLon>,
    /// Distance from the first point to each point.
    cumulative_m: Vec<f64>,
    speed_mps: f64,
}

impl PolylineWalk {
    pub fn new(points: Vec<LatLon>, speed_mps: f64) -> Self {
        let mut cumulative_m = Vec::with_capacity(points.len());
        let mut total = 0.0;
        for (i, point) in points.iter().enumerate() {
            if i > 0 {
                total += points[i - 1].distance_m(point);
            }
            cumulative_m.push(total);
        }
        Self {
            points,
            cumulative_m,
            speed_mps,
        }
    }

    pub fn length_m(&self) -> f64 {
        self.cumulative_m.last().copied().unwrap_or(0.0)
    }

    pub fn speed_mps(&self) -> f64 {
        self.speed_mps
    }

    /// Seconds needed to reach the end; zero for a non-moving walker.
    pub fn duration_s(&self) -> f64 {
        if self.speed_mps > 0.0 {
            self.length_m() / self.speed_mps
        } else {
            0.0
        }
    }

    pub fn is_finished(&self, t: f64) -> bool {
        t >= self.duration_s()
    }

    /// Position `t` seconds after starting, clamped to the polyline ends.
    pub fn position_at(&self, t: f64) -> Option<LatLon> {
        if self.points.is_empty() {
            return None;
        }
        let travelled = (t.max(0.0) * self.speed_mps).min(self.length_m());

        let i = self
            .cumulative_m
            .partition_point(|&d| d <= travelled)
            .clamp(1, self.points.len());
        if i >= self.points.len() {
            return self.points.last().copied();
        }

        let (a, b) = (self.points[i - 1], self.points[i]);
        let span = self.cumulative_m[i] - self.cumulative_m[i - 1];
        if span <= f64::EPSILON {
            return Some(a);
        }
        let f = (travelled - self.cumulative_m[i - 1]) / span;
        Some(LatLon::new(
            a.lat + f * (b.lat - a.lat),
            a.lon + f * (b.lon - a.lon),
        ))
    }
}

/// Uniform GPS noise within a disc of `radius_m`.
#[derive(Debug, Clone, Copy)]
pub struct GpsJitter {
    pub radius_m: f64,
}

impl GpsJitter {
    pub fn new(radius_m: f64) -> Self {
        Self { radius_m }
    }

    pub fn apply<R: Rng + ?Sized>(&self, rng: &mut R, position: LatLon) -> LatLon {
        if self.radius_m <= 0.0 {
            return position;
        }
        // sqrt keeps the samples uniform over the disc area.
        let distance_m = self.radius_m * rng.random::<f64>().sqrt();
        let bearing_rad = rng.random_range(0.0..2.0 * PI);
        offset_by_bearing(position, distance_m, bearing_rad)
    }
}

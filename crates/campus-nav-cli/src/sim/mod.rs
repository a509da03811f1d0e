//! Walker simulation for exercising live guidance without a phone.

pub mod walker;

pub use walker::{GpsJitter, PolylineWalk};

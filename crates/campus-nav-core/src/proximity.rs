//! Live re-announcement of instructions as the walker approaches their
//! trigger points.
//!
//! The check is level-triggered: the same instruction keeps matching on
//! every tick while the walker stays inside its radius. Callers that want
//! one-shot announcements dedupe on the returned index.

use crate::config::GuidanceConfig;
use crate::geometry::LatLon;
use crate::instructions::Instruction;

/// First instruction whose trigger lies within `radius_m` of `position`.
///
/// `triggers` and `instructions` are parallel lists; extra entries on either
/// side are ignored.
pub fn check_proximity<'a>(
    position: LatLon,
    triggers: &[LatLon],
    instructions: &'a [String],
    radius_m: f64,
) -> Option<&'a str> {
    triggers
        .iter()
        .zip(instructions)
        .find(|(trigger, _)| position.distance_m(trigger) <= radius_m)
        .map(|(_, text)| text.as_str())
}

/// Holds the current route's instructions and answers proximity checks.
#[derive(Debug, Clone, Default)]
pub struct ProximityAnnouncer {
    instructions: Vec<Instruction>,
    radius_m: f64,
}

impl ProximityAnnouncer {
    pub fn new(instructions: Vec<Instruction>, config: &GuidanceConfig) -> Self {
        Self {
            instructions,
            radius_m: config.proximity_radius_m,
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Swap in a new route's instructions.
    pub fn replace(&mut self, instructions: Vec<Instruction>) {
        self.instructions = instructions;
    }

    /// First instruction (in route order) whose trigger is within range.
    pub fn check(&self, position: LatLon) -> Option<(usize, &Instruction)> {
        self.instructions
            .iter()
            .enumerate()
            .find(|(_, instruction)| position.distance_m(&instruction.trigger) <= self.radius_m)
    }
}

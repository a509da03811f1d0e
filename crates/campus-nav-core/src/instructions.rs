//! Turn-by-turn instruction generation.
//!
//! Walks a route polyline, folds gentle bends into the running distance and
//! emits one instruction per real turn, a closing "continue" leg, and the
//! side of the path the destination is on. Every instruction carries the
//! coordinate that triggers its live re-announcement.

use serde::Serialize;

use crate::config::GuidanceConfig;
use crate::geometry::{angle_between, side_of, turn_side, LatLon, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "side", rename_all = "snake_case")]
pub enum InstructionKind {
    Turn(Side),
    UTurn,
    Continue,
    DestinationSide(Side),
    DestinationAhead,
    StraightLine,
}

/// One spoken/displayed instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instruction {
    pub kind: InstructionKind,
    pub text: String,
    /// Where the instruction becomes relevant.
    pub trigger: LatLon,
    /// Distance the instruction talks about, unrounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
}

fn meters(distance_m: f64) -> String {
    format!("{:.0}", distance_m.max(0.0))
}

/// Instructions for walking `polyline` to `destination`.
///
/// `destination` is the requested (unsnapped) target; it decides the final
/// left/right hint. A polyline with fewer than two points yields the
/// straight-line fallback, so the result is never empty.
pub fn generate_instructions(
    polyline: &[LatLon],
    destination: LatLon,
    config: &GuidanceConfig,
) -> Vec<Instruction> {
    let (Some(first), Some(last)) = (polyline.first(), polyline.last()) else {
        return vec![straight_line_instruction(destination, destination)];
    };
    if polyline.len() < 2 {
        return vec![straight_line_instruction(*first, destination)];
    }

    let min_angle = config.min_turn_angle_deg.to_radians();
    let mut instructions = Vec::new();
    let mut accumulated = 0.0;

    for i in 1..polyline.len() {
        accumulated += polyline[i - 1].distance_m(&polyline[i]);
        if i + 1 == polyline.len() {
            break;
        }

        let (prev, cur, next) = (polyline[i - 1], polyline[i], polyline[i + 1]);
        if angle_between(prev, cur, next) < min_angle {
            continue;
        }
        // Past the threshold but with no side: the path doubles back.
        let (kind, text) = match turn_side(prev, cur, next) {
            Some(side) => (
                InstructionKind::Turn(side),
                format!("In {} m, turn {side}.", meters(accumulated)),
            ),
            None => (
                InstructionKind::UTurn,
                format!("In {} m, turn around.", meters(accumulated)),
            ),
        };
        instructions.push(Instruction {
            kind,
            text,
            trigger: cur,
            distance_m: Some(accumulated),
        });
        accumulated = 0.0;
    }

    if accumulated > 0.0 {
        instructions.push(Instruction {
            kind: InstructionKind::Continue,
            text: format!("Continue {} m to the entrance.", meters(accumulated)),
            trigger: *last,
            distance_m: Some(accumulated),
        });
    }

    let before_last = polyline[polyline.len() - 2];
    let kind = match side_of(before_last, *last, destination) {
        Some(side) => InstructionKind::DestinationSide(side),
        None => InstructionKind::DestinationAhead,
    };
    let text = match kind {
        InstructionKind::DestinationSide(side) => {
            format!("The destination will be on your {side}.")
        }
        _ => "The destination is straight ahead.".to_string(),
    };
    instructions.push(Instruction {
        kind,
        text,
        trigger: destination,
        distance_m: None,
    });

    tracing::debug!(
        from = %first,
        count = instructions.len(),
        "Generated walking instructions"
    );
    instructions
}

/// Fallback guidance when no graph route exists.
///
/// Without a usable distance (an invalid endpoint) the text gives none.
pub fn straight_line_instruction(from: LatLon, to: LatLon) -> Instruction {
    let distance_m = from.distance_m(&to);
    if !distance_m.is_finite() {
        return Instruction {
            kind: InstructionKind::StraightLine,
            text: "Walk toward the destination; the distance is unknown.".to_string(),
            trigger: to,
            distance_m: None,
        };
    }
    Instruction {
        kind: InstructionKind::StraightLine,
        text: format!(
            "Walk in a straight line toward the destination, approximately {} m.",
            meters(distance_m)
        ),
        trigger: to,
        distance_m: Some(distance_m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::offset_position;

    const BASE: LatLon = LatLon::new(33.6405, -117.8443);

    fn at(north_m: f64, east_m: f64) -> LatLon {
        offset_position(BASE, north_m, east_m)
    }

    fn texts(instructions: &[Instruction]) -> Vec<&str> {
        instructions.iter().map(|i| i.text.as_str()).collect()
    }

    #[test]
    fn north_then_east_turns_right() {
        let polyline = [at(0.0, 0.0), at(40.0, 0.0), at(40.0, 30.0)];
        let instructions =
            generate_instructions(&polyline, at(45.0, 30.0), &GuidanceConfig::default());
        assert_eq!(
            texts(&instructions),
            vec![
                "In 40 m, turn right.",
                "Continue 30 m to the entrance.",
                "The destination will be on your left.",
            ]
        );
        assert_eq!(instructions[0].trigger, polyline[1]);
        assert_eq!(instructions[1].trigger, polyline[2]);
        assert_eq!(instructions[2].trigger, at(45.0, 30.0));
    }

    #[test]
    fn doubling_back_turns_around() {
        let polyline = [at(0.0, 0.0), at(50.0, 0.0), at(20.0, 0.0)];
        let instructions =
            generate_instructions(&polyline, at(20.0, -3.0), &GuidanceConfig::default());
        assert_eq!(
            texts(&instructions),
            vec![
                "In 50 m, turn around.",
                "Continue 30 m to the entrance.",
                "The destination will be on your right.",
            ]
        );
        assert_eq!(instructions[0].kind, InstructionKind::UTurn);
        assert_eq!(instructions[0].trigger, polyline[1]);
    }

    #[test]
    fn north_then_west_turns_left() {
        let polyline = [at(0.0, 0.0), at(40.0, 0.0), at(40.0, -30.0)];
        let instructions =
            generate_instructions(&polyline, at(35.0, -30.0), &GuidanceConfig::default());
        assert_eq!(instructions[0].kind, InstructionKind::Turn(Side::Left));
        assert_eq!(instructions[0].text, "In 40 m, turn left.");
        assert_eq!(instructions[2].kind, InstructionKind::DestinationSide(Side::Left));
    }

    #[test]
    fn gentle_bends_fold_into_distance() {
        // About 6 degrees of bend: below the announce threshold.
        let polyline = [at(0.0, 0.0), at(50.0, 0.0), at(100.0, 5.0)];
        let instructions =
            generate_instructions(&polyline, at(100.0, 10.0), &GuidanceConfig::default());
        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[0].kind, InstructionKind::Continue);
        let folded = instructions[0].distance_m.unwrap();
        assert!((folded - 100.25).abs() < 0.2, "folded distance {folded}");
        assert_eq!(
            instructions[1].kind,
            InstructionKind::DestinationSide(Side::Right)
        );
    }

    #[test]
    fn destination_on_the_line_is_ahead() {
        let polyline = [at(0.0, 0.0), at(40.0, 0.0)];
        let instructions =
            generate_instructions(&polyline, at(60.0, 0.0), &GuidanceConfig::default());
        assert_eq!(
            instructions.last().unwrap().kind,
            InstructionKind::DestinationAhead
        );
    }

    #[test]
    fn single_point_path_falls_back_to_straight_line() {
        let instructions =
            generate_instructions(&[at(0.0, 0.0)], at(30.0, 40.0), &GuidanceConfig::default());
        assert_eq!(instructions.len(), 1);
        assert_eq!(instructions[0].kind, InstructionKind::StraightLine);
        assert_eq!(instructions[0].trigger, at(30.0, 40.0));
    }

    #[test]
    fn straight_line_states_haversine_distance() {
        let from = at(0.0, 0.0);
        let to = at(300.0, 400.0);
        let instruction = straight_line_instruction(from, to);
        assert_eq!(instruction.distance_m, Some(from.distance_m(&to)));
        assert_eq!(
            instruction.text,
            "Walk in a straight line toward the destination, approximately 500 m."
        );
    }
}

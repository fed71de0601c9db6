//! # Field angles
//!
//! The headings at which the robot faces each of the scoring and loading features on the field.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::f64::consts::{FRAC_PI_2, PI};

use serde::Serialize;
use util::maths::ang_dist;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Angle of the rocket hatches relative to the side walls.
///
/// Units: radians
pub const ROCKET_ANGLE_RAD: f64 = 0.52;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Named field angles, measured from the field's forward direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldAngle {
    CargoFront,
    CargoRight,
    CargoLeft,
    LoadingStation,
    RocketLeftFront,
    RocketRightFront,
    RocketLeftBack,
    RocketRightBack,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FieldAngle {
    pub const ALL: [FieldAngle; 8] = [
        FieldAngle::CargoFront,
        FieldAngle::CargoRight,
        FieldAngle::CargoLeft,
        FieldAngle::LoadingStation,
        FieldAngle::RocketLeftFront,
        FieldAngle::RocketRightFront,
        FieldAngle::RocketLeftBack,
        FieldAngle::RocketRightBack,
    ];

    /// Heading of the robot when squarely facing this feature.
    ///
    /// Units: radians
    pub fn heading_rad(&self) -> f64 {
        match self {
            FieldAngle::CargoFront => 0.0,
            FieldAngle::CargoRight => FRAC_PI_2,
            FieldAngle::CargoLeft => -FRAC_PI_2,
            FieldAngle::LoadingStation => PI,
            FieldAngle::RocketLeftFront => ROCKET_ANGLE_RAD,
            FieldAngle::RocketRightFront => -ROCKET_ANGLE_RAD,
            FieldAngle::RocketLeftBack => PI - ROCKET_ANGLE_RAD,
            FieldAngle::RocketRightBack => -PI + ROCKET_ANGLE_RAD,
        }
    }

    /// The field angle closest to the given heading.
    pub fn closest(heading_rad: f64) -> Self {
        let mut closest = FieldAngle::CargoFront;
        let mut min_dist = f64::INFINITY;

        for angle in FieldAngle::ALL.iter() {
            let dist = ang_dist(heading_rad, angle.heading_rad()).abs();
            if dist < min_dist {
                min_dist = dist;
                closest = *angle;
            }
        }

        closest
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_closest() {
        assert_eq!(FieldAngle::closest(0.1), FieldAngle::CargoFront);
        assert_eq!(FieldAngle::closest(0.45), FieldAngle::RocketLeftFront);
        assert_eq!(FieldAngle::closest(-1.4), FieldAngle::CargoLeft);

        // Either side of the wrap point
        assert_eq!(FieldAngle::closest(PI - 0.05), FieldAngle::LoadingStation);
        assert_eq!(FieldAngle::closest(-PI + 0.05), FieldAngle::LoadingStation);
        assert_eq!(FieldAngle::closest(3.0 * PI), FieldAngle::LoadingStation);
    }
}

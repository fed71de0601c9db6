//! # Arm telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt::Display;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Named arm height setpoints.
///
/// Heights are ordered from lowest to highest in declaration order. The angle each one maps to is
/// given by the arm's height table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Height {
    Floor,
    RocketShip,
    CargoShip,
    LoadingStation,
}

/// A direct command for the arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmCmd {
    /// Move the arm to the given height.
    MoveTo(Height),

    /// Engage the ratchet.
    Ratchet,

    /// Disengage the ratchet.
    Unratchet,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Height {
    /// All heights, lowest first.
    pub const ALL: [Height; 4] = [
        Height::Floor,
        Height::RocketShip,
        Height::CargoShip,
        Height::LoadingStation,
    ];
}

impl Display for Height {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Height::Floor => write!(f, "FLOOR"),
            Height::RocketShip => write!(f, "ROCKET_SHIP"),
            Height::CargoShip => write!(f, "CARGO_SHIP"),
            Height::LoadingStation => write!(f, "LOADING_STATION"),
        }
    }
}

//! # Cargo sequencer telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command for the compound cargo sequencer.
///
/// Every entry point carries a `force` flag. Without it the command is ignored while the
/// sequencer is part way through a phase that must finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CargoCmd {
    /// Lower the arm to the floor and intake cargo.
    IntakeFloor { force: bool },

    /// Raise the arm to the loading station and intake cargo.
    IntakeLoading { force: bool },

    /// Move the arm to the rocket height and eject cargo.
    OuttakeToRocket { force: bool },

    /// Move the arm to the cargo ship height and eject cargo.
    OuttakeToShip { force: bool },

    /// Eject cargo at the current height.
    Outtake { force: bool },

    /// Set the operator override flag of the sequencer.
    Override(bool),
}

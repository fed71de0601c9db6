//! # Vision alignment telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command for the vision aligners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignCmd {
    /// Align with a hatch target and punch the hatch onto it.
    HatchDeposit { force: bool },

    /// Align with the loading station and pick up a hatch.
    HatchIntake { force: bool },

    /// Align with a cargo port and eject the cargo.
    CargoDeposit { force: bool },

    /// Choose between hatch intake and hatch deposit from the field angle closest to the current
    /// heading.
    HatchAuto,
}

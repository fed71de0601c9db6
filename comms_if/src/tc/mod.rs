//! # Telecommand module
//!
//! Telecommands are the dispatcher events of the robot: each one maps onto an `engage()` call on
//! an automation, or a direct request to one of the mechanisms.
//!
//! Telecommands are carried as JSON with a `type` tag and an optional `payload`, for example
//!
//! ```json
//! {"type": "cargo", "payload": {"intake_floor": {"force": true}}}
//! {"type": "make_safe"}
//! ```

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod align;
pub mod arm;
pub mod cargo;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Internal
pub use align::AlignCmd;
pub use arm::{ArmCmd, Height};
pub use cargo::CargoCmd;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the robot by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Tc {
    /// Hardware enable line raised (field management).
    Enable,

    /// Hardware enable line dropped (field management).
    Disable,

    /// Enter safe mode, stopping all automations and outputs.
    MakeSafe,

    /// Leave safe mode entered by `MakeSafe`.
    MakeUnsafe,

    /// Compound cargo sequencer commands.
    Cargo(CargoCmd),

    /// Vision alignment commands.
    Align(AlignCmd),

    /// Direct arm commands.
    Arm(ArmCmd),

    /// Direct intake commands.
    Intake(IntakeCmd),

    /// Direct hatch mechanism commands.
    Hatch(HatchCmd),
}

/// Direct commands for the intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeCmd {
    Intake,
    Outtake,
    Stop,
}

/// Direct commands for the hatch mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HatchCmd {
    /// Fire the hatch punchers.
    Punch,

    /// Allow the punchers to retract without waiting to drive away.
    ClearToRetract,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON or an unrecognised type: {0}")]
    InvalidJson(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        serde_json::from_str(json_str).map_err(TcParseError::InvalidJson)
    }

    /// Serialise the TC into a JSON packet
    pub fn to_json(&self) -> Result<String, TcParseError> {
        serde_json::to_string(self).map_err(TcParseError::InvalidJson)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_tcs() {
        assert_eq!(Tc::from_json(r#"{"type": "make_safe"}"#).unwrap(), Tc::MakeSafe);

        assert_eq!(
            Tc::from_json(r#"{"type": "cargo", "payload": {"intake_floor": {"force": true}}}"#)
                .unwrap(),
            Tc::Cargo(CargoCmd::IntakeFloor { force: true })
        );

        assert_eq!(
            Tc::from_json(r#"{"type": "arm", "payload": {"move_to": "loading_station"}}"#)
                .unwrap(),
            Tc::Arm(ArmCmd::MoveTo(Height::LoadingStation))
        );

        assert_eq!(
            Tc::from_json(r#"{"type": "align", "payload": "hatch_auto"}"#).unwrap(),
            Tc::Align(AlignCmd::HatchAuto)
        );

        assert!(Tc::from_json(r#"{"type": "self_destruct"}"#).is_err());
        assert!(Tc::from_json(r#"{"type": "cargo"}"#).is_err());
    }
}

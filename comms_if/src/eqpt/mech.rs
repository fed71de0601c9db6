//! # Mechanisms Equipment Interfaces

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Command surface of a smart motor controller.
pub trait MotorController {
    /// Drive the motor open loop at the given output, between -1.0 and +1.0.
    fn set_output(&mut self, percent: f64);

    /// Run the controller's onboard position loop toward the given target.
    ///
    /// Units: encoder units
    fn set_position_target(&mut self, units: f64);

    /// Get the measured position.
    ///
    /// Units: encoder units
    fn get_position(&self) -> f64;

    /// Set the gains of the onboard position loop.
    fn configure_position_loop(&mut self, gains: PositionLoopGains);
}

/// A positional servo.
pub trait Servo {
    /// Set the servo angle.
    ///
    /// Units: degrees
    fn set_angle(&mut self, angle_deg: f64);
}

/// The pneumatic outputs of the robot.
pub trait SolenoidBank {
    /// Set a single acting solenoid.
    fn set_solenoid(&mut self, id: SolenoidId, on: bool);

    /// Set a double acting solenoid.
    fn set_double_solenoid(&mut self, id: DoubleSolenoidId, value: PistonDem);
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Gains of a motor controller's onboard position loop.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionLoopGains {
    pub k_p: f64,
    pub k_i: f64,
    pub k_d: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Demand for a motor controller.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum MotorDem {
    /// No output.
    Neutral,

    /// Open loop output between -1.0 and +1.0.
    Percent(f64),

    /// Closed loop position target in encoder units.
    Position(f64),
}

/// IDs of the single acting solenoids.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum SolenoidId {
    HatchBottomPuncher,
    HatchLeftPuncher,
    HatchRightPuncher,
}

/// IDs of the double acting solenoids.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone)]
pub enum DoubleSolenoidId {
    HatchAlignPiston,
}

/// Demand for a double acting solenoid.
#[derive(Serialize, Deserialize, Debug, Eq, PartialEq, Copy, Clone)]
pub enum PistonDem {
    Off,
    Forward,
    Reverse,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl Default for MotorDem {
    fn default() -> Self {
        MotorDem::Neutral
    }
}

impl Default for PistonDem {
    fn default() -> Self {
        PistonDem::Off
    }
}

impl MotorDem {
    /// Send this demand to a motor controller.
    pub fn apply<M: MotorController + ?Sized>(&self, motor: &mut M) {
        match *self {
            MotorDem::Neutral => motor.set_output(0.0),
            MotorDem::Percent(p) => motor.set_output(p),
            MotorDem::Position(u) => motor.set_position_target(u),
        }
    }
}

impl SolenoidId {
    /// All the hatch puncher solenoids.
    pub fn hatch_punchers() -> [SolenoidId; 3] {
        [
            SolenoidId::HatchBottomPuncher,
            SolenoidId::HatchLeftPuncher,
            SolenoidId::HatchRightPuncher,
        ]
    }
}

//! # Drive base interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// The drive base, which consumes velocity commands and produces a pose estimate.
pub trait DriveBase {
    /// Command the drive base velocity.
    ///
    /// `vx` is forwards and `vy` to the left, in meters/second. `omega` is the rotation rate in
    /// radians/second following the right hand rule about the upwards axis. If `field_relative`
    /// is false the velocities are in the robot frame.
    fn set_velocity(&mut self, vx_ms: f64, vy_ms: f64, omega_rads: f64, field_relative: bool);

    /// Get the estimated position of the robot on the field, in meters.
    fn get_position(&self) -> (f64, f64);

    /// Get the estimated heading of the robot on the field, in radians.
    fn get_heading(&self) -> f64;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A velocity demand staged for the drive base.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DriveDems {
    /// Forwards velocity
    ///
    /// Units: meters/second
    pub vx_ms: f64,

    /// Leftwards velocity
    ///
    /// Units: meters/second
    pub vy_ms: f64,

    /// Rotation rate
    ///
    /// Units: radians/second
    pub omega_rads: f64,

    /// True if the velocities are in the field frame, false for the robot frame.
    pub field_relative: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DriveDems {
    /// A robot-relative demand with no rotation.
    pub fn robot_relative(vx_ms: f64, vy_ms: f64) -> Self {
        Self {
            vx_ms,
            vy_ms,
            omega_rads: 0.0,
            field_relative: false,
        }
    }

    /// A demand to stop the drive base.
    pub fn stop() -> Self {
        Self::default()
    }

    /// Magnitude of the translational part of the demand.
    pub fn speed_ms(&self) -> f64 {
        self.vx_ms.hypot(self.vy_ms)
    }
}

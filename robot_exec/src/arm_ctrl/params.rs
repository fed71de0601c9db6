//! Parameters structure for ArmCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::ArmCtrlError;
use comms_if::{eqpt::mech::PositionLoopGains, tc::arm::Height};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Arm control.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Params {
    // ---- GEOMETRY ----
    /// Reduction between the motor and the arm pivot.
    pub gear_ratio: f64,

    /// Encoder units per radian of motor shaft rotation.
    pub units_per_rad: f64,

    /// Arm angle of each of the named heights, measured from the floor position.
    pub height_table_rad: HeightTable,

    // ---- CONTROL ----
    /// Gains of the motor controller's position loop, pushed to the controller at enable.
    pub position_loop: PositionLoopGains,

    /// Distance from the target inside which the arm is considered at height.
    ///
    /// Units: encoder units
    pub tolerance_units: f64,

    /// Length of the pressure release phase which precedes each new setpoint.
    ///
    /// Units: seconds
    pub pressure_release_time_s: f64,

    /// Magnitude of the open loop output applied against the direction of travel during the
    /// pressure release phase.
    pub pressure_release_output: f64,

    // ---- RATCHET ----
    /// Direction of travel the ratchet prevents while engaged.
    pub ratchet_blocked_dir: TravelDir,

    /// Ratchet servo angle with the ratchet engaged.
    ///
    /// Units: degrees
    pub ratchet_engaged_angle_deg: f64,

    /// Ratchet servo angle with the ratchet disengaged.
    ///
    /// Units: degrees
    pub ratchet_disengaged_angle_deg: f64,
}

/// Arm angles of the named heights.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct HeightTable {
    pub floor_rad: f64,
    pub rocket_ship_rad: f64,
    pub cargo_ship_rad: f64,
    pub loading_station_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Direction of arm travel, up being away from the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelDir {
    Up,
    Down,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TravelDir {
    fn default() -> Self {
        TravelDir::Down
    }
}

impl TravelDir {
    pub fn opposite(&self) -> Self {
        match self {
            TravelDir::Up => TravelDir::Down,
            TravelDir::Down => TravelDir::Up,
        }
    }
}

impl HeightTable {
    /// Get the arm angle of the given height.
    pub fn angle_rad(&self, height: Height) -> f64 {
        match height {
            Height::Floor => self.floor_rad,
            Height::RocketShip => self.rocket_ship_rad,
            Height::CargoShip => self.cargo_ship_rad,
            Height::LoadingStation => self.loading_station_rad,
        }
    }
}

impl Params {
    /// Check the parameters are usable.
    pub fn validate(&self) -> Result<(), ArmCtrlError> {
        if self.gear_ratio == 0.0 || self.units_per_rad == 0.0 {
            return Err(ArmCtrlError::ZeroGain);
        }

        if !(self.tolerance_units > 0.0) {
            return Err(ArmCtrlError::InvalidTolerance(self.tolerance_units));
        }

        if !(self.pressure_release_time_s >= 0.0) {
            return Err(ArmCtrlError::InvalidPressureReleaseTime(
                self.pressure_release_time_s,
            ));
        }

        if !(0.0..=1.0).contains(&self.pressure_release_output) {
            return Err(ArmCtrlError::InvalidPressureReleaseOutput(
                self.pressure_release_output,
            ));
        }

        for pair in Height::ALL.windows(2) {
            if !(self.height_table_rad.angle_rad(pair[1])
                > self.height_table_rad.angle_rad(pair[0]))
            {
                return Err(ArmCtrlError::HeightTableNotIncreasing(
                    pair[1].to_string(),
                    pair[0].to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Convert a height into the encoder units the motor controller works in.
    pub fn height_to_units(&self, height: Height) -> f64 {
        self.height_table_rad.angle_rad(height) * self.units_per_rad * self.gear_ratio
    }

    /// Sign of the encoder units for upwards travel.
    pub(crate) fn up_sign(&self) -> f64 {
        (self.units_per_rad * self.gear_ratio).signum()
    }
}

//! # Simulated plant
//!
//! A kinematic simulation of the robot and its mechanisms, used in place of the real equipment by
//! the executable and the tests. Each cycle the executable borrows the [`Hardware`] handles from
//! the plant, runs the control cycle against them, then steps the plant forward by one cycle
//! period.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod parts;
mod pid;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{hw::Hardware, params::DioChannels};
use comms_if::eqpt::mech::{DoubleSolenoidId, PistonDem, PositionLoopGains, SolenoidId};

pub use parts::*;
pub use pid::PidController;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated plant, loaded from `sim.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Params {
    // ---- CHASSIS ----
    /// Units: meters
    pub start_position_m: (f64, f64),

    /// Units: radians
    pub start_heading_rad: f64,

    // ---- VISION ----
    /// Position of the vision target on the field.
    ///
    /// Units: meters
    pub target_position_m: (f64, f64),

    /// Units: radians
    pub target_heading_rad: f64,

    /// Units: meters
    pub vision_min_range_m: f64,

    /// Units: meters
    pub vision_max_range_m: f64,

    /// Units: radians
    pub vision_half_fov_rad: f64,

    // ---- ARM ----
    /// Arm speed at full output.
    ///
    /// Units: encoder units/second
    pub arm_max_speed_units_s: f64,

    /// Lowest arm position, where the bottom limit switch closes.
    ///
    /// Units: encoder units
    pub arm_min_units: f64,

    /// Highest arm position, where the top limit switch closes.
    ///
    /// Units: encoder units
    pub arm_max_units: f64,

    /// Units: encoder units
    pub arm_start_units: f64,

    /// Servo angle at which the ratchet stops the arm falling.
    ///
    /// Units: degrees
    pub ratchet_engaged_angle_deg: f64,

    // ---- CARGO AND HATCH ----
    /// Time the intake must run to draw in cargo.
    ///
    /// Units: seconds
    pub intake_time_s: f64,

    /// Time the intake must run in reverse to eject cargo.
    ///
    /// Units: seconds
    pub eject_time_s: f64,

    pub start_with_cargo: bool,

    pub start_with_hatch: bool,
}

/// The simulated plant.
pub struct SimPlant {
    params: Params,
    channels: DioChannels,

    pub enable: SimEnable,
    pub chassis: SimChassis,
    pub vision: SimVision,
    pub dio: SimDio,
    pub arm_motor: SimMotor,
    pub ratchet_servo: SimServo,
    pub intake_motor: SimMotor,
    pub solenoids: SimSolenoids,

    cargo_loaded: bool,
    cargo_transfer_s: f64,
    hatch_loaded: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimPlant {
    /// Create a new disabled plant.
    pub fn new(params: Params, channels: DioChannels) -> Self {
        let chassis = SimChassis::new(params.start_position_m, params.start_heading_rad);

        let mut vision = SimVision::new(
            params.target_position_m,
            params.target_heading_rad,
            params.vision_min_range_m,
            params.vision_max_range_m,
            params.vision_half_fov_rad,
        );
        vision.update_pose(chassis.position_m, chassis.heading_rad);

        let arm_motor = SimMotor::new(
            params.arm_max_speed_units_s,
            params.arm_min_units,
            params.arm_max_units,
            params.arm_start_units,
        );

        let mut plant = Self {
            channels,
            enable: SimEnable::default(),
            chassis,
            vision,
            dio: SimDio::default(),
            arm_motor,
            ratchet_servo: SimServo {
                angle_deg: params.ratchet_engaged_angle_deg,
            },
            intake_motor: SimMotor::new(0.0, 0.0, 0.0, 0.0),
            solenoids: SimSolenoids::default(),
            cargo_loaded: params.start_with_cargo,
            cargo_transfer_s: 0.0,
            hatch_loaded: params.start_with_hatch,
            params,
        };
        plant.update_dio();

        plant
    }

    /// Borrow the equipment handles for a control cycle.
    pub fn hardware(&mut self) -> Hardware<'_> {
        Hardware {
            enable: &self.enable,
            drive: &mut self.chassis,
            vision: &self.vision,
            dio: &self.dio,
            arm_motor: &mut self.arm_motor,
            ratchet_servo: &mut self.ratchet_servo,
            intake_motor: &mut self.intake_motor,
            solenoids: &mut self.solenoids,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        debug!("Sim enable line set to {}", enabled);
        self.enable.enabled = enabled;
    }

    /// Advance the plant by one step.
    pub fn step(&mut self, dt_s: f64) {
        // Chassis and camera
        self.chassis.step(dt_s);
        self.vision
            .update_pose(self.chassis.position_m, self.chassis.heading_rad);

        // Arm, which can't fall while the ratchet is engaged
        let mut arm_output = self.arm_motor.calc_output(dt_s);
        if self.is_ratchet_engaged() && arm_output < 0.0 {
            arm_output = 0.0;
        }
        self.arm_motor.drive(arm_output, dt_s);

        // Cargo
        let intake_output = self.intake_motor.calc_output(dt_s);
        let transferring = match self.cargo_loaded {
            false => intake_output > 0.0,
            true => intake_output < 0.0,
        };
        if transferring {
            self.cargo_transfer_s += dt_s;
            let transfer_time_s = match self.cargo_loaded {
                false => self.params.intake_time_s,
                true => self.params.eject_time_s,
            };
            if self.cargo_transfer_s >= transfer_time_s - 1e-9 {
                self.cargo_loaded = !self.cargo_loaded;
                self.cargo_transfer_s = 0.0;
                debug!("Sim cargo loaded: {}", self.cargo_loaded);
            }
        } else {
            self.cargo_transfer_s = 0.0;
        }

        // Hatch, which comes off when punched
        if SolenoidId::hatch_punchers()
            .iter()
            .any(|id| self.solenoids.is_on(*id))
        {
            self.hatch_loaded = false;
        }

        self.update_dio();
    }

    pub fn is_cargo_loaded(&self) -> bool {
        self.cargo_loaded
    }

    pub fn load_cargo(&mut self, loaded: bool) {
        self.cargo_loaded = loaded;
        self.update_dio();
    }

    pub fn is_hatch_loaded(&self) -> bool {
        self.hatch_loaded
    }

    pub fn load_hatch(&mut self, loaded: bool) {
        self.hatch_loaded = loaded;
        self.update_dio();
    }

    pub fn is_ratchet_engaged(&self) -> bool {
        (self.ratchet_servo.angle_deg - self.params.ratchet_engaged_angle_deg).abs() < 1.0
    }

    pub fn align_piston(&self) -> PistonDem {
        self.solenoids.piston(DoubleSolenoidId::HatchAlignPiston)
    }

    pub fn arm_gains(&self) -> Option<PositionLoopGains> {
        self.arm_motor.gains()
    }

    fn update_dio(&mut self) {
        let c = self.channels;
        let dio = &mut self.dio.channels;

        dio.insert(c.arm_top_limit, self.arm_motor.at_max());
        dio.insert(c.arm_bottom_limit, self.arm_motor.at_min());
        dio.insert(c.intake_presence, self.cargo_loaded);

        // Hatch switches are active low
        dio.insert(c.hatch_left_presence, !self.hatch_loaded);
        dio.insert(c.hatch_right_presence, !self.hatch_loaded);
    }
}

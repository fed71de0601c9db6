//! # Simulated equipment
//!
//! Simple kinematic models of each piece of equipment, implementing the equipment interfaces.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use nalgebra::{Rotation2, Vector2};

use super::pid::PidController;
use comms_if::eqpt::{
    drive::{DriveBase, DriveDems},
    mech::{
        DoubleSolenoidId, MotorController, MotorDem, PistonDem, PositionLoopGains, Servo,
        SolenoidBank, SolenoidId,
    },
    vision::{TargetOffset, Vision},
    DigitalInputs, EnableSource,
};
use util::maths::wrap_pi;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct SimEnable {
    pub enabled: bool,
}

/// Holonomic chassis which follows its velocity demand exactly.
///
/// Like a real drive base with a motor safety timeout, the chassis stops in any cycle in which it
/// was not commanded.
#[derive(Debug, Default)]
pub struct SimChassis {
    pub position_m: (f64, f64),
    pub heading_rad: f64,
    dems: Option<DriveDems>,
}

/// Vision camera seeing a single target.
#[derive(Debug, Default)]
pub struct SimVision {
    pub target_m: (f64, f64),
    pub target_heading_rad: f64,
    pub min_range_m: f64,
    pub max_range_m: f64,
    pub half_fov_rad: f64,
    robot_position_m: (f64, f64),
    robot_heading_rad: f64,
}

#[derive(Debug, Default)]
pub struct SimDio {
    pub channels: HashMap<u8, bool>,
}

/// Motor controller with an onboard position loop, driving a load whose speed is proportional to
/// the output.
#[derive(Debug, Default)]
pub struct SimMotor {
    dem: MotorDem,
    pub position_units: f64,
    pub max_speed_units_s: f64,
    pub min_units: f64,
    pub max_units: f64,
    pid: PidController,
    gains: Option<PositionLoopGains>,
    output: f64,
}

#[derive(Debug, Default)]
pub struct SimServo {
    pub angle_deg: f64,
}

#[derive(Debug, Default)]
pub struct SimSolenoids {
    pub solenoids: HashMap<SolenoidId, bool>,
    pub pistons: HashMap<DoubleSolenoidId, PistonDem>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl EnableSource for SimEnable {
    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl DriveBase for SimChassis {
    fn set_velocity(&mut self, vx_ms: f64, vy_ms: f64, omega_rads: f64, field_relative: bool) {
        self.dems = Some(DriveDems {
            vx_ms,
            vy_ms,
            omega_rads,
            field_relative,
        });
    }

    fn get_position(&self) -> (f64, f64) {
        self.position_m
    }

    fn get_heading(&self) -> f64 {
        self.heading_rad
    }
}

impl SimChassis {
    pub fn new(position_m: (f64, f64), heading_rad: f64) -> Self {
        Self {
            position_m,
            heading_rad,
            dems: None,
        }
    }

    pub fn step(&mut self, dt_s: f64) {
        if let Some(d) = self.dems.take() {
            let vel = Vector2::new(d.vx_ms, d.vy_ms);
            let vel_field = match d.field_relative {
                true => vel,
                false => Rotation2::new(self.heading_rad) * vel,
            };

            self.position_m.0 += vel_field.x * dt_s;
            self.position_m.1 += vel_field.y * dt_s;
            self.heading_rad = wrap_pi(self.heading_rad + d.omega_rads * dt_s);
        }
    }
}

impl Vision for SimVision {
    fn target_visible(&self) -> bool {
        self.get_target_offset().is_some()
    }

    fn get_target_offset(&self) -> Option<TargetOffset> {
        let to_target = Vector2::new(
            self.target_m.0 - self.robot_position_m.0,
            self.target_m.1 - self.robot_position_m.1,
        );
        let rel = Rotation2::new(-self.robot_heading_rad) * to_target;
        let range_m = rel.norm();

        if range_m < self.min_range_m
            || range_m > self.max_range_m
            || rel.y.atan2(rel.x).abs() > self.half_fov_rad
        {
            return None;
        }

        Some(TargetOffset {
            forward_m: rel.x,
            lateral_m: rel.y,
            heading_delta_rad: wrap_pi(self.target_heading_rad - self.robot_heading_rad),
        })
    }
}

impl SimVision {
    /// Create a camera at the origin, facing along the x axis.
    pub fn new(
        target_m: (f64, f64),
        target_heading_rad: f64,
        min_range_m: f64,
        max_range_m: f64,
        half_fov_rad: f64,
    ) -> Self {
        Self {
            target_m,
            target_heading_rad,
            min_range_m,
            max_range_m,
            half_fov_rad,
            robot_position_m: (0.0, 0.0),
            robot_heading_rad: 0.0,
        }
    }

    /// Move the camera with the robot.
    pub fn update_pose(&mut self, position_m: (f64, f64), heading_rad: f64) {
        self.robot_position_m = position_m;
        self.robot_heading_rad = heading_rad;
    }
}

impl DigitalInputs for SimDio {
    fn read_digital(&self, channel: u8) -> bool {
        self.channels.get(&channel).copied().unwrap_or(false)
    }
}

impl MotorController for SimMotor {
    fn set_output(&mut self, percent: f64) {
        self.dem = MotorDem::Percent(percent);
    }

    fn set_position_target(&mut self, units: f64) {
        if self.dem != MotorDem::Position(units) {
            self.pid.reset();
        }
        self.dem = MotorDem::Position(units);
    }

    fn get_position(&self) -> f64 {
        self.position_units
    }

    fn configure_position_loop(&mut self, gains: PositionLoopGains) {
        self.pid = PidController::new(gains);
        self.gains = Some(gains);
    }
}

impl SimMotor {
    pub fn new(max_speed_units_s: f64, min_units: f64, max_units: f64, start_units: f64) -> Self {
        Self {
            position_units: start_units.clamp(min_units, max_units),
            max_speed_units_s,
            min_units,
            max_units,
            ..Default::default()
        }
    }

    /// Calculate the output for this step, without moving the load.
    pub fn calc_output(&mut self, dt_s: f64) -> f64 {
        let output = match self.dem {
            MotorDem::Neutral => 0.0,
            MotorDem::Percent(p) => p,
            // The position loop does nothing until it's been configured
            MotorDem::Position(target) => match self.gains {
                Some(_) => self.pid.get(target - self.position_units, dt_s),
                None => 0.0,
            },
        };

        self.output = output.clamp(-1.0, 1.0);
        self.output
    }

    /// Move the load at the given output.
    pub fn drive(&mut self, output: f64, dt_s: f64) {
        self.position_units = (self.position_units + output * self.max_speed_units_s * dt_s)
            .clamp(self.min_units, self.max_units);
    }

    /// The output calculated in the last step.
    pub fn output(&self) -> f64 {
        self.output
    }

    pub fn gains(&self) -> Option<PositionLoopGains> {
        self.gains
    }

    pub fn at_max(&self) -> bool {
        self.position_units >= self.max_units
    }

    pub fn at_min(&self) -> bool {
        self.position_units <= self.min_units
    }
}

impl Servo for SimServo {
    fn set_angle(&mut self, angle_deg: f64) {
        self.angle_deg = angle_deg;
    }
}

impl SolenoidBank for SimSolenoids {
    fn set_solenoid(&mut self, id: SolenoidId, on: bool) {
        self.solenoids.insert(id, on);
    }

    fn set_double_solenoid(&mut self, id: DoubleSolenoidId, value: PistonDem) {
        self.pistons.insert(id, value);
    }
}

impl SimSolenoids {
    pub fn is_on(&self, id: SolenoidId) -> bool {
        self.solenoids.get(&id).copied().unwrap_or(false)
    }

    pub fn piston(&self, id: DoubleSolenoidId) -> PistonDem {
        self.pistons.get(&id).copied().unwrap_or_default()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_chassis_robot_relative() {
        let mut chassis = SimChassis::new((0.0, 0.0), FRAC_PI_2);

        chassis.set_velocity(1.0, 0.0, 0.0, false);
        chassis.step(0.5);
        let (x, y) = chassis.get_position();
        assert!(x.abs() < 1e-9);
        assert!((y - 0.5).abs() < 1e-9);

        // Not commanded this step, so doesn't move
        chassis.step(0.5);
        assert!((chassis.get_position().1 - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_vision_field_of_view() {
        let mut vision = SimVision::new((2.0, 0.0), 0.0, 0.3, 4.0, 0.5);

        let offset = vision.get_target_offset().unwrap();
        assert!((offset.forward_m - 2.0).abs() < 1e-9);
        assert!(offset.lateral_m.abs() < 1e-9);

        // Facing left, the target is off to the right and out of view
        vision.update_pose((0.0, 0.0), FRAC_PI_2);
        assert!(!vision.target_visible());

        // Too close
        vision.update_pose((1.8, 0.0), 0.0);
        assert!(!vision.target_visible());
    }

    #[test]
    fn test_motor_position_loop() {
        let mut motor = SimMotor::new(100.0, 0.0, 50.0, 0.0);

        motor.set_position_target(40.0);
        assert_eq!(motor.calc_output(0.02), 0.0);

        motor.configure_position_loop(PositionLoopGains {
            k_p: 0.1,
            k_i: 0.0,
            k_d: 0.0,
        });
        for _ in 0..200 {
            let out = motor.calc_output(0.02);
            motor.drive(out, 0.02);
        }
        assert!((motor.get_position() - 40.0).abs() < 0.5);

        // Travel limits
        motor.set_output(1.0);
        for _ in 0..100 {
            let out = motor.calc_output(0.02);
            motor.drive(out, 0.02);
        }
        assert!(motor.at_max());
    }
}

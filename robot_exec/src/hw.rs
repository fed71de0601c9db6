//! # Hardware handles
//!
//! The equipment the executable reads from and writes to each cycle.

use comms_if::eqpt::{
    drive::DriveBase,
    mech::{MotorController, Servo, SolenoidBank},
    vision::Vision,
    DigitalInputs, EnableSource,
};

/// Borrowed handles to every piece of equipment used in a cycle.
pub struct Hardware<'a> {
    pub enable: &'a dyn EnableSource,
    pub drive: &'a mut dyn DriveBase,
    pub vision: &'a dyn Vision,
    pub dio: &'a dyn DigitalInputs,
    pub arm_motor: &'a mut dyn MotorController,
    pub ratchet_servo: &'a mut dyn Servo,
    pub intake_motor: &'a mut dyn MotorController,
    pub solenoids: &'a mut dyn SolenoidBank,
}

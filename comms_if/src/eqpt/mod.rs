//! # Equipment Interface
//!
//! This module defines the narrow interfaces through which the automation core reaches the
//! equipment. Implementations live outside the core: the real drivers on the robot, or the
//! simulated plant.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod drive;
pub mod mech;
pub mod vision;

// -----------------------------------------------------------------------------------------------
// TRAITS
// -----------------------------------------------------------------------------------------------

/// Source of the robot enable signal (field management or a driver station).
pub trait EnableSource {
    /// Returns true if the robot is currently allowed to actuate.
    fn is_enabled(&self) -> bool;
}

/// A bank of digital input channels, such as limit and presence switches.
pub trait DigitalInputs {
    /// Read the raw state of the given channel.
    fn read_digital(&self, channel: u8) -> bool;
}

//! # Robot Library
//!
//! This library contains the mechanism automation software of the robot: the modules driving the
//! cargo arm, intake and hatch mechanism, the automations which sequence them, and the data store
//! which runs them together in a fixed period control cycle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Arm control module - drives the cargo arm to the named heights
pub mod arm_ctrl;

/// Automation module - vision alignment and cargo sequencing
pub mod auto;

/// Global data store and control cycle
pub mod data_store;

/// Hatch mechanism module
pub mod hatch;

/// Equipment handles
pub mod hw;

/// Intake module
pub mod intake;

/// Executable parameters
pub mod params;

/// Simulated plant
pub mod sim;

/// State machine engine
pub mod sm;

/// Telecommand processing
pub mod tc_processor;

/// Telemetry snapshot
pub mod tm;

#[cfg(test)]
mod test_params;

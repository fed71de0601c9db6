//! # Automation Module
//!
//! This module provides the automations which run the robot's mechanisms through multi-stage
//! manoeuvres on the operator's behalf:
//!
//! - The vision-guided [`Aligner`](aligner::Aligner), which drives onto a vision target and then
//!   runs a task specific [`Completion`](aligner::Completion).
//! - The cargo manager [`CargoMgr`](cargo_mgr::CargoMgr), which sequences the arm and intake.
//!
//! All automations are state machines built on [`crate::sm`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Vision-guided alignment
pub mod aligner;

/// Cargo arm and intake sequencing
pub mod cargo_mgr;

/// Named field angles
pub mod field_angle;

mod params;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use params::Params;

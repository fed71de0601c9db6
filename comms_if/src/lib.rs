//! # Communications interface crate.
//!
//! Provides the interfaces between the robot's automation core and the collaborators around it:
//! the equipment it senses and drives, and the telecommands that dispatch it.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Telecommands, the events which engage the automations
pub mod tc;

/// Equipment interfaces (drive base, vision, motors, switches)
pub mod eqpt;

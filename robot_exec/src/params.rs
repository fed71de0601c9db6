//! # Robot Executable Parameters
//!
//! This module provides parameters for the robot executable, and gathers the parameters of every
//! module so they can be loaded together at startup.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{arm_ctrl, auto, hatch, intake};
use util::params::{self, LoadError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RobotExecParams {
    /// Period of the control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Digital input channels of the switches.
    pub dio: DioChannels,
}

/// Digital input channel assignments.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DioChannels {
    pub arm_top_limit: u8,
    pub arm_bottom_limit: u8,
    pub intake_presence: u8,
    pub hatch_left_presence: u8,
    pub hatch_right_presence: u8,
}

/// The parameters of every module.
#[derive(Debug, Clone, Default)]
pub struct RobotParams {
    pub exec: RobotExecParams,
    pub arm_ctrl: arm_ctrl::Params,
    pub intake: intake::Params,
    pub hatch: hatch::Params,
    pub auto: auto::Params,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RobotParams {
    /// Load all parameter files from the parameters directory.
    pub fn load() -> Result<Self, LoadError> {
        Ok(Self {
            exec: params::load("robot_exec.toml")?,
            arm_ctrl: params::load("arm_ctrl.toml")?,
            intake: params::load("intake.toml")?,
            hatch: params::load("hatch.toml")?,
            auto: params::load("auto.toml")?,
        })
    }
}

//! # Robot telemetry
//!
//! A snapshot of the status of every module and automation, serialised to JSON and logged once a
//! second by the executable.

use serde::Serialize;

use crate::{
    arm_ctrl,
    auto::{aligner, cargo_mgr},
    data_store::SafeModeCause,
    hatch, intake,
};
use comms_if::eqpt::{drive::DriveDems, vision::VisionSample};

/// Telemetry snapshot of the robot.
#[derive(Debug, Clone, Serialize)]
pub struct RobotTm {
    pub num_cycles: u64,
    pub enabled: bool,
    pub safe: bool,
    pub safe_cause: Option<SafeModeCause>,

    pub position_m: (f64, f64),
    pub heading_rad: f64,
    pub vision: VisionSample,
    pub drive_dems: Option<DriveDems>,

    pub arm_ctrl: arm_ctrl::StatusReport,
    pub arm_ctrl_output: arm_ctrl::OutputData,
    pub intake: intake::StatusReport,
    pub intake_output: f64,
    pub hatch: hatch::StatusReport,
    pub hatch_output: hatch::OutputData,

    pub hatch_deposit: aligner::StatusReport,
    pub hatch_intake: aligner::StatusReport,
    pub cargo_deposit: aligner::StatusReport,
    pub cargo_mgr: cargo_mgr::StatusReport,

    pub num_automation_errors: u64,
    pub num_rejected_tcs: u64,
}

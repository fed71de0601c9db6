//! Parameters for the unit tests, parsed from the files in the parameters directory.

use crate::{arm_ctrl, auto, hatch, intake, params::RobotExecParams, params::RobotParams, sim};
use util::params::from_str;

pub const CYCLE_PERIOD_S: f64 = 0.02;

pub fn exec() -> RobotExecParams {
    from_str(include_str!("../../params/robot_exec.toml")).unwrap()
}

pub fn arm_ctrl() -> arm_ctrl::Params {
    from_str(include_str!("../../params/arm_ctrl.toml")).unwrap()
}

pub fn intake() -> intake::Params {
    from_str(include_str!("../../params/intake.toml")).unwrap()
}

pub fn hatch() -> hatch::Params {
    from_str(include_str!("../../params/hatch.toml")).unwrap()
}

pub fn auto() -> auto::Params {
    from_str(include_str!("../../params/auto.toml")).unwrap()
}

pub fn sim() -> sim::Params {
    from_str(include_str!("../../params/sim.toml")).unwrap()
}

pub fn robot() -> RobotParams {
    RobotParams {
        exec: exec(),
        arm_ctrl: arm_ctrl(),
        intake: intake(),
        hatch: hatch(),
        auto: auto(),
    }
}

#[test]
fn test_cycle_period_matches() {
    assert_eq!(exec().cycle_period_s, CYCLE_PERIOD_S);
}

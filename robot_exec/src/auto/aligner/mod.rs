//! # Aligner
//!
//! The aligner drives the robot onto a vision target, then hands over to a [`Completion`] which
//! performs the task the alignment was for. The same approach logic serves hatch deposits, hatch
//! pickups and cargo deposits.
//!
//! States:
//!
//! - `wait_for_vision` - wait until the target is in sight.
//! - `target_tape_align` - home on the target. If the target drops out of view the robot creeps
//!   forward blind, and if it stays out of view for longer than the grace period the robot stops
//!   and the aligner moves on to `success`.
//! - `success` - run the completion until it finishes.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod completion;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt::Display;

use log::warn;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::sm::{Machine, SmError, StateAction, StateDecl, StateId, StateTick};
use comms_if::eqpt::{
    drive::DriveDems,
    vision::{TargetOffset, VisionSample},
};

pub use completion::*;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters shared by all aligners.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Speed of the robot while homing on the target.
    ///
    /// Units: meters/second
    pub alignment_speed_ms: f64,

    /// Forward speed of the robot while the target is out of sight.
    ///
    /// Units: meters/second
    pub blind_creep_speed_ms: f64,

    /// Time the target may be out of sight before the alignment is considered complete.
    ///
    /// Units: seconds
    pub lost_target_grace_s: f64,

    /// Factor the forward offset is divided by before normalising, weighting the homing
    /// direction toward closing the lateral offset.
    pub forward_divisor: f64,
}

/// A vision-guided aligner finishing with the completion `C`.
pub struct Aligner<C> {
    params: Params,

    machine: Machine<AlignState>,

    completion: C,

    /// Time in `target_tape_align` at which the target was last seen.
    last_seen_s: f64,

    report: StatusReport,
}

/// Status report of an aligner.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// Active state, `None` if the aligner is not running.
    pub state: Option<AlignState>,

    /// Time since the target was last seen while homing.
    ///
    /// Units: seconds
    pub target_age_s: f64,

    /// Number of alignments which finished because the target was lost for too long.
    pub num_blind_completions: u64,

    /// Number of completed alignments.
    pub num_completions: u64,

    /// Number of engage requests ignored because the aligner was busy.
    pub num_ignored_engages: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// States of an aligner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignState {
    WaitForVision,
    TargetTapeAlign,
    Success,
}

/// Errors which can occur during alignment.
#[derive(Debug, thiserror::Error)]
pub enum AlignerError {
    #[error("Aligner state machine error: {0}")]
    SmError(#[from] SmError),

    #[error("The alignment speed must be positive, got {0}")]
    InvalidAlignmentSpeed(f64),

    #[error("The blind creep speed must not be negative, got {0}")]
    InvalidCreepSpeed(f64),

    #[error("The lost target grace period must not be negative, got {0}")]
    InvalidGracePeriod(f64),

    #[error("The forward divisor must be positive, got {0}")]
    InvalidForwardDivisor(f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl StateId for AlignState {
    const ALL: &'static [Self] = &[
        AlignState::WaitForVision,
        AlignState::TargetTapeAlign,
        AlignState::Success,
    ];
}

impl Display for AlignState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlignState::WaitForVision => write!(f, "wait_for_vision"),
            AlignState::TargetTapeAlign => write!(f, "target_tape_align"),
            AlignState::Success => write!(f, "success"),
        }
    }
}

impl Params {
    /// Check the parameters are usable.
    pub fn validate(&self) -> Result<(), AlignerError> {
        if !(self.alignment_speed_ms > 0.0) {
            return Err(AlignerError::InvalidAlignmentSpeed(self.alignment_speed_ms));
        }

        if !(self.blind_creep_speed_ms >= 0.0) {
            return Err(AlignerError::InvalidCreepSpeed(self.blind_creep_speed_ms));
        }

        if !(self.lost_target_grace_s >= 0.0) {
            return Err(AlignerError::InvalidGracePeriod(self.lost_target_grace_s));
        }

        if !(self.forward_divisor > 0.0) {
            return Err(AlignerError::InvalidForwardDivisor(self.forward_divisor));
        }

        Ok(())
    }
}

impl<C: Completion> Aligner<C> {
    /// Create a new aligner, which will not run until engaged.
    pub fn new(params: Params, completion: C, cycle_period_s: f64) -> Result<Self, AlignerError> {
        params.validate()?;

        let machine = Machine::new(
            C::NAME,
            vec![
                StateDecl::new(AlignState::WaitForVision)
                    .first()
                    .next(&[AlignState::TargetTapeAlign]),
                StateDecl::new(AlignState::TargetTapeAlign)
                    .must_finish()
                    .next(&[AlignState::Success]),
                StateDecl::new(AlignState::Success).must_finish(),
            ],
            cycle_period_s,
        )?;

        Ok(Self {
            params,
            machine,
            completion,
            last_seen_s: 0.0,
            report: StatusReport::default(),
        })
    }

    pub fn name(&self) -> &'static str {
        C::NAME
    }

    /// Start the alignment from `wait_for_vision`.
    ///
    /// Returns true if the request was accepted.
    pub fn engage(&mut self, force: bool) -> bool {
        self.machine.engage_first(force)
    }

    /// Start the aligner in the given state.
    pub fn engage_in(&mut self, state: AlignState, force: bool) -> bool {
        self.machine.engage(state, force)
    }

    /// Returns true if the aligner is running a state which must finish, i.e. it has the drive.
    pub fn is_must_finish(&self) -> bool {
        self.machine.is_must_finish()
    }

    /// Returns true if the aligner is not running.
    pub fn is_done(&self) -> bool {
        self.machine.is_done()
    }

    pub fn state(&self) -> Option<AlignState> {
        self.machine.current_state()
    }

    /// Stop the aligner without commanding anything.
    pub fn reset(&mut self) {
        self.machine.reset();
        self.last_seen_s = 0.0;
        self.report.target_age_s = 0.0;
    }

    pub fn report(&self) -> StatusReport {
        let machine_report = self.machine.report();

        StatusReport {
            state: self.machine.current_state(),
            num_completions: machine_report.num_completions,
            num_ignored_engages: machine_report.num_ignored_engages,
            ..self.report
        }
    }

    /// Run the active state for this cycle.
    ///
    /// Drive demands are written to `drive_dems`, which is left untouched in states which do not
    /// command the drive.
    pub fn step(
        &mut self,
        vision: &VisionSample,
        drive_dems: &mut Option<DriveDems>,
        mechs: &mut AlignMechs<'_>,
    ) -> Result<(), AlignerError> {
        let tick = match self.machine.tick() {
            Some(t) => t,
            None => return Ok(()),
        };

        let action = match tick.state {
            AlignState::WaitForVision => match vision.visible {
                true => StateAction::Next(AlignState::TargetTapeAlign),
                false => StateAction::Stay,
            },
            AlignState::TargetTapeAlign => self.target_tape_align(&tick, vision, drive_dems),
            AlignState::Success => self.completion.on_success(&tick, mechs),
        };

        self.machine.end_tick(action)?;

        Ok(())
    }

    fn target_tape_align(
        &mut self,
        tick: &StateTick<AlignState>,
        vision: &VisionSample,
        drive_dems: &mut Option<DriveDems>,
    ) -> StateAction<AlignState> {
        if tick.initial_call {
            self.last_seen_s = tick.elapsed_s;
        }

        if vision.visible {
            self.last_seen_s = tick.elapsed_s;
            self.report.target_age_s = 0.0;
            *drive_dems = Some(homing_dems(&vision.offset, &self.params));
            return StateAction::Stay;
        }

        self.report.target_age_s = tick.elapsed_s - self.last_seen_s;

        if self.report.target_age_s > self.params.lost_target_grace_s {
            warn!(
                "{}: target out of sight for {:.2} s, finishing alignment blind",
                C::NAME,
                self.report.target_age_s
            );
            self.report.num_blind_completions += 1;
            *drive_dems = Some(DriveDems::stop());
            StateAction::Next(AlignState::Success)
        } else {
            *drive_dems = Some(DriveDems::robot_relative(
                self.params.blind_creep_speed_ms,
                0.0,
            ));
            StateAction::Stay
        }
    }
}

/// Calculate the robot relative drive demands homing on a visible target.
///
/// The forward offset is scaled down by the forward divisor before the offset is normalised, and
/// the resulting direction is driven at the alignment speed. A zero offset gives zero velocity.
pub fn homing_dems(offset: &TargetOffset, params: &Params) -> DriveDems {
    let aim = Vector2::new(offset.forward_m / params.forward_divisor, offset.lateral_m);

    match aim.try_normalize(f64::EPSILON) {
        Some(dir) => {
            let vel = dir * params.alignment_speed_ms;
            DriveDems::robot_relative(vel.x, vel.y)
        }
        None => DriveDems::stop(),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        auto::cargo_mgr::{CargoMgr, CargoState},
        hatch::Hatch,
        test_params,
    };

    struct Rig {
        hatch: Hatch,
        cargo: CargoMgr,
    }

    impl Rig {
        fn new() -> Self {
            let mut hatch = Hatch::new(test_params::hatch()).unwrap();
            hatch.on_enable();

            Self {
                hatch,
                cargo: CargoMgr::new(
                    test_params::auto().cargo_mgr,
                    test_params::CYCLE_PERIOD_S,
                )
                .unwrap(),
            }
        }

        fn step<C: Completion>(
            &mut self,
            aligner: &mut Aligner<C>,
            vision: &VisionSample,
        ) -> Option<DriveDems> {
            let mut drive_dems = None;
            let mut mechs = AlignMechs {
                hatch: &mut self.hatch,
                cargo: &mut self.cargo,
            };
            aligner.step(vision, &mut drive_dems, &mut mechs).unwrap();
            drive_dems
        }
    }

    fn params() -> Params {
        test_params::auto().aligner
    }

    fn hatch_intake() -> Aligner<HatchIntake> {
        Aligner::new(params(), HatchIntake, test_params::CYCLE_PERIOD_S).unwrap()
    }

    fn lost_target_cycles() -> usize {
        (params().lost_target_grace_s / test_params::CYCLE_PERIOD_S).round() as usize
    }

    #[test]
    fn test_params_validation() {
        assert!(params().validate().is_ok());

        let mut p = params();
        p.forward_divisor = 0.0;
        assert!(matches!(
            Aligner::new(p, HatchIntake, test_params::CYCLE_PERIOD_S),
            Err(AlignerError::InvalidForwardDivisor(_))
        ));

        let mut p = params();
        p.alignment_speed_ms = -1.0;
        assert!(matches!(
            p.validate(),
            Err(AlignerError::InvalidAlignmentSpeed(_))
        ));

        let mut p = params();
        p.lost_target_grace_s = -0.5;
        assert!(matches!(p.validate(), Err(AlignerError::InvalidGracePeriod(_))));

        let mut p = params();
        p.blind_creep_speed_ms = std::f64::NAN;
        assert!(matches!(p.validate(), Err(AlignerError::InvalidCreepSpeed(_))));
    }

    #[test]
    fn test_homing_dems() {
        let params = params();

        let dems = homing_dems(&VisionSample::seen(0.3, -0.1).offset, &params);
        let expected = std::f64::consts::FRAC_1_SQRT_2 * params.alignment_speed_ms;
        assert!((dems.vx_ms - expected).abs() < 1e-9);
        assert!((dems.vy_ms + expected).abs() < 1e-9);
        assert!(!dems.field_relative);

        // Never faster than the alignment speed, and in the direction of the offset
        for &(fwd, lat) in [(2.0, 0.5), (0.1, -1.5), (-0.4, 0.01), (5.0, 0.0)].iter() {
            let dems = homing_dems(&VisionSample::seen(fwd, lat).offset, &params);
            assert!(dems.speed_ms() <= params.alignment_speed_ms + 1e-9);
            assert_eq!(dems.vx_ms.signum(), fwd.signum());
            if lat != 0.0 {
                assert_eq!(dems.vy_ms.signum(), lat.signum());
            }
        }

        // Zero offset is zero velocity, not NaN
        let dems = homing_dems(&VisionSample::seen(0.0, 0.0).offset, &params);
        assert_eq!(dems, DriveDems::stop());
    }

    #[test]
    fn test_waits_for_vision() {
        let mut rig = Rig::new();
        let mut aligner = hatch_intake();

        // Not engaged, nothing happens
        assert_eq!(rig.step(&mut aligner, &VisionSample::seen(1.0, 0.0)), None);

        assert!(aligner.engage(false));
        for _ in 0..50 {
            assert_eq!(rig.step(&mut aligner, &VisionSample::lost()), None);
        }
        assert_eq!(aligner.state(), Some(AlignState::WaitForVision));

        rig.step(&mut aligner, &VisionSample::seen(1.0, 0.2));
        assert_eq!(aligner.state(), Some(AlignState::TargetTapeAlign));
        assert!(rig
            .step(&mut aligner, &VisionSample::seen(1.0, 0.2))
            .is_some());
    }

    #[test]
    fn test_lost_target() {
        let mut rig = Rig::new();
        let mut aligner = hatch_intake();
        let params = params();

        aligner.engage_in(AlignState::TargetTapeAlign, false);
        rig.step(&mut aligner, &VisionSample::seen(0.5, 0.0));

        // Blind creep forward for the grace period
        for _ in 0..lost_target_cycles() {
            let dems = rig.step(&mut aligner, &VisionSample::lost()).unwrap();
            assert_eq!(
                dems,
                DriveDems::robot_relative(params.blind_creep_speed_ms, 0.0)
            );
            assert_eq!(aligner.state(), Some(AlignState::TargetTapeAlign));
        }

        // Then stop and finish in the same cycle
        let dems = rig.step(&mut aligner, &VisionSample::lost()).unwrap();
        assert_eq!(dems, DriveDems::stop());
        assert_eq!(aligner.state(), Some(AlignState::Success));
        assert_eq!(aligner.report().num_blind_completions, 1);

        // Hatch intake marks the hatch as held and finishes
        assert!(!rig.hatch.has_hatch());
        rig.step(&mut aligner, &VisionSample::lost());
        assert!(rig.hatch.has_hatch());
        assert!(aligner.is_done());
        assert_eq!(aligner.report().num_completions, 1);
    }

    #[test]
    fn test_sighting_resets_lost_timer() {
        let mut rig = Rig::new();
        let mut aligner = hatch_intake();

        aligner.engage_in(AlignState::TargetTapeAlign, false);

        for _ in 0..5 {
            for _ in 0..lost_target_cycles() - 1 {
                rig.step(&mut aligner, &VisionSample::lost());
            }
            rig.step(&mut aligner, &VisionSample::seen(0.5, 0.1));
        }

        assert_eq!(aligner.state(), Some(AlignState::TargetTapeAlign));
        assert_eq!(aligner.report().target_age_s, 0.0);
    }

    #[test]
    fn test_must_finish() {
        let mut aligner = hatch_intake();

        aligner.engage_in(AlignState::TargetTapeAlign, false);
        assert!(!aligner.engage(false));
        assert_eq!(aligner.state(), Some(AlignState::TargetTapeAlign));

        assert!(aligner.engage(true));
        assert_eq!(aligner.state(), Some(AlignState::WaitForVision));
    }

    #[test]
    fn test_hatch_deposit() {
        let mut rig = Rig::new();
        let deposit = HatchDeposit::new(test_params::auto().hatch_deposit);
        let mut aligner = Aligner::new(params(), deposit, test_params::CYCLE_PERIOD_S).unwrap();
        let hold_cycles = (test_params::auto().hatch_deposit.hold_time_s
            / test_params::CYCLE_PERIOD_S)
            .round() as usize;

        aligner.engage_in(AlignState::Success, false);
        rig.step(&mut aligner, &VisionSample::lost());
        assert!(rig.hatch.is_punch_on());
        assert_eq!(rig.hatch.report().num_punches, 1);

        for _ in 0..hold_cycles {
            rig.step(&mut aligner, &VisionSample::lost());
            assert!(!aligner.is_done());
        }
        rig.step(&mut aligner, &VisionSample::lost());
        assert!(aligner.is_done());

        // Only one punch per alignment
        assert_eq!(rig.hatch.report().num_punches, 1);
    }

    #[test]
    fn test_cargo_deposit() {
        let mut rig = Rig::new();
        let mut aligner =
            Aligner::new(params(), CargoDeposit, test_params::CYCLE_PERIOD_S).unwrap();

        aligner.engage_in(AlignState::Success, false);
        rig.step(&mut aligner, &VisionSample::lost());

        assert!(aligner.is_done());
        assert_eq!(rig.cargo.state(), Some(CargoState::OuttakingCargo));
    }
}

//! # Cargo manager
//!
//! Sequences the arm and intake to pick up and eject cargo. Each entry point engages the same
//! state machine in a different state, and every state must finish before another entry point is
//! accepted, unless forced.
//!
//! ```text
//!  move_to_floor ----------.
//!  move_to_loading_station -+--> intaking_cargo --> done
//!  move_to_rocket ---------.
//!  move_to_ship -----------+--> outtaking_cargo --> done
//!                  outtake -'
//!
//!  any move state -- watchdog --> fault --> done
//! ```
//!
//! Move states first set the ratchet for the direction of travel and give it time to settle
//! before commanding the arm. If the arm doesn't reach height before the watchdog expires the
//! sequence faults, unless the override flag is set, in which case the sequence carries on as if
//! the arm had arrived.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt::Display;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    arm_ctrl::ArmCtrl,
    intake::Intake,
    sm::{Machine, SmError, StateAction, StateDecl, StateId, StateTick},
};
use comms_if::tc::arm::Height;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the cargo manager.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Time allowed for the ratchet to move before the arm is commanded.
    ///
    /// Units: seconds
    pub ratchet_time_s: f64,

    /// Maximum time spent ejecting cargo if the presence switch never clears.
    ///
    /// Units: seconds
    pub outtake_timeout_s: f64,

    /// Maximum time the arm may take to reach height once commanded.
    ///
    /// Units: seconds
    pub move_watchdog_s: f64,
}

/// The cargo manager.
pub struct CargoMgr {
    params: Params,

    machine: Machine<CargoState>,

    report: StatusReport,
}

/// Status report of the cargo manager.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// Active state, `None` if the manager is not running.
    pub state: Option<CargoState>,

    pub override_set: bool,

    /// Number of move states which the watchdog cut short.
    pub num_watchdog_trips: u64,

    /// Number of sequences which ended in `fault`.
    pub num_faults: u64,

    /// Number of ejections which ended on the timeout rather than the presence switch.
    pub num_outtake_timeouts: u64,

    /// Number of completed sequences, faults included.
    pub num_completions: u64,

    /// Number of entry point requests ignored because a sequence was running.
    pub num_ignored_engages: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// States of the cargo manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CargoState {
    MoveToFloor,
    MoveToLoadingStation,
    MoveToRocket,
    MoveToShip,
    IntakingCargo,
    OuttakingCargo,
    Fault,
}

/// Errors which can occur in the cargo manager.
#[derive(Debug, thiserror::Error)]
pub enum CargoMgrError {
    #[error("Cargo manager state machine error: {0}")]
    SmError(#[from] SmError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl StateId for CargoState {
    const ALL: &'static [Self] = &[
        CargoState::MoveToFloor,
        CargoState::MoveToLoadingStation,
        CargoState::MoveToRocket,
        CargoState::MoveToShip,
        CargoState::IntakingCargo,
        CargoState::OuttakingCargo,
        CargoState::Fault,
    ];
}

impl Display for CargoState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CargoState::MoveToFloor => "move_to_floor",
            CargoState::MoveToLoadingStation => "move_to_loading_station",
            CargoState::MoveToRocket => "move_to_rocket",
            CargoState::MoveToShip => "move_to_ship",
            CargoState::IntakingCargo => "intaking_cargo",
            CargoState::OuttakingCargo => "outtaking_cargo",
            CargoState::Fault => "fault",
        };
        write!(f, "{}", name)
    }
}

impl CargoState {
    /// For move states, the height to move to and the state which follows the move.
    fn move_target(&self) -> Option<(Height, CargoState)> {
        match self {
            CargoState::MoveToFloor => Some((Height::Floor, CargoState::IntakingCargo)),
            CargoState::MoveToLoadingStation => {
                Some((Height::LoadingStation, CargoState::IntakingCargo))
            }
            CargoState::MoveToRocket => Some((Height::RocketShip, CargoState::OuttakingCargo)),
            CargoState::MoveToShip => Some((Height::CargoShip, CargoState::OuttakingCargo)),
            _ => None,
        }
    }
}

impl CargoMgr {
    /// Create a new cargo manager, which will not run until engaged.
    pub fn new(params: Params, cycle_period_s: f64) -> Result<Self, SmError> {
        let to_intake = [CargoState::IntakingCargo, CargoState::Fault];
        let to_outtake = [CargoState::OuttakingCargo, CargoState::Fault];

        let machine = Machine::new(
            "cargo_mgr",
            vec![
                StateDecl::new(CargoState::MoveToFloor)
                    .first()
                    .must_finish()
                    .next(&to_intake),
                StateDecl::new(CargoState::MoveToLoadingStation)
                    .must_finish()
                    .next(&to_intake),
                StateDecl::new(CargoState::MoveToRocket)
                    .must_finish()
                    .next(&to_outtake),
                StateDecl::new(CargoState::MoveToShip)
                    .must_finish()
                    .next(&to_outtake),
                StateDecl::new(CargoState::IntakingCargo).must_finish(),
                StateDecl::new(CargoState::OuttakingCargo).must_finish(),
                StateDecl::new(CargoState::Fault).must_finish(),
            ],
            cycle_period_s,
        )?;

        Ok(Self {
            params,
            machine,
            report: StatusReport::default(),
        })
    }

    // ---- ENTRY POINTS ----

    /// Lower the arm to the floor and intake cargo.
    pub fn intake_floor(&mut self, force: bool) -> bool {
        self.machine.engage(CargoState::MoveToFloor, force)
    }

    /// Raise the arm to the loading station and intake cargo.
    pub fn intake_loading(&mut self, force: bool) -> bool {
        self.machine.engage(CargoState::MoveToLoadingStation, force)
    }

    /// Move the arm to the rocket height and eject cargo.
    pub fn outtake_to_rocket(&mut self, force: bool) -> bool {
        self.machine.engage(CargoState::MoveToRocket, force)
    }

    /// Move the arm to the cargo ship height and eject cargo.
    pub fn outtake_to_ship(&mut self, force: bool) -> bool {
        self.machine.engage(CargoState::MoveToShip, force)
    }

    /// Eject cargo at the current height.
    pub fn outtake(&mut self, force: bool) -> bool {
        self.machine.engage(CargoState::OuttakingCargo, force)
    }

    pub fn set_override(&mut self, override_set: bool) {
        info!("cargo_mgr: override {}", override_set);
        self.machine.set_override(override_set);
    }

    pub fn is_override(&self) -> bool {
        self.machine.is_override()
    }

    /// Returns true if no sequence is running.
    pub fn is_done(&self) -> bool {
        self.machine.is_done()
    }

    /// The active state, which identifies the entry point the running sequence came from.
    pub fn state(&self) -> Option<CargoState> {
        self.machine.current_state()
    }

    /// Stop any running sequence and clear the override flag.
    pub fn reset(&mut self) {
        self.machine.reset();
    }

    pub fn report(&self) -> StatusReport {
        let machine_report = self.machine.report();

        StatusReport {
            state: self.machine.current_state(),
            override_set: self.machine.is_override(),
            num_completions: machine_report.num_completions,
            num_ignored_engages: machine_report.num_ignored_engages,
            ..self.report
        }
    }

    /// Run the active state for this cycle.
    pub fn step(&mut self, arm: &mut ArmCtrl, intake: &mut Intake) -> Result<(), CargoMgrError> {
        let tick = match self.machine.tick() {
            Some(t) => t,
            None => return Ok(()),
        };

        let action = match tick.state.move_target() {
            Some((height, next)) => self.move_to_height(&tick, arm, height, next),
            None => match tick.state {
                CargoState::IntakingCargo => {
                    Self::reassert_ratchet(arm);
                    Self::intaking_cargo(intake)
                }
                CargoState::OuttakingCargo => {
                    Self::reassert_ratchet(arm);
                    self.outtaking_cargo(&tick, intake)
                }
                _ => self.fault(arm, intake),
            },
        };

        // Nothing else holds the arm once the sequence ends
        if action == StateAction::Done {
            arm.ratchet();
        }

        self.machine.end_tick(action)?;

        Ok(())
    }

    // ---- STATES ----

    fn move_to_height(
        &mut self,
        tick: &StateTick<CargoState>,
        arm: &mut ArmCtrl,
        height: Height,
        next: CargoState,
    ) -> StateAction<CargoState> {
        if tick.initial_call {
            // The ratchet only needs releasing if it would hold the arm back
            match arm.travel_dir_to(height) {
                Some(dir) if dir == arm.ratchet_blocked_dir() => arm.unratchet(),
                _ => arm.ratchet(),
            }
            return StateAction::Stay;
        }

        if tick.elapsed_s <= self.params.ratchet_time_s {
            return StateAction::Stay;
        }

        arm.move_to(height);

        if arm.at_height() {
            return StateAction::Next(next);
        }

        if tick.elapsed_s > self.params.ratchet_time_s + self.params.move_watchdog_s {
            self.report.num_watchdog_trips += 1;

            if tick.override_set {
                warn!(
                    "cargo_mgr: arm not at {} after {:.2} s, continuing on override",
                    height, tick.elapsed_s
                );
                return StateAction::Next(next);
            }

            error!(
                "cargo_mgr: arm not at {} after {:.2} s, aborting",
                height, tick.elapsed_s
            );
            return StateAction::Next(CargoState::Fault);
        }

        StateAction::Stay
    }

    fn intaking_cargo(intake: &mut Intake) -> StateAction<CargoState> {
        if intake.is_contained() {
            intake.stop();
            StateAction::Done
        } else {
            intake.intake();
            StateAction::Stay
        }
    }

    fn outtaking_cargo(
        &mut self,
        tick: &StateTick<CargoState>,
        intake: &mut Intake,
    ) -> StateAction<CargoState> {
        if !intake.is_contained() {
            intake.stop();
            return StateAction::Done;
        }

        if tick.elapsed_s > self.params.outtake_timeout_s {
            warn!("cargo_mgr: cargo still detected after outtake timeout");
            self.report.num_outtake_timeouts += 1;
            intake.stop();
            return StateAction::Done;
        }

        intake.outtake();
        StateAction::Stay
    }

    fn fault(&mut self, arm: &mut ArmCtrl, intake: &mut Intake) -> StateAction<CargoState> {
        self.report.num_faults += 1;
        arm.stop();
        intake.stop();
        StateAction::Done
    }

    /// Engage the ratchet unless the arm is still travelling in the direction it blocks.
    ///
    /// A forced preemption can leave the ratchet released by a move state which never finished.
    fn reassert_ratchet(arm: &mut ArmCtrl) {
        let travel = arm.target().and_then(|h| arm.travel_dir_to(h));
        if travel != Some(arm.ratchet_blocked_dir()) {
            arm.ratchet();
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{arm_ctrl, intake, test_params};
    use comms_if::eqpt::mech::MotorDem;
    use util::module::State;

    struct Rig {
        arm: ArmCtrl,
        intake: Intake,
        cargo: CargoMgr,
        arm_units: f64,
        presence: bool,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                arm: ArmCtrl::new(test_params::arm_ctrl(), test_params::CYCLE_PERIOD_S).unwrap(),
                intake: Intake::new(test_params::intake()).unwrap(),
                cargo: CargoMgr::new(test_params::auto().cargo_mgr, test_params::CYCLE_PERIOD_S)
                    .unwrap(),
                arm_units: 0.0,
                presence: false,
            }
        }

        /// Run one cycle, returning the intake output.
        fn cycle(&mut self) -> f64 {
            self.arm.sense(&arm_ctrl::InputData {
                position_units: self.arm_units,
                ..Default::default()
            });
            self.intake.sense(&intake::InputData {
                presence_switch: self.presence,
            });

            self.cargo.step(&mut self.arm, &mut self.intake).unwrap();

            self.arm.proc().unwrap();
            self.intake.proc().unwrap().0
        }

        /// Run cycles with the arm teleporting to any closed loop target, until the cargo manager
        /// leaves its current state.
        fn cycle_until_state_change(&mut self, max_cycles: usize) {
            let start = self.cargo.state();
            for _ in 0..max_cycles {
                self.cycle();
                if let MotorDem::Position(u) = self.arm.output().motor {
                    self.arm_units = u;
                }
                if self.cargo.state() != start {
                    return;
                }
            }
            panic!("Cargo manager stuck in {:?}", start);
        }
    }

    #[test]
    fn test_intake_floor() {
        let mut rig = Rig::new();
        let params = test_params::arm_ctrl();
        rig.arm_units = params.height_to_units(Height::CargoShip);

        assert!(rig.cargo.intake_floor(false));
        rig.cycle();

        // Downwards travel is blocked by the ratchet, so it is released first
        assert!(!rig.arm.is_ratchet_engaged());
        assert_eq!(rig.arm.target(), None);

        rig.cycle_until_state_change(200);
        assert_eq!(rig.cargo.state(), Some(CargoState::IntakingCargo));
        assert_eq!(rig.arm.target(), Some(Height::Floor));

        assert_eq!(rig.cycle(), test_params::intake().intake_speed);
        assert_eq!(rig.cycle(), test_params::intake().intake_speed);

        // Contained at this cycle: output zero and completed in the same cycle
        rig.presence = true;
        assert_eq!(rig.cycle(), 0.0);
        assert!(rig.cargo.is_done());
        assert_eq!(rig.cargo.report().num_completions, 1);
    }

    #[test]
    fn test_entry_points_must_finish() {
        let mut rig = Rig::new();

        assert!(rig.cargo.intake_loading(false));
        for _ in 0..3 {
            rig.cycle();
        }

        assert!(!rig.cargo.outtake_to_rocket(false));
        assert!(!rig.cargo.intake_floor(false));
        assert_eq!(rig.cargo.state(), Some(CargoState::MoveToLoadingStation));
        assert_eq!(rig.cargo.report().num_ignored_engages, 2);

        assert!(rig.cargo.outtake_to_ship(true));
        assert_eq!(rig.cargo.state(), Some(CargoState::MoveToShip));
    }

    #[test]
    fn test_outtake_timeout() {
        let mut rig = Rig::new();
        let timeout_cycles = (test_params::auto().cargo_mgr.outtake_timeout_s
            / test_params::CYCLE_PERIOD_S)
            .round() as usize;

        // Cargo that never leaves
        rig.presence = true;
        rig.cycle();
        assert!(rig.cargo.outtake(false));

        for _ in 0..=timeout_cycles {
            assert_eq!(rig.cycle(), -test_params::intake().outtake_speed);
        }

        assert_eq!(rig.cycle(), 0.0);
        assert!(rig.cargo.is_done());
        assert_eq!(rig.cargo.report().num_outtake_timeouts, 1);
    }

    #[test]
    fn test_outtake_until_clear() {
        let mut rig = Rig::new();

        rig.presence = true;
        rig.cycle();
        rig.cargo.outtake(false);
        rig.cycle();
        rig.cycle();

        rig.presence = false;
        assert_eq!(rig.cycle(), 0.0);
        assert!(rig.cargo.is_done());
        assert_eq!(rig.cargo.report().num_outtake_timeouts, 0);
    }

    #[test]
    fn test_watchdog() {
        let params = test_params::auto().cargo_mgr;
        let watchdog_cycles = ((params.ratchet_time_s + params.move_watchdog_s)
            / test_params::CYCLE_PERIOD_S)
            .round() as usize
            + 2;

        // The arm never moves, so the watchdog faults the sequence
        let mut rig = Rig::new();
        rig.cargo.outtake_to_rocket(false);
        for _ in 0..watchdog_cycles {
            rig.cycle();
        }
        assert_eq!(rig.cargo.state(), Some(CargoState::Fault));
        rig.cycle();
        assert!(rig.cargo.is_done());
        assert_eq!(rig.cargo.report().num_faults, 1);
        assert_eq!(rig.cargo.report().num_watchdog_trips, 1);

        // The stalled arm is no longer driven
        for _ in 0..100 {
            rig.cycle();
            assert_eq!(rig.arm.output().motor, MotorDem::Neutral);
        }
        assert_eq!(rig.arm.target(), None);
        assert!(rig.arm.is_ratchet_engaged());

        // With the override set it carries on instead
        let mut rig = Rig::new();
        rig.cargo.set_override(true);
        rig.cargo.outtake_to_rocket(false);
        for _ in 0..watchdog_cycles {
            rig.cycle();
        }
        assert_eq!(rig.cargo.state(), Some(CargoState::OuttakingCargo));
        assert_eq!(rig.cargo.report().num_faults, 0);
        assert_eq!(rig.cargo.report().num_watchdog_trips, 1);
    }

    #[test]
    fn test_forced_preemption_reasserts_ratchet() {
        let mut rig = Rig::new();
        let params = test_params::arm_ctrl();
        rig.arm_units = params.height_to_units(Height::CargoShip);

        // Heading down to the floor, which releases the ratchet
        rig.cargo.intake_floor(false);
        rig.cycle();
        assert!(!rig.arm.is_ratchet_engaged());

        // Forced straight into ejecting before the arm was commanded
        rig.presence = true;
        assert!(rig.cargo.outtake(true));
        rig.cycle();
        assert_eq!(rig.cargo.state(), Some(CargoState::OuttakingCargo));
        assert!(rig.arm.is_ratchet_engaged());

        rig.presence = false;
        rig.cycle();
        assert!(rig.cargo.is_done());
        assert!(rig.arm.is_ratchet_engaged());
    }

    #[test]
    fn test_ratchet_engaged_when_done() {
        let mut rig = Rig::new();
        let params = test_params::arm_ctrl();
        rig.arm_units = params.height_to_units(Height::CargoShip);

        // Part way down to the floor, with the arm moving in the direction the ratchet blocks
        rig.cargo.intake_floor(false);
        for _ in 0..10 {
            rig.cycle();
        }
        assert_eq!(rig.arm.target(), Some(Height::Floor));
        assert!(!rig.arm.is_ratchet_engaged());

        // The preempting sequence keeps it released while the arm travels, then ends with it
        // engaged
        rig.presence = true;
        rig.cargo.outtake(true);
        rig.cycle();
        assert!(!rig.arm.is_ratchet_engaged());

        rig.presence = false;
        rig.cycle();
        assert!(rig.cargo.is_done());
        assert!(rig.arm.is_ratchet_engaged());
    }
}

//! # Data Store
//!
//! The data store owns every module and automation of the robot, and runs the control cycle:
//!
//! 1. sense - sample the equipment and hand the readings to the modules,
//! 2. telecommands - call the entry points of the automations and modules,
//! 3. automations - the aligners, then the cargo manager,
//! 4. module processing - arm, intake and hatch turn their commands into demands,
//! 5. flush - send the demands to the equipment.
//!
//! The robot starts in safe mode, and enters it again whenever the enable line drops. Entering
//! safe mode stops every automation and sends neutral demands to the equipment immediately.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::{
    arm_ctrl::{self, ArmCtrl, ArmCtrlError},
    auto::{
        aligner::{
            AlignMechs, Aligner, AlignerError, CargoDeposit, Completion, HatchDeposit,
            HatchIntake,
        },
        cargo_mgr::CargoMgr,
    },
    hatch::{self, Hatch, HatchError},
    hw::Hardware,
    intake::{self, Intake, IntakeError},
    params::{DioChannels, RobotParams},
    sm::SmError,
    tc_processor,
    tm::RobotTm,
};
use comms_if::{
    eqpt::{
        drive::DriveDems,
        mech::{DoubleSolenoidId, SolenoidId},
        vision::VisionSample,
    },
    tc::Tc,
};
use util::module::State;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Gives the reason the robot has been put into safe mode
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize)]
pub enum SafeModeCause {
    /// The enable line is low.
    Disabled,
    MakeSafeTc,
}

/// Errors which can occur while building the data store.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("The cycle period must be positive, got {0}")]
    InvalidCyclePeriod(f64),

    #[error("Could not initialise ArmCtrl: {0}")]
    ArmCtrl(#[from] ArmCtrlError),

    #[error("Could not initialise the intake: {0}")]
    Intake(#[from] IntakeError),

    #[error("Could not initialise the hatch mechanism: {0}")]
    Hatch(#[from] HatchError),

    #[error("Invalid automation state machine: {0}")]
    StateMachine(#[from] SmError),

    #[error("Could not initialise the aligners: {0}")]
    Aligner(#[from] AlignerError),
}

/// The vision aligners, which share the drive base.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum AlignTask {
    HatchDeposit,
    HatchIntake,
    CargoDeposit,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u64,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    cycle_period_s: f64,

    dio: DioChannels,

    // Safe mode variables
    /// Determines if the robot is in safe mode.
    pub safe: bool,

    /// Gives the reason for the robot being in safe mode.
    pub safe_cause: Option<SafeModeCause>,

    /// State of the enable line on the last cycle.
    pub enabled: bool,

    // Sensor data
    pub vision: VisionSample,
    pub position_m: (f64, f64),
    pub heading_rad: f64,

    // Drive demands, written by the aligners
    pub drive_dems: Option<DriveDems>,

    // ArmCtrl
    pub arm_ctrl: ArmCtrl,
    pub arm_ctrl_output: arm_ctrl::OutputData,
    pub arm_ctrl_status_rpt: arm_ctrl::StatusReport,

    /// Set when the arm motor's position loop must be configured on the next flush.
    configure_arm_loop: bool,

    // Intake
    pub intake: Intake,
    pub intake_output: f64,
    pub intake_status_rpt: intake::StatusReport,

    // Hatch
    pub hatch: Hatch,
    pub hatch_output: hatch::OutputData,
    pub hatch_status_rpt: hatch::StatusReport,

    // Automations
    pub hatch_deposit: Aligner<HatchDeposit>,
    pub hatch_intake: Aligner<HatchIntake>,
    pub cargo_deposit: Aligner<CargoDeposit>,
    pub cargo_mgr: CargoMgr,

    // Monitoring Counters
    /// Number of automations stopped because of an error.
    pub num_automation_errors: u64,

    /// Number of telecommands which could not be executed.
    pub num_rejected_tcs: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Build every module and automation from the parameters.
    ///
    /// The data store starts disabled and in safe mode.
    pub fn new(params: RobotParams) -> Result<Self, InitError> {
        let period_s = params.exec.cycle_period_s;
        if !(period_s > 0.0) {
            return Err(InitError::InvalidCyclePeriod(period_s));
        }

        let arm_ctrl = ArmCtrl::new(params.arm_ctrl, period_s)?;
        let intake = Intake::new(params.intake)?;
        let hatch = Hatch::new(params.hatch)?;

        let auto = params.auto;

        Ok(Self {
            num_cycles: 0,
            is_1_hz_cycle: false,
            cycle_period_s: period_s,
            dio: params.exec.dio,
            safe: true,
            safe_cause: Some(SafeModeCause::Disabled),
            enabled: false,
            vision: VisionSample::default(),
            position_m: (0.0, 0.0),
            heading_rad: 0.0,
            drive_dems: None,
            arm_ctrl_output: arm_ctrl.output(),
            arm_ctrl_status_rpt: arm_ctrl.report(),
            arm_ctrl,
            configure_arm_loop: false,
            intake_output: intake.output(),
            intake_status_rpt: intake.report(),
            intake,
            hatch_output: hatch.output(),
            hatch_status_rpt: hatch.report(),
            hatch,
            hatch_deposit: Aligner::new(
                auto.aligner.clone(),
                HatchDeposit::new(auto.hatch_deposit),
                period_s,
            )?,
            hatch_intake: Aligner::new(auto.aligner.clone(), HatchIntake, period_s)?,
            cargo_deposit: Aligner::new(auto.aligner, CargoDeposit, period_s)?,
            cargo_mgr: CargoMgr::new(auto.cargo_mgr, period_s)?,
            num_automation_errors: 0,
            num_rejected_tcs: 0,
        })
    }

    /// Engage one of the aligners.
    ///
    /// Only one aligner may command the drive base. Unless forced, the request is ignored while
    /// another aligner is in a state which must finish. An accepted request stops the others.
    ///
    /// Returns true if the request was accepted.
    pub fn engage_aligner(&mut self, task: AlignTask, force: bool) -> bool {
        if !force {
            let holder = AlignTask::ALL
                .iter()
                .copied()
                .find(|&t| t != task && self.aligner_must_finish(t));

            if let Some(holder) = holder {
                debug!("{:?} engage ignored, {:?} has the drive", task, holder);
                return false;
            }
        }

        let accepted = match task {
            AlignTask::HatchDeposit => self.hatch_deposit.engage(force),
            AlignTask::HatchIntake => self.hatch_intake.engage(force),
            AlignTask::CargoDeposit => self.cargo_deposit.engage(force),
        };

        if accepted {
            for &other in AlignTask::ALL.iter().filter(|&&t| t != task) {
                self.stop_aligner(other, task);
            }
        }

        accepted
    }

    pub fn cycle_period_s(&self) -> f64 {
        self.cycle_period_s
    }

    /// Run a full control cycle against the given equipment.
    pub fn run_cycle(&mut self, hw: &mut Hardware, tcs: &[Tc]) {
        self.cycle_start();
        self.check_enable(hw);
        self.sense(hw);

        for tc in tcs {
            tc_processor::exec(self, tc);
        }

        self.step_automations();
        self.proc_modules();
        self.flush(hw);

        self.num_cycles += 1;
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self) {
        let cycles_per_s = ((1.0 / self.cycle_period_s).round() as u64).max(1);
        self.is_1_hz_cycle = self.num_cycles % cycles_per_s == 0;

        self.drive_dems = None;
    }

    /// Follow the enable line, entering safe mode as soon as it drops.
    pub fn check_enable(&mut self, hw: &mut Hardware) {
        let enabled = hw.enable.is_enabled();

        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;

        if enabled {
            info!("Robot enabled");
            if self.make_unsafe(SafeModeCause::Disabled).is_err() {
                warn!(
                    "Robot enabled but safe mode is held, cause: {:?}",
                    self.safe_cause
                );
            }
        } else {
            info!("Robot disabled");
            self.make_safe(SafeModeCause::Disabled);

            // Neutral outputs must not wait for the end of the cycle
            self.flush(hw);
        }
    }

    /// Sample the equipment and pass the readings to the modules.
    pub fn sense(&mut self, hw: &Hardware) {
        self.vision = VisionSample::acquire(hw.vision);
        self.position_m = hw.drive.get_position();
        self.heading_rad = hw.drive.get_heading();

        self.arm_ctrl.sense(&arm_ctrl::InputData {
            position_units: hw.arm_motor.get_position(),
            top_limit: hw.dio.read_digital(self.dio.arm_top_limit),
            bottom_limit: hw.dio.read_digital(self.dio.arm_bottom_limit),
        });

        self.intake.sense(&intake::InputData {
            presence_switch: hw.dio.read_digital(self.dio.intake_presence),
        });

        self.hatch.sense(&hatch::InputData {
            left_switch: hw.dio.read_digital(self.dio.hatch_left_presence),
            right_switch: hw.dio.read_digital(self.dio.hatch_right_presence),
            position_m: self.position_m,
        });
    }

    /// Run one state of every engaged automation.
    ///
    /// An automation that errors is stopped, the others carry on.
    pub fn step_automations(&mut self) {
        if self.safe {
            return;
        }

        let mut mechs = AlignMechs {
            hatch: &mut self.hatch,
            cargo: &mut self.cargo_mgr,
        };

        step_aligner(
            &mut self.hatch_deposit,
            &self.vision,
            &mut self.drive_dems,
            &mut mechs,
            &mut self.num_automation_errors,
        );
        step_aligner(
            &mut self.hatch_intake,
            &self.vision,
            &mut self.drive_dems,
            &mut mechs,
            &mut self.num_automation_errors,
        );
        step_aligner(
            &mut self.cargo_deposit,
            &self.vision,
            &mut self.drive_dems,
            &mut mechs,
            &mut self.num_automation_errors,
        );

        if let Err(e) = self.cargo_mgr.step(&mut self.arm_ctrl, &mut self.intake) {
            error!("Error in cargo_mgr, stopping: {}", e);
            self.cargo_mgr.reset();
            self.num_automation_errors += 1;
        }
    }

    /// Process the modules, producing the demands for this cycle.
    pub fn proc_modules(&mut self) {
        match self.arm_ctrl.proc() {
            Ok((o, r)) => {
                self.arm_ctrl_output = o;
                self.arm_ctrl_status_rpt = r;
            }
            Err(e) => error!("Error during ArmCtrl processing: {}", e),
        }

        match self.intake.proc() {
            Ok((o, r)) => {
                self.intake_output = o;
                self.intake_status_rpt = r;
            }
            Err(e) => error!("Error during intake processing: {}", e),
        }

        match self.hatch.proc() {
            Ok((o, r)) => {
                self.hatch_output = o;
                self.hatch_status_rpt = r;
            }
            Err(e) => error!("Error during hatch processing: {}", e),
        }
    }

    /// Send this cycle's demands to the equipment.
    pub fn flush(&mut self, hw: &mut Hardware) {
        if self.configure_arm_loop {
            hw.arm_motor
                .configure_position_loop(self.arm_ctrl.position_loop_gains());
            self.configure_arm_loop = false;
        }

        self.arm_ctrl_output.motor.apply(&mut *hw.arm_motor);
        hw.ratchet_servo
            .set_angle(self.arm_ctrl_output.ratchet_servo_deg);

        hw.intake_motor.set_output(self.intake_output);

        for id in SolenoidId::hatch_punchers().iter() {
            hw.solenoids.set_solenoid(*id, self.hatch_output.punchers_on);
        }
        hw.solenoids.set_double_solenoid(
            DoubleSolenoidId::HatchAlignPiston,
            self.hatch_output.align_piston,
        );

        if let Some(d) = self.drive_dems {
            hw.drive
                .set_velocity(d.vx_ms, d.vy_ms, d.omega_rads, d.field_relative);
        }
    }

    /// Puts the robot into safe mode with the given cause.
    ///
    /// Every automation is stopped and every module brought to its safe state, whatever the
    /// current safe mode cause.
    pub fn make_safe(&mut self, cause: SafeModeCause) {
        if !self.safe {
            warn!("Make safe requested, cause: {:?}", cause);
            self.safe = true;
            self.safe_cause = Some(cause);
        }

        self.hatch_deposit.reset();
        self.hatch_intake.reset();
        self.cargo_deposit.reset();
        self.cargo_mgr.reset();

        self.arm_ctrl.make_safe();
        self.intake.make_safe();
        self.hatch.make_safe();

        self.arm_ctrl_output = self.arm_ctrl.output();
        self.intake_output = self.intake.output();
        self.hatch_output = self.hatch.output();
        self.drive_dems = Some(DriveDems::stop());
    }

    /// Attempts to disable the safe mode by clearing the given cause.
    ///
    /// Returns `Ok(())` if this cause was cleared and safe mode was disabled, or `Err(())`
    /// otherwise. To remove safe mode the provided cause must match the initial reason for safe
    /// mode being enabled.
    ///
    /// If safe mode was not enabled `Ok(())` is returned
    pub fn make_unsafe(&mut self, cause: SafeModeCause) -> Result<(), ()> {
        if !self.safe {
            return Ok(());
        }

        match self.safe_cause {
            Some(root_cause) if root_cause != cause => Err(()),
            _ => {
                self.safe = false;
                self.safe_cause = None;
                info!("Make unsafe requested, root cause match, safe mode disabled");

                // Start from a clean state, with the position loop configured before first use
                self.hatch.on_enable();
                self.configure_arm_loop = true;

                Ok(())
            }
        }
    }

    /// Take a telemetry snapshot.
    pub fn tm(&self) -> RobotTm {
        RobotTm {
            num_cycles: self.num_cycles,
            enabled: self.enabled,
            safe: self.safe,
            safe_cause: self.safe_cause,
            position_m: self.position_m,
            heading_rad: self.heading_rad,
            vision: self.vision,
            drive_dems: self.drive_dems,
            arm_ctrl: self.arm_ctrl_status_rpt,
            arm_ctrl_output: self.arm_ctrl_output,
            intake: self.intake_status_rpt,
            intake_output: self.intake_output,
            hatch: self.hatch_status_rpt,
            hatch_output: self.hatch_output,
            hatch_deposit: self.hatch_deposit.report(),
            hatch_intake: self.hatch_intake.report(),
            cargo_deposit: self.cargo_deposit.report(),
            cargo_mgr: self.cargo_mgr.report(),
            num_automation_errors: self.num_automation_errors,
            num_rejected_tcs: self.num_rejected_tcs,
        }
    }
}

impl AlignTask {
    pub const ALL: [AlignTask; 3] = [
        AlignTask::HatchDeposit,
        AlignTask::HatchIntake,
        AlignTask::CargoDeposit,
    ];
}

impl DataStore {
    fn aligner_must_finish(&self, task: AlignTask) -> bool {
        match task {
            AlignTask::HatchDeposit => self.hatch_deposit.is_must_finish(),
            AlignTask::HatchIntake => self.hatch_intake.is_must_finish(),
            AlignTask::CargoDeposit => self.cargo_deposit.is_must_finish(),
        }
    }

    fn stop_aligner(&mut self, task: AlignTask, by: AlignTask) {
        let done = match task {
            AlignTask::HatchDeposit => self.hatch_deposit.is_done(),
            AlignTask::HatchIntake => self.hatch_intake.is_done(),
            AlignTask::CargoDeposit => self.cargo_deposit.is_done(),
        };

        if done {
            return;
        }

        info!("{:?} preempted by {:?}", task, by);
        match task {
            AlignTask::HatchDeposit => self.hatch_deposit.reset(),
            AlignTask::HatchIntake => self.hatch_intake.reset(),
            AlignTask::CargoDeposit => self.cargo_deposit.reset(),
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn step_aligner<C: Completion>(
    aligner: &mut Aligner<C>,
    vision: &VisionSample,
    drive_dems: &mut Option<DriveDems>,
    mechs: &mut AlignMechs<'_>,
    num_errors: &mut u64,
) {
    if let Err(e) = aligner.step(vision, drive_dems, mechs) {
        error!("Error in {}, stopping: {}", aligner.name(), e);
        aligner.reset();
        *num_errors += 1;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

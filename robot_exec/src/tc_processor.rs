//! # Telecommand processor module
//!
//! The telecommand processor handles the TCs coming from the dispatcher, calling the entry points
//! of the automations and modules.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};

// Internal
use crate::{
    auto::field_angle::FieldAngle,
    data_store::{AlignTask, DataStore, SafeModeCause},
};
use comms_if::tc::{AlignCmd, ArmCmd, CargoCmd, HatchCmd, IntakeCmd, Tc};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The result of executing a telecommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcResponse {
    /// The command was acted on.
    Ok,

    /// The command was not acted on, because the robot is in safe mode or the target was busy.
    CannotExecute,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Mutates the datastore to send commands to different modules.
pub fn exec(ds: &mut DataStore, tc: &Tc) -> TcResponse {
    let response = match tc {
        Tc::MakeSafe => {
            debug!("Recieved MakeSafe command");
            ds.make_safe(SafeModeCause::MakeSafeTc);
            TcResponse::Ok
        }
        Tc::MakeUnsafe => {
            debug!("Recieved MakeUnsafe command");
            match ds.make_unsafe(SafeModeCause::MakeSafeTc) {
                Ok(()) => TcResponse::Ok,
                Err(()) => TcResponse::CannotExecute,
            }
        }
        Tc::Enable | Tc::Disable => {
            warn!("{:?} must be raised on the enable line, not sent as a TC", tc);
            TcResponse::CannotExecute
        }
        _ if ds.safe => {
            warn!("Rejecting {:?}, in safe mode ({:?})", tc, ds.safe_cause);
            TcResponse::CannotExecute
        }
        Tc::Cargo(cmd) => exec_cargo(ds, cmd),
        Tc::Align(cmd) => exec_align(ds, cmd),
        // The cargo manager would overwrite these on its next cycle
        Tc::Arm(_) | Tc::Intake(_) if !ds.cargo_mgr.is_done() => {
            warn!(
                "Rejecting {:?}, cargo_mgr is running {:?}",
                tc,
                ds.cargo_mgr.state()
            );
            TcResponse::CannotExecute
        }
        Tc::Arm(cmd) => {
            match cmd {
                ArmCmd::MoveTo(h) => ds.arm_ctrl.move_to(*h),
                ArmCmd::Ratchet => ds.arm_ctrl.ratchet(),
                ArmCmd::Unratchet => ds.arm_ctrl.unratchet(),
            }
            TcResponse::Ok
        }
        Tc::Intake(cmd) => {
            match cmd {
                IntakeCmd::Intake => ds.intake.intake(),
                IntakeCmd::Outtake => ds.intake.outtake(),
                IntakeCmd::Stop => ds.intake.stop(),
            }
            TcResponse::Ok
        }
        Tc::Hatch(cmd) => {
            match cmd {
                HatchCmd::Punch => ds.hatch.punch(),
                HatchCmd::ClearToRetract => ds.hatch.clear_to_retract(),
            }
            TcResponse::Ok
        }
    };

    if response == TcResponse::CannotExecute {
        ds.num_rejected_tcs += 1;
    }

    response
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn exec_cargo(ds: &mut DataStore, cmd: &CargoCmd) -> TcResponse {
    let accepted = match *cmd {
        CargoCmd::IntakeFloor { force } => ds.cargo_mgr.intake_floor(force),
        CargoCmd::IntakeLoading { force } => ds.cargo_mgr.intake_loading(force),
        CargoCmd::OuttakeToRocket { force } => ds.cargo_mgr.outtake_to_rocket(force),
        CargoCmd::OuttakeToShip { force } => ds.cargo_mgr.outtake_to_ship(force),
        CargoCmd::Outtake { force } => ds.cargo_mgr.outtake(force),
        CargoCmd::Override(o) => {
            ds.cargo_mgr.set_override(o);
            true
        }
    };

    accepted_to_response(accepted)
}

fn exec_align(ds: &mut DataStore, cmd: &AlignCmd) -> TcResponse {
    let accepted = match *cmd {
        AlignCmd::HatchDeposit { force } => ds.engage_aligner(AlignTask::HatchDeposit, force),
        AlignCmd::HatchIntake { force } => ds.engage_aligner(AlignTask::HatchIntake, force),
        AlignCmd::CargoDeposit { force } => ds.engage_aligner(AlignTask::CargoDeposit, force),
        AlignCmd::HatchAuto => {
            let angle = FieldAngle::closest(ds.heading_rad);
            info!("Closest field angle is {:?}", angle);

            match angle {
                FieldAngle::LoadingStation => ds.engage_aligner(AlignTask::HatchIntake, false),
                _ => ds.engage_aligner(AlignTask::HatchDeposit, false),
            }
        }
    };

    accepted_to_response(accepted)
}

fn accepted_to_response(accepted: bool) -> TcResponse {
    match accepted {
        true => TcResponse::Ok,
        false => TcResponse::CannotExecute,
    }
}

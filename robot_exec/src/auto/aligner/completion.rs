//! # Alignment completions
//!
//! What an aligner does once it has reached its target.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::AlignState;
use crate::{
    auto::cargo_mgr::CargoMgr,
    hatch::Hatch,
    sm::{StateAction, StateTick},
};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// The task an aligner performs in its `success` state.
pub trait Completion {
    /// Name of the aligner running this completion.
    const NAME: &'static str;

    /// Run one cycle of the `success` state.
    fn on_success(
        &mut self,
        tick: &StateTick<AlignState>,
        mechs: &mut AlignMechs<'_>,
    ) -> StateAction<AlignState>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The mechanisms a completion may act on.
pub struct AlignMechs<'a> {
    pub hatch: &'a mut Hatch,
    pub cargo: &'a mut CargoMgr,
}

/// Parameters of the hatch deposit completion.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct HatchDepositParams {
    /// Time to wait after arriving before punching.
    ///
    /// Units: seconds
    pub settle_time_s: f64,

    /// Time to hold position after punching.
    ///
    /// Units: seconds
    pub hold_time_s: f64,
}

/// Punch the hatch onto the target.
#[derive(Debug, Clone)]
pub struct HatchDeposit {
    params: HatchDepositParams,
    punched: bool,
}

/// Eject cargo into the target.
#[derive(Debug, Clone, Copy, Default)]
pub struct CargoDeposit;

/// Pick up a hatch from the loading station.
#[derive(Debug, Clone, Copy, Default)]
pub struct HatchIntake;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl HatchDeposit {
    pub fn new(params: HatchDepositParams) -> Self {
        Self {
            params,
            punched: false,
        }
    }
}

impl Completion for HatchDeposit {
    const NAME: &'static str = "hatch_deposit";

    fn on_success(
        &mut self,
        tick: &StateTick<AlignState>,
        mechs: &mut AlignMechs<'_>,
    ) -> StateAction<AlignState> {
        if tick.initial_call {
            self.punched = false;
        }

        if !self.punched && tick.elapsed_s >= self.params.settle_time_s {
            mechs.hatch.punch();
            self.punched = true;
        }

        match self.punched
            && tick.elapsed_s > self.params.settle_time_s + self.params.hold_time_s
        {
            true => StateAction::Done,
            false => StateAction::Stay,
        }
    }
}

impl Completion for CargoDeposit {
    const NAME: &'static str = "cargo_deposit";

    fn on_success(
        &mut self,
        _tick: &StateTick<AlignState>,
        mechs: &mut AlignMechs<'_>,
    ) -> StateAction<AlignState> {
        if !mechs.cargo.outtake(false) {
            warn!("Cargo manager busy, cargo not deposited");
        }

        StateAction::Done
    }
}

impl Completion for HatchIntake {
    const NAME: &'static str = "hatch_intake";

    fn on_success(
        &mut self,
        _tick: &StateTick<AlignState>,
        mechs: &mut AlignMechs<'_>,
    ) -> StateAction<AlignState> {
        info!("Hatch acquired");
        mechs.hatch.set_has_hatch(true);

        StateAction::Done
    }
}

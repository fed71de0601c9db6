//! # Intake module
//!
//! Drives the cargo intake rollers. Intaking is gated by the cargo presence switch: once cargo is
//! contained the rollers stop even if intaking is still demanded.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use serde::{Deserialize, Serialize};

use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the intake.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Roller output while intaking, between 0 and 1.
    pub intake_speed: f64,

    /// Roller output magnitude while outtaking, between 0 and 1. Applied in reverse.
    pub outtake_speed: f64,

    /// True if the presence switch reads low when cargo is contained.
    pub switch_active_low: bool,
}

/// Intake module state
#[derive(Default)]
pub struct Intake {
    params: Params,

    dem: RollerDem,

    contained: bool,

    output: f64,

    report: StatusReport,
}

/// Input data to the intake.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputData {
    /// Raw reading of the cargo presence switch.
    pub presence_switch: bool,
}

/// Status report for intake processing.
#[derive(Clone, Copy, Default, Serialize, Deserialize, Debug)]
pub struct StatusReport {
    pub contained: bool,
    pub dem: RollerDem,

    /// Intaking was demanded but stopped because cargo is contained.
    pub intake_gated: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What the rollers have been asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RollerDem {
    Stop,
    Intake,
    Outtake,
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Intake and outtake speeds must be between 0 and 1, got {0} and {1}")]
    InvalidSpeed(f64, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for RollerDem {
    fn default() -> Self {
        RollerDem::Stop
    }
}

impl State for Intake {
    type Params = Params;
    type InitError = IntakeError;

    type InputData = InputData;
    /// Roller motor output, between -1 and +1.
    type OutputData = f64;
    type StatusReport = StatusReport;
    type ProcError = std::convert::Infallible;

    fn init(&mut self, params: Self::Params) -> Result<(), Self::InitError> {
        let speed_range = 0.0..=1.0;
        if !speed_range.contains(&params.intake_speed)
            || !speed_range.contains(&params.outtake_speed)
        {
            return Err(IntakeError::InvalidSpeed(
                params.intake_speed,
                params.outtake_speed,
            ));
        }

        self.params = params;
        self.make_safe();

        Ok(())
    }

    fn sense(&mut self, input_data: &Self::InputData) {
        self.contained = input_data.presence_switch != self.params.switch_active_low;
    }

    fn proc(&mut self) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        self.report = StatusReport {
            contained: self.contained,
            dem: self.dem,
            intake_gated: false,
        };

        self.output = match self.dem {
            RollerDem::Stop => 0.0,
            RollerDem::Intake if self.contained => {
                self.report.intake_gated = true;
                0.0
            }
            RollerDem::Intake => self.params.intake_speed,
            RollerDem::Outtake => -self.params.outtake_speed,
        };

        Ok((self.output, self.report))
    }

    fn make_safe(&mut self) {
        self.dem = RollerDem::Stop;
        self.contained = false;
        self.output = 0.0;
        self.report = StatusReport::default();
    }
}

impl Intake {
    /// Create a new intake in the safe state.
    pub fn new(params: Params) -> Result<Self, IntakeError> {
        let mut intake = Self::default();
        intake.init(params)?;
        Ok(intake)
    }

    /// Run the rollers inwards until cargo is contained.
    pub fn intake(&mut self) {
        self.set_dem(RollerDem::Intake);
    }

    /// Run the rollers outwards.
    pub fn outtake(&mut self) {
        self.set_dem(RollerDem::Outtake);
    }

    pub fn stop(&mut self) {
        self.set_dem(RollerDem::Stop);
    }

    /// Returns true if the presence switch reports contained cargo.
    pub fn is_contained(&self) -> bool {
        self.contained
    }

    pub fn output(&self) -> f64 {
        self.output
    }

    pub fn report(&self) -> StatusReport {
        self.report
    }

    fn set_dem(&mut self, dem: RollerDem) {
        if self.dem != dem {
            debug!("Intake {:?} -> {:?}", self.dem, dem);
            self.dem = dem;
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_params;

    fn cycle(intake: &mut Intake, switch: bool) -> f64 {
        intake.sense(&InputData {
            presence_switch: switch,
        });
        intake.proc().unwrap().0
    }

    #[test]
    fn test_intake_gated_by_presence() {
        let params = test_params::intake();
        let mut intake = Intake::new(params.clone()).unwrap();

        intake.intake();
        assert_eq!(cycle(&mut intake, false), params.intake_speed);
        assert!(!intake.is_contained());

        assert_eq!(cycle(&mut intake, true), 0.0);
        assert!(intake.is_contained());
        assert!(intake.report().intake_gated);
    }

    #[test]
    fn test_outtake_reverses() {
        let params = test_params::intake();
        let mut intake = Intake::new(params.clone()).unwrap();

        intake.outtake();
        assert_eq!(cycle(&mut intake, true), -params.outtake_speed);

        intake.stop();
        assert_eq!(cycle(&mut intake, true), 0.0);
    }

    #[test]
    fn test_active_low_switch() {
        let mut params = test_params::intake();
        params.switch_active_low = true;
        let mut intake = Intake::new(params).unwrap();

        cycle(&mut intake, false);
        assert!(intake.is_contained());
        cycle(&mut intake, true);
        assert!(!intake.is_contained());
    }

    #[test]
    fn test_invalid_speed() {
        let mut params = test_params::intake();
        params.outtake_speed = 1.5;
        assert!(Intake::new(params).is_err());
    }
}

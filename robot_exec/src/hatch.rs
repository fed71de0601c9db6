//! # Hatch module
//!
//! The hatch mechanism holds a hatch panel on a pair of presence switches and deposits it by
//! firing three puncher solenoids. Once fired the punchers stay out until the robot has driven
//! far enough away from where they fired, so the hatch is not pulled back off its target.
//!
//! The alignment piston is pushed out while the robot is enabled and retracted in safe mode.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info};
use serde::{Deserialize, Serialize};

use comms_if::eqpt::mech::PistonDem;
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the hatch mechanism.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Distance the robot must drive from where the punchers fired before they retract.
    ///
    /// Units: meters
    pub retract_distance_m: f64,

    /// True if the presence switches read low while a hatch is held.
    pub switches_active_low: bool,
}

/// Hatch mechanism state
#[derive(Default)]
pub struct Hatch {
    params: Params,

    punch_on: bool,

    clear_to_retract: bool,

    /// Robot position when the punchers fired.
    fired_position_m: (f64, f64),

    has_hatch: bool,

    contained: bool,

    align_piston: PistonDem,

    input: InputData,

    output: OutputData,

    num_punches: u64,
}

/// Input data to the hatch mechanism.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputData {
    /// Raw reading of the left presence switch.
    pub left_switch: bool,

    /// Raw reading of the right presence switch.
    pub right_switch: bool,

    /// Position of the robot on the field.
    ///
    /// Units: meters
    pub position_m: (f64, f64),
}

/// Output demands of the hatch mechanism.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputData {
    /// State of all three puncher solenoids.
    pub punchers_on: bool,

    pub align_piston: PistonDem,
}

/// Status report for hatch processing.
#[derive(Clone, Copy, Default, Serialize, Deserialize, Debug)]
pub struct StatusReport {
    pub has_hatch: bool,
    pub contained: bool,
    pub punch_on: bool,
    pub clear_to_retract: bool,
    pub num_punches: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum HatchError {
    #[error("The retract distance must not be negative, got {0}")]
    InvalidRetractDistance(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for Hatch {
    type Params = Params;
    type InitError = HatchError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = std::convert::Infallible;

    fn init(&mut self, params: Self::Params) -> Result<(), Self::InitError> {
        if !(params.retract_distance_m >= 0.0) {
            return Err(HatchError::InvalidRetractDistance(
                params.retract_distance_m,
            ));
        }

        self.params = params;
        self.make_safe();

        Ok(())
    }

    fn sense(&mut self, input_data: &Self::InputData) {
        self.input = *input_data;

        // Either switch seeing the hatch is enough
        let active_low = self.params.switches_active_low;
        self.contained = (input_data.left_switch != active_low)
            || (input_data.right_switch != active_low);
    }

    fn proc(&mut self) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        if self.punch_on {
            self.has_hatch = false;
        }

        if self.contained && self.clear_to_retract {
            self.has_hatch = true;
        }

        if self.clear_to_retract {
            self.punch_on = false;
            self.clear_to_retract = false;
        }

        if self.punch_on {
            let (fx, fy) = self.fired_position_m;
            let (x, y) = self.input.position_m;
            if (x - fx).hypot(y - fy) > self.params.retract_distance_m {
                debug!("Driven clear of the hatch target, punchers may retract");
                self.clear_to_retract = true;
            }
        }

        self.output = OutputData {
            punchers_on: self.punch_on,
            align_piston: self.align_piston,
        };

        Ok((self.output, self.report()))
    }

    /// Retract the punchers and the alignment piston.
    fn make_safe(&mut self) {
        self.punch_on = false;
        self.clear_to_retract = false;
        self.has_hatch = false;
        self.contained = false;
        self.align_piston = PistonDem::Reverse;
        self.input = InputData::default();
        self.output = OutputData {
            punchers_on: false,
            align_piston: PistonDem::Reverse,
        };
    }
}

impl Hatch {
    /// Create a new hatch mechanism in the safe state.
    pub fn new(params: Params) -> Result<Self, HatchError> {
        let mut hatch = Self::default();
        hatch.init(params)?;
        Ok(hatch)
    }

    /// Called on the transition into the enabled state.
    pub fn on_enable(&mut self) {
        self.make_safe();
        self.align_piston = PistonDem::Forward;
        self.output.align_piston = PistonDem::Forward;
    }

    /// Fire the punchers, releasing the hatch.
    pub fn punch(&mut self) {
        info!("Punching hatch");
        self.fired_position_m = self.input.position_m;
        self.punch_on = true;
        self.clear_to_retract = false;
        self.num_punches += 1;
    }

    /// Allow the punchers to retract on the next cycle.
    pub fn clear_to_retract(&mut self) {
        self.clear_to_retract = true;
    }

    pub fn has_hatch(&self) -> bool {
        self.has_hatch
    }

    pub fn set_has_hatch(&mut self, has_hatch: bool) {
        self.has_hatch = has_hatch;
    }

    /// Returns true if either presence switch sees a hatch.
    pub fn is_contained(&self) -> bool {
        self.contained
    }

    pub fn is_punch_on(&self) -> bool {
        self.punch_on
    }

    pub fn output(&self) -> OutputData {
        self.output
    }

    pub fn report(&self) -> StatusReport {
        StatusReport {
            has_hatch: self.has_hatch,
            contained: self.contained,
            punch_on: self.punch_on,
            clear_to_retract: self.clear_to_retract,
            num_punches: self.num_punches,
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

    /// Switch readings with no hatch held, for active low switches.
    fn empty_at(x: f64) -> InputData {
        InputData {
            left_switch: true,
            right_switch: true,
            position_m: (x, 0.0),
        }
    }

    fn cycle(hatch: &mut Hatch, input: InputData) -> OutputData {
        hatch.sense(&input);
        hatch.proc().unwrap().0
    }

    #[test]
    fn test_punch_retracts_after_driving_away() {
        let mut hatch = Hatch::new(test_params::hatch()).unwrap();
        hatch.on_enable();
        hatch.set_has_hatch(true);

        hatch.sense(&empty_at(1.0));
        hatch.punch();

        assert!(cycle(&mut hatch, empty_at(1.0)).punchers_on);
        assert!(!hatch.has_hatch());

        // Still close to where the punchers fired
        assert!(cycle(&mut hatch, empty_at(1.3)).punchers_on);

        // Past the retract distance, the punchers retract one cycle later
        assert!(cycle(&mut hatch, empty_at(1.6)).punchers_on);
        assert!(hatch.report().clear_to_retract);
        assert!(!cycle(&mut hatch, empty_at(1.6)).punchers_on);
        assert!(!hatch.is_punch_on());
    }

    #[test]
    fn test_presence_switches() {
        let mut hatch = Hatch::new(test_params::hatch()).unwrap();
        hatch.on_enable();

        hatch.sense(&empty_at(0.0));
        assert!(!hatch.is_contained());

        // Active low, either switch is enough
        hatch.sense(&InputData {
            left_switch: true,
            right_switch: false,
            position_m: (0.0, 0.0),
        });
        assert!(hatch.is_contained());

        // Contained and cleared to retract marks the hatch as held
        hatch.clear_to_retract();
        hatch.proc().unwrap();
        assert!(hatch.has_hatch());
    }

    #[test]
    fn test_align_piston() {
        let mut hatch = Hatch::new(test_params::hatch()).unwrap();
        assert_eq!(hatch.output().align_piston, PistonDem::Reverse);

        hatch.on_enable();
        assert_eq!(
            cycle(&mut hatch, empty_at(0.0)).align_piston,
            PistonDem::Forward
        );

        hatch.make_safe();
        assert_eq!(hatch.output().align_piston, PistonDem::Reverse);
        assert!(!hatch.output().punchers_on);
    }
}

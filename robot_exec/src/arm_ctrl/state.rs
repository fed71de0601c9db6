//! Implementations for the ArmCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use serde::{Deserialize, Serialize};

// Internal
use super::{ArmCtrlError, Params, TravelDir};
use comms_if::{
    eqpt::mech::{MotorDem, PositionLoopGains},
    tc::arm::Height,
};
use util::{module::State, time::cycles_to_seconds};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Arm control module state
#[derive(Default)]
pub struct ArmCtrl {
    pub(crate) params: Params,

    pub(crate) report: StatusReport,

    cycle_period_s: f64,

    /// The height the arm is being driven to, `None` until the first `move_to` after enable.
    target: Option<Height>,

    ratchet_engaged: bool,

    phase: Phase,

    /// Latest sensor data, `None` until the first sense after enable.
    input: Option<InputData>,

    output: OutputData,
}

/// Input data to Arm Control.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputData {
    /// Measured position of the arm motor.
    ///
    /// Units: encoder units
    pub position_units: f64,

    /// True if the top limit switch is closed.
    pub top_limit: bool,

    /// True if the bottom limit switch is closed.
    pub bottom_limit: bool,
}

/// Output demands of Arm Control.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputData {
    /// Demand for the arm motor controller.
    pub motor: MotorDem,

    /// Demand for the ratchet servo.
    ///
    /// Units: degrees
    pub ratchet_servo_deg: f64,
}

/// Status report for ArmCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Deserialize, Debug)]
pub struct StatusReport {
    pub at_height: bool,
    pub pressure_releasing: bool,
    pub ratchet_engaged: bool,
    pub ratchet_blocked: bool,
    pub top_limit_stopped: bool,
    pub bottom_limit_stopped: bool,
}

/// Phase of motion toward the current target.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    /// No target, output neutral.
    Idle,

    /// Short open loop output against the direction of travel, lasting for the given number of
    /// cycles so far.
    PressureRelease { cycles: u64 },

    /// Closed loop tracking of the target.
    Tracking,

    /// Travel toward the target is held by the engaged ratchet.
    Blocked,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Phase {
    fn default() -> Self {
        Phase::Idle
    }
}

impl State for ArmCtrl {
    type Params = Params;
    type InitError = ArmCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = std::convert::Infallible;

    /// Initialise the ArmCtrl module, leaving it in the safe state.
    fn init(&mut self, params: Self::Params) -> Result<(), Self::InitError> {
        params.validate()?;
        self.params = params;
        self.make_safe();

        Ok(())
    }

    fn sense(&mut self, input_data: &Self::InputData) {
        self.input = Some(*input_data);
    }

    /// Perform cyclic processing of Arm Control.
    fn proc(&mut self) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Clear the status report
        self.report = StatusReport {
            ratchet_engaged: self.ratchet_engaged,
            ..Default::default()
        };

        let motor = match (self.target, self.input) {
            (Some(target), Some(input)) => self.calc_motor_dem(target, &input),
            _ => {
                self.phase = match self.target {
                    Some(_) => self.phase,
                    None => Phase::Idle,
                };
                MotorDem::Neutral
            }
        };

        self.output = OutputData {
            motor,
            ratchet_servo_deg: self.ratchet_servo_deg(),
        };
        self.report.at_height = self.at_height();

        Ok((self.output, self.report))
    }

    /// Function called when entering safe mode.
    ///
    /// Must result in no motion of the arm, with the ratchet holding it.
    fn make_safe(&mut self) {
        self.target = None;
        self.ratchet_engaged = true;
        self.phase = Phase::Idle;
        self.input = None;
        self.report = StatusReport {
            ratchet_engaged: true,
            ..Default::default()
        };
        self.output = OutputData {
            motor: MotorDem::Neutral,
            ratchet_servo_deg: self.ratchet_servo_deg(),
        };
    }
}

impl ArmCtrl {
    /// Create a new arm controller in the safe state.
    pub fn new(params: Params, cycle_period_s: f64) -> Result<Self, ArmCtrlError> {
        if !(cycle_period_s > 0.0) {
            return Err(ArmCtrlError::InvalidCyclePeriod(cycle_period_s));
        }

        let mut arm = Self {
            cycle_period_s,
            ..Default::default()
        };
        arm.init(params)?;

        Ok(arm)
    }

    /// Set the height the arm should be driven to.
    ///
    /// The arm does not move until the next call to `proc`. Commanding a new height starts the
    /// pressure release phase, commanding the current target again changes nothing.
    pub fn move_to(&mut self, height: Height) {
        if self.target != Some(height) {
            debug!("ArmCtrl target set to {}", height);
            self.target = Some(height);
            self.phase = Phase::PressureRelease { cycles: 0 };
        }
    }

    /// Drop the target and hold the arm where it is on the ratchet.
    ///
    /// The output is neutral from the next call to `proc` until a new height is commanded.
    pub fn stop(&mut self) {
        if self.target.is_some() {
            info!("ArmCtrl stopped, target {:?} dropped", self.target);
        }
        self.target = None;
        self.phase = Phase::Idle;
        self.ratchet();
    }

    /// Engage the ratchet.
    pub fn ratchet(&mut self) {
        if !self.ratchet_engaged {
            debug!("Ratchet engaged");
        }
        self.ratchet_engaged = true;
    }

    /// Disengage the ratchet, allowing travel in both directions.
    pub fn unratchet(&mut self) {
        if self.ratchet_engaged {
            debug!("Ratchet disengaged");
            self.ratchet_engaged = false;

            if self.phase == Phase::Blocked {
                self.phase = Phase::PressureRelease { cycles: 0 };
            }
        }
    }

    /// Returns true if the arm is settled at its target height.
    ///
    /// This requires a target, at least one position measurement, no pressure release or ratchet
    /// hold in progress, and the measured position to be within tolerance of the target.
    pub fn at_height(&self) -> bool {
        match (self.target, self.input, self.phase) {
            (Some(target), Some(input), Phase::Tracking) => {
                (input.position_units - self.params.height_to_units(target)).abs()
                    <= self.params.tolerance_units
            }
            _ => false,
        }
    }

    pub fn target(&self) -> Option<Height> {
        self.target
    }

    pub fn is_ratchet_engaged(&self) -> bool {
        self.ratchet_engaged
    }

    /// Direction of travel the ratchet blocks while engaged.
    pub fn ratchet_blocked_dir(&self) -> TravelDir {
        self.params.ratchet_blocked_dir
    }

    /// Direction the arm must travel to reach the given height from where it was last measured.
    ///
    /// `None` if the arm is already within tolerance of the height or has not been measured.
    pub fn travel_dir_to(&self, height: Height) -> Option<TravelDir> {
        self.input.and_then(|i| {
            self.travel_dir(self.params.height_to_units(height) - i.position_units)
        })
    }

    /// Gains to configure the motor controller's position loop with.
    pub fn position_loop_gains(&self) -> PositionLoopGains {
        self.params.position_loop
    }

    /// The output demands of the last processing cycle, or the safe demands after `make_safe`.
    pub fn output(&self) -> OutputData {
        self.output
    }

    pub fn report(&self) -> StatusReport {
        self.report
    }

    /// Compute the motor demand toward the target, updating the motion phase.
    fn calc_motor_dem(&mut self, target: Height, input: &InputData) -> MotorDem {
        let target_units = self.params.height_to_units(target);
        let travel = self.travel_dir(target_units - input.position_units);
        let blocked = self.ratchet_engaged && travel == Some(self.params.ratchet_blocked_dir);

        self.phase = match self.phase {
            _ if blocked => {
                if self.phase != Phase::Blocked {
                    info!(
                        "ArmCtrl travel {:?} to {} held by the ratchet",
                        self.params.ratchet_blocked_dir, target
                    );
                }
                Phase::Blocked
            }
            Phase::Blocked | Phase::Idle => Phase::PressureRelease { cycles: 0 },
            Phase::PressureRelease { cycles }
                if travel.is_none()
                    || cycles_to_seconds(cycles, self.cycle_period_s)
                        >= self.params.pressure_release_time_s - 1e-9 =>
            {
                Phase::Tracking
            }
            p => p,
        };

        let motor = match self.phase {
            Phase::Idle => MotorDem::Neutral,
            Phase::Blocked => {
                self.report.ratchet_blocked = true;
                MotorDem::Neutral
            }
            Phase::PressureRelease { cycles } => {
                self.report.pressure_releasing = true;
                self.phase = Phase::PressureRelease { cycles: cycles + 1 };

                match travel {
                    Some(dir) => MotorDem::Percent(
                        self.dir_sign(dir.opposite()) * self.params.pressure_release_output,
                    ),
                    None => MotorDem::Neutral,
                }
            }
            Phase::Tracking => MotorDem::Position(target_units),
        };

        self.gate_limits(motor, input)
    }

    /// Replace any demand which would drive the arm into a closed limit switch with neutral.
    fn gate_limits(&mut self, motor: MotorDem, input: &InputData) -> MotorDem {
        let dir = match motor {
            MotorDem::Neutral => None,
            MotorDem::Percent(p) if p == 0.0 => None,
            MotorDem::Percent(p) => match p * self.params.up_sign() > 0.0 {
                true => Some(TravelDir::Up),
                false => Some(TravelDir::Down),
            },
            MotorDem::Position(u) => self.travel_dir(u - input.position_units),
        };

        match dir {
            Some(TravelDir::Up) if input.top_limit => {
                self.report.top_limit_stopped = true;
                MotorDem::Neutral
            }
            Some(TravelDir::Down) if input.bottom_limit => {
                self.report.bottom_limit_stopped = true;
                MotorDem::Neutral
            }
            _ => motor,
        }
    }

    /// Direction of travel needed to close an error in encoder units, `None` inside tolerance.
    fn travel_dir(&self, error_units: f64) -> Option<TravelDir> {
        if error_units.abs() <= self.params.tolerance_units {
            None
        } else if error_units * self.params.up_sign() > 0.0 {
            Some(TravelDir::Up)
        } else {
            Some(TravelDir::Down)
        }
    }

    /// Sign of an open loop output moving the arm in the given direction.
    fn dir_sign(&self, dir: TravelDir) -> f64 {
        match dir {
            TravelDir::Up => self.params.up_sign(),
            TravelDir::Down => -self.params.up_sign(),
        }
    }

    fn ratchet_servo_deg(&self) -> f64 {
        match self.ratchet_engaged {
            true => self.params.ratchet_engaged_angle_deg,
            false => self.params.ratchet_disengaged_angle_deg,
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

    fn arm() -> ArmCtrl {
        ArmCtrl::new(test_params::arm_ctrl(), test_params::CYCLE_PERIOD_S).unwrap()
    }

    fn at(position_units: f64) -> InputData {
        InputData {
            position_units,
            ..Default::default()
        }
    }

    fn cycle(arm: &mut ArmCtrl, input: InputData) -> OutputData {
        arm.sense(&input);
        arm.proc().unwrap().0
    }

    #[test]
    fn test_height_to_units_monotonic() {
        let params = test_params::arm_ctrl();

        for pair in Height::ALL.windows(2) {
            assert!(params.height_to_units(pair[1]) > params.height_to_units(pair[0]));
        }
        assert_eq!(params.height_to_units(Height::Floor), 0.0);
    }

    #[test]
    fn test_validation() {
        let mut params = test_params::arm_ctrl();
        params.height_table_rad.cargo_ship_rad = params.height_table_rad.rocket_ship_rad;
        assert!(matches!(
            ArmCtrl::new(params, 0.02),
            Err(ArmCtrlError::HeightTableNotIncreasing(..))
        ));

        let mut params = test_params::arm_ctrl();
        params.gear_ratio = 0.0;
        assert!(matches!(
            ArmCtrl::new(params, 0.02),
            Err(ArmCtrlError::ZeroGain)
        ));

        let mut params = test_params::arm_ctrl();
        params.tolerance_units = 0.0;
        assert!(matches!(
            ArmCtrl::new(params, 0.02),
            Err(ArmCtrlError::InvalidTolerance(_))
        ));
    }

    #[test]
    fn test_safe_state() {
        let mut arm = arm();
        let params = test_params::arm_ctrl();

        assert!(arm.is_ratchet_engaged());
        assert!(!arm.at_height());
        assert_eq!(
            cycle(&mut arm, at(0.0)),
            OutputData {
                motor: MotorDem::Neutral,
                ratchet_servo_deg: params.ratchet_engaged_angle_deg
            }
        );
    }

    #[test]
    fn test_move_to_loading_station() {
        let mut arm = arm();
        let params = test_params::arm_ctrl();
        let target_units = params.height_to_units(Height::LoadingStation);
        let release_cycles =
            (params.pressure_release_time_s / test_params::CYCLE_PERIOD_S).round() as usize;

        // Upwards travel is not held by the ratchet, so the arm moves with it engaged
        assert_eq!(params.ratchet_blocked_dir, TravelDir::Down);
        arm.move_to(Height::LoadingStation);

        for _ in 0..release_cycles {
            match cycle(&mut arm, at(0.0)).motor {
                MotorDem::Percent(p) => {
                    assert!(p < 0.0);
                    assert!((p.abs() - params.pressure_release_output).abs() < 1e-9);
                }
                m => panic!("Expected pressure release output, got {:?}", m),
            }
            assert!(arm.report().pressure_releasing);
            assert!(!arm.at_height());
        }

        assert_eq!(
            cycle(&mut arm, at(0.0)).motor,
            MotorDem::Position(target_units)
        );
        assert!(!arm.at_height());

        // Just outside the tolerance band
        cycle(&mut arm, at(target_units - 2.0 * params.tolerance_units));
        assert!(!arm.at_height());

        cycle(&mut arm, at(target_units - 0.5 * params.tolerance_units));
        assert!(arm.at_height());
        assert!(arm.report().at_height);

        // Re-commanding the same height does not restart the pressure release
        arm.move_to(Height::LoadingStation);
        assert!(arm.at_height());
    }

    #[test]
    fn test_ratchet_blocks_downward_travel() {
        let mut arm = arm();
        let params = test_params::arm_ctrl();
        let start_units = params.height_to_units(Height::CargoShip);

        arm.move_to(Height::Floor);

        for _ in 0..20 {
            assert_eq!(cycle(&mut arm, at(start_units)).motor, MotorDem::Neutral);
            assert!(arm.report().ratchet_blocked);
        }

        // Releasing the ratchet restarts the pressure release, pushing up against the ratchet
        arm.unratchet();
        match cycle(&mut arm, at(start_units)).motor {
            MotorDem::Percent(p) => assert!(p > 0.0),
            m => panic!("Expected pressure release output, got {:?}", m),
        }
        assert!(!arm.report().ratchet_blocked);
        assert_eq!(
            cycle(&mut arm, at(start_units)).ratchet_servo_deg,
            params.ratchet_disengaged_angle_deg
        );
    }

    #[test]
    fn test_limit_switches() {
        let mut arm = arm();
        let params = test_params::arm_ctrl();
        let target_units = params.height_to_units(Height::LoadingStation);
        let release_cycles =
            (params.pressure_release_time_s / test_params::CYCLE_PERIOD_S).round() as usize;

        arm.move_to(Height::LoadingStation);

        // Top limit closed: the pressure release pushes away from it so is allowed, but the
        // closed loop demand is replaced with neutral whatever the error
        let input = InputData {
            position_units: 0.0,
            top_limit: true,
            bottom_limit: false,
        };
        for _ in 0..release_cycles {
            cycle(&mut arm, input);
        }
        for _ in 0..20 {
            assert_eq!(cycle(&mut arm, input).motor, MotorDem::Neutral);
            assert!(arm.report().top_limit_stopped);
        }

        // Bottom limit closed does not stop upwards travel
        let input = InputData {
            position_units: 0.0,
            top_limit: false,
            bottom_limit: true,
        };
        assert_eq!(
            cycle(&mut arm, input).motor,
            MotorDem::Position(target_units)
        );
        assert!(!arm.report().bottom_limit_stopped);

        // Downward travel is stopped by the bottom limit
        arm.unratchet();
        arm.move_to(Height::Floor);
        let input = InputData {
            position_units: target_units,
            top_limit: false,
            bottom_limit: true,
        };
        for _ in 0..release_cycles {
            cycle(&mut arm, input);
        }
        for _ in 0..20 {
            assert_eq!(cycle(&mut arm, input).motor, MotorDem::Neutral);
            assert!(arm.report().bottom_limit_stopped);
        }
    }

    #[test]
    fn test_make_safe() {
        let mut arm = arm();
        let params = test_params::arm_ctrl();

        arm.unratchet();
        arm.move_to(Height::CargoShip);
        cycle(&mut arm, at(0.0));

        arm.make_safe();

        assert!(arm.is_ratchet_engaged());
        assert_eq!(arm.target(), None);
        assert_eq!(arm.output().motor, MotorDem::Neutral);
        assert_eq!(
            arm.output().ratchet_servo_deg,
            params.ratchet_engaged_angle_deg
        );
    }
}

//! Module interfaces
//!
//! Each hardware-facing module in `robot_exec` (the arm controller, intake and hatch) implements
//! [`State`]. A control cycle calls the functions in this order:
//!
//! 1. [`State::sense`] with the sensor data acquired this cycle,
//! 2. the automations, which stage commands on the module,
//! 3. [`State::proc`], which turns the staged commands into output demands,
//!
//! after which the executable flushes the demands to the hardware in the same cycle.

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// The module's internal state.
pub trait State {
    /// Parameters the module is built from.
    type Params;
    /// An error which can occur during initialisation.
    type InitError;

    /// Sensor data acquired at the start of each cycle.
    type InputData;
    /// Data produced by cyclic processing.
    type OutputData;
    /// A report on the status of the cyclic processing.
    type StatusReport;
    /// An error which can occur during cyclic processing.
    type ProcError;

    /// Initialise the module from its parameters.
    ///
    /// # Outputs
    /// - On success `Ok(())`.
    /// - On error an `InitError` instance.
    fn init(&mut self, params: Self::Params) -> Result<(), Self::InitError>;

    /// Record the sensor data for this cycle.
    fn sense(&mut self, input_data: &Self::InputData);

    /// Main module processing function.
    ///
    /// # Outputs
    /// - On success a tuple of the output data and status report.
    /// - On error a `ProcError` instance.
    fn proc(&mut self) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;

    /// Bring the module to its safe state.
    ///
    /// Must result in neutral outputs, and must never fail.
    fn make_safe(&mut self);
}
